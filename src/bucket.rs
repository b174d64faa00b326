use super::config::BucketConfig;

/// Index arithmetic between values and counts cells.
///
/// A value lives in bucket `b` (the number of doublings past the first
/// bucket) and sub-bucket `s` (its linear position within that bucket).  The
/// first bucket uses all `sub_bucket_count` sub-buckets; every later bucket
/// only uses its upper half, since its lower half is already covered at finer
/// resolution by the bucket before it.  The cell index is therefore
/// `((b + 1) << sub_bucket_half_count_magnitude) + (s - sub_bucket_half_count)`,
/// which is exactly invertible and monotonic in the represented value.
impl BucketConfig {
    fn location_of(&self, value: i64) -> Option<(u32, u64)> {
        if value < 0 {
            return None;
        }
        let pow2ceiling = 64 - ((value | self.sub_bucket_mask) as u64).leading_zeros();
        let base = self.unit_magnitude
            .checked_add(self.sub_bucket_half_count_magnitude)?
            .checked_add(1)?;
        let bucket_index = pow2ceiling.checked_sub(base)?;
        let sub_bucket_index = (value as u64).checked_shr(bucket_index + self.unit_magnitude)?;
        Some((bucket_index, sub_bucket_index))
    }

    fn value_from_location(&self, bucket_index: u32, sub_bucket_index: u64) -> i64 {
        sub_bucket_index
            .checked_shl(bucket_index.wrapping_add(self.unit_magnitude))
            .and_then(|v| i64::try_from(v).ok())
            .unwrap_or(i64::MAX)
    }

    /// This function encodes `value` into its cell index.
    ///
    /// The index is not checked against `counts_len`; `None` is returned only
    /// for negative values or when the arithmetic cannot represent the index.
    pub fn index_of(&self, value: i64) -> Option<usize> {
        let (bucket_index, sub_bucket_index) = self.location_of(value)?;
        let index = (bucket_index as u64 + 1)
            .checked_shl(self.sub_bucket_half_count_magnitude)?
            .checked_add(sub_bucket_index)?
            .checked_sub(self.sub_bucket_half_count as u64)?;
        usize::try_from(index).ok()
    }

    /// This function decodes a cell index into the lowest value that maps
    /// to that cell.
    pub fn value_at_index(&self, index: usize) -> i64 {
        let half = self.sub_bucket_half_count as u64;
        let bucket_index = (index as u64).wrapping_shr(self.sub_bucket_half_count_magnitude);
        let sub_bucket_index = (index as u64 & half.wrapping_sub(1)) + half;
        if bucket_index == 0 {
            self.value_from_location(0, sub_bucket_index - half)
        } else {
            self.value_from_location((bucket_index - 1) as u32, sub_bucket_index)
        }
    }

    /// This function returns the size of the range of values that share a
    /// cell with `value`.
    pub fn equivalent_range_len(&self, value: i64) -> i64 {
        match self.location_of(value.max(0)) {
            Some((bucket_index, sub_bucket_index)) => {
                let adjusted = if sub_bucket_index >= self.sub_bucket_count as u64 {
                    bucket_index + 1
                } else {
                    bucket_index
                };
                1u64.checked_shl(self.unit_magnitude + adjusted)
                    .and_then(|v| i64::try_from(v).ok())
                    .unwrap_or(i64::MAX)
            },
            None => 1,
        }
    }
    /// This function returns the lowest value sharing a cell with `value`.
    pub fn lowest_equivalent(&self, value: i64) -> i64 {
        match self.location_of(value.max(0)) {
            Some((bucket_index, sub_bucket_index)) => self.value_from_location(bucket_index, sub_bucket_index),
            None => value,
        }
    }
    /// This function returns the highest value sharing a cell with `value`.
    pub fn highest_equivalent(&self, value: i64) -> i64 {
        self.lowest_equivalent(value).saturating_add(self.equivalent_range_len(value) - 1)
    }
    /// This function returns the value in the middle of the cell containing
    /// `value`.
    pub fn median_equivalent(&self, value: i64) -> i64 {
        self.lowest_equivalent(value).saturating_add(self.equivalent_range_len(value) >> 1)
    }
    /// This function returns the smallest value larger than `value` that
    /// maps to a different cell.
    pub fn next_non_equivalent(&self, value: i64) -> i64 {
        self.lowest_equivalent(value).saturating_add(self.equivalent_range_len(value))
    }
    /// This function determines if `a` and `b` would be counted in the same cell.
    pub fn equivalent(&self, a: i64, b: i64) -> bool {
        self.lowest_equivalent(a) == self.lowest_equivalent(b)
    }
}
