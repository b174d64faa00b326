use std::fmt;

/// A [BucketConfig] describes the log-linear layout of a histogram's counts.
///
/// The layout is fully determined by the trackable range and the number of
/// significant decimal digits of precision.  Values are split into
/// power-of-two buckets, each of which is linearly subdivided into
/// `sub_bucket_count` cells (only the upper half of which is used beyond the
/// first bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    pub(crate) lowest_trackable_value: i64,
    pub(crate) highest_trackable_value: i64,
    pub(crate) significant_figures: i64,
    pub(crate) unit_magnitude: u32,
    pub(crate) sub_bucket_half_count_magnitude: u32,
    pub(crate) sub_bucket_count: u32,
    pub(crate) sub_bucket_half_count: u32,
    pub(crate) sub_bucket_mask: i64,
    pub(crate) bucket_count: u32,
    pub(crate) counts_len: usize,
}

/// Number of buckets (starting at 1) needed so that the bucket layout can
/// represent `value`.
fn buckets_needed_to_cover(value: i64, sub_bucket_count: u32, unit_magnitude: u32) -> u32 {
    let mut smallest_untrackable = (sub_bucket_count as i64) << unit_magnitude;
    let mut buckets = 1u32;
    while smallest_untrackable <= value {
        if smallest_untrackable > i64::MAX / 2 {
            return buckets + 1;
        }
        smallest_untrackable <<= 1;
        buckets += 1;
    }
    buckets
}

/// ceil(log2(v)) for v >= 1, in exact integer arithmetic.
fn ceil_log2(v: u64) -> u32 {
    if v <= 1 { 0 } else { 64 - (v - 1).leading_zeros() }
}

impl BucketConfig {
    /// This function computes the bucket layout for values in
    /// `[lowest, highest]` with `significant_figures` decimal digits of
    /// precision.
    ///
    /// `lowest` must be at least 1, `highest` must be more than twice
    /// `lowest` and `significant_figures` must fall within `[1,5]`.
    ///
    /// ```
    /// use fixedhdr::BucketConfig;
    ///
    /// let cfg = BucketConfig::calculate(1, 3_600_000_000, 3).unwrap();
    /// assert_eq!(cfg.counts_len(), 23552);
    /// assert_eq!(cfg.sub_bucket_count(), 2048);
    /// ```
    pub fn calculate(lowest: i64, highest: i64, significant_figures: i64) -> Result<BucketConfig, super::Error> {
        if lowest < 1 || lowest.checked_mul(2).map_or(true, |twice| highest <= twice) {
            return Err(super::Error::InvalidRange);
        }
        if !(1..=5).contains(&significant_figures) {
            return Err(super::Error::InvalidSignificantFigures);
        }

        let largest_value_with_single_unit_resolution = 2 * 10u64.pow(significant_figures as u32);
        let sub_bucket_count_magnitude = ceil_log2(largest_value_with_single_unit_resolution);
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude.max(2) - 1;
        let unit_magnitude = 63 - (lowest as u64).leading_zeros();
        if unit_magnitude + sub_bucket_half_count_magnitude > 61 {
            return Err(super::Error::ConfigOverflow);
        }

        let sub_bucket_count = 1u32 << (sub_bucket_half_count_magnitude + 1);
        let sub_bucket_half_count = sub_bucket_count / 2;
        let sub_bucket_mask = ((sub_bucket_count as i64) - 1) << unit_magnitude;
        let bucket_count = buckets_needed_to_cover(highest, sub_bucket_count, unit_magnitude);

        // Indices are handed to callers (and snapshots) as i32-sized values.
        let counts_len = (bucket_count as u64 + 1) * sub_bucket_half_count as u64;
        if counts_len > i32::MAX as u64 {
            return Err(super::Error::ConfigOverflow);
        }

        Ok(BucketConfig {
            lowest_trackable_value: lowest,
            highest_trackable_value: highest,
            significant_figures,
            unit_magnitude,
            sub_bucket_half_count_magnitude,
            sub_bucket_count,
            sub_bucket_half_count,
            sub_bucket_mask,
            bucket_count,
            counts_len: counts_len as usize,
        })
    }
    pub fn lowest_trackable_value(&self) -> i64 {
        self.lowest_trackable_value
    }
    pub fn highest_trackable_value(&self) -> i64 {
        self.highest_trackable_value
    }
    pub fn significant_figures(&self) -> i64 {
        self.significant_figures
    }
    /// The power-of-two exponent of the smallest distinguishable unit.
    pub fn unit_magnitude(&self) -> u32 {
        self.unit_magnitude
    }
    pub fn sub_bucket_half_count_magnitude(&self) -> u32 {
        self.sub_bucket_half_count_magnitude
    }
    pub fn sub_bucket_count(&self) -> u32 {
        self.sub_bucket_count
    }
    pub fn sub_bucket_half_count(&self) -> u32 {
        self.sub_bucket_half_count
    }
    pub fn sub_bucket_mask(&self) -> i64 {
        self.sub_bucket_mask
    }
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }
    /// The number of countable cells in a histogram using this layout.
    pub fn counts_len(&self) -> usize {
        self.counts_len
    }
}

impl fmt::Display for BucketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lowest_trackable_value:  {}", self.lowest_trackable_value)?;
        writeln!(f, "highest_trackable_value: {}", self.highest_trackable_value)?;
        writeln!(f, "significant_figures:     {}", self.significant_figures)?;
        writeln!(f, "unit_magnitude:          {}", self.unit_magnitude)?;
        writeln!(f, "bucket_count:            {}", self.bucket_count)?;
        writeln!(f, "sub_bucket_count:        {}", self.sub_bucket_count)?;
        write!(f, "counts_len:              {}", self.counts_len)
    }
}
