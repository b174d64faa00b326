use super::config::BucketConfig;

use std::fmt;

#[cfg(test)]
macro_rules! bv {
    (($value:expr, $count:expr)) => ( ($value as i64, $count as u64) );
    (($value:expr)) => ( ($value as i64, 1u64) );
    ($value:expr) => ( ($value as i64, 1u64) )
}
#[cfg(test)]
/// hist! macro will turn a layout and a list of values into a histogram.
///
/// The layout is `(lowest, highest, significant_figures)`.  The values can be
/// of the form `value`, `(value)`, or `(value, sample_count)`.  In the first
/// two forms, the omitted `sample_count` defaults to 1.
macro_rules! hist {
    (($lo:expr, $hi:expr, $sf:expr)) => ( $crate::Histogram::new($lo, $hi, $sf).unwrap() );
    (($lo:expr, $hi:expr, $sf:expr); $($bv:tt),+ $(,)?) => ( {
        let mut h = $crate::Histogram::new($lo, $hi, $sf).unwrap();
        [$(bv![$bv]),+].iter().for_each(|x| { h.record_n(x.0, x.1); });
        h
    } )
}

#[derive(Debug,Clone)]
/// A fixed-size histogram counting non-negative integer samples in
/// log-linear cells laid out by a [BucketConfig].
///
/// All memory is allocated at construction.  Recording is O(1) and never
/// allocates; samples outside the trackable range are dropped rather than
/// growing the histogram.  A [Histogram] does no internal synchronization.
pub struct Histogram {
    pub(crate) config: BucketConfig,
    pub(crate) counts: Vec<u64>,
    pub(crate) total_count: u64,
    pub(crate) min_value: i64,
    pub(crate) max_value: i64,
    pub(crate) normalizing_index_offset: i32,
    pub(crate) conversion_ratio: f64,
}

impl Histogram {
    /// This function creates a new, empty histogram tracking values in
    /// `[lowest, highest]` with `significant_figures` digits of precision.
    ///
    /// ```
    /// use fixedhdr::Histogram;
    ///
    /// let mut h = Histogram::new(1, 3_600_000_000, 3)?;
    /// assert!(h.record(1000));
    /// assert!(!h.record(-1));
    /// assert_eq!(h.count(), 1);
    /// # Ok::<(), fixedhdr::Error>(())
    /// ```
    pub fn new(lowest: i64, highest: i64, significant_figures: i64) -> Result<Histogram, super::Error> {
        Ok(Histogram::with_config(BucketConfig::calculate(lowest, highest, significant_figures)?))
    }
    /// This function creates a new, empty histogram using an existing layout.
    pub fn with_config(config: BucketConfig) -> Histogram {
        let h = Histogram {
            config,
            counts: vec![0u64; config.counts_len],
            total_count: 0,
            min_value: i64::MAX,
            max_value: 0,
            normalizing_index_offset: 0,
            conversion_ratio: 1.0,
        };
        log::debug!("histogram [{}, {}] sf={} allocated {} cells ({} bytes)",
            config.lowest_trackable_value, config.highest_trackable_value,
            config.significant_figures, config.counts_len, h.memory_size());
        h
    }
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }
    pub fn normalizing_index_offset(&self) -> i32 {
        self.normalizing_index_offset
    }
    pub fn conversion_ratio(&self) -> f64 {
        self.conversion_ratio
    }
    /// This function returns the number of bytes held by the histogram,
    /// which is fixed for its lifetime.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Histogram>() + self.counts.len() * std::mem::size_of::<u64>()
    }

    /// Maps a logical cell index onto the counts array, rotated by the
    /// normalizing index offset.
    fn normalize_index(&self, index: usize) -> usize {
        let len = self.counts.len() as i64;
        if self.normalizing_index_offset == 0 || len == 0 {
            return index;
        }
        (index as i64 - self.normalizing_index_offset as i64).rem_euclid(len) as usize
    }
    pub(crate) fn count_at_index(&self, index: usize) -> u64 {
        self.counts[self.normalize_index(index)]
    }
    fn update_min_max(&mut self, value: i64) {
        if value < self.min_value {
            self.min_value = value;
        }
        if value > self.max_value {
            self.max_value = value;
        }
    }

    /// This function will record a single sample of `value`.
    ///
    /// Returns `false`, leaving the histogram untouched, if `value` is
    /// negative or falls beyond the cells of this histogram.
    pub fn record(&mut self, value: i64) -> bool {
        self.record_n(value, 1)
    }
    /// This function will record `count` samples of `value`.
    ///
    /// If the samples in a cell exceed `u64::MAX`, they will saturate the
    /// cell and be considered `u64::MAX`.
    pub fn record_n(&mut self, value: i64, count: u64) -> bool {
        let index = match self.config.index_of(value) {
            Some(index) if index < self.counts.len() => index,
            _ => {
                log::trace!("dropping {} samples of out-of-range value {}", count, value);
                return false;
            }
        };
        let slot = self.normalize_index(index);
        self.counts[slot] = self.counts[slot].saturating_add(count);
        self.total_count = self.total_count.saturating_add(count);
        self.update_min_max(value);
        true
    }
    /// This function will record a single sample of `value`, correcting
    /// for coordinated omission.
    ///
    /// When `value` exceeds `expected_interval`, the samples that a stalled
    /// recorder would have missed are backfilled at `value - interval`,
    /// `value - 2*interval`, ... down to `expected_interval`.
    ///
    /// ```
    /// use fixedhdr::Histogram;
    ///
    /// let mut h = Histogram::new(1, 3_600_000_000, 3)?;
    /// assert!(h.record_corrected(1000, 100));
    /// assert_eq!(h.count(), 10);
    /// # Ok::<(), fixedhdr::Error>(())
    /// ```
    pub fn record_corrected(&mut self, value: i64, expected_interval: i64) -> bool {
        self.record_corrected_n(value, 1, expected_interval)
    }
    /// This function will record `count` samples of `value`, correcting for
    /// coordinated omission.
    ///
    /// Returns `false` only if `value` itself could not be recorded.
    /// Backfilled samples that cannot be recorded are dropped.
    pub fn record_corrected_n(&mut self, value: i64, count: u64, expected_interval: i64) -> bool {
        if !self.record_n(value, count) {
            return false;
        }
        if expected_interval <= 0 || value <= expected_interval {
            return true;
        }
        let mut dropped = 0u64;
        let mut missing = value - expected_interval;
        while missing >= expected_interval {
            if !self.record_n(missing, count) {
                dropped = dropped.saturating_add(count);
            }
            missing -= expected_interval;
        }
        if dropped != 0 {
            log::trace!("dropped {} backfilled samples correcting {}", dropped, value);
        }
        true
    }
    /// This function will empty the histogram of all recorded samples.
    pub fn reset(&mut self) {
        self.counts.fill(0);
        self.total_count = 0;
        self.min_value = i64::MAX;
        self.max_value = 0;
    }

    /// This function iterates over the non-empty cells in value order,
    /// yielding each cell's lowest equivalent value and sample count.
    pub fn iter_recorded(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        (0..self.counts.len()).filter_map(move |index| {
            match self.count_at_index(index) {
                0 => None,
                count => Some((self.config.value_at_index(index), count)),
            }
        })
    }

    /// This function will merge the samples of `other` into the caller and
    /// return the number of samples that could not be represented.
    ///
    /// Histograms sharing a [BucketConfig] are merged cell by cell.  Otherwise
    /// each cell of `other` is re-recorded at its lowest equivalent value,
    /// dropping samples beyond the caller's range.  Either way, when nothing
    /// is dropped the caller's min and max take in the exact extrema of
    /// `other`; after a lossy merge they reflect the re-recorded cell values.
    pub fn merge(&mut self, other: &Histogram) -> u64 {
        if self.config == other.config && self.counts.len() == other.counts.len() {
            let mut observed = 0u64;
            for index in 0..other.counts.len() {
                let count = other.count_at_index(index);
                if count != 0 {
                    let slot = self.normalize_index(index);
                    self.counts[slot] = self.counts[slot].saturating_add(count);
                    observed = observed.saturating_add(count);
                }
            }
            self.total_count = self.total_count.saturating_add(observed);
            if observed != 0 {
                self.update_min_max(other.min_value);
                self.update_min_max(other.max_value);
            }
            return 0;
        }
        let (min_before, max_before) = (self.min_value, self.max_value);
        let mut merged = 0u64;
        let mut dropped = 0u64;
        for (value, count) in other.iter_recorded() {
            if self.record_n(value, count) {
                merged = merged.saturating_add(count);
            } else {
                dropped = dropped.saturating_add(count);
            }
        }
        if dropped == 0 && merged != 0 {
            self.min_value = min_before.min(other.min_value);
            self.max_value = max_before.max(other.max_value);
        }
        if dropped != 0 {
            log::debug!("merge dropped {} samples outside [{}, {}]",
                dropped, self.config.lowest_trackable_value, self.config.highest_trackable_value);
        }
        dropped
    }
}

impl fmt::Display for Histogram {
    /// This function formats the layout of the histogram (not its
    /// distribution) as one `name: value` line per field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = &self.config;
        writeln!(f, "lowest_trackable_value:  {}", cfg.lowest_trackable_value)?;
        writeln!(f, "highest_trackable_value: {}", cfg.highest_trackable_value)?;
        writeln!(f, "significant_figures:     {}", cfg.significant_figures)?;
        writeln!(f, "unit_magnitude:          {}", cfg.unit_magnitude)?;
        writeln!(f, "total_count:             {}", self.total_count)?;
        writeln!(f, "bucket_count:            {}", cfg.bucket_count)?;
        writeln!(f, "sub_bucket_count:        {}", cfg.sub_bucket_count)?;
        write!(f, "counts_len:              {}", cfg.counts_len)
    }
}
