use super::Histogram;

const PERCENTILE_SCALE: u128 = 1_000_000;

impl Histogram {
    /// Accumulates `[sum(count), sum(count * (value - center)^k)]` over the
    /// non-empty cells, using each cell's lowest equivalent value.
    fn accum_moment(&self, center: f64, k: i32) -> [f64; 2] {
        self.iter_recorded().fold([0.0; 2], |v, (value, count)| {
            let cardinality = count as f64;
            [v[0] + cardinality, v[1] + (value as f64 - center).powi(k) * cardinality]
        })
    }
    /// This function will return the total number of recorded samples.
    pub fn count(&self) -> u64 {
        self.total_count
    }
    /// This function will return the smallest recorded value, or 0 if the
    /// histogram is empty.
    pub fn min(&self) -> i64 {
        if self.total_count == 0 { 0 } else { self.min_value }
    }
    /// This function will return the largest recorded value, or 0 if the
    /// histogram is empty.
    pub fn max(&self) -> i64 {
        if self.total_count == 0 { 0 } else { self.max_value }
    }
    /// Calculate an approximate mean across all samples.
    ///
    /// Each sample is approximated by the lowest value of its cell.  An
    /// empty histogram has a mean of 0.
    pub fn mean(&self) -> f64 {
        let r = self.accum_moment(0.0, 1);
        if r[0] == 0.0 {
            0.0
        } else {
            r[1] / r[0]
        }
    }
    /// Calculate the approximate (population) standard deviation across all
    /// samples.
    pub fn stddev(&self) -> f64 {
        let mean = self.mean();
        let r = self.accum_moment(mean, 2);
        if r[0] == 0.0 {
            0.0
        } else {
            (r[1] / r[0]).sqrt()
        }
    }
    /// Calculate the value at percentile `p`.
    ///
    /// `p` is clamped to `[0,100]`.  The result is the lowest equivalent
    /// value of the first cell at which the cumulative count reaches
    /// `ceil(p * count / 100)` (and at least one sample).  An empty
    /// histogram yields 0.
    ///
    /// ```
    /// use fixedhdr::Histogram;
    ///
    /// let mut h = Histogram::new(1, 3_600_000_000, 3)?;
    /// for v in [1, 10, 100, 1000] {
    ///     h.record(v);
    /// }
    /// assert_eq!(h.percentile(50.0), 10);
    /// assert_eq!(h.percentile(100.0), 1000);
    /// # Ok::<(), fixedhdr::Error>(())
    /// ```
    pub fn percentile(&self, p: f64) -> i64 {
        if self.total_count == 0 {
            return 0;
        }
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        // rank in fixed point (p to 1e-6) so integral ranks stay exact
        let scaled = (p * PERCENTILE_SCALE as f64).round() as u128;
        let denominator = 100 * PERCENTILE_SCALE;
        let target = ((scaled * self.total_count as u128 + denominator - 1) / denominator).max(1);
        let mut cumulative = 0u64;
        for index in 0..self.counts.len() {
            cumulative = cumulative.saturating_add(self.count_at_index(index));
            if cumulative as u128 >= target {
                return self.config.value_at_index(index);
            }
        }
        0
    }
    /// Count the samples in the cell containing `value`.
    pub fn count_at(&self, value: i64) -> u64 {
        match self.config.index_of(value) {
            Some(index) if index < self.counts.len() => self.count_at_index(index),
            _ => 0,
        }
    }
    /// Count the samples in all cells from the one containing `low` through
    /// the one containing `high`, inclusive.
    pub fn count_between(&self, low: i64, high: i64) -> u64 {
        let last = match self.counts.len() {
            0 => return 0,
            len => len - 1,
        };
        let low_index = self.config.index_of(low.max(0)).unwrap_or(0);
        let high_index = match high {
            h if h < 0 => return 0,
            h => self.config.index_of(h).map_or(last, |i| i.min(last)),
        };
        (low_index..=high_index).fold(0u64, |total, index| total.saturating_add(self.count_at_index(index)))
    }
    /// Calculate the percentage of samples at or below the cell containing
    /// `value`.  An empty histogram yields 100.
    pub fn percentile_below(&self, value: i64) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        if value < 0 {
            return 0.0;
        }
        let below = self.count_between(0, value);
        100.0 * below as f64 / self.total_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn scenario() -> Result<(), crate::Error> {
        let mut h = Histogram::new(1, 3_600_000_000, 3)?;
        for v in [1, 10, 100, 1000] {
            assert!(h.record(v));
        }
        assert_eq!(h.count(), 4);
        assert_eq!(h.min(), 1);
        assert_eq!(h.max(), 1000);
        let p50 = h.percentile(50.0);
        assert!(p50 >= 10 && p50 <= 100);
        assert_eq!(p50, 10);
        Ok(())
    }

    #[test]
    fn empty() {
        let h = hist![(1, 3_600_000_000, 3)];
        assert_eq!(h.count(), 0);
        assert_eq!(h.min(), 0);
        assert_eq!(h.max(), 0);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.stddev(), 0.0);
        assert_eq!(h.percentile(0.0), 0);
        assert_eq!(h.percentile(99.9), 0);
        assert_eq!(h.count_between(0, 1000), 0);
        assert_eq!(h.percentile_below(10), 100.0);
    }

    #[test]
    fn percentiles() {
        let h = hist![(1, 3_600_000_000, 3); 1, 10, 100, 1000];
        assert_eq!(h.percentile(0.0), 1);
        assert_eq!(h.percentile(-5.0), 1);
        assert_eq!(h.percentile(25.0), 1);
        assert_eq!(h.percentile(25.1), 10);
        assert_eq!(h.percentile(75.0), 100);
        assert_eq!(h.percentile(99.9), 1000);
        assert_eq!(h.percentile(100.0), 1000);
        assert_eq!(h.percentile(250.0), 1000);

        let mut h = hist![(1, 3_600_000_000, 3)];
        for v in 1..=10 {
            h.record(v);
        }
        assert_eq!(h.percentile(30.0), 3);
        assert_eq!(h.percentile(90.0), 9);

        // beyond single unit resolution the lowest equivalent value is reported
        let h = hist![(1, 3_600_000_000, 3); 10007, (5, 3)];
        assert_eq!(h.percentile(100.0), 10000);
        assert_eq!(h.percentile(50.0), 5);
    }

    #[test]
    fn percentile_rank_exact() {
        for total in [1i64, 7, 250, 375, 999, 1000, 1999] {
            let mut h = hist![(1, 1_000_000, 3)];
            for v in 1..=total {
                h.record(v);
            }
            for p10 in 0..=1000i64 {
                let expected = ((p10 * total + 999) / 1000).max(1);
                assert_eq!(h.percentile(p10 as f64 / 10.0), expected, "total={} p={}", total, p10 as f64 / 10.0);
            }
        }
    }

    #[test]
    fn moments() {
        let h = hist![(1, 3_600_000_000, 3); 1, 10, 100, 1000];
        assert_relative_eq!(h.mean(), 277.75);
        let variance = [1.0f64, 10.0, 100.0, 1000.0].iter()
            .map(|v| (v - 277.75).powi(2))
            .sum::<f64>() / 4.0;
        assert_relative_eq!(h.stddev(), variance.sqrt(), epsilon = 1e-9);

        let h = hist![(1, 3_600_000_000, 3); (42, 7)];
        assert_relative_eq!(h.mean(), 42.0);
        assert_relative_eq!(h.stddev(), 0.0);

        let h = hist![(1, 3_600_000_000, 3); 10007];
        assert_relative_eq!(h.mean(), 10000.0);
    }

    #[test]
    fn counts() {
        let h = hist![(1, 3_600_000_000, 3); 1, (10, 4), 100, 1000, 10007];
        assert_eq!(h.count_at(10), 4);
        assert_eq!(h.count_at(10001), 1);
        assert_eq!(h.count_at(11), 0);
        assert_eq!(h.count_at(-3), 0);
        assert_eq!(h.count_at(i64::MAX), 0);
        assert_eq!(h.count_between(1, 100), 6);
        assert_eq!(h.count_between(2, 10), 4);
        assert_eq!(h.count_between(0, i64::MAX), 8);
        assert_eq!(h.count_between(-10, -1), 0);
        assert_relative_eq!(h.percentile_below(100), 75.0);
        assert_relative_eq!(h.percentile_below(-1), 0.0);
        assert_relative_eq!(h.percentile_below(1 << 40), 100.0);
    }
}
