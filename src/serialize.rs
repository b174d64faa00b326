use std::collections::BTreeMap;
use super::Histogram;
use super::config::BucketConfig;

/// A single named scalar of a [Snapshot].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// This function returns the scalar as an integer, if it is one (or is
    /// a float holding an integral value).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Scalar::Int(v) => Some(v),
            Scalar::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Some(f as i64),
            Scalar::Float(_) => None,
        }
    }
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Int(v) => v as f64,
            Scalar::Float(f) => f,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self { Scalar::Int(v) }
}
impl From<i32> for Scalar {
    fn from(v: i32) -> Self { Scalar::Int(v as i64) }
}
impl From<u32> for Scalar {
    fn from(v: u32) -> Self { Scalar::Int(v as i64) }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self { Scalar::Float(v) }
}

/// A [Snapshot] is a flat dump of a [Histogram]'s full state: every layout
/// and statistics field by name, plus the counts in index order.
///
/// Snapshots are not compressed and carry no version; they are meant to be
/// handed across an in-process boundary (or through `serde` with the `serde`
/// feature enabled) and turned back into a [Histogram] with
/// [Histogram::unserialize].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub(crate) fields: BTreeMap<String, Scalar>,
    pub(crate) counts: Option<Vec<u64>>,
}

impl Snapshot {
    /// This function creates an empty snapshot with no fields and no counts.
    pub fn new() -> Snapshot {
        Snapshot::default()
    }
    pub fn get(&self, name: &str) -> Option<Scalar> {
        self.fields.get(name).copied()
    }
    /// This function sets the field `name`, returning its previous value.
    pub fn insert<S: Into<Scalar>>(&mut self, name: &str, value: S) -> Option<Scalar> {
        self.fields.insert(name.to_string(), value.into())
    }
    pub fn remove(&mut self, name: &str) -> Option<Scalar> {
        self.fields.remove(name)
    }
    /// This function iterates over the scalar fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
    pub fn counts(&self) -> Option<&[u64]> {
        self.counts.as_deref()
    }
    pub fn set_counts(&mut self, counts: Vec<u64>) {
        self.counts = Some(counts);
    }
    pub fn clear_counts(&mut self) {
        self.counts = None;
    }

    fn require<T: TryFrom<i64>>(&self, name: &str) -> Result<T, super::Error> {
        let scalar = self.get(name)
            .ok_or_else(|| malformed(format!("missing field {}", name)))?;
        let v = scalar.as_i64()
            .ok_or_else(|| malformed(format!("field {} is not an integer: {:?}", name, scalar)))?;
        T::try_from(v).map_err(|_| malformed(format!("field {} out of range: {}", name, v)))
    }
}

fn malformed(reason: String) -> super::Error {
    super::Error::MalformedSnapshot(reason)
}

impl Histogram {
    /// This function dumps the complete state of the histogram.
    pub fn serialize(&self) -> Snapshot {
        let cfg = &self.config;
        let mut s = Snapshot::new();
        s.insert("lowest_trackable_value", cfg.lowest_trackable_value);
        s.insert("highest_trackable_value", cfg.highest_trackable_value);
        s.insert("unit_magnitude", cfg.unit_magnitude);
        s.insert("significant_figures", cfg.significant_figures);
        s.insert("sub_bucket_half_count_magnitude", cfg.sub_bucket_half_count_magnitude);
        s.insert("sub_bucket_half_count", cfg.sub_bucket_half_count);
        s.insert("sub_bucket_mask", cfg.sub_bucket_mask);
        s.insert("sub_bucket_count", cfg.sub_bucket_count);
        s.insert("bucket_count", cfg.bucket_count);
        s.insert("min_value", self.min_value);
        s.insert("max_value", self.max_value);
        s.insert("normalizing_index_offset", self.normalizing_index_offset);
        s.insert("conversion_ratio", self.conversion_ratio);
        s.insert("counts_len", cfg.counts_len as i64);
        // a saturated total no longer fits the signed field
        s.insert("total_count", i64::try_from(self.total_count).unwrap_or(i64::MAX));
        s.set_counts(self.counts.clone());
        s
    }

    fn from_snapshot(mut snapshot: Snapshot) -> Result<Histogram, super::Error> {
        let counts_len: usize = snapshot.require("counts_len")?;
        let counts = snapshot.counts.take()
            .ok_or_else(|| malformed("missing field counts".to_string()))?;
        if counts.len() != counts_len {
            return Err(malformed(format!("counts has {} cells, counts_len is {}", counts.len(), counts_len)));
        }
        let config = BucketConfig {
            lowest_trackable_value: snapshot.require("lowest_trackable_value")?,
            highest_trackable_value: snapshot.require("highest_trackable_value")?,
            significant_figures: snapshot.require("significant_figures")?,
            unit_magnitude: snapshot.require("unit_magnitude")?,
            sub_bucket_half_count_magnitude: snapshot.require("sub_bucket_half_count_magnitude")?,
            sub_bucket_count: snapshot.require("sub_bucket_count")?,
            sub_bucket_half_count: snapshot.require("sub_bucket_half_count")?,
            sub_bucket_mask: snapshot.require("sub_bucket_mask")?,
            bucket_count: snapshot.require("bucket_count")?,
            counts_len,
        };
        let normalizing_index_offset = match snapshot.get("normalizing_index_offset") {
            Some(_) => snapshot.require("normalizing_index_offset")?,
            None => 0,
        };
        let conversion_ratio = snapshot.get("conversion_ratio").map_or(1.0, |s| s.as_f64());
        Ok(Histogram {
            config,
            counts,
            total_count: snapshot.require("total_count")?,
            min_value: snapshot.require("min_value")?,
            max_value: snapshot.require("max_value")?,
            normalizing_index_offset,
            conversion_ratio,
        })
    }

    /// This function rebuilds a histogram from a [Snapshot].
    ///
    /// Every field is taken verbatim: derived layout fields are not checked
    /// against the trackable range and significant figures.  The snapshot is
    /// rejected only if a required field is missing or not representable, or
    /// if the number of counts disagrees with `counts_len`.
    /// `normalizing_index_offset` and `conversion_ratio` default to 0 and 1.0.
    ///
    /// ```
    /// use fixedhdr::Histogram;
    ///
    /// let mut h = Histogram::new(1, 3_600_000_000, 3)?;
    /// h.record(42);
    /// let copy = Histogram::unserialize(h.serialize())?;
    /// assert_eq!(copy.percentile(50.0), 42);
    /// # Ok::<(), fixedhdr::Error>(())
    /// ```
    pub fn unserialize(snapshot: Snapshot) -> Result<Histogram, super::Error> {
        Histogram::from_snapshot(snapshot).map_err(|e| {
            log::warn!("rejecting snapshot: {}", e);
            e
        })
    }

    /// This function rebuilds a histogram from a [Snapshot] like
    /// [Histogram::unserialize], additionally requiring the layout fields to
    /// match what [BucketConfig::calculate] derives from the trackable range
    /// and significant figures, and `total_count` to match the counts.
    pub fn unserialize_strict(snapshot: Snapshot) -> Result<Histogram, super::Error> {
        let h = Histogram::unserialize(snapshot)?;
        let cfg = &h.config;
        let check = match BucketConfig::calculate(cfg.lowest_trackable_value, cfg.highest_trackable_value, cfg.significant_figures) {
            Err(e) => Err(malformed(format!("layout does not validate: {}", e))),
            Ok(expected) if expected != h.config => {
                Err(malformed("derived layout fields disagree with range and significant figures".to_string()))
            },
            Ok(_) => {
                let observed = h.counts.iter().fold(0u64, |t, c| t.saturating_add(*c));
                if observed != h.total_count {
                    Err(malformed(format!("total_count is {}, counts sum to {}", h.total_count, observed)))
                } else {
                    Ok(())
                }
            },
        };
        match check {
            Ok(()) => Ok(h),
            Err(e) => {
                log::warn!("rejecting snapshot: {}", e);
                Err(e)
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use rand::prelude::*;

    fn sample() -> Histogram {
        let mut rng = rand::rng();
        let mut h = Histogram::new(1, 3_600_000_000, 3).unwrap();
        for _ in 0..5000 {
            h.record(rng.random_range(1..3_600_000_000));
        }
        h.record_corrected(50_000, 10_000);
        h
    }

    #[test]
    fn round_trip() -> Result<(), Error> {
        let href = sample();
        let h = Histogram::unserialize(href.serialize())?;
        assert_eq!(h.count(), href.count());
        assert_eq!(h.min(), href.min());
        assert_eq!(h.max(), href.max());
        for p in [0.0, 50.0, 90.0, 99.0, 99.9, 100.0] {
            assert_eq!(h.percentile(p), href.percentile(p));
        }
        assert_eq!(h.config(), href.config());
        assert_eq!(h.to_string(), href.to_string());
        assert_eq!(h.serialize(), href.serialize());

        let strict = Histogram::unserialize_strict(href.serialize())?;
        assert_eq!(strict.count(), href.count());
        Ok(())
    }

    #[test]
    fn fields() {
        let h = hist![(1, 3_600_000_000, 3); 10, 20];
        let s = h.serialize();
        assert_eq!(s.fields().count(), 15);
        assert_eq!(s.get("counts_len"), Some(Scalar::Int(23552)));
        assert_eq!(s.get("conversion_ratio"), Some(Scalar::Float(1.0)));
        assert_eq!(s.get("min_value"), Some(Scalar::Int(10)));
        assert_eq!(s.get("total_count"), Some(Scalar::Int(2)));
        assert_eq!(s.counts().map(|c| c.len()), Some(23552));

        let empty = hist![(1, 3_600_000_000, 3)].serialize();
        assert_eq!(empty.get("min_value"), Some(Scalar::Int(i64::MAX)));
    }

    #[test]
    fn rejects_malformed() {
        let h = hist![(1, 1000, 2); 10, 20];

        let mut s = h.serialize();
        s.remove("bucket_count");
        assert!(matches!(Histogram::unserialize(s), Err(Error::MalformedSnapshot(_))));

        let mut s = h.serialize();
        s.clear_counts();
        assert!(matches!(Histogram::unserialize(s), Err(Error::MalformedSnapshot(_))));

        let mut s = h.serialize();
        let mut counts = s.counts().unwrap().to_vec();
        counts.push(0);
        s.set_counts(counts);
        assert!(matches!(Histogram::unserialize(s), Err(Error::MalformedSnapshot(_))));

        let mut s = h.serialize();
        s.insert("counts_len", -1i64);
        assert!(matches!(Histogram::unserialize(s), Err(Error::MalformedSnapshot(_))));

        let mut s = h.serialize();
        s.insert("total_count", 2.5);
        assert!(matches!(Histogram::unserialize(s), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn optional_fields() -> Result<(), Error> {
        let h = hist![(1, 1000, 2); 10, 20];
        let mut s = h.serialize();
        s.remove("normalizing_index_offset");
        s.remove("conversion_ratio");
        s.insert("total_count", 2.0);
        let h2 = Histogram::unserialize(s)?;
        assert_eq!(h2.normalizing_index_offset(), 0);
        assert_eq!(h2.conversion_ratio(), 1.0);
        assert_eq!(h2.count(), 2);
        Ok(())
    }

    #[test]
    fn verbatim_trust() -> Result<(), Error> {
        let h = hist![(1, 1000, 2); 10, 20];
        let mut s = h.serialize();
        s.insert("bucket_count", 99u32);
        s.insert("highest_trackable_value", 7i64);
        let h2 = Histogram::unserialize(s.clone())?;
        assert_eq!(h2.config().bucket_count(), 99);
        assert_eq!(h2.count(), 2);
        assert!(matches!(Histogram::unserialize_strict(s), Err(Error::MalformedSnapshot(_))));

        let mut s = h.serialize();
        s.insert("total_count", 3i64);
        assert!(Histogram::unserialize(s.clone()).is_ok());
        assert!(matches!(Histogram::unserialize_strict(s), Err(Error::MalformedSnapshot(_))));

        // nonsense layouts never panic, values just fail to record
        let mut s = h.serialize();
        s.insert("sub_bucket_half_count_magnitude", 70u32);
        let mut h3 = Histogram::unserialize(s)?;
        assert!(!h3.record(10));
        assert_eq!(h3.count(), 2);
        Ok(())
    }
}
