//! A fixed-memory, constant-time HDR histogram engine.
//!
//! Use this crate to record non-negative integer measurements (typically
//! latencies) on hot paths and answer percentile, mean and standard deviation
//! queries with a bounded relative error.  The memory of a [Histogram] is
//! sized once from its trackable range and significant figures; recording
//! never allocates, and samples outside the range are dropped.
//!
//! # Examples
//!
//! ```
//! use fixedhdr::Histogram;
//!
//! // Track 1us through 1 hour (in microseconds) to 3 significant figures.
//! let mut perf = Histogram::new(1, 3_600_000_000, 3)?;
//!
//! for latency in [120, 95, 4_000, 101, 99] {
//!     perf.record(latency);
//! }
//! // A 1s stall while expecting one call every 100ms.
//! perf.record_corrected(1_000_000, 100_000);
//!
//! println!("mean: {}us, p99: {}us", perf.mean(), perf.percentile(99.0));
//! assert_eq!(perf.max(), 1_000_000);
//! # Ok::<(), fixedhdr::Error>(())
//! ```
mod config;
mod bucket;
#[macro_use]
mod histogram;
mod analysis;
mod serialize;
mod serde;

pub use config::BucketConfig;
pub use histogram::Histogram;
pub use serialize::{Scalar, Snapshot};

/// The release of this engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("lowest trackable value must be >= 1 and highest trackable value must be > lowest*2")]
    InvalidRange,
    #[error("significant figures must be 1-5")]
    InvalidSignificantFigures,
    #[error("bucket layout exceeds the addressable range")]
    ConfigOverflow,
    #[error("malformed snapshot: {}", .0)]
    MalformedSnapshot(String),
}

#[cfg(test)]
mod tests {
    #[test]
    fn version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::VERSION, env!("CARGO_PKG_VERSION"));
    }
}
