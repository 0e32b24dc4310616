//! Percentile estimation from power-of-two histograms
//!
//! Estimates are the lower bound of the bucket holding the target rank, so
//! every result is an exact power of two (or 0 for an empty histogram).
//! There is no interpolation inside a bucket.

use crate::maps::HistogramSnapshot;

/// Estimate the value at percentile `p` (0-100) of `histogram`.
///
/// The target rank is `total * p / 100` truncated to an integer and at least
/// 1, so it always falls in a bucket holding samples; buckets are walked from 0 upward until the running count reaches it, and `2^index`
/// of that bucket is returned. `p` outside 0-100 is clamped.
pub fn percentile(histogram: &HistogramSnapshot, p: f64) -> f64 {
    let total = histogram.total();
    if total == 0 {
        return 0.0;
    }

    let p = p.clamp(0.0, 100.0);
    let target = ((total as f64 * p / 100.0) as u64).max(1);

    let mut running = 0u64;
    for (index, &count) in histogram.buckets.iter().enumerate() {
        running += count;
        if running >= target {
            return bucket_lower_bound(index);
        }
    }

    0.0
}

fn bucket_lower_bound(index: usize) -> f64 {
    2f64.powi(index as i32)
}
