use crate::maps::NodeCountersSnapshot;
use std::time::Instant;

/// Per-second rate between two samples of a monotonic counter.
///
/// Returns `previous_rate` unchanged when no time has elapsed. A counter that
/// went backwards yields a negative rate; callers treat that as a reset.
pub fn rate(current: u64, previous: u64, elapsed_secs: f64, previous_rate: f64) -> f64 {
    if elapsed_secs > 0.0 {
        (current as f64 - previous as f64) / elapsed_secs
    } else {
        previous_rate
    }
}

/// Rate baseline for one node, owned by the aggregator
#[derive(Debug, Clone, Default)]
pub struct RateState {
    prev_retrans: u64,
    prev_drops: u64,
    prev_at: Option<Instant>,
    retrans_rate: f64,
    drop_rate: f64,
}

impl RateState {
    /// Fold in a new counter snapshot taken at `now`.
    /// Returns `(tcp_retrans_rate, drop_rate)`.
    ///
    /// The first snapshot only records the baseline and reports zero rates.
    pub fn update(&mut self, counters: &NodeCountersSnapshot, now: Instant) -> (f64, f64) {
        if let Some(prev_at) = self.prev_at {
            let elapsed = now.saturating_duration_since(prev_at).as_secs_f64();
            if elapsed <= 0.0 {
                return (self.retrans_rate, self.drop_rate);
            }
            self.retrans_rate = rate(
                counters.retrans_count,
                self.prev_retrans,
                elapsed,
                self.retrans_rate,
            );
            self.drop_rate = rate(counters.drop_count, self.prev_drops, elapsed, self.drop_rate);
        }

        self.prev_retrans = counters.retrans_count;
        self.prev_drops = counters.drop_count;
        self.prev_at = Some(now);

        (self.retrans_rate, self.drop_rate)
    }
}
