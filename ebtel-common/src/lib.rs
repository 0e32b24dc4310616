//! Shared types between kernel probes and userspace
//!
//! This crate defines the raw event record and table geometry that must be:
//! - `#[repr(C)]` for stable memory layout
//! - `no_std` compatible for eBPF
//! - Shared between kernel probes and the userspace agent

#![cfg_attr(not(feature = "userspace"), no_std)]

/// Number of log2 histogram slots per node
pub const MAX_SLOTS: usize = 64;

/// Default upper bound on node identifiers held by the per-node tables
pub const MAX_NODES: usize = 256;

/// Default upper bound on distinct drop-reason codes
pub const MAX_DROP_REASONS: usize = 64;

/// Default upper bound on in-flight scheduler wakeups keyed by pid
pub const MAX_INFLIGHT_WAKEUPS: usize = 10240;

/// Raw telemetry record as written into the kernel ring buffer
///
/// Layout (32 bytes total, 8-byte aligned):
/// - node_id: Aggregation unit the sample belongs to
/// - event_type: Wire code, see [`event_type`]
/// - value: Sample value (milliseconds for RTT/runqlat, 1 for counters)
/// - timestamp_ns: Kernel monotonic timestamp in nanoseconds
/// - extra_data: Event specific payload (drop reason for drop events)
#[repr(C)]
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "userspace", derive(PartialEq, Eq))]
pub struct TelemetryEvent {
    pub node_id: u32,
    pub event_type: u32,
    pub value: u64,
    pub timestamp_ns: u64,
    pub extra_data: u32,
    pub _padding: u32,
}

/// Event type wire codes
pub mod event_type {
    pub const RTT: u32 = 1;
    pub const RETRANS: u32 = 2;
    pub const DROP: u32 = 3;
    pub const RUNQLAT: u32 = 4;
}

/// Map a sample value to its log2 histogram slot.
///
/// Slot `i` holds values in `[2^i, 2^(i+1))`; zero shares slot 0 with one
/// and everything at or above `2^63` lands in the last slot.
#[inline(always)]
pub fn value_to_slot(mut value: u64) -> usize {
    let mut slot = 0;
    while value > 1 && slot < MAX_SLOTS - 1 {
        value >>= 1;
        slot += 1;
    }
    slot
}

/// Convert the kernel's smoothed RTT (microseconds, left shifted by 3)
/// into whole milliseconds.
#[inline(always)]
pub fn srtt_us_to_ms(srtt_us: u32) -> u64 {
    ((srtt_us >> 3) / 1000) as u64
}

#[cfg(feature = "userspace")]
const _: () = {
    assert!(
        core::mem::size_of::<TelemetryEvent>() == 32,
        "TelemetryEvent must be exactly 32 bytes"
    );
    assert!(
        core::mem::align_of::<TelemetryEvent>() == 8,
        "TelemetryEvent must be 8-byte aligned"
    );
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_slot_powers_of_two() {
        for k in 0..64u32 {
            assert_eq!(value_to_slot(1u64 << k), k as usize, "2^{}", k);
        }
    }

    #[test]
    fn test_value_to_slot_between_powers() {
        assert_eq!(value_to_slot(0), 0);
        assert_eq!(value_to_slot(2), 1);
        assert_eq!(value_to_slot(3), 1);
        assert_eq!(value_to_slot(5), 2);
        assert_eq!(value_to_slot(1023), 9);
        assert_eq!(value_to_slot(1025), 10);
    }

    #[test]
    fn test_value_to_slot_clamps() {
        assert_eq!(value_to_slot(u64::MAX), MAX_SLOTS - 1);
        assert_eq!(value_to_slot((1u64 << 63) + 1), MAX_SLOTS - 1);
    }

    #[test]
    fn test_srtt_conversion() {
        // 25ms smoothed RTT as the kernel stores it
        assert_eq!(srtt_us_to_ms(25_000 << 3), 25);
        assert_eq!(srtt_us_to_ms(999 << 3), 0);
    }
}
