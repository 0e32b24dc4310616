use crate::events::EventType;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 1-in-N publication rates per event type.
///
/// Sampling only thins the event stream; counters and histograms are always
/// updated. `1` publishes every event, `0` publishes none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingPolicy {
    pub rtt: u32,
    pub retrans: u32,
    pub drop: u32,
    pub runqlat: u32,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            rtt: 100,
            retrans: 1,
            drop: 10,
            runqlat: 100,
        }
    }
}

impl SamplingPolicy {
    /// Publish every event
    pub const fn unsampled() -> Self {
        Self {
            rtt: 1,
            retrans: 1,
            drop: 1,
            runqlat: 1,
        }
    }

    pub const fn one_in(&self, event_type: EventType) -> u32 {
        match event_type {
            EventType::Rtt => self.rtt,
            EventType::Retrans => self.retrans,
            EventType::Drop => self.drop,
            EventType::Runqlat => self.runqlat,
        }
    }

    pub fn should_publish(&self, event_type: EventType) -> bool {
        self.should_publish_with(event_type, &mut rand::thread_rng())
    }

    pub fn should_publish_with<R: Rng + ?Sized>(&self, event_type: EventType, rng: &mut R) -> bool {
        match self.one_in(event_type) {
            0 => false,
            1 => true,
            n => rng.gen_range(0..n) == 0,
        }
    }
}
