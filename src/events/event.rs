use crate::{EbtelError, Result};
use ebtel_common::{event_type, TelemetryEvent};
use std::mem;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Rtt,
    Retrans,
    Drop,
    Runqlat,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Rtt,
        EventType::Retrans,
        EventType::Drop,
        EventType::Runqlat,
    ];

    pub const fn code(&self) -> u32 {
        match self {
            EventType::Rtt => event_type::RTT,
            EventType::Retrans => event_type::RETRANS,
            EventType::Drop => event_type::DROP,
            EventType::Runqlat => event_type::RUNQLAT,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            event_type::RTT => Some(EventType::Rtt),
            event_type::RETRANS => Some(EventType::Retrans),
            event_type::DROP => Some(EventType::Drop),
            event_type::RUNQLAT => Some(EventType::Runqlat),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Rtt => "rtt",
            EventType::Retrans => "retrans",
            EventType::Drop => "drop",
            EventType::Runqlat => "runqlat",
        }
    }

    pub(crate) const fn index(&self) -> usize {
        match self {
            EventType::Rtt => 0,
            EventType::Retrans => 1,
            EventType::Drop => 2,
            EventType::Runqlat => 3,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discrete occurrence published by an instrumentation callback.
/// Consumed exactly once by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledEvent {
    pub node_id: u32,
    pub event_type: EventType,
    pub value: u64,
    pub timestamp_ns: u64,
    pub extra_data: u32,
}

impl SampledEvent {
    /// Decode one raw ring buffer record
    pub fn decode(data: &[u8]) -> Option<Self> {
        let expected_size = mem::size_of::<TelemetryEvent>();
        if data.len() != expected_size {
            warn!(
                "Malformed event: expected {} bytes, got {} bytes - skipping",
                expected_size,
                data.len()
            );
            return None;
        }

        let u32_at = |at: usize| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&data[at..at + 4]);
            u32::from_ne_bytes(bytes)
        };
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[at..at + 8]);
            u64::from_ne_bytes(bytes)
        };

        let raw = TelemetryEvent {
            node_id: u32_at(0),
            event_type: u32_at(4),
            value: u64_at(8),
            timestamp_ns: u64_at(16),
            extra_data: u32_at(24),
            _padding: 0,
        };

        match Self::try_from(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("{} - skipping", e);
                None
            }
        }
    }
}

impl TryFrom<TelemetryEvent> for SampledEvent {
    type Error = EbtelError;

    fn try_from(raw: TelemetryEvent) -> Result<Self> {
        let event_type = EventType::from_code(raw.event_type)
            .ok_or_else(|| EbtelError::Decode(format!("unknown event type {}", raw.event_type)))?;

        Ok(Self {
            node_id: raw.node_id,
            event_type,
            value: raw.value,
            timestamp_ns: raw.timestamp_ns,
            extra_data: raw.extra_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_bytes(node_id: u32, event_type: u32, value: u64, ts: u64, extra: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&node_id.to_ne_bytes());
        buf.extend_from_slice(&event_type.to_ne_bytes());
        buf.extend_from_slice(&value.to_ne_bytes());
        buf.extend_from_slice(&ts.to_ne_bytes());
        buf.extend_from_slice(&extra.to_ne_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf
    }

    #[test]
    fn test_decode_drop_event() {
        let data = raw_bytes(3, event_type::DROP, 1, 123_456, 7);
        let event = SampledEvent::decode(&data).expect("valid record");

        assert_eq!(event.node_id, 3);
        assert_eq!(event.event_type, EventType::Drop);
        assert_eq!(event.value, 1);
        assert_eq!(event.timestamp_ns, 123_456);
        assert_eq!(event.extra_data, 7);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let data = raw_bytes(0, event_type::RTT, 5, 0, 0);
        assert!(SampledEvent::decode(&data[..31]).is_none());
        assert!(SampledEvent::decode(&[]).is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let data = raw_bytes(0, 9, 5, 0, 0);
        assert!(SampledEvent::decode(&data).is_none());
    }

    #[test]
    fn test_event_type_codes() {
        for ty in EventType::ALL {
            assert_eq!(EventType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(EventType::from_code(0), None);
        assert_eq!(EventType::Runqlat.to_string(), "runqlat");
    }
}
