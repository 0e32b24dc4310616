use super::slots::SlotTable;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global occurrence counts keyed by kernel drop-reason code
pub struct DropReasonTable {
    inner: SlotTable<AtomicU64>,
}

impl DropReasonTable {
    pub fn new(max_reasons: usize) -> Self {
        Self {
            inner: SlotTable::with_capacity(max_reasons),
        }
    }

    pub fn record(&self, reason: u32) {
        if let Some(count) = self.inner.get_or_create(reason, || AtomicU64::new(0)) {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self, reason: u32) -> u64 {
        self.inner
            .get(reason)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// All observed `(reason, count)` pairs, ascending by reason
    pub fn snapshot(&self) -> Vec<(u32, u64)> {
        self.inner
            .keys()
            .into_iter()
            .map(|reason| (reason, self.count(reason)))
            .collect()
    }

    pub fn rejected(&self) -> u64 {
        self.inner.rejected()
    }
}
