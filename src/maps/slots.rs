//! Fixed-capacity table of lazily created records
//!
//! Mirrors a bounded kernel hash map keyed by a small integer: records come
//! into existence on first use and live until the process exits. Creation is
//! a single `OnceLock::get_or_init`, so two producers racing on the same key
//! always end up sharing one record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

pub struct SlotTable<T> {
    slots: Box<[OnceLock<T>]>,
    rejected: AtomicU64,
}

impl<T> SlotTable<T> {
    /// Create a table accepting keys in `0..capacity`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            rejected: AtomicU64::new(0),
        }
    }

    /// Look up a record, creating it with `init` if absent.
    ///
    /// Returns `None` for keys outside the table; the caller drops its update.
    pub fn get_or_create(&self, key: u32, init: impl FnOnce() -> T) -> Option<&T> {
        match self.slots.get(key as usize) {
            Some(slot) => Some(slot.get_or_init(init)),
            None => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Look up a record without creating it
    pub fn get(&self, key: u32) -> Option<&T> {
        self.slots.get(key as usize).and_then(OnceLock::get)
    }

    /// Keys with a live record, ascending
    pub fn keys(&self) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(key, _)| key as u32)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of updates dropped because their key was out of range
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
