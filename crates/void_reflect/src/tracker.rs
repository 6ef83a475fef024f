//! Allocation tracking
//!
//! When enabled, the registry records every instance it creates and every
//! instance released back through [`Registry::release`](crate::Registry::release),
//! together with the nested elements the released instance owned. Anything
//! still live when the registry is dropped is reported as a leak.

use crate::object::Object;
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Live instance registry keyed by heap address
#[derive(Default)]
pub struct Tracker {
    live: Mutex<HashMap<usize, &'static str>>,
    created: AtomicU64,
    deleted: AtomicU64,
}

/// Address used as the tracking key, `None` for zero-sized objects
pub(crate) fn address_of(object: &dyn Object) -> Option<usize> {
    if core::mem::size_of_val(object) == 0 {
        None
    } else {
        Some(object as *const _ as *const () as usize)
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new instance
    pub fn track_create(&self, object: &dyn Object) {
        let Some(address) = address_of(object) else {
            return;
        };
        self.created.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.live.lock().insert(address, object.class_name()) {
            log::error!(
                "Address {:#x} reused by {} while {} was never released",
                address,
                object.class_name(),
                previous
            );
        }
    }

    /// Record a released instance, false for unknown or already released addresses
    pub fn track_delete(&self, object: &dyn Object) -> bool {
        let Some(address) = address_of(object) else {
            return true;
        };
        match self.live.lock().remove(&address) {
            Some(_) => {
                self.deleted.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                log::error!(
                    "Release of untracked {} at {:#x} (double delete or foreign allocation)",
                    object.class_name(),
                    address
                );
                false
            }
        }
    }

    /// Record the release of an instance if it is tracked, silently otherwise
    pub fn forget(&self, object: &dyn Object) -> bool {
        let Some(address) = address_of(object) else {
            return false;
        };
        let removed = self.live.lock().remove(&address).is_some();
        if removed {
            self.deleted.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    /// Snapshot of the live instances, sorted by address
    pub fn leaks(&self) -> Vec<(usize, &'static str)> {
        let mut leaks: Vec<_> = self.live.lock().iter().map(|(a, n)| (*a, *n)).collect();
        leaks.sort_unstable();
        leaks
    }

    /// Log every live instance
    pub fn dump_leaks(&self) {
        let leaks = self.leaks();
        if leaks.is_empty() {
            return;
        }
        log::warn!("{} reflected object(s) were never released", leaks.len());
        for (address, name) in leaks {
            log::warn!("  {} at {:#x}", name, address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Reflect;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Blob {
        payload: u64,
    }

    impl Reflect for Blob {
        const NAME: &'static str = "Blob";
    }

    #[test]
    fn test_create_delete() {
        let tracker = Tracker::new();
        let a = Box::new(Blob { payload: 1 });
        let b = Box::new(Blob { payload: 2 });
        tracker.track_create(&*a);
        tracker.track_create(&*b);
        assert_eq!(tracker.live_count(), 2);

        assert!(tracker.track_delete(&*a));
        assert_eq!(tracker.leaks(), vec![(address_of(&*b).unwrap(), "Blob")]);
        assert_eq!(tracker.created_count(), 2);
        assert_eq!(tracker.deleted_count(), 1);
    }

    #[test]
    fn test_double_delete_reported() {
        let tracker = Tracker::new();
        let a = Box::new(Blob::default());
        tracker.track_create(&*a);
        assert!(tracker.track_delete(&*a));
        assert!(!tracker.track_delete(&*a));
        assert_eq!(tracker.live_count(), 0);
    }

    #[test]
    fn test_forget_ignores_untracked() {
        let tracker = Tracker::new();
        let a = Box::new(Blob::default());
        let b = Box::new(Blob::default());
        tracker.track_create(&*a);

        assert!(!tracker.forget(&*b));
        assert!(tracker.forget(&*a));
        assert!(!tracker.forget(&*a));
        assert_eq!(tracker.deleted_count(), 1);
    }
}
