//! In-flight exclusion and attempt cancellation for navigation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Try-acquire flag. Overlapping callers are turned away, not queued.
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a guard if nobody else holds the flag.
    #[must_use]
    pub fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.0))
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the flag on drop, including early returns and panics.
#[derive(Debug)]
pub struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Generation counter. Bumping it invalidates every ticket issued before.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter(Arc<AtomicU64>);

impl AttemptCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn issue(&self) -> AttemptTicket {
        AttemptTicket {
            generation: self.0.load(Ordering::Acquire),
            counter: Arc::clone(&self.0),
        }
    }

    pub fn cancel(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Clone)]
pub struct AttemptTicket {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl AttemptTicket {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_guard_drops() {
        let flag = InFlight::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.try_acquire().is_none());
        assert!(flag.is_held());
        drop(guard);
        assert!(!flag.is_held());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn cancel_invalidates_outstanding_tickets() {
        let attempts = AttemptCounter::new();
        let stale = attempts.issue();
        assert!(stale.is_current());
        attempts.cancel();
        assert!(!stale.is_current());
        assert!(attempts.issue().is_current());
    }
}
