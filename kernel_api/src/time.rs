//! Time abstractions
//!
//! Time is explicit: the kernel owns a [`Clock`] and every timestamp written
//! into a document (`metadata.updatedAt`) comes from it. Documents carry
//! epoch milliseconds, so that is the only resolution kept here.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A timestamp in milliseconds
///
/// Since the Unix epoch for [`SystemClock`]; arbitrary for [`ManualClock`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(u64);

impl Instant {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Moves forward by `by`, saturating at the end of the range
    pub fn saturating_add(self, by: Duration) -> Self {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// Source of the kernel's time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Instant::default().saturating_add(since_epoch)
    }
}

/// Clock that only moves when told to
///
/// Used by tests to make `updatedAt` values deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, instant: Instant) {
        self.now.set(instant);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_orders_by_millis() {
        assert!(Instant::from_millis(2) > Instant::from_millis(1));
        assert_eq!(Instant::from_millis(1500).as_millis(), 1500);
    }

    #[test]
    fn test_sub_millisecond_advance_is_dropped() {
        let start = Instant::from_millis(7);
        assert_eq!(start.saturating_add(Duration::from_micros(999)), start);
        assert_eq!(
            Instant::from_millis(u64::MAX - 1).saturating_add(Duration::from_secs(1)),
            Instant::from_millis(u64::MAX)
        );
    }

    #[test]
    fn test_instant_serializes_as_number() {
        assert_eq!(
            serde_json::to_value(Instant::from_millis(42)).unwrap(),
            serde_json::json!(42)
        );
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Instant::from_millis(10));
        assert_eq!(clock.now().as_millis(), 10);
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.now().as_millis(), 15);
        clock.set(Instant::from_millis(100));
        assert_eq!(clock.now().as_millis(), 100);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now().as_millis() > 0);
    }
}
