//! Clock port for time-related operations

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// Time-dependent code (cache freshness) takes a `dyn Clock` so tests can
/// drive time by hand.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn now_epoch_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "tests"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "tests"))]
mod manual {
    use super::Clock;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// Clock that only moves when told to
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start at the given instant
        pub fn starting_at(now: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += delta;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::starting_at(Utc::now())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock::new();
        assert!(clock.now_epoch_ms() > 0);
    }

    #[test]
    fn test_manual_clock_advances_only_on_request() {
        let clock = ManualClock::default();
        let start = clock.now_epoch_ms();
        assert_eq!(clock.now_epoch_ms(), start);

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now_epoch_ms(), start + 1_500);
    }
}
