use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use time::{OffsetDateTime, UtcOffset};

/// Source of wall-clock time for phase deadlines.
///
/// Implementations must return UTC timestamps so remaining-time arithmetic never mixes offsets.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to. Used by simulations and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Clock frozen at `start` until moved.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start.to_offset(UtcOffset::UTC)),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }

    /// Jump to an arbitrary instant (normalized to UTC).
    pub fn set(&self, instant: OffsetDateTime) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = instant.to_offset(UtcOffset::UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn manual_clock_normalizes_to_utc() {
        let clock = ManualClock::new(datetime!(2025-03-01 12:00 +02:00));
        assert_eq!(clock.now().offset(), UtcOffset::UTC);
        assert_eq!(clock.now(), datetime!(2025-03-01 10:00 UTC));

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), datetime!(2025-03-01 10:01:30 UTC));
    }
}
