//! Timer abstraction used by the receiver's NACK timeout and the sender's
//! ACK-solicitation pacing. Kept as a trait so the core state machines stay
//! deterministic and testable without sleeping real wall-clock time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use quanta::Instant;

pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Production clock backed by `quanta`'s calibrated monotonic counter —
/// cheaper to sample than `std::time::Instant` under frequent polling.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic, shareable clock for tests: starts at the real "now" and
/// only moves when explicitly advanced. Cloning yields a handle to the same
/// underlying time, so a test can hold one `ManualClock` to drive both the
/// state machine under test and its own assertions.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.current.lock().expect("manual clock mutex poisoned");
        *guard += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().expect("manual clock mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_monotonically() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(500));
        let t1 = clock.now();
        assert!(t1 > t0);
        assert_eq!(t1 - t0, Duration::from_millis(500));
    }

    #[test]
    fn cloned_handle_shares_the_same_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), handle.now());
    }
}
