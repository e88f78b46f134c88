//! # Operator watchdog
//!
//! A dead-man's switch over the operator link. The watchdog records the time of the last valid
//! packet and reports the session as dead once no packet has arrived for longer than the
//! configured timeout.
//!
//! Expiry is a derived condition, not a stored one - [`Watchdog::is_alive`] compares against the
//! clock at query time, so there is no timer thread to race against the packet-recieving path.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Mutex;
use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Tracks the time since the last valid operator packet.
///
/// A fresh instance starts alive. Queries and notifications may come from different paths, so the
/// timestamp sits behind a mutex.
pub struct Watchdog {
    last_seen: Mutex<Instant>,

    timeout: Duration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Watchdog {
    /// Create a new watchdog with the given timeout, alive as of now.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
            timeout,
        }
    }

    /// Record that a valid packet has just been recieved.
    pub fn notify(&self) {
        let mut last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_seen = Instant::now();
    }

    /// Whether a valid packet has arrived within the timeout.
    pub fn is_alive(&self) -> bool {
        self.time_since_last() < self.timeout
    }

    /// Time elapsed since the last valid packet.
    pub fn time_since_last(&self) -> Duration {
        let last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last_seen.elapsed()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_alive_after_construction() {
        let watchdog = Watchdog::new(Duration::from_millis(50));
        assert!(watchdog.is_alive());
    }

    #[test]
    fn test_expires_without_notify() {
        let watchdog = Watchdog::new(Duration::from_millis(20));

        thread::sleep(Duration::from_millis(40));
        assert!(!watchdog.is_alive());
        assert!(watchdog.time_since_last() >= Duration::from_millis(40));
    }

    #[test]
    fn test_notify_keeps_alive() {
        let watchdog = Watchdog::new(Duration::from_millis(50));

        for _ in 0..4 {
            thread::sleep(Duration::from_millis(20));
            watchdog.notify();
        }

        assert!(watchdog.is_alive());
    }
}
