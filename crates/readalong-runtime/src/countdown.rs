#![forbid(unsafe_code)]

//! Single-shot, cancellable countdown.
//!
//! A [`Countdown`] holds at most one deadline. It never runs callbacks by
//! itself: the owner polls it from its event loop with [`Countdown::poll_at`],
//! which reports expiry exactly once. Because firing only happens inside a
//! poll on the owner's thread, a cancelled countdown cannot fire after
//! [`Countdown::cancel`] returns, and re-arming always replaces the previous
//! deadline.
//!
//! Every arm produces a fresh [`CountdownToken`], so a stale token from an
//! earlier arm never matches the live one.
//!
//! ```
//! use readalong_runtime::Countdown;
//! use std::time::{Duration, Instant};
//!
//! let start = Instant::now();
//! let mut countdown = Countdown::new(Duration::from_millis(3000));
//! countdown.arm_at(start);
//! assert!(countdown.poll_at(start + Duration::from_millis(2999)).is_none());
//! assert!(countdown.poll_at(start + Duration::from_millis(3000)).is_some());
//! assert!(countdown.poll_at(start + Duration::from_millis(3001)).is_none());
//! ```

use std::time::{Duration, Instant};

/// Identifies one arming of a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownToken(u64);

impl CountdownToken {
    /// Arming sequence number.
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    token: CountdownToken,
    deadline: Instant,
}

/// A deadline-based single-shot timer.
#[derive(Debug, Clone)]
pub struct Countdown {
    delay: Duration,
    armed: Option<Armed>,
    generation: u64,
}

impl Countdown {
    /// Create a disarmed countdown.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: None,
            generation: 0,
        }
    }

    /// Countdown length.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm to expire `delay` after `now`, replacing any armed deadline.
    pub fn arm_at(&mut self, now: Instant) -> CountdownToken {
        self.generation += 1;
        let token = CountdownToken(self.generation);
        self.armed = Some(Armed {
            token,
            deadline: now + self.delay,
        });
        token
    }

    /// Disarm. Returns `true` if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Token of the live arming, if any.
    pub fn token(&self) -> Option<CountdownToken> {
        self.armed.map(|a| a.token)
    }

    /// Pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|a| a.deadline)
    }

    /// Time left at `now`, if armed.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.armed
            .map(|a| a.deadline.saturating_duration_since(now))
    }

    /// Report expiry. Returns the token once, when `now` reaches the
    /// deadline, and disarms.
    pub fn poll_at(&mut self, now: Instant) -> Option<CountdownToken> {
        match self.armed {
            Some(armed) if now >= armed.deadline => {
                self.armed = None;
                Some(armed.token)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(3000);

    #[test]
    fn starts_disarmed() {
        let mut c = Countdown::new(DELAY);
        assert!(!c.is_armed());
        assert!(c.poll_at(Instant::now() + DELAY * 10).is_none());
    }

    #[test]
    fn fires_once_at_deadline() {
        let start = Instant::now();
        let mut c = Countdown::new(DELAY);
        let token = c.arm_at(start);
        assert_eq!(c.remaining_at(start + Duration::from_millis(1000)), Some(Duration::from_millis(2000)));
        assert_eq!(c.poll_at(start + DELAY), Some(token));
        assert!(!c.is_armed());
        assert_eq!(c.poll_at(start + DELAY * 2), None);
    }

    #[test]
    fn cancel_prevents_firing() {
        let start = Instant::now();
        let mut c = Countdown::new(DELAY);
        c.arm_at(start);
        assert!(c.cancel());
        assert!(!c.cancel());
        assert!(c.poll_at(start + DELAY).is_none());
    }

    #[test]
    fn rearm_restarts_instead_of_accumulating() {
        let start = Instant::now();
        let mut c = Countdown::new(DELAY);
        let first = c.arm_at(start);
        let second = c.arm_at(start + Duration::from_millis(2000));
        assert_ne!(first, second);
        assert!(second.generation() > first.generation());
        // The first deadline passes without firing.
        assert!(c.poll_at(start + DELAY).is_none());
        assert_eq!(c.poll_at(start + Duration::from_millis(5000)), Some(second));
    }
}
