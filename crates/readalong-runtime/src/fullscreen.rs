#![forbid(unsafe_code)]

//! Timer-driven fullscreen visibility.
//!
//! The player hides its chrome after a period without interaction. The
//! controller is a two-state machine ([`FullscreenState::Normal`] and
//! [`FullscreenState::Fullscreen`]) plus a [`Countdown`] that enters
//! fullscreen on expiry.
//!
//! # Rules
//!
//! - Entering or exiting when already in the target state does nothing.
//! - Every real transition calls the observer exactly once.
//! - Exiting re-arms the countdown, so normal mode always has a way back.
//! - Entering cancels any pending countdown.
//! - Interaction while fullscreen exits; while normal it only re-arms.
//! - [`FullscreenController::dispose`] cancels the countdown and, if
//!   fullscreen, forces one exit notification. It is idempotent; every
//!   operation after it is a no-op. Dropping the controller disposes it.
//!
//! The countdown is polled: hosts call [`FullscreenController::tick_at`]
//! from their event loop (the engine does this every frame).
//!
//! ```
//! use readalong_runtime::FullscreenController;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::{Duration, Instant};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let mut controller = FullscreenController::new(Duration::from_millis(3000))
//!     .with_observer(move |fullscreen| log.borrow_mut().push(fullscreen));
//!
//! let start = Instant::now();
//! controller.start_fullscreen_timer_at(start);
//! controller.tick_at(start + Duration::from_millis(3000));
//! assert!(controller.is_fullscreen());
//! assert_eq!(*seen.borrow(), vec![true]);
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use crate::countdown::Countdown;

/// Visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenState {
    /// Chrome visible.
    #[default]
    Normal,
    /// Chrome hidden.
    Fullscreen,
}

/// Callback invoked with the new fullscreen flag on every transition.
pub type FullscreenObserver = Box<dyn FnMut(bool)>;

/// Fullscreen state machine with an idle countdown.
pub struct FullscreenController {
    state: FullscreenState,
    countdown: Countdown,
    observer: Option<FullscreenObserver>,
    disposed: bool,
    transitions: u64,
}

impl fmt::Debug for FullscreenController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullscreenController")
            .field("state", &self.state)
            .field("countdown", &self.countdown)
            .field("has_observer", &self.observer.is_some())
            .field("disposed", &self.disposed)
            .field("transitions", &self.transitions)
            .finish()
    }
}

impl FullscreenController {
    /// Create a controller in normal mode with the countdown disarmed.
    pub fn new(delay: Duration) -> Self {
        Self {
            state: FullscreenState::Normal,
            countdown: Countdown::new(delay),
            observer: None,
            disposed: false,
            transitions: 0,
        }
    }

    /// Register the transition observer (builder).
    #[must_use]
    pub fn with_observer(mut self, observer: impl FnMut(bool) + 'static) -> Self {
        self.set_observer(observer);
        self
    }

    /// Register or replace the transition observer.
    pub fn set_observer(&mut self, observer: impl FnMut(bool) + 'static) {
        if !self.disposed {
            self.observer = Some(Box::new(observer));
        }
    }

    /// Current state.
    pub fn state(&self) -> FullscreenState {
        self.state
    }

    /// Whether the chrome is hidden.
    pub fn is_fullscreen(&self) -> bool {
        self.state == FullscreenState::Fullscreen
    }

    /// Whether the idle countdown is armed.
    pub fn timer_armed(&self) -> bool {
        self.countdown.is_armed()
    }

    /// Time until the countdown expires, if armed.
    pub fn timer_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.countdown.remaining_at(now)
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of transitions so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Hide the chrome. Returns `true` if a transition happened.
    pub fn enter_fullscreen(&mut self) -> bool {
        if self.disposed || self.is_fullscreen() {
            return false;
        }
        self.countdown.cancel();
        self.transition(FullscreenState::Fullscreen);
        true
    }

    /// Show the chrome and re-arm the countdown from now.
    pub fn exit_fullscreen(&mut self) -> bool {
        self.exit_fullscreen_at(Instant::now())
    }

    /// Show the chrome and re-arm the countdown from `now`.
    pub fn exit_fullscreen_at(&mut self, now: Instant) -> bool {
        if self.disposed || !self.is_fullscreen() {
            return false;
        }
        self.transition(FullscreenState::Normal);
        self.countdown.arm_at(now);
        true
    }

    /// Arm (or restart) the countdown from now.
    pub fn start_fullscreen_timer(&mut self) {
        self.start_fullscreen_timer_at(Instant::now());
    }

    /// Arm (or restart) the countdown from `now`.
    pub fn start_fullscreen_timer_at(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        let token = self.countdown.arm_at(now);
        tracing::trace!(generation = token.generation(), "fullscreen countdown armed");
    }

    /// Disarm the countdown. No observer call.
    pub fn cancel_fullscreen_timer(&mut self) {
        if self.countdown.cancel() {
            tracing::trace!("fullscreen countdown cancelled");
        }
    }

    /// React to user interaction at the current time.
    pub fn restart_timer_on_interaction(&mut self) {
        self.restart_timer_on_interaction_at(Instant::now());
    }

    /// React to user interaction at `now`.
    ///
    /// Fullscreen exits (which re-arms); normal mode only re-arms.
    pub fn restart_timer_on_interaction_at(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        if self.is_fullscreen() {
            self.exit_fullscreen_at(now);
        } else {
            self.start_fullscreen_timer_at(now);
        }
    }

    /// Poll the countdown at the current time.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Poll the countdown at `now`; enters fullscreen on expiry.
    ///
    /// Returns `true` if this call entered fullscreen.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        match self.countdown.poll_at(now) {
            Some(_) => self.enter_fullscreen(),
            None => false,
        }
    }

    /// Tear down. Safe to call any number of times.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.countdown.cancel();
        if self.is_fullscreen() {
            self.transition(FullscreenState::Normal);
        }
        self.disposed = true;
        self.observer = None;
        tracing::debug!(transitions = self.transitions, "fullscreen controller disposed");
    }

    fn transition(&mut self, to: FullscreenState) {
        self.state = to;
        self.transitions += 1;
        let fullscreen = to == FullscreenState::Fullscreen;
        tracing::debug!(fullscreen, "fullscreen transition");
        if let Some(observer) = self.observer.as_mut() {
            observer(fullscreen);
        }
    }
}

impl Drop for FullscreenController {
    fn drop(&mut self) {
        self.dispose();
    }
}
