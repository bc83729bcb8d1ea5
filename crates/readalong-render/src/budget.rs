#![forbid(unsafe_code)]

//! Per-frame time budget.
//!
//! Highlight updates arrive at up to ~60 Hz, so each frame has roughly
//! 16ms. The budget is a measurement, not a scheduler: the render path
//! never blocks on it, it only reports overruns.
//!
//! ```
//! use readalong_render::FrameBudget;
//! use std::time::{Duration, Instant};
//!
//! let budget = FrameBudget::default();
//! let start = Instant::now();
//! let timer = budget.start_at(start);
//! assert!(!timer.exceeded_at(start + Duration::from_millis(10)));
//! assert!(timer.exceeded_at(start + Duration::from_millis(17)));
//! ```

use std::time::{Duration, Instant};

/// Time allowed for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBudget {
    total: Duration,
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl FrameBudget {
    /// 60 updates per second.
    pub const DEFAULT: Duration = Duration::from_millis(16);

    /// Create a budget with the given total.
    pub const fn new(total: Duration) -> Self {
        Self { total }
    }

    /// Total time per frame.
    #[inline]
    pub const fn total(&self) -> Duration {
        self.total
    }

    /// Start timing a frame now.
    pub fn start(&self) -> FrameTimer {
        self.start_at(Instant::now())
    }

    /// Start timing a frame at `now`.
    pub fn start_at(&self, now: Instant) -> FrameTimer {
        FrameTimer {
            total: self.total,
            start: now,
        }
    }
}

/// A running frame measurement.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    total: Duration,
    start: Instant,
}

impl FrameTimer {
    /// When the frame started.
    #[inline]
    pub fn started(&self) -> Instant {
        self.start
    }

    /// Time spent by `now`.
    #[inline]
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Time left at `now`.
    #[inline]
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.total.saturating_sub(self.elapsed_at(now))
    }

    /// Whether the frame ran past its budget by `now`.
    #[inline]
    pub fn exceeded_at(&self, now: Instant) -> bool {
        self.elapsed_at(now) > self.total
    }

    /// Report an overrun, if any, and return whether one occurred.
    pub fn finish_at(&self, now: Instant) -> bool {
        let exceeded = self.exceeded_at(now);
        #[cfg(feature = "tracing")]
        if exceeded {
            tracing::warn!(
                elapsed_us = self.elapsed_at(now).as_micros() as u64,
                budget_us = self.total.as_micros() as u64,
                "highlight frame over budget"
            );
        }
        exceeded
    }
}
