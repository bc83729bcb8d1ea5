#![forbid(unsafe_code)]

//! Easing functions and value interpolation.
//!
//! A [`Tween`] is a pure function of elapsed time: it carries no clock and
//! no mutable progress, so a caller can sample it from any event handler
//! without ordering concerns.
//!
//! ```
//! use readalong_core::animation::{Tween, ease_out};
//! use std::time::Duration;
//!
//! let tween = Tween::new(0.0, 100.0, Duration::from_millis(200)).easing(ease_out);
//! assert_eq!(tween.sample(Duration::ZERO), 0.0);
//! assert_eq!(tween.sample(Duration::from_millis(200)), 100.0);
//! ```

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out (slower end than quadratic).
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease-in-out.
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Interpolates an `f32` between `from` and `to` over a duration.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    easing: EasingFn,
}

impl Tween {
    /// Create a tween with default cubic ease-in-out.
    ///
    /// A zero duration is bumped to one nanosecond so the tween completes
    /// on the first sample.
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            easing: ease_in_out_cubic,
        }
    }

    /// Set the easing function (builder).
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Start value.
    pub fn from(&self) -> f32 {
        self.from
    }

    /// End value.
    pub fn to(&self) -> f32 {
        self.to
    }

    /// Total duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Linear progress in [0.0, 1.0] at `elapsed`.
    pub fn progress(&self, elapsed: Duration) -> f32 {
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }

    /// Eased value at `elapsed`. Exactly `to` once complete.
    pub fn sample(&self, elapsed: Duration) -> f32 {
        if self.is_complete(elapsed) {
            return self.to;
        }
        let t = (self.easing)(self.progress(elapsed));
        self.from + (self.to - self.from) * t
    }

    /// Whether `elapsed` has reached the end of the tween.
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}
