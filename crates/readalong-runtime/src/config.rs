#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Defaults suit 60 Hz playback on a typical reading surface. Hosts adjust
//! them with the `with_*` builders, and deployments can override timing
//! values through `READALONG_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `READALONG_FULLSCREEN_DELAY_MS` | [`EngineConfig::fullscreen_delay`] |
//! | `READALONG_SCROLL_MIN_MS` | [`ScrollTiming::min`] |
//! | `READALONG_SCROLL_MAX_MS` | [`ScrollTiming::max`] |
//! | `READALONG_FRAME_BUDGET_MS` | [`EngineConfig::frame_budget`] |
//!
//! Malformed values are skipped and reported; the default stays in effect.

use std::env;
use std::fmt;
use std::time::Duration;

/// Fullscreen countdown override.
pub const ENV_FULLSCREEN_DELAY_MS: &str = "READALONG_FULLSCREEN_DELAY_MS";
/// Minimum scroll transition override.
pub const ENV_SCROLL_MIN_MS: &str = "READALONG_SCROLL_MIN_MS";
/// Maximum scroll transition override.
pub const ENV_SCROLL_MAX_MS: &str = "READALONG_SCROLL_MAX_MS";
/// Frame budget override.
pub const ENV_FRAME_BUDGET_MS: &str = "READALONG_FRAME_BUDGET_MS";

/// Vertical band of the viewport the active word should stay inside.
///
/// Fractions of the viewport height, measured from the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingZone {
    /// Upper edge.
    pub top: f32,
    /// Lower edge.
    pub bottom: f32,
}

impl Default for ReadingZone {
    fn default() -> Self {
        Self {
            top: 0.2,
            bottom: 0.4,
        }
    }
}

impl ReadingZone {
    /// Where a scroll places the word center: the middle of the zone.
    #[inline]
    pub fn anchor(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Whether a word center at `y` (viewport coordinates) is inside the zone.
    #[inline]
    pub fn contains(&self, y: f32, viewport_height: f32) -> bool {
        y >= self.top * viewport_height && y <= self.bottom * viewport_height
    }
}

/// How long a scroll transition takes for a given distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTiming {
    /// Shortest transition.
    pub min: Duration,
    /// Longest transition.
    pub max: Duration,
    /// Added milliseconds per pixel of travel.
    pub ms_per_px: f32,
}

impl Default for ScrollTiming {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(200),
            max: Duration::from_millis(800),
            ms_per_px: 0.6,
        }
    }
}

impl ScrollTiming {
    /// Transition length for `distance` pixels.
    ///
    /// Non-decreasing in distance and always within `[min, max]`.
    pub fn duration_for(&self, distance: f32) -> Duration {
        let max = self.max.max(self.min);
        let extra_ms = f64::from(distance.abs()) * f64::from(self.ms_per_px.max(0.0));
        if !extra_ms.is_finite() {
            return max;
        }
        let extra = Duration::from_millis(extra_ms.round().min(max.as_millis() as f64) as u64);
        (self.min + extra).min(max)
    }
}

/// Configuration for a [`HighlightEngine`](crate::HighlightEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Auto-scroll reading zone.
    pub reading_zone: ReadingZone,
    /// Auto-scroll transition timing.
    pub scroll: ScrollTiming,
    /// Idle time in normal mode before entering fullscreen.
    pub fullscreen_delay: Duration,
    /// Time allowed per frame.
    pub frame_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reading_zone: ReadingZone::default(),
            scroll: ScrollTiming::default(),
            fullscreen_delay: Duration::from_millis(3000),
            frame_budget: Duration::from_millis(16),
        }
    }
}

impl EngineConfig {
    /// Set the reading zone.
    #[must_use]
    pub fn with_reading_zone(mut self, zone: ReadingZone) -> Self {
        self.reading_zone = zone;
        self
    }

    /// Set the scroll timing.
    #[must_use]
    pub fn with_scroll_timing(mut self, scroll: ScrollTiming) -> Self {
        self.scroll = scroll;
        self
    }

    /// Set the fullscreen countdown.
    #[must_use]
    pub fn with_fullscreen_delay(mut self, delay: Duration) -> Self {
        self.fullscreen_delay = delay;
        self
    }

    /// Set the frame budget.
    #[must_use]
    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = budget;
        self
    }

    /// Defaults with environment overrides applied.
    ///
    /// Invalid values are logged at `warn` and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let parsed = Self::from_env_with(|key| env::var(key).ok());
        for error in &parsed.errors {
            tracing::warn!(key = error.key, value = %error.value, "{}", error.message);
        }
        parsed.config
    }

    /// Defaults with overrides read through `get`, plus any rejected values.
    pub fn from_env_with<F>(mut get: F) -> EngineConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        let mut millis = |key: &'static str, errors: &mut Vec<ConfigError>| -> Option<Duration> {
            let value = get(key)?;
            match value.trim().parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    errors.push(ConfigError {
                        key,
                        value,
                        message: "expected milliseconds as a non-negative integer",
                    });
                    None
                }
            }
        };

        if let Some(delay) = millis(ENV_FULLSCREEN_DELAY_MS, &mut errors) {
            config.fullscreen_delay = delay;
        }
        if let Some(min) = millis(ENV_SCROLL_MIN_MS, &mut errors) {
            config.scroll.min = min;
        }
        if let Some(max) = millis(ENV_SCROLL_MAX_MS, &mut errors) {
            config.scroll.max = max;
        }
        if let Some(budget) = millis(ENV_FRAME_BUDGET_MS, &mut errors) {
            if budget.is_zero() {
                errors.push(ConfigError {
                    key: ENV_FRAME_BUDGET_MS,
                    value: "0".into(),
                    message: "frame budget must be positive",
                });
            } else {
                config.frame_budget = budget;
            }
        }

        if config.scroll.max < config.scroll.min {
            errors.push(ConfigError {
                key: ENV_SCROLL_MAX_MS,
                value: config.scroll.max.as_millis().to_string(),
                message: "scroll max below scroll min; using min",
            });
            config.scroll.max = config.scroll.min;
        }

        EngineConfigParse { config, errors }
    }
}

/// Result of reading configuration overrides.
#[derive(Debug, Clone)]
pub struct EngineConfigParse {
    /// Effective configuration.
    pub config: EngineConfig,
    /// Rejected overrides.
    pub errors: Vec<ConfigError>,
}

/// A rejected configuration override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Environment variable.
    pub key: &'static str,
    /// Raw value.
    pub value: String,
    /// What was expected.
    pub message: &'static str,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.key, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}
