#![forbid(unsafe_code)]

//! Keeps the active word inside the reading zone.
//!
//! When the word's vertical center leaves the [`ReadingZone`], the scroller
//! starts one eased transition that puts the center on the zone's anchor
//! line. Transition length grows with distance within the configured
//! [`ScrollTiming`] bounds.
//!
//! At most one transition exists. A new target arriving mid-flight replaces
//! it, starting from the offset currently on screen, so transitions never
//! queue or stack.
//!
//! All coordinates are content pixels: a word at `y` is visible at
//! `y - offset` inside the viewport.

use std::time::{Duration, Instant};

use readalong_core::animation::Tween;
use readalong_core::geometry::Rect;

use crate::config::{ReadingZone, ScrollTiming};

/// Sub-pixel moves are ignored.
const MIN_DISTANCE: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
struct Transition {
    tween: Tween,
    started: Instant,
}

/// Auto-scroll state for one viewport.
#[derive(Debug, Clone)]
pub struct AutoScroller {
    zone: ReadingZone,
    timing: ScrollTiming,
    offset: f32,
    active: Option<Transition>,
    retargets: u64,
}

impl AutoScroller {
    /// Create a scroller at offset 0.
    pub fn new(zone: ReadingZone, timing: ScrollTiming) -> Self {
        Self {
            zone,
            timing,
            offset: 0.0,
            active: None,
            retargets: 0,
        }
    }

    /// Offset on screen at `now`.
    pub fn offset_at(&self, now: Instant) -> f32 {
        match &self.active {
            Some(t) => t.tween.sample(now.saturating_duration_since(t.started)),
            None => self.offset,
        }
    }

    /// Where the in-flight transition ends, if one exists.
    pub fn target(&self) -> Option<f32> {
        self.active.map(|t| t.tween.to())
    }

    /// Length of the in-flight transition, if one exists.
    pub fn transition_duration(&self) -> Option<Duration> {
        self.active.map(|t| t.tween.duration())
    }

    /// Whether a transition is still moving at `now`.
    pub fn is_animating_at(&self, now: Instant) -> bool {
        self.active
            .is_some_and(|t| !t.tween.is_complete(now.saturating_duration_since(t.started)))
    }

    /// Number of times an in-flight transition was replaced.
    pub fn retargets(&self) -> u64 {
        self.retargets
    }

    /// Keep `word` in the reading zone of a viewport `viewport_height` tall.
    ///
    /// `max_offset` bounds the target when the content height is known.
    /// Returns the new target when a transition starts.
    pub fn follow_at(
        &mut self,
        word: Rect,
        viewport_height: f32,
        max_offset: Option<f32>,
        now: Instant,
    ) -> Option<f32> {
        if viewport_height <= 0.0 || word.is_empty() {
            return None;
        }
        let current = self.offset_at(now);
        let center = word.center_y();
        if self.zone.contains(center - current, viewport_height) {
            return None;
        }

        let mut target = (center - self.zone.anchor() * viewport_height).max(0.0);
        if let Some(max) = max_offset {
            target = target.min(max.max(0.0));
        }
        if self.target() == Some(target) || (target - current).abs() < MIN_DISTANCE {
            return None;
        }

        if self.is_animating_at(now) {
            self.retargets += 1;
        }
        let duration = self.timing.duration_for(target - current);
        tracing::trace!(from = current, to = target, duration_ms = duration.as_millis() as u64, "auto-scroll");
        self.active = Some(Transition {
            tween: Tween::new(current, target, duration),
            started: now,
        });
        Some(target)
    }

    /// Retire a finished transition. Returns the offset at `now`.
    pub fn settle_at(&mut self, now: Instant) -> f32 {
        let offset = self.offset_at(now);
        if !self.is_animating_at(now) && self.active.take().is_some() {
            self.offset = offset;
        }
        offset
    }

    /// Stop any transition where it stands at `now`.
    pub fn cancel_at(&mut self, now: Instant) {
        self.offset = self.offset_at(now);
        self.active = None;
    }

    /// Jump to `offset`, e.g. after the user scrolled by hand.
    pub fn set_offset(&mut self, offset: f32) {
        self.active = None;
        self.offset = offset.max(0.0);
    }
}
