#![forbid(unsafe_code)]

//! Per-session highlight engine.
//!
//! [`HighlightEngine`] owns everything for one displayed content: the time
//! index, its geometry cache, the last painted snapshot, the auto-scroller
//! and the fullscreen controller. Hosts create one per player session and
//! drop (or [`dispose`](HighlightEngine::dispose)) it when the session ends.
//!
//! # Frame pipeline
//!
//! Each [`frame_at`](HighlightEngine::frame_at) call:
//!
//! 1. polls the fullscreen countdown,
//! 2. takes the newest pending position (older ones are dropped),
//! 3. resolves the active word and sentence,
//! 4. builds a [`HighlightSnapshot`] and compares it with the painted one,
//! 5. on change, resolves geometry through the cache and composes layers,
//! 6. lets the auto-scroller follow the active word.
//!
//! # Content switches
//!
//! Timing data and its geometry cache live in one session value that is
//! built completely before it replaces the previous one. No frame can see
//! new timings paired with old geometry.

use std::sync::Arc;
use std::time::Instant;

use readalong_core::geometry::Rect;
use readalong_render::{
    ComposedFrame, FrameBudget, HighlightSnapshot, HighlightStyle, ResolvedHighlight, compose,
    resolve, should_repaint,
};
use readalong_text::{
    CacheStats, DataFormatError, GeometryCache, HighlightAvailability, LookupStats, TextIdentity,
    TextLayout, TimingCollection, TimingDocument,
};

use crate::autoscroll::AutoScroller;
use crate::config::EngineConfig;
use crate::fullscreen::FullscreenController;
use crate::position::{LatestPosition, PositionSource, PositionSubscription};

/// What the presentation layer can draw for the open content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStatus {
    /// Word and sentence bands are drawn.
    Active,
    /// Some words lack character positions; text renders without bands.
    HighlightingUnavailable {
        /// Words without positions.
        missing: usize,
    },
    /// Timing data was rejected; text renders without bands.
    PlainText,
}

impl HighlightStatus {
    /// Whether the "highlighting unavailable" indicator should be shown.
    pub fn highlighting_unavailable(&self) -> bool {
        !matches!(self, HighlightStatus::Active)
    }
}

impl From<HighlightAvailability> for HighlightStatus {
    fn from(availability: HighlightAvailability) -> Self {
        match availability {
            HighlightAvailability::Available => HighlightStatus::Active,
            HighlightAvailability::Unavailable { missing } => {
                HighlightStatus::HighlightingUnavailable { missing }
            }
        }
    }
}

/// Result of one engine frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Position the frame was resolved at.
    pub position_ms: Option<u64>,
    /// Active word.
    pub word_index: Option<usize>,
    /// Active sentence.
    pub sentence_index: Option<usize>,
    /// New paint layers, present only when a repaint is needed.
    pub frame: Option<ComposedFrame>,
    /// Scroll offset to display.
    pub scroll_offset: f32,
    /// Where the in-flight scroll transition ends.
    pub scroll_target: Option<f32>,
    /// Whether the chrome is hidden.
    pub fullscreen: bool,
}

impl FrameOutput {
    /// Whether this frame must be painted.
    pub fn repainted(&self) -> bool {
        self.frame.is_some()
    }
}

/// Everything tied to one displayed content.
#[derive(Debug)]
struct Session {
    text: String,
    identity: TextIdentity,
    timings: Option<TimingCollection>,
    cache: GeometryCache,
    status: HighlightStatus,
    position_ms: Option<u64>,
    painted: Option<HighlightSnapshot>,
    /// Bounds of the last painted word, kept for re-following on resize.
    word_bounds: Option<Rect>,
    retry_geometry: bool,
}

impl Session {
    fn new(text: String, timings: Option<TimingCollection>) -> Self {
        let status = timings
            .as_ref()
            .map_or(HighlightStatus::PlainText, |t| t.availability().into());
        Self {
            identity: TextIdentity::of(&text),
            text,
            timings,
            cache: GeometryCache::new(),
            status,
            position_ms: None,
            painted: None,
            word_bounds: None,
            retry_geometry: false,
        }
    }
}

/// Highlight synchronization for one player session.
pub struct HighlightEngine<L> {
    config: EngineConfig,
    layout: L,
    style: HighlightStyle,
    viewport_height: f32,
    /// Viewport height the scroller last followed a word with.
    followed_height: f32,
    content_height: Option<f32>,
    session: Option<Session>,
    mailbox: LatestPosition,
    subscription: Option<PositionSubscription>,
    scroller: AutoScroller,
    fullscreen: FullscreenController,
    budget: FrameBudget,
}

impl<L: TextLayout> HighlightEngine<L> {
    /// Create an engine with no content open.
    pub fn new(layout: L, config: EngineConfig) -> Self {
        Self {
            layout,
            style: HighlightStyle::default(),
            viewport_height: 0.0,
            followed_height: 0.0,
            content_height: None,
            session: None,
            mailbox: LatestPosition::new(),
            subscription: None,
            scroller: AutoScroller::new(config.reading_zone, config.scroll),
            fullscreen: FullscreenController::new(config.fullscreen_delay),
            budget: FrameBudget::new(config.frame_budget),
            config,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layout engine.
    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Current highlight style.
    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    /// Replace the highlight style. Geometry is re-measured on the next
    /// frame if the text style or width changed.
    pub fn set_style(&mut self, style: HighlightStyle) {
        self.style = style;
    }

    /// Resize the viewport. Width drives layout; height drives auto-scroll.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.style.layout.max_width = width;
        self.viewport_height = height;
    }

    /// Total content height, when known, to bound scroll targets.
    pub fn set_content_height(&mut self, height: Option<f32>) {
        self.content_height = height;
    }

    // -- content ------------------------------------------------------------

    /// Open `text` with its timing document.
    ///
    /// On a [`DataFormatError`] the text is still opened in plain-text mode
    /// and the error is returned.
    pub fn open_content(
        &mut self,
        text: impl Into<String>,
        timing: TimingDocument,
    ) -> Result<HighlightStatus, DataFormatError> {
        self.install(text.into(), timing.into_collection())
    }

    /// Open `text` with a timing file in JSON form.
    pub fn open_content_json(
        &mut self,
        text: impl Into<String>,
        json: &str,
    ) -> Result<HighlightStatus, DataFormatError> {
        let timings = TimingDocument::from_json(json).and_then(TimingDocument::into_collection);
        self.install(text.into(), timings)
    }

    /// Open `text` with an already built time index.
    pub fn open_timings(
        &mut self,
        text: impl Into<String>,
        timings: TimingCollection,
    ) -> HighlightStatus {
        let session = Session::new(text.into(), Some(timings));
        let status = session.status;
        self.replace_session(Some(session));
        status
    }

    fn install(
        &mut self,
        text: String,
        timings: Result<TimingCollection, DataFormatError>,
    ) -> Result<HighlightStatus, DataFormatError> {
        match timings {
            Ok(timings) => Ok(self.open_timings(text, timings)),
            Err(error) => {
                tracing::warn!(%error, "timing data rejected; showing plain text");
                self.replace_session(Some(Session::new(text, None)));
                Err(error)
            }
        }
    }

    fn replace_session(&mut self, session: Option<Session>) {
        if let Some(s) = &session {
            tracing::debug!(
                words = s.timings.as_ref().map_or(0, TimingCollection::len),
                status = ?s.status,
                "content opened"
            );
        } else if self.session.is_some() {
            tracing::debug!("content closed");
        }
        self.session = session;
        self.mailbox.clear();
        self.scroller.set_offset(0.0);
        if let Some(sub) = &self.subscription {
            self.mailbox.offer(sub.source().position_ms());
        }
    }

    /// Close the open content, if any.
    pub fn close_content(&mut self) {
        self.replace_session(None);
        self.fullscreen.cancel_fullscreen_timer();
    }

    /// Whether content is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// The open text.
    pub fn text(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.text.as_str())
    }

    /// Highlight status of the open content.
    pub fn status(&self) -> Option<HighlightStatus> {
        self.session.as_ref().map(|s| s.status)
    }

    /// Time index of the open content.
    pub fn timings(&self) -> Option<&TimingCollection> {
        self.session.as_ref().and_then(|s| s.timings.as_ref())
    }

    /// Active `(word, sentence)` as of the last painted frame.
    pub fn current(&self) -> Option<(usize, usize)> {
        let snapshot = self.session.as_ref()?.painted?;
        snapshot
            .current_word_index
            .zip(snapshot.current_sentence_index)
    }

    /// Geometry cache statistics for the open content.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.session.as_ref().map(|s| s.cache.stats())
    }

    /// Time index lookup statistics for the open content.
    pub fn lookup_stats(&self) -> Option<LookupStats> {
        self.timings().map(TimingCollection::lookup_stats)
    }

    // -- position -----------------------------------------------------------

    /// Follow `source`, replacing any previous source.
    pub fn attach_source(&mut self, source: Arc<dyn PositionSource>) {
        self.detach_source();
        self.subscription = Some(PositionSubscription::attach(source, &self.mailbox));
    }

    /// Stop following the current source.
    pub fn detach_source(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.release();
        }
    }

    /// Whether a position source is attached.
    pub fn has_source(&self) -> bool {
        self.subscription.is_some()
    }

    /// Queue a position. Only the newest queued position is used per frame.
    pub fn push_position(&self, position_ms: u64) {
        self.mailbox.offer(position_ms);
    }

    /// Jump to `position_ms`, dropping the lookup locality hint.
    pub fn seek(&mut self, position_ms: u64) {
        if let Some(timings) = self.timings() {
            timings.reset_locality_cache();
        }
        self.mailbox.offer(position_ms);
    }

    // -- interaction --------------------------------------------------------

    /// Fullscreen controller.
    pub fn fullscreen(&self) -> &FullscreenController {
        &self.fullscreen
    }

    /// Fullscreen controller, for direct state changes.
    pub fn fullscreen_mut(&mut self) -> &mut FullscreenController {
        &mut self.fullscreen
    }

    /// Register the fullscreen change observer.
    pub fn set_fullscreen_observer(&mut self, observer: impl FnMut(bool) + 'static) {
        self.fullscreen.set_observer(observer);
    }

    /// User interaction at `now`: leaves fullscreen or restarts the countdown.
    pub fn on_interaction_at(&mut self, now: Instant) {
        self.fullscreen.restart_timer_on_interaction_at(now);
    }

    /// User scrolled to `offset` by hand; cancels any auto-scroll.
    pub fn user_scrolled(&mut self, offset: f32) {
        self.scroller.set_offset(offset);
    }

    /// Auto-scroller state.
    pub fn scroller(&self) -> &AutoScroller {
        &self.scroller
    }

    // -- frames -------------------------------------------------------------

    /// Run one frame at the current time.
    pub fn frame(&mut self) -> FrameOutput {
        self.frame_at(Instant::now())
    }

    /// Run one frame at `now`.
    pub fn frame_at(&mut self, now: Instant) -> FrameOutput {
        let work_started = Instant::now();
        self.fullscreen.tick_at(now);
        let pending = self.mailbox.take();
        let max_offset = self
            .content_height
            .map(|h| (h - self.viewport_height).max(0.0));

        let mut output = FrameOutput {
            position_ms: None,
            word_index: None,
            sentence_index: None,
            frame: None,
            scroll_offset: 0.0,
            scroll_target: None,
            fullscreen: self.fullscreen.is_fullscreen(),
        };

        if let Some(session) = self.session.as_mut() {
            if let Some(ms) = pending {
                if let (Some(timings), Some(last)) = (&session.timings, session.position_ms)
                    && ms < last
                {
                    tracing::trace!(from = last, to = ms, "backward jump; locality hint reset");
                    timings.reset_locality_cache();
                }
                session.position_ms = Some(ms);
            }

            let resolved_indices = match (&session.timings, session.position_ms) {
                (Some(timings), Some(ms)) => timings.resolve(ms),
                _ => None,
            };
            let snapshot = HighlightSnapshot::new(
                resolved_indices.map(|(w, _)| w),
                resolved_indices.map(|(_, s)| s),
                session.identity,
                self.style,
            );

            let repaint = session.retry_geometry
                || session
                    .painted
                    .is_none_or(|painted| should_repaint(&painted, &snapshot));
            if repaint {
                let geometry = match &session.timings {
                    Some(timings) => resolve(
                        &snapshot,
                        timings,
                        &session.text,
                        &mut session.cache,
                        &self.layout,
                    ),
                    None => ResolvedHighlight::none(),
                };
                session.word_bounds = geometry.word.as_ref().map(|word| word.bounds());
                let composed = compose(&snapshot, &geometry);
                session.retry_geometry = composed.render_unavailable().is_some();
                session.painted = Some(snapshot);
                tracing::trace!(
                    word = ?snapshot.current_word_index,
                    sentence = ?snapshot.current_sentence_index,
                    layers = composed.layers().len(),
                    "highlight repaint"
                );
                output.frame = Some(composed);
            }

            // A height change alone leaves the snapshot equal, so the word
            // may have left the reading zone without a repaint.
            if repaint || self.viewport_height != self.followed_height {
                if let Some(bounds) = session.word_bounds {
                    self.scroller
                        .follow_at(bounds, self.viewport_height, max_offset, now);
                }
                self.followed_height = self.viewport_height;
            }

            output.position_ms = session.position_ms;
            output.word_index = snapshot.current_word_index;
            output.sentence_index = snapshot.current_sentence_index;
        }

        output.scroll_offset = self.scroller.settle_at(now);
        output.scroll_target = self.scroller.target();
        self.budget.start_at(work_started).finish_at(Instant::now());
        output
    }

    /// End the session: release the position source, close content and
    /// dispose the fullscreen controller. Idempotent.
    pub fn dispose(&mut self) {
        self.detach_source();
        if self.session.is_some() {
            self.close_content();
        }
        self.fullscreen.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::ManualPositionSource;
    use readalong_render::LayerKind;
    use readalong_text::{LayoutContext, MonospaceLayout, TextStyle};
    use std::time::Duration;

    const TEXT: &str = "Hello world";
    const TIMING: &str = r#"{"words": [
        {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
        {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0, "charStart": 6, "charEnd": 11}
    ]}"#;

    fn engine() -> HighlightEngine<MonospaceLayout> {
        let mut e = HighlightEngine::new(MonospaceLayout::new(1.0), EngineConfig::default());
        e.set_style(HighlightStyle::default().with_layout(LayoutContext::new(
            TextStyle {
                font_size: 10.0,
                line_height: 2.0,
                letter_spacing: 0.0,
            },
            1000.0,
        )));
        e.set_viewport(1000.0, 400.0);
        e
    }

    #[test]
    fn frame_without_content_is_idle() {
        let mut e = engine();
        e.push_position(100);
        let out = e.frame_at(Instant::now());
        assert!(!out.repainted());
        assert_eq!(out.word_index, None);
    }

    #[test]
    fn resolves_and_repaints_on_change_only() {
        let mut e = engine();
        assert_eq!(e.open_content_json(TEXT, TIMING), Ok(HighlightStatus::Active));
        let now = Instant::now();

        e.push_position(0);
        let out = e.frame_at(now);
        assert!(out.repainted());
        assert_eq!(out.word_index, Some(0));

        e.push_position(550);
        let out = e.frame_at(now);
        assert!(!out.repainted());
        assert_eq!(out.word_index, Some(0));

        e.push_position(1300);
        let out = e.frame_at(now);
        let frame = out.frame.expect("word changed");
        assert_eq!(out.word_index, Some(1));
        assert!(frame.layer(LayerKind::WordBand).is_some());
        assert_eq!(e.current(), Some((1, 0)));
    }

    #[test]
    fn only_latest_position_is_used() {
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        for ms in [0, 100, 700] {
            e.push_position(ms);
        }
        let out = e.frame_at(Instant::now());
        assert_eq!(out.position_ms, Some(700));
        assert_eq!(out.word_index, Some(1));
    }

    #[test]
    fn invalid_timing_falls_back_to_plain_text() {
        let mut e = engine();
        let err = e.open_content_json(TEXT, "{}").unwrap_err();
        assert!(matches!(err, DataFormatError::Json(_)));
        assert_eq!(e.status(), Some(HighlightStatus::PlainText));
        assert_eq!(e.text(), Some(TEXT));

        e.push_position(700);
        let out = e.frame_at(Instant::now());
        let frame = out.frame.expect("first frame paints base text");
        assert!(!frame.has_bands());
    }

    #[test]
    fn missing_positions_mark_unavailable() {
        let mut e = engine();
        let json = r#"{"words": [
            {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
            {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0}
        ]}"#;
        let status = e.open_content_json(TEXT, json).unwrap();
        assert!(status.highlighting_unavailable());
        e.push_position(0);
        let out = e.frame_at(Instant::now());
        assert_eq!(out.word_index, Some(0));
        assert!(!out.frame.unwrap().has_bands());
    }

    #[test]
    fn content_switch_resets_session() {
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        e.push_position(700);
        e.frame_at(Instant::now());
        assert_eq!(e.cache_stats().unwrap().size, 2);

        let other = r#"{"words": [
            {"word": "Bye", "startMs": 0, "endMs": 300, "sentenceIndex": 0, "charStart": 0, "charEnd": 3}
        ]}"#;
        e.open_content_json("Bye", other).unwrap();
        assert_eq!(e.cache_stats().unwrap().size, 0);
        assert_eq!(e.current(), None);
        let out = e.frame_at(Instant::now());
        assert_eq!(out.position_ms, None);
    }

    #[test]
    fn backward_jump_resets_hint() {
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        let now = Instant::now();
        e.push_position(1000);
        e.frame_at(now);
        e.push_position(100);
        let out = e.frame_at(now);
        assert_eq!(out.word_index, Some(0));
        assert!(e.lookup_stats().unwrap().full_searches >= 1);
    }

    #[test]
    fn layout_failure_is_retried_next_frame() {
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        e.set_viewport(1.0, 400.0);
        e.push_position(0);
        let out = e.frame_at(Instant::now());
        assert!(out.frame.unwrap().render_unavailable().is_some());

        e.set_viewport(1000.0, 400.0);
        let out = e.frame_at(Instant::now());
        let frame = out.frame.expect("retry after failure");
        assert!(frame.has_bands());
    }

    #[test]
    fn source_drives_positions_and_detaches() {
        let source = Arc::new(ManualPositionSource::new());
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        e.attach_source(source.clone());
        assert!(e.has_source());
        source.set_position(650);
        assert_eq!(e.frame_at(Instant::now()).word_index, Some(1));

        e.detach_source();
        assert_eq!(source.subscriber_count(), 0);
        source.set_position(0);
        assert_eq!(e.frame_at(Instant::now()).word_index, Some(1));
    }

    #[test]
    fn fullscreen_ticks_with_frames() {
        let mut e = engine();
        let start = Instant::now();
        e.fullscreen_mut().start_fullscreen_timer_at(start);
        assert!(!e.frame_at(start + Duration::from_millis(100)).fullscreen);
        assert!(e.frame_at(start + Duration::from_millis(3000)).fullscreen);
        e.on_interaction_at(start + Duration::from_millis(3100));
        assert!(!e.fullscreen().is_fullscreen());
    }

    #[test]
    fn open_content_accepts_parsed_document() {
        let mut e = engine();
        let doc = TimingDocument::from_json(TIMING).unwrap();
        assert_eq!(e.open_content(TEXT, doc), Ok(HighlightStatus::Active));
        assert!(e.is_open());
        e.close_content();
        assert!(!e.is_open());
        assert_eq!(e.status(), None);
    }

    #[test]
    fn user_scroll_cancels_auto_scroll() {
        let mut e = engine();
        e.set_viewport(1000.0, 10.0);
        e.open_content_json(TEXT, TIMING).unwrap();
        let now = Instant::now();
        e.push_position(0);
        e.frame_at(now);
        e.user_scrolled(42.0);
        let out = e.frame_at(now);
        assert_eq!(out.scroll_offset, 42.0);
        assert_eq!(out.scroll_target, None);
    }

    #[test]
    fn shrinking_viewport_refollows_without_repaint() {
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        let now = Instant::now();
        e.push_position(700);
        let out = e.frame_at(now);
        assert!(out.repainted());
        assert_eq!(out.scroll_target, None);

        // "world" sits on the first 20px line, centre 10; a 20px viewport
        // puts its reading zone at 4..8.
        e.set_viewport(1000.0, 20.0);
        let out = e.frame_at(now);
        assert!(!out.repainted());
        let target = out.scroll_target.expect("word left the reading zone");
        assert!((target - 4.0).abs() < 1e-3, "{target}");

        let out = e.frame_at(now);
        assert_eq!(out.scroll_target, Some(target));
        assert_eq!(e.scroller().retargets(), 0);
    }

    #[test]
    fn dispose_is_idempotent() {
        let source = Arc::new(ManualPositionSource::new());
        let mut e = engine();
        e.open_content_json(TEXT, TIMING).unwrap();
        e.attach_source(source.clone());
        e.fullscreen_mut().enter_fullscreen();
        e.dispose();
        e.dispose();
        assert!(!e.is_open());
        assert!(!e.fullscreen().is_fullscreen());
        assert_eq!(source.subscriber_count(), 0);
    }
}
