#![forbid(unsafe_code)]

//! Simulated playback.
//!
//! The replay runs the engine on a synthetic clock: every frame advances
//! wall time by one frame interval and playback position by that interval
//! times the rate. Nothing sleeps, so a long recording replays instantly
//! and identically on every run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use readalong::{
    CacheStats, CharRange, EngineConfig, HighlightEngine, HighlightStatus, LookupStats,
    ManualPositionSource, MonospaceLayout, Size, TextLayout,
};

/// Simulated frame interval.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Playback continues this long past the last word so trailing scroll and
/// fullscreen events are seen.
const TAIL: Duration = Duration::from_millis(1000);

/// Replay parameters.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySettings {
    pub rate: f64,
    pub viewport: Size,
}

/// Something the reader would see change.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// The active word changed.
    Word {
        at_ms: u64,
        index: usize,
        sentence: usize,
        word: String,
    },
    /// An auto-scroll transition started.
    Scroll { at_ms: u64, target: f32 },
    /// The chrome was hidden or shown.
    Fullscreen { at_ms: u64, on: bool },
    /// Highlight bands were suppressed for a frame.
    RenderUnavailable { at_ms: u64, reason: String },
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word {
                at_ms,
                index,
                sentence,
                word,
            } => write!(f, "{at_ms:>8}ms  word {index:>5}  sentence {sentence:>4}  {word}"),
            Self::Scroll { at_ms, target } => write!(f, "{at_ms:>8}ms  scroll -> {target:.1}px"),
            Self::Fullscreen { at_ms, on } => {
                let state = if *on { "enter" } else { "exit" };
                write!(f, "{at_ms:>8}ms  fullscreen {state}")
            }
            Self::RenderUnavailable { at_ms, reason } => {
                write!(f, "{at_ms:>8}ms  highlight unavailable: {reason}")
            }
        }
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub status: HighlightStatus,
    pub events: Vec<ReplayEvent>,
    pub frames: u64,
    pub repaints: u64,
    pub cache: Option<CacheStats>,
    pub lookups: Option<LookupStats>,
}

/// Replay `text` against `timing_json`.
pub fn replay(
    text: &str,
    timing_json: &str,
    config: EngineConfig,
    settings: ReplaySettings,
) -> readalong::Result<ReplayReport> {
    let layout = MonospaceLayout::default();
    let mut engine = HighlightEngine::new(layout, config);
    engine.set_viewport(settings.viewport.width, settings.viewport.height);
    let status = engine.open_content_json(text, timing_json)?;
    engine.set_content_height(content_height(&engine, text));

    let toggles = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&toggles);
    engine.set_fullscreen_observer(move |on| sink.borrow_mut().push(on));

    let source = Arc::new(ManualPositionSource::new());
    engine.attach_source(source.clone());

    let duration_ms = engine.timings().map_or(0, |t| t.duration_ms());
    let end_ms = duration_ms + TAIL.as_millis() as u64;
    let start = Instant::now();
    engine.on_interaction_at(start);

    let mut report = ReplayReport {
        status,
        events: Vec::new(),
        frames: 0,
        repaints: 0,
        cache: None,
        lookups: None,
    };
    let mut last_word = None;
    let mut last_target = None;

    loop {
        let elapsed = FRAME_INTERVAL * report.frames as u32;
        let at_ms = (elapsed.as_millis() as f64 * settings.rate).round() as u64;
        if at_ms > end_ms {
            break;
        }
        source.set_position(at_ms);
        let out = engine.frame_at(start + elapsed);
        report.frames += 1;

        for on in toggles.borrow_mut().drain(..) {
            report.events.push(ReplayEvent::Fullscreen { at_ms, on });
        }
        if let Some(frame) = &out.frame {
            report.repaints += 1;
            if let Some(unavailable) = frame.render_unavailable() {
                report.events.push(ReplayEvent::RenderUnavailable {
                    at_ms,
                    reason: unavailable.to_string(),
                });
            }
        }
        if out.word_index != last_word
            && let (Some(index), Some(sentence)) = (out.word_index, out.sentence_index)
        {
            let word = engine
                .timings()
                .and_then(|t| t.word(index))
                .map_or_else(String::new, |w| w.word().to_string());
            report.events.push(ReplayEvent::Word {
                at_ms,
                index,
                sentence,
                word,
            });
        }
        last_word = out.word_index;
        if let Some(target) = out.scroll_target
            && last_target != Some(target)
        {
            report.events.push(ReplayEvent::Scroll { at_ms, target });
        }
        last_target = out.scroll_target;
    }

    report.cache = engine.cache_stats();
    report.lookups = engine.lookup_stats();
    engine.dispose();
    Ok(report)
}

/// Height of the laid-out text, if the layout can measure it.
fn content_height<L: TextLayout>(engine: &HighlightEngine<L>, text: &str) -> Option<f32> {
    let all = CharRange::new(0, text.chars().count());
    if all.is_empty() {
        return None;
    }
    engine
        .layout()
        .measure(text, &engine.style().layout, all)
        .ok()
        .map(|g| g.bounds().bottom())
}
