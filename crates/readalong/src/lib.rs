#![forbid(unsafe_code)]

//! Readalong public facade crate.
//!
//! Re-exports the stable surface of the internal crates and offers a
//! prelude for hosts embedding the highlight engine.
//!
//! # Example
//! ```
//! use std::time::Instant;
//! use readalong::prelude::*;
//!
//! let timing = r#"{"words": [
//!     {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
//!     {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0, "charStart": 6, "charEnd": 11}
//! ]}"#;
//!
//! let mut engine = HighlightEngine::new(MonospaceLayout::default(), EngineConfig::default());
//! engine.set_viewport(640.0, 480.0);
//! engine.open_content_json("Hello world", timing)?;
//! engine.push_position(700);
//! let out = engine.frame_at(Instant::now());
//! assert_eq!(out.word_index, Some(1));
//! # Ok::<(), readalong::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use readalong_core::{Rect, Size, Tween};

// --- Text re-exports -------------------------------------------------------

pub use readalong_text::{
    CacheStats, CharRange, DataFormatError, GEOMETRY_CACHE_CAPACITY, Geometry, GeometryCache,
    HighlightAvailability, LayoutContext, LayoutError, LookupStats, LookupTable,
    MonospaceLayout, SentenceBoundary, TextIdentity, TextLayout, TextStyle, TimingCollection,
    TimingDocument, WordTiming,
};

// --- Render re-exports -----------------------------------------------------

pub use readalong_render::{
    ComposedFrame, HighlightSnapshot, HighlightStyle, LayerKind, PackedRgba, PaintLayer,
    RenderUnavailable, should_repaint,
};

// --- Runtime re-exports ----------------------------------------------------

pub use readalong_runtime::{
    AutoScroller, ConfigError, EngineConfig, FrameOutput, FullscreenController, FullscreenState,
    HighlightEngine, HighlightStatus, LatestPosition, ManualPositionSource, PositionCallback,
    PositionSource, PositionSubscription, ReadingZone, ScrollTiming, SubscriptionId,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for readalong hosts.
#[derive(Debug)]
pub enum Error {
    /// Timing data failed structural validation.
    DataFormat(DataFormatError),
    /// The layout engine could not measure a range.
    Layout(LayoutError),
    /// I/O failure while loading text or timing files.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataFormat(err) => write!(f, "invalid timing data: {err}"),
            Self::Layout(err) => write!(f, "layout failed: {err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataFormat(err) => Some(err),
            Self::Layout(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<DataFormatError> for Error {
    fn from(err: DataFormatError) -> Self {
        Self::DataFormat(err)
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<RenderUnavailable> for Error {
    fn from(err: RenderUnavailable) -> Self {
        Self::Layout(err.error)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for readalong APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CharRange, EngineConfig, Error, FrameOutput, HighlightEngine, HighlightStatus,
        HighlightStyle, LayerKind, ManualPositionSource, MonospaceLayout, PositionSource, Rect,
        Result, TextLayout, TimingCollection, TimingDocument,
    };

    pub use crate::{core, render, runtime, text};
}

pub use readalong_core as core;
pub use readalong_render as render;
pub use readalong_runtime as runtime;
pub use readalong_text as text;
