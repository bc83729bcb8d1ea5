#![forbid(unsafe_code)]

//! Highlight render path: snapshots, repaint decisions, paint layers and the
//! frame budget.

pub mod budget;
pub mod color;
pub mod compositor;
pub mod snapshot;

pub use budget::{FrameBudget, FrameTimer};
pub use color::PackedRgba;
pub use compositor::{
    ComposedFrame, LayerKind, PaintLayer, RenderUnavailable, ResolvedHighlight, compose, resolve,
};
pub use snapshot::{HighlightSnapshot, HighlightStyle, should_repaint};
