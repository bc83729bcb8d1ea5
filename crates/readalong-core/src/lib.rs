#![forbid(unsafe_code)]

//! Core: screen geometry and easing primitives shared by the highlight engine.

pub mod animation;
pub mod geometry;

pub use animation::{EasingFn, Tween};
pub use geometry::{Rect, Size};
