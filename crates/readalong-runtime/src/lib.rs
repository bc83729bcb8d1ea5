#![forbid(unsafe_code)]

//! Runtime for readalong: the per-session [`HighlightEngine`] and the
//! event-driven pieces it coordinates.
//!
//! Everything here runs on the host's single update path. Position
//! notifications may arrive from other threads, but they only land in a
//! [`LatestPosition`] mailbox that the engine drains once per frame.

pub mod autoscroll;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod fullscreen;
pub mod position;

pub use autoscroll::AutoScroller;
pub use config::{ConfigError, EngineConfig, EngineConfigParse, ReadingZone, ScrollTiming};
pub use countdown::{Countdown, CountdownToken};
pub use engine::{FrameOutput, HighlightEngine, HighlightStatus};
pub use fullscreen::{FullscreenController, FullscreenObserver, FullscreenState};
pub use position::{
    LatestPosition, ManualPositionSource, PositionCallback, PositionSource, PositionSubscription,
    SubscriptionId,
};
