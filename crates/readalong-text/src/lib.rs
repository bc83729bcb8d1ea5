#![forbid(unsafe_code)]

//! Text-side data for readalong.
//!
//! This crate owns everything derived from the displayed text and its
//! timing file:
//! - [`TimingCollection`] - validated word/sentence timings and the time index
//! - [`TimingDocument`] - the JSON timing file format
//! - [`TextLayout`] - the layout capability, with [`MonospaceLayout`] as a
//!   deterministic reference engine
//! - [`GeometryCache`] - bounded LRU cache of range geometry
//!
//! # Example
//! ```
//! use readalong_text::{
//!     CharRange, GeometryCache, LayoutContext, MonospaceLayout, TextIdentity, TextStyle,
//!     TimingCollection, WordTiming,
//! };
//!
//! let text = "Hello world";
//! let timings = TimingCollection::new(
//!     vec![
//!         WordTiming::new("Hello", 0, 500, 0).with_chars(0, 5),
//!         WordTiming::new("world", 600, 1200, 0).with_chars(6, 11),
//!     ],
//!     Vec::new(),
//! )
//! .unwrap();
//!
//! let word = timings.resolve_word(700).unwrap();
//! let range = timings.word(word).unwrap().char_range().unwrap();
//! assert_eq!(range, CharRange::new(6, 11));
//!
//! let context = LayoutContext::new(TextStyle::default(), 640.0);
//! let mut cache = GeometryCache::new();
//! cache.bind(TextIdentity::of(text), &context);
//! let geometry = cache
//!     .get_or_measure(range, text, &context, &MonospaceLayout::default())
//!     .unwrap();
//! assert_eq!(geometry.rects().len(), 1);
//! ```

pub mod document;
pub mod geometry_cache;
pub mod layout;
pub mod timing;

pub use document::{SentenceRecord, TimingDocument, WordRecord};
pub use geometry_cache::{CacheStats, GEOMETRY_CACHE_CAPACITY, GeometryCache};
pub use layout::{
    CharRange, Geometry, LayoutContext, LayoutError, MonospaceLayout, TextIdentity, TextLayout,
    TextStyle,
};
pub use timing::{
    DataFormatError, HighlightAvailability, LookupStats, LookupTable, SentenceBoundary,
    TimingCollection, WordTiming,
};
