#![forbid(unsafe_code)]

//! Three-layer highlight composition.
//!
//! Painting happens in two phases:
//!
//! 1. [`resolve`] turns the active word and sentence into geometry, going
//!    through the [`GeometryCache`] and calling the layout engine on misses.
//! 2. [`compose`] builds the ordered paint layers from already resolved
//!    geometry. It has no access to the layout engine, so the paint path
//!    has bounded latency.
//!
//! Layers are always ordered base text, sentence band, word band. A layout
//! failure in phase 1 yields a [`RenderUnavailable`] for that frame only:
//! the frame carries the base text and no bands.

use std::fmt;

use readalong_core::geometry::Rect;
use readalong_text::{CharRange, Geometry, GeometryCache, LayoutError, TextLayout, TimingCollection};
use smallvec::SmallVec;

use crate::color::PackedRgba;
use crate::snapshot::HighlightSnapshot;

/// Paint layers in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    /// The text itself.
    BaseText,
    /// Band behind the active sentence.
    SentenceBand,
    /// Band behind the active word.
    WordBand,
}

/// One paint layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintLayer {
    /// Which layer this is.
    pub kind: LayerKind,
    /// Fill color (text color for [`LayerKind::BaseText`]).
    pub color: PackedRgba,
    /// Band rectangles in line order. Empty for the base text.
    pub rects: SmallVec<[Rect; 4]>,
}

/// Layout failure that suppressed highlight bands for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUnavailable {
    /// Range that failed to measure.
    pub range: CharRange,
    /// Underlying layout error.
    pub error: LayoutError,
}

impl fmt::Display for RenderUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "highlight unavailable for {}: {}", self.range, self.error)
    }
}

impl std::error::Error for RenderUnavailable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Geometry for the active word and sentence, ready to paint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedHighlight {
    /// Active sentence geometry.
    pub sentence: Option<Geometry>,
    /// Active word geometry.
    pub word: Option<Geometry>,
    /// Set when a layout query failed for this frame.
    pub unavailable: Option<RenderUnavailable>,
}

impl ResolvedHighlight {
    /// Nothing to highlight.
    pub fn none() -> Self {
        Self::default()
    }

    fn failed(range: CharRange, error: LayoutError) -> Self {
        Self {
            sentence: None,
            word: None,
            unavailable: Some(RenderUnavailable { range, error }),
        }
    }
}

/// Resolve the geometry `snapshot` needs.
///
/// Binds `cache` to the snapshot's text and layout context first, so stale
/// geometry from another text or width is never returned. When the content
/// has no character positions nothing is measured.
pub fn resolve<L: TextLayout + ?Sized>(
    snapshot: &HighlightSnapshot,
    timings: &TimingCollection,
    text: &str,
    cache: &mut GeometryCache,
    layout: &L,
) -> ResolvedHighlight {
    if timings.availability().highlighting_unavailable() {
        return ResolvedHighlight::none();
    }
    let context = &snapshot.style.layout;
    cache.bind(snapshot.text_identity, context);

    let sentence_range = snapshot
        .current_sentence_index
        .and_then(|i| timings.sentence(i))
        .and_then(|s| s.chars);
    let word_range = snapshot
        .current_word_index
        .and_then(|i| timings.word(i))
        .and_then(|w| w.char_range());

    let mut resolved = ResolvedHighlight::none();
    if let Some(range) = sentence_range {
        match cache.get_or_measure(range, text, context, layout) {
            Ok(geometry) => resolved.sentence = Some(geometry),
            Err(error) => return unavailable(range, error),
        }
    }
    if let Some(range) = word_range {
        match cache.get_or_measure(range, text, context, layout) {
            Ok(geometry) => resolved.word = Some(geometry),
            Err(error) => return unavailable(range, error),
        }
    }
    resolved
}

fn unavailable(range: CharRange, error: LayoutError) -> ResolvedHighlight {
    #[cfg(feature = "tracing")]
    tracing::warn!(%range, %error, "highlight geometry unavailable");
    ResolvedHighlight::failed(range, error)
}

/// A composed frame: ordered paint layers for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedFrame {
    snapshot: HighlightSnapshot,
    layers: SmallVec<[PaintLayer; 3]>,
    unavailable: Option<RenderUnavailable>,
}

impl ComposedFrame {
    /// The snapshot this frame paints.
    pub fn snapshot(&self) -> &HighlightSnapshot {
        &self.snapshot
    }

    /// Layers in draw order.
    pub fn layers(&self) -> &[PaintLayer] {
        &self.layers
    }

    /// The layer of the given kind, if present.
    pub fn layer(&self, kind: LayerKind) -> Option<&PaintLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    /// Whether any highlight band is painted.
    pub fn has_bands(&self) -> bool {
        self.layers.iter().any(|l| l.kind != LayerKind::BaseText)
    }

    /// The layout failure that suppressed bands, if any.
    pub fn render_unavailable(&self) -> Option<&RenderUnavailable> {
        self.unavailable.as_ref()
    }
}

/// Build paint layers from resolved geometry.
///
/// Pure: touches neither the layout engine nor the cache.
pub fn compose(snapshot: &HighlightSnapshot, resolved: &ResolvedHighlight) -> ComposedFrame {
    let style = &snapshot.style;
    let mut layers: SmallVec<[PaintLayer; 3]> = SmallVec::new();
    layers.push(PaintLayer {
        kind: LayerKind::BaseText,
        color: style.text_color,
        rects: SmallVec::new(),
    });

    if resolved.unavailable.is_none() {
        let bands = [
            (LayerKind::SentenceBand, style.sentence_band, &resolved.sentence),
            (LayerKind::WordBand, style.word_band, &resolved.word),
        ];
        for (kind, color, geometry) in bands {
            let Some(geometry) = geometry else { continue };
            if geometry.is_empty() || color.is_transparent() {
                continue;
            }
            layers.push(PaintLayer {
                kind,
                color,
                rects: geometry.rects().iter().copied().collect(),
            });
        }
    }

    ComposedFrame {
        snapshot: *snapshot,
        layers,
        unavailable: resolved.unavailable.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::HighlightStyle;
    use readalong_text::{LayoutContext, MonospaceLayout, TextIdentity, TextStyle, WordTiming};
    use std::cell::Cell;

    const TEXT: &str = "Hello world. Bye now.";

    fn timings() -> TimingCollection {
        TimingCollection::new(
            vec![
                WordTiming::new("Hello", 0, 500, 0).with_chars(0, 5),
                WordTiming::new("world.", 600, 1200, 0).with_chars(6, 12),
                WordTiming::new("Bye", 1300, 1500, 1).with_chars(13, 16),
                WordTiming::new("now.", 1500, 1900, 1).with_chars(17, 21),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    fn style() -> HighlightStyle {
        // advance 10px, line 20px
        HighlightStyle::default().with_layout(LayoutContext::new(
            TextStyle {
                font_size: 10.0,
                line_height: 2.0,
                letter_spacing: 0.0,
            },
            1000.0,
        ))
    }

    fn snapshot(word: Option<usize>, sentence: Option<usize>) -> HighlightSnapshot {
        HighlightSnapshot::new(word, sentence, TextIdentity::of(TEXT), style())
    }

    struct Counting<'a> {
        inner: MonospaceLayout,
        calls: &'a Cell<usize>,
    }

    impl TextLayout for Counting<'_> {
        fn measure(
            &self,
            text: &str,
            context: &LayoutContext,
            range: CharRange,
        ) -> Result<Geometry, LayoutError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.measure(text, context, range)
        }
    }

    struct Failing;

    impl TextLayout for Failing {
        fn measure(&self, _: &str, _: &LayoutContext, _: CharRange) -> Result<Geometry, LayoutError> {
            Err(LayoutError::Engine("no font".into()))
        }
    }

    #[test]
    fn layers_are_ordered() {
        let t = timings();
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(1), Some(0));
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        let frame = compose(&snap, &resolved);

        let kinds: Vec<_> = frame.layers().iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            [LayerKind::BaseText, LayerKind::SentenceBand, LayerKind::WordBand]
        );
        let word = frame.layer(LayerKind::WordBand).unwrap();
        assert_eq!(word.rects.as_slice(), &[Rect::new(60.0, 0.0, 60.0, 20.0)]);
        let sentence = frame.layer(LayerKind::SentenceBand).unwrap();
        assert_eq!(sentence.rects.as_slice(), &[Rect::new(0.0, 0.0, 120.0, 20.0)]);
    }

    #[test]
    fn second_resolve_hits_cache() {
        let t = timings();
        let calls = Cell::new(0);
        let layout = Counting {
            inner: MonospaceLayout::new(1.0),
            calls: &calls,
        };
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(2), Some(1));
        resolve(&snap, &t, TEXT, &mut cache, &layout);
        assert_eq!(calls.get(), 2);
        resolve(&snap, &t, TEXT, &mut cache, &layout);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn compose_never_measures() {
        let t = timings();
        let calls = Cell::new(0);
        let layout = Counting {
            inner: MonospaceLayout::new(1.0),
            calls: &calls,
        };
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(0), Some(0));
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &layout);
        let before = calls.get();
        for _ in 0..10 {
            compose(&snap, &resolved);
        }
        assert_eq!(calls.get(), before);
    }

    #[test]
    fn layout_failure_drops_bands_for_the_frame() {
        let t = timings();
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(0), Some(0));
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &Failing);
        let frame = compose(&snap, &resolved);
        assert!(!frame.has_bands());
        assert_eq!(frame.layers().len(), 1);
        let err = frame.render_unavailable().unwrap();
        assert_eq!(err.range, CharRange::new(0, 12));
        assert!(err.to_string().contains("no font"));

        // Next frame with a working engine paints normally.
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        assert!(compose(&snap, &resolved).has_bands());
    }

    #[test]
    fn no_word_means_base_text_only() {
        let t = timings();
        let mut cache = GeometryCache::new();
        let snap = snapshot(None, None);
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        let frame = compose(&snap, &resolved);
        assert_eq!(frame.layers().len(), 1);
        assert!(frame.render_unavailable().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn unavailable_positions_skip_layout() {
        let t = TimingCollection::new(
            vec![
                WordTiming::new("Hello", 0, 500, 0).with_chars(0, 5),
                WordTiming::new("world", 600, 1200, 0),
            ],
            Vec::new(),
        )
        .unwrap();
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(0), Some(0));
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &Failing);
        assert_eq!(resolved, ResolvedHighlight::none());
        assert!(!compose(&snap, &resolved).has_bands());
    }

    #[test]
    fn transparent_band_is_skipped() {
        let t = timings();
        let mut cache = GeometryCache::new();
        let mut snap = snapshot(Some(0), Some(0));
        snap.style = snap
            .style
            .with_bands(PackedRgba::TRANSPARENT, PackedRgba::BLACK);
        let resolved = resolve(&snap, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        let frame = compose(&snap, &resolved);
        assert!(frame.layer(LayerKind::SentenceBand).is_none());
        assert!(frame.layer(LayerKind::WordBand).is_some());
    }

    #[test]
    fn width_change_invalidates_cache() {
        let t = timings();
        let mut cache = GeometryCache::new();
        let snap = snapshot(Some(0), Some(0));
        resolve(&snap, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        assert_eq!(cache.len(), 2);

        let mut narrow = snap;
        narrow.style.layout.max_width = 80.0;
        let resolved = resolve(&narrow, &t, TEXT, &mut cache, &MonospaceLayout::new(1.0));
        assert_eq!(cache.stats().invalidations, 1);
        // "Hello world." wraps at 8 columns.
        assert_eq!(resolved.sentence.unwrap().rects().len(), 2);
    }
}
