#![forbid(unsafe_code)]

//! LRU cache for layout-engine results.
//!
//! Layout queries are the expensive part of drawing highlight bands. This
//! cache memoizes [`Geometry`] per [`CharRange`] for one displayed content.
//!
//! # Invalidation
//!
//! Geometry depends on the text, the base style and the layout width. The
//! cache is bound to those inputs via [`GeometryCache::bind`]; any change
//! clears every entry at once. Partial invalidation is not supported.
//!
//! # Example
//! ```
//! use readalong_text::{CharRange, Geometry, GeometryCache};
//!
//! let mut cache = GeometryCache::new();
//! let g = cache
//!     .get_or_measure_with(CharRange::new(0, 5), |_| Ok(Geometry::empty()))
//!     .unwrap();
//! assert!(g.is_empty());
//! assert_eq!(cache.stats().misses, 1);
//! ```

use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::FxBuildHasher;

use crate::layout::{CharRange, Geometry, LayoutContext, LayoutError, TextIdentity, TextLayout};

/// Fixed number of cached ranges.
pub const GEOMETRY_CACHE_CAPACITY: usize = 100;

const CAPACITY: NonZeroUsize = match NonZeroUsize::new(GEOMETRY_CACHE_CAPACITY) {
    Some(n) => n,
    None => panic!("geometry cache capacity must be non-zero"),
};

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Current number of entries.
    pub size: usize,
    /// Maximum capacity.
    pub capacity: usize,
    /// Number of full invalidations.
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// The layout inputs cached geometry was computed under.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Binding {
    text: TextIdentity,
    context: LayoutContext,
}

/// Bounded LRU cache of range geometry.
///
/// Any lookup, hit or miss, marks the key most recently used. Inserting
/// past capacity evicts the least recently used key.
///
/// # Thread Safety
/// `GeometryCache` is not thread-safe. It belongs to the single update path
/// of one engine instance.
#[derive(Debug)]
pub struct GeometryCache {
    cache: LruCache<CharRange, Geometry, FxBuildHasher>,
    binding: Option<Binding>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryCache {
    /// Create an empty, unbound cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: LruCache::with_hasher(CAPACITY, FxBuildHasher),
            binding: None,
            hits: 0,
            misses: 0,
            invalidations: 0,
        }
    }

    /// Bind the cache to a text and layout context.
    ///
    /// Clears every entry when either differs from the current binding.
    /// Returns `true` if entries were invalidated.
    pub fn bind(&mut self, text: TextIdentity, context: &LayoutContext) -> bool {
        let next = Binding {
            text,
            context: *context,
        };
        if self.binding == Some(next) {
            return false;
        }
        let had_binding = self.binding.is_some();
        self.binding = Some(next);
        if had_binding {
            tracing::debug!(
                entries = self.cache.len(),
                text = text.0,
                max_width = context.max_width,
                "geometry cache invalidated"
            );
            self.invalidations += 1;
        }
        self.cache.clear();
        had_binding
    }

    /// Cached geometry for `range`, measuring with `layout` on a miss.
    ///
    /// Failed measurements are not cached.
    pub fn get_or_measure<L: TextLayout + ?Sized>(
        &mut self,
        range: CharRange,
        text: &str,
        context: &LayoutContext,
        layout: &L,
    ) -> Result<Geometry, LayoutError> {
        self.get_or_measure_with(range, |range| layout.measure(text, context, range))
    }

    /// Cached geometry for `range`, computing with `measure` on a miss.
    pub fn get_or_measure_with<F>(
        &mut self,
        range: CharRange,
        measure: F,
    ) -> Result<Geometry, LayoutError>
    where
        F: FnOnce(CharRange) -> Result<Geometry, LayoutError>,
    {
        if let Some(geometry) = self.cache.get(&range) {
            self.hits += 1;
            return Ok(geometry.clone());
        }

        self.misses += 1;
        let geometry = measure(range)?;
        if let Some((evicted, _)) = self.cache.push(range, geometry.clone())
            && evicted != range
        {
            tracing::trace!(%evicted, "geometry cache evicted");
        }
        Ok(geometry)
    }

    /// Cached geometry without computing. Updates LRU order.
    pub fn get(&mut self, range: CharRange) -> Option<&Geometry> {
        self.cache.get(&range)
    }

    /// Cached geometry without updating LRU order.
    pub fn peek(&self, range: CharRange) -> Option<&Geometry> {
        self.cache.peek(&range)
    }

    /// Whether `range` is cached. Does not update LRU order.
    pub fn contains(&self, range: CharRange) -> bool {
        self.cache.contains(&range)
    }

    /// The least recently used key, which the next insertion would evict.
    pub fn eviction_candidate(&self) -> Option<CharRange> {
        self.cache.peek_lru().map(|(k, _)| *k)
    }

    /// Drop every entry and the binding.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.binding = None;
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.invalidations = 0;
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.cache.len(),
            capacity: self.cache.cap().get(),
            invalidations: self.invalidations,
        }
    }

    /// Current number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{MonospaceLayout, TextStyle};
    use readalong_core::geometry::Rect;
    use std::cell::Cell;

    fn fake(range: CharRange) -> Result<Geometry, LayoutError> {
        Ok(Geometry::from_rects([Rect::new(
            range.start as f32,
            0.0,
            range.len() as f32,
            1.0,
        )]))
    }

    fn r(i: usize) -> CharRange {
        CharRange::new(i, i + 1)
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = GeometryCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), GEOMETRY_CACHE_CAPACITY);
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = GeometryCache::new();
        let calls = Cell::new(0);
        let measure = |range| {
            calls.set(calls.get() + 1);
            fake(range)
        };
        let a = cache.get_or_measure_with(r(3), measure).unwrap();
        let b = cache.get_or_measure_with(r(3), measure).unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.get(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn hundred_and_first_key_evicts_lru() {
        let mut cache = GeometryCache::new();
        for i in 0..100 {
            cache.get_or_measure_with(r(i), fake).unwrap();
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.eviction_candidate(), Some(r(0)));

        cache.get_or_measure_with(r(100), fake).unwrap();
        assert_eq!(cache.len(), 100);
        assert!(!cache.contains(r(0)));
        assert!(cache.contains(r(1)));
        assert!(cache.contains(r(100)));
    }

    #[test]
    fn access_protects_from_eviction() {
        let mut cache = GeometryCache::new();
        for i in 0..100 {
            cache.get_or_measure_with(r(i), fake).unwrap();
        }
        cache.get_or_measure_with(r(0), fake).unwrap();
        cache.get_or_measure_with(r(100), fake).unwrap();
        assert!(cache.contains(r(0)));
        assert!(!cache.contains(r(1)));
    }

    #[test]
    fn peek_does_not_update_lru() {
        let mut cache = GeometryCache::new();
        for i in 0..100 {
            cache.get_or_measure_with(r(i), fake).unwrap();
        }
        assert!(cache.peek(r(0)).is_some());
        cache.get_or_measure_with(r(100), fake).unwrap();
        assert!(!cache.contains(r(0)));
    }

    #[test]
    fn failed_measure_is_not_cached() {
        let mut cache = GeometryCache::new();
        let err = cache
            .get_or_measure_with(r(0), |_| Err(LayoutError::Engine("boom".into())))
            .unwrap_err();
        assert_eq!(err, LayoutError::Engine("boom".into()));
        assert!(cache.is_empty());
        assert!(cache.get_or_measure_with(r(0), fake).is_ok());
    }

    #[test]
    fn bind_change_clears_everything() {
        let ctx = LayoutContext::new(TextStyle::default(), 400.0);
        let text = TextIdentity::of("hello");
        let mut cache = GeometryCache::new();
        assert!(!cache.bind(text, &ctx));
        cache.get_or_measure_with(r(0), fake).unwrap();
        cache.get_or_measure_with(r(1), fake).unwrap();

        assert!(!cache.bind(text, &ctx));
        assert_eq!(cache.len(), 2);

        assert!(cache.bind(text, &LayoutContext::new(TextStyle::default(), 300.0)));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);

        cache.get_or_measure_with(r(0), fake).unwrap();
        let bold = TextStyle {
            font_size: 18.0,
            ..TextStyle::default()
        };
        assert!(cache.bind(text, &LayoutContext::new(bold, 300.0)));
        assert!(cache.is_empty());

        cache.get_or_measure_with(r(0), fake).unwrap();
        assert!(cache.bind(
            TextIdentity::of("other"),
            &LayoutContext::new(bold, 300.0)
        ));
        assert!(cache.is_empty());
    }

    #[test]
    #[tracing_test::traced_test]
    fn invalidation_is_logged() {
        let text = TextIdentity::of("hello");
        let mut cache = GeometryCache::new();
        cache.bind(text, &LayoutContext::new(TextStyle::default(), 400.0));
        assert!(!logs_contain("geometry cache invalidated"));
        cache.bind(text, &LayoutContext::new(TextStyle::default(), 200.0));
        assert!(logs_contain("geometry cache invalidated"));
    }

    #[test]
    fn measures_through_layout_engine() {
        let ctx = LayoutContext::new(TextStyle::default(), 1000.0);
        let mut cache = GeometryCache::new();
        let g = cache
            .get_or_measure(CharRange::new(0, 5), "Hello world", &ctx, &MonospaceLayout::default())
            .unwrap();
        assert_eq!(g.rects().len(), 1);
        assert!(cache.get(CharRange::new(0, 5)).is_some());
    }
}
