#![forbid(unsafe_code)]

//! Text layout capability.
//!
//! The host supplies a [`TextLayout`] that converts a character range of the
//! displayed text into screen-space rectangles. Layout is treated as
//! expensive; the engine only calls it through the
//! [`GeometryCache`](crate::GeometryCache).
//!
//! [`MonospaceLayout`] is a deterministic reference engine that lays text out
//! on a fixed-advance grid with greedy word wrapping. It backs the replay tool
//! and the test suites.

use std::fmt;
use std::hash::{Hash, Hasher};

use readalong_core::geometry::Rect;
use rustc_hash::FxHasher;
use smallvec::SmallVec;

/// A half-open range of character (Unicode scalar) offsets into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CharRange {
    /// First character (inclusive).
    pub start: usize,
    /// One past the last character (exclusive).
    pub end: usize,
}

impl CharRange {
    /// Create a new range. `end` is clamped to be at least `start`.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: if end < start { start } else { end },
        }
    }

    /// Number of characters covered.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no characters.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this range.
    #[inline]
    pub const fn covers(&self, other: &CharRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Identity of a displayed text, derived from its content hash.
///
/// Two texts with equal identity are treated as the same content for cache
/// and repaint purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextIdentity(pub u64);

impl TextIdentity {
    /// Hash a text with FxHash.
    #[must_use]
    pub fn of(text: &str) -> Self {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Base text style handed to the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    /// Extra spacing between characters, in pixels.
    pub letter_spacing: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: 1.5,
            letter_spacing: 0.0,
        }
    }
}

/// Everything besides the text itself that determines layout output.
///
/// Any change to this value invalidates all cached geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    /// Base text style.
    pub style: TextStyle,
    /// Available layout width in pixels.
    pub max_width: f32,
}

impl LayoutContext {
    /// Create a layout context.
    pub const fn new(style: TextStyle, max_width: f32) -> Self {
        Self { style, max_width }
    }
}

/// Bounding rectangles for one character range.
///
/// A range that wraps across lines yields one rectangle per line segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    rects: SmallVec<[Rect; 2]>,
}

impl Geometry {
    /// Geometry with no rectangles.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build geometry from rectangles in line order.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            rects: rects.into_iter().collect(),
        }
    }

    /// Rectangles in line order.
    #[inline]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Whether there are no rectangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Smallest rectangle containing every line segment.
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r))
    }
}

/// Errors reported by a layout engine.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The range extends past the end of the text.
    RangeOutOfBounds {
        /// Requested range.
        range: CharRange,
        /// Text length in characters.
        len: usize,
    },
    /// The layout width cannot hold a single character.
    InvalidWidth(f32),
    /// Host layout engine failure.
    Engine(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::RangeOutOfBounds { range, len } => {
                write!(f, "range {range} out of bounds for text of {len} chars")
            }
            LayoutError::InvalidWidth(width) => write!(f, "invalid layout width: {width}"),
            LayoutError::Engine(msg) => write!(f, "layout engine error: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// A text layout engine.
///
/// Implementations must be pure: the same text, context and range always
/// produce the same geometry.
pub trait TextLayout {
    /// Measure `range` of `text` laid out under `context`.
    fn measure(
        &self,
        text: &str,
        context: &LayoutContext,
        range: CharRange,
    ) -> Result<Geometry, LayoutError>;
}

impl<T: TextLayout + ?Sized> TextLayout for &T {
    fn measure(
        &self,
        text: &str,
        context: &LayoutContext,
        range: CharRange,
    ) -> Result<Geometry, LayoutError> {
        (**self).measure(text, context, range)
    }
}

impl<T: TextLayout + ?Sized> TextLayout for Box<T> {
    fn measure(
        &self,
        text: &str,
        context: &LayoutContext,
        range: CharRange,
    ) -> Result<Geometry, LayoutError> {
        (**self).measure(text, context, range)
    }
}

// ---------------------------------------------------------------------------
// MonospaceLayout
// ---------------------------------------------------------------------------

/// Fixed-advance layout with greedy word wrapping.
///
/// Each character advances `font_size * advance_ratio + letter_spacing`
/// pixels; each line is `font_size * line_height` tall. Words that would
/// overflow the line move to the next one; words longer than a full line
/// are broken at the column limit. `'\n'` forces a line break and has no
/// width.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceLayout {
    advance_ratio: f32,
}

impl Default for MonospaceLayout {
    fn default() -> Self {
        Self { advance_ratio: 0.6 }
    }
}

impl MonospaceLayout {
    /// Create a layout with the given advance/font-size ratio.
    #[must_use]
    pub fn new(advance_ratio: f32) -> Self {
        Self {
            advance_ratio: advance_ratio.max(f32::MIN_POSITIVE),
        }
    }

    fn advance(&self, style: &TextStyle) -> f32 {
        style.font_size * self.advance_ratio + style.letter_spacing
    }

    /// Grid position `(line, column)` of every character.
    fn place(chars: &[char], columns: usize) -> Vec<(usize, usize)> {
        let mut positions = Vec::with_capacity(chars.len());
        let (mut line, mut col) = (0usize, 0usize);
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\n' {
                positions.push((line, col));
                line += 1;
                col = 0;
                i += 1;
                continue;
            }
            if c.is_whitespace() {
                if col >= columns {
                    line += 1;
                    col = 0;
                }
                positions.push((line, col));
                col += 1;
                i += 1;
                continue;
            }

            let word_end = chars[i..]
                .iter()
                .position(|c| c.is_whitespace())
                .map_or(chars.len(), |p| i + p);
            if col > 0 && col + (word_end - i) > columns {
                line += 1;
                col = 0;
            }
            for _ in i..word_end {
                if col >= columns {
                    line += 1;
                    col = 0;
                }
                positions.push((line, col));
                col += 1;
            }
            i = word_end;
        }
        positions
    }
}

impl TextLayout for MonospaceLayout {
    fn measure(
        &self,
        text: &str,
        context: &LayoutContext,
        range: CharRange,
    ) -> Result<Geometry, LayoutError> {
        let advance = self.advance(&context.style);
        if advance.is_nan()
            || advance <= 0.0
            || context.max_width.is_nan()
            || context.max_width < advance
        {
            return Err(LayoutError::InvalidWidth(context.max_width));
        }
        let chars: Vec<char> = text.chars().collect();
        if range.end > chars.len() {
            return Err(LayoutError::RangeOutOfBounds {
                range,
                len: chars.len(),
            });
        }

        let columns = (context.max_width / advance).floor() as usize;
        let line_height = context.style.font_size * context.style.line_height;
        let positions = Self::place(&chars, columns);

        // Merge consecutive characters on one line into a single rect.
        let mut rects: SmallVec<[Rect; 2]> = SmallVec::new();
        let mut run: Option<(usize, usize, usize)> = None; // (line, first col, last col)
        for idx in range.start..range.end {
            if chars[idx] == '\n' {
                continue;
            }
            let (line, col) = positions[idx];
            run = match run {
                Some((l, first, last)) if l == line && col == last + 1 => Some((l, first, col)),
                Some((l, first, last)) => {
                    rects.push(run_rect(l, first, last, advance, line_height));
                    Some((line, col, col))
                }
                None => Some((line, col, col)),
            };
        }
        if let Some((l, first, last)) = run {
            rects.push(run_rect(l, first, last, advance, line_height));
        }

        Ok(Geometry { rects })
    }
}

fn run_rect(line: usize, first: usize, last: usize, advance: f32, line_height: f32) -> Rect {
    Rect::new(
        first as f32 * advance,
        line as f32 * line_height,
        (last - first + 1) as f32 * advance,
        line_height,
    )
}
