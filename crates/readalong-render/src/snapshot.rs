#![forbid(unsafe_code)]

//! Immutable highlight state compared between ticks.
//!
//! A [`HighlightSnapshot`] captures everything that affects the painted
//! highlight. Snapshots are values: the engine builds a new one per tick and
//! [`should_repaint`] compares it with the previous one.
//!
//! ```
//! use readalong_render::{HighlightSnapshot, HighlightStyle, should_repaint};
//! use readalong_text::TextIdentity;
//!
//! let style = HighlightStyle::default();
//! let a = HighlightSnapshot::new(Some(3), Some(0), TextIdentity::of("text"), style);
//! let b = HighlightSnapshot { current_word_index: Some(4), ..a };
//! assert!(!should_repaint(&a, &a));
//! assert!(should_repaint(&a, &b));
//! ```

use readalong_text::{LayoutContext, TextIdentity, TextStyle};

use crate::color::PackedRgba;

/// Style parameters that affect the painted highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    /// Base text style and layout width.
    pub layout: LayoutContext,
    /// Base text color.
    pub text_color: PackedRgba,
    /// Sentence band fill.
    pub sentence_band: PackedRgba,
    /// Word band fill.
    pub word_band: PackedRgba,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            layout: LayoutContext::new(TextStyle::default(), 640.0),
            text_color: PackedRgba::BLACK,
            sentence_band: PackedRgba::rgba(255, 235, 150, 96),
            word_band: PackedRgba::rgba(255, 200, 40, 192),
        }
    }
}

impl HighlightStyle {
    /// Replace the layout context (builder).
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutContext) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the band colors (builder).
    #[must_use]
    pub fn with_bands(mut self, sentence: PackedRgba, word: PackedRgba) -> Self {
        self.sentence_band = sentence;
        self.word_band = word;
        self
    }
}

/// The highlight state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightSnapshot {
    /// Active word, if any.
    pub current_word_index: Option<usize>,
    /// Active sentence, if any.
    pub current_sentence_index: Option<usize>,
    /// Displayed text.
    pub text_identity: TextIdentity,
    /// Style parameters.
    pub style: HighlightStyle,
}

impl HighlightSnapshot {
    /// Create a snapshot.
    pub const fn new(
        current_word_index: Option<usize>,
        current_sentence_index: Option<usize>,
        text_identity: TextIdentity,
        style: HighlightStyle,
    ) -> Self {
        Self {
            current_word_index,
            current_sentence_index,
            text_identity,
            style,
        }
    }

    /// Snapshot with no active word or sentence.
    pub const fn idle(text_identity: TextIdentity, style: HighlightStyle) -> Self {
        Self::new(None, None, text_identity, style)
    }
}

/// Whether `current` must be painted given that `previous` is on screen.
///
/// True iff the word, sentence, text identity or style differ.
#[inline]
pub fn should_repaint(previous: &HighlightSnapshot, current: &HighlightSnapshot) -> bool {
    previous.current_word_index != current.current_word_index
        || previous.current_sentence_index != current.current_sentence_index
        || previous.text_identity != current.text_identity
        || previous.style != current.style
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HighlightSnapshot {
        HighlightSnapshot::new(Some(1), Some(0), TextIdentity::of("a b"), HighlightStyle::default())
    }

    #[test]
    fn identical_snapshots_do_not_repaint() {
        assert!(!should_repaint(&base(), &base()));
    }

    #[test]
    fn word_change_repaints() {
        let next = HighlightSnapshot {
            current_word_index: Some(2),
            ..base()
        };
        assert!(should_repaint(&base(), &next));
    }

    #[test]
    fn sentence_change_repaints() {
        let next = HighlightSnapshot {
            current_sentence_index: None,
            ..base()
        };
        assert!(should_repaint(&base(), &next));
    }

    #[test]
    fn text_change_repaints() {
        let next = HighlightSnapshot {
            text_identity: TextIdentity::of("a c"),
            ..base()
        };
        assert!(should_repaint(&base(), &next));
    }

    #[test]
    fn style_change_repaints() {
        let mut style = HighlightStyle::default();
        style.layout.max_width = 320.0;
        let next = HighlightSnapshot { style, ..base() };
        assert!(should_repaint(&base(), &next));

        let recolored = HighlightSnapshot {
            style: HighlightStyle::default().with_bands(PackedRgba::TRANSPARENT, PackedRgba::BLACK),
            ..base()
        };
        assert!(should_repaint(&base(), &recolored));
    }
}
