#![forbid(unsafe_code)]

//! Timing file format.
//!
//! The timing file is produced upstream by the voice-synthesis pipeline.
//! Field names are camelCase; the snake_case spellings the pipeline also
//! emits are accepted as aliases. A file may hold the timing record at the
//! top level or wrapped in a content envelope under a `timing` key.
//!
//! ```
//! use readalong_text::document::TimingDocument;
//!
//! let json = r#"{
//!     "version": "1.0",
//!     "words": [
//!         {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
//!         {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0, "charStart": 6, "charEnd": 11}
//!     ],
//!     "sentences": [
//!         {"text": "Hello world", "startMs": 0, "endMs": 1200, "wordStartIndex": 0, "wordEndIndex": 1}
//!     ]
//! }"#;
//!
//! let timings = TimingDocument::from_json(json).unwrap().into_collection().unwrap();
//! assert_eq!(timings.resolve_word(550), Some(0));
//! assert!(timings.availability().is_available());
//! ```

use serde::{Deserialize, Serialize};

use crate::layout::CharRange;
use crate::timing::{DataFormatError, SentenceBoundary, TimingCollection, WordTiming};

/// One word entry in a timing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    /// Word text.
    pub word: String,
    /// Start offset in milliseconds.
    #[serde(alias = "start_ms")]
    pub start_ms: u64,
    /// End offset in milliseconds.
    #[serde(alias = "end_ms")]
    pub end_ms: u64,
    /// Owning sentence.
    #[serde(alias = "sentence_index")]
    pub sentence_index: usize,
    /// First character offset in the display text.
    #[serde(default, alias = "char_start", skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
    /// One past the last character offset.
    #[serde(default, alias = "char_end", skip_serializing_if = "Option::is_none")]
    pub char_end: Option<usize>,
}

/// One sentence entry in a timing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    /// Sentence text.
    #[serde(default)]
    pub text: String,
    /// Start offset in milliseconds.
    #[serde(alias = "start_ms")]
    pub start_ms: u64,
    /// End offset in milliseconds.
    #[serde(alias = "end_ms")]
    pub end_ms: u64,
    /// First word index.
    #[serde(alias = "word_start_index")]
    pub word_start_index: usize,
    /// Last word index (inclusive).
    #[serde(alias = "word_end_index")]
    pub word_end_index: usize,
    /// First character offset, when the pipeline recorded one.
    #[serde(default, alias = "char_start", skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
    /// One past the last character offset.
    #[serde(default, alias = "char_end", skip_serializing_if = "Option::is_none")]
    pub char_end: Option<usize>,
}

/// A decoded timing file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingDocument {
    /// Format version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Total audio duration in milliseconds.
    #[serde(
        default,
        alias = "total_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_duration_ms: Option<u64>,
    /// Words in start order.
    pub words: Vec<WordRecord>,
    /// Sentence boundaries. Derived from `sentenceIndex` when empty.
    #[serde(default)]
    pub sentences: Vec<SentenceRecord>,
}

impl TimingDocument {
    /// Decode a timing file.
    ///
    /// Accepts either a bare timing record or an envelope whose `timing`
    /// field holds one.
    pub fn from_json(json: &str) -> Result<Self, DataFormatError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| DataFormatError::Json(e.to_string()))?;
        let record = match value {
            serde_json::Value::Object(mut map) if !map.contains_key("words") => {
                map.remove("timing").unwrap_or(serde_json::Value::Object(map))
            }
            other => other,
        };
        serde_json::from_value(record).map_err(|e| DataFormatError::Json(e.to_string()))
    }

    /// Validate and build the time index.
    pub fn into_collection(self) -> Result<TimingCollection, DataFormatError> {
        let words = self
            .words
            .into_iter()
            .map(|w| {
                let timing = WordTiming::new(w.word, w.start_ms, w.end_ms, w.sentence_index);
                // Half-specified positions count as missing.
                match (w.char_start, w.char_end) {
                    (Some(start), Some(end)) => timing.with_chars(start, end),
                    _ => timing,
                }
            })
            .collect();
        let sentences = self
            .sentences
            .into_iter()
            .map(|s| SentenceBoundary {
                chars: match (s.char_start, s.char_end) {
                    (Some(start), Some(end)) if end > start => Some(CharRange::new(start, end)),
                    _ => None,
                },
                text: s.text,
                start_ms: s.start_ms,
                end_ms: s.end_ms,
                word_start_index: s.word_start_index,
                word_end_index: s.word_end_index,
            })
            .collect();

        let collection = TimingCollection::new(words, sentences)?;
        Ok(match self.total_duration_ms {
            Some(total) => collection.with_duration(total),
            None => collection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::HighlightAvailability;

    const HELLO_WORLD: &str = r#"{
        "version": "1.0",
        "totalDurationMs": 1500,
        "words": [
            {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
            {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0, "charStart": 6, "charEnd": 11}
        ],
        "sentences": [
            {"text": "Hello world", "startMs": 0, "endMs": 1200, "wordStartIndex": 0, "wordEndIndex": 1}
        ]
    }"#;

    #[test]
    fn parses_camel_case() {
        let doc = TimingDocument::from_json(HELLO_WORLD).unwrap();
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert_eq!(doc.total_duration_ms, Some(1500));
        assert_eq!(doc.words.len(), 2);
        assert_eq!(doc.words[1].char_end, Some(11));

        let t = doc.into_collection().unwrap();
        assert_eq!(t.duration_ms(), 1500);
        assert_eq!(t.sentences()[0].chars, Some(CharRange::new(0, 11)));
    }

    #[test]
    fn parses_snake_case_envelope() {
        let json = r#"{
            "display_text": "Hi there",
            "timing": {
                "total_duration_ms": 900,
                "words": [
                    {"word": "Hi", "start_ms": 0, "end_ms": 300, "sentence_index": 0, "char_start": 0, "char_end": 2},
                    {"word": "there", "start_ms": 300, "end_ms": 900, "sentence_index": 0, "char_start": 3, "char_end": 8}
                ],
                "sentences": [
                    {"text": "Hi there", "start_ms": 0, "end_ms": 900, "word_start_index": 0, "word_end_index": 1, "char_start": 0, "char_end": 8}
                ]
            }
        }"#;
        let t = TimingDocument::from_json(json)
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.resolve_word(450), Some(1));
        assert_eq!(t.sentences()[0].chars, Some(CharRange::new(0, 8)));
    }

    #[test]
    fn missing_char_end_disables_highlighting() {
        let json = r#"{"words": [
            {"word": "Hello", "startMs": 0, "endMs": 500, "sentenceIndex": 0, "charStart": 0, "charEnd": 5},
            {"word": "world", "startMs": 600, "endMs": 1200, "sentenceIndex": 0, "charStart": 6}
        ]}"#;
        let t = TimingDocument::from_json(json)
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(
            t.availability(),
            HighlightAvailability::Unavailable { missing: 1 }
        );
    }

    #[test]
    fn negative_time_is_format_error() {
        let json = r#"{"words": [{"word": "x", "startMs": -5, "endMs": 10, "sentenceIndex": 0}]}"#;
        assert!(matches!(
            TimingDocument::from_json(json),
            Err(DataFormatError::Json(_))
        ));
    }

    #[test]
    fn garbage_is_format_error() {
        assert!(matches!(
            TimingDocument::from_json("not json"),
            Err(DataFormatError::Json(_))
        ));
        assert!(matches!(
            TimingDocument::from_json(r#"{"version": "1.0"}"#),
            Err(DataFormatError::Json(_))
        ));
    }

    #[test]
    fn missing_sentence_index_is_format_error() {
        let json = r#"{"words": [
            {"word": "a", "startMs": 0, "endMs": 100, "sentenceIndex": 0},
            {"word": "b", "startMs": 100, "endMs": 200}
        ]}"#;
        let err = TimingDocument::from_json(json).unwrap_err();
        let DataFormatError::Json(msg) = err else {
            panic!("expected a JSON error, got {err:?}");
        };
        assert!(msg.contains("sentenceIndex"), "{msg}");
    }

    #[test]
    fn structural_errors_surface_from_collection() {
        let json = r#"{"words": [
            {"word": "a", "startMs": 300, "endMs": 500, "sentenceIndex": 0},
            {"word": "b", "startMs": 100, "endMs": 200, "sentenceIndex": 0}
        ]}"#;
        let err = TimingDocument::from_json(json)
            .unwrap()
            .into_collection()
            .unwrap_err();
        assert!(matches!(err, DataFormatError::NonMonotonicStart { index: 1, .. }));
    }

    #[test]
    fn serializes_camel_case() {
        let doc = TimingDocument::from_json(HELLO_WORLD).unwrap();
        let out = serde_json::to_string(&doc).unwrap();
        assert!(out.contains("\"startMs\":600"));
        assert!(out.contains("\"wordEndIndex\":1"));
        assert!(!out.contains("start_ms"));
    }
}
