#![forbid(unsafe_code)]

//! Word and sentence timing index.
//!
//! [`TimingCollection`] maps a playback position in milliseconds to the
//! active word and sentence.
//!
//! # Resolution policy
//!
//! - Before the first word starts: no word.
//! - At or after the last word's start: the last word.
//! - Otherwise: the word whose `[start, end)` interval contains the time,
//!   or, inside a silent gap, the nearest preceding word. Highlight persists
//!   through silence until the next word begins.
//!
//! Both rules reduce to "the last word whose start is `<=` the time", which
//! stays well defined even for overlapping intervals.
//!
//! # Locality hint
//!
//! Playback queries arrive in increasing time order, usually landing on the
//! same word or the next one. The collection remembers the last resolved
//! index and probes forward from it (first linearly, then with doubling
//! steps) before falling back to a full binary search. The hint is a
//! performance aid only: a stale hint can never change a result.
//!
//! ```
//! use readalong_text::timing::{TimingCollection, WordTiming};
//!
//! let words = vec![
//!     WordTiming::new("Hello", 0, 500, 0).with_chars(0, 5),
//!     WordTiming::new("world", 600, 1200, 0).with_chars(6, 11),
//! ];
//! let timings = TimingCollection::new(words, Vec::new()).unwrap();
//! assert_eq!(timings.resolve_word(0), Some(0));
//! assert_eq!(timings.resolve_word(550), Some(0));
//! assert_eq!(timings.resolve_word(1300), Some(1));
//! ```

use std::cell::Cell;
use std::fmt;

use serde::Serialize;

use crate::layout::CharRange;

/// Number of words past the hint checked one by one before galloping.
const LINEAR_PROBE: usize = 2;

/// Furthest gallop distance from the hint before a full search.
const GALLOP_LIMIT: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structural problems in timing data.
///
/// Any of these disables highlighting for the content; plain text still
/// renders.
#[derive(Debug, Clone, PartialEq)]
pub enum DataFormatError {
    /// The timing file could not be decoded.
    Json(String),
    /// A word starts before its predecessor.
    NonMonotonicStart {
        /// Offending word index.
        index: usize,
        /// Predecessor start.
        previous_ms: u64,
        /// This word's start.
        start_ms: u64,
    },
    /// A word's end is not after its start.
    EmptyInterval {
        /// Offending word index.
        index: usize,
        /// Start time.
        start_ms: u64,
        /// End time.
        end_ms: u64,
    },
    /// A word's character range ends before it starts.
    InvalidCharRange {
        /// Offending word index.
        index: usize,
        /// `charStart`.
        char_start: usize,
        /// `charEnd`.
        char_end: usize,
    },
    /// A sentence's word range is inverted or outside the word list.
    InvalidSentenceRange {
        /// Offending sentence index.
        index: usize,
        /// First word index.
        word_start: usize,
        /// Last word index (inclusive).
        word_end: usize,
        /// Number of words.
        word_count: usize,
    },
    /// A word references a sentence that does not exist.
    SentenceIndexOutOfRange {
        /// Offending word index.
        word: usize,
        /// Referenced sentence.
        sentence_index: usize,
        /// Number of sentences.
        sentence_count: usize,
    },
    /// A word names a sentence whose word range does not include it.
    WordOutsideSentence {
        /// Offending word index.
        word: usize,
        /// Referenced sentence.
        sentence_index: usize,
    },
}

impl fmt::Display for DataFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormatError::Json(msg) => write!(f, "malformed timing data: {msg}"),
            DataFormatError::NonMonotonicStart {
                index,
                previous_ms,
                start_ms,
            } => write!(
                f,
                "word {index} starts at {start_ms}ms, before previous word at {previous_ms}ms"
            ),
            DataFormatError::EmptyInterval {
                index,
                start_ms,
                end_ms,
            } => write!(
                f,
                "word {index} has empty interval {start_ms}ms..{end_ms}ms"
            ),
            DataFormatError::InvalidCharRange {
                index,
                char_start,
                char_end,
            } => write!(
                f,
                "word {index} has inverted character range {char_start}..{char_end}"
            ),
            DataFormatError::InvalidSentenceRange {
                index,
                word_start,
                word_end,
                word_count,
            } => write!(
                f,
                "sentence {index} spans words {word_start}..={word_end} of {word_count}"
            ),
            DataFormatError::SentenceIndexOutOfRange {
                word,
                sentence_index,
                sentence_count,
            } => write!(
                f,
                "word {word} references sentence {sentence_index} of {sentence_count}"
            ),
            DataFormatError::WordOutsideSentence {
                word,
                sentence_index,
            } => write!(
                f,
                "word {word} is outside the word range of sentence {sentence_index}"
            ),
        }
    }
}

impl std::error::Error for DataFormatError {}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Timing for a single spoken word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordTiming {
    word: String,
    start_ms: u64,
    end_ms: u64,
    sentence_index: usize,
    chars: Option<CharRange>,
}

impl WordTiming {
    /// Create a word without character positions.
    pub fn new(word: impl Into<String>, start_ms: u64, end_ms: u64, sentence_index: usize) -> Self {
        Self {
            word: word.into(),
            start_ms,
            end_ms,
            sentence_index,
            chars: None,
        }
    }

    /// Attach a character range (builder).
    ///
    /// The range is stored as given; inverted ranges are rejected when the
    /// collection is built.
    #[must_use]
    pub fn with_chars(mut self, char_start: usize, char_end: usize) -> Self {
        self.chars = Some(CharRange {
            start: char_start,
            end: char_end,
        });
        self
    }

    /// The word text.
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Start offset in milliseconds (inclusive).
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// End offset in milliseconds (exclusive).
    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    /// Sentence this word belongs to.
    pub fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    /// Character range in the displayed text, if known.
    pub fn char_range(&self) -> Option<CharRange> {
        self.chars
    }

    /// Whether `time_ms` lies inside `[start, end)`.
    #[inline]
    pub fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }
}

/// A sentence expressed as an inclusive range over the word sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceBoundary {
    /// Sentence text.
    pub text: String,
    /// Start offset in milliseconds.
    pub start_ms: u64,
    /// End offset in milliseconds.
    pub end_ms: u64,
    /// First word index.
    pub word_start_index: usize,
    /// Last word index (inclusive).
    pub word_end_index: usize,
    /// Character range in the displayed text, if known.
    pub chars: Option<CharRange>,
}

impl SentenceBoundary {
    /// Number of words in the sentence.
    pub fn word_count(&self) -> usize {
        self.word_end_index - self.word_start_index + 1
    }
}

/// Whether character-level highlighting can be drawn for a content.
///
/// Character positions are all-or-nothing: one word without them disables
/// highlighting for the whole content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightAvailability {
    /// Every word carries a character range.
    Available,
    /// Some words lack character ranges.
    Unavailable {
        /// Number of words without a character range.
        missing: usize,
    },
}

impl HighlightAvailability {
    /// Whether highlight bands can be drawn.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, HighlightAvailability::Available)
    }

    /// Whether the "highlighting unavailable" status should be shown.
    #[inline]
    pub fn highlighting_unavailable(&self) -> bool {
        !self.is_available()
    }
}

/// Counters describing how lookups were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LookupStats {
    /// Lookups answered from the hint or its neighborhood.
    pub hint_hits: u64,
    /// Lookups that needed a binary search over all words.
    pub full_searches: u64,
    /// Lookups answered by the before-first / at-or-after-last clamps.
    pub clamped: u64,
}

/// Dense `[word, sentence]` table sampled at a fixed interval.
///
/// Serialized with the same field names the upstream pipeline uses; `-1`
/// encodes "no word".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTable {
    /// Format version.
    pub version: String,
    /// Sampling interval in milliseconds.
    pub interval: u64,
    /// Total covered duration.
    pub total_duration_ms: u64,
    /// One `[word, sentence]` entry per interval, starting at 0ms.
    pub lookup: Vec<[i64; 2]>,
}

// ---------------------------------------------------------------------------
// TimingCollection
// ---------------------------------------------------------------------------

/// Immutable timing data for one piece of content, plus a locality hint.
///
/// Replaced wholesale when the content changes; never edited in place.
///
/// # Thread Safety
///
/// The hint lives in a [`Cell`], so lookups take `&self` but the collection
/// is not `Sync`. Use it from the single update path that owns it.
#[derive(Debug, Clone)]
pub struct TimingCollection {
    words: Vec<WordTiming>,
    sentences: Vec<SentenceBoundary>,
    duration_ms: u64,
    availability: HighlightAvailability,
    hint: Cell<Option<usize>>,
    stats: Cell<LookupStats>,
}

impl TimingCollection {
    /// Validate and index word timings.
    ///
    /// When `sentences` is empty, boundaries are derived from runs of equal
    /// `sentence_index`; those indices must then count up from zero.
    pub fn new(
        words: Vec<WordTiming>,
        sentences: Vec<SentenceBoundary>,
    ) -> Result<Self, DataFormatError> {
        validate_words(&words)?;

        let availability = match words.iter().filter(|w| w.chars.is_none()).count() {
            0 => HighlightAvailability::Available,
            missing => HighlightAvailability::Unavailable { missing },
        };

        let mut sentences = if sentences.is_empty() {
            derive_sentences(&words)
        } else {
            sentences
        };
        validate_sentences(&words, &sentences)?;

        for sentence in &mut sentences {
            sentence.chars = if availability.is_available() {
                sentence
                    .chars
                    .or_else(|| sentence_chars(&words, sentence))
            } else {
                None
            };
        }

        let duration_ms = words.last().map_or(0, |w| w.end_ms);
        Ok(Self {
            words,
            sentences,
            duration_ms,
            availability,
            hint: Cell::new(None),
            stats: Cell::new(LookupStats::default()),
        })
    }

    /// Override the total duration (builder). Never shorter than the last word.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms.max(self.duration_ms);
        self
    }

    /// All words in start order.
    pub fn words(&self) -> &[WordTiming] {
        &self.words
    }

    /// All sentences in order.
    pub fn sentences(&self) -> &[SentenceBoundary] {
        &self.sentences
    }

    /// Word at `index`.
    pub fn word(&self, index: usize) -> Option<&WordTiming> {
        self.words.get(index)
    }

    /// Sentence at `index`.
    pub fn sentence(&self, index: usize) -> Option<&SentenceBoundary> {
        self.sentences.get(index)
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether there are no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Total duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Character highlight availability.
    pub fn availability(&self) -> HighlightAvailability {
        self.availability
    }

    /// Playback progress at `time_ms` in [0.0, 1.0].
    pub fn progress(&self, time_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (time_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    /// Lookup counters since creation or the last [`reset_stats`](Self::reset_stats).
    pub fn lookup_stats(&self) -> LookupStats {
        self.stats.get()
    }

    /// Reset lookup counters.
    pub fn reset_stats(&self) {
        self.stats.set(LookupStats::default());
    }

    /// Forget the locality hint.
    ///
    /// Call after a seek. Skipping it never affects results, only speed.
    pub fn reset_locality_cache(&self) {
        self.hint.set(None);
    }

    /// Index of the active word at `time_ms`.
    pub fn resolve_word(&self, time_ms: u64) -> Option<usize> {
        let first = self.words.first()?;
        if time_ms < first.start_ms {
            self.bump(|s| s.clamped += 1);
            return None;
        }
        let last = self.words.len() - 1;
        if time_ms >= self.words[last].start_ms {
            self.bump(|s| s.clamped += 1);
            self.hint.set(Some(last));
            return Some(last);
        }

        // Here words[0].start <= t < words[last].start, so the answer is in 0..last.
        let index = match self.probe_hint(time_ms, last) {
            Some(index) => {
                self.bump(|s| s.hint_hits += 1);
                index
            }
            None => {
                self.bump(|s| s.full_searches += 1);
                last_started(&self.words[..last], time_ms)
            }
        };
        self.hint.set(Some(index));
        Some(index)
    }

    /// Index of the active sentence at `time_ms`.
    pub fn resolve_sentence(&self, time_ms: u64) -> Option<usize> {
        self.resolve_word(time_ms)
            .map(|i| self.words[i].sentence_index)
    }

    /// Active `(word, sentence)` indices at `time_ms`.
    pub fn resolve(&self, time_ms: u64) -> Option<(usize, usize)> {
        self.resolve_word(time_ms)
            .map(|i| (i, self.words[i].sentence_index))
    }

    /// Sample the resolution policy every `interval_ms` over the duration.
    ///
    /// Leaves the locality hint reset.
    pub fn lookup_table(&self, interval_ms: u64) -> LookupTable {
        let interval = interval_ms.max(1);
        let lookup = (0..=self.duration_ms)
            .step_by(interval as usize)
            .map(|t| match self.resolve(t) {
                Some((w, s)) => [w as i64, s as i64],
                None => [-1, -1],
            })
            .collect();
        self.reset_locality_cache();
        LookupTable {
            version: "1.0".into(),
            interval,
            total_duration_ms: self.duration_ms,
            lookup,
        }
    }

    /// Try to answer from the hint and a bounded forward neighborhood.
    ///
    /// Requires `words[0].start <= t < words[last].start`.
    fn probe_hint(&self, time_ms: u64, last: usize) -> Option<usize> {
        let hint = self.hint.get()?;
        if hint >= last || self.words[hint].start_ms > time_ms {
            return None;
        }

        // Linear probe: the common case is "same word" or "next word".
        let linear_end = (hint + LINEAR_PROBE).min(last);
        for i in hint..linear_end {
            if self.words[i + 1].start_ms > time_ms {
                return Some(i);
            }
        }

        // Gallop forward with doubling steps.
        let mut low = linear_end;
        let mut step = 1;
        loop {
            let high = (low + step).min(last);
            if self.words[high].start_ms > time_ms {
                return Some(low + last_started(&self.words[low..high], time_ms));
            }
            if high == last || high - hint >= GALLOP_LIMIT {
                return None;
            }
            low = high;
            step *= 2;
        }
    }

    fn bump(&self, f: impl FnOnce(&mut LookupStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

/// Index of the last word in `words` whose start is `<= time_ms`.
///
/// Requires `words[0].start <= time_ms`.
#[inline]
fn last_started(words: &[WordTiming], time_ms: u64) -> usize {
    words
        .partition_point(|w| w.start_ms <= time_ms)
        .saturating_sub(1)
}

fn validate_words(words: &[WordTiming]) -> Result<(), DataFormatError> {
    let mut previous_ms = 0;
    for (index, w) in words.iter().enumerate() {
        if index > 0 && w.start_ms < previous_ms {
            return Err(DataFormatError::NonMonotonicStart {
                index,
                previous_ms,
                start_ms: w.start_ms,
            });
        }
        if w.end_ms <= w.start_ms {
            return Err(DataFormatError::EmptyInterval {
                index,
                start_ms: w.start_ms,
                end_ms: w.end_ms,
            });
        }
        if let Some(chars) = w.chars
            && chars.end < chars.start
        {
            return Err(DataFormatError::InvalidCharRange {
                index,
                char_start: chars.start,
                char_end: chars.end,
            });
        }
        previous_ms = w.start_ms;
    }
    Ok(())
}

fn validate_sentences(
    words: &[WordTiming],
    sentences: &[SentenceBoundary],
) -> Result<(), DataFormatError> {
    for (index, s) in sentences.iter().enumerate() {
        if s.word_end_index < s.word_start_index || s.word_end_index >= words.len() {
            return Err(DataFormatError::InvalidSentenceRange {
                index,
                word_start: s.word_start_index,
                word_end: s.word_end_index,
                word_count: words.len(),
            });
        }
    }
    for (word, w) in words.iter().enumerate() {
        if w.sentence_index >= sentences.len() {
            return Err(DataFormatError::SentenceIndexOutOfRange {
                word,
                sentence_index: w.sentence_index,
                sentence_count: sentences.len(),
            });
        }
        let s = &sentences[w.sentence_index];
        if word < s.word_start_index || word > s.word_end_index {
            return Err(DataFormatError::WordOutsideSentence {
                word,
                sentence_index: w.sentence_index,
            });
        }
    }
    Ok(())
}

/// Group consecutive words with equal `sentence_index` into boundaries.
fn derive_sentences(words: &[WordTiming]) -> Vec<SentenceBoundary> {
    let mut sentences: Vec<SentenceBoundary> = Vec::new();
    let mut start = 0;
    for i in 1..=words.len() {
        let boundary = i == words.len() || words[i].sentence_index != words[start].sentence_index;
        if !boundary {
            continue;
        }
        let run = &words[start..i];
        sentences.push(SentenceBoundary {
            text: run
                .iter()
                .map(WordTiming::word)
                .collect::<Vec<_>>()
                .join(" "),
            start_ms: run[0].start_ms,
            end_ms: run[run.len() - 1].end_ms,
            word_start_index: start,
            word_end_index: i - 1,
            chars: None,
        });
        start = i;
    }
    sentences
}

fn sentence_chars(words: &[WordTiming], sentence: &SentenceBoundary) -> Option<CharRange> {
    let first = words.get(sentence.word_start_index)?.chars?;
    let last = words.get(sentence.word_end_index)?.chars?;
    Some(CharRange::new(first.start, last.end))
}
