//! Property-based invariant tests for the time index.
//!
//! 1. Resolution agrees with a naive "last word started" scan.
//! 2. Before the first word there is no word; at or after the last start
//!    there is always the last word.
//! 3. Inside a word's interval that word (or a later overlapping one) wins.
//! 4. Increasing query times never resolve to a decreasing word index.
//! 5. The locality hint never changes a result, in any query order.
//! 6. The sentence always contains the word, whether boundaries are derived
//!    or supplied explicitly.
//! 7. Explicit boundaries that contradict a word's sentence are rejected.

use proptest::prelude::*;
use readalong_text::{DataFormatError, TimingCollection, WordTiming};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Words built from (gap, duration) pairs, 4 words per sentence.
fn collection_strategy() -> impl Strategy<Value = TimingCollection> {
    prop::collection::vec((0u64..300, 1u64..600), 1..200).prop_map(|spans| {
        let mut t = 0;
        let words = spans
            .into_iter()
            .enumerate()
            .map(|(i, (gap, len))| {
                let start = t + gap;
                t = start + len;
                WordTiming::new(format!("w{i}"), start, start + len, i / 4)
                    .with_chars(i * 3, i * 3 + 2)
            })
            .collect();
        TimingCollection::new(words, Vec::new()).expect("generated timings are valid")
    })
}

fn naive(words: &[WordTiming], t: u64) -> Option<usize> {
    words.iter().rposition(|w| w.start_ms() <= t)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Agreement with a naive scan
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn matches_naive_scan(
        timings in collection_strategy(),
        queries in prop::collection::vec(0u64..200_000, 1..100),
    ) {
        for t in queries {
            prop_assert_eq!(timings.resolve_word(t), naive(timings.words(), t), "t={}", t);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Clamp policy
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clamps_at_both_ends(timings in collection_strategy(), past in 0u64..100_000) {
        let first = timings.words()[0].start_ms();
        if first > 0 {
            prop_assert_eq!(timings.resolve_word(first - 1), None);
        }
        let last = timings.len() - 1;
        let last_start = timings.words()[last].start_ms();
        prop_assert_eq!(timings.resolve_word(last_start + past), Some(last));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Containment
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn word_interval_resolves_to_that_word(timings in collection_strategy(), pick in any::<prop::sample::Index>()) {
        let i = pick.index(timings.len());
        let w = &timings.words()[i];
        for t in [w.start_ms(), (w.start_ms() + w.end_ms()) / 2, w.end_ms() - 1] {
            let resolved = timings.resolve_word(t).expect("inside a word");
            prop_assert!(resolved >= i, "t={} resolved {} before {}", t, resolved, i);
            prop_assert!(timings.words()[resolved].start_ms() <= t);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Monotone resolution
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn increasing_time_never_moves_backwards(
        timings in collection_strategy(),
        mut queries in prop::collection::vec(0u64..200_000, 2..200),
    ) {
        queries.sort_unstable();
        let mut previous: Option<usize> = None;
        for t in queries {
            let current = timings.resolve_word(t);
            prop_assert!(current >= previous, "t={} {:?} < {:?}", t, current, previous);
            previous = current;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. The hint is invisible
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn hint_never_changes_results(
        timings in collection_strategy(),
        queries in prop::collection::vec(0u64..200_000, 1..200),
    ) {
        let cold = timings.clone();
        for t in queries {
            cold.reset_locality_cache();
            prop_assert_eq!(timings.resolve_word(t), cold.resolve_word(t));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Sentence contains word
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sentence_contains_word(timings in collection_strategy(), t in 0u64..200_000) {
        if let Some((word, sentence)) = timings.resolve(t) {
            let s = timings.sentence(sentence).expect("sentence exists");
            prop_assert!(s.word_start_index <= word && word <= s.word_end_index);
        }
    }

    #[test]
    fn explicit_sentence_contains_word(timings in collection_strategy(), t in 0u64..200_000) {
        let explicit = TimingCollection::new(
            timings.words().to_vec(),
            timings.sentences().to_vec(),
        )
        .expect("derived boundaries are valid when supplied explicitly");
        prop_assert_eq!(explicit.sentences(), timings.sentences());
        if let Some((word, sentence)) = explicit.resolve(t) {
            let s = explicit.sentence(sentence).expect("sentence exists");
            prop_assert!(s.word_start_index <= word && word <= s.word_end_index);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Contradictory explicit boundaries
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reversed_sentences_are_rejected(timings in collection_strategy()) {
        let mut sentences = timings.sentences().to_vec();
        prop_assume!(sentences.len() >= 2);
        sentences.reverse();
        let err = TimingCollection::new(timings.words().to_vec(), sentences)
            .expect_err("reversed boundaries contradict the words");
        prop_assert!(
            matches!(err, DataFormatError::WordOutsideSentence { word: 0, sentence_index: 0 }),
            "{:?}",
            err
        );
    }
}

#[test]
fn sequential_playback_rarely_searches() {
    let words = (0..10_000)
        .map(|i| {
            let start = i as u64 * 250;
            WordTiming::new(format!("w{i}"), start, start + 200, i / 12)
        })
        .collect();
    let timings = TimingCollection::new(words, Vec::new()).unwrap();
    for t in (0..2_500_000).step_by(16) {
        timings.resolve_word(t);
    }
    let stats = timings.lookup_stats();
    assert!(stats.full_searches <= 1, "{stats:?}");
}
