use super::strategies::arb_trace;
use crate::compress::{compress, MAX_GROWTH};
use crate::config::Config;
use crate::event::Sequence;
use crate::score::Scorable;
use crate::search::EpisodeSearch;
use proptest::prelude::*;
use ahash::AHashSet as HashSet;
use std::time::Duration;

fn quick_config() -> Config {
    Config::new(4, 0.5, 0.5, 0.5)
        .unwrap()
        .with_time_budget(Duration::from_millis(200))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Results never grow past the limit, never add atoms and never repeat.
    #[test]
    fn prop_compression_bounds(trace in arb_trace(3, 10)) {
        let input = Sequence::from_trace(&trace);
        let results = compress(&input, &quick_config()).unwrap();

        let limit = input.token_count() as f64 * MAX_GROWTH;
        let mut seen = HashSet::default();
        for compression in results.compressions() {
            prop_assert!(compression.token_count as f64 <= limit, "{} from {}", compression.text, trace);
            prop_assert!(seen.insert(compression.text.clone()), "duplicate {}", compression.text);

            let parsed = Sequence::parse(&compression.text).unwrap();
            prop_assert_eq!(parsed.token_count(), compression.token_count);
            prop_assert!(parsed.atom_count() <= input.atom_count());
            prop_assert_ne!(&compression.text, &trace);
        }
    }

    /// Any trace of two or more tokens has best episodes, each with
    /// pairwise disjoint windows.
    #[test]
    fn prop_best_episodes_tie(trace in arb_trace(3, 12)) {
        let config = quick_config();
        let events = Sequence::from_trace(&trace).into_events();
        let mut search = EpisodeSearch::new(&config);
        let best = search.best_episodes(&events).unwrap();
        if events.len() < 2 {
            prop_assert!(best.is_empty());
        } else {
            prop_assert!(!best.is_empty());
        }
        for episode in &best {
            prop_assert!(episode.support() >= 1);
            prop_assert!(episode.windows().windows(2).all(|pair| pair[0].end < pair[1].start));
        }
    }
}

/// Bolero fuzz test: no panics on arbitrary traces
#[cfg(test)]
#[test]
fn fuzz_compress_no_panic() {
    bolero::check!()
        .with_type::<Vec<u8>>()
        .with_iterations(64)
        .for_each(|input| {
            let trace: String = input.iter().take(10).map(|b| char::from(b'A' + b % 4)).collect();
            let results = compress(&Sequence::from_trace(&trace), &quick_config()).expect("compression runs");
            let _ = results.best();
            let _ = results.check(&trace);
        });
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_end_to_end_search_surfaces_repeats() {
        let config = Config::new(10, 0.5, 0.5, 0.5).unwrap();
        let events = Sequence::from_trace("AAABAAABBAAA").into_events();
        let mut search = EpisodeSearch::new(&config);

        let best = search.best_episodes(&events).unwrap();
        assert!(best.iter().any(|ep| ep.pattern().to_string() == "[A]" && ep.support() >= 3));

        let top = search.top_k(&events).unwrap();
        assert!(
            top.iter().any(|ep| ep.pattern().len() >= 2 && ep.support() >= 3),
            "top-k: {:?}",
            top.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_end_to_end_compression_respects_bounds() {
        let trace = "AAABAAABBAAA";
        let results = compress(&Sequence::from_trace(trace), &Config::default()).unwrap();
        for compression in results.compressions() {
            assert!(compression.token_count as f64 <= trace.len() as f64 * MAX_GROWTH);
        }
    }

    #[test]
    fn test_alternation_compresses_to_group() {
        let results = compress(&Sequence::from_trace("ABABAB"), &Config::default()).unwrap();
        assert!(results.contains("[AB]"), "{results}");
    }
}
