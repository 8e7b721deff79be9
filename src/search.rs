//! Proximity top-k episode search.
//!
//! Every distinct token seeds a single-token episode. Each round extends the
//! unexplored members of the bounded top-k set by one more token, resolves
//! the resulting overlapping windows, and feeds the resolved episodes back
//! into the set. The search ends once a round adds nothing.

use crate::config::Config;
use crate::episode::Episode;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::resolver::resolve;
use crate::score::{ScoreParams, Scorable};
use crate::topk::{Ranked, TopK};
use ahash::AHashMap as HashMap;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace};

/// Occurrence positions of every distinct token, in first-seen order.
#[derive(Debug)]
struct TokenIndex {
    tokens: Vec<Event>,
    positions: Vec<Vec<usize>>,
}

impl TokenIndex {
    fn build(trace: &[Event]) -> Self {
        let mut slots: HashMap<&Event, usize> = HashMap::default();
        let mut tokens = Vec::new();
        let mut positions: Vec<Vec<usize>> = Vec::new();
        for (position, event) in trace.iter().enumerate() {
            let slot = *slots.entry(event).or_insert_with(|| {
                tokens.push(event.clone());
                positions.push(Vec::new());
                tokens.len() - 1
            });
            positions[slot].push(position);
        }
        Self { tokens, positions }
    }

    fn iter(&self) -> impl Iterator<Item = (&Event, &[usize])> {
        self.tokens.iter().zip(self.positions.iter().map(Vec::as_slice))
    }

    fn max_support(&self) -> usize {
        self.positions.iter().map(Vec::len).max().unwrap_or(0)
    }
}

fn rank(episode: Episode, params: &ScoreParams) -> Ranked<Episode> {
    Ranked {
        score: episode.score(params),
        support: episode.support(),
        key: episode.to_string(),
        item: episode,
    }
}

/// Episode search over one trace at a time.
///
/// The worker pool is created on first use and reused for every later
/// search made through the same value.
pub struct EpisodeSearch<'c> {
    config: &'c Config,
    pool: Option<ThreadPool>,
}

impl<'c> EpisodeSearch<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config, pool: None }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Every kept episode of the final top-k set, best first.
    pub fn top_k(&mut self, trace: &[Event]) -> Result<Vec<Episode>> {
        Ok(self.explore(trace)?.into_entries().map(|entry| entry.item).collect())
    }

    /// All kept episodes tied at the best score, with redundant single-group
    /// nesting flattened.
    ///
    /// Empty when the trace is shorter than two tokens.
    pub fn best_episodes(&mut self, trace: &[Event]) -> Result<Vec<Episode>> {
        let top = self.explore(trace)?;
        let Some(best) = top.best_score() else {
            return Ok(Vec::new());
        };
        let tied: Vec<Episode> = top
            .into_entries()
            .take_while(|entry| entry.score == best)
            .map(|entry| entry.item.flatten())
            .collect();
        debug!(best_score = best, ties = tied.len(), "best episodes selected");
        Ok(tied)
    }

    fn explore(&mut self, trace: &[Event]) -> Result<TopK<Episode>> {
        let k = self.config.k;
        let mut top = TopK::new(k);
        if trace.len() < 2 {
            return Ok(top);
        }

        let index = TokenIndex::build(trace);
        let params = ScoreParams::new(self.config, index.max_support());
        debug!(
            trace_len = trace.len(),
            distinct = index.tokens.len(),
            max_support = params.max_support,
            "episode search started"
        );

        for (token, positions) in index.iter() {
            top.insert(rank(Episode::seed(token, positions), &params));
        }

        let mut round = 0usize;
        loop {
            let mut frontier = 0usize;
            let mut raw = Vec::new();
            for entry in top.entries_mut().filter(|entry| !entry.item.explored) {
                entry.item.explored = true;
                frontier += 1;
                for (token, positions) in index.iter() {
                    let extended = entry.item.extend_with(token, positions, self.config.gap_ratio);
                    if extended.support() >= 2 {
                        raw.push(extended);
                    }
                }
            }
            if frontier == 0 {
                break;
            }

            round += 1;
            let resolved = self.resolve_all(raw, &params, round)?;
            for episode in resolved.into_iter().flatten() {
                if episode.support() >= 2 {
                    top.insert(rank(episode, &params));
                }
            }
        }

        Ok(top)
    }

    fn resolve_all(&mut self, raw: Vec<Episode>, params: &ScoreParams, round: usize) -> Result<Vec<Vec<Episode>>> {
        let k = self.config.k;
        let total: usize = raw.iter().map(Episode::support).sum();
        let parallel = raw.len() > 1 && total > self.config.parallel_threshold * raw.len();
        trace!(round, extensions = raw.len(), windows = total, parallel, "resolving extensions");

        if !parallel {
            return Ok(raw
                .iter()
                .map(|episode| resolve(episode.pattern(), episode.windows(), params, k))
                .collect());
        }

        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?,
        };
        let resolved = pool.install(|| {
            raw.into_par_iter()
                .map(|episode| resolve(episode.pattern(), episode.windows(), params, k))
                .collect()
        });
        self.pool = Some(pool);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Sequence;

    fn trace(text: &str) -> Vec<Event> {
        Sequence::from_trace(text).into_events()
    }

    #[test]
    fn test_index_positions() {
        let index = TokenIndex::build(&trace("ABAAB"));
        assert_eq!(index.tokens, vec![Event::call("A"), Event::call("B")]);
        assert_eq!(index.positions, vec![vec![0, 2, 3], vec![1, 4]]);
        assert_eq!(index.max_support(), 3);
    }

    #[test]
    fn test_short_trace_has_no_episodes() {
        let config = Config::default();
        let mut search = EpisodeSearch::new(&config);
        assert!(search.best_episodes(&trace("A")).expect("search runs").is_empty());
        assert!(search.best_episodes(&[]).expect("search runs").is_empty());
    }

    #[test]
    fn test_alternating_pair_wins() {
        let config = Config::default();
        let mut search = EpisodeSearch::new(&config);
        let best = search.best_episodes(&trace("ABAB")).expect("search runs");
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].pattern().to_string(), "[AB]");
        assert_eq!(best[0].support(), 2);
    }

    #[test]
    fn test_top_k_is_bounded_and_ranked() {
        let config = Config::new(3, 0.5, 0.5, 0.5).expect("valid config");
        let mut search = EpisodeSearch::new(&config);
        let params = ScoreParams::new(&config, 4);
        let top = search.top_k(&trace("ABCABCABCA")).expect("search runs");
        assert!(top.len() <= 3);
        let scores: Vec<f64> = top.iter().map(|ep| ep.score(&params)).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_no_repeat_keeps_single_tokens() {
        let config = Config::default();
        let mut search = EpisodeSearch::new(&config);
        let top = search.top_k(&trace("ABCD")).expect("search runs");
        // Seeds are always kept; nothing longer can reach support 2.
        assert_eq!(top.len(), 4);
        assert!(top.iter().all(|ep| ep.pattern().len() == 1));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let text = "ABCABDABCABDABCABD";
        let sequential = Config::default();
        let parallel = Config::default()
            .with_parallel_threshold(0)
            .with_workers(2)
            .expect("two workers are valid");

        let seq_best = EpisodeSearch::new(&sequential)
            .best_episodes(&trace(text))
            .expect("search runs");
        let par_best = EpisodeSearch::new(&parallel)
            .best_episodes(&trace(text))
            .expect("search runs");

        let render = |eps: &[Episode]| eps.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(render(&seq_best), render(&par_best));
    }
}
