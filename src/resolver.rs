//! Overlap resolution.
//!
//! Extending an episode usually produces overlapping windows. The resolver
//! turns such a window list into up to `k` alternative sets of pairwise
//! non-overlapping windows, ranked by the same score as episodes.
//!
//! Windows are processed in ascending order and grown into a forest of
//! chains stored in a [`SlotMap`]: each node points at its predecessor, so a
//! chain is read back by walking parent keys from a tip. The tips of the best
//! chains are kept in a [`TopK`]; a new window is appended to every tip it does
//! not overlap, or else to the nearest ancestor of each tip that it does not
//! overlap, or else starts a new chain.

use crate::episode::{Episode, Window};
use crate::event::Sequence;
use crate::score::{ScoreParams, Scorable};
use crate::topk::{Ranked, TopK};
use ahash::AHashSet as HashSet;
use slotmap::{DefaultKey, SlotMap};
use std::fmt::Write as _;

/// One window of a chain.
#[derive(Debug, Clone)]
struct ChainNode {
    window: Window,
    parent: Option<DefaultKey>,
    /// Windows on the chain up to and including this one.
    depth: usize,
    /// Tokens covered by those windows.
    inside: usize,
    /// Start of the chain's first window.
    first_start: usize,
}

/// Chain ending at a node, viewed as a scorable window set.
struct ChainView<'a> {
    node: &'a ChainNode,
    pattern_len: usize,
}

impl Scorable for ChainView<'_> {
    fn support(&self) -> usize {
        self.node.depth
    }

    fn pattern_len(&self) -> usize {
        self.pattern_len
    }

    fn inside_tokens(&self) -> usize {
        self.node.inside
    }

    fn span(&self) -> usize {
        self.node.window.end - self.node.first_start
    }
}

#[derive(Debug, Default)]
struct Forest {
    nodes: SlotMap<DefaultKey, ChainNode>,
    /// (parent, window) pairs already attached during backtracking.
    claimed: HashSet<(DefaultKey, Window)>,
}

impl Forest {
    fn attach(&mut self, window: Window, parent: Option<DefaultKey>) -> DefaultKey {
        let node = match parent.and_then(|key| self.nodes.get(key)) {
            Some(parent_node) => ChainNode {
                window,
                parent,
                depth: parent_node.depth + 1,
                inside: parent_node.inside + window.len(),
                first_start: parent_node.first_start,
            },
            None => ChainNode {
                window,
                parent: None,
                depth: 1,
                inside: window.len(),
                first_start: window.start,
            },
        };
        self.nodes.insert(node)
    }

    fn end(&self, key: DefaultKey) -> usize {
        self.nodes[key].window.end
    }

    fn parent(&self, key: DefaultKey) -> Option<DefaultKey> {
        self.nodes[key].parent
    }

    /// Nearest node on the chain from `tip` whose window ends before `start`.
    fn ancestor_before(&self, tip: DefaultKey, start: usize) -> Option<DefaultKey> {
        let mut cursor = Some(tip);
        while let Some(key) = cursor {
            if self.end(key) < start {
                return Some(key);
            }
            cursor = self.parent(key);
        }
        None
    }

    /// Windows of the chain ending at `tip`, in trace order.
    fn chain(&self, tip: DefaultKey) -> Vec<Window> {
        let mut windows = Vec::with_capacity(self.nodes[tip].depth);
        let mut cursor = Some(tip);
        while let Some(key) = cursor {
            windows.push(self.nodes[key].window);
            cursor = self.parent(key);
        }
        windows.reverse();
        windows
    }

    fn rank(&self, tip: DefaultKey, pattern_len: usize, params: &ScoreParams) -> Ranked<DefaultKey> {
        let node = &self.nodes[tip];
        let view = ChainView { node, pattern_len };
        let mut key = String::new();
        for window in self.chain(tip) {
            let _ = write!(key, "{window}");
        }
        Ranked {
            score: view.score(params),
            support: node.depth,
            key,
            item: tip,
        }
    }
}

/// Splits `candidates` into at most `k` non-overlapping window sets for
/// `pattern`, best first.
///
/// Every returned episode has windows in ascending order. Sets with a
/// single window are returned too; callers filter by support.
pub fn resolve(pattern: &Sequence, candidates: &[Window], params: &ScoreParams, k: usize) -> Vec<Episode> {
    let mut windows = candidates.to_vec();
    windows.sort_unstable();
    windows.dedup();

    let pattern_len = pattern.len();
    let mut forest = Forest::default();
    let mut tips: TopK<DefaultKey> = TopK::new(k);

    for window in windows {
        let current: Vec<DefaultKey> = tips.items().copied().collect();

        let accepting: Vec<DefaultKey> = current
            .iter()
            .copied()
            .filter(|&tip| forest.end(tip) < window.start)
            .collect();
        let mut placed: Vec<DefaultKey> = accepting
            .into_iter()
            .map(|tip| forest.attach(window, Some(tip)))
            .collect();

        if placed.is_empty() {
            for &tip in &current {
                let Some(ancestor) = forest.ancestor_before(tip, window.start) else {
                    continue;
                };
                if forest.claimed.insert((ancestor, window)) {
                    placed.push(forest.attach(window, Some(ancestor)));
                }
            }
        }

        if placed.is_empty() {
            placed.push(forest.attach(window, None));
        }

        for node in placed {
            let ranked = forest.rank(node, pattern_len, params);
            if !tips.insert(ranked) {
                forest.nodes.remove(node);
            }
        }
    }

    tips.into_entries()
        .map(|entry| Episode::new(pattern.clone(), forest.chain(entry.item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::Event;

    fn pattern(len: usize) -> Sequence {
        Sequence::from_events((0..len).map(|i| Event::call(i.to_string())).collect())
    }

    fn params() -> ScoreParams {
        ScoreParams::new(&Config::default(), 4)
    }

    fn windows(pairs: &[(usize, usize)]) -> Vec<Window> {
        pairs.iter().map(|&(s, e)| Window::new(s, e)).collect()
    }

    fn is_non_overlapping(windows: &[Window]) -> bool {
        windows.windows(2).all(|pair| pair[0].end < pair[1].start)
    }

    #[test]
    fn test_disjoint_windows_form_one_chain() {
        let input = windows(&[(0, 1), (2, 3), (4, 5)]);
        let resolved = resolve(&pattern(2), &input, &params(), 10);
        assert_eq!(resolved[0].windows(), input.as_slice());
    }

    #[test]
    fn test_overlapping_pair_splits() {
        // (0,1) and (1,2) overlap; the best chains keep one of them with (3,4)
        let input = windows(&[(0, 1), (1, 2), (3, 4)]);
        let resolved = resolve(&pattern(2), &input, &params(), 10);
        assert!(resolved.iter().all(|ep| is_non_overlapping(ep.windows())));
        assert_eq!(resolved[0].support(), 2);
        let best: Vec<_> = resolved.iter().filter(|ep| ep.support() == 2).collect();
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let resolved = resolve(&pattern(1), &windows(&[(4, 4), (0, 0), (2, 2)]), &params(), 10);
        assert_eq!(resolved[0].windows(), windows(&[(0, 0), (2, 2), (4, 4)]).as_slice());
    }

    #[test]
    fn test_respects_k() {
        let input = windows(&[(0, 2), (1, 3), (2, 4), (3, 5), (4, 6), (5, 7)]);
        let resolved = resolve(&pattern(2), &input, &params(), 2);
        assert!(resolved.len() <= 2);
        assert!(resolved.iter().all(|ep| is_non_overlapping(ep.windows())));
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve(&pattern(1), &[], &params(), 5).is_empty());
    }

    #[test]
    fn test_results_are_distinct() {
        let input = windows(&[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
        let resolved = resolve(&pattern(2), &input, &params(), 10);
        for (i, a) in resolved.iter().enumerate() {
            for b in &resolved[i + 1..] {
                assert_ne!(a.windows(), b.windows());
            }
        }
    }
}
