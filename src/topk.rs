use ahash::AHashSet as HashSet;
use std::cmp::Ordering;

/// An item with the keys it is ranked by.
#[derive(Debug, Clone)]
pub(crate) struct Ranked<T> {
    pub(crate) score: f64,
    pub(crate) support: usize,
    /// Unique identity; also breaks remaining ties.
    pub(crate) key: String,
    pub(crate) item: T,
}

/// `Less` means `a` ranks ahead of `b`: higher score, then higher support,
/// then the lexicographically smaller key.
fn rank_cmp<T>(a: &Ranked<T>, b: &Ranked<T>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.support.cmp(&a.support))
        .then_with(|| a.key.cmp(&b.key))
}

/// Bounded collection keeping the `capacity` best distinct items.
///
/// Entries stay sorted best first. Inserting a key that is already present is
/// a no-op; when full, a newcomer must outrank the current worst entry, which
/// is then evicted.
#[derive(Debug)]
pub(crate) struct TopK<T> {
    capacity: usize,
    entries: Vec<Ranked<T>>,
    keys: HashSet<String>,
}

impl<T> TopK<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
            keys: HashSet::default(),
        }
    }

    /// Returns whether `ranked` was admitted.
    pub(crate) fn insert(&mut self, ranked: Ranked<T>) -> bool {
        if self.capacity == 0 || self.keys.contains(&ranked.key) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            if let Some(worst) = self.entries.last() {
                if rank_cmp(&ranked, worst) != Ordering::Less {
                    return false;
                }
            }
        }

        let position = self
            .entries
            .partition_point(|entry| rank_cmp(entry, &ranked) == Ordering::Less);
        self.keys.insert(ranked.key.clone());
        self.entries.insert(position, ranked);

        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop() {
                self.keys.remove(&evicted.key);
            }
        }
        true
    }

    pub(crate) fn best_score(&self) -> Option<f64> {
        self.entries.first().map(|entry| entry.score)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut Ranked<T>> {
        self.entries.iter_mut()
    }

    pub(crate) fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.item)
    }

    /// Consumes the collection, best first.
    pub(crate) fn into_entries(self) -> std::vec::IntoIter<Ranked<T>> {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(score: f64, support: usize, key: &str) -> Ranked<()> {
        Ranked {
            score,
            support,
            key: key.to_string(),
            item: (),
        }
    }

    fn keys(top: &TopK<()>) -> Vec<&str> {
        top.entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_keeps_sorted_best_first() {
        let mut top = TopK::new(3);
        assert!(top.insert(ranked(0.2, 2, "a")));
        assert!(top.insert(ranked(0.9, 2, "b")));
        assert!(top.insert(ranked(0.5, 2, "c")));
        assert_eq!(keys(&top), vec!["b", "c", "a"]);
        assert_eq!(top.best_score(), Some(0.9));
    }

    #[test]
    fn test_evicts_worst_when_full() {
        let mut top = TopK::new(2);
        top.insert(ranked(0.2, 2, "a"));
        top.insert(ranked(0.5, 2, "b"));
        assert!(top.insert(ranked(0.7, 2, "c")));
        assert_eq!(keys(&top), vec!["c", "b"]);
        assert!(!top.insert(ranked(0.1, 2, "d")));
        // evicted keys may come back
        assert!(!top.insert(ranked(0.2, 2, "a")));
        assert!(top.insert(ranked(0.6, 2, "a")));
        assert_eq!(keys(&top), vec!["c", "a"]);
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let mut top = TopK::new(4);
        assert!(top.insert(ranked(0.5, 2, "a")));
        assert!(!top.insert(ranked(0.9, 3, "a")));
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.best_score(), Some(0.5));
    }

    #[test]
    fn test_tie_breaks_by_support_then_key() {
        let mut top = TopK::new(3);
        top.insert(ranked(0.5, 2, "z"));
        top.insert(ranked(0.5, 4, "y"));
        top.insert(ranked(0.5, 2, "a"));
        assert_eq!(keys(&top), vec!["y", "a", "z"]);
    }

    #[test]
    fn test_equal_rank_does_not_evict_when_full() {
        let mut top = TopK::new(1);
        top.insert(ranked(0.5, 2, "a"));
        assert!(!top.insert(ranked(0.5, 2, "b")));
        assert_eq!(keys(&top), vec!["a"]);
    }

    #[test]
    fn test_zero_capacity_admits_nothing() {
        let mut top = TopK::new(0);
        assert!(!top.insert(ranked(1.0, 2, "a")));
        assert!(top.entries.is_empty());
    }
}
