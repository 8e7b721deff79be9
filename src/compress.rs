//! Compression driver.
//!
//! Starting from the input trace, every candidate root is searched for its
//! best episodes. Each best episode derives a new root: consecutive
//! occurrences closer than `gap_ratio × pattern length` are merged into one
//! group, wider gaps between merged runs are compressed recursively and
//! spliced back. Derived roots are queued unless they grew too much, gained
//! atoms, or repeat an earlier root. Roots that derive nothing new are the
//! results.

use crate::config::Config;
use crate::episode::{Episode, Window};
use crate::error::{Error, Result};
use crate::event::{Event, Sequence};
use crate::linear::LinearEvent;
use crate::merge::{merge, MergeOutcome};
use crate::score::Scorable;
use crate::search::EpisodeSearch;
use ahash::AHashSet as HashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Largest accepted token count of a derived root, relative to the input.
pub const MAX_GROWTH: f64 = 1.25;

/// Rendered in place of results when the time budget ran out.
pub const TIMEOUT_SENTINEL: &str = "OverTime";

/// Outcome of comparing a reference solution with a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckCode {
    Found,
    TimedOut,
    NotFound,
}

impl CheckCode {
    /// Numeric code: 1 found, -1 timed out, 2 not found.
    pub fn code(self) -> i8 {
        match self {
            CheckCode::Found => 1,
            CheckCode::TimedOut => -1,
            CheckCode::NotFound => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    optional: usize,
    alignments: usize,
    merges: usize,
}

impl Counters {
    fn record(&mut self, outcome: &MergeOutcome) {
        self.optional += outcome.new_optionals;
        self.alignments += outcome.alignments;
        self.merges += 1;
    }

    fn absorb(&mut self, other: &Counters) {
        self.optional += other.optional;
        self.alignments += other.alignments;
        self.merges += other.merges;
    }
}

/// A working trace with the counters accumulated while deriving it.
#[derive(Debug, Clone)]
pub struct Root {
    sequence: Sequence,
    counters: Counters,
}

impl Root {
    fn new(events: Vec<Event>) -> Self {
        Self {
            sequence: Sequence::root_from_events(events),
            counters: Counters::default(),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn events(&self) -> &[Event] {
        self.sequence.events()
    }

    pub fn token_count(&self) -> usize {
        self.sequence.token_count()
    }

    pub fn atom_count(&self) -> usize {
        self.sequence.atom_count()
    }

    pub fn optional_count(&self) -> usize {
        self.counters.optional
    }

    pub fn alignment_count(&self) -> usize {
        self.counters.alignments
    }

    pub fn merge_count(&self) -> usize {
        self.counters.merges
    }
}

/// One compressed form of the input with its statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compression {
    /// Bracket rendering, `*` marking optional elements.
    pub text: String,
    /// Linear length of the compressed form.
    pub token_count: usize,
    pub optional_count: usize,
    pub alignment_count: usize,
    pub merge_count: usize,
}

impl From<&Root> for Compression {
    fn from(root: &Root) -> Self {
        Self {
            text: root.sequence.to_string(),
            token_count: root.token_count(),
            optional_count: root.optional_count(),
            alignment_count: root.alignment_count(),
            merge_count: root.merge_count(),
        }
    }
}

/// Distinct compressed forms found for one input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionSet {
    compressions: Vec<Compression>,
    timed_out: bool,
    explored: usize,
    elapsed: Duration,
}

impl CompressionSet {
    pub fn compressions(&self) -> &[Compression] {
        &self.compressions
    }

    pub fn len(&self) -> usize {
        self.compressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compressions.is_empty()
    }

    /// Whether the time budget expired before exploration finished.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Number of candidate roots processed.
    pub fn explored(&self) -> usize {
        self.explored
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn contains(&self, text: &str) -> bool {
        self.compressions.iter().any(|c| c.text == text)
    }

    /// Rendered results, followed by [`TIMEOUT_SENTINEL`] when timed out.
    pub fn texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.compressions.iter().map(|c| c.text.clone()).collect();
        if self.timed_out {
            texts.push(TIMEOUT_SENTINEL.to_string());
        }
        texts
    }

    /// Compares a reference solution with the results.
    ///
    /// The solution is normalized through [`Sequence::parse`] when it parses,
    /// so separators and `]*` suffixes do not matter.
    pub fn check(&self, solution: &str) -> CheckCode {
        let normalized = Sequence::parse(solution)
            .map(|seq| seq.to_string())
            .unwrap_or_else(|_| solution.to_string());
        if self.contains(&normalized) {
            CheckCode::Found
        } else if self.timed_out {
            CheckCode::TimedOut
        } else {
            CheckCode::NotFound
        }
    }

    /// Shortest linear form, ties broken by rendering.
    pub fn best(&self) -> Option<&Compression> {
        self.compressions
            .iter()
            .min_by(|a, b| a.token_count.cmp(&b.token_count).then_with(|| a.text.cmp(&b.text)))
    }
}

impl fmt::Display for CompressionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for text in self.texts() {
            writeln!(f, "{text}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(start: Instant, budget: Duration) -> Self {
        Deadline(start.checked_add(budget))
    }

    fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

struct Candidate {
    root: Root,
    exhausted: bool,
}

struct Derived {
    root: Root,
    /// At least two occurrences were merged into one group.
    bridged: bool,
    /// A recursive gap compression ran out of time.
    timed_out: bool,
}

struct Exploration {
    results: Vec<Root>,
    explored: usize,
    timed_out: bool,
}

impl Exploration {
    fn best(&self) -> Option<&Root> {
        self.results.iter().min_by(|a, b| {
            a.token_count()
                .cmp(&b.token_count())
                .then_with(|| a.sequence.to_string().cmp(&b.sequence.to_string()))
        })
    }
}

/// Runs compressions with a fixed configuration.
///
/// # Example
///
/// ```
/// use tracefold::{Compressor, Config, Sequence};
///
/// let config = Config::default();
/// let mut compressor = Compressor::new(&config).unwrap();
/// let results = compressor.compress_sequence(&Sequence::from_trace("ABCABC")).unwrap();
/// assert!(results.contains("[ABC]"));
/// ```
pub struct Compressor<'c> {
    config: &'c Config,
    search: EpisodeSearch<'c>,
}

impl<'c> Compressor<'c> {
    pub fn new(config: &'c Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            search: EpisodeSearch::new(config),
        })
    }

    pub fn compress_sequence(&mut self, trace: &Sequence) -> Result<CompressionSet> {
        self.compress(trace.events())
    }

    /// Compresses a flat trace within the configured time budget.
    ///
    /// Running out of time is not an error: the set reports it and keeps the
    /// roots found so far.
    pub fn compress(&mut self, trace: &[Event]) -> Result<CompressionSet> {
        let started = Instant::now();
        let deadline = Deadline::after(started, self.config.time_budget);
        let exploration = self.explore(trace, deadline, 0)?;

        let set = CompressionSet {
            compressions: exploration.results.iter().map(Compression::from).collect(),
            timed_out: exploration.timed_out,
            explored: exploration.explored,
            elapsed: started.elapsed(),
        };
        info!(
            trace_len = trace.len(),
            explored = set.explored,
            results = set.len(),
            timed_out = set.timed_out,
            elapsed_ms = set.elapsed.as_millis() as u64,
            "compression finished"
        );
        Ok(set)
    }

    fn explore(&mut self, events: &[Event], deadline: Deadline, depth: usize) -> Result<Exploration> {
        let original = Root::new(events.to_vec());
        let growth_limit = original.token_count() as f64 * MAX_GROWTH;
        let atom_limit = original.atom_count();

        let mut seen: HashSet<String> = HashSet::default();
        seen.insert(original.sequence.to_string());
        let mut worklist = vec![Candidate {
            root: original,
            exhausted: false,
        }];
        let mut terminal: Vec<usize> = Vec::new();
        let mut timed_out = false;
        let mut cursor = 0;

        while cursor < worklist.len() {
            if deadline.expired() {
                warn!(depth, explored = cursor, pending = worklist.len() - cursor, "time budget exhausted");
                timed_out = true;
                break;
            }
            if worklist[cursor].exhausted {
                terminal.push(cursor);
                cursor += 1;
                continue;
            }

            let best = self.search.best_episodes(worklist[cursor].root.events())?;
            debug!(
                depth,
                candidate = cursor,
                tokens = worklist[cursor].root.token_count(),
                episodes = best.len(),
                "processing candidate root"
            );

            let mut children = Vec::new();
            for episode in best.iter().filter(|episode| episode.support() > 1) {
                let derived = self.derive(&worklist[cursor].root, episode, deadline, depth)?;
                timed_out |= derived.timed_out;
                let tokens = derived.root.token_count();
                if tokens as f64 > growth_limit {
                    trace!(depth, tokens, limit = growth_limit, "rejected derived root: growth");
                    continue;
                }
                if derived.root.atom_count() > atom_limit {
                    trace!(depth, atoms = derived.root.atom_count(), "rejected derived root: atoms");
                    continue;
                }
                if !seen.insert(derived.root.sequence.to_string()) {
                    trace!(depth, "rejected derived root: duplicate");
                    continue;
                }
                children.push(Candidate {
                    root: derived.root,
                    exhausted: !derived.bridged,
                });
            }

            if children.is_empty() && cursor > 0 {
                terminal.push(cursor);
            }
            worklist.extend(children);
            cursor += 1;
        }

        if timed_out {
            terminal.extend((cursor..worklist.len()).filter(|&idx| idx > 0));
        }

        let explored = cursor;
        let mut slots: Vec<Option<Candidate>> = worklist.into_iter().map(Some).collect();
        let results = terminal
            .into_iter()
            .filter_map(|idx| slots[idx].take().map(|candidate| candidate.root))
            .collect();
        Ok(Exploration {
            results,
            explored,
            timed_out,
        })
    }

    fn derive(&mut self, root: &Root, episode: &Episode, deadline: Deadline, depth: usize) -> Result<Derived> {
        let pattern = episode.pattern();
        if pattern.is_empty() {
            return Err(Error::EmptyPattern);
        }
        let pattern_linear = pattern.linearize();
        let threshold = self.config.gap_ratio * pattern.len() as f64;
        let runs: Vec<&[Window]> = episode
            .windows()
            .chunk_by(|a, b| ((b.start - a.end - 1) as f64) <= threshold)
            .collect();

        let mut counters = root.counters;
        let mut events = Vec::with_capacity(root.events().len());
        let mut cursor = 0;
        let mut timed_out = false;

        for (n, run) in runs.iter().enumerate() {
            let (Some(first), Some(last)) = (run.first(), run.last()) else {
                continue;
            };
            let gap = &root.events()[cursor..first.start];
            if n > 0 && gap.len() >= 2 {
                timed_out |= self.splice_gap(gap, deadline, depth, &mut counters, &mut events)?;
            } else {
                events.extend_from_slice(gap);
            }

            let merged = merge_run(root.sequence(), run, &pattern_linear, &mut counters)?;
            let mut group = Sequence::new();
            group.append_linear(&merged)?;
            events.extend(group.into_events());
            cursor = last.end + 1;
        }
        events.extend_from_slice(&root.events()[cursor..]);

        Ok(Derived {
            root: Root {
                sequence: Sequence::root_from_events(events),
                counters,
            },
            bridged: runs.len() < episode.support(),
            timed_out,
        })
    }

    /// Compresses an unbridged gap on its own and splices the best result,
    /// or the gap unchanged when nothing compresses.
    ///
    /// Returns whether the nested exploration ran out of time.
    fn splice_gap(
        &mut self,
        gap: &[Event],
        deadline: Deadline,
        depth: usize,
        counters: &mut Counters,
        out: &mut Vec<Event>,
    ) -> Result<bool> {
        trace!(depth, gap = gap.len(), "compressing gap");
        let nested = self.explore(gap, deadline, depth + 1)?;
        match nested.best() {
            Some(best) => {
                out.extend_from_slice(best.events());
                counters.absorb(&best.counters);
            }
            None => out.extend_from_slice(gap),
        }
        Ok(nested.timed_out)
    }
}

/// Merges the occurrences of one run with the pattern, last window first.
///
/// Each earlier window is merged together with everything up to the start
/// of the part merged so far.
fn merge_run(
    trace: &Sequence,
    run: &[Window],
    pattern: &[LinearEvent],
    counters: &mut Counters,
) -> Result<Vec<LinearEvent>> {
    let Some((last, earlier)) = run.split_last() else {
        return Ok(Vec::new());
    };

    let occurrence = trace.sub_sequence(last.start, last.end).linearize();
    let mut merged = merge(&occurrence, pattern)?;
    counters.record(&merged);

    let mut next_start = last.start;
    for window in earlier.iter().rev() {
        let segment = trace.sub_sequence(window.start, next_start - 1).linearize();
        merged = merge(&segment, &merged.sequence)?;
        counters.record(&merged);
        next_start = window.start;
    }
    Ok(merged.sequence)
}

/// Compresses `trace` with `config`.
pub fn compress(trace: &Sequence, config: &Config) -> Result<CompressionSet> {
    Compressor::new(config)?.compress_sequence(trace)
}
