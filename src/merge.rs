//! Merge of two linear sequences into one generalized sequence.
//!
//! The cost matrix is walked from the bottom-right cell back to the origin,
//! emitting tokens in reverse. Each emitted token records whether it came
//! from the left input, the right input, or both. Group markers are paired up
//! as they are emitted: when a begin closes an end of different provenance the
//! group is split, or, for a true crossing of brackets, the tokens caught
//! between the two structures are forced optional.

use crate::align::CostMatrix;
use crate::error::{Error, Result};
use crate::event::Sequence;
use crate::linear::{group_matches, render, LinearEvent};
use std::cmp::Ordering;

/// Which input an emitted token was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Left,
    Right,
    Both,
}

impl Origin {
    fn opposite(self) -> Origin {
        match self {
            Origin::Left => Origin::Right,
            Origin::Right => Origin::Left,
            Origin::Both => Origin::Both,
        }
    }
}

/// Result of merging two linear sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub sequence: Vec<LinearEvent>,
    /// Tokens matched in both inputs, not counting an outer wrapping group.
    pub alignments: usize,
    /// Optional flags set by the merge that neither input carried.
    pub new_optionals: usize,
}

impl MergeOutcome {
    pub fn render(&self) -> String {
        render(&self.sequence)
    }
}

/// Merges two well-formed linear sequences.
pub fn merge(left: &[LinearEvent], right: &[LinearEvent]) -> Result<MergeOutcome> {
    group_matches(left)?;
    group_matches(right)?;

    let matrix = CostMatrix::compute(left, right);
    let mut builder = Reconstruction::default();
    let (mut i, mut j) = (left.len(), right.len());

    while i > 0 || j > 0 {
        match next_step(&matrix, left, right, i, j) {
            Step::Both => {
                builder.emit(aligned(&left[i - 1], &right[j - 1]), Origin::Both)?;
                i -= 1;
                j -= 1;
            }
            Step::TakeLeft => {
                builder.emit(left[i - 1].clone(), Origin::Left)?;
                i -= 1;
            }
            Step::TakeRight => {
                builder.emit(right[j - 1].clone(), Origin::Right)?;
                j -= 1;
            }
        }
    }

    builder.finish()
}

/// Merges the linear forms of two sequences, each wrapped in its own group.
pub fn merge_sequences(left: &Sequence, right: &Sequence) -> Result<MergeOutcome> {
    merge(&left.linearize(), &right.linearize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Both,
    TakeLeft,
    TakeRight,
}

fn next_step(matrix: &CostMatrix, left: &[LinearEvent], right: &[LinearEvent], i: usize, j: usize) -> Step {
    if i == 0 {
        return Step::TakeRight;
    }
    if j == 0 {
        return Step::TakeLeft;
    }

    let (a, b) = (&left[i - 1], &right[j - 1]);
    let up = matrix.get(i - 1, j);
    let side = matrix.get(i, j - 1);
    if a.is_equiv(b) && matrix.get(i - 1, j - 1) <= up.min(side) {
        return Step::Both;
    }

    match up.cmp(&side) {
        Ordering::Less => Step::TakeLeft,
        Ordering::Greater => Step::TakeRight,
        // Equal costs: consume from the shorter remaining prefix.
        Ordering::Equal => match i.cmp(&j) {
            Ordering::Greater => Step::TakeRight,
            Ordering::Less => Step::TakeLeft,
            Ordering::Equal if !a.is_border() && b.is_border() => Step::TakeRight,
            Ordering::Equal => Step::TakeLeft,
        },
    }
}

fn aligned(a: &LinearEvent, b: &LinearEvent) -> LinearEvent {
    let mut event = a.clone();
    event.set_optional(a.is_optional() || b.is_optional());
    event
}

#[derive(Debug, Clone)]
struct Emitted {
    event: LinearEvent,
    origin: Origin,
    /// Group end still presumed droppable: one-sided and not yet confirmed by
    /// a call matched in both inputs.
    assumed: bool,
    /// Group end whose contents got caught in a bracket crossing.
    overlapped: bool,
    /// Marked optional while resolving a crossing.
    forced: bool,
}

impl Emitted {
    fn new(event: LinearEvent, origin: Origin) -> Self {
        Self {
            event,
            origin,
            assumed: false,
            overlapped: false,
            forced: false,
        }
    }
}

/// Tokens emitted so far, in reverse order, and the ends still waiting for
/// their begin.
#[derive(Debug, Default)]
struct Reconstruction {
    emitted: Vec<Emitted>,
    open_ends: Vec<usize>,
}

impl Reconstruction {
    fn emit(&mut self, event: LinearEvent, origin: Origin) -> Result<()> {
        // A matched optional call does not confirm its group.
        let confirms = origin == Origin::Both && matches!(&event, LinearEvent::Call(call) if !call.is_optional());
        let border = event.is_border();
        self.emitted.push(Emitted::new(event, origin));

        if confirms {
            if let Some(&end) = self.open_ends.last() {
                self.emitted[end].assumed = false;
            }
        }
        if border {
            self.manage_border()?;
        }
        Ok(())
    }

    fn manage_border(&mut self) -> Result<()> {
        let last = self.emitted.len().checked_sub(1).ok_or_else(|| Error::BorderExpected {
            found: "empty sequence".to_string(),
        })?;
        match &self.emitted[last].event {
            LinearEvent::End { .. } => {
                let token = &mut self.emitted[last];
                token.assumed = token.origin != Origin::Both;
                self.open_ends.push(last);
                Ok(())
            }
            LinearEvent::Begin { .. } => self.close_group(last),
            LinearEvent::Call(call) => Err(Error::BorderExpected {
                found: call.to_string(),
            }),
        }
    }

    fn close_group(&mut self, begin: usize) -> Result<()> {
        let end = self
            .open_ends
            .pop()
            .ok_or(Error::UnmatchedGroupBegin { position: begin })?;
        let begin_origin = self.emitted[begin].origin;
        let end_origin = self.emitted[end].origin;
        if begin_origin == end_origin {
            return Ok(());
        }

        match (begin_origin, end_origin) {
            (_, Origin::Both) => {
                self.split_end(end, begin_origin);
                Ok(())
            }
            (Origin::Both, _) => self.split_begin(begin, end_origin),
            _ if self.emitted[end].overlapped => Ok(()),
            _ => {
                self.resolve_crossing(end, begin_origin);
                Ok(())
            }
        }
    }

    /// The end at `end` now closes only the `closed` side's group; a twin
    /// placed after it in the output stays open for the other side.
    fn split_end(&mut self, end: usize, closed: Origin) {
        self.emitted[end].origin = closed;
        let mut twin = self.emitted[end].clone();
        twin.origin = closed.opposite();
        twin.assumed = true;
        self.emitted.insert(end, twin);
        self.open_ends.push(end);
    }

    fn split_begin(&mut self, begin: usize, closed: Origin) -> Result<()> {
        self.emitted[begin].origin = closed;
        let mut twin = self.emitted[begin].clone();
        twin.origin = closed.opposite();
        self.emitted.push(twin);
        self.close_group(self.emitted.len() - 1)
    }

    /// A begin from one side closed an end from the other. Everything between
    /// that end and the nearest open end the begin's side could own is forced
    /// optional, nested groups counting as one unit.
    fn resolve_crossing(&mut self, end: usize, side: Origin) {
        let prior = self
            .open_ends
            .iter()
            .rev()
            .copied()
            .find(|&idx| {
                let origin = self.emitted[idx].origin;
                origin == side || origin == Origin::Both
            });

        let from = prior.map_or(0, |idx| idx + 1);
        let mut depth = 0usize;
        for token in &mut self.emitted[from..end] {
            match token.event {
                LinearEvent::End { .. } => {
                    if depth == 0 {
                        token.forced = true;
                    }
                    depth += 1;
                }
                LinearEvent::Begin { .. } => depth = depth.saturating_sub(1),
                LinearEvent::Call(_) => {
                    if depth == 0 {
                        token.forced = true;
                    }
                }
            }
        }

        if let Some(idx) = prior {
            self.emitted[idx].overlapped = true;
        }
    }

    /// Restores output order and settles the optional flags.
    fn finish(mut self) -> Result<MergeOutcome> {
        if !self.open_ends.is_empty() {
            return Err(Error::UnclosedGroup {
                open: self.open_ends.len(),
            });
        }
        self.emitted.reverse();

        let mut sequence: Vec<LinearEvent> = self.emitted.iter().map(|t| t.event.clone()).collect();
        let matches = group_matches(&sequence)?;
        let mut enclosing: Vec<usize> = Vec::new();
        let mut alignments = 0usize;
        let mut new_optionals = 0usize;

        for (idx, token) in self.emitted.iter().enumerate() {
            let parent = enclosing.last().map(|&end| &self.emitted[end]);
            let parent_overlapped = parent.is_some_and(|p| p.overlapped);

            match &token.event {
                LinearEvent::Call(call) => {
                    let one_sided_in_confirmed =
                        token.origin != Origin::Both && parent.is_some_and(|p| !p.assumed);
                    let optional = token.forced || one_sided_in_confirmed || parent_overlapped;
                    if optional && !call.is_optional() {
                        new_optionals += 1;
                        sequence[idx].set_optional(true);
                    }
                }
                LinearEvent::Begin { optional: was } => {
                    let end = matches[idx].ok_or(Error::UnmatchedGroupBegin { position: idx })?;
                    let closing = &self.emitted[end];
                    let optional = *was
                        || closing.event.is_optional()
                        || closing.assumed
                        || closing.forced
                        || token.forced
                        || parent_overlapped;
                    if optional && !was {
                        new_optionals += 1;
                    }
                    sequence[idx].set_optional(optional);
                    sequence[end].set_optional(optional);
                    enclosing.push(end);
                }
                LinearEvent::End { .. } => {
                    enclosing.pop();
                }
            }

            if token.origin == Origin::Both && !matches!(token.event, LinearEvent::End { .. }) {
                alignments += 1;
            }
        }

        let last = self.emitted.len().saturating_sub(1);
        let wrapped = matches.first().copied().flatten() == Some(last)
            && self.emitted.first().is_some_and(|t| t.origin == Origin::Both);
        if wrapped && last > 0 {
            alignments = alignments.saturating_sub(1);
        }

        Ok(MergeOutcome {
            sequence,
            alignments,
            new_optionals,
        })
    }
}
