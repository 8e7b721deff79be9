use crate::error::{Error, Result};
use crate::linear::{self, LinearEvent};
use std::fmt;
use std::sync::Arc;

/// An atomic token of a trace, identified by its name.
///
/// Equality and hashing include the optional flag; use [`Call::is_equiv`] to
/// compare names only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    name: Arc<str>,
    optional: bool,
}

impl Call {
    /// Creates a mandatory call.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    /// Returns a copy with the optional flag replaced.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Compares names, ignoring optionality.
    pub fn is_equiv(&self, other: &Call) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.optional {
            f.write_str("*")?;
        }
        Ok(())
    }
}

/// A node of the event tree: either an atomic call or a group of events.
///
/// Groups are reference counted so that cloning a trace or a pattern shares
/// the nested structure instead of copying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// An atomic token.
    Call(Call),
    /// An ordered grouping of events.
    Group(Arc<Sequence>),
}

impl Event {
    /// Shorthand for a mandatory call event.
    pub fn call(name: impl Into<Arc<str>>) -> Self {
        Event::Call(Call::new(name))
    }

    /// Wraps a sequence as a group event.
    pub fn group(sequence: Sequence) -> Self {
        Event::Group(Arc::new(sequence))
    }

    /// Length as seen by a pattern: 1 for a call, child count for a group.
    pub fn length(&self) -> usize {
        match self {
            Event::Call(_) => 1,
            Event::Group(group) => group.len(),
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Event::Call(call) => call.is_optional(),
            Event::Group(group) => group.is_optional(),
        }
    }

    /// Structural comparison ignoring every optional flag.
    pub fn is_equiv(&self, other: &Event) -> bool {
        match (self, other) {
            (Event::Call(a), Event::Call(b)) => a.is_equiv(b),
            (Event::Group(a), Event::Group(b)) => a.is_equiv(b),
            _ => false,
        }
    }

    /// Number of linear tokens this event expands to.
    pub fn token_count(&self) -> usize {
        match self {
            Event::Call(_) => 1,
            Event::Group(group) => group.token_count() + 2,
        }
    }

    /// Appends the linear encoding of this event to `out`.
    pub fn linearize_into(&self, out: &mut Vec<LinearEvent>) {
        match self {
            Event::Call(call) => out.push(LinearEvent::Call(call.clone())),
            Event::Group(group) => group.linearize_into(out),
        }
    }

    /// Iterates the atomic calls below this event, depth first.
    pub fn atoms(&self) -> Atoms<'_> {
        Atoms {
            stack: vec![std::slice::from_ref(self).iter()],
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Call(call) => call.fmt(f),
            Event::Group(group) => group.fmt(f),
        }
    }
}

/// An ordered grouping of events.
///
/// The root sequence of a trace renders without brackets; every other
/// sequence renders as `[...]`, with `[*` marking an optional group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence {
    events: Vec<Event>,
    optional: bool,
    root: bool,
}

impl Sequence {
    /// Creates an empty, non-root sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty root sequence.
    pub fn root() -> Self {
        Self {
            root: true,
            ..Self::default()
        }
    }

    /// Creates a non-root sequence holding `events`.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Creates a root sequence holding `events`.
    pub fn root_from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            root: true,
            optional: false,
        }
    }

    /// Builds a root trace with one call per character of `trace`.
    ///
    /// Whitespace is skipped.
    pub fn from_trace(trace: &str) -> Self {
        let events = trace
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Event::call(c.to_string()))
            .collect();
        Self::root_from_events(events)
    }

    /// Parses the bracket text form into a root sequence.
    ///
    /// See [`linear::parse`] for the accepted syntax.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = linear::parse(text)?;
        let mut root = Self::root();
        root.append_linear(&tokens)?;
        Ok(root)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    /// Structural comparison ignoring every optional flag.
    pub fn is_equiv(&self, other: &Sequence) -> bool {
        self.events.len() == other.events.len()
            && self
                .events
                .iter()
                .zip(&other.events)
                .all(|(a, b)| a.is_equiv(b))
    }

    /// Number of linear tokens of the children, excluding this sequence's own
    /// brackets.
    pub fn token_count(&self) -> usize {
        self.events.iter().map(Event::token_count).sum()
    }

    /// Number of atomic calls anywhere below this sequence.
    pub fn atom_count(&self) -> usize {
        self.atoms().count()
    }

    /// Iterates the atomic calls below this sequence, depth first.
    pub fn atoms(&self) -> Atoms<'_> {
        Atoms {
            stack: vec![self.events.iter()],
        }
    }

    /// Returns the children in `start..=end` wrapped as a non-root group.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Sequence {
        Sequence::from_events(self.events[start..=end].to_vec())
    }

    /// Linear encoding of this sequence, wrapped in its own group markers.
    pub fn linearize(&self) -> Vec<LinearEvent> {
        let mut out = Vec::with_capacity(self.token_count() + 2);
        self.linearize_into(&mut out);
        out
    }

    fn linearize_into(&self, out: &mut Vec<LinearEvent>) {
        out.push(LinearEvent::Begin {
            optional: self.optional,
        });
        for event in &self.events {
            event.linearize_into(out);
        }
        out.push(LinearEvent::End {
            optional: self.optional,
        });
    }

    /// Materializes a linear encoding and appends the resulting events.
    ///
    /// A group is optional when either of its markers is. On error the
    /// sequence is left untouched.
    pub fn append_linear(&mut self, tokens: &[LinearEvent]) -> Result<()> {
        // Open groups: (parent children, begin optional flag)
        let mut open: Vec<(Vec<Event>, bool)> = Vec::new();
        let mut current: Vec<Event> = Vec::new();

        for (position, token) in tokens.iter().enumerate() {
            match token {
                LinearEvent::Call(call) => current.push(Event::Call(call.clone())),
                LinearEvent::Begin { optional } => {
                    open.push((std::mem::take(&mut current), *optional));
                }
                LinearEvent::End { optional } => {
                    let (parent, begin_optional) =
                        open.pop().ok_or(Error::UnmatchedGroupEnd { position })?;
                    let children = std::mem::replace(&mut current, parent);
                    current.push(Event::group(Sequence {
                        events: children,
                        optional: begin_optional || *optional,
                        root: false,
                    }));
                }
            }
        }

        if !open.is_empty() {
            return Err(Error::UnclosedGroup { open: open.len() });
        }

        self.events.extend(current);
        Ok(())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.root {
            f.write_str("[")?;
            if self.optional {
                f.write_str("*")?;
            }
        }
        for event in &self.events {
            event.fmt(f)?;
        }
        if !self.root {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Depth-first iterator over the atomic calls of an event tree.
pub struct Atoms<'a> {
    stack: Vec<std::slice::Iter<'a, Event>>,
}

impl<'a> Iterator for Atoms<'a> {
    type Item = &'a Call;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Event::Call(call)) => return Some(call),
                Some(Event::Group(group)) => self.stack.push(group.events.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
