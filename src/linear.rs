//! Flat encoding of event trees.
//!
//! A tree is written as a token stream where each group contributes a begin
//! marker, its children, and an end marker. Alignment and merging operate on
//! this form; [`Sequence::append_linear`](crate::Sequence::append_linear)
//! turns it back into a tree.

use crate::error::{Error, Result};
use crate::event::Call;
use std::fmt;

/// One token of a linearized event tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinearEvent {
    Call(Call),
    Begin { optional: bool },
    End { optional: bool },
}

impl LinearEvent {
    pub fn is_optional(&self) -> bool {
        match self {
            LinearEvent::Call(call) => call.is_optional(),
            LinearEvent::Begin { optional } | LinearEvent::End { optional } => *optional,
        }
    }

    pub fn set_optional(&mut self, value: bool) {
        match self {
            LinearEvent::Call(call) => call.set_optional(value),
            LinearEvent::Begin { optional } | LinearEvent::End { optional } => *optional = value,
        }
    }

    /// True for group-begin and group-end markers.
    pub fn is_border(&self) -> bool {
        !matches!(self, LinearEvent::Call(_))
    }

    /// Match test used by alignment: calls by name, borders by kind.
    pub fn is_equiv(&self, other: &LinearEvent) -> bool {
        match (self, other) {
            (LinearEvent::Call(a), LinearEvent::Call(b)) => a.is_equiv(b),
            (LinearEvent::Begin { .. }, LinearEvent::Begin { .. }) => true,
            (LinearEvent::End { .. }, LinearEvent::End { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LinearEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearEvent::Call(call) => call.fmt(f),
            LinearEvent::Begin { optional } => f.write_str(if *optional { "[*" } else { "[" }),
            LinearEvent::End { .. } => f.write_str("]"),
        }
    }
}

/// Renders a token stream in the same bracket notation as
/// [`Sequence`](crate::Sequence)'s `Display`.
pub fn render(tokens: &[LinearEvent]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}

/// Parses bracket notation into tokens.
///
/// Every character other than `[`, `]`, `*`, `,` and whitespace is a call
/// named by that character. A `*` marks the preceding token optional; after
/// `[` or `]` it marks the whole group, so both of its markers carry the flag.
pub fn parse(text: &str) -> Result<Vec<LinearEvent>> {
    let mut tokens: Vec<LinearEvent> = Vec::with_capacity(text.len());
    // Begin index for every open group, and for the most recent end.
    let mut open: Vec<usize> = Vec::new();
    let mut last_closed: Option<usize> = None;

    for (position, ch) in text.chars().enumerate() {
        match ch {
            '[' => {
                open.push(tokens.len());
                tokens.push(LinearEvent::Begin { optional: false });
            }
            ']' => {
                let begin = open.pop();
                let optional = begin.is_some_and(|b| tokens[b].is_optional());
                last_closed = begin;
                tokens.push(LinearEvent::End { optional });
            }
            '*' => {
                let Some(token) = tokens.last_mut() else {
                    return Err(Error::Parse {
                        position,
                        reason: "optional marker precedes every token".to_string(),
                    });
                };
                let closes_group = matches!(token, LinearEvent::End { .. });
                token.set_optional(true);
                if let (true, Some(begin)) = (closes_group, last_closed) {
                    tokens[begin].set_optional(true);
                }
            }
            ',' => {}
            c if c.is_whitespace() => {}
            c => tokens.push(LinearEvent::Call(Call::new(c.to_string()))),
        }
    }
    Ok(tokens)
}

/// For every position, the index of the matching border.
///
/// Calls map to `None`.
pub fn group_matches(tokens: &[LinearEvent]) -> Result<Vec<Option<usize>>> {
    let mut matches = vec![None; tokens.len()];
    let mut open = Vec::new();
    for (position, token) in tokens.iter().enumerate() {
        match token {
            LinearEvent::Begin { .. } => open.push(position),
            LinearEvent::End { .. } => {
                let begin = open.pop().ok_or(Error::UnmatchedGroupEnd { position })?;
                matches[begin] = Some(position);
                matches[position] = Some(begin);
            }
            LinearEvent::Call(_) => {}
        }
    }
    if !open.is_empty() {
        return Err(Error::UnclosedGroup { open: open.len() });
    }
    Ok(matches)
}

/// Whether each token is optional itself or sits inside a group whose end
/// marker is optional.
///
/// One backward pass keeps, per nesting level, whether any enclosing end seen
/// so far carries the flag. Tokens after a stray end are treated as top level.
pub fn hierarchically_optional(tokens: &[LinearEvent]) -> Vec<bool> {
    let mut result = vec![false; tokens.len()];
    let mut enclosing: Vec<bool> = Vec::new();
    for (position, token) in tokens.iter().enumerate().rev() {
        let inherited = enclosing.last().copied().unwrap_or(false);
        match token {
            LinearEvent::End { optional } => {
                let flag = inherited || *optional;
                enclosing.push(flag);
                result[position] = flag;
            }
            LinearEvent::Begin { optional } => {
                result[position] = inherited || *optional;
                enclosing.pop();
            }
            LinearEvent::Call(call) => result[position] = inherited || call.is_optional(),
        }
    }
    result
}
