use crate::event::{Event, Sequence};
use crate::score::Scorable;
use std::cell::OnceCell;
use std::fmt;

/// An inclusive range `[start, end]` of trace positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "window ({start},{end}) is reversed");
        Self { start, end }
    }

    /// A window covering a single position.
    pub fn at(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

/// Window aggregates feeding the score.
#[derive(Debug, Clone, Copy)]
struct Aggregates {
    inside: usize,
    min_start: usize,
    max_end: usize,
}

impl Aggregates {
    fn of(windows: &[Window]) -> Self {
        let mut aggregates = Aggregates {
            inside: 0,
            min_start: usize::MAX,
            max_end: 0,
        };
        for window in windows {
            aggregates.inside += window.len();
            aggregates.min_start = aggregates.min_start.min(window.start);
            aggregates.max_end = aggregates.max_end.max(window.end);
        }
        aggregates
    }
}

/// A pattern together with the windows where it occurs.
///
/// Aggregates are computed on first use and dropped whenever the window set
/// changes.
#[derive(Debug, Clone)]
pub struct Episode {
    pattern: Sequence,
    windows: Vec<Window>,
    pub(crate) explored: bool,
    aggregates: OnceCell<Aggregates>,
}

impl Episode {
    pub fn new(pattern: Sequence, windows: Vec<Window>) -> Self {
        Self {
            pattern,
            windows,
            explored: false,
            aggregates: OnceCell::new(),
        }
    }

    /// Single-token episode occurring at each of `positions`.
    pub fn seed(token: &Event, positions: &[usize]) -> Self {
        Self::new(
            Sequence::from_events(vec![token.clone()]),
            positions.iter().copied().map(Window::at).collect(),
        )
    }

    pub fn pattern(&self) -> &Sequence {
        &self.pattern
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn into_parts(self) -> (Sequence, Vec<Window>) {
        (self.pattern, self.windows)
    }

    pub fn push_window(&mut self, window: Window) {
        self.windows.push(window);
        self.aggregates = OnceCell::new();
    }

    /// Replaces a pattern whose only child is a group by that group.
    pub fn flatten(mut self) -> Self {
        let flattened = match self.pattern.events() {
            [Event::Group(inner)] => {
                let mut pattern = Sequence::from_events(inner.events().to_vec());
                pattern.set_optional(inner.is_optional());
                Some(pattern)
            }
            _ => None,
        };
        if let Some(pattern) = flattened {
            self.pattern = pattern;
        }
        self
    }

    /// Extends every window with the next occurrence of `token`.
    ///
    /// Windows and `positions` are both ascending, so one merge pass pairs
    /// each window with the first occurrence after its end. The pairing is
    /// kept only when the extended window stays within the allowed length.
    pub fn extend_with(&self, token: &Event, positions: &[usize], gap_ratio: f64) -> Episode {
        let mut events = self.pattern.events().to_vec();
        events.push(token.clone());
        let max_window = (self.pattern.len() + 1) as f64 * (1.0 + gap_ratio);
        let mut extended = Episode::new(Sequence::from_events(events), Vec::new());

        let mut next = 0;
        for window in &self.windows {
            while next < positions.len() && positions[next] <= window.end {
                next += 1;
            }
            let Some(&position) = positions.get(next) else {
                break;
            };
            if ((position - window.start) as f64) < max_window {
                extended.push_window(Window::new(window.start, position));
            }
        }
        extended
    }

    fn aggregates(&self) -> Aggregates {
        *self.aggregates.get_or_init(|| Aggregates::of(&self.windows))
    }
}

impl Scorable for Episode {
    fn support(&self) -> usize {
        self.windows.len()
    }

    fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    fn inside_tokens(&self) -> usize {
        self.aggregates().inside
    }

    fn span(&self) -> usize {
        if self.windows.is_empty() {
            return 0;
        }
        let aggregates = self.aggregates();
        aggregates.max_end - aggregates.min_start
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.pattern)?;
        for window in &self.windows {
            write!(f, " {window}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions_of(trace: &str, name: char) -> Vec<usize> {
        trace
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == name)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_window_basics() {
        let w = Window::new(2, 4);
        assert_eq!(w.len(), 3);
        assert!(w.overlaps(&Window::at(4)));
        assert!(!w.overlaps(&Window::at(5)));
        assert_eq!(w.to_string(), "(2,4)");
    }

    #[test]
    fn test_seed_aggregates() {
        let trace = "ABAB";
        let seed = Episode::seed(&Event::call("A"), &positions_of(trace, 'A'));
        assert_eq!(seed.support(), 2);
        assert_eq!(seed.inside_tokens(), 2);
        assert_eq!(seed.span(), 2);
        assert_eq!(seed.to_string(), "[A]: (0,0) (2,2)");
    }

    #[test]
    fn test_extend_pairs_next_occurrence() {
        let trace = "ABAB";
        let seed = Episode::seed(&Event::call("A"), &positions_of(trace, 'A'));
        let ab = seed.extend_with(&Event::call("B"), &positions_of(trace, 'B'), 0.5);
        assert_eq!(ab.pattern().to_string(), "[AB]");
        assert_eq!(ab.windows(), &[Window::new(0, 1), Window::new(2, 3)]);
    }

    #[test]
    fn test_extend_respects_max_window() {
        // Growing a one-token pattern with gap ratio 0.5 allows end - start <= 2.
        let trace = "AxxB";
        let seed = Episode::seed(&Event::call("A"), &positions_of(trace, 'A'));
        let ab = seed.extend_with(&Event::call("B"), &positions_of(trace, 'B'), 0.5);
        assert!(ab.windows().is_empty());

        let wide = seed.extend_with(&Event::call("B"), &positions_of(trace, 'B'), 1.0);
        assert_eq!(wide.windows(), &[Window::new(0, 3)]);
    }

    #[test]
    fn test_extend_with_same_token_skips_window_end() {
        let trace = "AAA";
        let seed = Episode::seed(&Event::call("A"), &positions_of(trace, 'A'));
        let aa = seed.extend_with(&Event::call("A"), &positions_of(trace, 'A'), 0.5);
        assert_eq!(aa.windows(), &[Window::new(0, 1), Window::new(1, 2)]);
    }

    #[test]
    fn test_push_window_invalidates_aggregates() {
        let mut episode = Episode::new(Sequence::from_events(vec![Event::call("A")]), vec![Window::at(0)]);
        assert_eq!(episode.inside_tokens(), 1);
        episode.push_window(Window::new(3, 4));
        assert_eq!(episode.inside_tokens(), 3);
        assert_eq!(episode.span(), 4);
    }

    #[test]
    fn test_flatten_single_group() {
        let inner = Sequence::from_events(vec![Event::call("A"), Event::call("B")]);
        let nested = Episode::new(Sequence::from_events(vec![Event::group(inner)]), vec![]);
        assert_eq!(nested.flatten().pattern().to_string(), "[AB]");

        let flat = Episode::new(Sequence::from_events(vec![Event::call("A"), Event::call("B")]), vec![]);
        assert_eq!(flat.flatten().pattern().to_string(), "[AB]");
    }

    #[test]
    fn test_flatten_keeps_windows_and_optional_flag() {
        let mut inner = Sequence::from_events(vec![Event::call("A"), Event::call("B")]);
        inner.set_optional(true);
        let windows = vec![Window::new(0, 1), Window::new(3, 4)];
        let nested = Episode::new(Sequence::from_events(vec![Event::group(inner)]), windows.clone());

        let flattened = nested.flatten();
        assert_eq!(flattened.pattern().to_string(), "[*AB]");
        assert_eq!(flattened.pattern().len(), 2);
        assert_eq!(flattened.windows(), windows.as_slice());
        assert_eq!(flattened.inside_tokens(), 4);
    }
}
