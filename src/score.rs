//! Support and proximity scoring shared by episodes and resolver paths.

use crate::config::Config;

/// Weights applied by [`score`], fixed for one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreParams {
    pub weight_support: f64,
    pub proximity_balancing: f64,
    /// Occurrence count of the most frequent token of the trace.
    pub max_support: usize,
}

impl ScoreParams {
    pub fn new(config: &Config, max_support: usize) -> Self {
        Self {
            weight_support: config.weight_support,
            proximity_balancing: config.proximity_balancing,
            max_support,
        }
    }
}

/// Anything that can be ranked as a set of pattern occurrences.
///
/// Implementors expose the window aggregates; the score itself is derived.
/// Windows are assumed pairwise non-overlapping.
pub trait Scorable {
    /// Number of occurrence windows.
    fn support(&self) -> usize;

    /// Number of events in the pattern.
    fn pattern_len(&self) -> usize;

    /// Total tokens covered by the windows.
    fn inside_tokens(&self) -> usize;

    /// Largest window end minus smallest window start.
    fn span(&self) -> usize;

    /// Tokens within the span that fall outside every window.
    fn between_tokens(&self) -> usize {
        (self.span() + 1).saturating_sub(self.inside_tokens())
    }

    fn score(&self, params: &ScoreParams) -> f64 {
        score(self, params)
    }
}

/// Share of covered tokens that are not pattern tokens.
pub fn inside_gap<S: Scorable + ?Sized>(item: &S) -> f64 {
    let inside = item.inside_tokens();
    if inside == 0 {
        return 0.0;
    }
    let expected = item.pattern_len() * item.support();
    inside.saturating_sub(expected) as f64 / inside as f64
}

/// Share of the span lying between windows.
pub fn outside_gap<S: Scorable + ?Sized>(item: &S) -> f64 {
    let span = item.span();
    if span == 0 {
        return 0.0;
    }
    item.between_tokens() as f64 / span as f64
}

/// Weighted support and proximity, in `[0, 1]`.
///
/// Anything seen fewer than twice scores zero.
pub fn score<S: Scorable + ?Sized>(item: &S, params: &ScoreParams) -> f64 {
    let support = item.support();
    if support < 2 {
        return 0.0;
    }
    let support_ratio = (support as f64 / params.max_support.max(1) as f64).min(1.0);
    let balance = params.proximity_balancing;
    let proximity = (1.0 - balance) * (1.0 - inside_gap(item)) + balance * (1.0 - outside_gap(item));
    params.weight_support * support_ratio + (1.0 - params.weight_support) * proximity
}
