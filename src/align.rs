//! Edit-distance alignment of two linear sequences.
//!
//! Removing a token costs nothing when it is a group end or hierarchically
//! optional, and one otherwise. Substituting equivalent tokens is free; any
//! other substitution costs one.

use crate::linear::{hierarchically_optional, LinearEvent};

/// Removal cost of every token of `tokens`.
pub fn removal_costs(tokens: &[LinearEvent]) -> Vec<u32> {
    hierarchically_optional(tokens)
        .into_iter()
        .zip(tokens)
        .map(|(optional, token)| {
            let free = optional || matches!(token, LinearEvent::End { .. });
            u32::from(!free)
        })
        .collect()
}

pub fn substitution_cost(a: &LinearEvent, b: &LinearEvent) -> u32 {
    u32::from(!a.is_equiv(b))
}

/// Dynamic-programming table of alignment costs.
///
/// Cell `(i, j)` holds the cost of aligning the first `i` tokens of the left
/// sequence with the first `j` tokens of the right one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

impl CostMatrix {
    pub fn compute(left: &[LinearEvent], right: &[LinearEvent]) -> Self {
        let rows = left.len() + 1;
        let cols = right.len() + 1;
        let left_costs = removal_costs(left);
        let right_costs = removal_costs(right);
        let mut cells = vec![0u32; rows * cols];

        for j in 1..cols {
            cells[j] = cells[j - 1] + right_costs[j - 1];
        }
        for i in 1..rows {
            let row = i * cols;
            let prev = (i - 1) * cols;
            cells[row] = cells[prev] + left_costs[i - 1];
            for j in 1..cols {
                let up = cells[prev + j] + left_costs[i - 1];
                let side = cells[row + j - 1] + right_costs[j - 1];
                let diagonal = cells[prev + j - 1] + substitution_cost(&left[i - 1], &right[j - 1]);
                cells[row + j] = up.min(side).min(diagonal);
            }
        }

        Self { rows, cols, cells }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.cols + j]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cost of aligning both sequences in full.
    pub fn distance(&self) -> u32 {
        self.cells[self.cells.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::parse;

    fn matrix(left: &str, right: &str) -> CostMatrix {
        CostMatrix::compute(
            &parse(left).expect("well formed"),
            &parse(right).expect("well formed"),
        )
    }

    #[test]
    fn test_identical_sequences_cost_nothing() {
        let m = matrix("[A[B]C]", "[A[B]C]");
        assert_eq!(m.distance(), 0);
        for i in 0..m.rows() {
            assert_eq!(m.get(i, i), 0);
        }
    }

    #[test]
    fn test_first_row_and_column_accumulate_removals() {
        let m = matrix("[AB]", "[A*]");
        assert_eq!((0..m.cols()).map(|j| m.get(0, j)).collect::<Vec<_>>(), vec![0, 1, 1, 1]);
        assert_eq!((0..m.rows()).map(|i| m.get(i, 0)).collect::<Vec<_>>(), vec![0, 1, 2, 3, 3]);
    }

    #[test]
    fn test_optional_group_removal_is_free() {
        let m = matrix("[A[*C]B]", "[AB]");
        assert_eq!(m.distance(), 0);
    }

    #[test]
    fn test_cell_values_for_nested_groups() {
        let m = matrix("[AB[C]]", "[[A]BC]");
        assert_eq!(m.get(1, 1), 0);
        assert_eq!(m.get(2, 2), 1);
        assert_eq!(m.get(4, 4), 3);
        assert_eq!(m.get(6, 6), 2);
        assert_eq!(m.get(7, 7), 2);
    }

    #[test]
    fn test_removal_costs() {
        let tokens = parse("[A[*B]C*]").expect("well formed");
        assert_eq!(removal_costs(&tokens), vec![1, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_substitution_cost() {
        let a = parse("A").expect("well formed");
        let b = parse("B*").expect("well formed");
        assert_eq!(substitution_cost(&a[0], &a[0]), 0);
        assert_eq!(substitution_cost(&a[0], &b[0]), 1);
    }
}
