//! Neighborhood moves over task orderings.
//!
//! Every move takes a permutation of length `n >= 2` and returns another
//! permutation of the same indices. None of them may be called with a
//! shorter ordering.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which move the search uses to derive a candidate ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborMove {
    /// Exchange two positions.
    #[default]
    Swap,
    /// Reverse the segment between two positions.
    Reverse,
    /// Move one task to another position.
    Insert,
    /// Pick one of the three above uniformly for every candidate.
    Mixed,
}

impl NeighborMove {
    pub fn apply<R: Rng>(self, order: &[usize], rng: &mut R) -> Vec<usize> {
        match self {
            NeighborMove::Swap => swap_pair(order, rng),
            NeighborMove::Reverse => reverse_segment(order, rng),
            NeighborMove::Insert => insert_move(order, rng),
            NeighborMove::Mixed => match rng.random_range(0..3) {
                0 => swap_pair(order, rng),
                1 => reverse_segment(order, rng),
                _ => insert_move(order, rng),
            },
        }
    }
}

/// Draws two distinct positions; every unordered pair is equally likely.
fn distinct_pair<R: Rng>(n: usize, rng: &mut R) -> (usize, usize) {
    debug_assert!(n >= 2, "neighbor moves need at least two tasks");
    let i = rng.random_range(0..n);
    let mut j = rng.random_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}

/// Swaps two distinct positions chosen uniformly at random.
pub fn swap_pair<R: Rng>(order: &[usize], rng: &mut R) -> Vec<usize> {
    let (i, j) = distinct_pair(order.len(), rng);
    let mut next = order.to_vec();
    next.swap(i, j);
    next
}

/// Reverses `order[lo..=hi]` for two distinct random positions.
pub fn reverse_segment<R: Rng>(order: &[usize], rng: &mut R) -> Vec<usize> {
    let (i, j) = distinct_pair(order.len(), rng);
    let (lo, hi) = (i.min(j), i.max(j));
    let mut next = order.to_vec();
    next[lo..=hi].reverse();
    next
}

/// Removes the task at one position and reinserts it at another.
pub fn insert_move<R: Rng>(order: &[usize], rng: &mut R) -> Vec<usize> {
    let (from, to) = distinct_pair(order.len(), rng);
    let mut next = order.to_vec();
    let item = next.remove(from);
    next.insert(to, item);
    next
}
