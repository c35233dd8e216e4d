use serde::{Deserialize, Serialize};
use std::ops::Range;
use wildfire_common::Grid;

/// Burned cells of one replicate.
///
/// A cell is `true` in `burned` exactly when it appears once in `burned_ids`.
/// `generation_ends[k]` is the exclusive end of generation `k` inside
/// `burned_ids`, so generation `k` spans `generation_ends[k-1]..generation_ends[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnState {
    burned: Grid<bool>,
    burned_ids: Vec<(usize, usize)>,
    generation_ends: Vec<usize>,
}

impl BurnState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            burned: Grid::new(width, height),
            burned_ids: Vec::new(),
            generation_ends: Vec::new(),
        }
    }

    /// Marks `(x, y)` burned and appends it to the burn order.
    /// Returns `false`, leaving the state untouched, if it was already burned.
    #[inline]
    pub fn ignite(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.burned[(x, y)];
        if *cell {
            return false;
        }
        *cell = true;
        self.burned_ids.push((x, y));
        true
    }

    #[inline]
    pub fn is_burned(&self, x: usize, y: usize) -> bool {
        self.burned[(x, y)]
    }

    /// Ends the current generation at the present length of the burn order.
    pub fn close_generation(&mut self) {
        self.generation_ends.push(self.burned_ids.len());
    }

    /// Cells ignited since the last closed generation.
    pub fn pending(&self) -> &[(usize, usize)] {
        &self.burned_ids[self.closed_len()..]
    }

    /// Cells of the most recently closed generation.
    pub fn last_generation(&self) -> &[(usize, usize)] {
        &self.burned_ids[self.last_generation_range()]
    }

    /// Index range of the most recently closed generation in `burned_ids`.
    pub fn last_generation_range(&self) -> Range<usize> {
        match self.generation_ends.as_slice() {
            [] => 0..0,
            [end] => 0..*end,
            [.., start, end] => *start..*end,
        }
    }

    fn closed_len(&self) -> usize {
        self.generation_ends.last().copied().unwrap_or(0)
    }

    pub fn burned(&self) -> &Grid<bool> {
        &self.burned
    }

    pub fn burned_ids(&self) -> &[(usize, usize)] {
        &self.burned_ids
    }

    pub fn generation_ends(&self) -> &[usize] {
        &self.generation_ends
    }

    pub fn burned_count(&self) -> usize {
        self.burned_ids.len()
    }

    /// Iterates over the cells of each closed generation in order.
    pub fn generations(&self) -> impl Iterator<Item = &[(usize, usize)]> + '_ {
        let starts = std::iter::once(0).chain(self.generation_ends.iter().copied());
        starts
            .zip(self.generation_ends.iter().copied())
            .map(move |(start, end)| &self.burned_ids[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignite_is_idempotent() {
        let mut state = BurnState::new(3, 3);
        assert!(state.ignite(1, 1));
        assert!(!state.ignite(1, 1));
        assert_eq!(state.burned_ids(), &[(1, 1)]);
        assert!(state.is_burned(1, 1));
        assert!(!state.is_burned(0, 1));
    }

    #[test]
    fn generations_follow_closed_boundaries() {
        let mut state = BurnState::new(4, 4);
        state.ignite(0, 0);
        state.ignite(3, 3);
        state.close_generation();
        assert_eq!(state.last_generation(), &[(0, 0), (3, 3)]);

        state.ignite(1, 0);
        assert_eq!(state.pending(), &[(1, 0)]);
        state.close_generation();
        state.ignite(2, 0);
        state.ignite(2, 1);

        assert_eq!(state.generation_ends(), &[2, 3]);
        assert_eq!(state.last_generation(), &[(1, 0)]);
        assert_eq!(state.pending(), &[(2, 0), (2, 1)]);
        let gens: Vec<_> = state.generations().collect();
        assert_eq!(gens, vec![&[(0, 0), (3, 3)][..], &[(1, 0)][..]]);
    }

    #[test]
    fn fresh_state_has_no_generations() {
        let state = BurnState::new(2, 2);
        assert!(state.last_generation().is_empty());
        assert_eq!(state.generations().count(), 0);
        assert_eq!(state.burned_count(), 0);
    }
}
