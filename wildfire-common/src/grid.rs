use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Dense row-major matrix addressed by `(x, y)` where `x` is the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a `width x height` grid with every element set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T> Grid<T> {
    /// Wraps an existing row-major buffer. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of elements (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    // Linear index of (x, y); callers guarantee bounds.
    #[inline(always)]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterates over `((x, y), value)` in row-major order.
    pub fn iter_coords(&self) -> impl Iterator<Item = ((usize, usize), &T)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| ((i % width, i / width), v))
    }

    /// Builds a new grid of the same shape by mapping every element.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        debug_assert!(self.contains(x, y), "({x}, {y}) out of {}x{}", self.width, self.height);
        &self.data[self.index_of(x, y)]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline(always)]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        debug_assert!(self.contains(x, y), "({x}, {y}) out of {}x{}", self.width, self.height);
        let i = self.index_of(x, y);
        &mut self.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_column_then_row() {
        let mut grid: Grid<u32> = Grid::new(3, 2);
        grid[(2, 1)] = 7;
        assert_eq!(grid.as_slice()[5], 7);
        assert_eq!(grid.index_of(2, 1), 5);
        assert!(grid.contains(2, 1));
        assert!(!grid.contains(3, 0));
        assert!(!grid.contains(0, 2));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Grid::from_vec(2, 2, vec![0u8; 3]).is_none());
        assert!(Grid::from_vec(2, 2, vec![0u8; 4]).is_some());
    }

    #[test]
    fn iter_coords_is_row_major() {
        let grid = Grid::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        let coords: Vec<_> = grid.iter_coords().map(|(c, v)| (c, *v)).collect();
        assert_eq!(coords, vec![((0, 0), 1), ((1, 0), 2), ((0, 1), 3), ((1, 1), 4)]);
    }

    #[test]
    fn map_keeps_shape() {
        let grid = Grid::from_vec(2, 1, vec![1u32, 3]).unwrap();
        let halves = grid.map(|&v| f64::from(v) / 2.0);
        assert_eq!(halves.width(), 2);
        assert_eq!(halves.height(), 1);
        assert_eq!(halves.as_slice(), &[0.5, 1.5]);
    }
}
