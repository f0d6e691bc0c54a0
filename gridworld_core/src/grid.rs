use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Fixed-size 2D storage addressed by `(x, y)`, laid out row by row.
///
/// The world is a `Grid<CellContents>` and visibility masks are `Grid<bool>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Grid of default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        Self::filled(width, height, T::default())
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self
    where
        T: Clone,
    {
        let len = width.checked_mul(height).expect("grid dimensions overflow");
        Grid {
            width,
            height,
            cells: vec![value; len],
        }
    }

    /// Builds a grid cell by cell; `f` receives `(x, y)` in row-major order.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Grid {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        self.is_valid(x, y).then(|| y * self.width + x)
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Bounds check for signed coordinates, as produced by viewport arithmetic
    /// near the edges.
    #[inline]
    pub fn is_valid_signed(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.is_valid(x as usize, y as usize)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.offset(x, y).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.offset(x, y).map(|i| &mut self.cells[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Yields `((x, y), &cell)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i % width, i / width), cell))
    }

    /// Rotates 90 degrees counter-clockwise. Width and height swap and the
    /// cell at `(i, j)` ends up at `(j, new_height - 1 - i)`.
    pub fn rotate_left(&self) -> Self
    where
        T: Clone,
    {
        let last_column = self.width - 1;
        Grid::from_generator(self.height, self.width, |x, y| {
            self[(last_column - y, x)].clone()
        })
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        match self.offset(x, y) {
            Some(i) => &self.cells[i],
            None => panic!(
                "({x}, {y}) is out of bounds for a {}x{} grid",
                self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        match self.offset(x, y) {
            Some(i) => &mut self.cells[i],
            None => panic!(
                "({x}, {y}) is out of bounds for a {}x{} grid",
                self.width, self.height
            ),
        }
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &T {
        &self[(pos.x, pos.y)]
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut T {
        &mut self[(pos.x, pos.y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Grid<usize> {
        Grid::from_generator(width, height, |x, y| y * width + x)
    }

    #[test]
    fn get_is_checked() {
        let mut grid: Grid<u8> = Grid::new(3, 4);
        *grid.get_mut(2, 3).unwrap() = 7;
        assert_eq!(grid.get(2, 3), Some(&7));
        assert_eq!(grid.get(3, 0), None);
        assert!(grid.get_mut(0, 4).is_none());
        assert!(!grid.is_valid_signed(-1, 0));
    }

    #[test]
    fn rotate_left_swaps_dimensions_and_moves_cells() {
        let grid = numbered(4, 3);
        let rotated = grid.rotate_left();
        assert_eq!((rotated.width(), rotated.height()), (3, 4));
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(rotated[(j, rotated.height() - 1 - i)], grid[(i, j)]);
            }
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        let grid = numbered(5, 3);
        let back = (0..4).fold(grid.clone(), |g, _| g.rotate_left());
        assert_eq!(back, grid);
    }

    #[test]
    fn enumerate_yields_row_major_coordinates() {
        let grid = numbered(3, 2);
        let coords: Vec<_> = grid.enumerate().map(|(c, v)| (c, *v)).collect();
        assert_eq!(coords[0], ((0, 0), 0));
        assert_eq!(coords[4], ((1, 1), 4));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_panics_out_of_bounds() {
        let grid: Grid<bool> = Grid::new(3, 3);
        let _ = grid[(0, 3)];
    }
}
