//! World-grid operations on `Grid<CellContents>`.

use crate::{
    Position,
    cell::CellContents,
    encoding::{DecodeError, EncodedGrid},
    grid::Grid,
    object::{ObjectRef, Wall, decode_object, shared},
};

/// The world grid: one [`CellContents`] per cell.
pub type ObjectGrid = Grid<CellContents>;

/// Per-cell visibility, same shape as the grid it was computed for.
pub type VisibilityMask = Grid<bool>;

impl Grid<CellContents> {
    /// Creates an empty world grid.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is smaller than 3.
    pub fn empty(width: usize, height: usize) -> Self {
        assert!(
            width >= 3 && height >= 3,
            "Grid must be at least 3x3, got {}x{}",
            width,
            height
        );
        Grid::new(width, height)
    }

    /// Adds `object` to the cell, stacking it on any existing occupants.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, object: ObjectRef) {
        self[(x, y)].push(object);
    }

    /// Empties the cell.
    pub fn clear(&mut self, x: usize, y: usize) {
        self[(x, y)] = CellContents::Empty;
    }

    /// Removes one specific occupant from the cell.
    pub fn remove(&mut self, x: usize, y: usize, object: &ObjectRef) -> bool {
        self[(x, y)].remove(object)
    }

    /// Position of the first cell holding `object`, scanning row-major.
    pub fn find(&self, object: &ObjectRef) -> Option<Position> {
        self.enumerate()
            .find(|(_, cell)| cell.contains(object))
            .map(|((x, y), _)| Position { x, y })
    }

    /// Horizontal run of walls starting at `(x, y)`; runs to the right edge by default.
    pub fn horz_wall(&mut self, x: usize, y: usize, length: Option<usize>) {
        let length = length.unwrap_or(self.width() - x);
        for i in 0..length {
            self.set(x + i, y, shared(Wall::default()));
        }
    }

    /// Vertical run of walls starting at `(x, y)`; runs to the bottom edge by default.
    pub fn vert_wall(&mut self, x: usize, y: usize, length: Option<usize>) {
        let length = length.unwrap_or(self.height() - y);
        for j in 0..length {
            self.set(x, y + j, shared(Wall::default()));
        }
    }

    /// Outline of a `width` x `height` rectangle of walls, one wall per cell.
    pub fn wall_rect(&mut self, x: usize, y: usize, width: usize, height: usize) {
        self.horz_wall(x, y, Some(width));
        self.horz_wall(x, y + height - 1, Some(width));
        let side = height.saturating_sub(2);
        self.vert_wall(x, y + 1, Some(side));
        self.vert_wall(x + width - 1, y + 1, Some(side));
    }

    /// Copies a window of the grid. Cells outside the source become walls.
    pub fn slice(&self, top_x: isize, top_y: isize, width: usize, height: usize) -> ObjectGrid {
        Grid::from_generator(width, height, |i, j| {
            let x = top_x + i as isize;
            let y = top_y + j as isize;
            if self.is_valid_signed(x, y) {
                self[(x as usize, y as usize)].clone()
            } else {
                CellContents::Single(shared(Wall::default()))
            }
        })
    }

    /// Encodes visible cells; cells hidden by `mask` stay unseen.
    pub fn encode(&self, mask: Option<&VisibilityMask>) -> EncodedGrid {
        let mut encoded = EncodedGrid::new(self.width(), self.height());
        for ((x, y), cell) in self.enumerate() {
            if mask.is_none_or(|mask| mask[(x, y)]) {
                encoded.set(x, y, cell.encode());
            }
        }
        encoded
    }

    /// Rebuilds a grid and its visibility mask from an encoding.
    ///
    /// Stacked cells cannot be recovered; their summed triple decodes as a
    /// single object or fails with a [`DecodeError`].
    pub fn decode(encoded: &EncodedGrid) -> Result<(ObjectGrid, VisibilityMask), DecodeError> {
        let (width, height, _) = encoded.shape();
        let mut grid = ObjectGrid::new(width, height);
        let mut mask = VisibilityMask::filled(width, height, true);
        for i in 0..width {
            for j in 0..height {
                let [type_idx, color_idx, state] = encoded.get(i, j);
                if let Some(object) = decode_object(type_idx, color_idx, state)? {
                    grid.set(i, j, object);
                }
                mask[(i, j)] = !encoded.is_unseen(i, j);
            }
        }
        Ok((grid, mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Color,
        encoding::EMPTY,
        object::{Ball, Door, Floor, Key, ObjectKind},
    };

    #[test]
    #[should_panic(expected = "at least 3x3")]
    fn tiny_grids_are_rejected() {
        let _ = ObjectGrid::empty(2, 5);
    }

    #[test]
    fn wall_rect_outlines_the_grid() {
        let mut grid = ObjectGrid::empty(5, 4);
        grid.wall_rect(0, 0, 5, 4);
        for ((x, y), cell) in grid.enumerate() {
            let border = x == 0 || y == 0 || x == 4 || y == 3;
            assert_eq!(cell.contains_kind(ObjectKind::Wall), border, "({x}, {y})");
        }
        assert!(grid.iter().all(|cell| cell.len() <= 1));
    }

    #[test]
    fn slice_pads_with_walls_outside_the_source() {
        let mut grid = ObjectGrid::empty(4, 4);
        let key = shared(Key::new(Color::Red, "key_0"));
        grid.set(0, 0, key.clone());

        let window = grid.slice(-1, -1, 3, 3);
        assert!(window[(0, 0)].contains_kind(ObjectKind::Wall));
        assert!(window[(1, 0)].contains_kind(ObjectKind::Wall));
        assert!(window[(0, 2)].contains_kind(ObjectKind::Wall));
        assert!(window[(1, 1)].contains(&key));
        assert!(window[(2, 2)].is_empty());
    }

    #[test]
    fn encode_respects_mask_and_decode_recovers_it() {
        let mut grid = ObjectGrid::empty(3, 3);
        grid.set(1, 1, shared(Ball::new(Color::Green, "ball_0")));
        grid.set(2, 0, shared(Door::locked(Color::Blue, "door_0")));
        let mut mask = VisibilityMask::filled(3, 3, true);
        mask[(0, 2)] = false;

        let encoded = grid.encode(Some(&mask));
        assert_eq!(encoded.get(1, 1), [6, 1, 0]);
        assert_eq!(encoded.get(2, 0), [4, 2, 2]);
        assert_eq!(encoded.get(0, 0), EMPTY);
        assert!(encoded.is_unseen(0, 2));

        let (decoded, decoded_mask) = ObjectGrid::decode(&encoded).unwrap();
        assert_eq!(decoded_mask, mask);
        assert!(decoded[(2, 0)].objects()[0].borrow().is_locked());
        assert!(decoded[(0, 2)].is_empty());
    }

    #[test]
    fn find_and_remove_track_identity() {
        let mut grid = ObjectGrid::empty(3, 3);
        let floor = shared(Floor::default());
        let key = shared(Key::new(Color::Yellow, "key_0"));
        grid.set(2, 1, floor);
        grid.set(2, 1, key.clone());
        assert_eq!(grid.find(&key), Some(Position::new(2, 1)));
        assert!(grid.remove(2, 1, &key));
        assert_eq!(grid.find(&key), None);
        assert_eq!(grid[(2, 1)].len(), 1);
    }
}
