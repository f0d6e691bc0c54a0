//! Occlusion sweep over an agent-relative viewport.
//!
//! This is a row-by-row approximation of line of sight, not ray casting.
//! Starting at the viewer's row and moving towards row 0, each row is swept
//! left-to-right and then right-to-left. A visible, see-through cell lights
//! its neighbour along the sweep plus the one or two cells diagonally and
//! directly ahead in the next row. The first opaque cell met on a sweep ends
//! that sweep: it stays visible, nothing past it on that pass is propagated.

use crate::{
    Position,
    object_grid::{ObjectGrid, VisibilityMask},
};

/// Computes the visibility mask for a viewer at `viewer` and strips every
/// hidden cell from `grid`.
///
/// A stacked cell is opaque as soon as one of its occupants is.
pub fn process_vis(grid: &mut ObjectGrid, viewer: Position) -> VisibilityMask {
    let width = grid.width();
    let height = grid.height();
    let mut mask = VisibilityMask::new(width, height);
    mask[viewer] = true;

    for j in (0..height).rev() {
        for i in 0..width - 1 {
            if !mask[(i, j)] {
                continue;
            }
            if grid[(i, j)].blocks_sight() {
                break;
            }
            mask[(i + 1, j)] = true;
            if j > 0 {
                mask[(i + 1, j - 1)] = true;
                mask[(i, j - 1)] = true;
            }
        }

        for i in (1..width).rev() {
            if !mask[(i, j)] {
                continue;
            }
            if grid[(i, j)].blocks_sight() {
                break;
            }
            mask[(i - 1, j)] = true;
            if j > 0 {
                mask[(i - 1, j - 1)] = true;
                mask[(i, j - 1)] = true;
            }
        }
    }

    for j in 0..height {
        for i in 0..width {
            if !mask[(i, j)] {
                grid.clear(i, j);
            }
        }
    }

    mask
}
