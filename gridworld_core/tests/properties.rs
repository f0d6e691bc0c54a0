use gridworld_core::{
    ObjectGrid, ObjectKind, ObjectRegistry, Position,
    actions::ActionSpace,
    config::ObjectSpec,
    object::decode_object,
    visibility::process_vis,
};
use proptest::prelude::*;

/// `(type, color, state)` for one cell; type 1 is an empty cell.
fn cell_triple() -> impl Strategy<Value = (u8, u8, u8)> {
    (1u8..10, 0u8..6, 0u8..3).prop_map(|(kind, color, state)| {
        let state = match kind {
            4 => state,
            7 => state % 2,
            _ => 0,
        };
        (kind, color, state)
    })
}

fn object_grid() -> impl Strategy<Value = ObjectGrid> {
    (3usize..9, 3usize..9).prop_flat_map(|(width, height)| {
        prop::collection::vec(cell_triple(), width * height).prop_map(move |cells| {
            let mut grid = ObjectGrid::empty(width, height);
            for (index, (kind, color, state)) in cells.into_iter().enumerate() {
                if let Ok(Some(object)) = decode_object(kind, color, state) {
                    grid.set(index % width, index / width, object);
                }
            }
            grid
        })
    })
}

proptest! {
    #[test]
    fn four_left_rotations_are_identity(grid in object_grid()) {
        let rotated = grid.rotate_left().rotate_left().rotate_left().rotate_left();
        prop_assert_eq!(rotated.encode(None), grid.encode(None));
    }

    #[test]
    fn rotation_swaps_dimensions(grid in object_grid()) {
        let rotated = grid.rotate_left();
        prop_assert_eq!(rotated.width(), grid.height());
        prop_assert_eq!(rotated.height(), grid.width());
    }

    #[test]
    fn decode_inverts_encode_for_single_occupants(grid in object_grid()) {
        let encoded = grid.encode(None);
        let (decoded, mask) = ObjectGrid::decode(&encoded).unwrap();
        prop_assert!(mask.iter().all(|&seen| seen));
        prop_assert_eq!(decoded.encode(None), encoded);
    }

    #[test]
    fn slice_fills_outside_with_walls(
        grid in object_grid(),
        top_x in -6isize..10,
        top_y in -6isize..10,
        size in 1usize..8,
    ) {
        let window = grid.slice(top_x, top_y, size, size);
        for ((i, j), cell) in window.enumerate() {
            let x = top_x + i as isize;
            let y = top_y + j as isize;
            if grid.is_valid_signed(x, y) {
                prop_assert_eq!(cell.encode(), grid[(x as usize, y as usize)].encode());
            } else {
                prop_assert_eq!(cell.len(), 1);
                prop_assert!(cell.contains_kind(ObjectKind::Wall));
            }
        }
    }

    #[test]
    fn viewer_cell_is_always_visible(grid in object_grid(), vx in 0usize..9) {
        let mut grid = grid;
        let viewer = Position::new(vx % grid.width(), grid.height() - 1);
        let mask = process_vis(&mut grid, viewer);
        prop_assert!(mask[viewer]);
        for ((x, y), seen) in mask.enumerate() {
            if !*seen {
                prop_assert!(grid[(x, y)].is_empty());
            }
        }
    }

    #[test]
    fn action_count_matches_supported_interactions(
        keys in 0usize..4,
        doors in 0usize..4,
        boxes in 0usize..3,
        goals in 0usize..3,
    ) {
        let registry = ObjectRegistry::from_population(&[
            ObjectSpec::new(ObjectKind::Key, keys),
            ObjectSpec::new(ObjectKind::Door, doors),
            ObjectSpec::new(ObjectKind::Container, boxes),
            ObjectSpec::new(ObjectKind::Goal, goals),
        ]).unwrap();
        let space = ActionSpace::build(&registry);
        prop_assert_eq!(space.len(), 3 + 2 * keys + 3 * doors + 4 * boxes);
        prop_assert_eq!(space.id_of("left"), Some(0));
        prop_assert_eq!(space.id_of("right"), Some(1));
        prop_assert_eq!(space.id_of("forward"), Some(2));
    }
}
