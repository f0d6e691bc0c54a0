use std::slice;

use crate::object::{ObjectKind, ObjectRef, same_object};

/// Occupants of one grid cell.
///
/// A cell that loses its last occupant goes back to `Empty`, and a
/// `Multiple` always holds at least two handles.
#[derive(Debug, Clone, Default)]
pub enum CellContents {
    #[default]
    Empty,
    Single(ObjectRef),
    Multiple(Vec<ObjectRef>),
}

impl CellContents {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContents::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            CellContents::Empty => 0,
            CellContents::Single(_) => 1,
            CellContents::Multiple(objects) => objects.len(),
        }
    }

    /// Occupants in stacking order.
    pub fn objects(&self) -> &[ObjectRef] {
        match self {
            CellContents::Empty => &[],
            CellContents::Single(object) => slice::from_ref(object),
            CellContents::Multiple(objects) => objects,
        }
    }

    /// Stacks `object` on top of whatever is already here.
    pub fn push(&mut self, object: ObjectRef) {
        *self = match std::mem::take(self) {
            CellContents::Empty => CellContents::Single(object),
            CellContents::Single(existing) => CellContents::Multiple(vec![existing, object]),
            CellContents::Multiple(mut objects) => {
                objects.push(object);
                CellContents::Multiple(objects)
            }
        };
    }

    /// Removes one specific occupant. Returns `false` if it was not here.
    pub fn remove(&mut self, object: &ObjectRef) -> bool {
        match self {
            CellContents::Empty => false,
            CellContents::Single(existing) => {
                if same_object(existing, object) {
                    *self = CellContents::Empty;
                    true
                } else {
                    false
                }
            }
            CellContents::Multiple(objects) => {
                let Some(index) = objects.iter().position(|o| same_object(o, object)) else {
                    return false;
                };
                objects.remove(index);
                if objects.len() == 1 {
                    let last = objects.pop();
                    *self = last.map_or(CellContents::Empty, CellContents::Single);
                }
                true
            }
        }
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.objects().iter().any(|o| same_object(o, object))
    }

    pub fn contains_kind(&self, kind: ObjectKind) -> bool {
        self.objects().iter().any(|o| o.borrow().kind() == kind)
    }

    /// True when the agent may enter: empty, or every occupant is overlappable.
    pub fn can_overlap(&self) -> bool {
        self.objects().iter().all(|o| o.borrow().can_overlap())
    }

    /// True when any occupant is opaque.
    pub fn blocks_sight(&self) -> bool {
        self.objects().iter().any(|o| !o.borrow().can_see_behind())
    }

    /// Encoded triple for a visible cell.
    ///
    /// Stacked occupants are summed channel by channel with `u8` wraparound,
    /// so distinct stacks can alias to the same bytes.
    pub fn encode(&self) -> [u8; 3] {
        match self {
            CellContents::Empty => [ObjectKind::Empty.index(), 0, 0],
            CellContents::Single(object) => object.borrow().encode(),
            CellContents::Multiple(objects) => objects.iter().fold([0u8; 3], |acc, object| {
                let code = object.borrow().encode();
                [
                    acc[0].wrapping_add(code[0]),
                    acc[1].wrapping_add(code[1]),
                    acc[2].wrapping_add(code[2]),
                ]
            }),
        }
    }
}

/// Cells compare by their encoding.
impl PartialEq for CellContents {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Color,
        object::{Door, Floor, Key, Wall, shared},
    };

    #[test]
    fn push_promotes_single_to_multiple() {
        let floor = shared(Floor::default());
        let key = shared(Key::new(Color::Red, "key_0"));
        let mut cell = CellContents::Empty;

        cell.push(floor.clone());
        assert!(matches!(cell, CellContents::Single(_)));

        cell.push(key.clone());
        assert_eq!(cell.len(), 2);
        assert!(cell.contains(&key));
    }

    #[test]
    fn removing_down_to_one_collapses_to_single_and_then_empty() {
        let floor = shared(Floor::default());
        let key = shared(Key::new(Color::Red, "key_0"));
        let mut cell = CellContents::Multiple(vec![floor.clone(), key.clone()]);

        assert!(cell.remove(&key));
        assert!(matches!(cell, CellContents::Single(_)));
        assert!(!cell.remove(&key));
        assert!(cell.remove(&floor));
        assert!(cell.is_empty());
    }

    #[test]
    fn identity_not_equality_decides_removal() {
        let a = shared(Key::new(Color::Red, "key_0"));
        let b = shared(Key::new(Color::Red, "key_0"));
        let mut cell = CellContents::Single(a);
        assert!(!cell.remove(&b));
        assert_eq!(cell.len(), 1);
    }

    #[test]
    fn stacked_cells_encode_as_channel_sum() {
        let floor = shared(Floor::new(Color::Blue, "floor"));
        let key = shared(Key::new(Color::Yellow, "key_0"));
        let cell = CellContents::Multiple(vec![floor, key]);
        // floor (3, 2, 0) + key (5, 4, 0)
        assert_eq!(cell.encode(), [8, 6, 0]);
    }

    #[test]
    fn empty_cell_encodes_as_empty_marker() {
        assert_eq!(CellContents::Empty.encode(), [1, 0, 0]);
    }

    #[test]
    fn overlap_and_sight_consider_every_occupant() {
        let floor = shared(Floor::default());
        let door = shared(Door::new(Color::Red, "door_0"));
        let cell = CellContents::Multiple(vec![floor.clone(), door]);
        assert!(!cell.can_overlap());
        assert!(cell.blocks_sight());

        let open = CellContents::Single(floor);
        assert!(open.can_overlap());
        assert!(!open.blocks_sight());
        assert!(CellContents::Single(shared(Wall::default())).blocks_sight());
    }
}
