//! Compact `(width, height, 3)` byte encoding of a grid.
//!
//! Each cell carries `[type_index, color_index, state]`. Type index `0`
//! (`unseen`) marks cells the viewer could not see; `1` (`empty`) marks
//! visible cells with nothing in them.

use serde::{Deserialize, Serialize};

use crate::object::ObjectKind;

/// Channels per encoded cell.
pub const CHANNELS: usize = 3;

/// Encoding of a cell hidden by occlusion.
pub const UNSEEN: [u8; 3] = [ObjectKind::Unseen as u8, 0, 0];

/// Encoding of a visible cell with no occupant.
pub const EMPTY: [u8; 3] = [ObjectKind::Empty as u8, 0, 0];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown object type index {0}")]
    UnknownType(u8),
    #[error("unknown color index {0}")]
    UnknownColor(u8),
    #[error("state {state} is not valid for {kind}")]
    UnknownState { kind: ObjectKind, state: u8 },
    #[error("expected {expected} bytes for the grid shape, got {actual}")]
    Shape { expected: usize, actual: usize },
}

/// Byte array laid out like a C-ordered `(width, height, 3)` array:
/// cell `(i, j)` starts at `(i * height + j) * 3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedGrid {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl EncodedGrid {
    /// All-zero array, i.e. every cell unseen.
    pub fn new(width: usize, height: usize) -> Self {
        EncodedGrid {
            width,
            height,
            data: vec![0; width * height * CHANNELS],
        }
    }

    pub fn from_bytes(width: usize, height: usize, data: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(DecodeError::Shape {
                expected,
                actual: data.len(),
            });
        }
        Ok(EncodedGrid {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width, self.height, CHANNELS)
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        assert!(
            i < self.width && j < self.height,
            "Encoded cell ({}, {}) out of bounds for shape ({}, {})",
            i,
            j,
            self.width,
            self.height
        );
        (i * self.height + j) * CHANNELS
    }

    pub fn get(&self, i: usize, j: usize) -> [u8; 3] {
        let at = self.offset(i, j);
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }

    pub fn set(&mut self, i: usize, j: usize, value: [u8; 3]) {
        let at = self.offset(i, j);
        self.data[at..at + CHANNELS].copy_from_slice(&value);
    }

    pub fn is_unseen(&self, i: usize, j: usize) -> bool {
        self.get(i, j)[0] == ObjectKind::Unseen.index()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_width_major() {
        let mut encoded = EncodedGrid::new(2, 3);
        encoded.set(1, 0, [5, 4, 0]);
        assert_eq!(&encoded.as_bytes()[9..12], &[5, 4, 0]);
        assert_eq!(encoded.get(1, 0), [5, 4, 0]);
        assert_eq!(encoded.shape(), (2, 3, 3));
    }

    #[test]
    fn fresh_array_is_unseen() {
        let encoded = EncodedGrid::new(3, 3);
        assert!(encoded.is_unseen(2, 2));
        assert_eq!(encoded.get(0, 0), UNSEEN);
    }

    #[test]
    fn from_bytes_checks_length() {
        assert_eq!(
            EncodedGrid::from_bytes(3, 3, vec![0; 10]).unwrap_err(),
            DecodeError::Shape {
                expected: 27,
                actual: 10
            }
        );
    }
}
