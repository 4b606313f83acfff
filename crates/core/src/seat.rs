//! Seat grid geometry.

use std::fmt;

use serde::{Serialize, Serializer};

/// Number of seat rows in every theater.
pub const ROWS: usize = 6;
/// Number of seats per row.
pub const COLS: usize = 8;
/// Total seats per movie.
pub const SEAT_COUNT: usize = ROWS * COLS;

/// Row-major position of a seat, always within `[0, SEAT_COUNT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatIndex(u8);

impl SeatIndex {
    /// Top-left seat.
    pub const FIRST: SeatIndex = SeatIndex(0);

    /// Build a seat index, rejecting values outside the grid.
    pub fn new(index: usize) -> Option<Self> {
        (index < SEAT_COUNT).then(|| Self(index as u8))
    }

    /// Build a seat index from zero-based row and column.
    pub fn from_position(row: usize, col: usize) -> Option<Self> {
        if row < ROWS && col < COLS {
            Self::new(row * COLS + col)
        } else {
            None
        }
    }

    /// Iterate every seat in row-major order.
    pub fn all() -> impl Iterator<Item = SeatIndex> {
        (0..SEAT_COUNT as u8).map(SeatIndex)
    }

    /// Row-major position.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Zero-based row.
    pub fn row(self) -> usize {
        self.index() / COLS
    }

    /// Zero-based column.
    pub fn col(self) -> usize {
        self.index() % COLS
    }

    /// Human-facing label such as `A1` or `F8`.
    pub fn label(self) -> String {
        let row = char::from(b'A' + self.row() as u8);
        format!("{row}{}", self.col() + 1)
    }
}

impl fmt::Display for SeatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for SeatIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(SeatIndex::new(47).is_some());
        assert!(SeatIndex::new(48).is_none());
        assert!(SeatIndex::from_position(6, 0).is_none());
        assert!(SeatIndex::from_position(0, 8).is_none());
    }

    #[test]
    fn row_major_layout() {
        let seat = SeatIndex::from_position(2, 3).expect("in range");
        assert_eq!(seat.index(), 19);
        assert_eq!((seat.row(), seat.col()), (2, 3));
        assert_eq!(seat.label(), "C4");
        assert_eq!(SeatIndex::all().count(), SEAT_COUNT);
        assert_eq!(SeatIndex::all().last().map(|s| s.label()), Some("F8".to_string()));
    }
}
