//! The bounded memory tape and its cell types.

use std::fmt;
use std::str::FromStr;

/// An unsigned cell with wraparound arithmetic.
pub trait Cell: Copy + Default + PartialEq + fmt::Debug + fmt::Display + Send + 'static {
    /// Add `by`, wrapping at the cell width.
    fn wrapping_inc(self, by: usize) -> Self;
    /// Subtract `by`, wrapping at the cell width.
    fn wrapping_dec(self, by: usize) -> Self;
    /// The value truncated to its low byte, as written by `.`.
    fn low_byte(self) -> u8;

    fn is_zero(self) -> bool {
        self == Self::default()
    }
}

macro_rules! impl_cell {
    ($($ty:ty),*) => {
        $(
            impl Cell for $ty {
                // Truncating `by` is exact modulo the cell width.
                fn wrapping_inc(self, by: usize) -> Self {
                    self.wrapping_add(by as $ty)
                }

                fn wrapping_dec(self, by: usize) -> Self {
                    self.wrapping_sub(by as $ty)
                }

                fn low_byte(self) -> u8 {
                    self as u8
                }
            }
        )*
    };
}

impl_cell!(u8, u16, u32, u64);

/// Cell type selected at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CellWidth {
    #[default]
    U8,
    U16,
    U32,
    U64,
}

impl fmt::Display for CellWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellWidth::U8 => "u8",
            CellWidth::U16 => "u16",
            CellWidth::U32 => "u32",
            CellWidth::U64 => "u64",
        };
        f.write_str(name)
    }
}

/// Returned when a cell width name is not one of `u8`, `u16`, `u32`, `u64`
/// (the bare bit counts `8`, `16`, `32`, `64` are accepted too).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cell width '{0}' (expected u8, u16, u32 or u64)")]
pub struct ParseCellWidthError(String);

impl FromStr for CellWidth {
    type Err = ParseCellWidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u8" | "8" => Ok(CellWidth::U8),
            "u16" | "16" => Ok(CellWidth::U16),
            "u32" | "32" => Ok(CellWidth::U32),
            "u64" | "64" => Ok(CellWidth::U64),
            _ => Err(ParseCellWidthError(s.to_string())),
        }
    }
}

/// A rejected pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeFault {
    /// Moving left past cell 0.
    Underflow,
    /// Moving right past the last cell.
    Overflow,
}

/// A fixed-capacity tape of zero-initialized cells and a data pointer.
///
/// The pointer always satisfies `pointer < capacity`; a move that would break
/// this is refused and leaves the pointer where it was.
#[derive(Debug, Clone)]
pub struct Tape<C: Cell = u8> {
    cells: Box<[C]>,
    pointer: usize,
}

impl<C: Cell> Tape<C> {
    /// Allocate `capacity` cells on the heap. Returns `None` for a zero
    /// capacity, which could not hold the data pointer.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            cells: vec![C::default(); capacity].into_boxed_slice(),
            pointer: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn current(&self) -> C {
        self.cells[self.pointer]
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    pub fn increment(&mut self, by: usize) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_inc(by);
    }

    pub fn decrement(&mut self, by: usize) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_dec(by);
    }

    pub fn shift_left(&mut self, by: usize) -> Result<(), TapeFault> {
        self.pointer = self.pointer.checked_sub(by).ok_or(TapeFault::Underflow)?;
        Ok(())
    }

    pub fn shift_right(&mut self, by: usize) -> Result<(), TapeFault> {
        match self.pointer.checked_add(by) {
            Some(next) if next < self.cells.len() => {
                self.pointer = next;
                Ok(())
            }
            _ => Err(TapeFault::Overflow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(Tape::<u8>::new(0).is_none());
    }

    #[test]
    fn starts_zeroed_at_cell_zero() {
        let tape = Tape::<u8>::new(4).unwrap();
        assert_eq!(tape.pointer(), 0);
        assert_eq!(tape.cells(), &[0, 0, 0, 0]);
    }

    #[test]
    fn wrapping_subtraction() {
        let mut tape = Tape::<u8>::new(1).unwrap();
        tape.decrement(1);
        assert_eq!(tape.current(), 255);
    }

    #[test]
    fn wrapping_addition() {
        let mut tape = Tape::<u8>::new(1).unwrap();
        for _ in 0..256 {
            tape.increment(1);
        }
        assert_eq!(tape.current(), 0);
    }

    #[test]
    fn wider_cells_wrap_at_their_own_width() {
        let mut tape = Tape::<u16>::new(1).unwrap();
        tape.increment(256);
        assert_eq!(tape.current(), 256);
        assert_eq!(tape.current().low_byte(), 0);
        tape.decrement(257);
        assert_eq!(tape.current(), u16::MAX);
    }

    #[test]
    fn left_from_zero_underflows_and_keeps_pointer() {
        let mut tape = Tape::<u8>::new(3).unwrap();
        assert_eq!(tape.shift_left(1), Err(TapeFault::Underflow));
        assert_eq!(tape.pointer(), 0);
    }

    #[test]
    fn right_past_last_cell_overflows_and_keeps_pointer() {
        let mut tape = Tape::<u8>::new(2).unwrap();
        assert_eq!(tape.shift_right(1), Ok(()));
        assert_eq!(tape.shift_right(1), Err(TapeFault::Overflow));
        assert_eq!(tape.pointer(), 1);
    }

    #[test]
    fn huge_shift_does_not_wrap_pointer() {
        let mut tape = Tape::<u8>::new(2).unwrap();
        assert_eq!(tape.shift_right(usize::MAX), Err(TapeFault::Overflow));
    }

    #[test]
    fn cell_width_parses_names_and_bit_counts() {
        assert_eq!("u8".parse::<CellWidth>(), Ok(CellWidth::U8));
        assert_eq!(" 16 ".parse::<CellWidth>(), Ok(CellWidth::U16));
        assert_eq!("U32".parse::<CellWidth>(), Ok(CellWidth::U32));
        assert_eq!("64".parse::<CellWidth>(), Ok(CellWidth::U64));
        assert!("i8".parse::<CellWidth>().is_err());
    }
}
