//! Packed vectors of 4-state logic values: the value type of every signal.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-width vector of [`Logic`] values, bit 0 being the least significant.
///
/// Each value occupies 2 bits, 32 values per `u64` word.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    data: Vec<u64>,
}

/// Number of logic values packed per u64 word.
const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates a new `LogicVec` of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a vector with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        if value != Logic::Zero {
            for i in 0..width {
                v.set(i, value);
            }
        }
        v
    }

    /// All-`X` vector, the initial value of an uninitialized signal.
    pub fn all_x(width: u32) -> Self {
        Self::filled(width, Logic::X)
    }

    /// All-`Z` vector, the value of a signal with no active driver.
    pub fn all_z(width: u32) -> Self {
        Self::filled(width, Logic::Z)
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        match (self.data[word_idx] >> bit_offset) & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Creates a single-bit `LogicVec` from a boolean value.
    pub fn from_bool(value: bool) -> Self {
        Self::from_logic(if value { Logic::One } else { Logic::Zero })
    }

    /// Creates a single-bit `LogicVec` holding `value`.
    pub fn from_logic(value: Logic) -> Self {
        let mut v = Self::new(1);
        v.set(0, value);
        v
    }

    /// Creates a `LogicVec` from a `u64` value with the given width.
    ///
    /// Bits beyond the given width are ignored.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts to a `u64` if all bits are `0`/`1` and the width fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One => result |= 1 << i,
                Logic::X | Logic::Z => return None,
            }
        }
        Some(result)
    }

    /// Returns `true` if every bit is `0` or `1`.
    pub fn is_known(&self) -> bool {
        (0..self.width).all(|i| self.get(i).is_known())
    }

    /// Parses a binary string like `"10XZ"`, most significant bit first.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.chars().count() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Extracts `width` bits starting at `low`.
    ///
    /// Returns `None` if the range does not fit inside this vector.
    pub fn slice(&self, low: u32, width: u32) -> Option<Self> {
        if low.checked_add(width)? > self.width {
            return None;
        }
        let mut out = Self::new(width);
        for i in 0..width {
            out.set(i, self.get(low + i));
        }
        Some(out)
    }

    /// Overwrites the bits starting at `low` with `part`.
    ///
    /// Returns `false` (leaving `self` untouched) if `part` does not fit.
    pub fn splice(&mut self, low: u32, part: &LogicVec) -> bool {
        match low.checked_add(part.width) {
            Some(end) if end <= self.width => {
                for i in 0..part.width {
                    self.set(low + i, part.get(i));
                }
                true
            }
            _ => false,
        }
    }

    /// Applies `op` bit by bit to two vectors of equal width.
    ///
    /// # Panics
    ///
    /// Panics on a width mismatch.
    pub fn zip_with(&self, other: &LogicVec, op: impl Fn(Logic, Logic) -> Logic) -> LogicVec {
        assert_eq!(self.width, other.width, "LogicVec width mismatch");
        let mut out = LogicVec::new(self.width);
        for i in 0..self.width {
            out.set(i, op(self.get(i), other.get(i)));
        }
        out
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

/// Returns the number of u64 words needed to store `width` logic values.
fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}
