//! Four-state logic values (`0`, `1`, `X`, `Z`) with IEEE 1164 operators.
//!
//! The nine-valued `std_logic` of VHDL collapses onto these four states for
//! simulation purposes: `U`/`X`/`W`/`-` map to `X`, `L` to `0`, `H` to `1`
//! (see [`Logic::from_std_logic_char`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single 4-state logic value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown or uninitialized.
    X = 2,
    /// High-impedance (not driven).
    Z = 3,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Converts a nine-valued `std_logic` character to its 4-state image.
    pub fn from_std_logic_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            '0' | 'L' => Some(Logic::Zero),
            '1' | 'H' => Some(Logic::One),
            'U' | 'X' | 'W' | '-' => Some(Logic::X),
            'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Returns `true` for `0` and `1`.
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Combines two simultaneous contributions on the same wire.
    ///
    /// `Z` yields to anything, equal values agree, and any other pair
    /// produces `X`. This is the `std_logic` resolution table restricted to
    /// four states; it is commutative and associative, so folding a driver
    /// list gives the same answer in any order.
    pub fn resolve(self, other: Self) -> Self {
        use Logic::*;
        match (self, other) {
            (Z, v) | (v, Z) => v,
            (a, b) if a == b => a,
            _ => X,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
            Logic::Z => write!(f, "Z"),
        }
    }
}

/// IEEE 1164 AND: `0` dominates, otherwise any non-`1` input gives `X`.
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// IEEE 1164 OR: `1` dominates, otherwise any non-`0` input gives `X`.
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => X,
        }
    }
}

impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        use Logic::*;
        match self {
            Zero => One,
            One => Zero,
            X | Z => X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Logic::{self, *};

    const ALL: [Logic; 4] = [Zero, One, X, Z];

    #[test]
    fn and_or_dominance() {
        for v in ALL {
            assert_eq!(Zero & v, Zero);
            assert_eq!(One | v, One);
        }
        assert_eq!(One & One, One);
        assert_eq!(One & Z, X);
        assert_eq!(Zero | Zero, Zero);
        assert_eq!(Zero | Z, X);
    }

    #[test]
    fn xor_and_not() {
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ One, Zero);
        assert_eq!(One ^ X, X);
        assert_eq!(!Zero, One);
        assert_eq!(!Z, X);
    }

    #[test]
    fn resolve_table() {
        assert_eq!(Z.resolve(One), One);
        assert_eq!(Zero.resolve(Z), Zero);
        assert_eq!(Z.resolve(Z), Z);
        assert_eq!(One.resolve(One), One);
        assert_eq!(Zero.resolve(One), X);
        assert_eq!(X.resolve(Zero), X);
    }

    #[test]
    fn resolve_is_commutative_and_associative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.resolve(b), b.resolve(a));
                for c in ALL {
                    assert_eq!(a.resolve(b).resolve(c), a.resolve(b.resolve(c)));
                }
            }
        }
    }

    #[test]
    fn std_logic_mapping() {
        assert_eq!(Logic::from_std_logic_char('U'), Some(X));
        assert_eq!(Logic::from_std_logic_char('h'), Some(One));
        assert_eq!(Logic::from_std_logic_char('L'), Some(Zero));
        assert_eq!(Logic::from_std_logic_char('-'), Some(X));
        assert_eq!(Logic::from_std_logic_char('q'), None);
    }

    #[test]
    fn char_roundtrip() {
        for v in ALL {
            let c = format!("{v}").chars().next().unwrap();
            assert_eq!(Logic::from_char(c), Some(v));
        }
        assert_eq!(Logic::from_char('2'), None);
        assert!(One.is_known());
        assert!(!Z.is_known());
    }
}
