//! Simulation time with femtosecond precision and delta cycles.
//!
//! [`SimTime`] pairs the logical time (in femtoseconds) with the delta cycle
//! index inside that time step. Comparison is lexicographic, which is exactly
//! the order in which the scheduler must process slots.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;

/// A simulation time point: logical time plus delta cycle index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Logical simulation time in femtoseconds.
    pub fs: u64,
    /// Delta cycle index within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self { fs: 0, delta: 0 }
    }

    /// Creates a time from a nanosecond value with delta 0.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// Creates a time from a picosecond value with delta 0.
    pub fn from_ps(ps: u64) -> Self {
        Self::from_fs(ps * FS_PER_PS)
    }

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Creates a time at a specific delta of a logical time.
    pub fn at_delta(fs: u64, delta: u32) -> Self {
        Self { fs, delta }
    }

    /// Returns the next delta cycle at the same logical time.
    pub fn next_delta(&self) -> Self {
        self.delta_after(0)
    }

    /// Returns the delta cycle `offset + 1` steps after this one.
    ///
    /// An offset of zero is the next delta boundary, never the current slot.
    pub fn delta_after(&self, offset: u32) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta.saturating_add(offset).saturating_add(1),
        }
    }

    /// Like [`delta_after`](Self::delta_after), but `None` when the target
    /// delta does not fit in a `u32`.
    pub fn checked_delta_after(&self, offset: u32) -> Option<Self> {
        let delta = self.delta.checked_add(offset)?.checked_add(1)?;
        Some(Self { fs: self.fs, delta })
    }

    /// Returns delta 0 of the logical time `fs` femtoseconds from now.
    ///
    /// A zero delay degenerates to [`next_delta`](Self::next_delta) so that
    /// no event is ever scheduled into the slot currently being drained.
    pub fn after(&self, fs: u64) -> Self {
        if fs == 0 {
            self.next_delta()
        } else {
            Self::from_fs(self.fs.saturating_add(fs))
        }
    }

    /// Advances to a new logical time, resetting the delta counter.
    pub fn advance_to(&self, new_fs: u64) -> Self {
        debug_assert!(
            new_fs >= self.fs,
            "cannot advance backwards: {} -> {}",
            self.fs,
            new_fs
        );
        Self::from_fs(new_fs)
    }

    /// Converts the femtosecond timestamp to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        let unit = [
            (FS_PER_MS, "ms"),
            (FS_PER_US, "us"),
            (FS_PER_NS, "ns"),
            (FS_PER_PS, "ps"),
        ]
        .into_iter()
        .find(|(scale, _)| fs >= *scale && fs % scale == 0);
        match unit {
            Some((scale, name)) => write!(f, "{} {name}", fs / scale)?,
            None => write!(f, "{fs} fs")?,
        }
        write!(f, "+d{}", self.delta)
    }
}

/// Error returned when a time string such as `"10 ns"` cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time: '{}'", self.input)
    }
}

impl std::error::Error for ParseTimeError {}

/// Parses `"<integer> <unit>"` with units `fs`, `ps`, `ns`, `us`, `ms`.
///
/// The space is optional and a bare integer is femtoseconds. The result is at
/// delta 0.
impl FromStr for SimTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseTimeError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(lower.len());
        let (num, unit) = lower.split_at(split);
        let value: u64 = num.parse().map_err(|_| err())?;
        let scale = match unit.trim() {
            "" | "fs" => 1,
            "ps" => FS_PER_PS,
            "ns" => FS_PER_NS,
            "us" => FS_PER_US,
            "ms" => FS_PER_MS,
            _ => return Err(err()),
        };
        value.checked_mul(scale).map(Self::from_fs).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(SimTime::from_ns(10).fs, 10_000_000);
        assert_eq!(SimTime::from_ps(500).fs, 500_000);
        assert_eq!(SimTime::at_delta(7, 3), SimTime { fs: 7, delta: 3 });
        assert_eq!(SimTime::default(), SimTime::zero());
    }

    #[test]
    fn delta_arithmetic() {
        let t = SimTime::at_delta(5, 2);
        assert_eq!(t.next_delta(), SimTime::at_delta(5, 3));
        assert_eq!(t.delta_after(0), SimTime::at_delta(5, 3));
        assert_eq!(t.delta_after(4), SimTime::at_delta(5, 7));
    }

    #[test]
    fn checked_delta_after_at_the_boundary() {
        let t = SimTime::at_delta(5, 0);
        assert_eq!(
            t.checked_delta_after(u32::MAX - 1),
            Some(SimTime::at_delta(5, u32::MAX))
        );
        assert_eq!(t.checked_delta_after(u32::MAX), None);
        assert_eq!(SimTime::at_delta(5, u32::MAX).checked_delta_after(0), None);
    }

    #[test]
    fn after_zero_is_next_delta() {
        let t = SimTime::at_delta(100, 1);
        assert_eq!(t.after(0), SimTime::at_delta(100, 2));
        assert_eq!(t.after(50), SimTime::at_delta(150, 0));
    }

    #[test]
    fn advance_resets_delta() {
        let t = SimTime { fs: 100, delta: 5 };
        assert_eq!(t.advance_to(200), SimTime::from_fs(200));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(SimTime::at_delta(100, 0) < SimTime::at_delta(100, 1));
        assert!(SimTime::at_delta(200, 0) > SimTime::at_delta(100, 99));
    }

    #[test]
    fn display_picks_unit() {
        assert_eq!(SimTime::zero().to_string(), "0 fs+d0");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns+d0");
        assert_eq!(SimTime::from_fs(5 * FS_PER_US).to_string(), "5 us+d0");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs+d0");
        assert_eq!(SimTime::at_delta(FS_PER_NS, 3).to_string(), "1 ns+d3");
    }

    #[test]
    fn parse_units() {
        assert_eq!("10 ns".parse::<SimTime>().unwrap(), SimTime::from_ns(10));
        assert_eq!("2us".parse::<SimTime>().unwrap().fs, 2 * FS_PER_US);
        assert_eq!("250 PS".parse::<SimTime>().unwrap(), SimTime::from_ps(250));
        assert_eq!("42".parse::<SimTime>().unwrap(), SimTime::from_fs(42));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("ten ns".parse::<SimTime>().is_err());
        assert!("10 hours".parse::<SimTime>().is_err());
        assert!("".parse::<SimTime>().is_err());
        assert!("99999999999 ms".parse::<SimTime>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime { fs: 12345, delta: 7 };
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
