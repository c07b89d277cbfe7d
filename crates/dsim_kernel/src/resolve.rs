//! Drive strengths and multi-driver resolution.
//!
//! A resolved signal keeps one [`Driver`] per [`DriverId`]. Whenever one of
//! them changes, [`resolve`] folds the whole table into the signal's
//! effective value according to the signal's [`Resolution`] policy.

use dsim_common::{Logic, LogicVec};
use serde::{Deserialize, Serialize};

use crate::transaction::DriverId;

/// Drive strength levels for multi-driver resolution.
///
/// Ordered from weakest to strongest. Only drivers at the maximum strength
/// present on a signal take part in resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DriveStrength {
    /// High-impedance (not driven).
    HighImpedance,
    /// Weak drive (`weak0`, `weak1`).
    Weak,
    /// Pull drive (`pull0`, `pull1`, `L`, `H`).
    Pull,
    /// Strong drive, the default for process assignments.
    #[default]
    Strong,
    /// Supply-level drive.
    Supply,
}

/// The current contribution of one driver to a resolved signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Driver {
    /// The value this driver is asserting.
    pub value: LogicVec,
    /// The strength of this driver.
    pub strength: DriveStrength,
}

/// How a resolved signal merges the contributions of its drivers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// The strongest driver decides; two strongest drivers disagreeing on a
    /// driven bit is a conflict.
    #[default]
    StrongestWins,
    /// Driven bits are AND-ed together; undriven bits stay `Z`.
    WiredAnd,
    /// Driven bits are OR-ed together; undriven bits stay `Z`.
    WiredOr,
    /// `std_logic` resolution: agreeing bits keep their value, disagreeing
    /// bits become `X`. Never fails.
    Ieee1164,
}

/// The outcome of resolving a driver table.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    /// The effective signal value.
    pub value: LogicVec,
    /// The strength of the strongest contributing driver.
    pub strength: DriveStrength,
}

/// Two drivers of equal strength disagree on a bit under [`Resolution::StrongestWins`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveConflict {
    /// The first driver (in driver order) holding the bit.
    pub first: DriverId,
    /// The driver that disagreed with it.
    pub second: DriverId,
    /// The contested bit index.
    pub bit: u32,
}

/// Resolves a driver table to a single value and strength.
///
/// Rules:
/// 1. No drivers: all-`Z` at [`DriveStrength::HighImpedance`].
/// 2. One driver: its value and strength, unchanged.
/// 3. Otherwise only drivers at the maximum strength participate, and each
///    bit is merged per `policy`. A `Z` bit on a participating driver means
///    that driver leaves the bit alone.
///
/// Drivers are visited in the order given, which makes the reported
/// conflict pair deterministic when callers pass a sorted table.
pub fn resolve<'a, I>(
    policy: Resolution,
    drivers: I,
    width: u32,
) -> Result<Resolved, ResolveConflict>
where
    I: IntoIterator<Item = (DriverId, &'a Driver)>,
{
    let drivers: Vec<(DriverId, &Driver)> = drivers.into_iter().collect();

    let Some(max) = drivers.iter().map(|(_, d)| d.strength).max() else {
        return Ok(Resolved {
            value: LogicVec::all_z(width),
            strength: DriveStrength::HighImpedance,
        });
    };

    if let [(_, only)] = drivers.as_slice() {
        return Ok(Resolved {
            value: only.value.clone(),
            strength: only.strength,
        });
    }

    let strongest: Vec<(DriverId, &LogicVec)> = drivers
        .iter()
        .filter(|(_, d)| d.strength == max)
        .map(|(id, d)| (*id, &d.value))
        .collect();

    let mut value = LogicVec::all_z(width);
    for bit in 0..width {
        let resolved = match policy {
            Resolution::StrongestWins => strongest_bit(&strongest, bit)?,
            Resolution::Ieee1164 => strongest
                .iter()
                .fold(Logic::Z, |acc, (_, v)| acc.resolve(v.get(bit))),
            Resolution::WiredAnd => wired_bit(&strongest, bit, |a, b| a & b),
            Resolution::WiredOr => wired_bit(&strongest, bit, |a, b| a | b),
        };
        value.set(bit, resolved);
    }

    Ok(Resolved {
        value,
        strength: max,
    })
}

fn strongest_bit(drivers: &[(DriverId, &LogicVec)], bit: u32) -> Result<Logic, ResolveConflict> {
    let mut held: Option<(DriverId, Logic)> = None;
    for &(id, value) in drivers {
        let b = value.get(bit);
        if b == Logic::Z {
            continue;
        }
        match held {
            None => held = Some((id, b)),
            Some((first, v)) if v != b => {
                return Err(ResolveConflict {
                    first,
                    second: id,
                    bit,
                })
            }
            Some(_) => {}
        }
    }
    Ok(held.map_or(Logic::Z, |(_, v)| v))
}

fn wired_bit(drivers: &[(DriverId, &LogicVec)], bit: u32, op: fn(Logic, Logic) -> Logic) -> Logic {
    drivers
        .iter()
        .map(|(_, v)| v.get(bit))
        .filter(|b| *b != Logic::Z)
        .reduce(op)
        .unwrap_or(Logic::Z)
}
