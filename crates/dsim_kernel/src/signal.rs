//! Signal state and the store that owns it.
//!
//! Each signal has a flat [`SimSignalId`], a current value, the value it had
//! before its most recent change (for edge detection), and the time of that
//! change. Unresolved signals accept one writer per slot; resolved signals
//! keep a driver table and recompute their value through [`resolve`].

use dsim_common::{Arena, ArenaId, Ident, Logic, LogicVec, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::process::ProcessId;
use crate::resolve::{resolve, DriveStrength, Driver, Resolution};
use crate::transaction::{DriverId, Transaction};

/// Opaque ID for a simulation signal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SimSignalId(u32);

impl SimSignalId {
    /// Creates a `SimSignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for SimSignalId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// Whether a signal accepts more than one driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// At most one driver may write the signal in any slot.
    #[default]
    Unresolved,
    /// Any number of drivers, merged by the given policy.
    Resolved(Resolution),
}

/// The full runtime state of a simulation signal.
#[derive(Clone, Debug)]
pub struct SimSignalState {
    /// Interned hierarchical name.
    pub name: Ident,
    /// Bit width.
    pub width: u32,
    /// Driver policy.
    pub kind: SignalKind,
    /// Value at elaboration.
    pub init: LogicVec,
    /// Current effective value.
    pub value: LogicVec,
    /// Value before the most recent change.
    pub previous_value: LogicVec,
    /// Strength of the current value.
    pub strength: DriveStrength,
    /// Slot of the most recent change, if the signal ever changed.
    pub last_event: Option<SimTime>,
    /// Per-driver contributions (resolved signals only).
    pub drivers: BTreeMap<DriverId, Driver>,
    /// Who wrote an unresolved signal last, and in which slot.
    pub last_writer: Option<(SimTime, DriverId)>,
    /// Processes woken when the value changes.
    pub sensitive: Vec<ProcessId>,
}

impl SimSignalState {
    /// Creates a signal holding `init`.
    pub fn new(name: Ident, kind: SignalKind, init: LogicVec) -> Self {
        Self {
            name,
            width: init.width(),
            kind,
            previous_value: init.clone(),
            value: init.clone(),
            init,
            strength: DriveStrength::Strong,
            last_event: None,
            drivers: BTreeMap::new(),
            last_writer: None,
            sensitive: Vec::new(),
        }
    }

    /// Returns `true` if the signal changed in exactly the slot `now`.
    pub fn event_at(&self, now: SimTime) -> bool {
        self.last_event == Some(now)
    }
}

/// Why a transaction could not be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyError {
    /// The target signal does not exist in this store.
    UnknownSignal,
    /// The contribution does not fit the signal.
    Width {
        /// Width of the signal, or of the remaining bits above a slice's low bit.
        expected: u32,
        /// Width supplied.
        found: u32,
    },
    /// Two drivers wrote incompatible values.
    Conflict {
        /// The driver already holding the signal.
        first: DriverId,
        /// The driver whose transaction was rejected.
        second: DriverId,
    },
}

/// The result of a successful [`SignalStore::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    /// Whether the effective value changed.
    pub changed: bool,
}

/// Owns every signal's state, addressed by [`SimSignalId`].
#[derive(Debug, Default)]
pub struct SignalStore {
    signals: Arena<SimSignalId, SimSignalState>,
    by_name: HashMap<Ident, SimSignalId>,
}

impl SignalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal. Returns `None` if the name is already taken.
    pub fn insert(&mut self, state: SimSignalState) -> Option<SimSignalId> {
        if self.by_name.contains_key(&state.name) {
            return None;
        }
        let name = state.name;
        let id = self.signals.alloc(state);
        self.by_name.insert(name, id);
        Some(id)
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if the store holds no signals.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Looks up a signal by interned name.
    pub fn lookup(&self, name: Ident) -> Option<SimSignalId> {
        self.by_name.get(&name).copied()
    }

    /// Returns the full state of a signal.
    pub fn get(&self, id: SimSignalId) -> Option<&SimSignalState> {
        self.signals.try_get(id)
    }

    pub(crate) fn get_mut(&mut self, id: SimSignalId) -> Option<&mut SimSignalState> {
        self.signals.try_get_mut(id)
    }

    /// Returns the current value of a signal.
    pub fn read(&self, id: SimSignalId) -> Option<&LogicVec> {
        self.get(id).map(|s| &s.value)
    }

    /// Iterates over all signals in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (SimSignalId, &SimSignalState)> {
        self.signals.iter()
    }

    /// Returns `true` if bit 0 of the signal went from `0` to `1` in slot `now`.
    pub fn rising_edge(&self, id: SimSignalId, now: SimTime) -> Option<bool> {
        self.edge(id, now, Logic::Zero, Logic::One)
    }

    /// Returns `true` if bit 0 of the signal went from `1` to `0` in slot `now`.
    pub fn falling_edge(&self, id: SimSignalId, now: SimTime) -> Option<bool> {
        self.edge(id, now, Logic::One, Logic::Zero)
    }

    fn edge(&self, id: SimSignalId, now: SimTime, from: Logic, to: Logic) -> Option<bool> {
        let s = self.get(id)?;
        Some(s.event_at(now) && s.previous_value.get(0) == from && s.value.get(0) == to)
    }

    /// Checks that a transaction targets a known signal with a fitting width.
    pub fn check(&self, txn: &Transaction) -> Result<(), ApplyError> {
        let sig = self.get(txn.signal).ok_or(ApplyError::UnknownSignal)?;
        check_width(sig, txn)
    }

    /// Commits a transaction in slot `now`.
    ///
    /// On a value change the previous value and the event time are updated
    /// before returning; sensitive processes are left for the caller to wake.
    pub fn apply(&mut self, txn: &Transaction, now: SimTime) -> Result<Applied, ApplyError> {
        let sig = self
            .signals
            .try_get_mut(txn.signal)
            .ok_or(ApplyError::UnknownSignal)?;
        check_width(sig, txn)?;

        let next = match sig.kind {
            SignalKind::Unresolved => {
                if let Some((slot, writer)) = sig.last_writer {
                    if slot == now && writer != txn.driver {
                        return Err(ApplyError::Conflict {
                            first: writer,
                            second: txn.driver,
                        });
                    }
                }
                let Some(part) = &txn.value else {
                    // Single-driver signals hold their value on disconnect.
                    return Ok(Applied { changed: false });
                };
                sig.last_writer = Some((now, txn.driver));
                sig.strength = txn.strength;
                merge(&sig.value, txn.low, part)
            }
            SignalKind::Resolved(policy) => {
                match &txn.value {
                    None => {
                        sig.drivers.remove(&txn.driver);
                    }
                    Some(part) => {
                        let base = match sig.drivers.get(&txn.driver) {
                            Some(d) => d.value.clone(),
                            None => LogicVec::all_z(sig.width),
                        };
                        sig.drivers.insert(
                            txn.driver,
                            Driver {
                                value: merge(&base, txn.low, part),
                                strength: txn.strength,
                            },
                        );
                    }
                }
                let resolved = resolve(
                    policy,
                    sig.drivers.iter().map(|(id, d)| (*id, d)),
                    sig.width,
                )
                .map_err(|c| ApplyError::Conflict {
                    first: c.first,
                    second: c.second,
                })?;
                sig.strength = resolved.strength;
                resolved.value
            }
        };

        if next == sig.value {
            return Ok(Applied { changed: false });
        }
        sig.previous_value = std::mem::replace(&mut sig.value, next);
        sig.last_event = Some(now);
        Ok(Applied { changed: true })
    }
}

fn check_width(sig: &SimSignalState, txn: &Transaction) -> Result<(), ApplyError> {
    let Some(value) = &txn.value else {
        return Ok(());
    };
    let found = value.width();
    match txn.low {
        None if found != sig.width => Err(ApplyError::Width {
            expected: sig.width,
            found,
        }),
        Some(low) if low.checked_add(found).map_or(true, |end| end > sig.width) => {
            Err(ApplyError::Width {
                expected: sig.width.saturating_sub(low),
                found,
            })
        }
        _ => Ok(()),
    }
}

fn merge(base: &LogicVec, low: Option<u32>, part: &LogicVec) -> LogicVec {
    match low {
        None => part.clone(),
        Some(low) => {
            let mut out = base.clone();
            out.splice(low, part);
            out
        }
    }
}
