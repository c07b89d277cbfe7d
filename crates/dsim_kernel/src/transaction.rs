//! Pending signal updates posted by processes or the host.

use dsim_common::LogicVec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::process::ProcessId;
use crate::resolve::DriveStrength;
use crate::signal::SimSignalId;

/// The source of a transaction.
///
/// Every process owns exactly one driver per signal it assigns. Stimulus
/// injected by the host through [`SimKernel::schedule_event`] uses the single
/// [`DriverId::External`] driver.
///
/// [`SimKernel::schedule_event`]: crate::SimKernel::schedule_event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DriverId {
    /// The host testbench.
    External,
    /// A registered process.
    Process(ProcessId),
}

impl DriverId {
    /// Returns the process behind this driver, if any.
    pub fn process(self) -> Option<ProcessId> {
        match self {
            DriverId::Process(p) => Some(p),
            DriverId::External => None,
        }
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverId::External => write!(f, "external"),
            DriverId::Process(p) => write!(f, "process #{}", p.as_raw()),
        }
    }
}

/// When a transaction takes effect relative to the slot that posted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delay {
    /// Commit within the current slot. Readers activated later in the same
    /// slot observe the new value.
    Fast,
    /// Commit at delta `current + 1 + n` of the current logical time.
    Delta(u32),
    /// Commit at `now + n` femtoseconds, delta 0. Zero means the next delta.
    After(u64),
}

impl Delay {
    /// Maps `After(0)` onto `Delta(0)`, leaving every other delay untouched.
    pub fn normalized(self) -> Self {
        match self {
            Delay::After(0) => Delay::Delta(0),
            other => other,
        }
    }
}

/// A pending update of one driver's contribution to one signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    /// Who is driving.
    pub driver: DriverId,
    /// The target signal.
    pub signal: SimSignalId,
    /// The new contribution, or `None` to disconnect the driver.
    pub value: Option<LogicVec>,
    /// Lowest bit written when the transaction targets a slice.
    pub low: Option<u32>,
    /// Drive strength of the contribution.
    pub strength: DriveStrength,
    /// When the transaction commits.
    pub delay: Delay,
}

impl Transaction {
    /// A fast, strong, full-width assignment.
    pub fn new(driver: DriverId, signal: SimSignalId, value: LogicVec) -> Self {
        Self {
            driver,
            signal,
            value: Some(value),
            low: None,
            strength: DriveStrength::Strong,
            delay: Delay::Fast,
        }
    }

    /// Removes `driver` from the signal's driver table.
    pub fn disconnect(driver: DriverId, signal: SimSignalId) -> Self {
        Self {
            driver,
            signal,
            value: None,
            low: None,
            strength: DriveStrength::HighImpedance,
            delay: Delay::Fast,
        }
    }

    /// Sets the commit delay.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the drive strength.
    pub fn with_strength(mut self, strength: DriveStrength) -> Self {
        self.strength = strength;
        self
    }

    /// Targets the bits starting at `low` instead of the whole signal.
    pub fn with_slice(mut self, low: u32) -> Self {
        self.low = Some(low);
        self
    }

    /// Returns `true` if this transaction removes its driver.
    pub fn is_disconnect(&self) -> bool {
        self.value.is_none()
    }
}
