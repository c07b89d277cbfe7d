//! Ready-made process bodies for common testbench chores.

use dsim_common::{Frequency, LogicVec};

use crate::context::ProcessContext;
use crate::error::SimError;
use crate::process::ProcessBody;
use crate::signal::SimSignalId;

/// Toggles a one-bit signal with a fixed period.
///
/// The first activation drives the signal low; each later one inverts it
/// and waits half a period. With [`ClockGenerator::cycles`] the generator
/// stops after that many full periods, letting the run go quiescent.
#[derive(Clone, Debug)]
pub struct ClockGenerator {
    signal: String,
    half_period_fs: u64,
    cycles: Option<u64>,
    target: Option<SimSignalId>,
    high: bool,
    edges: u64,
}

impl ClockGenerator {
    /// A clock with the given period in femtoseconds.
    pub fn with_period(signal: impl Into<String>, period_fs: u64) -> Result<Self, SimError> {
        let signal = signal.into();
        if period_fs < 2 {
            return Err(SimError::InvalidDeclaration {
                name: signal,
                reason: format!("clock period of {period_fs} fs is too short"),
            });
        }
        Ok(Self {
            signal,
            half_period_fs: period_fs / 2,
            cycles: None,
            target: None,
            high: false,
            edges: 0,
        })
    }

    /// A clock running at `frequency`.
    pub fn new(signal: impl Into<String>, frequency: Frequency) -> Result<Self, SimError> {
        let signal = signal.into();
        match frequency.period_fs() {
            Some(period) => Self::with_period(signal, period),
            None => Err(SimError::InvalidDeclaration {
                name: signal,
                reason: format!("cannot derive a clock period from {frequency}"),
            }),
        }
    }

    /// Stops toggling after `n` full periods.
    pub fn cycles(mut self, n: u64) -> Self {
        self.cycles = Some(n);
        self
    }

    /// Half the clock period in femtoseconds.
    pub fn half_period_fs(&self) -> u64 {
        self.half_period_fs
    }
}

impl ProcessBody for ClockGenerator {
    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
        let target = match self.target {
            Some(id) => id,
            None => {
                let id = ctx.signal(&self.signal)?;
                self.target = Some(id);
                id
            }
        };

        ctx.assign(target, LogicVec::from_bool(self.high))?;
        if self.cycles.is_some_and(|n| self.edges >= n * 2) {
            return Ok(());
        }
        self.high = !self.high;
        self.edges += 1;
        ctx.wait_for(self.half_period_fs);
        Ok(())
    }
}
