//! The view of the kernel a process body gets during one activation.
//!
//! Reads go straight to the signal store, which cannot change while the body
//! runs. Assignments are validated immediately, so a bad signal or width is
//! reported against the posting process, and are buffered until the body
//! returns.

use dsim_common::{Interner, Logic, LogicVec, SimTime};

use crate::error::SimError;
use crate::process::ProcessId;
use crate::resolve::DriveStrength;
use crate::signal::{ApplyError, SignalStore, SimSignalId};
use crate::transaction::{Delay, DriverId, Transaction};

/// What an activation asked the kernel to do once it returned.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub posted: Vec<Transaction>,
    pub wait_fs: Option<u64>,
    pub finish: bool,
    pub line: Option<u32>,
}

/// Handle passed to [`ProcessBody::run`](crate::ProcessBody::run).
pub struct ProcessContext<'k> {
    store: &'k SignalStore,
    names: &'k Interner,
    process: ProcessId,
    process_name: &'k str,
    now: SimTime,
    effects: Effects,
}

impl<'k> ProcessContext<'k> {
    pub(crate) fn new(
        store: &'k SignalStore,
        names: &'k Interner,
        process: ProcessId,
        process_name: &'k str,
        now: SimTime,
    ) -> Self {
        Self {
            store,
            names,
            process,
            process_name,
            now,
            effects: Effects::default(),
        }
    }

    pub(crate) fn into_effects(self) -> Effects {
        self.effects
    }

    /// The running process.
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// The running process's name.
    pub fn process_name(&self) -> &str {
        self.process_name
    }

    /// The current slot.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Records the source line being executed, for diagnostics.
    pub fn set_line(&mut self, line: u32) {
        self.effects.line = Some(line);
    }

    /// Resolves a signal name.
    pub fn signal(&self, name: &str) -> Result<SimSignalId, SimError> {
        self.names
            .get(name)
            .and_then(|ident| self.store.lookup(ident))
            .ok_or_else(|| self.unknown(name.to_string()))
    }

    /// Reads the current value of a signal.
    pub fn read(&self, signal: SimSignalId) -> Result<&'k LogicVec, SimError> {
        let store: &'k SignalStore = self.store;
        store
            .read(signal)
            .ok_or_else(|| self.unknown(format!("#{}", signal.as_raw())))
    }

    /// Reads bit 0 of a signal.
    pub fn read_bit(&self, signal: SimSignalId) -> Result<Logic, SimError> {
        Ok(self.read(signal)?.get(0))
    }

    /// Reads a signal as an unsigned integer; `None` if any bit is `X` or `Z`.
    pub fn read_u64(&self, signal: SimSignalId) -> Result<Option<u64>, SimError> {
        Ok(self.read(signal)?.to_u64())
    }

    /// Returns `true` if the signal changed in the current slot.
    pub fn event(&self, signal: SimSignalId) -> Result<bool, SimError> {
        self.store
            .get(signal)
            .map(|s| s.event_at(self.now))
            .ok_or_else(|| self.unknown(format!("#{}", signal.as_raw())))
    }

    /// `'0'` to `'1'` transition of bit 0 in the current slot.
    pub fn rising_edge(&self, signal: SimSignalId) -> Result<bool, SimError> {
        self.store
            .rising_edge(signal, self.now)
            .ok_or_else(|| self.unknown(format!("#{}", signal.as_raw())))
    }

    /// `'1'` to `'0'` transition of bit 0 in the current slot.
    pub fn falling_edge(&self, signal: SimSignalId) -> Result<bool, SimError> {
        self.store
            .falling_edge(signal, self.now)
            .ok_or_else(|| self.unknown(format!("#{}", signal.as_raw())))
    }

    /// Assigns a value that later activations in this slot will observe.
    pub fn assign(&mut self, signal: SimSignalId, value: LogicVec) -> Result<(), SimError> {
        self.drive(Transaction::new(self.driver(), signal, value))
    }

    /// Assigns a value that takes effect `offset + 1` delta cycles from now.
    pub fn assign_delta(
        &mut self,
        signal: SimSignalId,
        value: LogicVec,
        offset: u32,
    ) -> Result<(), SimError> {
        self.drive(Transaction::new(self.driver(), signal, value).with_delay(Delay::Delta(offset)))
    }

    /// Assigns a value that takes effect `fs` femtoseconds from now.
    pub fn assign_after(
        &mut self,
        signal: SimSignalId,
        value: LogicVec,
        fs: u64,
    ) -> Result<(), SimError> {
        self.drive(Transaction::new(self.driver(), signal, value).with_delay(Delay::After(fs)))
    }

    /// Assigns `value` to the bits of `signal` starting at `low`.
    pub fn assign_slice(
        &mut self,
        signal: SimSignalId,
        low: u32,
        value: LogicVec,
        delay: Delay,
    ) -> Result<(), SimError> {
        self.drive(
            Transaction::new(self.driver(), signal, value)
                .with_slice(low)
                .with_delay(delay),
        )
    }

    /// Assigns with an explicit drive strength.
    pub fn assign_with_strength(
        &mut self,
        signal: SimSignalId,
        value: LogicVec,
        strength: DriveStrength,
        delay: Delay,
    ) -> Result<(), SimError> {
        self.drive(
            Transaction::new(self.driver(), signal, value)
                .with_strength(strength)
                .with_delay(delay),
        )
    }

    /// Removes this process's driver from a resolved signal.
    pub fn disconnect(&mut self, signal: SimSignalId, delay: Delay) -> Result<(), SimError> {
        self.drive(Transaction::disconnect(self.driver(), signal).with_delay(delay))
    }

    /// Posts a transaction on this process's driver.
    ///
    /// The `driver` field of `txn` is overwritten: a process can only post
    /// on its own driver.
    pub fn drive(&mut self, mut txn: Transaction) -> Result<(), SimError> {
        txn.driver = self.driver();
        self.store.check(&txn).map_err(|e| match e {
            ApplyError::Width { expected, found } => SimError::WidthMismatch {
                signal: self.signal_name(txn.signal),
                expected,
                found,
                referrer: self.process_name.to_string(),
                time: self.now,
            },
            _ => self.unknown(format!("#{}", txn.signal.as_raw())),
        })?;
        self.effects.posted.push(txn);
        Ok(())
    }

    /// Wakes this process again `fs` femtoseconds from now (zero: next delta).
    ///
    /// Calling it twice in one activation keeps the later request.
    pub fn wait_for(&mut self, fs: u64) {
        self.effects.wait_fs = Some(fs);
    }

    /// Ends the simulation once this activation returns.
    pub fn finish(&mut self) {
        self.effects.finish = true;
    }

    /// Fails the run with [`SimError::AssertionFailed`] unless `condition` holds.
    pub fn assert(&self, condition: bool, message: impl Into<String>) -> Result<(), SimError> {
        if condition {
            return Ok(());
        }
        Err(SimError::AssertionFailed {
            process: self.process_name.to_string(),
            time: self.now,
            message: message.into(),
        })
    }

    pub(crate) fn reentrant(&self) -> SimError {
        SimError::ReentrantWakeup {
            process: self.process_name.to_string(),
            process_id: self.process,
            time: self.now,
        }
    }

    fn driver(&self) -> DriverId {
        DriverId::Process(self.process)
    }

    fn signal_name(&self, signal: SimSignalId) -> String {
        match self.store.get(signal) {
            Some(s) => self.names.resolve(s.name).to_string(),
            None => format!("#{}", signal.as_raw()),
        }
    }

    fn unknown(&self, name: String) -> SimError {
        SimError::UnknownSignalReference {
            name,
            referrer: self.process_name.to_string(),
            time: self.now,
        }
    }
}
