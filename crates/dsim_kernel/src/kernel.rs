//! The delta-cycle scheduler.
//!
//! Each call to [`SimKernel::step`] processes one `(time, delta)` slot:
//!
//! 1. Peek the earliest pending slot. An empty queue means the run is
//!    quiescent; a slot at or before the one just processed is a kernel bug.
//! 2. If logical time advances, reset the delta counter and queue the
//!    processes that wake on time advance.
//! 3. Drain every event of the slot in FIFO order. Committing a transaction
//!    queues the processes sensitive to the signal into the same slot;
//!    running a process commits its fast transactions immediately and
//!    buffers the rest.
//! 4. Flush buffered delta transactions into the next delta slots.

use dsim_common::{Interner, LogicVec, SimTime};
use dsim_config::RunConfig;
use dsim_diagnostics::DiagnosticSink;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::ProcessContext;
use crate::design::{elaborate, Design};
use crate::error::SimError;
use crate::observer::SimObserver;
use crate::process::{ProcessEntry, ProcessId, ProcessRegistry, WakeCause};
use crate::queue::{EventPayload, EventQueue};
use crate::signal::{ApplyError, SignalKind, SignalStore, SimSignalId, SimSignalState};
use crate::transaction::{Delay, DriverId, Transaction};

/// How far [`SimKernel::run_until`] may go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunLimit {
    /// Process every slot whose logical time is at most this time.
    Time(SimTime),
    /// Run until nothing is left to do.
    Quiescent,
}

/// Why a run stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// The event queue is empty.
    Quiescent,
    /// The next pending event lies beyond the time limit.
    TimeLimit,
    /// A process called [`ProcessContext::finish`].
    Finished,
    /// The host requested a stop through a [`StopHandle`].
    Stopped,
}

/// Result of a single [`SimKernel::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// A slot was processed and more may follow.
    Continued,
    /// Nothing was processed.
    Done(RunStatus),
}

/// Lets another thread ask a running kernel to stop between slots.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests a stop. The current slot always completes first.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a stop is pending.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// The simulation kernel: signal store, process registry, event queue and
/// the scheduler that drives them.
///
/// Construct via [`SimKernel::new`] from a [`Design`], then call
/// [`run_until`](SimKernel::run_until) or [`step`](SimKernel::step).
///
/// The first fatal error poisons the kernel: it is emitted to the
/// diagnostic sink, and every later run, step, read or schedule call
/// returns [`SimError::Aborted`].
pub struct SimKernel {
    names: Interner,
    store: SignalStore,
    registry: ProcessRegistry,
    queue: EventQueue,
    /// The slot being drained, or the last one drained.
    current_time: SimTime,
    started: bool,
    deltas_at_time: u32,
    max_deltas: u32,
    max_activations: u32,
    slot_activations: u32,
    total_deltas: u64,
    total_activations: u64,
    /// Delta-delayed transactions posted in the current slot.
    slot_pending: Vec<Transaction>,
    /// Signals written by a fast transaction in the current slot, with the
    /// first driver that wrote each one.
    slot_fast: HashMap<SimSignalId, DriverId>,
    time_advance: Vec<ProcessId>,
    observers: Vec<Box<dyn SimObserver>>,
    sink: DiagnosticSink,
    stop: StopHandle,
    finished: bool,
    aborted: bool,
}

impl SimKernel {
    /// Elaborates `design` and queues the initialization run.
    ///
    /// Every process that was not declared `no_init` is woken once at time
    /// zero, delta zero, in declaration order.
    pub fn new(design: Design) -> Result<Self, SimError> {
        let elaborated = elaborate(design)?;

        let sink = DiagnosticSink::new();
        for warning in elaborated.warnings {
            warn!("{}", warning.message);
            sink.emit(warning);
        }

        let time_advance = elaborated
            .registry
            .iter()
            .filter(|(_, p)| p.on_time_advance)
            .map(|(id, _)| id)
            .collect();

        let mut kernel = Self {
            names: elaborated.names,
            store: elaborated.store,
            registry: elaborated.registry,
            queue: EventQueue::new(),
            current_time: SimTime::zero(),
            started: false,
            deltas_at_time: 0,
            max_deltas: dsim_config::DEFAULT_MAX_DELTAS,
            max_activations: dsim_config::DEFAULT_MAX_ACTIVATIONS,
            slot_activations: 0,
            total_deltas: 0,
            total_activations: 0,
            slot_pending: Vec::new(),
            slot_fast: HashMap::new(),
            time_advance,
            observers: Vec::new(),
            sink,
            stop: StopHandle::default(),
            finished: false,
            aborted: false,
        };
        for process in elaborated.init_order {
            kernel.queue_wakeup(process, SimTime::zero(), WakeCause::Init);
        }
        debug!(
            "kernel ready: {} signals, {} processes",
            kernel.store.len(),
            kernel.registry.len()
        );
        Ok(kernel)
    }

    /// Like [`new`](Self::new), with limits taken from `config`.
    pub fn with_config(design: Design, config: &RunConfig) -> Result<Self, SimError> {
        let mut kernel = Self::new(design)?;
        kernel.configure(config);
        Ok(kernel)
    }

    /// Applies the delta and activation limits from `config`.
    pub fn configure(&mut self, config: &RunConfig) {
        self.max_deltas = config.max_deltas;
        self.max_activations = config.max_activations;
    }

    /// Sets the maximum number of delta cycles per logical time.
    pub fn set_max_deltas(&mut self, max: u32) {
        self.max_deltas = max;
    }

    /// Sets the maximum number of activations inside one slot.
    pub fn set_max_activations(&mut self, max: u32) {
        self.max_activations = max;
    }

    /// Attaches an observer. Observers are notified in attachment order.
    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    /// A handle that stops [`run_until`](Self::run_until) between slots.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The slot being processed, or the last one processed.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Total slots processed so far.
    pub fn total_deltas(&self) -> u64 {
        self.total_deltas
    }

    /// Total process activations so far.
    pub fn total_activations(&self) -> u64 {
        self.total_activations
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` once a process has called `finish`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns `true` once a fatal error has poisoned the kernel.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Diagnostics collected so far: elaboration warnings and fatal errors.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Number of signals.
    pub fn signal_count(&self) -> usize {
        self.store.len()
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.registry.len()
    }

    /// Finds a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SimSignalId> {
        self.names.get(name).and_then(|ident| self.store.lookup(ident))
    }

    /// Finds a process by name.
    pub fn find_process(&self, name: &str) -> Option<ProcessId> {
        self.names.get(name).and_then(|ident| self.registry.lookup(ident))
    }

    /// The name of a signal.
    pub fn signal_name(&self, id: SimSignalId) -> Option<&str> {
        self.store.get(id).map(|s| self.names.resolve(s.name))
    }

    /// The full state of a signal.
    pub fn signal(&self, id: SimSignalId) -> Option<&SimSignalState> {
        self.store.get(id)
    }

    /// The registry entry of a process.
    pub fn process(&self, id: ProcessId) -> Option<&ProcessEntry> {
        self.registry.get(id)
    }

    /// Reads the current value of a signal.
    pub fn read(&self, id: SimSignalId) -> Result<&LogicVec, SimError> {
        if self.aborted {
            return Err(SimError::Aborted);
        }
        self.store
            .read(id)
            .ok_or_else(|| self.host_unknown(format!("#{}", id.as_raw())))
    }

    /// Reads the current value of a signal by name.
    pub fn read_by_name(&self, name: &str) -> Result<&LogicVec, SimError> {
        if self.aborted {
            return Err(SimError::Aborted);
        }
        let id = self
            .find_signal(name)
            .ok_or_else(|| self.host_unknown(name.to_string()))?;
        self.read(id)
    }

    /// Schedules external stimulus: `signal` becomes `value` at `time`.
    pub fn schedule_event(
        &mut self,
        time: SimTime,
        signal: SimSignalId,
        value: LogicVec,
    ) -> Result<(), SimError> {
        self.schedule(time, Transaction::new(DriverId::External, signal, value))
    }

    /// Schedules an arbitrary transaction on the external driver at `time`.
    ///
    /// The transaction's own driver and delay are ignored.
    pub fn schedule(&mut self, time: SimTime, mut txn: Transaction) -> Result<(), SimError> {
        if self.aborted {
            return Err(SimError::Aborted);
        }
        if self.started && time <= self.current_time {
            return Err(SimError::ScheduleInPast {
                requested: time,
                now: self.current_time,
            });
        }
        txn.driver = DriverId::External;
        txn.delay = Delay::Fast;
        self.store
            .check(&txn)
            .map_err(|e| self.apply_error(e, &txn))?;
        self.queue.push(time, EventPayload::Apply(txn));
        Ok(())
    }

    /// Processes one slot.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        self.guarded(|kernel| kernel.step_slot(None))
    }

    /// Processes slots until `limit` is reached, the queue runs dry, a
    /// process finishes the run, or the host calls [`StopHandle::stop`].
    pub fn run_until(&mut self, limit: RunLimit) -> Result<RunStatus, SimError> {
        let bound = match limit {
            RunLimit::Time(t) => Some(t.fs),
            RunLimit::Quiescent => None,
        };
        let status = self.guarded(|kernel| loop {
            if kernel.stop.take() {
                return Ok(RunStatus::Stopped);
            }
            if let StepResult::Done(status) = kernel.step_slot(bound)? {
                return Ok(status);
            }
        })?;
        info!(
            "run stopped ({status:?}) at {} after {} deltas",
            self.current_time, self.total_deltas
        );
        Ok(status)
    }

    /// Runs for `duration_fs` femtoseconds of logical time past the current slot.
    pub fn run_for(&mut self, duration_fs: u64) -> Result<RunStatus, SimError> {
        let end = self.current_time.fs.saturating_add(duration_fs);
        self.run_until(RunLimit::Time(SimTime::from_fs(end)))
    }

    /// Runs until the queue is empty or a process finishes the run.
    pub fn run_to_completion(&mut self) -> Result<RunStatus, SimError> {
        self.run_until(RunLimit::Quiescent)
    }

    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SimError>,
    ) -> Result<T, SimError> {
        if self.aborted {
            return Err(SimError::Aborted);
        }
        let result = f(self);
        if let Err(e) = &result {
            self.abort(e);
        }
        result
    }

    fn abort(&mut self, err: &SimError) {
        error!("{err}");
        self.aborted = true;
        self.sink.emit(err.to_diagnostic());
    }

    fn step_slot(&mut self, bound: Option<u64>) -> Result<StepResult, SimError> {
        if self.finished {
            return Ok(StepResult::Done(RunStatus::Finished));
        }
        let Some(next) = self.queue.peek_time() else {
            return Ok(StepResult::Done(RunStatus::Quiescent));
        };
        if self.started && next <= self.current_time {
            return Err(SimError::QueueStarvation {
                time: self.current_time,
                next,
                pending: self.queue.len(),
            });
        }
        if bound.is_some_and(|limit| next.fs > limit) {
            return Ok(StepResult::Done(RunStatus::TimeLimit));
        }

        let slot = if next.fs != self.current_time.fs {
            self.deltas_at_time = 0;
            let slot = SimTime::from_fs(next.fs);
            for i in 0..self.time_advance.len() {
                let process = self.time_advance[i];
                self.queue_wakeup(process, slot, WakeCause::TimeAdvance);
            }
            slot
        } else {
            next
        };

        if self.deltas_at_time >= self.max_deltas {
            return Err(SimError::DeltaCycleLimit {
                time: slot,
                max_deltas: self.max_deltas,
                process: None,
                signal: None,
            });
        }
        self.deltas_at_time += 1;
        self.current_time = slot;
        self.started = true;
        self.slot_activations = 0;

        trace!("enter slot {slot}");
        for observer in &mut self.observers {
            observer.on_slot(slot);
        }

        while let Some(event) = self.queue.pop_due(slot) {
            match event.payload {
                EventPayload::Apply(txn) => self.commit(txn)?,
                EventPayload::Wakeup { process, cause } => self.activate(process, cause)?,
            }
            if self.finished {
                break;
            }
        }

        self.flush_slot()?;
        self.total_deltas += 1;

        Ok(if self.finished {
            StepResult::Done(RunStatus::Finished)
        } else {
            StepResult::Continued
        })
    }

    /// Applies a transaction in the current slot and wakes sensitive processes.
    fn commit(&mut self, txn: Transaction) -> Result<(), SimError> {
        let now = self.current_time;
        let applied = self
            .store
            .apply(&txn, now)
            .map_err(|e| self.apply_error(e, &txn))?;
        if !applied.changed {
            return Ok(());
        }
        let Some(state) = self.store.get(txn.signal) else {
            return Ok(());
        };
        trace!("{} <= {} @ {now}", self.names.resolve(state.name), state.value);
        for observer in &mut self.observers {
            observer.on_change(now, txn.signal, &state.value);
        }
        let sensitive = state.sensitive.clone();
        for process in sensitive {
            self.queue_wakeup(process, now, WakeCause::Signal);
        }
        Ok(())
    }

    fn activate(&mut self, process: ProcessId, cause: WakeCause) -> Result<(), SimError> {
        let now = self.current_time;
        if !self.registry.accept(process, now, cause) {
            trace!("dropping stale {cause} wakeup of {}", self.process_name(process));
            return Ok(());
        }

        self.slot_activations += 1;
        if self.slot_activations > self.max_activations {
            return Err(SimError::ActivationLimit {
                time: now,
                process: self.process_name(process).to_string(),
                max_activations: self.max_activations,
            });
        }

        debug!("wakeup {} ({cause}) at {now}", self.process_name(process));
        for observer in &mut self.observers {
            observer.on_activation_start(now, process, cause);
        }

        let effects = {
            let name = match self.registry.get(process) {
                Some(entry) => self.names.resolve(entry.name),
                None => "<unregistered>",
            };
            let mut ctx = ProcessContext::new(&self.store, &self.names, process, name, now);
            self.registry.wake(process, &mut ctx)?;
            ctx.into_effects()
        };

        for observer in &mut self.observers {
            observer.on_activation_end(now, process);
        }
        self.registry.set_line(process, effects.line);
        self.total_activations += 1;

        for txn in effects.posted {
            match txn.delay.normalized() {
                Delay::Fast => {
                    self.slot_fast.entry(txn.signal).or_insert(txn.driver);
                    self.commit(txn)?;
                }
                Delay::Delta(_) => self.slot_pending.push(txn),
                Delay::After(fs) => self.queue.push(now.after(fs), EventPayload::Apply(txn)),
            }
        }

        if let Some(fs) = effects.wait_fs {
            let at = if fs == 0 {
                self.delta_target(0, DriverId::Process(process), None)?
            } else {
                now.after(fs)
            };
            self.registry.arm_timer(process, at);
            self.queue.push(
                at,
                EventPayload::Wakeup {
                    process,
                    cause: WakeCause::Timer,
                },
            );
        }

        if effects.finish {
            info!("{} finished the run at {now}", self.process_name(process));
            self.finished = true;
        }
        Ok(())
    }

    /// Moves this slot's delta transactions into the queue.
    ///
    /// A fast transaction to a signal in this slot supersedes every delta
    /// transaction to it. On an unresolved signal a superseded transaction
    /// from another driver is a conflict.
    fn flush_slot(&mut self) -> Result<(), SimError> {
        let pending = std::mem::take(&mut self.slot_pending);
        let fast = std::mem::take(&mut self.slot_fast);
        for txn in pending {
            if let Some(&first) = fast.get(&txn.signal) {
                let unresolved = self
                    .store
                    .get(txn.signal)
                    .is_some_and(|state| state.kind == SignalKind::Unresolved);
                if unresolved && first != txn.driver {
                    let conflict = ApplyError::Conflict {
                        first,
                        second: txn.driver,
                    };
                    return Err(self.apply_error(conflict, &txn));
                }
                trace!(
                    "dropping delta transaction on #{} superseded by a fast one",
                    txn.signal.as_raw()
                );
                continue;
            }
            let offset = match txn.delay.normalized() {
                Delay::Delta(n) => n,
                _ => 0,
            };
            let at = self.delta_target(offset, txn.driver, Some(txn.signal))?;
            self.queue.push(at, EventPayload::Apply(txn));
        }
        Ok(())
    }

    /// The slot `offset + 1` deltas after the current one.
    fn delta_target(
        &self,
        offset: u32,
        driver: DriverId,
        signal: Option<SimSignalId>,
    ) -> Result<SimTime, SimError> {
        self.current_time
            .checked_delta_after(offset)
            .ok_or_else(|| SimError::DeltaCycleLimit {
                time: self.current_time,
                max_deltas: self.max_deltas,
                process: Some(self.driver_name(driver)),
                signal: signal
                    .and_then(|id| self.signal_name(id))
                    .map(str::to_string),
            })
    }

    fn queue_wakeup(&mut self, process: ProcessId, slot: SimTime, cause: WakeCause) {
        if self.registry.mark_queued(process, slot) {
            self.queue
                .push(slot, EventPayload::Wakeup { process, cause });
        }
    }

    fn process_name(&self, id: ProcessId) -> &str {
        self.registry
            .get(id)
            .map_or("<unregistered>", |p| self.names.resolve(p.name))
    }

    fn driver_name(&self, driver: DriverId) -> String {
        match driver {
            DriverId::External => "external stimulus".to_string(),
            DriverId::Process(p) => self.process_name(p).to_string(),
        }
    }

    fn host_unknown(&self, name: String) -> SimError {
        SimError::UnknownSignalReference {
            name,
            referrer: "host".to_string(),
            time: self.current_time,
        }
    }

    fn apply_error(&self, err: ApplyError, txn: &Transaction) -> SimError {
        let signal = self
            .signal_name(txn.signal)
            .map_or_else(|| format!("#{}", txn.signal.as_raw()), str::to_string);
        match err {
            ApplyError::UnknownSignal => SimError::UnknownSignalReference {
                name: signal,
                referrer: self.driver_name(txn.driver),
                time: self.current_time,
            },
            ApplyError::Width { expected, found } => SimError::WidthMismatch {
                signal,
                expected,
                found,
                referrer: self.driver_name(txn.driver),
                time: self.current_time,
            },
            ApplyError::Conflict { first, second } => SimError::DriverConflict {
                signal,
                signal_id: txn.signal,
                first: self.driver_name(first),
                second: self.driver_name(second),
                process: second.process(),
                time: self.current_time,
                line: second
                    .process()
                    .and_then(|p| self.registry.get(p))
                    .and_then(|p| p.line),
            },
        }
    }
}
