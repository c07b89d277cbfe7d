//! Processes: behavior bodies, their sensitivity, and the registry that
//! wakes them.
//!
//! A process body is opaque to the kernel. It is handed a
//! [`ProcessContext`] for the duration of one activation, reads signals
//! through it, posts transactions, and returns. The registry guarantees a
//! process is never woken while it is still running, and that a process is
//! queued at most once per slot no matter how many of its signals changed.

use dsim_common::{Arena, ArenaId, Ident, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::context::ProcessContext;
use crate::error::SimError;
use crate::signal::SimSignalId;

/// Opaque ID for a registered process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a `ProcessId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for ProcessId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// The behavior of a process.
///
/// Bodies run to completion on every wakeup. Anything a body wants to
/// change goes through `ctx` and becomes visible only after it returns.
pub trait ProcessBody {
    /// Runs one activation.
    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError>;
}

impl<F> ProcessBody for F
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError>,
{
    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
        self(ctx)
    }
}

/// Why a process was woken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WakeCause {
    /// The initialization run at time zero.
    Init,
    /// A signal in the sensitivity list changed.
    Signal,
    /// A `wait_for` timeout expired.
    Timer,
    /// Logical time advanced.
    TimeAdvance,
}

impl fmt::Display for WakeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WakeCause::Init => "init",
            WakeCause::Signal => "signal",
            WakeCause::Timer => "timer",
            WakeCause::TimeAdvance => "time advance",
        };
        f.write_str(s)
    }
}

/// Scheduling state of a process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Waiting for a signal change, a timer, or time to advance.
    #[default]
    Idle,
    /// A wakeup is in the queue.
    Scheduled,
    /// The body is executing.
    Running,
}

/// A registered process.
pub struct ProcessEntry {
    /// Interned hierarchical name.
    pub name: Ident,
    /// Signals whose changes wake this process.
    pub sensitivity: Vec<SimSignalId>,
    /// Whether the process wakes whenever logical time advances.
    pub on_time_advance: bool,
    /// Current scheduling state.
    pub state: ProcessState,
    /// Last source line the body reported.
    pub line: Option<u32>,
    /// Number of completed activations.
    pub activations: u64,
    body: Option<Box<dyn ProcessBody>>,
    queued_at: Option<SimTime>,
    timer: Option<SimTime>,
}

impl fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("name", &self.name)
            .field("sensitivity", &self.sensitivity)
            .field("on_time_advance", &self.on_time_advance)
            .field("state", &self.state)
            .field("line", &self.line)
            .field("activations", &self.activations)
            .finish_non_exhaustive()
    }
}

/// Owns every process, addressed by [`ProcessId`].
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: Arena<ProcessId, ProcessEntry>,
    by_name: HashMap<Ident, ProcessId>,
}

impl ProcessRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a process. Returns `None` if the name is already taken.
    pub fn register(
        &mut self,
        name: Ident,
        sensitivity: Vec<SimSignalId>,
        on_time_advance: bool,
        body: Box<dyn ProcessBody>,
    ) -> Option<ProcessId> {
        if self.by_name.contains_key(&name) {
            return None;
        }
        let id = self.processes.alloc(ProcessEntry {
            name,
            sensitivity,
            on_time_advance,
            state: ProcessState::Idle,
            line: None,
            activations: 0,
            body: Some(body),
            queued_at: None,
            timer: None,
        });
        self.by_name.insert(name, id);
        Some(id)
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` if no process is registered.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Returns a process entry.
    pub fn get(&self, id: ProcessId) -> Option<&ProcessEntry> {
        self.processes.try_get(id)
    }

    /// Looks up a process by interned name.
    pub fn lookup(&self, name: Ident) -> Option<ProcessId> {
        self.by_name.get(&name).copied()
    }

    /// Iterates over all processes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ProcessId, &ProcessEntry)> {
        self.processes.iter()
    }

    /// Marks `id` as queued for `slot`.
    ///
    /// Returns `false` if the process already has a wakeup pending for that
    /// slot (queued or timed), in which case no new event is needed.
    pub(crate) fn mark_queued(&mut self, id: ProcessId, slot: SimTime) -> bool {
        let Some(entry) = self.processes.try_get_mut(id) else {
            return false;
        };
        if entry.queued_at == Some(slot) || entry.timer == Some(slot) {
            return false;
        }
        entry.queued_at = Some(slot);
        if entry.state == ProcessState::Idle {
            entry.state = ProcessState::Scheduled;
        }
        true
    }

    /// Arms the process timer. A later call replaces an earlier one.
    pub(crate) fn arm_timer(&mut self, id: ProcessId, at: SimTime) {
        if let Some(entry) = self.processes.try_get_mut(id) {
            entry.timer = Some(at);
        }
    }

    /// Decides whether a popped wakeup should run.
    ///
    /// Timer wakeups that no longer match the armed timer are stale and are
    /// dropped. Any other wakeup consumes the queued mark so that a change
    /// later in the same slot can queue the process again.
    pub(crate) fn accept(&mut self, id: ProcessId, slot: SimTime, cause: WakeCause) -> bool {
        let Some(entry) = self.processes.try_get_mut(id) else {
            return false;
        };
        match cause {
            WakeCause::Timer => {
                if entry.timer != Some(slot) {
                    return false;
                }
                entry.timer = None;
            }
            _ => {
                if entry.queued_at == Some(slot) {
                    entry.queued_at = None;
                }
            }
        }
        true
    }

    /// Runs the body of `id` exactly once with `ctx`.
    pub fn wake(&mut self, id: ProcessId, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
        let entry = self
            .processes
            .try_get_mut(id)
            .ok_or_else(|| ctx.reentrant())?;
        let Some(mut body) = entry.body.take() else {
            return Err(ctx.reentrant());
        };
        entry.state = ProcessState::Running;

        let result = body.run(ctx);

        let entry = &mut self.processes[id];
        entry.body = Some(body);
        entry.activations += 1;
        entry.state = if entry.queued_at.is_some() {
            ProcessState::Scheduled
        } else {
            ProcessState::Idle
        };
        result
    }

    pub(crate) fn set_line(&mut self, id: ProcessId, line: Option<u32>) {
        if let (Some(entry), Some(line)) = (self.processes.try_get_mut(id), line) {
            entry.line = Some(line);
        }
    }
}
