//! Hooks for watching a simulation run.
//!
//! A [`SimObserver`] sees every slot the scheduler enters, every committed
//! value change and every process activation, in kernel order. Observers
//! cannot influence the run. [`ActivityLog`] is the stock implementation;
//! it is cheap to clone so a host can keep a handle after giving one copy to
//! the kernel.

use dsim_common::{LogicVec, SimTime};
use std::sync::{Arc, Mutex, PoisonError};

use crate::process::{ProcessId, WakeCause};
use crate::signal::SimSignalId;

/// Receives notifications from the scheduler.
///
/// Every method has an empty default implementation.
pub trait SimObserver {
    /// The scheduler entered slot `time`.
    fn on_slot(&mut self, _time: SimTime) {}

    /// `signal` changed to `value` in slot `time`.
    fn on_change(&mut self, _time: SimTime, _signal: SimSignalId, _value: &LogicVec) {}

    /// `process` is about to run.
    fn on_activation_start(&mut self, _time: SimTime, _process: ProcessId, _cause: WakeCause) {}

    /// `process` returned.
    fn on_activation_end(&mut self, _time: SimTime, _process: ProcessId) {}
}

/// One entry of an [`ActivityLog`].
#[derive(Clone, Debug, PartialEq)]
pub enum Activity {
    /// A slot was entered.
    Slot(SimTime),
    /// A signal changed.
    Change {
        /// The slot.
        time: SimTime,
        /// The signal.
        signal: SimSignalId,
        /// Its new value.
        value: LogicVec,
    },
    /// A process started running.
    Start {
        /// The slot.
        time: SimTime,
        /// The process.
        process: ProcessId,
        /// Why it was woken.
        cause: WakeCause,
    },
    /// A process returned.
    End {
        /// The slot.
        time: SimTime,
        /// The process.
        process: ProcessId,
    },
}

/// Records every notification in order.
#[derive(Clone, Debug, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<Vec<Activity>>>,
}

impl ActivityLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of all entries.
    pub fn entries(&self) -> Vec<Activity> {
        self.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every slot entered, in order.
    pub fn slots(&self) -> Vec<SimTime> {
        self.lock()
            .iter()
            .filter_map(|a| match a {
                Activity::Slot(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Every activation start, in order.
    pub fn activations(&self) -> Vec<(SimTime, ProcessId)> {
        self.lock()
            .iter()
            .filter_map(|a| match a {
                Activity::Start { time, process, .. } => Some((*time, *process)),
                _ => None,
            })
            .collect()
    }

    /// Every change of `signal`, in order.
    pub fn changes_of(&self, signal: SimSignalId) -> Vec<(SimTime, LogicVec)> {
        self.lock()
            .iter()
            .filter_map(|a| match a {
                Activity::Change {
                    time,
                    signal: s,
                    value,
                } if *s == signal => Some((*time, value.clone())),
                _ => None,
            })
            .collect()
    }

    fn push(&self, activity: Activity) {
        self.lock().push(activity);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Activity>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SimObserver for ActivityLog {
    fn on_slot(&mut self, time: SimTime) {
        self.push(Activity::Slot(time));
    }

    fn on_change(&mut self, time: SimTime, signal: SimSignalId, value: &LogicVec) {
        self.push(Activity::Change {
            time,
            signal,
            value: value.clone(),
        });
    }

    fn on_activation_start(&mut self, time: SimTime, process: ProcessId, cause: WakeCause) {
        self.push(Activity::Start {
            time,
            process,
            cause,
        });
    }

    fn on_activation_end(&mut self, time: SimTime, process: ProcessId) {
        self.push(Activity::End { time, process });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsim_common::ArenaId;

    #[test]
    fn clones_share_entries() {
        let log = ActivityLog::new();
        let mut handle: Box<dyn SimObserver> = Box::new(log.clone());
        let t = SimTime::from_ns(1);
        let p = ProcessId::from_raw(2);
        handle.on_slot(t);
        handle.on_activation_start(t, p, WakeCause::Signal);
        handle.on_change(t, SimSignalId::from_raw(0), &LogicVec::from_bool(true));
        handle.on_activation_end(t, p);

        assert_eq!(log.len(), 4);
        assert_eq!(log.slots(), vec![t]);
        assert_eq!(log.activations(), vec![(t, p)]);
        assert_eq!(
            log.changes_of(SimSignalId::from_raw(0)),
            vec![(t, LogicVec::from_bool(true))]
        );
        assert!(log.changes_of(SimSignalId::from_raw(1)).is_empty());
    }

    #[test]
    fn default_methods_are_noops() {
        struct Quiet;
        impl SimObserver for Quiet {}
        let mut q = Quiet;
        q.on_slot(SimTime::zero());
        q.on_activation_end(SimTime::zero(), ProcessId::from_raw(0));
    }
}
