//! Time-ordered event queue.
//!
//! Events are ordered by `(time, seq)`, where `seq` is a monotonically
//! increasing insertion counter, so events scheduled for the same slot pop
//! in the order they were pushed.

use dsim_common::SimTime;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::process::{ProcessId, WakeCause};
use crate::transaction::Transaction;

/// What happens when an event fires.
#[derive(Clone, Debug)]
pub enum EventPayload {
    /// Commit a transaction to the signal store.
    Apply(Transaction),
    /// Run a process body.
    Wakeup {
        /// The process to run.
        process: ProcessId,
        /// Why it is being woken.
        cause: WakeCause,
    },
}

/// A scheduled event.
#[derive(Clone, Debug)]
pub struct Event {
    /// The slot this event belongs to.
    pub time: SimTime,
    /// Insertion order, used to break ties within a slot.
    pub seq: u64,
    /// What to do.
    pub payload: EventPayload,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `payload` at `time`.
    pub fn push(&mut self, time: SimTime, payload: EventPayload) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event { time, seq, payload }));
    }

    /// Returns the slot of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Removes and returns the earliest event if it belongs to `slot`.
    pub fn pop_due(&mut self, slot: SimTime) -> Option<Event> {
        if self.peek_time()? != slot {
            return None;
        }
        self.heap.pop().map(|Reverse(e)| e)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
