//! Simulation error types.
//!
//! Every variant is fatal for the run that produced it. Model errors
//! (`DriverConflict`, `UnknownSignalReference`, `WidthMismatch`, ...) carry
//! enough context to point at the offending process and signal; kernel
//! invariant violations (`ReentrantWakeup`, `QueueStarvation`) indicate a bug
//! in this crate and are never swallowed.

use dsim_common::SimTime;
use dsim_diagnostics::{Diagnostic, DiagnosticCode, SimLocation};

use crate::process::ProcessId;
use crate::signal::SimSignalId;

/// Errors that can occur during elaboration or simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// Two drivers produced contributions that cannot be merged.
    #[error("driver conflict on signal '{signal}' at {time}: '{first}' and '{second}' both drive it")]
    DriverConflict {
        /// Name of the conflicting signal.
        signal: String,
        /// ID of the conflicting signal.
        signal_id: SimSignalId,
        /// The driver that wrote first.
        first: String,
        /// The driver whose transaction triggered the conflict.
        second: String,
        /// The process behind `second`, if it is a process.
        process: Option<ProcessId>,
        /// Slot in which the conflict happened.
        time: SimTime,
        /// Last source line reported by `process`.
        line: Option<u32>,
    },

    /// A sensitivity list, read or assignment named a signal that was never registered.
    #[error("unknown signal '{name}' referenced by {referrer} at {time}")]
    UnknownSignalReference {
        /// The name (or `#id`) that could not be resolved.
        name: String,
        /// Who made the reference (a process name, or "host").
        referrer: String,
        /// When the reference was made; time zero during elaboration.
        time: SimTime,
    },

    /// A value's width does not match the signal or slice it targets.
    #[error("width mismatch on signal '{signal}' from {referrer} at {time}: expected {expected} bits, found {found}")]
    WidthMismatch {
        /// Name of the target signal.
        signal: String,
        /// Expected number of bits.
        expected: u32,
        /// Number of bits supplied.
        found: u32,
        /// Who posted the value.
        referrer: String,
        /// When the value was posted.
        time: SimTime,
    },

    /// Two signals or two processes share one name.
    #[error("duplicate name '{name}' in design")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A signal or process declaration is malformed.
    #[error("invalid declaration of '{name}': {reason}")]
    InvalidDeclaration {
        /// The declared name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The host tried to schedule stimulus into a slot that has already been processed.
    #[error("cannot schedule an event at {requested}: simulation is already at {now}")]
    ScheduleInPast {
        /// The requested slot.
        requested: SimTime,
        /// The current slot.
        now: SimTime,
    },

    /// A process assertion failed.
    #[error("assertion failed in process '{process}' at {time}: {message}")]
    AssertionFailed {
        /// The asserting process.
        process: String,
        /// When the assertion failed.
        time: SimTime,
        /// The assertion message.
        message: String,
    },

    /// A process was woken while its previous activation had not returned.
    #[error("process '{process}' re-entered at {time} before its previous activation returned")]
    ReentrantWakeup {
        /// Name of the process.
        process: String,
        /// ID of the process.
        process_id: ProcessId,
        /// Slot of the offending wakeup.
        time: SimTime,
    },

    /// The queue holds work but none of it is dequeuable from the current slot.
    #[error("event queue starved at {time}: earliest pending event is at {next} ({pending} pending)")]
    QueueStarvation {
        /// The current slot.
        time: SimTime,
        /// The earliest pending slot, which lies in the past.
        next: SimTime,
        /// Number of pending events.
        pending: usize,
    },

    /// Too many delta cycles at a single time step, usually a zero-delay loop.
    #[error("delta cycle limit exceeded at {time} (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The slot where the limit was hit.
        time: SimTime,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
        /// The process whose delta transaction ran past the last delta.
        process: Option<String>,
        /// The signal that transaction targeted.
        signal: Option<String>,
    },

    /// Too many activations inside one slot, usually a fast-transaction loop.
    #[error("activation limit exceeded at {time} by process '{process}' (max {max_activations} per slot)")]
    ActivationLimit {
        /// The slot where the limit was hit.
        time: SimTime,
        /// The process whose activation crossed the limit.
        process: String,
        /// The configured limit.
        max_activations: u32,
    },

    /// The kernel was poisoned by an earlier fatal error.
    #[error("simulation was aborted by an earlier fatal error")]
    Aborted,
}

impl SimError {
    /// Returns `true` for errors that indicate a bug in the kernel itself.
    pub fn is_kernel_bug(&self) -> bool {
        matches!(
            self,
            SimError::ReentrantWakeup { .. } | SimError::QueueStarvation { .. }
        )
    }

    /// Returns the diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::error(match self {
            SimError::DriverConflict { .. } => 501,
            SimError::UnknownSignalReference { .. } => 502,
            SimError::WidthMismatch { .. } => 503,
            SimError::DuplicateName { .. } => 504,
            SimError::InvalidDeclaration { .. } => 505,
            SimError::ScheduleInPast { .. } => 506,
            SimError::AssertionFailed { .. } => 507,
            SimError::DeltaCycleLimit { .. } => 510,
            SimError::ActivationLimit { .. } => 511,
            SimError::ReentrantWakeup { .. } => 590,
            SimError::QueueStarvation { .. } => 591,
            SimError::Aborted => 599,
        })
    }

    /// Converts this error into a structured diagnostic with its location.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            SimError::DriverConflict {
                signal,
                first,
                second,
                process,
                time,
                line,
                ..
            } => {
                let mut loc = SimLocation::at(*time).with_signal(signal.clone());
                if process.is_some() {
                    loc = loc.with_process(second.clone()).with_line(*line);
                }
                diag.at(loc)
                    .with_note(format!(
                        "'{first}' already drove this signal in the same delta cycle"
                    ))
                    .with_help("declare the signal as resolved or drive it from a single process")
            }
            SimError::UnknownSignalReference {
                name,
                referrer,
                time,
            } => diag.at(
                SimLocation::at(*time)
                    .with_process(referrer.clone())
                    .with_signal(name.clone()),
            ),
            SimError::WidthMismatch {
                signal,
                referrer,
                time,
                ..
            } => diag.at(
                SimLocation::at(*time)
                    .with_process(referrer.clone())
                    .with_signal(signal.clone()),
            ),
            SimError::AssertionFailed { process, time, .. }
            | SimError::ActivationLimit { process, time, .. }
            | SimError::ReentrantWakeup { process, time, .. } => {
                diag.at(SimLocation::at(*time).with_process(process.clone()))
            }
            SimError::DeltaCycleLimit {
                time,
                process,
                signal,
                ..
            } => {
                let mut loc = SimLocation::at(*time);
                if let Some(process) = process {
                    loc = loc.with_process(process.clone());
                }
                if let Some(signal) = signal {
                    loc = loc.with_signal(signal.clone());
                }
                diag.at(loc)
                    .with_note("a zero-delay feedback loop keeps scheduling new delta cycles")
            }
            SimError::QueueStarvation { time, .. } | SimError::ScheduleInPast { now: time, .. } => {
                diag.at(SimLocation::at(*time))
            }
            SimError::DuplicateName { .. } | SimError::InvalidDeclaration { .. } => {
                diag.at(SimLocation::at(SimTime::zero()))
            }
            SimError::Aborted => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsim_common::ArenaId;

    fn conflict() -> SimError {
        SimError::DriverConflict {
            signal: "sample".into(),
            signal_id: SimSignalId::from_raw(3),
            first: "tb.writer_a".into(),
            second: "tb.writer_b".into(),
            process: Some(ProcessId::from_raw(1)),
            time: SimTime::from_ns(5),
            line: Some(45),
        }
    }

    #[test]
    fn driver_conflict_display() {
        assert_eq!(
            conflict().to_string(),
            "driver conflict on signal 'sample' at 5 ns+d0: 'tb.writer_a' and 'tb.writer_b' both drive it"
        );
    }

    #[test]
    fn driver_conflict_diagnostic_has_full_context() {
        let diag = conflict().to_diagnostic();
        assert_eq!(diag.code.to_string(), "E501");
        let loc = diag.location.unwrap();
        assert_eq!(loc.time, SimTime::from_ns(5));
        assert_eq!(loc.process.as_deref(), Some("tb.writer_b"));
        assert_eq!(loc.signal.as_deref(), Some("sample"));
        assert_eq!(loc.line, Some(45));
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn unknown_signal_display() {
        let e = SimError::UnknownSignalReference {
            name: "foo_bar".into(),
            referrer: "adsampler.p_0".into(),
            time: SimTime::zero(),
        };
        assert_eq!(
            e.to_string(),
            "unknown signal 'foo_bar' referenced by adsampler.p_0 at 0 fs+d0"
        );
        assert_eq!(e.code().to_string(), "E502");
    }

    #[test]
    fn kernel_bugs_are_classified() {
        let reentrant = SimError::ReentrantWakeup {
            process: "p".into(),
            process_id: ProcessId::from_raw(0),
            time: SimTime::zero(),
        };
        let starved = SimError::QueueStarvation {
            time: SimTime::from_ns(2),
            next: SimTime::from_ns(1),
            pending: 1,
        };
        assert!(reentrant.is_kernel_bug());
        assert!(starved.is_kernel_bug());
        assert!(reentrant.code().is_kernel_bug());
        assert!(starved.code().is_kernel_bug());
        assert!(!conflict().is_kernel_bug());
        assert!(!SimError::Aborted.code().is_kernel_bug());
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            time: SimTime::at_delta(100, 64),
            max_deltas: 64,
            process: None,
            signal: None,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 fs+d64 (max 64 deltas)"
        );
    }
}
