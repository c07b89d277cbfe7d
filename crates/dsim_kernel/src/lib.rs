//! Event-driven VHDL simulation kernel.
//!
//! Implements the delta-cycle semantics of VHDL signal assignment: signals
//! are updated through transactions queued at `(time, delta)` slots, and
//! processes wake when a signal in their sensitivity list changes. Process
//! bodies are opaque Rust code implementing [`ProcessBody`]; the kernel only
//! schedules them.
//!
//! # Usage
//!
//! ```ignore
//! let design = Design::new()
//!     .signal(SignalDecl::bit("clk").init(LogicVec::from_bool(false)))
//!     .signal(SignalDecl::vector("count", 8).init_u64(0))
//!     .process(ProcessDecl::new(
//!         "clkgen",
//!         ClockGenerator::new("clk", "100MHz".parse()?)?.cycles(4),
//!     ))
//!     .process(ProcessDecl::from_fn("counter", |ctx| {
//!         let clk = ctx.signal("clk")?;
//!         let count = ctx.signal("count")?;
//!         if ctx.rising_edge(clk)? {
//!             let next = ctx.read_u64(count)?.unwrap_or(0) + 1;
//!             ctx.assign_delta(count, LogicVec::from_u64(next, 8), 0)?;
//!         }
//!         Ok(())
//!     }).sensitive_to(["clk"]));
//! let report = simulate(design, &SimConfig::default())?;
//! ```

#![warn(missing_docs)]

pub mod builtin;
pub mod context;
pub mod design;
pub mod error;
pub mod kernel;
pub mod observer;
pub mod process;
pub mod queue;
pub mod resolve;
pub mod signal;
pub mod transaction;

pub use builtin::ClockGenerator;
pub use context::ProcessContext;
pub use design::{Design, ProcessDecl, SignalDecl};
pub use error::SimError;
pub use kernel::{RunLimit, RunStatus, SimKernel, StepResult, StopHandle};
pub use observer::{Activity, ActivityLog, SimObserver};
pub use process::{ProcessBody, ProcessId, ProcessState, WakeCause};
pub use resolve::{DriveStrength, Resolution};
pub use signal::{SignalKind, SimSignalId};
pub use transaction::{Delay, DriverId, Transaction};

use dsim_common::SimTime;
use dsim_config::{DiagnosticsConfig, SimConfig};
use dsim_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};

/// Summary of a completed [`simulate`] run.
#[derive(Debug)]
pub struct SimReport {
    /// Why the run stopped.
    pub status: RunStatus,
    /// The last slot processed.
    pub final_time: SimTime,
    /// Total slots processed.
    pub total_deltas: u64,
    /// Total process activations.
    pub total_activations: u64,
    /// Elaboration warnings.
    pub diagnostics: Vec<Diagnostic>,
    /// The activity trace, when `trace.activity` is enabled.
    pub activity: Option<ActivityLog>,
}

impl SimReport {
    /// Renders the collected diagnostics for a terminal.
    pub fn render_diagnostics(&self, config: &DiagnosticsConfig) -> String {
        TerminalRenderer::new(config.color).render_all(&self.diagnostics)
    }
}

/// Elaborates `design` and runs it to the configured time limit, or until
/// it is quiescent when no limit is set.
pub fn simulate(design: Design, config: &SimConfig) -> Result<SimReport, SimError> {
    let mut kernel = SimKernel::with_config(design, &config.run)?;

    let activity = config.trace.activity.then(ActivityLog::new);
    if let Some(log) = &activity {
        kernel.add_observer(Box::new(log.clone()));
    }

    let limit = config
        .run
        .time_limit
        .map_or(RunLimit::Quiescent, RunLimit::Time);
    let status = kernel.run_until(limit)?;

    Ok(SimReport {
        status,
        final_time: kernel.current_time(),
        total_deltas: kernel.total_deltas(),
        total_activations: kernel.total_activations(),
        diagnostics: kernel.diagnostics().take_all(),
        activity,
    })
}
