//! Structured diagnostics for simulation failures and elaboration warnings.
//!
//! A [`Diagnostic`] carries a severity, a stable code, a message and, when
//! known, the [`SimLocation`] where it happened: the process, the signal, the
//! logical time with its delta index, and the last source line the process
//! reported. [`DiagnosticSink`] accumulates them for the host;
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod location;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use location::SimLocation;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
