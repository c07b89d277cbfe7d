//! Structured diagnostic messages with severity, code, location and notes.

use crate::code::DiagnosticCode;
use crate::location::SimLocation;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Where in the run the issue was detected.
    pub location: Option<SimLocation>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Attaches the simulation location.
    pub fn at(mut self, location: SimLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsim_common::SimTime;

    #[test]
    fn create_error() {
        let diag = Diagnostic::error(DiagnosticCode::error(501), "driver conflict");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "driver conflict");
        assert!(diag.location.is_none());
        assert_eq!(diag.code.to_string(), "E501");
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::warning(DiagnosticCode::warning(501), "never activated")
            .at(SimLocation::at(SimTime::zero()).with_process("idle"))
            .with_note("the process has an empty sensitivity list")
            .with_help("add a sensitivity list or enable the initialization run");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
        assert_eq!(
            diag.location.unwrap().process.as_deref(),
            Some("idle")
        );
    }

    #[test]
    fn serde_roundtrip() {
        let diag = Diagnostic::error(DiagnosticCode::error(502), "unknown signal 'foo_bar'")
            .at(SimLocation::at(SimTime::from_ns(3)).with_signal("foo_bar"));
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, diag.message);
        assert_eq!(back.location, diag.location);
    }
}
