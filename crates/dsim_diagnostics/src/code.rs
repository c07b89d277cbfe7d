//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Errors that abort elaboration or a run, prefixed with `E`.
    Error,
    /// Warnings about the loaded model, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }
}

/// A category prefix plus a number, displayed as e.g. `E501`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Shorthand for an `E` code.
    pub fn error(number: u16) -> Self {
        Self::new(Category::Error, number)
    }

    /// Shorthand for a `W` code.
    pub fn warning(number: u16) -> Self {
        Self::new(Category::Warning, number)
    }

    /// Codes `E590`..`E598` flag kernel invariant violations rather than
    /// problems in the simulated model.
    pub fn is_kernel_bug(self) -> bool {
        self.category == Category::Error && (590..599).contains(&self.number)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::error(501).to_string(), "E501");
        assert_eq!(DiagnosticCode::warning(7).to_string(), "W007");
    }

    #[test]
    fn kernel_bug_range() {
        assert!(DiagnosticCode::error(590).is_kernel_bug());
        assert!(DiagnosticCode::error(591).is_kernel_bug());
        assert!(!DiagnosticCode::error(599).is_kernel_bug());
        assert!(!DiagnosticCode::error(501).is_kernel_bug());
        assert!(!DiagnosticCode::warning(590).is_kernel_bug());
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::error(502);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
