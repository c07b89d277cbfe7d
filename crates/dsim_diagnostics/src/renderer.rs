//! Rendering of diagnostics for terminals and logs.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Formats diagnostics into output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a batch of diagnostics, one after another.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-like terminal format:
///
/// ```text
/// error[E501]: driver conflict on signal 'sample'
///   --> at 5 ns+d0, process 'tb.writer_b', signal 'sample'
///    = note: 'tb.writer_a' already drove this signal in the same delta cycle
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let code = match severity {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
            Severity::Note => "1;36",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        let head = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity, &head),
            diag.message
        ));

        if let Some(loc) = &diag.location {
            out.push_str(&format!("  --> {loc}\n"));
        }
        if diag.code.is_kernel_bug() {
            out.push_str("   = note: this is a simulation kernel bug, not a model error\n");
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;
    use crate::location::SimLocation;
    use dsim_common::SimTime;

    #[test]
    fn render_error_with_location() {
        let location = SimLocation::at(SimTime::from_ns(5))
            .with_process("tb.writer_b")
            .with_signal("sample");
        let diag = Diagnostic::error(
            DiagnosticCode::error(501),
            "driver conflict on signal 'sample'",
        )
        .at(location);
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.starts_with("error[E501]: driver conflict on signal 'sample'\n"));
        assert!(output.contains("--> at 5 ns+d0, process 'tb.writer_b', signal 'sample'"));
    }

    #[test]
    fn render_warning_with_notes() {
        let diag = Diagnostic::warning(DiagnosticCode::warning(501), "process never runs")
            .with_note("empty sensitivity list")
            .with_help("remove `no_init`");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[W501]: process never runs"));
        assert!(output.contains("= note: empty sensitivity list"));
        assert!(output.contains("= help: remove `no_init`"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn kernel_bugs_are_flagged() {
        let diag = Diagnostic::error(DiagnosticCode::error(590), "re-entrant wakeup");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("simulation kernel bug"));
    }

    #[test]
    fn color_wraps_header_only() {
        let diag = Diagnostic::error(DiagnosticCode::error(502), "unknown signal");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror[E502]\x1b[0m: unknown signal"));
    }

    #[test]
    fn render_all_concatenates() {
        let diags = vec![
            Diagnostic::error(DiagnosticCode::error(501), "a"),
            Diagnostic::warning(DiagnosticCode::warning(501), "b"),
        ];
        let output = TerminalRenderer::new(false).render_all(&diags);
        assert_eq!(output.lines().count(), 2);
    }
}
