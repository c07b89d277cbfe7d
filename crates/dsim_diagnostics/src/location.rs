//! Where in a simulation run a diagnostic was raised.

use dsim_common::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The simulation context of a diagnostic.
///
/// Only `time` is mandatory; elaboration-time diagnostics use time zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimLocation {
    /// Logical time and delta index.
    pub time: SimTime,
    /// Name of the process involved, if any.
    pub process: Option<String>,
    /// Name of the signal involved, if any.
    pub signal: Option<String>,
    /// Last source line reported by the process before the failure.
    pub line: Option<u32>,
}

impl SimLocation {
    /// A location carrying only a time.
    pub fn at(time: SimTime) -> Self {
        Self {
            time,
            process: None,
            signal: None,
            line: None,
        }
    }

    /// Sets the process name.
    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Sets the signal name.
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Sets the source line.
    pub fn with_line(mut self, line: Option<u32>) -> Self {
        self.line = line;
        self
    }
}

impl fmt::Display for SimLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.time)?;
        if let Some(p) = &self.process {
            write!(f, ", process '{p}'")?;
            if let Some(line) = self.line {
                write!(f, " (line {line})")?;
            }
        }
        if let Some(s) = &self.signal {
            write!(f, ", signal '{s}'")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_full() {
        let loc = SimLocation::at(SimTime::at_delta(10_000_000, 1))
            .with_process("adsampler.p_1")
            .with_signal("data_reg")
            .with_line(Some(45));
        assert_eq!(
            loc.to_string(),
            "at 10 ns+d1, process 'adsampler.p_1' (line 45), signal 'data_reg'"
        );
    }

    #[test]
    fn display_time_only() {
        assert_eq!(SimLocation::at(SimTime::zero()).to_string(), "at 0 fs+d0");
    }
}
