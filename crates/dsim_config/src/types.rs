//! Configuration types deserialized from `dsim.toml`.

use dsim_common::SimTime;
use serde::{Deserialize, Deserializer};

/// Default guard on delta cycles per logical time step.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;
/// Default guard on process activations within one (time, delta) slot.
pub const DEFAULT_MAX_ACTIVATIONS: u32 = 100_000;

/// The top-level configuration parsed from `dsim.toml`.
///
/// Every section is optional; an empty file yields [`SimConfig::default`].
#[derive(Debug, Default, Deserialize)]
pub struct SimConfig {
    /// Run bounds.
    #[serde(default)]
    pub run: RunConfig,
    /// Activity tracing.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Diagnostic rendering.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Bounds on a single simulation run.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Stop once logical time would pass this point; `None` runs until quiescent.
    #[serde(default, deserialize_with = "deserialize_time")]
    pub time_limit: Option<SimTime>,
    /// Maximum delta cycles at one logical time before the run is aborted.
    #[serde(default = "default_max_deltas")]
    pub max_deltas: u32,
    /// Maximum process activations inside one slot before the run is aborted.
    #[serde(default = "default_max_activations")]
    pub max_activations: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            max_deltas: DEFAULT_MAX_DELTAS,
            max_activations: DEFAULT_MAX_ACTIVATIONS,
        }
    }
}

/// Activity tracing options.
#[derive(Debug, Default, Deserialize)]
pub struct TraceConfig {
    /// Record every slot, value change and activation in an activity log.
    #[serde(default)]
    pub activity: bool,
}

/// Diagnostic rendering options.
#[derive(Debug, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Use ANSI colors when rendering to a terminal.
    #[serde(default)]
    pub color: bool,
}

fn default_max_deltas() -> u32 {
    DEFAULT_MAX_DELTAS
}

fn default_max_activations() -> u32 {
    DEFAULT_MAX_ACTIVATIONS
}

/// Deserializes an optional time string such as `"2 us"` into a [`SimTime`].
fn deserialize_time<'de, D>(deserializer: D) -> Result<Option<SimTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| s.parse::<SimTime>().map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SimConfig::default();
        assert!(config.run.time_limit.is_none());
        assert_eq!(config.run.max_deltas, DEFAULT_MAX_DELTAS);
        assert_eq!(config.run.max_activations, DEFAULT_MAX_ACTIVATIONS);
        assert!(!config.trace.activity);
        assert!(!config.diagnostics.color);
    }

    #[test]
    fn time_limit_units() {
        for (input, fs) in [
            ("\"100 ns\"", 100_000_000),
            ("\"2us\"", 2_000_000_000),
            ("\"750 ps\"", 750_000),
        ] {
            let toml = format!("[run]\ntime_limit = {input}\n");
            let config: SimConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.run.time_limit, Some(SimTime::from_fs(fs)));
        }
    }

    #[test]
    fn bad_time_limit_is_rejected() {
        let result: Result<SimConfig, _> = toml::from_str("[run]\ntime_limit = \"soon\"\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid time"), "unexpected error: {err}");
    }
}
