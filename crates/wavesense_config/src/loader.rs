//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{PolicyKind, ScenarioConfig, WavesenseConfig};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "wavesense.toml";

/// Loads and validates a configuration file.
///
/// A missing file is not an error: the defaults are returned instead, so a
/// bare `wavesense run` works in any directory.
pub fn load_config(path: &Path) -> Result<WavesenseConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WavesenseConfig::default()),
        Err(e) => return Err(e.into()),
    };
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<WavesenseConfig, ConfigError> {
    let config: WavesenseConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects `[scenarios.<name>]` tables that do not name a known scenario.
pub fn check_scenario_names<'a>(
    config: &WavesenseConfig,
    known: impl IntoIterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let known: Vec<&str> = known.into_iter().collect();
    match config.scenarios.keys().find(|name| !known.contains(&name.as_str())) {
        Some(name) => Err(ConfigError::UnknownScenario(name.clone())),
        None => Ok(()),
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Checks value ranges that serde cannot express.
fn validate_config(config: &WavesenseConfig) -> Result<(), ConfigError> {
    config
        .harness
        .clock_frequency()
        .map_err(|e| invalid(format!("harness.clock: {e}")))?;
    if config.harness.max_deltas == 0 {
        return Err(invalid("harness.max_deltas must be positive"));
    }
    for (name, scenario) in &config.scenarios {
        validate_scenario(name, scenario)?;
    }
    Ok(())
}

fn validate_scenario(name: &str, scenario: &ScenarioConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("cycle_budget", scenario.cycle_budget),
        ("stall_budget", scenario.stall_budget),
    ] {
        if value == Some(0) {
            return Err(invalid(format!("scenarios.{name}.{field} must be positive")));
        }
    }
    if scenario.samples == Some(0) || scenario.frames == Some(0) {
        return Err(invalid(format!(
            "scenarios.{name}: samples and frames must be positive"
        )));
    }
    if let Some(bp) = &scenario.backpressure {
        if !(0.0..=1.0).contains(&bp.p_ready) {
            return Err(invalid(format!(
                "scenarios.{name}.backpressure.p_ready must be within [0, 1], got {}",
                bp.p_ready
            )));
        }
        if bp.policy == PolicyKind::Scripted && bp.windows.is_empty() {
            return Err(invalid(format!(
                "scenarios.{name}.backpressure: scripted policy needs at least one window"
            )));
        }
    }
    if let Some(tol) = &scenario.tolerance {
        if !(tol.atol >= 0.0 && tol.rtol >= 0.0) {
            return Err(invalid(format!(
                "scenarios.{name}.tolerance: atol and rtol must be non-negative"
            )));
        }
    }
    if let Some(stim) = &scenario.stimulus {
        if stim.count == Some(0) {
            return Err(invalid(format!("scenarios.{name}.stimulus.count must be positive")));
        }
    }
    Ok(())
}
