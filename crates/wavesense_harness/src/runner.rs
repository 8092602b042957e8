//! Scenario selection and sequential execution.

use std::path::Path;

use tracing::info;
use wavesense_config::{check_scenario_names, ConfigError, WaveformFormat, WavesenseConfig};
use wavesense_sim::SimConfig;

use crate::error::HarnessError;
use crate::orchestrator::{run_scenario, RunOptions};
use crate::report::ScenarioReport;
use crate::scenario::Scenario;
use crate::scenarios;
use crate::settings::ScenarioSettings;

/// Which scenarios to run and run-wide overrides from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Scenario names; every enabled scenario when empty.
    pub names: Vec<String>,
    /// Seed replacing every configured seed.
    pub seed: Option<u64>,
    /// Waveform format replacing the configured one.
    pub waveform: Option<WaveformFormat>,
}

/// Runs the selected scenarios one after another.
///
/// Scenarios named explicitly run even when disabled in the configuration.
/// `base_dir` anchors relative paths from the configuration (captures and
/// the output directory).
pub fn run_scenarios(
    config: &WavesenseConfig,
    base_dir: &Path,
    selection: &Selection,
) -> Result<Vec<ScenarioReport>, HarnessError> {
    let catalog = scenarios::catalog();
    check_scenario_names(config, catalog.iter().map(|s| s.name()))?;
    let selected = select(&catalog, config, &selection.names)?;
    let options = run_options(config, base_dir, selection.waveform)?;
    info!(count = selected.len(), "running scenarios");

    Ok(selected
        .into_iter()
        .map(|scenario| {
            let name = scenario.name();
            let seed = selection.seed.unwrap_or_else(|| config.seed_for(name));
            let overrides = config.scenario(name);
            match ScenarioSettings::resolve(&scenario.defaults(), &overrides, seed, base_dir) {
                Ok(settings) => run_scenario(scenario, &settings, &options),
                Err(failure) => ScenarioReport::not_started(name, seed, failure),
            }
        })
        .collect())
}

fn select<'a>(
    catalog: &'a [Box<dyn Scenario>],
    config: &WavesenseConfig,
    names: &[String],
) -> Result<Vec<&'a dyn Scenario>, HarnessError> {
    if names.is_empty() {
        return Ok(catalog
            .iter()
            .filter(|s| config.scenario(s.name()).enabled)
            .map(|s| s.as_ref())
            .collect());
    }
    names
        .iter()
        .map(|name| {
            catalog
                .iter()
                .find(|s| s.name() == name)
                .map(|s| s.as_ref())
                .ok_or_else(|| HarnessError::UnknownScenario {
                    name: name.clone(),
                    available: scenarios::names().join(", "),
                })
        })
        .collect()
}

/// Kernel and waveform options from the `[harness]` table.
pub fn run_options(
    config: &WavesenseConfig,
    base_dir: &Path,
    waveform: Option<WaveformFormat>,
) -> Result<RunOptions, HarnessError> {
    let clock = config
        .harness
        .clock_frequency()
        .map_err(|e| ConfigError::ValidationError(format!("harness.clock: {e}")))?;
    let waveform_dir = match waveform.unwrap_or(config.harness.waveform) {
        WaveformFormat::Vcd => Some(base_dir.join(&config.harness.output_dir)),
        WaveformFormat::None => None,
    };
    Ok(RunOptions {
        sim: SimConfig {
            clock_period_fs: clock.period_fs(),
            max_deltas: config.harness.max_deltas,
            ..SimConfig::default()
        },
        waveform_dir,
    })
}
