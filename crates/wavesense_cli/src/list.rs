//! `wavesense list`: prints the scenario catalog.

use tracing::debug;
use wavesense_config::WavesenseConfig;
use wavesense_harness::scenarios;

use crate::{GlobalArgs, EXIT_PASS};

/// Prints one line per scenario: name, summary, and whether the
/// configuration disables it.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, _) = global.load_config()?;
    let lines = catalog_lines(&config);
    debug!(scenarios = lines.len(), "listing catalog");
    for line in lines {
        println!("{line}");
    }
    Ok(EXIT_PASS)
}

fn catalog_lines(config: &WavesenseConfig) -> Vec<String> {
    let catalog = scenarios::catalog();
    let width = catalog.iter().map(|s| s.name().len()).max().unwrap_or(0);
    catalog
        .iter()
        .map(|s| {
            let marker = if config.scenario(s.name()).enabled {
                ""
            } else {
                " (disabled)"
            };
            format!("{:<width$}  {}{marker}", s.name(), s.summary())
        })
        .collect()
}
