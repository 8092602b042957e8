//! Errors that prevent scenarios from running at all.
//!
//! A scenario that runs and fails is not an error: its [`Failure`] is part
//! of the [`ScenarioReport`]. These are raised before any kernel exists.
//!
//! [`Failure`]: crate::report::Failure
//! [`ScenarioReport`]: crate::report::ScenarioReport

use wavesense_config::ConfigError;

/// Errors raised while selecting scenarios.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A requested scenario is not in the catalog.
    #[error("unknown scenario '{name}' (available: {available})")]
    UnknownScenario {
        /// The requested name.
        name: String,
        /// Comma-separated catalog names.
        available: String,
    },

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
