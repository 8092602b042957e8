//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Default filter directive for the given flags.
pub fn default_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        return "error";
    }
    match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr subscriber. `RUST_LOG`, when set, wins over the flags.
pub fn init(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(global)));
    // A second initialization (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(quiet: bool, verbose: u8) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            config: None,
        }
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_level(&global(false, 0)), "warn");
        assert_eq!(default_level(&global(false, 1)), "info");
        assert_eq!(default_level(&global(false, 2)), "debug");
        assert_eq!(default_level(&global(false, 5)), "trace");
        assert_eq!(default_level(&global(true, 3)), "error");
    }
}
