//! Per-scenario settings: built-in defaults merged with config overrides.

use std::path::Path;

use wavesense_bfm::{DriverConfig, IdleGaps, ReadyPolicy, ReadyWindow};
use wavesense_common::{IqSample, SampleFile};
use wavesense_config::{BackpressureConfig, PolicyKind, ScenarioConfig};
use wavesense_golden::Tolerance;

use crate::report::Failure;

/// What a scenario runs with when the configuration says nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDefaults {
    /// Input samples to synthesize.
    pub samples: usize,
    /// Frames or blocks to synthesize.
    pub frames: usize,
    /// Cycles for driving and draining together.
    pub cycle_budget: u64,
    /// Cycles one input beat may wait for `ready`.
    pub stall_budget: u64,
    /// Extra cycles monitored after the expected output count is reached.
    pub drain_cycles: u64,
    /// Downstream `ready` policy.
    pub backpressure: BackpressureConfig,
    /// Comparison tolerance.
    pub tolerance: Tolerance,
    /// Idle insertion as `(probability, max_cycles)`.
    pub idle_gaps: Option<(f64, u32)>,
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            samples: 256,
            frames: 1,
            cycle_budget: 20_000,
            stall_budget: 1_000,
            drain_cycles: 16,
            backpressure: BackpressureConfig {
                policy: PolicyKind::Always,
                p_ready: 1.0,
                windows: Vec::new(),
            },
            tolerance: Tolerance::EXACT,
            idle_gaps: None,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    /// Seed for every randomized choice in the run.
    pub seed: u64,
    /// Input samples to synthesize.
    pub samples: usize,
    /// Frames or blocks to synthesize.
    pub frames: usize,
    /// Cycles for driving and draining together.
    pub cycle_budget: u64,
    /// Cycles one input beat may wait for `ready`.
    pub stall_budget: u64,
    /// Extra cycles monitored after the expected output count is reached.
    pub drain_cycles: u64,
    /// Downstream `ready` policy.
    pub backpressure: ReadyPolicy,
    /// Idle insertion on the input driver.
    pub idle_gaps: Option<IdleGaps>,
    /// Comparison tolerance.
    pub tolerance: Tolerance,
    /// Samples from a capture file, replacing synthesized stimulus.
    pub capture: Option<Vec<IqSample>>,
}

impl ScenarioSettings {
    /// Applies `overrides` on top of `defaults`. Capture paths are resolved
    /// against `base_dir`.
    pub fn resolve(
        defaults: &ScenarioDefaults,
        overrides: &ScenarioConfig,
        seed: u64,
        base_dir: &Path,
    ) -> Result<Self, Failure> {
        let backpressure = overrides.backpressure.as_ref().unwrap_or(&defaults.backpressure);
        let tolerance = overrides
            .tolerance
            .map(|t| Tolerance::new(t.atol, t.rtol))
            .unwrap_or(defaults.tolerance);
        let capture = match &overrides.stimulus {
            Some(stimulus) => {
                let path = base_dir.join(&stimulus.file);
                let file = SampleFile::open(&path).map_err(|e| Failure::Stimulus {
                    message: format!("{}: {e}", path.display()),
                })?;
                let samples = file.slice(stimulus.offset, stimulus.count.unwrap_or(usize::MAX));
                if samples.is_empty() {
                    return Err(Failure::Stimulus {
                        message: format!(
                            "{}: offset {} selects no samples from a {}-sample capture",
                            path.display(),
                            stimulus.offset,
                            file.len()
                        ),
                    });
                }
                Some(samples.to_vec())
            }
            None => None,
        };
        Ok(Self {
            seed,
            samples: overrides.samples.unwrap_or(defaults.samples),
            frames: overrides.frames.unwrap_or(defaults.frames),
            cycle_budget: overrides.cycle_budget.unwrap_or(defaults.cycle_budget),
            stall_budget: overrides.stall_budget.unwrap_or(defaults.stall_budget),
            drain_cycles: overrides.drain_cycles.unwrap_or(defaults.drain_cycles),
            backpressure: ready_policy(backpressure, seed),
            idle_gaps: defaults.idle_gaps.map(|(probability, max_cycles)| IdleGaps {
                probability,
                max_cycles,
                seed: seed.wrapping_add(1),
            }),
            tolerance,
            capture,
        })
    }

    /// Driver settings for the input interface.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            stall_budget: self.stall_budget,
            idle_gaps: self.idle_gaps,
        }
    }
}

fn ready_policy(config: &BackpressureConfig, seed: u64) -> ReadyPolicy {
    match config.policy {
        PolicyKind::Always => ReadyPolicy::Always,
        PolicyKind::Random => ReadyPolicy::Random {
            p_ready: config.p_ready,
            seed,
        },
        PolicyKind::Scripted => ReadyPolicy::Scripted {
            windows: config
                .windows
                .iter()
                .map(|w| ReadyWindow {
                    ready: w.ready,
                    cycles: u64::from(w.cycles),
                })
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavesense_config::{StimulusConfig, ToleranceConfig, WindowConfig};

    #[test]
    fn defaults_apply_without_overrides() {
        let defaults = ScenarioDefaults {
            idle_gaps: Some((0.2, 3)),
            ..ScenarioDefaults::default()
        };
        let s = ScenarioSettings::resolve(&defaults, &ScenarioConfig::default(), 9, Path::new("."))
            .unwrap();
        assert_eq!(s.samples, 256);
        assert_eq!(s.cycle_budget, 20_000);
        assert_eq!(s.backpressure, ReadyPolicy::Always);
        assert_eq!(s.tolerance, Tolerance::EXACT);
        assert_eq!(
            s.idle_gaps,
            Some(IdleGaps {
                probability: 0.2,
                max_cycles: 3,
                seed: 10
            })
        );
        assert!(s.capture.is_none());
        assert_eq!(s.driver_config().stall_budget, 1_000);
    }

    #[test]
    fn overrides_win() {
        let overrides = ScenarioConfig {
            samples: Some(64),
            stall_budget: Some(5),
            tolerance: Some(ToleranceConfig { atol: 2.0, rtol: 0.1 }),
            backpressure: Some(BackpressureConfig {
                policy: PolicyKind::Random,
                p_ready: 0.3,
                windows: Vec::new(),
            }),
            ..ScenarioConfig::default()
        };
        let defaults = ScenarioDefaults::default();
        let s = ScenarioSettings::resolve(&defaults, &overrides, 4, Path::new(".")).unwrap();
        assert_eq!(s.samples, 64);
        assert_eq!(s.stall_budget, 5);
        assert_eq!(s.tolerance, Tolerance::new(2.0, 0.1));
        assert_eq!(s.backpressure, ReadyPolicy::Random { p_ready: 0.3, seed: 4 });
    }

    #[test]
    fn scripted_windows_convert() {
        let config = BackpressureConfig {
            policy: PolicyKind::Scripted,
            p_ready: 0.5,
            windows: vec![WindowConfig { ready: false, cycles: 7 }],
        };
        assert_eq!(
            ready_policy(&config, 0),
            ReadyPolicy::Scripted {
                windows: vec![ReadyWindow::off(7)]
            }
        );
    }

    #[test]
    fn capture_slice_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<IqSample> = (0..10).map(|n| IqSample::new(n, -n)).collect();
        let bytes = SampleFile::from_samples(samples).to_bytes();
        std::fs::write(dir.path().join("cap.bin"), bytes).unwrap();
        let overrides = ScenarioConfig {
            stimulus: Some(StimulusConfig {
                file: "cap.bin".into(),
                offset: 2,
                count: Some(3),
            }),
            ..ScenarioConfig::default()
        };
        let defaults = ScenarioDefaults::default();
        let s = ScenarioSettings::resolve(&defaults, &overrides, 1, dir.path()).unwrap();
        assert_eq!(
            s.capture,
            Some(vec![IqSample::new(2, -2), IqSample::new(3, -3), IqSample::new(4, -4)])
        );
    }

    #[test]
    fn missing_or_empty_capture_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = ScenarioConfig {
            stimulus: Some(StimulusConfig {
                file: "missing.bin".into(),
                offset: 0,
                count: None,
            }),
            ..ScenarioConfig::default()
        };
        let defaults = ScenarioDefaults::default();
        let err = ScenarioSettings::resolve(&defaults, &overrides, 1, dir.path()).unwrap_err();
        assert!(matches!(err, Failure::Stimulus { .. }));

        std::fs::write(dir.path().join("short.bin"), [0u8; 8]).unwrap();
        overrides.stimulus = Some(StimulusConfig {
            file: "short.bin".into(),
            offset: 5,
            count: None,
        });
        let err = ScenarioSettings::resolve(&defaults, &overrides, 1, dir.path()).unwrap_err();
        assert!(err.to_string().contains("selects no samples"));
    }
}
