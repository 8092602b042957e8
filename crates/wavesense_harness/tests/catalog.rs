//! Every built-in scenario passes against its behavioral model.

use std::path::Path;

use wavesense_config::{load_config_from_str, WaveformFormat, WavesenseConfig};
use wavesense_harness::scenarios::{catalog, find};
use wavesense_harness::{
    run_scenario, run_scenarios, RunOptions, ScenarioDefaults, ScenarioSettings, Selection, State,
};

fn settings_for(name: &str, seed: u64) -> ScenarioSettings {
    let scenario = find(name).unwrap();
    let config = WavesenseConfig::default();
    let overrides = config.scenario(name);
    ScenarioSettings::resolve(&scenario.defaults(), &overrides, seed, Path::new(".")).unwrap()
}

#[test]
fn all_scenarios_pass() {
    let config = WavesenseConfig::default();
    let reports = run_scenarios(&config, Path::new("."), &Selection::default()).unwrap();
    assert_eq!(reports.len(), catalog().len());
    for report in &reports {
        assert!(report.passed(), "{}: {:?}", report.scenario, report.failure());
    }
}

#[test]
fn pass_trace_walks_every_state() {
    let scenario = find("delay_line").unwrap();
    let report = run_scenario(
        scenario.as_ref(),
        &settings_for("delay_line", 1),
        &RunOptions::default(),
    );
    let states: Vec<State> = report.trace.iter().map(|t| t.state).collect();
    assert_eq!(
        states,
        vec![
            State::Idle,
            State::Resetting,
            State::Driving,
            State::Draining,
            State::Comparing,
            State::Pass
        ]
    );
    assert!(report.trace.windows(2).all(|w| w[0].cycle <= w[1].cycle));
    assert_eq!(report.input_transactions, 80);
    assert_eq!(report.output_transactions, 64);
    // Ready is low for 149 of the first 190 driving cycles.
    assert!(report.cycles > 200);
}

#[test]
fn expected_counts() {
    let reports = run_scenarios(
        &WavesenseConfig::default(),
        Path::new("."),
        &Selection {
            names: vec![
                "fir_decimator".into(),
                "block_fft".into(),
                "lts_xcorr".into(),
                "channel_estimate".into(),
            ],
            ..Selection::default()
        },
    )
    .unwrap();
    let counts: Vec<(u64, u64, usize)> = reports
        .iter()
        .map(|r| (r.input_transactions, r.output_transactions, r.output_frames))
        .collect();
    assert_eq!(
        counts,
        vec![(3017, 500, 0), (256, 256, 4), (500, 469, 0), (256, 104, 2)]
    );
    assert!(reports.iter().all(|r| r.passed()));
}

#[test]
fn long_training_symbols_arrive_as_two_frames() {
    let scenario = find("sync_long").unwrap();
    let report = run_scenario(
        scenario.as_ref(),
        &settings_for("sync_long", 1),
        &RunOptions::default(),
    );
    assert!(report.passed(), "{:?}", report.failure());
    assert_eq!(report.input_transactions, 340);
    assert_eq!(report.output_transactions, 2 * 64);
    assert_eq!(report.output_frames, 2);
    // The scripted windows alone hold ready low for 247 cycles.
    assert!(report.cycles > 391);
}

#[test]
fn runs_are_reproducible_per_seed() {
    let scenario = find("fifo_loopback").unwrap();
    let options = RunOptions::default();
    let a = run_scenario(scenario.as_ref(), &settings_for("fifo_loopback", 7), &options);
    let b = run_scenario(scenario.as_ref(), &settings_for("fifo_loopback", 7), &options);
    let c = run_scenario(scenario.as_ref(), &settings_for("fifo_loopback", 8), &options);
    assert_eq!(a, b);
    assert!(a.passed() && c.passed());
    assert_eq!(c.output_frames, 4);
}

#[test]
fn config_overrides_reach_the_scenario() {
    let config = load_config_from_str(
        r#"
[scenarios.block_fft]
frames = 2
seed = 99

[scenarios.block_fft.backpressure]
policy = "scripted"
windows = [
    { ready = false, cycles = 30 },
    { ready = true, cycles = 5 },
    { ready = false, cycles = 30 },
]
"#,
    )
    .unwrap();
    let reports = run_scenarios(
        &config,
        Path::new("."),
        &Selection {
            names: vec!["block_fft".into()],
            ..Selection::default()
        },
    )
    .unwrap();
    assert_eq!(reports[0].seed, 99);
    assert_eq!(reports[0].output_transactions, 128);
    assert!(reports[0].passed(), "{:?}", reports[0].failure());
}

#[test]
fn vcd_is_written_per_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from_str("[harness]\noutput_dir = \"waves\"\n").unwrap();
    let reports = run_scenarios(
        &config,
        dir.path(),
        &Selection {
            names: vec!["mag_squared".into()],
            waveform: Some(WaveformFormat::Vcd),
            ..Selection::default()
        },
    )
    .unwrap();
    let path = reports[0].waveform.clone().unwrap();
    assert_eq!(path, dir.path().join("waves").join("mag_squared.vcd"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("$timescale 1fs $end"));
    assert!(text.contains("mag_sq_out"));
    assert!(reports[0].passed());
}

#[test]
fn capture_replaces_synthesized_stimulus() {
    use wavesense_common::{IqSample, SampleFile};
    use wavesense_golden::synth::quantized_preamble;

    let dir = tempfile::tempdir().unwrap();
    let mut samples = vec![IqSample::default(); 40];
    samples.extend(quantized_preamble(6000.0));
    samples.extend(vec![IqSample::default(); 40]);
    let bytes = SampleFile::from_samples(samples).to_bytes();
    std::fs::write(dir.path().join("preamble.bin"), bytes).unwrap();
    let config = load_config_from_str(
        r#"
[scenarios.short_preamble.stimulus]
file = "preamble.bin"

[scenarios.lts_xcorr.stimulus]
file = "preamble.bin"
offset = 40
count = 320
"#,
    )
    .unwrap();
    let reports = run_scenarios(
        &config,
        dir.path(),
        &Selection {
            names: vec!["short_preamble".into(), "lts_xcorr".into()],
            ..Selection::default()
        },
    )
    .unwrap();
    assert!(reports.iter().all(|r| r.passed()), "{reports:?}");
    assert_eq!(reports[0].input_transactions, 400);
    assert_eq!(reports[1].input_transactions, 320);
    assert_eq!(reports[1].output_transactions, 320 - 31);
}

#[test]
fn defaults_are_sane() {
    for scenario in catalog() {
        let defaults: ScenarioDefaults = scenario.defaults();
        assert!(defaults.cycle_budget > 0 && defaults.stall_budget > 0, "{}", scenario.name());
    }
}
