//! Failure paths: stalls, timeouts, count and data mismatches.

use std::path::Path;

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_config::{load_config_from_str, WavesenseConfig};
use wavesense_harness::models::{DelayLine, OutputBeat, StreamKernel, StreamStage};
use wavesense_harness::{
    run_scenario, run_scenarios, Failure, Observed, Plan, RunOptions, Scenario, ScenarioDefaults,
    ScenarioSettings, Selection, State, Verdict,
};
use wavesense_sim::{Dut, SimError};

fn run_one(config: &str, name: &str) -> wavesense_harness::ScenarioReport {
    let config = load_config_from_str(config).unwrap();
    let mut reports = run_scenarios(
        &config,
        Path::new("."),
        &Selection {
            names: vec![name.into()],
            ..Selection::default()
        },
    )
    .unwrap();
    reports.remove(0)
}

#[test]
fn blocked_output_stalls_the_driver() {
    let report = run_one(
        r#"
[scenarios.delay_line]
stall_budget = 50

[scenarios.delay_line.backpressure]
policy = "scripted"
windows = [{ ready = false, cycles = 5000 }]
"#,
        "delay_line",
    );
    assert_eq!(
        report.failure(),
        Some(&Failure::ProtocolStall {
            interface: "s00_axis".into(),
            cycles: 50
        })
    );
    assert_eq!(report.trace.last().map(|t| t.state), Some(State::Fail));
    assert!(report.trace.iter().all(|t| t.state != State::Comparing));
    // Sixteen in the line plus a full output queue.
    assert_eq!(report.input_transactions, 20);
    assert_eq!(report.output_transactions, 0);
}

#[test]
fn small_budget_times_out() {
    let report = run_one("[scenarios.fir_decimator]\ncycle_budget = 100\n", "fir_decimator");
    match report.failure() {
        Some(Failure::Timeout { cycles, waiting_for }) => {
            assert_eq!(*cycles, 100);
            assert!(waiting_for.contains("driver"), "{waiting_for}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    let states: Vec<State> = report.trace.iter().map(|t| t.state).collect();
    assert_eq!(states, vec![State::Idle, State::Resetting, State::Driving, State::Fail]);
}

/// Delay line whose check expects one output fewer than the device makes.
struct OffByOne;

impl Scenario for OffByOne {
    fn name(&self) -> &str {
        "off_by_one"
    }

    fn summary(&self) -> &str {
        "expects one output too few"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults::default()
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(DelayLine::new(4)))
    }

    fn input(&self) -> StreamInterface {
        DelayLine::new(4).input()
    }

    fn output(&self) -> StreamInterface {
        DelayLine::new(4).output()
    }

    fn plan(&self, _settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let data: Vec<i64> = (0..20).collect();
        Ok(Plan::new(vec![Descriptor::from_columns(&[data.as_slice()], Framing::Never)], 15))
    }

    fn check(
        &self,
        _plan: &Plan,
        _observed: &Observed,
        _settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        Ok(())
    }
}

fn default_settings(scenario: &dyn Scenario) -> ScenarioSettings {
    ScenarioSettings::resolve(
        &scenario.defaults(),
        &WavesenseConfig::default().scenario(scenario.name()),
        1,
        Path::new("."),
    )
    .unwrap()
}

#[test]
fn extra_output_is_a_count_mismatch() {
    let report = run_scenario(&OffByOne, &default_settings(&OffByOne), &RunOptions::default());
    assert_eq!(
        report.failure(),
        Some(&Failure::CountMismatch {
            what: "output transactions".into(),
            expected: 15,
            actual: 16
        })
    );
    assert!(report.trace.iter().any(|t| t.state == State::Comparing));
}

/// Pass-through that flips the low bit of every tenth sample.
struct Flaky {
    seen: u64,
}

impl StreamKernel for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn input(&self) -> StreamInterface {
        DelayLine::new(0).input()
    }

    fn output(&self) -> StreamInterface {
        DelayLine::new(0).output()
    }

    fn reset(&mut self) {
        self.seen = 0;
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        self.seen += 1;
        let flip = if self.seen % 10 == 0 { 1 } else { 0 };
        out.push(OutputBeat::new(vec![fields[0] ^ flip]));
        Ok(())
    }
}

struct FlakyPassThrough;

impl Scenario for FlakyPassThrough {
    fn name(&self) -> &str {
        "flaky_pass_through"
    }

    fn summary(&self) -> &str {
        "corrupts every tenth sample"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults::default()
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(Flaky { seen: 0 }))
    }

    fn input(&self) -> StreamInterface {
        DelayLine::new(0).input()
    }

    fn output(&self) -> StreamInterface {
        DelayLine::new(0).output()
    }

    fn plan(&self, _settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let data: Vec<i64> = (0..100).map(|n| n * 2).collect();
        Ok(Plan::new(vec![Descriptor::from_columns(&[data.as_slice()], Framing::Never)], 100))
    }

    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        _settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let sent: Vec<i64> = plan.beats().into_iter().map(|b| b[0]).collect();
        let mut verdict = Verdict::new();
        verdict.exact("output data", &observed.output_lane(0), &sent);
        verdict.finish()
    }
}

#[test]
fn every_corrupted_sample_is_reported() {
    let report = run_scenario(
        &FlakyPassThrough,
        &default_settings(&FlakyPassThrough),
        &RunOptions::default(),
    );
    match report.failure() {
        Some(Failure::DataMismatch { compared, mismatches }) => {
            assert_eq!(*compared, 100);
            let indices: Vec<usize> = mismatches.iter().map(|m| m.index).collect();
            assert_eq!(indices, (0..10).map(|k| 9 + 10 * k).collect::<Vec<_>>());
            assert_eq!(mismatches[0].expected, "18");
            assert_eq!(mismatches[0].actual, "19");
        }
        other => panic!("expected data mismatch, got {other:?}"),
    }
    assert_eq!(report.output_transactions, 100);
}

#[test]
fn zero_clock_is_rejected_before_running() {
    let err = load_config_from_str("[harness]\nclock = \"0MHz\"\n").unwrap_err();
    assert!(err.to_string().contains("harness.clock"));
}
