//! The per-scenario state machine.
//!
//! ```text
//! Idle -> Resetting -> Driving -> Draining -> Comparing -> Pass
//!             |           |          |            |
//!             +-----------+----------+------------+-----> Fail
//! ```
//!
//! Each run owns a fresh [`SimKernel`]. Reset must finish within a few
//! cycles of its pulse length. Driving and draining share the scenario's
//! cycle budget: a driver stall aborts the run with a protocol stall, and a
//! budget overrun while waiting for output is a timeout. Comparing runs on
//! the captured data only, after the kernel has stopped.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use wavesense_bfm::{BackpressureController, ReadyPolicy, StreamDriver, StreamMonitor};
use wavesense_sim::{open_vcd, SimConfig, SimKernel};

use crate::report::{Failure, Outcome, ScenarioReport, State, Transition};
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::ScenarioSettings;

/// Run-wide options shared by every scenario.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOptions {
    /// Kernel parameters.
    pub sim: SimConfig,
    /// Directory for `<scenario>.vcd` dumps; no dump when `None`.
    pub waveform_dir: Option<PathBuf>,
}

/// Cycles allowed on top of the reset pulse for the reset task to finish.
const RESET_SLACK: u64 = 4;

struct RunRecord {
    trace: Vec<Transition>,
    input_transactions: u64,
    output_transactions: u64,
    output_frames: usize,
    waveform: Option<PathBuf>,
    cycles: u64,
}

impl RunRecord {
    fn enter(&mut self, scenario: &str, state: State, cycle: u64) {
        debug!(scenario, %state, cycle, "state transition");
        self.trace.push(Transition { state, cycle });
        self.cycles = cycle;
    }
}

/// Runs `scenario` to a terminal state.
///
/// Never panics on DUT or harness faults: every failure, including kernel
/// errors, ends up in the report's [`Outcome`].
pub fn run_scenario(
    scenario: &dyn Scenario,
    settings: &ScenarioSettings,
    options: &RunOptions,
) -> ScenarioReport {
    let name = scenario.name();
    info!(scenario = name, seed = settings.seed, "scenario started");
    let mut record = RunRecord {
        trace: Vec::new(),
        input_transactions: 0,
        output_transactions: 0,
        output_frames: 0,
        waveform: None,
        cycles: 0,
    };
    record.enter(name, State::Idle, 0);

    let outcome = match execute(scenario, settings, options, &mut record) {
        Ok(()) => {
            record.enter(name, State::Pass, record.cycles);
            info!(scenario = name, cycles = record.cycles, "scenario passed");
            Outcome::Pass
        }
        Err(failure) => {
            record.enter(name, State::Fail, record.cycles);
            warn!(scenario = name, cycles = record.cycles, %failure, "scenario failed");
            Outcome::Fail { failure }
        }
    };

    ScenarioReport {
        scenario: name.to_string(),
        seed: settings.seed,
        outcome,
        trace: record.trace,
        cycles: record.cycles,
        input_transactions: record.input_transactions,
        output_transactions: record.output_transactions,
        output_frames: record.output_frames,
        waveform: record.waveform,
    }
}

fn execute(
    scenario: &dyn Scenario,
    settings: &ScenarioSettings,
    options: &RunOptions,
    record: &mut RunRecord,
) -> Result<(), Failure> {
    let name = scenario.name();
    let plan = scenario.plan(settings)?;
    let input = scenario.input();
    let output = scenario.output();

    let mut kernel = SimKernel::new(scenario.dut(settings), &options.sim)?;
    if let Some(dir) = &options.waveform_dir {
        let path = waveform_path(dir, name)?;
        kernel.set_recorder(open_vcd(&path)?)?;
        record.waveform = Some(path);
    }
    let sim = kernel.handle();
    let input_monitor = StreamMonitor::attach(&sim, &input)?;
    let output_monitor = StreamMonitor::attach(&sim, &output)?;
    let backpressure = match &output.ready {
        Some(ready) => Some(BackpressureController::attach(&sim, ready, ReadyPolicy::Always)?),
        None => None,
    };

    // Whatever happens next, the counters in the report reflect the capture.
    let result = drive_and_drain(
        &mut kernel,
        scenario,
        settings,
        &plan,
        &input_monitor,
        &output_monitor,
        backpressure.as_ref(),
        record,
    );
    record.input_transactions = input_monitor.transactions();
    record.output_transactions = output_monitor.transactions();
    record.output_frames = output_monitor.frame_log().closed().len();
    record.cycles = kernel.cycle();
    let flushed = kernel.finish();
    let accepted = result?;
    flushed?;

    record.enter(name, State::Comparing, kernel.cycle());
    let expected = plan.expected;
    count_check("input transactions", expected.input_transactions, record.input_transactions)?;
    count_check("driver accepted beats", record.input_transactions, accepted)?;
    count_check("output transactions", expected.output_transactions, record.output_transactions)?;
    if let Some(frames) = expected.output_frames {
        count_check("output frames", frames as u64, record.output_frames as u64)?;
    }

    let observed = Observed {
        input: input_monitor.beats(),
        output: output_monitor.frame_log(),
    };
    scenario.check(&plan, &observed, settings)
}

/// Resets, drives, and drains; returns the driver's accepted-beat count.
#[allow(clippy::too_many_arguments)]
fn drive_and_drain(
    kernel: &mut SimKernel,
    scenario: &dyn Scenario,
    settings: &ScenarioSettings,
    plan: &Plan,
    input_monitor: &StreamMonitor,
    output_monitor: &StreamMonitor,
    backpressure: Option<&BackpressureController>,
    record: &mut RunRecord,
) -> Result<u64, Failure> {
    let name = scenario.name();
    let sim = kernel.handle();

    record.enter(name, State::Resetting, kernel.cycle());
    let reset = scenario.reset();
    let pulse = reset.spawn(&sim)?;
    kernel.run_until_complete(&pulse, reset.cycles + RESET_SLACK)?;

    record.enter(name, State::Driving, kernel.cycle());
    if let Some(controller) = backpressure {
        controller.set_policy(settings.backpressure.clone())?;
    }
    let driver = StreamDriver::new(&sim, &scenario.input(), settings.driver_config())?;
    let accepted = driver.accepted();
    let driving = driver.spawn(plan.descriptors.clone());
    let driven_for = kernel.run_until_complete(&driving, settings.cycle_budget)?;
    debug!(
        scenario = name,
        cycles = driven_for,
        accepted = accepted.get(),
        seen = input_monitor.transactions(),
        "stimulus complete"
    );

    record.enter(name, State::Draining, kernel.cycle());
    let remaining = settings.cycle_budget.saturating_sub(driven_for);
    let expected_output = plan.expected.output_transactions;
    kernel.run_until(remaining, &format!("{expected_output} {} beats", output_monitor.name()), |_| {
        output_monitor.transactions() >= expected_output
    })?;
    kernel.run_cycles(settings.drain_cycles)?;
    Ok(accepted.get())
}

fn waveform_path(dir: &Path, scenario: &str) -> Result<PathBuf, Failure> {
    std::fs::create_dir_all(dir).map_err(|e| Failure::Simulation {
        message: format!("cannot create {}: {e}", dir.display()),
    })?;
    Ok(dir.join(format!("{scenario}.vcd")))
}

fn count_check(what: &str, expected: u64, actual: u64) -> Result<(), Failure> {
    if expected == actual {
        Ok(())
    } else {
        Err(Failure::CountMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}
