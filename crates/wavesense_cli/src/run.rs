//! `wavesense run`: executes scenarios and reports verdicts.

use tracing::{debug, info};
use wavesense_config::WaveformFormat;
use wavesense_harness::{run_scenarios, Failure, Outcome, ScenarioReport, Selection, State};

use crate::{GlobalArgs, ReportFormat, RunArgs, WaveformArg, EXIT_FAIL, EXIT_PASS};

/// Mismatches printed per failing scenario in text mode.
const SHOWN_MISMATCHES: usize = 10;

/// Runs the selected scenarios. Returns [`EXIT_FAIL`] when any fails.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, base_dir) = global.load_config()?;
    let selection = Selection {
        names: args.names.clone(),
        seed: args.seed,
        waveform: args.waveform.map(|w| match w {
            WaveformArg::Vcd => WaveformFormat::Vcd,
            WaveformArg::None => WaveformFormat::None,
        }),
    };

    debug!(
        names = ?selection.names,
        seed = ?selection.seed,
        base_dir = %base_dir.display(),
        "running scenarios"
    );
    let reports = run_scenarios(&config, &base_dir, &selection)?;
    let (passed, failed) = log_reports(&reports);

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        ReportFormat::Text => {
            if !global.quiet {
                for report in &reports {
                    for line in report_lines(report) {
                        eprintln!("{line}");
                    }
                }
            }
            if !global.quiet || failed > 0 {
                eprintln!();
                eprintln!("Result: {passed} passed, {failed} failed");
            }
        }
    }

    Ok(exit_code(&reports))
}

/// Emits one event per scenario and a summary; returns `(passed, failed)`.
fn log_reports(reports: &[ScenarioReport]) -> (usize, usize) {
    for report in reports {
        match &report.outcome {
            Outcome::Pass => debug!(
                scenario = %report.scenario,
                cycles = report.cycles,
                seed = report.seed,
                "scenario passed"
            ),
            Outcome::Fail { failure } => info!(
                scenario = %report.scenario,
                state = %failed_in(report),
                seed = report.seed,
                %failure,
                "scenario failed"
            ),
        }
    }
    let passed = reports.iter().filter(|r| r.passed()).count();
    let failed = reports.len() - passed;
    info!(passed, failed, "run finished");
    (passed, failed)
}

fn exit_code(reports: &[ScenarioReport]) -> i32 {
    if reports.iter().all(ScenarioReport::passed) {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}

/// The state the run was in when it failed.
fn failed_in(report: &ScenarioReport) -> State {
    report
        .trace
        .iter()
        .rev()
        .map(|t| t.state)
        .find(|s| !s.is_terminal())
        .unwrap_or(State::Idle)
}

fn report_lines(report: &ScenarioReport) -> Vec<String> {
    let mut lines = Vec::new();
    match &report.outcome {
        Outcome::Pass => lines.push(format!(
            "  PASS {} ({} cycles, {} in / {} out)",
            report.scenario, report.cycles, report.input_transactions, report.output_transactions
        )),
        Outcome::Fail { failure } => {
            lines.push(format!(
                "  FAIL {} in {} after {} cycles (seed {}): {failure}",
                report.scenario,
                failed_in(report),
                report.cycles,
                report.seed
            ));
            if let Failure::DataMismatch { mismatches, .. } = failure {
                lines.extend(
                    mismatches
                        .iter()
                        .take(SHOWN_MISMATCHES)
                        .map(|m| format!("         {m}")),
                );
                if mismatches.len() > SHOWN_MISMATCHES {
                    lines.push(format!(
                        "         ... and {} more",
                        mismatches.len() - SHOWN_MISMATCHES
                    ));
                }
            }
        }
    }
    if let Some(path) = &report.waveform {
        lines.push(format!("         waveform: {}", path.display()));
    }
    lines
}
