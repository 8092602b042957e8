//! Synchronous reset sequencing.

use tracing::debug;
use wavesense_sim::{JoinHandle, SignalId, SimError, SimHandle, TaskResult};

/// Which reset signal to pulse, for how long, and with which polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSpec {
    /// Reset signal name.
    pub signal: String,
    /// Rising edges during which reset is asserted.
    pub cycles: u64,
    /// `true` for active-high reset.
    pub active_high: bool,
}

impl ResetSpec {
    /// Active-high reset on `signal` for `cycles` edges.
    pub fn active_high(signal: &str, cycles: u64) -> Self {
        Self {
            signal: signal.to_string(),
            cycles,
            active_high: true,
        }
    }

    /// Spawns a task that performs the reset sequence.
    pub fn spawn(&self, sim: &SimHandle) -> Result<JoinHandle, SimError> {
        let id = sim.signal(&self.signal)?;
        Ok(sim.spawn(
            format!("{} reset", self.signal),
            pulse(sim.clone(), id, self.cycles, self.active_high),
        ))
    }
}

/// Asserts `signal` immediately, holds it for `cycles` rising edges, and
/// releases it at the following falling edge.
pub async fn pulse(sim: SimHandle, signal: SignalId, cycles: u64, active_high: bool) -> TaskResult {
    sim.write_bool(signal, active_high)?;
    sim.clock_cycles(cycles).await;
    sim.falling_edge().await;
    sim.write_bool(signal, !active_high)?;
    debug!(signal = %sim.signal_name(signal), cycles, "reset released");
    Ok(())
}
