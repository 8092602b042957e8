//! Stream driver.
//!
//! Presents descriptor beats on a valid/ready interface. Every beat is set up
//! at a falling edge and held until `ready` is seen at a read-only point, so
//! the DUT samples stable data at the next rising edge. The driver only
//! counts a beat as accepted once both handshake signals were high.

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};
use wavesense_sim::{JoinHandle, SimError, SimHandle, TaskResult};

use crate::interface::{BoundInterface, StreamInterface};
use crate::transaction::Descriptor;

/// Random idle cycles inserted between beats of a burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleGaps {
    /// Probability of inserting a gap after a beat.
    pub probability: f64,
    /// Longest gap in cycles.
    pub max_cycles: u32,
    /// Seed of the gap generator.
    pub seed: u64,
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Cycles a beat may wait for `ready` before the driver reports a stall.
    pub stall_budget: u64,
    /// Optional idle insertion.
    pub idle_gaps: Option<IdleGaps>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            stall_budget: 10_000,
            idle_gaps: None,
        }
    }
}

/// Shared count of beats a driver has seen accepted.
#[derive(Debug, Clone, Default)]
pub struct BeatCounter(Rc<Cell<u64>>);

impl BeatCounter {
    /// Current count.
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Drives descriptors onto one stream interface.
pub struct StreamDriver {
    sim: SimHandle,
    port: BoundInterface,
    config: DriverConfig,
    gaps: Option<(IdleGaps, StdRng)>,
    accepted: BeatCounter,
}

impl StreamDriver {
    /// Binds a driver to `iface`.
    pub fn new(
        sim: &SimHandle,
        iface: &StreamInterface,
        config: DriverConfig,
    ) -> Result<Self, SimError> {
        let port = BoundInterface::bind(sim, iface)?;
        if let Some(gaps) = &config.idle_gaps {
            if !(0.0..=1.0).contains(&gaps.probability) {
                return Err(SimError::Protocol {
                    interface: iface.name.clone(),
                    reason: format!("idle gap probability {} is outside [0, 1]", gaps.probability),
                });
            }
        }
        let gaps = config
            .idle_gaps
            .map(|g| (g, StdRng::seed_from_u64(g.seed)));
        Ok(Self {
            sim: sim.clone(),
            port,
            config,
            gaps,
            accepted: BeatCounter::default(),
        })
    }

    /// Counter of accepted beats that stays readable after the driver moves
    /// into a task.
    pub fn accepted(&self) -> BeatCounter {
        self.accepted.clone()
    }

    /// Drives every beat of `descriptor`, then deasserts `valid`.
    ///
    /// Returns the number of beats sent, or [`SimError::ProtocolStall`] if a
    /// beat waited longer than the stall budget.
    pub async fn send(&mut self, descriptor: &Descriptor) -> Result<usize, SimError> {
        let total = descriptor.len();
        for (index, (fields, last)) in descriptor.beats().enumerate() {
            self.sim.falling_edge().await;
            self.present(fields, last)?;
            self.await_ready().await?;
            self.accepted.bump();
            trace!(interface = self.port.name(), beat = index, last, "beat accepted");
            if index + 1 < total {
                self.idle_gap().await?;
            }
        }
        if total > 0 {
            self.sim.falling_edge().await;
            self.release()?;
        }
        Ok(total)
    }

    /// Moves the driver into a kernel task that sends `descriptors` in order.
    pub fn spawn(self, descriptors: Vec<Descriptor>) -> JoinHandle {
        let sim = self.sim.clone();
        let name = format!("{} driver", self.port.name());
        sim.spawn(name, drive_all(self, descriptors))
    }

    fn present(&self, fields: &[i64], last: bool) -> Result<(), SimError> {
        for (id, word) in self.port.encode(fields)? {
            self.sim.write(id, word)?;
        }
        if let Some(id) = self.port.last() {
            self.sim.write_bool(id, last)?;
        }
        self.sim.write_bool(self.port.valid(), true)
    }

    fn release(&self) -> Result<(), SimError> {
        if let Some(id) = self.port.last() {
            self.sim.write_bool(id, false)?;
        }
        self.sim.write_bool(self.port.valid(), false)
    }

    async fn await_ready(&self) -> Result<(), SimError> {
        let mut waited = 0;
        loop {
            self.sim.read_only().await;
            if self.port.is_ready(&self.sim) {
                return Ok(());
            }
            waited += 1;
            if waited >= self.config.stall_budget {
                debug!(interface = self.port.name(), cycles = waited, "driver stalled");
                return Err(SimError::ProtocolStall {
                    interface: self.port.name().to_string(),
                    cycles: waited,
                });
            }
            self.sim.falling_edge().await;
        }
    }

    async fn idle_gap(&mut self) -> Result<(), SimError> {
        let Some((gaps, rng)) = &mut self.gaps else {
            return Ok(());
        };
        if gaps.max_cycles == 0 || !rng.gen_bool(gaps.probability) {
            return Ok(());
        }
        let cycles = rng.gen_range(1..=gaps.max_cycles);
        // The beat transferred at the rising edge before this falling edge.
        self.sim.falling_edge().await;
        self.release()?;
        for _ in 1..cycles {
            self.sim.falling_edge().await;
        }
        Ok(())
    }
}

async fn drive_all(mut driver: StreamDriver, descriptors: Vec<Descriptor>) -> TaskResult {
    for descriptor in &descriptors {
        driver.send(descriptor).await?;
    }
    debug!(
        interface = driver.port.name(),
        beats = driver.accepted.get(),
        "driver finished"
    );
    Ok(())
}
