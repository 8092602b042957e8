//! Downstream `ready` generation.
//!
//! A [`ReadySchedule`] turns a [`ReadyPolicy`] into one `ready` value per
//! cycle. It is a plain iterator-like object so that policies can be tested
//! without a kernel; [`BackpressureController`] runs one inside a task that
//! writes `ready` at every falling edge.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wavesense_sim::{SignalId, SimError, SimHandle, TaskResult};

/// A run of cycles with constant `ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyWindow {
    /// Value held during the window.
    pub ready: bool,
    /// Window length in cycles.
    pub cycles: u64,
}

impl ReadyWindow {
    /// A window with `ready` high.
    pub fn on(cycles: u64) -> Self {
        Self { ready: true, cycles }
    }

    /// A window with `ready` low.
    pub fn off(cycles: u64) -> Self {
        Self {
            ready: false,
            cycles,
        }
    }
}

/// How `ready` evolves over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReadyPolicy {
    /// Always ready.
    Always,
    /// Never ready.
    Never,
    /// Windows applied in order, then `ready` stays high.
    Scripted {
        /// The windows.
        windows: Vec<ReadyWindow>,
    },
    /// Independent seeded draws each cycle.
    Random {
        /// Probability of `ready` in any cycle.
        p_ready: f64,
        /// Generator seed.
        seed: u64,
    },
}

impl ReadyPolicy {
    fn check(&self) -> Result<(), String> {
        match self {
            Self::Random { p_ready, .. } if !(0.0..=1.0).contains(p_ready) => {
                Err(format!("ready probability {p_ready} is outside [0, 1]"))
            }
            _ => Ok(()),
        }
    }
}

/// Per-cycle `ready` values of a policy.
#[derive(Debug, Clone)]
pub struct ReadySchedule {
    policy: ReadyPolicy,
    window: usize,
    used: u64,
    rng: Option<StdRng>,
}

impl ReadySchedule {
    /// Starts `policy` from its first cycle.
    pub fn new(policy: ReadyPolicy) -> Self {
        let rng = match &policy {
            ReadyPolicy::Random { seed, .. } => Some(StdRng::seed_from_u64(*seed)),
            _ => None,
        };
        Self {
            policy,
            window: 0,
            used: 0,
            rng,
        }
    }

    /// `ready` for the next cycle.
    pub fn next_ready(&mut self) -> bool {
        match &self.policy {
            ReadyPolicy::Always => true,
            ReadyPolicy::Never => false,
            ReadyPolicy::Scripted { windows } => loop {
                let Some(window) = windows.get(self.window) else {
                    return true;
                };
                if self.used < window.cycles {
                    self.used += 1;
                    return window.ready;
                }
                self.window += 1;
                self.used = 0;
            },
            ReadyPolicy::Random { p_ready, .. } => match &mut self.rng {
                Some(rng) => rng.gen_bool(p_ready.clamp(0.0, 1.0)),
                None => true,
            },
        }
    }
}

#[derive(Debug, Default)]
struct ReadyStats {
    asserted: Cell<u64>,
    deasserted: Cell<u64>,
}

/// Drives a DUT's downstream `ready` input.
#[derive(Clone)]
pub struct BackpressureController {
    signal: String,
    schedule: Rc<RefCell<ReadySchedule>>,
    stats: Rc<ReadyStats>,
}

impl BackpressureController {
    /// Spawns a task that writes `ready_signal` from `policy` at each falling
    /// edge.
    pub fn attach(
        sim: &SimHandle,
        ready_signal: &str,
        policy: ReadyPolicy,
    ) -> Result<Self, SimError> {
        let id = sim.signal(ready_signal)?;
        policy.check().map_err(|reason| SimError::Protocol {
            interface: ready_signal.to_string(),
            reason,
        })?;
        let controller = Self {
            signal: ready_signal.to_string(),
            schedule: Rc::new(RefCell::new(ReadySchedule::new(policy))),
            stats: Rc::new(ReadyStats::default()),
        };
        sim.spawn(
            format!("{ready_signal} backpressure"),
            drive_ready(sim.clone(), id, controller.schedule.clone(), controller.stats.clone()),
        );
        Ok(controller)
    }

    /// Replaces the policy from the next falling edge on.
    pub fn set_policy(&self, policy: ReadyPolicy) -> Result<(), SimError> {
        policy.check().map_err(|reason| SimError::Protocol {
            interface: self.signal.clone(),
            reason,
        })?;
        debug!(signal = %self.signal, ?policy, "backpressure policy changed");
        *self.schedule.borrow_mut() = ReadySchedule::new(policy);
        Ok(())
    }

    /// Holds `ready` at a constant value from the next falling edge on.
    pub fn set_ready(&self, ready: bool) {
        let policy = if ready {
            ReadyPolicy::Always
        } else {
            ReadyPolicy::Never
        };
        *self.schedule.borrow_mut() = ReadySchedule::new(policy);
    }

    /// Cycles driven with `ready` high.
    pub fn asserted_cycles(&self) -> u64 {
        self.stats.asserted.get()
    }

    /// Cycles driven with `ready` low.
    pub fn deasserted_cycles(&self) -> u64 {
        self.stats.deasserted.get()
    }
}

async fn drive_ready(
    sim: SimHandle,
    ready: SignalId,
    schedule: Rc<RefCell<ReadySchedule>>,
    stats: Rc<ReadyStats>,
) -> TaskResult {
    loop {
        sim.falling_edge().await;
        let value = schedule.borrow_mut().next_ready();
        sim.write_bool(ready, value)?;
        let counter = if value {
            &stats.asserted
        } else {
            &stats.deasserted
        };
        counter.set(counter.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(policy: ReadyPolicy, n: usize) -> Vec<bool> {
        let mut schedule = ReadySchedule::new(policy);
        (0..n).map(|_| schedule.next_ready()).collect()
    }

    #[test]
    fn constant_policies() {
        assert!(take(ReadyPolicy::Always, 8).iter().all(|&r| r));
        assert!(take(ReadyPolicy::Never, 8).iter().all(|&r| !r));
    }

    #[test]
    fn scripted_windows_then_ready() {
        let policy = ReadyPolicy::Scripted {
            windows: vec![
                ReadyWindow::on(2),
                ReadyWindow::off(3),
                ReadyWindow::on(1),
                ReadyWindow::off(1),
            ],
        };
        assert_eq!(
            take(policy, 10),
            vec![true, true, false, false, false, true, false, true, true, true]
        );
    }

    #[test]
    fn scripted_skips_empty_windows() {
        let policy = ReadyPolicy::Scripted {
            windows: vec![ReadyWindow::off(0), ReadyWindow::off(1)],
        };
        assert_eq!(take(policy, 3), vec![false, true, true]);
    }

    #[test]
    fn random_is_reproducible_per_seed() {
        let policy = |seed| ReadyPolicy::Random { p_ready: 0.5, seed };
        assert_eq!(take(policy(7), 64), take(policy(7), 64));
        assert_ne!(take(policy(7), 64), take(policy(8), 64));
    }

    #[test]
    fn random_extremes() {
        assert!(take(ReadyPolicy::Random { p_ready: 1.0, seed: 1 }, 32).iter().all(|&r| r));
        assert!(take(ReadyPolicy::Random { p_ready: 0.0, seed: 1 }, 32).iter().all(|&r| !r));
    }

    #[test]
    fn invalid_probability_rejected() {
        assert!(ReadyPolicy::Random { p_ready: 1.5, seed: 0 }.check().is_err());
        assert!(ReadyPolicy::Random { p_ready: f64::NAN, seed: 0 }.check().is_err());
        assert!(ReadyPolicy::Always.check().is_ok());
    }

    #[test]
    fn policy_deserializes_from_tagged_table() {
        let policy: ReadyPolicy =
            serde_json::from_str(r#"{"policy":"random","p_ready":0.25,"seed":3}"#).unwrap();
        assert_eq!(policy, ReadyPolicy::Random { p_ready: 0.25, seed: 3 });
        let policy: ReadyPolicy = serde_json::from_str(
            r#"{"policy":"scripted","windows":[{"ready":false,"cycles":4}]}"#,
        )
        .unwrap();
        assert_eq!(
            policy,
            ReadyPolicy::Scripted {
                windows: vec![ReadyWindow::off(4)]
            }
        );
    }
}
