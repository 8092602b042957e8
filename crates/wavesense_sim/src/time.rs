//! Simulation time and the reference clock.
//!
//! The harness only ever advances time in half-cycle steps of a single
//! reference clock, so a timestamp is fully determined by a cycle index and an
//! [`Edge`]. [`Clock`] performs that mapping; [`SimTime`] is the resulting
//! femtosecond timestamp used for waveform output and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use wavesense_common::Frequency;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;

/// A simulation timestamp in femtoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Femtoseconds since the start of simulation.
    pub fs: u64,
}

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        Self { fs: 0 }
    }

    /// Creates a time from femtoseconds.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs }
    }

    /// Creates a time from nanoseconds.
    pub fn from_ns(ns: u64) -> Self {
        Self { fs: ns * FS_PER_NS }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        let (value, unit) = if fs == 0 {
            (0, "ns")
        } else if fs % FS_PER_US == 0 {
            (fs / FS_PER_US, "us")
        } else if fs % FS_PER_NS == 0 {
            (fs / FS_PER_NS, "ns")
        } else if fs % FS_PER_PS == 0 {
            (fs / FS_PER_PS, "ps")
        } else {
            (fs, "fs")
        };
        write!(f, "{value} {unit}")
    }
}

/// A transition of the reference clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Low-to-high transition at the start of a cycle.
    Rising,
    /// High-to-low transition half a period later.
    Falling,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising"),
            Edge::Falling => write!(f, "falling"),
        }
    }
}

/// The reference clock: a fixed period with a 50% duty cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    period_fs: u64,
}

impl Clock {
    /// Creates a clock with the given period.
    ///
    /// # Panics
    ///
    /// Panics if `period_fs < 2`, since both edges need distinct timestamps.
    pub fn new(period_fs: u64) -> Self {
        assert!(period_fs >= 2, "clock period {period_fs} fs is too short");
        Self { period_fs }
    }

    /// Creates a clock running at `frequency`.
    pub fn from_frequency(frequency: Frequency) -> Self {
        Self::new(frequency.period_fs().max(2))
    }

    /// Returns the period in femtoseconds.
    pub fn period_fs(&self) -> u64 {
        self.period_fs
    }

    /// Timestamp of `edge` within cycle `cycle`.
    pub fn edge_time(&self, cycle: u64, edge: Edge) -> SimTime {
        let start = cycle * self.period_fs;
        match edge {
            Edge::Rising => SimTime::from_fs(start),
            Edge::Falling => SimTime::from_fs(start + self.period_fs / 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_picks_exact_unit() {
        assert_eq!(SimTime::zero().to_string(), "0 ns");
        assert_eq!(SimTime::from_ns(15).to_string(), "15 ns");
        assert_eq!(SimTime::from_fs(2 * FS_PER_US).to_string(), "2 us");
        assert_eq!(SimTime::from_fs(1_500_000).to_string(), "1500 ps");
        assert_eq!(SimTime::from_fs(7).to_string(), "7 fs");
    }

    #[test]
    fn ordering() {
        assert!(SimTime::from_ns(1) < SimTime::from_ns(2));
        assert_eq!(SimTime::default(), SimTime::zero());
    }

    #[test]
    fn edge_times() {
        let clock = Clock::new(10 * FS_PER_NS);
        assert_eq!(clock.edge_time(0, Edge::Rising), SimTime::zero());
        assert_eq!(clock.edge_time(0, Edge::Falling), SimTime::from_ns(5));
        assert_eq!(clock.edge_time(3, Edge::Rising), SimTime::from_ns(30));
        assert_eq!(clock.edge_time(3, Edge::Falling), SimTime::from_ns(35));
    }

    #[test]
    fn clock_from_frequency() {
        let clock = Clock::from_frequency("100MHz".parse().unwrap());
        assert_eq!(clock.period_fs(), 10 * FS_PER_NS);
    }

    #[test]
    #[should_panic(expected = "too short")]
    fn zero_period_rejected() {
        Clock::new(0);
    }

    #[test]
    fn edge_display() {
        assert_eq!(Edge::Rising.to_string(), "rising");
        assert_eq!(Edge::Falling.to_string(), "falling");
    }
}
