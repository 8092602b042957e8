//! Built-in scenarios, one per pipeline block.

mod block_fft;
mod channel_estimate;
mod delay_line;
mod fifo_loopback;
mod fir_decimator;
mod lts_xcorr;
mod mag_squared;
mod short_preamble;
mod sync_long;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wavesense_common::IqSample;

use crate::scenario::Scenario;

pub use block_fft::BlockFftScenario;
pub use channel_estimate::ChannelEstimateScenario;
pub use delay_line::DelayLineScenario;
pub use fifo_loopback::FifoLoopbackScenario;
pub use fir_decimator::FirDecimatorScenario;
pub use lts_xcorr::LtsXcorrScenario;
pub use mag_squared::MagSquaredScenario;
pub use short_preamble::ShortPreambleScenario;
pub use sync_long::SyncLongScenario;

/// Every built-in scenario in run order.
pub fn catalog() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(DelayLineScenario),
        Box::new(MagSquaredScenario),
        Box::new(FirDecimatorScenario),
        Box::new(BlockFftScenario),
        Box::new(ShortPreambleScenario),
        Box::new(LtsXcorrScenario),
        Box::new(SyncLongScenario),
        Box::new(ChannelEstimateScenario),
        Box::new(FifoLoopbackScenario),
    ]
}

/// Catalog names in run order.
pub fn names() -> Vec<&'static str> {
    vec![
        "delay_line",
        "mag_squared",
        "fir_decimator",
        "block_fft",
        "short_preamble",
        "lts_xcorr",
        "sync_long",
        "channel_estimate",
        "fifo_loopback",
    ]
}

/// Looks up a scenario by name.
pub fn find(name: &str) -> Option<Box<dyn Scenario>> {
    catalog().into_iter().find(|s| s.name() == name)
}

/// `[i, q]` beats of `samples`.
fn iq_beats(samples: &[IqSample]) -> Vec<Vec<i64>> {
    samples
        .iter()
        .map(|s| vec![i64::from(s.i), i64::from(s.q)])
        .collect()
}

/// `(i, q)` pairs of `samples`.
fn iq_pairs(samples: &[IqSample]) -> Vec<(i64, i64)> {
    samples
        .iter()
        .map(|s| (i64::from(s.i), i64::from(s.q)))
        .collect()
}

/// `count` seeded uniform samples over the full 16-bit range.
fn random_iq(seed: u64, count: usize) -> Vec<IqSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| IqSample::new(rng.gen(), rng.gen()))
        .collect()
}

/// `lead` zeros, the samples, then `tail` zeros.
fn padded(lead: usize, samples: &[IqSample], tail: usize) -> Vec<IqSample> {
    let mut out = vec![IqSample::default(); lead];
    out.extend_from_slice(samples);
    out.resize(out.len() + tail, IqSample::default());
    out
}
