//! Long training field synchronizer.

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::xcorr::conj_mac;
use super::{complex_fields, packed_iq, split_complex, OutputBeat, StreamKernel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    /// Looking for two correlation peaks one symbol apart.
    Searching,
    /// Forwarding samples from `start`; `next` is the next index to send.
    Forwarding { start: u64, next: u64 },
    /// Every symbol has been sent; input is dropped until reset.
    Done,
}

/// Locates the long training symbols and forwards them as framed blocks.
///
/// Each window of `reference.len()` samples is correlated against the
/// reference. A window is a candidate when `2·|c|² >= E_w·E_r`, i.e. its
/// normalized correlation reaches `1/√2`. The strongest candidate so far is
/// confirmed by a second candidate one `period` later (±1) with at least
/// three quarters of its power. The synchronizer then forwards `symbols`
/// blocks of `period` samples starting at the confirmed peak, `last` on the
/// final sample of each block, and ignores the rest of the burst.
#[derive(Debug, Clone)]
pub struct LongPreambleSync {
    reference: Vec<(i64, i64)>,
    reference_energy: i128,
    period: usize,
    symbols: usize,
    history: VecDeque<(i64, i64)>,
    count: u64,
    best: Option<(u64, i128)>,
    state: SyncState,
}

impl LongPreambleSync {
    /// Synchronizes on `reference`, forwarding `symbols` blocks of `period`.
    pub fn new(reference: Vec<(i64, i64)>, period: usize, symbols: usize) -> Self {
        let reference_energy = energy(&reference);
        Self {
            history: VecDeque::with_capacity(period + reference.len() + 2),
            reference,
            reference_energy,
            period: period.max(1),
            symbols,
            count: 0,
            best: None,
            state: SyncState::Searching,
        }
    }

    /// Samples kept: enough to reach back from the confirming window to the
    /// first peak.
    fn keep(&self) -> usize {
        self.period + self.reference.len() + 2
    }

    /// Index of the oldest sample in `history`.
    fn base(&self) -> u64 {
        self.count - self.history.len() as u64
    }

    fn search(&mut self) {
        let len = self.reference.len();
        if len == 0 || self.history.len() < len {
            return;
        }
        let window = self.history.range(self.history.len() - len..);
        let (re, im) = conj_mac(window.clone(), &self.reference, 0);
        let power = i128::from(re) * i128::from(re) + i128::from(im) * i128::from(im);
        let window_energy = window.fold(0i128, |acc, &(a, b)| {
            acc + i128::from(a) * i128::from(a) + i128::from(b) * i128::from(b)
        });
        if power == 0 || 2 * power < window_energy * self.reference_energy {
            return;
        }
        let start = self.count - len as u64;
        match self.best {
            Some((peak, best))
                if start.abs_diff(peak + self.period as u64) <= 1 && 4 * power >= 3 * best =>
            {
                self.state = SyncState::Forwarding {
                    start: peak,
                    next: peak,
                };
            }
            Some((_, best)) if best >= power => {}
            _ => self.best = Some((start, power)),
        }
    }

    fn forward(&mut self, out: &mut Vec<OutputBeat>) {
        let SyncState::Forwarding { start, mut next } = self.state else {
            return;
        };
        let end = start + (self.symbols * self.period) as u64;
        let base = self.base();
        while next < self.count && next < end {
            let Some(&(i, q)) = self.history.get((next - base) as usize) else {
                break;
            };
            out.push(OutputBeat {
                fields: vec![i, q],
                last: (next - start + 1) % self.period as u64 == 0,
            });
            next += 1;
        }
        self.state = if next >= end {
            SyncState::Done
        } else {
            SyncState::Forwarding { start, next }
        };
    }
}

fn energy(samples: &[(i64, i64)]) -> i128 {
    samples
        .iter()
        .map(|&(a, b)| i128::from(a) * i128::from(a) + i128::from(b) * i128::from(b))
        .sum()
}

impl StreamKernel for LongPreambleSync {
    fn name(&self) -> &str {
        "long_preamble_sync"
    }

    fn input(&self) -> StreamInterface {
        packed_iq("s_axis")
    }

    fn output(&self) -> StreamInterface {
        split_complex("m_axis", 16).with_last()
    }

    fn reset(&mut self) {
        self.history.clear();
        self.count = 0;
        self.best = None;
        self.state = SyncState::Searching;
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        if self.state == SyncState::Done {
            return Ok(());
        }
        self.history.push_back(complex_fields(fields));
        self.count += 1;
        if self.history.len() > self.keep() {
            self.history.pop_front();
        }
        if self.state == SyncState::Searching {
            self.search();
        }
        self.forward(out);
        Ok(())
    }
}
