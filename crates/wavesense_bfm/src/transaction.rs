//! Transaction descriptors, observed beats, and frame capture.

use serde::{Deserialize, Serialize};

/// Where a burst asserts `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// On the final beat of the burst.
    #[default]
    EndOfBurst,
    /// On every `n`-th beat, counted from the start of the burst.
    Every(usize),
    /// Never.
    Never,
}

impl Framing {
    /// Whether beat `index` of a `len`-beat burst carries `last`.
    pub fn is_last(self, index: usize, len: usize) -> bool {
        match self {
            Self::EndOfBurst => index + 1 == len,
            Self::Every(n) => n > 0 && (index + 1) % n == 0,
            Self::Never => false,
        }
    }
}

/// One unit of work for a stream driver.
///
/// Field vectors list one value per interface lane, in lane order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// A single beat.
    Single {
        /// Lane values.
        fields: Vec<i64>,
        /// Whether to assert `last` with this beat.
        last: bool,
    },
    /// An ordered sequence of beats.
    Burst {
        /// Lane values of each beat.
        beats: Vec<Vec<i64>>,
        /// Where `last` is asserted.
        framing: Framing,
    },
}

impl Descriptor {
    /// A single beat without `last`.
    pub fn single(fields: Vec<i64>) -> Self {
        Self::Single {
            fields,
            last: false,
        }
    }

    /// A burst with `last` on its final beat.
    pub fn burst(beats: Vec<Vec<i64>>) -> Self {
        Self::Burst {
            beats,
            framing: Framing::EndOfBurst,
        }
    }

    /// A burst built from per-lane columns, truncated to the shortest column.
    pub fn from_columns(columns: &[&[i64]], framing: Framing) -> Self {
        let len = columns.iter().map(|c| c.len()).min().unwrap_or(0);
        let beats = (0..len)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Self::Burst { beats, framing }
    }

    /// Number of beats.
    pub fn len(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Burst { beats, .. } => beats.len(),
        }
    }

    /// Returns `true` for an empty burst.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(fields, last)` for every beat.
    pub fn beats(&self) -> Box<dyn Iterator<Item = (&[i64], bool)> + '_> {
        match self {
            Self::Single { fields, last } => Box::new(std::iter::once((fields.as_slice(), *last))),
            Self::Burst { beats, framing } => {
                let len = beats.len();
                Box::new(
                    beats
                        .iter()
                        .enumerate()
                        .map(move |(i, b)| (b.as_slice(), framing.is_last(i, len))),
                )
            }
        }
    }

    /// Number of beats that assert `last`.
    pub fn last_count(&self) -> usize {
        self.beats().filter(|&(_, last)| last).count()
    }
}

/// Handshake and data values sampled at one read-only point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedBeat {
    /// Sampled `valid`.
    pub valid: bool,
    /// Sampled `ready` (`true` for streams without one).
    pub ready: bool,
    /// Sampled `last`, if the stream has one.
    pub last: Option<bool>,
    /// Decoded lane values.
    pub fields: Vec<i64>,
}

impl ObservedBeat {
    /// A beat transfers iff `valid` and `ready` are both high.
    pub fn completed(&self) -> bool {
        self.valid && self.ready
    }
}

/// A completed beat as delivered to monitor subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Zero-based position among all transactions on the interface.
    pub index: u64,
    /// Index of the frame the beat belongs to.
    pub frame: usize,
    /// Decoded lane values.
    pub fields: Vec<i64>,
    /// Whether the beat closed its frame.
    pub last: bool,
}

/// Beats grouped between `last` markers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Frame {
    beats: Vec<Vec<i64>>,
    closed: bool,
}

impl Frame {
    /// The frame's beats in arrival order.
    pub fn beats(&self) -> &[Vec<i64>] {
        &self.beats
    }

    /// Number of beats.
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    /// Returns `true` if no beat has arrived yet.
    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Returns `true` once a beat with `last` has arrived.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// One lane of every beat.
    pub fn lane(&self, index: usize) -> Vec<i64> {
        self.beats.iter().filter_map(|b| b.get(index).copied()).collect()
    }
}

/// Ordered frames of one stream. The final frame is always open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameLog {
    frames: Vec<Frame>,
}

impl Default for FrameLog {
    fn default() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }
}

impl FrameLog {
    /// Creates a log holding one empty open frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a beat to the open frame and returns that frame's index. A
    /// beat with `last` closes the frame and opens a new one.
    pub fn push(&mut self, fields: Vec<i64>, last: bool) -> usize {
        let index = self.frames.len() - 1;
        let open = &mut self.frames[index];
        open.beats.push(fields);
        if last {
            open.closed = true;
            self.frames.push(Frame::default());
        }
        index
    }

    /// All frames, the open one last.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames closed by `last`.
    pub fn closed(&self) -> &[Frame] {
        &self.frames[..self.frames.len() - 1]
    }

    /// The frame currently collecting beats.
    pub fn open(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    /// Number of frames including the open one.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`; a log holds at least the open frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every beat in arrival order.
    pub fn beats(&self) -> impl Iterator<Item = &Vec<i64>> {
        self.frames.iter().flat_map(|f| f.beats.iter())
    }

    /// Total number of beats.
    pub fn beat_count(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_positions() {
        assert!(Framing::EndOfBurst.is_last(3, 4));
        assert!(!Framing::EndOfBurst.is_last(2, 4));
        let lasts: Vec<usize> = (0..10).filter(|&i| Framing::Every(4).is_last(i, 10)).collect();
        assert_eq!(lasts, vec![3, 7]);
        assert!(!Framing::Every(0).is_last(0, 1));
        assert!(!Framing::Never.is_last(0, 1));
    }

    #[test]
    fn burst_beats_carry_last() {
        let d = Descriptor::burst(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        let beats: Vec<(Vec<i64>, bool)> = d.beats().map(|(f, l)| (f.to_vec(), l)).collect();
        assert_eq!(
            beats,
            vec![(vec![1, 2], false), (vec![3, 4], false), (vec![5, 6], true)]
        );
        assert_eq!(d.len(), 3);
        assert_eq!(d.last_count(), 1);
    }

    #[test]
    fn single_beat() {
        let d = Descriptor::Single {
            fields: vec![9],
            last: true,
        };
        assert_eq!(d.len(), 1);
        assert_eq!(d.last_count(), 1);
        assert_eq!(Descriptor::single(vec![9]).last_count(), 0);
    }

    #[test]
    fn columns_zip_to_shortest() {
        let i = [1, 2, 3];
        let q = [-1, -2];
        let d = Descriptor::from_columns(&[&i[..], &q[..]], Framing::Never);
        assert_eq!(
            d,
            Descriptor::Burst {
                beats: vec![vec![1, -1], vec![2, -2]],
                framing: Framing::Never
            }
        );
        assert!(Descriptor::from_columns(&[], Framing::Never).is_empty());
    }

    #[test]
    fn observed_beat_completion() {
        let beat = |valid, ready| ObservedBeat {
            valid,
            ready,
            last: None,
            fields: vec![],
        };
        assert!(beat(true, true).completed());
        assert!(!beat(true, false).completed());
        assert!(!beat(false, true).completed());
    }

    #[test]
    fn frame_log_closes_on_last() {
        let mut log = FrameLog::new();
        assert_eq!(log.len(), 1);
        assert_eq!(log.push(vec![1], false), 0);
        assert_eq!(log.push(vec![2], true), 0);
        assert_eq!(log.push(vec![3], false), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.closed().len(), 1);
        assert!(log.closed()[0].is_closed());
        assert_eq!(log.closed()[0].lane(0), vec![1, 2]);
        assert!(!log.open().is_closed());
        assert_eq!(log.open().len(), 1);
        assert_eq!(log.beat_count(), 3);
    }

    #[test]
    fn frame_count_is_lasts_plus_one() {
        let mut log = FrameLog::new();
        for i in 0..20 {
            log.push(vec![i], (i + 1) % 5 == 0);
        }
        assert_eq!(log.len(), 4 + 1);
        assert!(log.open().is_empty());
    }
}
