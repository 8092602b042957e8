//! Stream interface descriptions and their binding to kernel signals.
//!
//! A [`StreamInterface`] names the handshake signals of one valid/ready
//! stream and lists its data lanes. Several lanes may share one signal, in
//! which case each lane occupies its own bit range of that signal's word. A
//! stream with no `ready` signal is always ready; a stream with no `last`
//! signal never closes a frame.
//!
//! Binding resolves names to [`SignalId`]s once, so drivers and monitors do
//! not look anything up per cycle.

use wavesense_common::{CodecError, FieldSpec, FixedInt, Overflow};
use wavesense_sim::{SignalId, SimError, SimHandle};

use crate::transaction::ObservedBeat;

/// One data lane of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    /// Lane name, used to select a column from captured data.
    pub name: String,
    /// Name of the signal that carries the lane.
    pub signal: String,
    /// Position of the lane inside the signal's word.
    pub field: FieldSpec,
}

/// Signal names and lane layout of one valid/ready stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInterface {
    /// Interface name used in logs and errors.
    pub name: String,
    /// The `valid` handshake signal.
    pub valid: String,
    /// The `ready` handshake signal, if the stream has one.
    pub ready: Option<String>,
    /// The end-of-frame marker, if the stream has one.
    pub last: Option<String>,
    /// Data lanes in field order.
    pub lanes: Vec<Lane>,
    /// How drivers treat values that do not fit their lane.
    pub overflow: Overflow,
}

impl StreamInterface {
    /// An AXI-Stream style interface: `{prefix}_tvalid` and `{prefix}_tready`,
    /// no `last`, no lanes.
    pub fn axis(prefix: &str) -> Self {
        Self {
            name: prefix.to_string(),
            valid: format!("{prefix}_tvalid"),
            ready: Some(format!("{prefix}_tready")),
            last: None,
            lanes: Vec::new(),
            overflow: Overflow::Reject,
        }
    }

    /// A stream qualified only by `valid`: no `ready`, no `last`, no lanes.
    pub fn valid_only(name: &str, valid: &str) -> Self {
        Self {
            name: name.to_string(),
            valid: valid.to_string(),
            ready: None,
            last: None,
            lanes: Vec::new(),
            overflow: Overflow::Reject,
        }
    }

    /// Adds the `{name}_tlast` frame marker.
    pub fn with_last(mut self) -> Self {
        self.last = Some(format!("{}_tlast", self.name));
        self
    }

    /// Removes the `ready` signal; the stream is then always ready.
    pub fn without_ready(mut self) -> Self {
        self.ready = None;
        self
    }

    /// Adds a lane that occupies the whole of `signal`.
    pub fn lane(self, name: &str, signal: &str, width: u32, signed: bool) -> Self {
        let field = FieldSpec {
            width,
            offset: 0,
            signed,
        };
        self.packed_lane(name, signal, field)
    }

    /// Adds a lane that occupies the bit range `field` of `signal`.
    pub fn packed_lane(mut self, name: &str, signal: &str, field: FieldSpec) -> Self {
        self.lanes.push(Lane {
            name: name.to_string(),
            signal: signal.to_string(),
            field,
        });
        self
    }

    /// Sets the overflow policy used when driving.
    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    /// Position of the lane called `name`.
    pub fn lane_index(&self, name: &str) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.name == name)
    }
}

#[derive(Debug, Clone)]
struct BoundLane {
    word: usize,
    field: FieldSpec,
}

/// A [`StreamInterface`] resolved against a running simulation.
#[derive(Debug, Clone)]
pub struct BoundInterface {
    name: String,
    valid: SignalId,
    ready: Option<SignalId>,
    last: Option<SignalId>,
    words: Vec<(SignalId, u32)>,
    lanes: Vec<BoundLane>,
    overflow: Overflow,
}

impl BoundInterface {
    /// Resolves every signal and checks that each lane fits its signal.
    pub fn bind(sim: &SimHandle, iface: &StreamInterface) -> Result<Self, SimError> {
        let valid = sim.signal(&iface.valid)?;
        let ready = iface.ready.as_deref().map(|n| sim.signal(n)).transpose()?;
        let last = iface.last.as_deref().map(|n| sim.signal(n)).transpose()?;

        let mut words: Vec<(SignalId, u32)> = Vec::new();
        let mut lanes = Vec::with_capacity(iface.lanes.len());
        for lane in &iface.lanes {
            let id = sim.signal(&lane.signal)?;
            let width = sim.width(id);
            let span = lane.field.width + lane.field.offset;
            if lane.field.width == 0 || span > width {
                return Err(SimError::Codec(CodecError::WordOverflow {
                    total: span,
                    max: width,
                }));
            }
            let word = match words.iter().position(|&(w, _)| w == id) {
                Some(index) => index,
                None => {
                    words.push((id, width));
                    words.len() - 1
                }
            };
            lanes.push(BoundLane {
                word,
                field: lane.field,
            });
        }

        Ok(Self {
            name: iface.name.clone(),
            valid,
            ready,
            last,
            words,
            lanes,
            overflow: iface.overflow,
        })
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `valid` signal.
    pub fn valid(&self) -> SignalId {
        self.valid
    }

    /// The `last` signal, if any.
    pub fn last(&self) -> Option<SignalId> {
        self.last
    }

    /// Number of data lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Current `ready`, or `true` for streams without one.
    pub fn is_ready(&self, sim: &SimHandle) -> bool {
        self.ready.is_none_or(|id| sim.read_bool(id))
    }

    /// Samples handshake and data signals.
    pub fn sample(&self, sim: &SimHandle) -> Result<ObservedBeat, SimError> {
        let raw: Vec<u64> = self
            .words
            .iter()
            .map(|&(id, _)| sim.read(id).as_unsigned())
            .collect();
        let fields = self
            .lanes
            .iter()
            .map(|lane| lane.field.decode(raw[lane.word]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObservedBeat {
            valid: sim.read_bool(self.valid),
            ready: self.is_ready(sim),
            last: self.last.map(|id| sim.read_bool(id)),
            fields,
        })
    }

    /// Packs one beat's field values into per-signal words.
    pub fn encode(&self, fields: &[i64]) -> Result<Vec<(SignalId, FixedInt)>, SimError> {
        if fields.len() != self.lanes.len() {
            return Err(SimError::Protocol {
                interface: self.name.clone(),
                reason: format!(
                    "beat has {} fields, interface has {} lanes",
                    fields.len(),
                    self.lanes.len()
                ),
            });
        }
        let mut raw = vec![0u64; self.words.len()];
        for (lane, &value) in self.lanes.iter().zip(fields) {
            raw[lane.word] = lane.field.insert(raw[lane.word], value, self.overflow)?;
        }
        Ok(self
            .words
            .iter()
            .zip(raw)
            .map(|(&(id, width), bits)| (id, FixedInt::wrapping_from_unsigned(bits, width)))
            .collect())
    }
}
