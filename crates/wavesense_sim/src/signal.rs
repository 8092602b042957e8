//! Signal storage with single-writer ownership.
//!
//! The [`SignalBank`] is the only mutable state shared between the DUT model
//! and the harness tasks. Each signal has at most one [`Writer`]: DUT outputs
//! belong to the DUT and the clock to the kernel from declaration, while DUT
//! inputs are claimed by the first task that drives them and released when that
//! task finishes.

use std::collections::HashMap;
use std::fmt;

use wavesense_common::fixed::check_width;
use wavesense_common::FixedInt;

use crate::error::SimError;
use crate::kernel::TaskId;

/// Index of a signal in a [`SignalBank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates an ID from a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Who is writing a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Writer {
    /// The kernel's clock generator.
    Kernel,
    /// The device model.
    Dut,
    /// Setup code running outside any task; never claims ownership.
    Harness,
    /// A scheduled task.
    Task(TaskId),
}

impl fmt::Display for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Writer::Kernel => write!(f, "the kernel"),
            Writer::Dut => write!(f, "the DUT"),
            Writer::Harness => write!(f, "the harness"),
            Writer::Task(id) => write!(f, "task #{}", id.as_raw()),
        }
    }
}

/// State of one declared signal.
#[derive(Debug, Clone)]
pub struct SignalState {
    /// Declared name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Current value.
    pub value: FixedInt,
    /// Value before the most recent change.
    pub previous: FixedInt,
    /// Current owner, if claimed.
    pub owner: Option<Writer>,
    pending_change: bool,
}

/// All signals of one simulation.
#[derive(Debug, Default)]
pub struct SignalBank {
    signals: Vec<SignalState>,
    by_name: HashMap<String, SignalId>,
    changed: Vec<SignalId>,
}

impl SignalBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a zero-initialised signal, optionally pre-assigned to an owner.
    pub fn declare(
        &mut self,
        name: &str,
        width: u32,
        owner: Option<Writer>,
    ) -> Result<SignalId, SimError> {
        check_width(width)?;
        if self.by_name.contains_key(name) {
            return Err(SimError::DuplicateSignal { name: name.into() });
        }
        let id = SignalId(self.signals.len() as u32);
        self.signals.push(SignalState {
            name: name.to_string(),
            width,
            value: FixedInt::zero(width),
            previous: FixedInt::zero(width),
            owner,
            pending_change: false,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a signal by name.
    pub fn lookup(&self, name: &str) -> Result<SignalId, SimError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownSignal { name: name.into() })
    }

    /// Returns the state of a signal.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this bank.
    pub fn get(&self, id: SignalId) -> &SignalState {
        &self.signals[id.0 as usize]
    }

    /// Returns the current value of a signal.
    pub fn value(&self, id: SignalId) -> FixedInt {
        self.get(id).value
    }

    /// Number of declared signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if no signals are declared.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates over all signals in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &SignalState)> {
        self.signals
            .iter()
            .enumerate()
            .map(|(i, s)| (SignalId(i as u32), s))
    }

    /// Drives `value` onto a signal on behalf of `writer`.
    ///
    /// Fails if the width differs or another writer owns the signal. A task
    /// writing an unowned signal becomes its owner.
    pub fn drive(&mut self, id: SignalId, value: FixedInt, writer: Writer) -> Result<(), SimError> {
        let sig = &mut self.signals[id.0 as usize];
        if value.width() != sig.width {
            return Err(SimError::WidthMismatch {
                signal: sig.name.clone(),
                expected: sig.width,
                actual: value.width(),
            });
        }
        match sig.owner {
            Some(owner) if owner != writer => {
                if writer != Writer::Harness || matches!(owner, Writer::Dut | Writer::Kernel) {
                    return Err(SimError::MultipleDrivers {
                        signal: sig.name.clone(),
                        owner: owner.to_string(),
                        writer: writer.to_string(),
                    });
                }
            }
            None if matches!(writer, Writer::Task(_)) => sig.owner = Some(writer),
            _ => {}
        }
        if sig.value != value {
            sig.previous = sig.value;
            sig.value = value;
            if !sig.pending_change {
                sig.pending_change = true;
                self.changed.push(id);
            }
        }
        Ok(())
    }

    /// Releases every signal owned by `writer`.
    pub fn release(&mut self, writer: Writer) {
        for sig in &mut self.signals {
            if sig.owner == Some(writer) {
                sig.owner = None;
            }
        }
    }

    /// Returns the signals changed since the last call, in change order.
    pub fn take_changed(&mut self) -> Vec<SignalId> {
        let changed = std::mem::take(&mut self.changed);
        for id in &changed {
            self.signals[id.0 as usize].pending_change = false;
        }
        changed
    }
}
