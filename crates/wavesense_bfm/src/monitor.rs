//! Passive stream monitor.
//!
//! The monitor never writes a signal. After every falling edge it waits for
//! the read-only point and samples the interface; when `valid` and `ready`
//! are both high it records the beat, appends it to the open frame, and hands
//! a [`Transaction`] to each subscriber in subscription order.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;
use wavesense_sim::{SimError, SimHandle, TaskResult};

use crate::interface::{BoundInterface, StreamInterface};
use crate::transaction::{Frame, FrameLog, Transaction};

type Subscriber = Box<dyn FnMut(&Transaction)>;

#[derive(Default)]
struct MonitorState {
    transactions: u64,
    frames: FrameLog,
    subscribers: Vec<Subscriber>,
}

/// Handle to a monitor task and its captured data.
#[derive(Clone)]
pub struct StreamMonitor {
    name: String,
    lanes: Vec<String>,
    state: Rc<RefCell<MonitorState>>,
}

impl StreamMonitor {
    /// Binds to `iface` and spawns the sampling task.
    pub fn attach(sim: &SimHandle, iface: &StreamInterface) -> Result<Self, SimError> {
        let port = BoundInterface::bind(sim, iface)?;
        let state = Rc::new(RefCell::new(MonitorState::default()));
        sim.spawn(
            format!("{} monitor", iface.name),
            observe(sim.clone(), port, state.clone()),
        );
        Ok(Self {
            name: iface.name.clone(),
            lanes: iface.lanes.iter().map(|l| l.name.clone()).collect(),
            state,
        })
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of completed transactions.
    pub fn transactions(&self) -> u64 {
        self.state.borrow().transactions
    }

    /// Snapshot of the frame log.
    pub fn frame_log(&self) -> FrameLog {
        self.state.borrow().frames.clone()
    }

    /// Snapshot of all frames, the open one last.
    pub fn frames(&self) -> Vec<Frame> {
        self.state.borrow().frames.frames().to_vec()
    }

    /// Every captured beat in arrival order.
    pub fn beats(&self) -> Vec<Vec<i64>> {
        self.state.borrow().frames.beats().cloned().collect()
    }

    /// One lane of every captured beat, or `None` for an unknown lane.
    pub fn lane(&self, name: &str) -> Option<Vec<i64>> {
        let index = self.lanes.iter().position(|l| l == name)?;
        let st = self.state.borrow();
        Some(st.frames.beats().map(|b| b[index]).collect())
    }

    /// Registers a callback invoked synchronously for each transaction.
    pub fn subscribe(&self, callback: impl FnMut(&Transaction) + 'static) {
        self.state.borrow_mut().subscribers.push(Box::new(callback));
    }
}

async fn observe(
    sim: SimHandle,
    port: BoundInterface,
    state: Rc<RefCell<MonitorState>>,
) -> TaskResult {
    loop {
        sim.falling_edge().await;
        sim.read_only().await;
        let beat = port.sample(&sim)?;
        if !beat.completed() {
            continue;
        }
        let last = beat.last.unwrap_or(false);
        let (transaction, mut subscribers) = {
            let mut st = state.borrow_mut();
            let frame = st.frames.push(beat.fields.clone(), last);
            let index = st.transactions;
            st.transactions += 1;
            let transaction = Transaction {
                index,
                frame,
                fields: beat.fields,
                last,
            };
            (transaction, std::mem::take(&mut st.subscribers))
        };
        trace!(interface = port.name(), index = transaction.index, last, "transaction");
        for subscriber in &mut subscribers {
            subscriber(&transaction);
        }
        // Callbacks may subscribe further listeners; keep them after the existing ones.
        let mut st = state.borrow_mut();
        subscribers.append(&mut st.subscribers);
        st.subscribers = subscribers;
    }
}
