//! Cooperative clock-edge scheduler.
//!
//! [`SimKernel`] owns the DUT and a set of single-threaded tasks. Tasks are
//! plain `async` blocks that suspend only on kernel triggers obtained from a
//! [`SimHandle`]: the next rising edge, the next falling edge, the read-only
//! point after the current half-cycle has settled, a change of one signal, or
//! the completion of another task. When a trigger fires, every task waiting on
//! it is resumed in the order it registered.
//!
//! # Cycle structure
//!
//! Each call to [`SimKernel::step`] runs one clock cycle as two half-cycles:
//!
//! 1. **Rising edge**: the clock goes high, the DUT samples its inputs and
//!    updates its registers, then tasks waiting on the rising edge run.
//! 2. **Settle**: the DUT recomputes combinational outputs and tasks waiting on
//!    changed signals run, repeatedly, until nothing changes (bounded by
//!    `max_deltas`).
//! 3. **Read-only**: tasks waiting on the read-only point run. Any write in
//!    this phase is an error, so every value observed here is final for the
//!    half-cycle.
//! 4. The same three phases repeat for the falling edge, minus the DUT update.
//!
//! Drivers change inputs at the falling edge and monitors sample at the
//! following read-only point, which gives every input half a cycle to settle
//! before the DUT's next rising edge and guarantees monitors see the values
//! drivers produced in the same cycle.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, trace};
use wavesense_common::FixedInt;

use crate::dut::{Direction, Dut, DutIo};
use crate::error::SimError;
use crate::signal::{SignalBank, SignalId, Writer};
use crate::time::{Clock, Edge, SimTime};
use crate::waveform::WaveformRecorder;
use crate::SimConfig;

/// Result of a harness task.
pub type TaskResult = Result<(), SimError>;

type BoxedTask = Pin<Box<dyn Future<Output = TaskResult>>>;

/// Identifier of a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates an ID from a raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// An event tasks can wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The next rising edge of the reference clock.
    RisingEdge,
    /// The next falling edge of the reference clock.
    FallingEdge,
    /// The next point where the current half-cycle has settled.
    ReadOnly,
    /// The next change of a signal.
    ValueChange(SignalId),
    /// Completion of a task.
    TaskDone(TaskId),
}

/// Scheduling phase within a half-cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Signals may be written.
    Active,
    /// Signals are frozen until the next edge.
    ReadOnly,
}

struct NewTask {
    id: TaskId,
    name: String,
    future: BoxedTask,
}

struct Scheduler {
    bank: SignalBank,
    clock: Clock,
    cycle: u64,
    time: SimTime,
    edge: Edge,
    phase: Phase,
    current: Option<TaskId>,
    waiters: HashMap<Trigger, Vec<TaskId>>,
    ready: VecDeque<TaskId>,
    spawned: Vec<NewTask>,
    finished: HashSet<TaskId>,
    next_task: u64,
}

impl Scheduler {
    fn fire(&mut self, trigger: Trigger) {
        if let Some(waiting) = self.waiters.remove(&trigger) {
            self.ready.extend(waiting);
        }
    }

    fn writer(&self) -> Writer {
        self.current.map_or(Writer::Harness, Writer::Task)
    }
}

/// Task-side view of a running simulation.
///
/// Cheap to clone; every task captures its own clone. Reads and writes go
/// straight to the signal bank, and writes are attributed to the task that is
/// currently being polled.
#[derive(Clone)]
pub struct SimHandle {
    inner: Rc<RefCell<Scheduler>>,
}

impl SimHandle {
    /// Looks up a signal by name.
    pub fn signal(&self, name: &str) -> Result<SignalId, SimError> {
        self.inner.borrow().bank.lookup(name)
    }

    /// Returns the declared name of a signal.
    pub fn signal_name(&self, id: SignalId) -> String {
        self.inner.borrow().bank.get(id).name.clone()
    }

    /// Returns the declared width of a signal.
    pub fn width(&self, id: SignalId) -> u32 {
        self.inner.borrow().bank.get(id).width
    }

    /// Reads the current value of a signal.
    pub fn read(&self, id: SignalId) -> FixedInt {
        self.inner.borrow().bank.value(id)
    }

    /// Reads a signal as a boolean (any bit set).
    pub fn read_bool(&self, id: SignalId) -> bool {
        self.read(id).is_high()
    }

    /// Writes a signal.
    ///
    /// Fails during the read-only phase, on width mismatch, or when another
    /// writer owns the signal.
    pub fn write(&self, id: SignalId, value: FixedInt) -> Result<(), SimError> {
        let mut st = self.inner.borrow_mut();
        if st.phase == Phase::ReadOnly {
            return Err(SimError::ReadOnlyWrite {
                signal: st.bank.get(id).name.clone(),
            });
        }
        let writer = st.writer();
        st.bank.drive(id, value, writer)
    }

    /// Writes a 1-bit signal.
    pub fn write_bool(&self, id: SignalId, value: bool) -> Result<(), SimError> {
        self.write(id, FixedInt::from_bool(value))
    }

    /// Writes an unsigned value that must fit the signal's width.
    pub fn write_unsigned(&self, id: SignalId, value: u64) -> Result<(), SimError> {
        let width = self.width(id);
        self.write(id, FixedInt::from_unsigned(value, width)?)
    }

    /// Current cycle index (incremented after each falling edge).
    pub fn cycle(&self) -> u64 {
        self.inner.borrow().cycle
    }

    /// Timestamp of the current half-cycle.
    pub fn now(&self) -> SimTime {
        self.inner.borrow().time
    }

    /// The most recent clock edge.
    pub fn edge(&self) -> Edge {
        self.inner.borrow().edge
    }

    /// The current scheduling phase.
    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase
    }

    fn trigger(&self, trigger: Trigger) -> TriggerFuture {
        TriggerFuture {
            sim: self.clone(),
            trigger,
            armed: false,
        }
    }

    /// Resolves at the next rising edge, after the DUT has updated.
    pub fn rising_edge(&self) -> TriggerFuture {
        self.trigger(Trigger::RisingEdge)
    }

    /// Resolves at the next falling edge.
    pub fn falling_edge(&self) -> TriggerFuture {
        self.trigger(Trigger::FallingEdge)
    }

    /// Resolves once the current (or, if already there, the next) half-cycle
    /// has settled. Writes are rejected until the next edge.
    pub fn read_only(&self) -> TriggerFuture {
        self.trigger(Trigger::ReadOnly)
    }

    /// Resolves at the next change of `signal`.
    pub fn value_change(&self, signal: SignalId) -> TriggerFuture {
        self.trigger(Trigger::ValueChange(signal))
    }

    /// Waits for `cycles` rising edges.
    pub async fn clock_cycles(&self, cycles: u64) {
        for _ in 0..cycles {
            self.rising_edge().await;
        }
    }

    /// Waits until `condition` holds, checking at the read-only point after
    /// each falling edge.
    ///
    /// Returns the number of cycles waited, or [`SimError::Timeout`] once
    /// `max_cycles` have passed without the condition holding.
    pub async fn wait_until(
        &self,
        max_cycles: u64,
        waiting_for: &str,
        mut condition: impl FnMut() -> bool,
    ) -> Result<u64, SimError> {
        let mut waited = 0;
        loop {
            if condition() {
                return Ok(waited);
            }
            if waited >= max_cycles {
                return Err(SimError::Timeout {
                    waiting_for: waiting_for.to_string(),
                    cycles: max_cycles,
                });
            }
            self.falling_edge().await;
            self.read_only().await;
            waited += 1;
        }
    }

    /// Schedules a new task. It first runs at the next scheduling point.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let mut st = self.inner.borrow_mut();
        let id = TaskId(st.next_task);
        st.next_task += 1;
        let name = name.into();
        trace!(task = id.0, name = %name, "spawned task");
        st.spawned.push(NewTask {
            id,
            name,
            future: Box::pin(future),
        });
        st.ready.push_back(id);
        JoinHandle {
            id,
            sim: self.clone(),
        }
    }
}

/// Future returned by the [`SimHandle`] trigger methods.
///
/// The first poll registers the running task as a waiter and suspends; the
/// kernel polls the task again only when the trigger fires.
#[must_use = "triggers do nothing unless awaited"]
pub struct TriggerFuture {
    sim: SimHandle,
    trigger: Trigger,
    armed: bool,
}

impl Future for TriggerFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.armed {
            return Poll::Ready(());
        }
        let registered = {
            let mut st = self.sim.inner.borrow_mut();
            match st.current {
                Some(task) => {
                    st.waiters.entry(self.trigger).or_default().push(task);
                    true
                }
                None => false,
            }
        };
        self.armed = registered;
        Poll::Pending
    }
}

/// Handle to a spawned task.
#[derive(Clone)]
pub struct JoinHandle {
    id: TaskId,
    sim: SimHandle,
}

impl JoinHandle {
    /// The task's ID.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns `true` once the task has completed successfully.
    pub fn is_finished(&self) -> bool {
        self.sim.inner.borrow().finished.contains(&self.id)
    }

    /// Waits for the task to complete.
    pub async fn join(&self) {
        if !self.is_finished() {
            self.sim.trigger(Trigger::TaskDone(self.id)).await;
        }
    }
}

struct TaskSlot {
    name: String,
    future: BoxedTask,
}

/// The simulation kernel: DUT, signal bank, and task scheduler.
pub struct SimKernel {
    sim: SimHandle,
    dut: Box<dyn Dut>,
    tasks: HashMap<TaskId, TaskSlot>,
    clk: SignalId,
    max_deltas: u32,
    recorder: Option<Box<dyn WaveformRecorder>>,
    total_deltas: u64,
}

impl SimKernel {
    /// Declares the clock and the DUT's ports and prepares an idle scheduler.
    pub fn new(dut: Box<dyn Dut>, config: &SimConfig) -> Result<Self, SimError> {
        let mut bank = SignalBank::new();
        let clk = bank.declare(&config.clock_name, 1, Some(Writer::Kernel))?;
        for port in dut.ports() {
            let owner = match port.direction {
                Direction::Input => None,
                Direction::Output => Some(Writer::Dut),
            };
            bank.declare(&port.name, port.width, owner)?;
        }
        debug!(dut = dut.name(), signals = bank.len(), "kernel constructed");
        let scheduler = Scheduler {
            bank,
            clock: Clock::new(config.clock_period_fs),
            cycle: 0,
            time: SimTime::zero(),
            edge: Edge::Falling,
            phase: Phase::Active,
            current: None,
            waiters: HashMap::new(),
            ready: VecDeque::new(),
            spawned: Vec::new(),
            finished: HashSet::new(),
            next_task: 0,
        };
        Ok(Self {
            sim: SimHandle {
                inner: Rc::new(RefCell::new(scheduler)),
            },
            dut,
            tasks: HashMap::new(),
            clk,
            max_deltas: config.max_deltas,
            recorder: None,
            total_deltas: 0,
        })
    }

    /// Returns a handle for spawning tasks and accessing signals.
    pub fn handle(&self) -> SimHandle {
        self.sim.clone()
    }

    /// Schedules a task; shorthand for [`SimHandle::spawn`].
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        self.sim.spawn(name, future)
    }

    /// The DUT's instance name.
    pub fn dut_name(&self) -> &str {
        self.dut.name()
    }

    /// Number of completed clock cycles.
    pub fn cycle(&self) -> u64 {
        self.sim.cycle()
    }

    /// Total settle iterations that observed at least one change.
    pub fn total_deltas(&self) -> u64 {
        self.total_deltas
    }

    /// Attaches a waveform recorder and dumps the initial value of every signal.
    pub fn set_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        {
            let st = self.sim.inner.borrow();
            recorder.begin_scope(self.dut.name())?;
            for (id, sig) in st.bank.iter() {
                recorder.register_signal(id, &sig.name, sig.width)?;
            }
            recorder.end_scope()?;
            for (id, sig) in st.bank.iter() {
                recorder.record_change(st.time.fs, id, sig.value)?;
            }
        }
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Runs one full clock cycle.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.half_cycle(Edge::Rising)?;
        self.half_cycle(Edge::Falling)?;
        self.sim.inner.borrow_mut().cycle += 1;
        Ok(())
    }

    /// Runs `cycles` clock cycles.
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `condition` holds, checking before each cycle.
    ///
    /// Returns the number of cycles run, or [`SimError::Timeout`] after
    /// `max_cycles` cycles without the condition holding.
    pub fn run_until(
        &mut self,
        max_cycles: u64,
        waiting_for: &str,
        mut condition: impl FnMut(&SimHandle) -> bool,
    ) -> Result<u64, SimError> {
        let mut elapsed = 0;
        while !condition(&self.sim) {
            if elapsed >= max_cycles {
                return Err(SimError::Timeout {
                    waiting_for: waiting_for.to_string(),
                    cycles: max_cycles,
                });
            }
            self.step()?;
            elapsed += 1;
        }
        Ok(elapsed)
    }

    /// Steps until `task` has finished.
    pub fn run_until_complete(
        &mut self,
        task: &JoinHandle,
        max_cycles: u64,
    ) -> Result<u64, SimError> {
        self.adopt_spawned();
        let name = self
            .tasks
            .get(&task.id)
            .map(|slot| slot.name.clone())
            .unwrap_or_else(|| format!("task #{}", task.id.0));
        self.run_until(max_cycles, &name, |_| task.is_finished())
    }

    /// Flushes the waveform recorder, if any.
    pub fn finish(&mut self) -> Result<(), SimError> {
        if let Some(recorder) = &mut self.recorder {
            recorder.finalize()?;
        }
        Ok(())
    }

    fn half_cycle(&mut self, edge: Edge) -> Result<(), SimError> {
        {
            let mut st = self.sim.inner.borrow_mut();
            st.time = st.clock.edge_time(st.cycle, edge);
            st.edge = edge;
            st.phase = Phase::Active;
            st.bank
                .drive(self.clk, FixedInt::from_bool(edge == Edge::Rising), Writer::Kernel)?;
            let trigger = match edge {
                Edge::Rising => {
                    self.dut.on_rising_edge(&mut DutIo::new(&mut st.bank))?;
                    Trigger::RisingEdge
                }
                Edge::Falling => Trigger::FallingEdge,
            };
            st.fire(trigger);
        }
        self.run_ready()?;
        self.settle()?;
        {
            let mut st = self.sim.inner.borrow_mut();
            st.phase = Phase::ReadOnly;
            st.fire(Trigger::ReadOnly);
        }
        self.run_ready()?;
        self.sim.inner.borrow_mut().phase = Phase::Active;
        Ok(())
    }

    fn settle(&mut self) -> Result<(), SimError> {
        for _ in 0..=self.max_deltas {
            let changed = {
                let mut st = self.sim.inner.borrow_mut();
                self.dut.settle(&mut DutIo::new(&mut st.bank))?;
                let changed = st.bank.take_changed();
                if let Some(recorder) = &mut self.recorder {
                    for &id in &changed {
                        recorder.record_change(st.time.fs, id, st.bank.value(id))?;
                    }
                }
                for &id in &changed {
                    st.fire(Trigger::ValueChange(id));
                }
                changed
            };
            if changed.is_empty() {
                return Ok(());
            }
            self.total_deltas += 1;
            self.run_ready()?;
        }
        let cycle = self.sim.cycle();
        debug!(cycle, max_deltas = self.max_deltas, "settle did not converge");
        Err(SimError::DeltaCycleLimit {
            cycle,
            max_deltas: self.max_deltas,
        })
    }

    fn adopt_spawned(&mut self) {
        let spawned = std::mem::take(&mut self.sim.inner.borrow_mut().spawned);
        for task in spawned {
            self.tasks.insert(
                task.id,
                TaskSlot {
                    name: task.name,
                    future: task.future,
                },
            );
        }
    }

    fn run_ready(&mut self) -> Result<(), SimError> {
        self.adopt_spawned();
        loop {
            let next = self.sim.inner.borrow_mut().ready.pop_front();
            let Some(id) = next else {
                return Ok(());
            };
            self.poll_task(id)?;
        }
    }

    fn poll_task(&mut self, id: TaskId) -> Result<(), SimError> {
        let Some(mut slot) = self.tasks.remove(&id) else {
            return Ok(());
        };
        self.sim.inner.borrow_mut().current = Some(id);
        let mut cx = Context::from_waker(Waker::noop());
        let poll = slot.future.as_mut().poll(&mut cx);
        self.sim.inner.borrow_mut().current = None;
        self.adopt_spawned();
        let result = match poll {
            Poll::Pending => {
                self.tasks.insert(id, slot);
                return Ok(());
            }
            Poll::Ready(result) => result,
        };
        {
            let mut st = self.sim.inner.borrow_mut();
            st.bank.release(Writer::Task(id));
            if result.is_ok() {
                st.finished.insert(id);
                st.fire(Trigger::TaskDone(id));
            }
        }
        match &result {
            Ok(()) => trace!(task = id.0, name = %slot.name, "task finished"),
            Err(err) => debug!(task = id.0, name = %slot.name, error = %err, "task failed"),
        }
        result
    }
}

impl Drop for SimKernel {
    fn drop(&mut self) {
        // Pending futures hold handles to the scheduler; drop them outside the borrow.
        let spawned = std::mem::take(&mut self.sim.inner.borrow_mut().spawned);
        drop(spawned);
    }
}
