//! Driver, monitor, and backpressure against a small registered FIFO.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wavesense_bfm::{
    BackpressureController, Descriptor, DriverConfig, Framing, IdleGaps, ReadyPolicy, ReadyWindow,
    ResetSpec, StreamDriver, StreamInterface, StreamMonitor,
};
use wavesense_common::FieldSpec;
use wavesense_sim::{Dut, DutIo, Port, SimConfig, SimError, SimKernel};

struct Fifo {
    depth: usize,
    queue: VecDeque<(i64, bool)>,
}

impl Fifo {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            queue: VecDeque::new(),
        }
    }
}

impl Dut for Fifo {
    fn name(&self) -> &str {
        "fifo"
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input("rst", 1),
            Port::input("s_axis_tvalid", 1),
            Port::output("s_axis_tready", 1),
            Port::input("s_axis_tdata", 32),
            Port::input("s_axis_tlast", 1),
            Port::output("m_axis_tvalid", 1),
            Port::input("m_axis_tready", 1),
            Port::output("m_axis_tdata", 32),
            Port::output("m_axis_tlast", 1),
        ]
    }

    fn on_rising_edge(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        if io.read_bool("rst")? {
            self.queue.clear();
            io.write_bool("s_axis_tready", false)?;
            io.write_bool("m_axis_tvalid", false)?;
            return Ok(());
        }
        let accept = io.read_bool("s_axis_tvalid")? && io.read_bool("s_axis_tready")?;
        let emit = io.read_bool("m_axis_tvalid")? && io.read_bool("m_axis_tready")?;
        if emit {
            self.queue.pop_front();
        }
        if accept {
            let data = io.read_signed("s_axis_tdata")?;
            let last = io.read_bool("s_axis_tlast")?;
            self.queue.push_back((data, last));
        }
        let (data, last) = self.queue.front().copied().unwrap_or((0, false));
        io.write_bool("m_axis_tvalid", !self.queue.is_empty())?;
        io.write_signed("m_axis_tdata", data)?;
        io.write_bool("m_axis_tlast", last)?;
        io.write_bool("s_axis_tready", self.queue.len() < self.depth)
    }
}

fn input() -> StreamInterface {
    StreamInterface::axis("s_axis")
        .with_last()
        .packed_lane("i", "s_axis_tdata", FieldSpec::signed(16, 16))
        .packed_lane("q", "s_axis_tdata", FieldSpec::signed(16, 0))
}

fn output() -> StreamInterface {
    StreamInterface::axis("m_axis")
        .with_last()
        .packed_lane("i", "m_axis_tdata", FieldSpec::signed(16, 16))
        .packed_lane("q", "m_axis_tdata", FieldSpec::signed(16, 0))
}

fn ramp(n: i64) -> Vec<Vec<i64>> {
    (0..n).map(|k| vec![k - 50, 3 * k]).collect()
}

struct Bench {
    kernel: SimKernel,
    input: StreamMonitor,
    output: StreamMonitor,
}

fn bench(policy: ReadyPolicy) -> (Bench, BackpressureController) {
    let kernel = SimKernel::new(Box::new(Fifo::new(4)), &SimConfig::default()).unwrap();
    let sim = kernel.handle();
    let input = StreamMonitor::attach(&sim, &input()).unwrap();
    let output = StreamMonitor::attach(&sim, &output()).unwrap();
    let bp = BackpressureController::attach(&sim, "m_axis_tready", policy).unwrap();
    (
        Bench {
            kernel,
            input,
            output,
        },
        bp,
    )
}

fn run_burst(policy: ReadyPolicy, descriptor: Descriptor, config: DriverConfig) -> Bench {
    let (mut b, _bp) = bench(policy);
    let expected = descriptor.len() as u64;
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), config).unwrap();
    let accepted = driver.accepted();
    let task = driver.spawn(vec![descriptor]);
    b.kernel.run_until_complete(&task, 5_000).unwrap();
    let output = b.output.clone();
    b.kernel
        .run_until(500, "output drain", |_| output.transactions() == expected)
        .unwrap();
    assert_eq!(accepted.get(), expected);
    assert_eq!(b.input.transactions(), expected);
    b
}

#[test]
fn every_beat_arrives_once_in_order() {
    let beats = ramp(100);
    let b = run_burst(
        ReadyPolicy::Random {
            p_ready: 0.4,
            seed: 11,
        },
        Descriptor::burst(beats.clone()),
        DriverConfig::default(),
    );
    assert_eq!(b.output.beats(), beats);
    assert_eq!(b.input.beats(), beats);
    assert_eq!(b.output.lane("q").unwrap(), (0..100).map(|k| 3 * k).collect::<Vec<_>>());
    assert!(b.output.lane("x").is_none());
}

#[test]
fn output_does_not_depend_on_backpressure_or_gaps() {
    let beats = ramp(64);
    let reference = run_burst(
        ReadyPolicy::Always,
        Descriptor::burst(beats.clone()),
        DriverConfig::default(),
    )
    .output
    .frames();
    for seed in 0..4 {
        let config = DriverConfig {
            idle_gaps: Some(IdleGaps {
                probability: 0.3,
                max_cycles: 3,
                seed,
            }),
            ..DriverConfig::default()
        };
        let b = run_burst(
            ReadyPolicy::Random { p_ready: 0.5, seed },
            Descriptor::burst(beats.clone()),
            config,
        );
        assert_eq!(b.output.frames(), reference, "seed {seed}");
    }
}

#[test]
fn scripted_backpressure_still_delivers_everything() {
    let policy = ReadyPolicy::Scripted {
        windows: vec![
            ReadyWindow::on(3),
            ReadyWindow::off(12),
            ReadyWindow::on(2),
            ReadyWindow::off(5),
        ],
    };
    let beats = ramp(30);
    let b = run_burst(policy, Descriptor::burst(beats.clone()), DriverConfig::default());
    assert_eq!(b.output.beats(), beats);
}

#[test]
fn frames_follow_last() {
    let b = run_burst(
        ReadyPolicy::Always,
        Descriptor::Burst {
            beats: ramp(35),
            framing: Framing::Every(10),
        },
        DriverConfig::default(),
    );
    let frames = b.output.frames();
    assert_eq!(frames.len(), 3 + 1);
    assert!(frames[..3].iter().all(|f| f.is_closed() && f.len() == 10));
    assert_eq!(frames[3].len(), 5);
    assert!(!frames[3].is_closed());
}

#[test]
fn blocked_output_stalls_the_driver() {
    let (mut b, _bp) = bench(ReadyPolicy::Never);
    let config = DriverConfig {
        stall_budget: 20,
        ..DriverConfig::default()
    };
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), config).unwrap();
    let accepted = driver.accepted();
    let task = driver.spawn(vec![Descriptor::burst(ramp(10))]);
    let err = b.kernel.run_until_complete(&task, 1_000).unwrap_err();
    assert!(matches!(
        err,
        SimError::ProtocolStall { ref interface, cycles: 20 } if interface == "s_axis"
    ));
    assert_eq!(accepted.get(), 4);
    assert_eq!(b.output.transactions(), 0);
}

#[test]
fn released_backpressure_resumes_flow() {
    let (mut b, bp) = bench(ReadyPolicy::Never);
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), DriverConfig::default()).unwrap();
    let task = driver.spawn(vec![Descriptor::burst(ramp(12))]);
    b.kernel.run_cycles(30).unwrap();
    assert_eq!(b.output.transactions(), 0);
    bp.set_ready(true);
    b.kernel.run_until_complete(&task, 100).unwrap();
    b.kernel.run_cycles(10).unwrap();
    assert_eq!(b.output.beats(), ramp(12));
    assert!(bp.deasserted_cycles() >= 30);
    assert!(bp.asserted_cycles() > 0);
}

#[test]
fn wide_values_are_rejected_before_driving() {
    let (mut b, _bp) = bench(ReadyPolicy::Always);
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), DriverConfig::default()).unwrap();
    let task = driver.spawn(vec![Descriptor::single(vec![70_000, 0])]);
    let err = b.kernel.run_until_complete(&task, 10).unwrap_err();
    assert!(matches!(err, SimError::Codec(_)));
}

#[test]
fn beat_shape_must_match_lanes() {
    let (mut b, _bp) = bench(ReadyPolicy::Always);
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), DriverConfig::default()).unwrap();
    let task = driver.spawn(vec![Descriptor::single(vec![1])]);
    let err = b.kernel.run_until_complete(&task, 10).unwrap_err();
    assert_eq!(
        err.to_string(),
        "protocol error on 's_axis': beat has 1 fields, interface has 2 lanes"
    );
}

#[test]
fn subscribers_run_in_order_for_each_transaction() {
    let (mut b, _bp) = bench(ReadyPolicy::Always);
    let log = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second"] {
        let log = log.clone();
        b.output
            .subscribe(move |t| log.borrow_mut().push((t.index, tag)));
    }
    let driver = StreamDriver::new(&b.kernel.handle(), &input(), DriverConfig::default()).unwrap();
    let task = driver.spawn(vec![Descriptor::burst(ramp(2))]);
    b.kernel.run_until_complete(&task, 50).unwrap();
    b.kernel.run_cycles(10).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![(0, "first"), (0, "second"), (1, "first"), (1, "second")]
    );
}

#[test]
fn reset_holds_ready_low_then_releases() {
    let (mut b, _bp) = bench(ReadyPolicy::Always);
    let sim = b.kernel.handle();
    let ready = sim.signal("s_axis_tready").unwrap();
    let reset = ResetSpec::active_high("rst", 3).spawn(&sim).unwrap();
    b.kernel.run_until_complete(&reset, 10).unwrap();
    assert!(!sim.read_bool(ready));
    b.kernel.step().unwrap();
    assert!(sim.read_bool(ready));

    let driver = StreamDriver::new(&sim, &input(), DriverConfig::default()).unwrap();
    let task = driver.spawn(vec![Descriptor::burst(ramp(5))]);
    b.kernel.run_until_complete(&task, 50).unwrap();
    b.kernel.run_cycles(5).unwrap();
    assert_eq!(b.output.beats(), ramp(5));
}
