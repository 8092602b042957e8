//! End-to-end kernel run with VCD capture.

use wavesense_sim::{open_vcd, Dut, DutIo, Port, SimConfig, SimError, SimKernel};

/// Registered toggle flip-flop with an enable.
struct Toggle {
    q: bool,
}

impl Dut for Toggle {
    fn name(&self) -> &str {
        "toggle"
    }

    fn ports(&self) -> Vec<Port> {
        vec![Port::input("en", 1), Port::output("q", 1), Port::output("nq", 1)]
    }

    fn on_rising_edge(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        if io.read_bool("en")? {
            self.q = !self.q;
        }
        io.write_bool("q", self.q)
    }

    fn settle(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        let q = io.read_bool("q")?;
        io.write_bool("nq", !q)
    }
}

#[test]
fn vcd_records_clock_and_registers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toggle.vcd");

    let mut kernel = SimKernel::new(Box::new(Toggle { q: false }), &SimConfig::default()).unwrap();
    kernel.set_recorder(open_vcd(&path).unwrap()).unwrap();
    let sim = kernel.handle();
    let en = sim.signal("en").unwrap();
    let task_sim = sim.clone();
    kernel.spawn("enable", async move {
        task_sim.falling_edge().await;
        task_sim.write_bool(en, true)
    });
    kernel.run_cycles(4).unwrap();
    kernel.finish().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("$scope module toggle $end"));
    assert!(text.contains("$var wire 1 ! clk $end"));
    assert!(text.contains("$var wire 1 \" en $end"));
    // Rising edges at 0, 10, 20, 30 ns and falling edges half a period later.
    for stamp in ["#0\n", "#5000000\n", "#10000000\n", "#35000000\n"] {
        assert!(text.contains(stamp), "missing timestamp {stamp:?}");
    }
    // `q` toggles at 10, 20 and 30 ns; `nq` follows combinationally.
    assert!(sim.read_bool(sim.signal("q").unwrap()));
    assert!(!sim.read_bool(sim.signal("nq").unwrap()));
}

#[test]
fn combinational_output_settles_within_the_edge() {
    let mut kernel = SimKernel::new(Box::new(Toggle { q: false }), &SimConfig::default()).unwrap();
    let sim = kernel.handle();
    let en = sim.signal("en").unwrap();
    let q = sim.signal("q").unwrap();
    let nq = sim.signal("nq").unwrap();
    let task_sim = sim.clone();
    let violations = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = violations.clone();
    kernel.spawn("checker", async move {
        task_sim.write_bool(en, true)?;
        for _ in 0..6 {
            task_sim.rising_edge().await;
            task_sim.read_only().await;
            if task_sim.read_bool(q) == task_sim.read_bool(nq) {
                counter.set(counter.get() + 1);
            }
        }
        Ok(())
    });
    kernel.run_cycles(8).unwrap();
    assert_eq!(violations.get(), 0);
    assert!(kernel.total_deltas() > 0);
}
