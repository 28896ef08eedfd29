//! Startup: shipped config, wall-clock run and shutdown.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use servo_common::bus::{ActuatorId, TelemetrySource};
use servo_common::control::ControlLaw;
use servo_common::time::MonotonicClock;
use servo_control_unit::config::load_config;
use servo_control_unit::cycle::{CycleRunner, RunGate};
use servo_hal::SimulationBus;

fn shipped_config_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config/servo.toml"))
}

#[test]
fn shipped_config_loads() {
    let cfg = load_config(shipped_config_path()).unwrap();
    assert_eq!(cfg.control.tick_period_ms, 5);
    assert_eq!(cfg.control.kp, 1000.0);
    assert_eq!(cfg.control.law, ControlLaw::Pd);
    assert_eq!(cfg.bounds.max_current_ma, 2000.0);
    assert_eq!(cfg.simulation.initial_position_rad, 1.0);
}

#[test]
fn wall_clock_run_ticks_and_shuts_down() {
    let cfg = load_config(shipped_config_path()).unwrap();
    let clock = MonotonicClock::new();
    let bus = SimulationBus::new(&cfg.simulation, clock);
    let mut runner = CycleRunner::new(&cfg, bus, Vec::<String>::new(), clock, RunGate::new(true));

    let running = AtomicBool::new(true);
    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(100));
            running.store(false, Ordering::SeqCst);
        });
        runner
            .run(&running, Duration::from_micros(100))
            .unwrap();
    });

    let stats = runner.stats();
    assert!(stats.ticks > 0);
    assert!(stats.iterations >= stats.ticks);
    assert!(stats.max_iteration_ns > 0);
    assert!(runner.bus().is_shut_down());
    assert_eq!(runner.bus().commanded_current(ActuatorId::default()), 0.0);
    // Moved towards the setpoint from its 1.0 rad start.
    assert!(runner.bus().position(ActuatorId::default()) < 1.0);
}

#[test]
fn stopped_wall_clock_run_sends_nothing() {
    let cfg = load_config(shipped_config_path()).unwrap();
    let clock = MonotonicClock::new();
    let bus = SimulationBus::new(&cfg.simulation, clock);
    let gate = RunGate::new(false);
    let mut runner = CycleRunner::new(&cfg, bus, Vec::<String>::new(), clock, gate);

    let running = AtomicBool::new(true);
    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(30));
            running.store(false, Ordering::SeqCst);
        });
        runner.run(&running, Duration::from_micros(200)).unwrap();
    });

    assert_eq!(runner.stats().ticks, 0);
    assert_eq!(runner.bus().frames_sent(), 0);
    assert!(runner.stats().stopped_iterations > 0);
}
