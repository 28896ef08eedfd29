//! Bound violations on the live loop: overrides, diagnostics, run gate.

use servo_common::bus::{ActuatorId, GroupSelector, TelemetrySource};
use servo_common::safety::ViolationFlags;
use servo_common::time::ManualClock;
use servo_control_unit::command::TickCommandGuard;
use servo_control_unit::cycle::{CycleError, Iteration};

use super::{config, run_for, sim_runner};

#[test]
fn out_of_bounds_position_sends_zero_every_tick() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config("[simulation]\ninitial_position_rad = 4.0"),
        &clock,
    );

    let ticks = run_for(&mut runner, &clock, 100, 1);
    assert_eq!(ticks.len(), 20);
    for tick in &ticks {
        assert_eq!(tick.report.command, 0.0);
        assert!(tick.report.violations.contains(ViolationFlags::POSITION));
    }

    // Commanded zero the whole time: the rotor never moved.
    assert_eq!(runner.bus().position(ActuatorId::default()), 4.0);
    assert_eq!(runner.diagnostics().len(), 20);
    assert!(
        runner
            .diagnostics()
            .iter()
            .all(|line| line.contains("position outside of allowed bounds"))
    );
    assert_eq!(runner.stats().position_violations, 20);
}

#[test]
fn overspeed_zeroes_command_while_it_lasts() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config("[control]\nkd = 10.0"), &clock);
    runner.bus_mut().set_velocity(ActuatorId::default(), 40.0);

    let ticks = run_for(&mut runner, &clock, 500, 1);
    let first = &ticks[0];
    assert_eq!(first.report.command, 0.0);
    assert!(first.report.violations.contains(ViolationFlags::VELOCITY));
    assert!(runner.diagnostics()[0].contains("velocity outside of allowed bounds"));

    for tick in &ticks {
        let t = tick.telemetry;
        if t.velocity_rad_s.abs() > 30.0 || t.position_rad.abs() > 3.141 {
            assert_eq!(tick.report.command, 0.0, "unsafe tick commanded {t:?}");
        }
    }
}

#[test]
fn both_violations_reported_in_one_tick() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config("[simulation]\ninitial_position_rad = -3.5\ninitial_velocity_rad_s = -35.0"),
        &clock,
    );

    let ticks = run_for(&mut runner, &clock, 5, 1);
    let report = &ticks[0].report;
    assert_eq!(report.command, 0.0);
    assert!(report.violations.contains(ViolationFlags::POSITION | ViolationFlags::VELOCITY));
    assert_eq!(runner.diagnostics().len(), 2);
    assert!(runner.diagnostics()[0].contains("position"));
    assert!(runner.diagnostics()[1].contains("velocity"));
}

#[test]
fn reduce_policy_scales_and_recovers() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config(
            r#"
[control]
kd = 10.0

[bounds]
violation_policy = "reduce"
reduction_factor = 0.1

[simulation]
initial_position_rad = 3.5
"#,
        ),
        &clock,
    );

    let ticks = run_for(&mut runner, &clock, 5, 1);
    // -3500 clamps to -2000, then scaled by 0.1.
    assert_eq!(ticks[0].report.command, -200.0);

    run_for(&mut runner, &clock, 5000, 1);
    let position = runner.bus().position(ActuatorId::default());
    assert!(position.abs() < 1e-2, "final position {position}");
}

#[test]
fn closed_run_gate_sends_nothing() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config("[simulation]\ninitial_position_rad = 1.0"),
        &clock,
    );
    runner.run_gate().close();

    assert!(run_for(&mut runner, &clock, 200, 1).is_empty());
    assert_eq!(runner.bus().frames_sent(), 0);
    assert_eq!(runner.bus().position(ActuatorId::default()), 1.0);
    assert_eq!(runner.stats().stopped_iterations, 200);

    runner.run_gate().toggle();
    clock.advance(1);
    assert!(matches!(runner.iterate().unwrap(), Iteration::Ticked(_)));
    assert_eq!(runner.bus().frames_sent(), 1);
}

#[test]
fn stop_mid_run_lets_watchdog_release_current() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config("[simulation]\ninitial_position_rad = 1.0"),
        &clock,
    );
    run_for(&mut runner, &clock, 50, 1);
    assert_ne!(runner.bus().commanded_current(ActuatorId::default()), 0.0);

    runner.run_gate().close();
    run_for(&mut runner, &clock, 150, 1);
    assert_eq!(runner.bus().commanded_current(ActuatorId::default()), 0.0);
}

#[test]
fn duplicate_send_is_not_forwarded() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(""), &clock);
    let m0 = ActuatorId::default();

    let mut guard = TickCommandGuard::new(runner.bus_mut());
    guard
        .send(100.0, m0, GroupSelector::IdsZeroToThree)
        .unwrap();
    assert_eq!(
        guard.send(-100.0, m0, GroupSelector::IdsZeroToThree),
        Err(CycleError::DuplicateCommand { actuator: m0 })
    );
    drop(guard);

    assert_eq!(runner.bus().frames_sent(), 1);
    assert_eq!(runner.bus().commanded_current(m0), 100.0);
}
