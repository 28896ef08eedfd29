//! Closed-loop behaviour against the simulated rotor.
//!
//! Plant: J = 0.001 kg·m², b = 0.002 N·m·s/rad, Kt = 0.18 N·m/A. With
//! kp = 1000 mA/rad and kd = 10 the loop is damped at roughly ζ ≈ 0.4 and
//! settles well inside three seconds.

use servo_common::bus::{ActuatorId, TelemetrySource};
use servo_common::time::ManualClock;

use super::{config, run_for, sim_runner};

const DAMPED: &str = r#"
[control]
kp = 1000.0
kd = 10.0

[simulation]
initial_position_rad = 1.0
"#;

#[test]
fn pd_converges_to_setpoint() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(DAMPED), &clock);

    let ticks = run_for(&mut runner, &clock, 3000, 1);
    assert_eq!(ticks.len(), 600);

    let m0 = ActuatorId::default();
    let position = runner.bus().position(m0);
    let velocity = runner.bus().velocity(m0);
    assert!(position.abs() < 1e-3, "final position {position}");
    assert!(velocity.abs() < 1e-2, "final velocity {velocity}");
    assert!(runner.diagnostics().is_empty());
}

#[test]
fn first_command_pulls_towards_target() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(DAMPED), &clock);

    let ticks = run_for(&mut runner, &clock, 5, 1);
    assert_eq!(ticks.len(), 1);
    let first = &ticks[0];
    // 1 rad above target 0 → -1000 mA; the rotor has not moved yet.
    assert!(first.report.command < -900.0 && first.report.command >= -1000.0);
    assert!(first.report.is_clean());
}

#[test]
fn setpoint_change_is_tracked() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config(
            r#"
[control]
kp = 1000.0
kd = 10.0
"#,
        ),
        &clock,
    );

    run_for(&mut runner, &clock, 100, 1);
    runner.set_target(0.5);
    run_for(&mut runner, &clock, 3000, 1);

    let position = runner.bus().position(ActuatorId::default());
    assert!((position - 0.5).abs() < 1e-3, "final position {position}");
}

#[test]
fn saturated_start_clamps_without_diagnostics() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config(
            r#"
[control]
kp = 1000.0
kd = 10.0
target_position_rad = 2.8

[bounds]
max_current_ma = 1500.0
"#,
        ),
        &clock,
    );

    let ticks = run_for(&mut runner, &clock, 5, 1);
    assert_eq!(ticks[0].raw_command, 2800.0);
    assert_eq!(ticks[0].report.command, 1500.0);
    assert!(runner.diagnostics().is_empty());
    assert_eq!(runner.stats().clamped_ticks, 1);
}

#[test]
fn bang_bang_holds_fixed_magnitude_and_crosses_target() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config(
            r#"
[control.law]
kind = "bang_bang"
magnitude_ma = 800.0

[simulation]
initial_position_rad = 1.0
"#,
        ),
        &clock,
    );

    let ticks = run_for(&mut runner, &clock, 1000, 1);
    assert!(ticks.iter().all(|t| t.report.command.abs() == 800.0));
    assert_eq!(ticks[0].report.command, -800.0);

    let crossed = ticks
        .windows(2)
        .any(|w| w[0].telemetry.position_rad > 0.0 && w[1].telemetry.position_rad <= 0.0);
    assert!(crossed);
    assert!(
        ticks
            .iter()
            .all(|t| t.telemetry.position_rad.abs() <= 1.0 + 1e-9)
    );
}

#[test]
fn selected_actuator_in_upper_group_is_driven() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(
        &config(
            r#"
[actuator]
id = 6

[control]
kd = 10.0

[simulation]
initial_position_rad = 0.5
"#,
        ),
        &clock,
    );

    run_for(&mut runner, &clock, 3000, 1);
    let m6 = ActuatorId::new(6).unwrap();
    let m0 = ActuatorId::default();
    assert!(runner.bus().position(m6).abs() < 1e-3);
    // Never commanded: keeps its initial position.
    assert_eq!(runner.bus().position(m0), 0.5);
}
