//! Tick scheduling under different loop rates.

use servo_common::time::ManualClock;

use super::{config, run_for, sim_runner};

#[test]
fn fast_loop_ticks_once_per_period() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(""), &clock);

    let ticks = run_for(&mut runner, &clock, 1000, 1);
    assert_eq!(ticks.len(), 200);
    assert_eq!(runner.stats().iterations, 1000);
    assert_eq!(runner.stats().skipped_windows, 0);
    assert_eq!(runner.bus().frames_sent(), 200);

    let times: Vec<u64> = ticks.iter().map(|t| t.now_ms).collect();
    assert!(times.windows(2).all(|w| w[1] - w[0] == 5));
}

#[test]
fn jittered_loop_never_ticks_early() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(""), &clock);

    let ticks = run_for(&mut runner, &clock, 999, 3);
    // Ticks land on 6, 12, 18, ... : 3 ms steps round the period up to 6.
    assert_eq!(ticks.len(), 166);
    assert!(ticks.windows(2).all(|w| w[1].now_ms - w[0].now_ms >= 5));
    assert_eq!(runner.stats().skipped_windows, 0);
}

#[test]
fn late_loop_skips_windows_instead_of_bursting() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config(""), &clock);

    let ticks = run_for(&mut runner, &clock, 120, 12);
    assert_eq!(ticks.len(), 10);
    // One missed window per late tick after the first.
    assert_eq!(runner.stats().skipped_windows, 9);
    assert_eq!(runner.gate().last_dispatch_ms(), 120);
}

#[test]
fn configured_period_is_honoured() {
    let clock = ManualClock::new(0);
    let mut runner = sim_runner(&config("[control]\ntick_period_ms = 2"), &clock);

    let ticks = run_for(&mut runner, &clock, 100, 1);
    assert_eq!(ticks.len(), 50);
}

#[test]
fn derivative_term_scales_with_period() {
    // kd·period·velocity with period in ms: doubling the period doubles damping.
    let clock = ManualClock::new(0);
    let doc = |period: u64| {
        format!(
            "[control]\nkp = 0.0\nkd = 2.0\ntick_period_ms = {period}\n\n[simulation]\ninitial_velocity_rad_s = 1.0\ncommand_timeout_ms = 0"
        )
    };

    let mut five = sim_runner(&config(&doc(5)), &clock);
    let first_five = run_for(&mut five, &clock, 5, 1).remove(0);

    let clock = ManualClock::new(0);
    let mut ten = sim_runner(&config(&doc(10)), &clock);
    let first_ten = run_for(&mut ten, &clock, 10, 1).remove(0);

    let per_velocity_five = first_five.raw_command / first_five.telemetry.velocity_rad_s;
    let per_velocity_ten = first_ten.raw_command / first_ten.telemetry.velocity_rad_s;
    assert!((per_velocity_five + 10.0).abs() < 1e-9);
    assert!((per_velocity_ten + 20.0).abs() < 1e-9);
}
