//! Algebraic properties of the control law, sanitizer and scheduler gate.

use proptest::prelude::*;
use servo_common::control::Gains;
use servo_common::safety::SafetyBounds;
use servo_control_unit::control::pd::pd_compute;
use servo_control_unit::cycle::TickGate;
use servo_control_unit::safety::sanitize::sanitize;

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6
}

fn gain() -> impl Strategy<Value = f64> {
    0.0..5000.0
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn equilibrium_gives_zero(x in finite(), kp in gain(), kd in gain(), period in 1u64..100) {
        let out = pd_compute(x, 0.0, x, &Gains { kp, kd }, period as f64);
        prop_assert_eq!(out, 0.0);
    }

    #[test]
    fn linear_in_kp(pos in finite(), target in finite(), a in gain(), b in gain()) {
        let f = |kp| pd_compute(pos, 0.0, target, &Gains { kp, kd: 0.0 }, 5.0);
        prop_assert!(close(f(a + b), f(a) + f(b)));
    }

    #[test]
    fn linear_in_kd(vel in finite(), a in gain(), b in gain()) {
        let f = |kd| pd_compute(0.0, vel, 0.0, &Gains { kp: 0.0, kd }, 5.0);
        prop_assert!(close(f(a + b), f(a) + f(b)));
    }

    #[test]
    fn output_never_exceeds_current_bound(
        cmd in any::<f64>(),
        pos in any::<f64>(),
        vel in any::<f64>(),
        max in 1.0f64..10_000.0,
    ) {
        let bounds = SafetyBounds { max_current_ma: max, ..Default::default() };
        let out = sanitize(cmd, pos, vel, bounds).command;
        prop_assert!(out.is_finite());
        prop_assert!(out.abs() <= max);
    }

    #[test]
    fn position_outside_bounds_forces_zero(
        cmd in finite(),
        excess in 1e-6f64..100.0,
        negative in any::<bool>(),
        vel in -29.0f64..29.0,
    ) {
        let bounds = SafetyBounds::default();
        let magnitude = bounds.max_position_rad + excess;
        let pos = if negative { -magnitude } else { magnitude };
        prop_assert_eq!(sanitize(cmd, pos, vel, bounds).command, 0.0);
    }

    #[test]
    fn velocity_outside_bounds_forces_zero(
        cmd in finite(),
        pos in -3.0f64..3.0,
        excess in 1e-6f64..100.0,
        negative in any::<bool>(),
    ) {
        let bounds = SafetyBounds::default();
        let magnitude = bounds.max_velocity_rad_s + excess;
        let vel = if negative { -magnitude } else { magnitude };
        prop_assert_eq!(sanitize(cmd, pos, vel, bounds).command, 0.0);
    }

    #[test]
    fn sanitize_is_idempotent(cmd in any::<f64>(), pos in any::<f64>(), vel in any::<f64>()) {
        let bounds = SafetyBounds::default();
        let once = sanitize(cmd, pos, vel, bounds).command;
        let twice = sanitize(once, pos, vel, bounds).command;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn gate_fires_at_most_ceil_t_over_period(
        period in 1u64..50,
        start in 0u64..10_000,
        steps in prop::collection::vec(0u64..20, 0..500),
    ) {
        let mut gate = TickGate::with_last_dispatch(period, start);
        let mut now = start;
        let mut fired = 0u64;
        for step in steps {
            now += step;
            if gate.should_tick(now) {
                gate.dispatch(now);
                fired += 1;
            }
        }
        let elapsed = now - start;
        prop_assert!(fired <= elapsed.div_ceil(period));
    }
}
