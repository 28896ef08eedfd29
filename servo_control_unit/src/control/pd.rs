//! PD controller with velocity damping.
//!
//! The damping term uses measured velocity rather than the derivative of the
//! position error, so a setpoint step produces no derivative kick.
//! Zero Kd disables damping.

use servo_common::control::Gains;

/// Compute one PD command.
///
/// # Arguments
/// - `position`: Measured shaft position [rad].
/// - `velocity`: Measured shaft velocity [rad/s].
/// - `target_position`: Setpoint [rad].
/// - `gains`: Session gains.
/// - `tick_period`: Loop period [ms], scales the damping term.
///
/// # Returns
/// Raw command [mA] (unbounded, the sanitizer clamps it).
#[inline]
pub fn pd_compute(
    position: f64,
    velocity: f64,
    target_position: f64,
    gains: &Gains,
    tick_period: f64,
) -> f64 {
    let error = target_position - position;
    let derivative_term = tick_period * velocity;
    gains.kp * error - gains.kd * derivative_term
}

// ─── Tests ──────────────────────────────────────────────────────────
