//! Control law dispatch.
//!
//! Turns one telemetry snapshot into a raw command using the session's
//! configured [`ControlLaw`]. The result is unbounded; the sanitizer runs
//! next.

use servo_common::control::{ControlLaw, Gains, Telemetry};

use super::pd::pd_compute;

/// Input needed by the control law for one tick.
#[derive(Debug, Clone, Copy)]
pub struct LawInput {
    pub telemetry: Telemetry,
    /// Setpoint [rad].
    pub target_position: f64,
    pub gains: Gains,
    /// Loop period [ms].
    pub tick_period: f64,
}

/// Compute the raw command [mA] for one tick.
#[inline]
pub fn compute_command(law: &ControlLaw, input: &LawInput) -> f64 {
    match *law {
        ControlLaw::Pd => pd_compute(
            input.telemetry.position_rad,
            input.telemetry.velocity_rad_s,
            input.target_position,
            &input.gains,
            input.tick_period,
        ),
        ControlLaw::BangBang { magnitude_ma } => {
            bang_bang(input.telemetry.position_rad, input.target_position, magnitude_ma)
        }
    }
}

/// Full positive output below the target, full negative at or above it.
#[inline]
pub fn bang_bang(position: f64, target_position: f64, magnitude: f64) -> f64 {
    if position < target_position {
        magnitude
    } else {
        -magnitude
    }
}
