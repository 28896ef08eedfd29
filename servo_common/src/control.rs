//! Control types shared between the control unit and bus drivers.
//!
//! Defines the telemetry snapshot, PD gains, the selectable control law and
//! the `[control]` config section.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

use crate::config::ConfigError;
use crate::consts::{
    BANG_BANG_MAGNITUDE_MA_DEFAULT, KD_DEFAULT, KP_DEFAULT, TARGET_POSITION_DEFAULT,
    TICK_PERIOD_MS_DEFAULT, TICK_PERIOD_MS_MAX, TICK_PERIOD_MS_MIN,
};

/// One telemetry snapshot for a single actuator.
///
/// Owned by the tick that read it; never retained across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Telemetry {
    /// Shaft position [rad].
    pub position_rad: f64,
    /// Shaft velocity [rad/s].
    pub velocity_rad_s: f64,
}

const_assert_eq!(core::mem::size_of::<Telemetry>(), 16);

impl Telemetry {
    #[inline]
    pub const fn new(position_rad: f64, velocity_rad_s: f64) -> Self {
        Self {
            position_rad,
            velocity_rad_s,
        }
    }
}

/// PD gains. Fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    /// Proportional gain [mA/rad].
    pub kp: f64,
    /// Derivative (velocity damping) gain [mA/(rad/s·ms)].
    pub kd: f64,
}

fn default_kp() -> f64 {
    KP_DEFAULT
}
fn default_kd() -> f64 {
    KD_DEFAULT
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            kp: KP_DEFAULT,
            kd: KD_DEFAULT,
        }
    }
}

/// Control law applied every tick.
///
/// ```toml
/// [control.law]
/// kind = "bang_bang"
/// magnitude_ma = 800.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlLaw {
    /// Proportional-derivative law on position error and velocity.
    #[default]
    Pd,
    /// Fixed-magnitude output pushing towards the target.
    BangBang {
        #[serde(default = "default_bang_bang_magnitude")]
        magnitude_ma: f64,
    },
}

fn default_bang_bang_magnitude() -> f64 {
    BANG_BANG_MAGNITUDE_MA_DEFAULT
}

/// `[control]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Minimum time between dispatched ticks [ms] (default: 5).
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Proportional gain [mA/rad] (default: 1000.0).
    #[serde(default = "default_kp")]
    pub kp: f64,

    /// Derivative gain (default: 0.0).
    #[serde(default = "default_kd")]
    pub kd: f64,

    /// Position setpoint [rad] (default: 0.0).
    #[serde(default = "default_target_position")]
    pub target_position_rad: f64,

    /// Control law (default: PD).
    #[serde(default)]
    pub law: ControlLaw,
}

fn default_tick_period_ms() -> u64 {
    TICK_PERIOD_MS_DEFAULT
}
fn default_target_position() -> f64 {
    TARGET_POSITION_DEFAULT
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: TICK_PERIOD_MS_DEFAULT,
            kp: KP_DEFAULT,
            kd: KD_DEFAULT,
            target_position_rad: TARGET_POSITION_DEFAULT,
            law: ControlLaw::default(),
        }
    }
}

impl ControlConfig {
    /// Session gains.
    #[inline]
    pub const fn gains(&self) -> Gains {
        Gains {
            kp: self.kp,
            kd: self.kd,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(TICK_PERIOD_MS_MIN..=TICK_PERIOD_MS_MAX).contains(&self.tick_period_ms) {
            return Err(ConfigError::ValidationError(format!(
                "tick_period_ms {} out of range [{}, {}]",
                self.tick_period_ms, TICK_PERIOD_MS_MIN, TICK_PERIOD_MS_MAX
            )));
        }
        if !self.kp.is_finite() || !self.kd.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "gains must be finite (kp={}, kd={})",
                self.kp, self.kd
            )));
        }
        if !self.target_position_rad.is_finite() {
            return Err(ConfigError::ValidationError(
                "target_position_rad must be finite".to_string(),
            ));
        }
        if let ControlLaw::BangBang { magnitude_ma } = self.law {
            if !(magnitude_ma.is_finite() && magnitude_ma > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "bang-bang magnitude_ma must be > 0, got {magnitude_ma}"
                )));
            }
        }
        Ok(())
    }
}
