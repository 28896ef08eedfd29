//! Rotor physics.
//!
//! A single rigid inertia driven by motor current against viscous damping:
//!
//! ```text
//! J·dω/dt = Kt·i − b·ω
//! dθ/dt   = ω
//! ```
//!
//! Integrated with semi-implicit Euler in sub-steps of at most
//! `max_step_s`, so a long gap between polls stays stable.

use serde::{Deserialize, Serialize};
use servo_common::config::ConfigError;

/// Default output-side inertia [kg·m²].
pub const INERTIA_DEFAULT: f64 = 0.001;
/// Default viscous damping [N·m·s/rad].
pub const DAMPING_DEFAULT: f64 = 0.002;
/// Default torque constant at the output shaft [N·m/A].
pub const TORQUE_CONSTANT_DEFAULT: f64 = 0.18;
/// Default integration sub-step [s].
pub const MAX_STEP_S_DEFAULT: f64 = 0.001;

/// Mechanical parameters of one simulated actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotorParams {
    /// Rotor plus load inertia [kg·m²] (default: 0.001).
    #[serde(default = "default_inertia")]
    pub inertia_kg_m2: f64,

    /// Viscous damping [N·m·s/rad] (default: 0.002).
    #[serde(default = "default_damping")]
    pub damping_nm_s_per_rad: f64,

    /// Torque per amp of commanded current [N·m/A] (default: 0.18).
    #[serde(default = "default_torque_constant")]
    pub torque_constant_nm_per_a: f64,

    /// Longest single integration step [s] (default: 0.001).
    #[serde(default = "default_max_step")]
    pub max_step_s: f64,
}

fn default_inertia() -> f64 {
    INERTIA_DEFAULT
}
fn default_damping() -> f64 {
    DAMPING_DEFAULT
}
fn default_torque_constant() -> f64 {
    TORQUE_CONSTANT_DEFAULT
}
fn default_max_step() -> f64 {
    MAX_STEP_S_DEFAULT
}

impl Default for RotorParams {
    fn default() -> Self {
        Self {
            inertia_kg_m2: INERTIA_DEFAULT,
            damping_nm_s_per_rad: DAMPING_DEFAULT,
            torque_constant_nm_per_a: TORQUE_CONSTANT_DEFAULT,
            max_step_s: MAX_STEP_S_DEFAULT,
        }
    }
}

impl RotorParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.inertia_kg_m2.is_finite() && self.inertia_kg_m2 > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "inertia_kg_m2 must be > 0, got {}",
                self.inertia_kg_m2
            )));
        }
        if !(self.damping_nm_s_per_rad.is_finite() && self.damping_nm_s_per_rad >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "damping_nm_s_per_rad must be >= 0, got {}",
                self.damping_nm_s_per_rad
            )));
        }
        if !self.torque_constant_nm_per_a.is_finite() {
            return Err(ConfigError::ValidationError(
                "torque_constant_nm_per_a must be finite".to_string(),
            ));
        }
        if !(self.max_step_s.is_finite() && self.max_step_s > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "max_step_s must be > 0, got {}",
                self.max_step_s
            )));
        }
        Ok(())
    }
}

/// State of one simulated actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotorModel {
    params: RotorParams,
    position_rad: f64,
    velocity_rad_s: f64,
    current_ma: f64,
}

impl RotorModel {
    pub fn new(params: RotorParams) -> Self {
        Self {
            params,
            position_rad: 0.0,
            velocity_rad_s: 0.0,
            current_ma: 0.0,
        }
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position_rad
    }

    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity_rad_s
    }

    /// Current the motor controller is regulating to [mA].
    #[inline]
    pub fn current(&self) -> f64 {
        self.current_ma
    }

    pub fn set_position(&mut self, position_rad: f64) {
        self.position_rad = position_rad;
    }

    pub fn set_velocity(&mut self, velocity_rad_s: f64) {
        self.velocity_rad_s = velocity_rad_s;
    }

    pub fn set_current(&mut self, current_ma: f64) {
        self.current_ma = current_ma;
    }

    /// Shaft torque at the present current and velocity [N·m].
    #[inline]
    pub fn torque(&self) -> f64 {
        self.params.torque_constant_nm_per_a * (self.current_ma / 1000.0)
            - self.params.damping_nm_s_per_rad * self.velocity_rad_s
    }

    /// Advance the model by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }
        let mut remaining = dt_s;
        while remaining > 0.0 {
            let h = remaining.min(self.params.max_step_s);
            let accel = self.torque() / self.params.inertia_kg_m2;
            self.velocity_rad_s += accel * h;
            self.position_rad += self.velocity_rad_s * h;
            remaining -= h;
        }
    }
}
