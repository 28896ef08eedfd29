//! Safety bounds and the diagnostics raised when they are violated.
//!
//! [`SafetyBounds`] is the `[bounds]` config section. The sanitizer in the
//! control unit consumes it by value and reports each violation as a
//! structured [`Diagnostic`] instead of printing it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consts::{
    MAX_CURRENT_MA_DEFAULT, MAX_POSITION_RAD_DEFAULT, MAX_VELOCITY_RAD_S_DEFAULT,
    REDUCTION_FACTOR_DEFAULT,
};

/// What happens to the command when position or velocity leaves its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Force the command to zero.
    #[default]
    Zero,
    /// Scale the (already clamped) command by `reduction_factor`.
    Reduce,
}

/// `[bounds]` section. All limits are symmetric around zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyBounds {
    /// Command clamp [mA] (default: 2000).
    #[serde(default = "default_max_current")]
    pub max_current_ma: f64,

    /// Position bound [rad] (default: 3.141).
    #[serde(default = "default_max_position")]
    pub max_position_rad: f64,

    /// Velocity bound [rad/s] (default: 30).
    #[serde(default = "default_max_velocity")]
    pub max_velocity_rad_s: f64,

    /// Scale applied under [`ViolationPolicy::Reduce`] (default: 0.1).
    #[serde(default = "default_reduction_factor")]
    pub reduction_factor: f64,

    /// Response to a position/velocity violation (default: zero).
    #[serde(default)]
    pub violation_policy: ViolationPolicy,
}

fn default_max_current() -> f64 {
    MAX_CURRENT_MA_DEFAULT
}
fn default_max_position() -> f64 {
    MAX_POSITION_RAD_DEFAULT
}
fn default_max_velocity() -> f64 {
    MAX_VELOCITY_RAD_S_DEFAULT
}
fn default_reduction_factor() -> f64 {
    REDUCTION_FACTOR_DEFAULT
}

impl Default for SafetyBounds {
    fn default() -> Self {
        Self {
            max_current_ma: MAX_CURRENT_MA_DEFAULT,
            max_position_rad: MAX_POSITION_RAD_DEFAULT,
            max_velocity_rad_s: MAX_VELOCITY_RAD_S_DEFAULT,
            reduction_factor: REDUCTION_FACTOR_DEFAULT,
            violation_policy: ViolationPolicy::Zero,
        }
    }
}

impl SafetyBounds {
    /// Every maximum must be finite and > 0; `reduction_factor` in [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("max_current_ma", self.max_current_ma),
            ("max_position_rad", self.max_position_rad),
            ("max_velocity_rad_s", self.max_velocity_rad_s),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be > 0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.reduction_factor) {
            return Err(ConfigError::ValidationError(format!(
                "reduction_factor {} out of range [0, 1]",
                self.reduction_factor
            )));
        }
        Ok(())
    }
}

bitflags! {
    /// Summary of the bounds a single sanitizer pass tripped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViolationFlags: u8 {
        /// Command exceeded `max_current_ma` and was clamped.
        const CURRENT  = 0x01;
        /// Position outside `±max_position_rad`.
        const POSITION = 0x02;
        /// Velocity outside `±max_velocity_rad_s`.
        const VELOCITY = 0x04;
    }
}

impl ViolationFlags {
    /// Violations that override the command (zero or reduce).
    pub const OVERRIDING: Self =
        Self::from_bits_truncate(Self::POSITION.bits() | Self::VELOCITY.bits());
}

impl Default for ViolationFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Diagnostic severity, mapped onto log levels by the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Which bound a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    CurrentClamped,
    PositionOutOfBounds,
    VelocityOutOfBounds,
}

impl DiagnosticKind {
    pub const fn severity(self) -> Severity {
        match self {
            Self::CurrentClamped => Severity::Warning,
            Self::PositionOutOfBounds | Self::VelocityOutOfBounds => Severity::Error,
        }
    }

    pub const fn flag(self) -> ViolationFlags {
        match self {
            Self::CurrentClamped => ViolationFlags::CURRENT,
            Self::PositionOutOfBounds => ViolationFlags::POSITION,
            Self::VelocityOutOfBounds => ViolationFlags::VELOCITY,
        }
    }

    /// Fixed operator-facing message.
    pub const fn message(self) -> &'static str {
        match self {
            Self::CurrentClamped => "Actuator current command clamped to allowed bounds.",
            Self::PositionOutOfBounds => "Actuator position outside of allowed bounds.",
            Self::VelocityOutOfBounds => {
                "Actuator velocity outside of allowed bounds. Setting torque to 0."
            }
        }
    }
}

/// One bound violation observed during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The offending input (command, position or velocity).
    pub value: f64,
    /// The bound it was checked against.
    pub limit: f64,
}

impl Diagnostic {
    #[inline]
    pub const fn new(kind: DiagnosticKind, value: f64, limit: f64) -> Self {
        Self { kind, value, limit }
    }

    #[inline]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity() {
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        };
        write!(
            f,
            "{prefix}: {} (value={:.3}, limit=±{:.3})",
            self.kind.message(),
            self.value,
            self.limit
        )
    }
}
