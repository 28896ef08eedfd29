//! System-wide constants for the servo workspace.
//!
//! Single source of truth for numeric defaults and limits.
//! Imported by all crates, never duplicated.

use static_assertions::const_assert;

/// Default control tick period [ms].
pub const TICK_PERIOD_MS_DEFAULT: u64 = 5;

/// Minimum configurable tick period [ms].
pub const TICK_PERIOD_MS_MIN: u64 = 1;

/// Maximum configurable tick period [ms].
pub const TICK_PERIOD_MS_MAX: u64 = 1000;

/// Default proportional gain [mA/rad].
pub const KP_DEFAULT: f64 = 1000.0;

/// Default derivative gain.
pub const KD_DEFAULT: f64 = 0.0;

/// Default position setpoint [rad].
pub const TARGET_POSITION_DEFAULT: f64 = 0.0;

/// Default current bound [mA].
pub const MAX_CURRENT_MA_DEFAULT: f64 = 2000.0;

/// Default position bound [rad] (±180°).
pub const MAX_POSITION_RAD_DEFAULT: f64 = 3.141;

/// Default velocity bound [rad/s].
pub const MAX_VELOCITY_RAD_S_DEFAULT: f64 = 30.0;

/// Default reduction factor for the `reduce` violation policy.
pub const REDUCTION_FACTOR_DEFAULT: f64 = 0.1;

/// Default bang-bang output magnitude [mA].
pub const BANG_BANG_MAGNITUDE_MA_DEFAULT: f64 = 800.0;

/// Actuators addressed by one bus command frame.
pub const ACTUATORS_PER_GROUP: u8 = 4;

/// Total actuators on one bus.
pub const MAX_ACTUATORS: u8 = 8;

/// Diagnostics one sanitizer pass can produce (current, position, velocity).
pub const MAX_DIAGNOSTICS_PER_TICK: usize = 3;

/// Default telemetry echo interval [ticks] (every tick).
pub const LOG_EVERY_TICKS_DEFAULT: u64 = 1;

/// Default loop statistics interval [ticks] (5 s at the default period).
pub const STATS_EVERY_TICKS_DEFAULT: u64 = 1000;

/// Default sleep between loop iterations [µs].
pub const LOOP_IDLE_US_DEFAULT: u64 = 100;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/servo.toml";

const_assert!(MAX_ACTUATORS == 2 * ACTUATORS_PER_GROUP);
const_assert!(TICK_PERIOD_MS_DEFAULT >= TICK_PERIOD_MS_MIN);
