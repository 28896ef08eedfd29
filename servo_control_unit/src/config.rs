//! TOML configuration loader with validation.
//!
//! One file configures the whole unit:
//!
//! ```toml
//! [shared]
//! service_name = "servo-bench"
//!
//! [actuator]
//! id = 0
//!
//! [control]
//! tick_period_ms = 5
//! kp = 1000.0
//! kd = 0.0
//!
//! [bounds]
//! max_current_ma = 2000.0
//!
//! [telemetry]
//! log_every_ticks = 1
//!
//! [simulation]
//! initial_position_rad = 1.0
//! ```
//!
//! Every section and field is optional; missing values take the defaults
//! from `servo_common::consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use servo_common::bus::{ActuatorId, GroupSelector};
use servo_common::config::{ConfigError, ConfigLoader, SharedConfig};
use servo_common::consts::{LOG_EVERY_TICKS_DEFAULT, STATS_EVERY_TICKS_DEFAULT};
use servo_common::control::ControlConfig;
use servo_common::safety::SafetyBounds;
use servo_hal::SimulationConfig;

// ─── Sections ───────────────────────────────────────────────────────

/// `[actuator]` section: which motor the loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Bus address (default: 0).
    #[serde(default)]
    pub id: ActuatorId,

    /// Command frame group. Derived from `id` when omitted.
    #[serde(default)]
    pub group: Option<GroupSelector>,
}

impl ActuatorConfig {
    /// Configured group, or the one `id` belongs to.
    #[inline]
    pub fn group(&self) -> GroupSelector {
        self.group.unwrap_or_else(|| self.id.group())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let group = self.group();
        if !group.contains(self.id) {
            return Err(ConfigError::ValidationError(format!(
                "actuator {} is not addressed by group {group:?}",
                self.id
            )));
        }
        Ok(())
    }
}

/// `[telemetry]` section: operator-facing log cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryLogConfig {
    /// Echo position/velocity/command every N ticks; 0 disables (default: 1).
    #[serde(default = "default_log_every_ticks")]
    pub log_every_ticks: u64,

    /// Log loop statistics every N ticks; 0 disables (default: 1000).
    #[serde(default = "default_stats_every_ticks")]
    pub stats_every_ticks: u64,
}

fn default_log_every_ticks() -> u64 {
    LOG_EVERY_TICKS_DEFAULT
}
fn default_stats_every_ticks() -> u64 {
    STATS_EVERY_TICKS_DEFAULT
}

impl Default for TelemetryLogConfig {
    fn default() -> Self {
        Self {
            log_every_ticks: LOG_EVERY_TICKS_DEFAULT,
            stats_every_ticks: STATS_EVERY_TICKS_DEFAULT,
        }
    }
}

// ─── Unit Config ────────────────────────────────────────────────────

/// Complete control unit configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlUnitConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub bounds: SafetyBounds,
    #[serde(default)]
    pub telemetry: TelemetryLogConfig,
    /// Only read when running against the simulated bus.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl ControlUnitConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.actuator.validate()?;
        self.control.validate()?;
        self.bounds.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the unit configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate from an in-memory TOML document.
pub fn load_config_from_str(content: &str) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
