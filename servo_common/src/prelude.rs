//! Prelude module for common re-exports.
//!
//! ```rust
//! use servo_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control::{ControlConfig, ControlLaw, Gains, Telemetry};
pub use crate::safety::{
    Diagnostic, DiagnosticKind, SafetyBounds, Severity, ViolationFlags, ViolationPolicy,
};

// ─── Bus ────────────────────────────────────────────────────────────
pub use crate::bus::{
    ActuatorBus, ActuatorId, BusError, CommandSink, GroupSelector, TelemetrySource,
};

// ─── Observability & Time ───────────────────────────────────────────
pub use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use crate::time::{ManualClock, MonotonicClock, Timebase};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_ACTUATORS, TICK_PERIOD_MS_DEFAULT};
