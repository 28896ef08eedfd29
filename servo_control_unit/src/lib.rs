//! # Servo Control Unit Library
//!
//! Fixed-period position control for a single current-controlled actuator.
//! Every tick reads shaft telemetry, computes a PD (or bang-bang) current
//! command towards the setpoint, clamps and overrides it against the safety
//! bounds, and sends the result over the actuator bus.
//!
//! ## Module Structure
//!
//! - [`control`] - Control laws (pure functions)
//! - [`safety`] - Command sanitizer
//! - [`cycle`] - Scheduler gate, run gate, statistics and the loop runner
//! - [`command`] - One-send-per-tick guard in front of the bus
//! - [`config`] - TOML configuration for the whole unit
//!
//! ## Data Flow
//!
//! ```text
//! bus.poll() ─► RunGate ─► TickGate ─► telemetry ─► law ─► sanitize ─► TickCommandGuard ─► bus
//!                                                            │
//!                                                            └─► DiagnosticSink
//! ```

pub mod command;
pub mod config;
pub mod control;
pub mod cycle;
pub mod safety;
