//! Servo Common Library
//!
//! Shared constants, configuration loading and the bus/diagnostic/timebase
//! contracts used by every servo workspace crate.
//!
//! # Module Structure
//!
//! - [`consts`] - Defaults and limits
//! - [`config`] - Configuration loading traits and shared sections
//! - [`control`] - Telemetry, gains and control-law configuration
//! - [`safety`] - Safety bounds and violation diagnostics
//! - [`bus`] - Actuator addressing and bus driver traits
//! - [`diagnostics`] - Diagnostic channel
//! - [`time`] - Monotonic millisecond timebase
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! servo = { package = "servo_common", path = "../servo_common" }
//! ```
//!
//! ```rust
//! use servo_common::prelude::*;
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod control;
pub mod diagnostics;
pub mod prelude;
pub mod safety;
pub mod time;
