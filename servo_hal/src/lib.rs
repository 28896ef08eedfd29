//! # Servo HAL Library
//!
//! Actuator bus drivers for the servo control unit. Drivers implement the
//! `ActuatorBus` trait from `servo_common::bus`; the control unit is generic
//! over it and never sees frames or transports.
//!
//! # Module Structure
//!
//! - [`drivers`] - Bus driver implementations

pub mod drivers;

pub use crate::drivers::simulation::{SimulationBus, SimulationConfig};
