//! Bus driver implementations.
//!
//! - [`simulation`] - Software rotor simulation for development and testing
//!
//! Every driver implements `servo_common::bus::ActuatorBus`.

pub mod simulation;
