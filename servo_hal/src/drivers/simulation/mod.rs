//! Simulation driver module.
//!
//! A software actuator bus for development and closed-loop testing without
//! hardware.

mod driver;
mod physics;

pub use driver::{COMMAND_TIMEOUT_MS_DEFAULT, SimulationBus, SimulationConfig};
pub use physics::{RotorModel, RotorParams};
