//! Control engine root.
//!
//! PD law plus the alternative bang-bang law, selected per session by
//! [`ControlLaw`](servo_common::control::ControlLaw).

pub mod law;
pub mod pd;
