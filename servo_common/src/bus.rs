//! Actuator bus contracts.
//!
//! This module defines:
//! - `ActuatorId` / `GroupSelector` - addressing on a two-group motor bus
//! - `BusError` - transport-level failures
//! - `TelemetrySource` / `CommandSink` - the two halves the control loop uses
//! - `ActuatorBus` - a complete driver (both halves plus lifecycle)
//!
//! Frame encoding, bus arbitration and motor firmware live behind these
//! traits in the driver crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{ACTUATORS_PER_GROUP, MAX_ACTUATORS};

/// Error types for bus operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BusError {
    /// Actuator id outside `0..MAX_ACTUATORS`.
    #[error("Invalid actuator id {0} (bus carries {max} actuators)", max = MAX_ACTUATORS)]
    InvalidActuator(u8),

    /// Command addressed to a group that does not contain the actuator.
    #[error("Actuator {actuator} is not part of group {group:?}")]
    GroupMismatch { actuator: u8, group: GroupSelector },

    /// Non-finite command value rejected before reaching the wire.
    #[error("Refusing non-finite command for actuator {0}")]
    NonFiniteCommand(u8),

    /// Hardware communication error.
    #[error("Bus communication error: {0}")]
    Communication(String),
}

/// Which four-actuator group a command frame addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupSelector {
    /// Actuators 0..=3.
    #[default]
    IdsZeroToThree,
    /// Actuators 4..=7.
    IdsFourToSeven,
}

impl GroupSelector {
    /// First actuator id in the group.
    #[inline]
    pub const fn base(self) -> u8 {
        match self {
            Self::IdsZeroToThree => 0,
            Self::IdsFourToSeven => ACTUATORS_PER_GROUP,
        }
    }

    #[inline]
    pub const fn contains(self, id: ActuatorId) -> bool {
        id.0 >= self.base() && id.0 < self.base() + ACTUATORS_PER_GROUP
    }
}

/// Actuator address on the bus (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ActuatorId(u8);

impl ActuatorId {
    pub fn new(id: u8) -> Result<Self, BusError> {
        if id < MAX_ACTUATORS {
            Ok(Self(id))
        } else {
            Err(BusError::InvalidActuator(id))
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Group this actuator belongs to.
    #[inline]
    pub const fn group(self) -> GroupSelector {
        if self.0 < ACTUATORS_PER_GROUP {
            GroupSelector::IdsZeroToThree
        } else {
            GroupSelector::IdsFourToSeven
        }
    }

    /// Slot within the group's command frame (0..4).
    #[inline]
    pub const fn slot(self) -> usize {
        (self.0 % ACTUATORS_PER_GROUP) as usize
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for ActuatorId {
    fn default() -> Self {
        Self(0)
    }
}

impl TryFrom<u8> for ActuatorId {
    type Error = BusError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ActuatorId> for u8 {
    fn from(id: ActuatorId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Read side of the bus.
///
/// `poll` drains pending feedback frames and is called on every loop
/// iteration. `position`/`velocity` return the last decoded value and
/// never block.
pub trait TelemetrySource {
    /// Process any feedback received since the previous poll.
    fn poll(&mut self) -> Result<(), BusError>;

    /// Last known shaft position [rad].
    fn position(&self, actuator: ActuatorId) -> f64;

    /// Last known shaft velocity [rad/s].
    fn velocity(&self, actuator: ActuatorId) -> f64;
}

/// Write side of the bus.
///
/// A frame carries all four actuators of a group, so a second send in the
/// same tick replaces the first. Callers must send at most once per tick per
/// actuator; the control unit enforces this with its tick command guard.
pub trait CommandSink {
    /// Queue `value_ma` for `actuator` on `group`.
    fn send_command(
        &mut self,
        value_ma: f64,
        actuator: ActuatorId,
        group: GroupSelector,
    ) -> Result<(), BusError>;
}

/// A complete bus driver.
///
/// # Lifecycle
///
/// 1. Construct / `init` - before the loop starts
/// 2. `poll` every iteration, `send_command` at most once per tick
/// 3. `shutdown` - command zero current and release the transport
pub trait ActuatorBus: TelemetrySource + CommandSink {
    /// Driver identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Release the bus. Default: no-op.
    fn shutdown(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}

// ─── Boxed drivers ──────────────────────────────────────────────────

impl<B: TelemetrySource + ?Sized> TelemetrySource for Box<B> {
    fn poll(&mut self) -> Result<(), BusError> {
        (**self).poll()
    }

    fn position(&self, actuator: ActuatorId) -> f64 {
        (**self).position(actuator)
    }

    fn velocity(&self, actuator: ActuatorId) -> f64 {
        (**self).velocity(actuator)
    }
}

impl<B: CommandSink + ?Sized> CommandSink for Box<B> {
    fn send_command(
        &mut self,
        value_ma: f64,
        actuator: ActuatorId,
        group: GroupSelector,
    ) -> Result<(), BusError> {
        (**self).send_command(value_ma, actuator, group)
    }
}

impl<B: ActuatorBus + ?Sized> ActuatorBus for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        (**self).shutdown()
    }
}

/// Check group membership before a frame is built.
pub fn check_group(actuator: ActuatorId, group: GroupSelector) -> Result<(), BusError> {
    if group.contains(actuator) {
        Ok(())
    } else {
        Err(BusError::GroupMismatch {
            actuator: actuator.get(),
            group,
        })
    }
}
