//! Per-tick command dispatch.
//!
//! A bus frame carries a whole group, so a second command for the same
//! actuator inside one tick silently replaces the first on the wire.
//! [`TickCommandGuard`] turns that into a checked error.

use servo_common::bus::{ActuatorId, CommandSink, GroupSelector, check_group};
use servo_common::consts::MAX_ACTUATORS;

use crate::cycle::CycleError;

/// Borrowed command sink that allows one send per actuator.
///
/// Create one per tick; dropping it ends the tick.
pub struct TickCommandGuard<'a, S: CommandSink + ?Sized> {
    sink: &'a mut S,
    sent: [bool; MAX_ACTUATORS as usize],
}

impl<'a, S: CommandSink + ?Sized> TickCommandGuard<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            sent: [false; MAX_ACTUATORS as usize],
        }
    }

    /// Forward `value_ma` to the sink.
    ///
    /// # Errors
    /// - `CycleError::DuplicateCommand` if `actuator` was already addressed this tick
    /// - `CycleError::Bus` for a non-finite value, a group mismatch, or a sink failure
    ///
    /// The actuator counts as addressed once the sink has been called, even
    /// if the sink reported an error.
    pub fn send(
        &mut self,
        value_ma: f64,
        actuator: ActuatorId,
        group: GroupSelector,
    ) -> Result<(), CycleError> {
        if self.sent[actuator.index()] {
            return Err(CycleError::DuplicateCommand { actuator });
        }
        if !value_ma.is_finite() {
            return Err(servo_common::bus::BusError::NonFiniteCommand(actuator.get()).into());
        }
        check_group(actuator, group)?;

        self.sent[actuator.index()] = true;
        self.sink.send_command(value_ma, actuator, group)?;
        Ok(())
    }

    /// Whether `actuator` has been addressed this tick.
    #[inline]
    pub fn was_sent(&self, actuator: ActuatorId) -> bool {
        self.sent[actuator.index()]
    }

    /// Number of actuators addressed this tick.
    pub fn sent_count(&self) -> usize {
        self.sent.iter().filter(|s| **s).count()
    }
}
