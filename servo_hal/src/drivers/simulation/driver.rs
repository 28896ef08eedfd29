//! Simulated actuator bus.
//!
//! Behaves like a two-group motor controller bus: a command frame carries
//! currents for all four actuators of a group, so addressing one actuator
//! commands zero to the other three slots. Each group has a command
//! watchdog; a group that has not seen a frame for `command_timeout_ms`
//! drops its currents to zero.

use serde::{Deserialize, Serialize};
use servo_common::bus::{
    ActuatorBus, ActuatorId, BusError, CommandSink, GroupSelector, TelemetrySource, check_group,
};
use servo_common::config::ConfigError;
use servo_common::consts::{ACTUATORS_PER_GROUP, MAX_ACTUATORS};
use servo_common::time::Timebase;
use tracing::{debug, info, trace, warn};

use super::physics::{RotorModel, RotorParams};

/// Default command watchdog [ms].
pub const COMMAND_TIMEOUT_MS_DEFAULT: u64 = 100;

/// `[simulation]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting shaft position for every actuator [rad] (default: 0.0).
    #[serde(default)]
    pub initial_position_rad: f64,

    /// Starting shaft velocity for every actuator [rad/s] (default: 0.0).
    #[serde(default)]
    pub initial_velocity_rad_s: f64,

    /// Zero a group's currents after this long without a frame [ms];
    /// 0 disables the watchdog (default: 100).
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default)]
    pub rotor: RotorParams,
}

fn default_command_timeout_ms() -> u64 {
    COMMAND_TIMEOUT_MS_DEFAULT
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_position_rad: 0.0,
            initial_velocity_rad_s: 0.0,
            command_timeout_ms: COMMAND_TIMEOUT_MS_DEFAULT,
            rotor: RotorParams::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_position_rad.is_finite() || !self.initial_velocity_rad_s.is_finite() {
            return Err(ConfigError::ValidationError(
                "initial simulation state must be finite".to_string(),
            ));
        }
        self.rotor.validate()
    }
}

const GROUPS: usize = (MAX_ACTUATORS / ACTUATORS_PER_GROUP) as usize;

/// Bus driver backed by [`RotorModel`]s, advanced on every `poll`.
pub struct SimulationBus<T> {
    clock: T,
    rotors: [RotorModel; MAX_ACTUATORS as usize],
    command_timeout_ms: u64,
    last_poll_ms: Option<u64>,
    last_frame_ms: [Option<u64>; GROUPS],
    watchdog_tripped: [bool; GROUPS],
    frames_sent: u64,
    shut_down: bool,
}

impl<T: Timebase> SimulationBus<T> {
    /// Build a bus with every actuator in the configured initial state.
    pub fn new(config: &SimulationConfig, clock: T) -> Self {
        let mut rotor = RotorModel::new(config.rotor);
        rotor.set_position(config.initial_position_rad);
        rotor.set_velocity(config.initial_velocity_rad_s);

        debug!(
            "Simulation bus: J={} b={} Kt={} watchdog={}ms",
            config.rotor.inertia_kg_m2,
            config.rotor.damping_nm_s_per_rad,
            config.rotor.torque_constant_nm_per_a,
            config.command_timeout_ms
        );

        Self {
            clock,
            rotors: [rotor; MAX_ACTUATORS as usize],
            command_timeout_ms: config.command_timeout_ms,
            last_poll_ms: None,
            last_frame_ms: [None; GROUPS],
            watchdog_tripped: [false; GROUPS],
            frames_sent: 0,
            shut_down: false,
        }
    }

    pub fn rotor(&self, actuator: ActuatorId) -> &RotorModel {
        &self.rotors[actuator.index()]
    }

    /// Move an actuator's shaft directly (test fixtures, disturbances).
    pub fn set_position(&mut self, actuator: ActuatorId, position_rad: f64) {
        self.rotors[actuator.index()].set_position(position_rad);
    }

    pub fn set_velocity(&mut self, actuator: ActuatorId, velocity_rad_s: f64) {
        self.rotors[actuator.index()].set_velocity(velocity_rad_s);
    }

    /// Current the actuator is being driven with [mA].
    pub fn commanded_current(&self, actuator: ActuatorId) -> f64 {
        self.rotors[actuator.index()].current()
    }

    /// Command frames accepted since construction.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn group_index(group: GroupSelector) -> usize {
        (group.base() / ACTUATORS_PER_GROUP) as usize
    }

    fn group_rotors(&mut self, group: usize) -> &mut [RotorModel] {
        let base = group * ACTUATORS_PER_GROUP as usize;
        &mut self.rotors[base..base + ACTUATORS_PER_GROUP as usize]
    }

    fn run_watchdog(&mut self, now_ms: u64) {
        if self.command_timeout_ms == 0 {
            return;
        }
        for group in 0..GROUPS {
            let expired = match self.last_frame_ms[group] {
                Some(last) => now_ms.saturating_sub(last) > self.command_timeout_ms,
                None => true,
            };
            if expired && !self.watchdog_tripped[group] {
                if self.last_frame_ms[group].is_some() {
                    warn!("Simulation bus: group {group} command timeout, currents zeroed");
                }
                self.watchdog_tripped[group] = true;
                for rotor in self.group_rotors(group) {
                    rotor.set_current(0.0);
                }
            }
        }
    }
}

impl<T: Timebase> TelemetrySource for SimulationBus<T> {
    fn poll(&mut self) -> Result<(), BusError> {
        let now_ms = self.clock.now_ms();
        let Some(last) = self.last_poll_ms.replace(now_ms) else {
            return Ok(());
        };
        let dt_ms = now_ms.saturating_sub(last);
        if dt_ms == 0 {
            return Ok(());
        }

        self.run_watchdog(now_ms);
        let dt_s = dt_ms as f64 / 1000.0;
        for rotor in self.rotors.iter_mut() {
            rotor.step(dt_s);
        }
        trace!("Simulation bus advanced {dt_ms}ms");
        Ok(())
    }

    fn position(&self, actuator: ActuatorId) -> f64 {
        self.rotors[actuator.index()].position()
    }

    fn velocity(&self, actuator: ActuatorId) -> f64 {
        self.rotors[actuator.index()].velocity()
    }
}

impl<T: Timebase> CommandSink for SimulationBus<T> {
    fn send_command(
        &mut self,
        value_ma: f64,
        actuator: ActuatorId,
        group: GroupSelector,
    ) -> Result<(), BusError> {
        if self.shut_down {
            return Err(BusError::Communication("bus is shut down".to_string()));
        }
        if !value_ma.is_finite() {
            return Err(BusError::NonFiniteCommand(actuator.get()));
        }
        check_group(actuator, group)?;

        let g = Self::group_index(group);
        let slot = actuator.slot();
        for (i, rotor) in self.group_rotors(g).iter_mut().enumerate() {
            rotor.set_current(if i == slot { value_ma } else { 0.0 });
        }
        self.last_frame_ms[g] = Some(self.clock.now_ms());
        self.watchdog_tripped[g] = false;
        self.frames_sent += 1;
        Ok(())
    }
}

impl<T: Timebase> ActuatorBus for SimulationBus<T> {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        for rotor in self.rotors.iter_mut() {
            rotor.set_current(0.0);
        }
        self.shut_down = true;
        info!(
            "Simulation bus shut down after {} command frames",
            self.frames_sent
        );
        Ok(())
    }
}
