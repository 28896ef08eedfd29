//! Shared fixtures for the integration suites.

mod closed_loop;
mod properties;
mod safety_stop;
mod scheduling;
mod startup;

use servo_common::time::ManualClock;
use servo_control_unit::config::{ControlUnitConfig, load_config_from_str};
use servo_control_unit::cycle::{CycleRunner, Iteration, RunGate, TickOutcome};
use servo_hal::SimulationBus;

pub type SimRunner = CycleRunner<SimulationBus<ManualClock>, Vec<String>, ManualClock>;

/// Parse and validate a unit config, panicking on error.
pub fn config(toml: &str) -> ControlUnitConfig {
    load_config_from_str(toml).expect("test config must be valid")
}

/// Runner on a fresh simulated bus sharing `clock`.
pub fn sim_runner(config: &ControlUnitConfig, clock: &ManualClock) -> SimRunner {
    let bus = SimulationBus::new(&config.simulation, clock.clone());
    CycleRunner::new(config, bus, Vec::new(), clock.clone(), RunGate::new(true))
}

/// Iterate once per `step_ms` for `duration_ms`; returns every tick.
pub fn run_for(
    runner: &mut SimRunner,
    clock: &ManualClock,
    duration_ms: u64,
    step_ms: u64,
) -> Vec<TickOutcome> {
    let mut ticks = Vec::new();
    let end = clock_now(clock) + duration_ms;
    while clock_now(clock) < end {
        clock.advance(step_ms);
        if let Iteration::Ticked(outcome) = runner.iterate().expect("iteration failed") {
            ticks.push(outcome);
        }
    }
    ticks
}

fn clock_now(clock: &ManualClock) -> u64 {
    use servo_common::time::Timebase;
    clock.now_ms()
}
