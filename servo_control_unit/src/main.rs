//! # Servo Control Unit
//!
//! Fixed-period PD position loop for one actuator on a two-group motor bus.
//!
//! Loads `config/servo.toml` (or `--config FILE`), performs RT setup, and
//! runs the loop until Ctrl-C. With `--wait-for-start` the loop starts
//! stopped; entering `s` on stdin toggles it between running and stopped.

use clap::Parser;
use servo_common::config::{ConfigError, LogLevel};
use servo_common::consts::{DEFAULT_CONFIG_PATH, LOOP_IDLE_US_DEFAULT};
use servo_common::diagnostics::TracingDiagnostics;
use servo_common::time::MonotonicClock;
use servo_control_unit::config::{ControlUnitConfig, load_config};
use servo_control_unit::cycle::{CycleRunner, RunGate, rt_setup};
use servo_hal::SimulationBus;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Servo Control Unit: fixed-period actuator position loop
#[derive(Parser, Debug)]
#[command(name = "servo_control_unit")]
#[command(version)]
#[command(about = "Fixed-period PD control loop with command sanitization")]
struct Args {
    /// Path to the unit configuration TOML.
    /// Defaults to config/servo.toml, or built-in defaults if that is missing.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drive the simulated bus instead of hardware.
    #[arg(long)]
    simulate: bool,

    /// Start with the loop stopped; enter `s` to start.
    #[arg(long)]
    wait_for_start: bool,

    /// Override the position setpoint [rad].
    #[arg(long, value_name = "RAD", allow_negative_numbers = true)]
    target: Option<f64>,

    /// CPU core to pin the loop thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Sleep between loop iterations [µs]; 0 spins.
    #[arg(long, default_value_t = LOOP_IDLE_US_DEFAULT)]
    idle_us: u64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // The config's log level seeds the filter, so load it before tracing.
    let loaded = resolve_config(&args);
    let log_level = loaded
        .as_ref()
        .map(|(cfg, _)| cfg.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!(
        "Servo Control Unit v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|(config, source)| {
            info!("Configuration: {source}");
            run(&args, config)
        });

    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Servo Control Unit shutdown complete");
}

/// Explicit `--config` must load; the default path falls back to defaults.
fn resolve_config(args: &Args) -> Result<(ControlUnitConfig, String), ConfigError> {
    if let Some(ref path) = args.config {
        return load_config(path).map(|cfg| (cfg, path.display().to_string()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    match load_config(default_path) {
        Ok(cfg) => Ok((cfg, DEFAULT_CONFIG_PATH.to_string())),
        Err(ConfigError::FileNotFound(_)) => Ok((
            ControlUnitConfig::default(),
            format!("built-in defaults ({DEFAULT_CONFIG_PATH} not found)"),
        )),
        Err(e) => Err(e),
    }
}

fn run(args: &Args, mut config: ControlUnitConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(target) = args.target {
        config.control.target_position_rad = target;
        config.validate()?;
    }

    info!(
        "Config OK: {} ({:?}), period={}ms, kp={}, kd={}, target={}rad, |i|<={}mA",
        config.actuator.id,
        config.actuator.group(),
        config.control.tick_period_ms,
        config.control.kp,
        config.control.kd,
        config.control.target_position_rad,
        config.bounds.max_current_ma,
    );

    if !args.simulate {
        return Err("no hardware bus driver in this build; run with --simulate".into());
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let run_gate = RunGate::new(!args.wait_for_start);
    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        let gate = run_gate.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            gate.close();
            r.store(false, Ordering::SeqCst);
        })?;
    }

    spawn_console(run_gate.clone())?;
    if args.wait_for_start {
        info!("Waiting for start: enter 's' to start, 's' again to stop");
    }

    let clock = MonotonicClock::new();
    let bus = SimulationBus::new(&config.simulation, clock);
    let mut runner = CycleRunner::new(&config, bus, TracingDiagnostics, clock, run_gate);

    runner.run(&running, Duration::from_micros(args.idle_us))?;
    Ok(())
}

/// Console reader: every `s` line toggles the run gate.
fn spawn_console(gate: RunGate) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    warn!("Console input closed");
                    break;
                };
                if line.trim().eq_ignore_ascii_case("s") {
                    if gate.toggle() {
                        info!("Control loop started");
                    } else {
                        info!("Control loop stopped");
                    }
                }
            }
        })?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the config level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        log_level.as_level()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
