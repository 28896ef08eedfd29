//! Fixed-period control cycle: poll → gate → read → compute → sanitize → send.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to a CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`: RT priority.
//!
//! All four are no-ops without the `rt` feature.
//!
//! ## Loop
//! Every iteration polls the bus. A tick runs only when the [`RunGate`] is
//! open and the [`TickGate`] has seen a full period since the last
//! dispatched tick. A late loop skips the missed windows; it never runs a
//! burst of catch-up ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use servo_common::bus::{ActuatorBus, ActuatorId, BusError, GroupSelector};
use servo_common::control::{ControlConfig, Telemetry};
use servo_common::diagnostics::DiagnosticSink;
use servo_common::safety::{DiagnosticKind, SafetyBounds};
use servo_common::time::Timebase;
use tracing::{debug, info, warn};

use crate::command::TickCommandGuard;
use crate::config::{ControlUnitConfig, TelemetryLogConfig};
use crate::control::law::{LawInput, compute_command};
use crate::safety::sanitize::{SanitizeReport, sanitize};

// ─── Scheduler Gate ─────────────────────────────────────────────────

/// `true` once at least `period_ms` has elapsed since `last_dispatch_ms`.
///
/// A clock reading behind `last_dispatch_ms` never fires.
#[inline]
pub const fn should_tick(now_ms: u64, last_dispatch_ms: u64, period_ms: u64) -> bool {
    now_ms.saturating_sub(last_dispatch_ms) >= period_ms
}

/// Scheduler state for one control loop.
///
/// `last_dispatch_ms` only moves forward, and only on [`dispatch`](Self::dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickGate {
    period_ms: u64,
    last_dispatch_ms: u64,
}

impl TickGate {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_dispatch_ms: 0,
        }
    }

    /// Gate whose last tick happened at `last_dispatch_ms`.
    pub const fn with_last_dispatch(period_ms: u64, last_dispatch_ms: u64) -> Self {
        Self {
            period_ms,
            last_dispatch_ms,
        }
    }

    #[inline]
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    #[inline]
    pub const fn last_dispatch_ms(&self) -> u64 {
        self.last_dispatch_ms
    }

    #[inline]
    pub const fn should_tick(&self, now_ms: u64) -> bool {
        should_tick(now_ms, self.last_dispatch_ms, self.period_ms)
    }

    /// Whole periods that elapsed without a tick before `now_ms`.
    #[inline]
    pub const fn missed_windows(&self, now_ms: u64) -> u64 {
        if self.period_ms == 0 {
            return 0;
        }
        (now_ms.saturating_sub(self.last_dispatch_ms) / self.period_ms).saturating_sub(1)
    }

    /// Record a tick dispatched at `now_ms`.
    #[inline]
    pub fn dispatch(&mut self, now_ms: u64) {
        if now_ms > self.last_dispatch_ms {
            self.last_dispatch_ms = now_ms;
        }
    }
}

// ─── Run Gate ───────────────────────────────────────────────────────

/// Start/stop flag shared with the console or signal handler.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct RunGate {
    open: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Arc::new(AtomicBool::new(open)),
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Flip the gate; returns the new state.
    pub fn toggle(&self) -> bool {
        !self.open.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new(true)
    }
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) loop counters and iteration timing.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Loop iterations (bus polls).
    pub iterations: u64,
    /// Iterations spent with the run gate closed.
    pub stopped_iterations: u64,
    /// Dispatched control ticks.
    pub ticks: u64,
    /// Periods that elapsed without a tick (late loop).
    pub skipped_windows: u64,
    /// Ticks whose command hit the current clamp.
    pub clamped_ticks: u64,
    /// Ticks with the position out of bounds.
    pub position_violations: u64,
    /// Ticks with the velocity out of bounds.
    pub velocity_violations: u64,
    /// Last command sent [mA].
    pub last_command_ma: f64,
    /// Largest |command| sent [mA].
    pub max_abs_command_ma: f64,
    /// Last iteration duration [ns].
    pub last_iteration_ns: u64,
    /// Maximum iteration duration [ns].
    pub max_iteration_ns: u64,
    sum_iteration_ns: u64,
    timed_iterations: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            iterations: 0,
            stopped_iterations: 0,
            ticks: 0,
            skipped_windows: 0,
            clamped_ticks: 0,
            position_violations: 0,
            velocity_violations: 0,
            last_command_ma: 0.0,
            max_abs_command_ma: 0.0,
            last_iteration_ns: 0,
            max_iteration_ns: 0,
            sum_iteration_ns: 0,
            timed_iterations: 0,
        }
    }

    /// Count one dispatched tick.
    pub fn record_tick(&mut self, report: &SanitizeReport, missed_windows: u64) {
        use servo_common::safety::ViolationFlags;

        if self.ticks > 0 {
            self.skipped_windows += missed_windows;
        }
        self.ticks += 1;
        if report.violations.contains(ViolationFlags::CURRENT) {
            self.clamped_ticks += 1;
        }
        if report.violations.contains(ViolationFlags::POSITION) {
            self.position_violations += 1;
        }
        if report.violations.contains(ViolationFlags::VELOCITY) {
            self.velocity_violations += 1;
        }
        self.last_command_ma = report.command;
        if report.command.abs() > self.max_abs_command_ma {
            self.max_abs_command_ma = report.command.abs();
        }
    }

    /// Record one iteration duration.
    #[inline]
    pub fn record_iteration(&mut self, duration_ns: u64) {
        self.timed_iterations += 1;
        self.last_iteration_ns = duration_ns;
        if duration_ns > self.max_iteration_ns {
            self.max_iteration_ns = duration_ns;
        }
        self.sum_iteration_ns = self.sum_iteration_ns.saturating_add(duration_ns);
    }

    /// Average iteration time [ns] (0 before the first timed iteration).
    #[inline]
    pub fn avg_iteration_ns(&self) -> u64 {
        if self.timed_iterations == 0 {
            0
        } else {
            self.sum_iteration_ns / self.timed_iterations
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Error Type ─────────────────────────────────────────────────────

/// Errors that leave the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleError {
    /// RT setup failure (mlockall, affinity, scheduler).
    RtSetup(String),
    /// Transport failure reported by the bus driver.
    Bus(BusError),
    /// A second command for the same actuator inside one tick.
    DuplicateCommand {
        /// Actuator that was addressed twice.
        actuator: ActuatorId,
    },
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::Bus(e) => write!(f, "bus error: {e}"),
            Self::DuplicateCommand { actuator } => {
                write!(f, "duplicate command for {actuator} within one tick")
            }
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for CycleError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Stack touched by [`rt_setup`] so the loop never page-faults on it.
#[cfg(feature = "rt")]
const PREFAULT_STACK_BYTES: usize = 256 * 1024;

/// Lock memory, prefault the stack, pin the thread and switch it to
/// `SCHED_FIFO`.
///
/// Call once before [`CycleRunner::run`]. A no-op without the `rt` feature.
#[cfg(feature = "rt")]
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::sys::mman::{MlockallFlags, mlockall};
    use nix::unistd::Pid;

    let failed = |step: &str, detail: String| CycleError::RtSetup(format!("{step}: {detail}"));

    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| failed("mlockall", e.to_string()))?;

    let mut stack = [0u8; PREFAULT_STACK_BYTES];
    for byte in stack.iter_mut() {
        // SAFETY: `byte` is an exclusive reference into `stack`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&stack);

    let mut cpus = CpuSet::new();
    cpus.set(cpu_core)
        .map_err(|e| failed("cpu set", format!("core {cpu_core}: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpus)
        .map_err(|e| failed("sched_setaffinity", e.to_string()))?;

    // nix has no sched_setscheduler wrapper.
    let param = libc::sched_param {
        sched_priority: rt_priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
        return Err(failed(
            "sched_setscheduler",
            format!("SCHED_FIFO/{rt_priority}: {}", std::io::Error::last_os_error()),
        ));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn rt_setup(_cpu_core: usize, _rt_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Everything one dispatched tick observed and decided.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Timebase reading the tick ran at [ms].
    pub now_ms: u64,
    pub telemetry: Telemetry,
    /// Control law output before sanitization [mA].
    pub raw_command: f64,
    /// Sanitized command and violations; `report.command` went to the bus.
    pub report: SanitizeReport,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    /// Run gate closed; nothing computed or sent.
    Stopped,
    /// Gate not due yet.
    Idle,
    /// A tick ran.
    Ticked(TickOutcome),
}

/// Single-actuator control loop.
///
/// Owns the bus, the diagnostic sink, the timebase and the scheduler
/// state. Nothing here is global.
pub struct CycleRunner<B, D, T> {
    actuator: ActuatorId,
    group: GroupSelector,
    control: ControlConfig,
    bounds: SafetyBounds,
    logging: TelemetryLogConfig,
    target_position: f64,
    bus: B,
    diagnostics: D,
    clock: T,
    gate: TickGate,
    run_gate: RunGate,
    stats: CycleStats,
}

impl<B, D, T> CycleRunner<B, D, T>
where
    B: ActuatorBus,
    D: DiagnosticSink,
    T: Timebase,
{
    /// Build a runner from a validated config.
    pub fn new(
        config: &ControlUnitConfig,
        bus: B,
        diagnostics: D,
        clock: T,
        run_gate: RunGate,
    ) -> Self {
        Self {
            actuator: config.actuator.id,
            group: config.actuator.group(),
            control: config.control,
            bounds: config.bounds,
            logging: config.telemetry,
            target_position: config.control.target_position_rad,
            bus,
            diagnostics,
            clock,
            gate: TickGate::new(config.control.tick_period_ms),
            run_gate,
            stats: CycleStats::new(),
        }
    }

    /// Current position setpoint [rad].
    #[inline]
    pub fn target(&self) -> f64 {
        self.target_position
    }

    /// Change the setpoint; takes effect on the next tick.
    ///
    /// Non-finite setpoints are ignored.
    pub fn set_target(&mut self, target_rad: f64) {
        if !target_rad.is_finite() {
            warn!("Ignoring non-finite target position {target_rad}");
            return;
        }
        debug!(
            "Target position {:.4} -> {:.4} rad",
            self.target_position, target_rad
        );
        self.target_position = target_rad;
    }

    pub fn actuator(&self) -> ActuatorId {
        self.actuator
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn gate(&self) -> &TickGate {
        &self.gate
    }

    pub fn run_gate(&self) -> &RunGate {
        &self.run_gate
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// One loop iteration.
    ///
    /// Polls the bus unconditionally, then runs a tick if the run gate is
    /// open and the scheduler gate is due.
    ///
    /// # Errors
    /// Bus failures and duplicate sends; the control path itself cannot fail.
    pub fn iterate(&mut self) -> Result<Iteration, CycleError> {
        self.stats.iterations += 1;
        self.bus.poll()?;

        if !self.run_gate.is_open() {
            self.stats.stopped_iterations += 1;
            return Ok(Iteration::Stopped);
        }

        let now_ms = self.clock.now_ms();
        if !self.gate.should_tick(now_ms) {
            return Ok(Iteration::Idle);
        }

        self.tick(now_ms).map(Iteration::Ticked)
    }

    /// Read → compute → sanitize → send, then advance the gate.
    ///
    /// A failed send leaves the gate and the counters untouched.
    fn tick(&mut self, now_ms: u64) -> Result<TickOutcome, CycleError> {
        let telemetry = Telemetry::new(
            self.bus.position(self.actuator),
            self.bus.velocity(self.actuator),
        );

        let input = LawInput {
            telemetry,
            target_position: self.target_position,
            gains: self.control.gains(),
            tick_period: self.control.tick_period_ms as f64,
        };
        let raw_command = compute_command(&self.control.law, &input);
        let report = sanitize(
            raw_command,
            telemetry.position_rad,
            telemetry.velocity_rad_s,
            self.bounds,
        );
        self.report_diagnostics(&report);

        TickCommandGuard::new(&mut self.bus).send(report.command, self.actuator, self.group)?;

        // Only a tick whose command went out moves the scheduler.
        let missed = self.gate.missed_windows(now_ms);
        self.gate.dispatch(now_ms);
        self.stats.record_tick(&report, missed);

        let every = self.logging.log_every_ticks;
        if every > 0 && (self.stats.ticks - 1) % every == 0 {
            debug!(
                target: "servo::telemetry",
                actuator = %self.actuator,
                position = telemetry.position_rad,
                velocity = telemetry.velocity_rad_s,
                command = report.command,
                "tick"
            );
        }

        Ok(TickOutcome {
            now_ms,
            telemetry,
            raw_command,
            report,
        })
    }

    fn report_diagnostics(&mut self, report: &SanitizeReport) {
        for diagnostic in report.diagnostics.iter() {
            match diagnostic.kind {
                DiagnosticKind::CurrentClamped => debug!(
                    target: "servo::diagnostics",
                    "{diagnostic}"
                ),
                _ => self
                    .diagnostics
                    .emit(diagnostic.severity(), &diagnostic.to_string()),
            }
        }
    }

    /// Run iterations until `running` goes false, then shut the bus down.
    ///
    /// `idle` is slept after every iteration; zero spins.
    pub fn run(&mut self, running: &AtomicBool, idle: Duration) -> Result<(), CycleError> {
        info!(
            "Entering control loop: {} on '{}', period={}ms, law={:?}",
            self.actuator,
            self.bus.name(),
            self.control.tick_period_ms,
            self.control.law
        );

        let result = loop {
            if !running.load(Ordering::SeqCst) {
                break Ok(());
            }

            let started = Instant::now();
            let ticked = match self.iterate() {
                Ok(Iteration::Ticked(_)) => true,
                Ok(_) => false,
                Err(e) => break Err(e),
            };
            self.stats
                .record_iteration(started.elapsed().as_nanos() as u64);

            let every = self.logging.stats_every_ticks;
            if ticked && every > 0 && self.stats.ticks % every == 0 {
                self.log_stats();
            }

            if !idle.is_zero() {
                std::thread::sleep(idle);
            }
        };

        if let Err(e) = self.bus.shutdown() {
            warn!("Bus shutdown failed: {e}");
        }
        self.log_stats();
        result
    }

    fn log_stats(&self) {
        let s = &self.stats;
        info!(
            "Loop stats: ticks={} iterations={} skipped={} clamped={} pos_violations={} vel_violations={} max|cmd|={:.1}mA avg_iter={}ns max_iter={}ns",
            s.ticks,
            s.iterations,
            s.skipped_windows,
            s.clamped_ticks,
            s.position_violations,
            s.velocity_violations,
            s.max_abs_command_ma,
            s.avg_iteration_ns(),
            s.max_iteration_ns
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
