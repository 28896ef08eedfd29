//! Command sanitizer.
//!
//! Clamps the raw command to `±max_current_ma`, then overrides it when the
//! actuator is outside its position or velocity bounds. Every violation is
//! returned as a [`Diagnostic`]; nothing is printed here.
//!
//! Check order is fixed: current clamp → position → velocity. Position and
//! velocity are independent and may both fire in one tick; the configured
//! [`ViolationPolicy`] is applied once, however many of them fired.
//! Non-finite inputs count as violations so the output is always finite.

use heapless::Vec;
use servo_common::consts::MAX_DIAGNOSTICS_PER_TICK;
use servo_common::safety::{
    Diagnostic, DiagnosticKind, SafetyBounds, ViolationFlags, ViolationPolicy,
};

/// Result of one sanitizer pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeReport {
    /// Command safe to transmit [mA].
    pub command: f64,
    /// Bounds tripped during this pass.
    pub violations: ViolationFlags,
    /// One entry per tripped bound, in check order.
    pub diagnostics: Vec<Diagnostic, MAX_DIAGNOSTICS_PER_TICK>,
}

impl SanitizeReport {
    /// True when position or velocity forced the policy.
    #[inline]
    pub fn is_overridden(&self) -> bool {
        self.violations.intersects(ViolationFlags::OVERRIDING)
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        self.violations |= diagnostic.kind.flag();
        // Capacity equals the number of distinct kinds; each is recorded once.
        let _ = self.diagnostics.push(diagnostic);
    }
}

/// Sanitize `command` for an actuator at (`position`, `velocity`).
pub fn sanitize(command: f64, position: f64, velocity: f64, bounds: SafetyBounds) -> SanitizeReport {
    let mut report = SanitizeReport {
        command: 0.0,
        violations: ViolationFlags::empty(),
        diagnostics: Vec::new(),
    };

    // ── 1. Current clamp ────────────────────────────────────
    let max_current = bounds.max_current_ma;
    let clamped = if command.is_nan() {
        0.0
    } else {
        command.clamp(-max_current, max_current)
    };
    if clamped != command {
        report.record(Diagnostic::new(
            DiagnosticKind::CurrentClamped,
            command,
            max_current,
        ));
    }

    // ── 2. Position bound ───────────────────────────────────
    if !within(position, bounds.max_position_rad) {
        report.record(Diagnostic::new(
            DiagnosticKind::PositionOutOfBounds,
            position,
            bounds.max_position_rad,
        ));
    }

    // ── 3. Velocity bound ───────────────────────────────────
    if !within(velocity, bounds.max_velocity_rad_s) {
        report.record(Diagnostic::new(
            DiagnosticKind::VelocityOutOfBounds,
            velocity,
            bounds.max_velocity_rad_s,
        ));
    }

    report.command = if report.is_overridden() {
        apply_policy(clamped, &bounds)
    } else {
        clamped
    };
    report
}

/// `|value| <= limit`, false for NaN.
#[inline]
fn within(value: f64, limit: f64) -> bool {
    value.abs() <= limit
}

#[inline]
fn apply_policy(command: f64, bounds: &SafetyBounds) -> f64 {
    match bounds.violation_policy {
        ViolationPolicy::Zero => 0.0,
        ViolationPolicy::Reduce => command * bounds.reduction_factor,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
