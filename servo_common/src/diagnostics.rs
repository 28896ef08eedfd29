//! Diagnostic channel.
//!
//! An append-only text sink for bound-violation messages. The control loop
//! formats each [`Diagnostic`](crate::safety::Diagnostic) and hands the text
//! to the sink together with its severity.

use tracing::{error, warn};

use crate::safety::Severity;

/// Append-only sink for human-readable diagnostic lines.
pub trait DiagnosticSink {
    fn emit(&mut self, severity: Severity, message: &str);
}

/// Sink that forwards every line to `tracing`.
///
/// Warnings go out at `warn`, errors at `error`, both under the
/// `servo::diagnostics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => warn!(target: "servo::diagnostics", "{message}"),
            Severity::Error => error!(target: "servo::diagnostics", "{message}"),
        }
    }
}

/// In-memory sink, used by tests and replay tooling.
impl DiagnosticSink for Vec<String> {
    fn emit(&mut self, _severity: Severity, message: &str) {
        self.push(message.to_string());
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, severity: Severity, message: &str) {
        (**self).emit(severity, message);
    }
}
