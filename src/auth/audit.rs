//! Append-only audit sink for authentication events.
//!
//! The sink is injected rather than reached through the global logger so tests
//! can capture entries deterministically. Messages carry the username only,
//! never the candidate password or hash material.

use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditSeverity {
    Info,
    Warn,
    Error,
}

pub trait AuditLog: Send + Sync {
    fn record(&self, severity: AuditSeverity, message: &str);
}

/// Production sink: forwards entries to the `tracing` subscriber under the
/// `audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, severity: AuditSeverity, message: &str) {
        match severity {
            AuditSeverity::Info => info!(target: "audit", "{message}"),
            AuditSeverity::Warn => warn!(target: "audit", "{message}"),
            AuditSeverity::Error => error!(target: "audit", "{message}"),
        }
    }
}

#[cfg(test)]
pub(crate) use capture::CapturingAuditLog;
