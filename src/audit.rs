//! Audit logging for privileged pf operations
//!
//! Every state-changing call made through the command line (loading or
//! flushing an anchor, toggling pf, editing tables) is appended to
//! `audit.log` in the state directory as one JSON object per line.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CommitAnchor,
    FlushAnchor,
    Enable,
    Disable,
    TableAdd,
    TableDelete,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    pub event_type: EventType,

    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
#[derive(Debug, Clone)]
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Opens the audit log in the state directory
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::get_state_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Uses an explicit log file instead of the state directory
    pub fn at(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// Appends an event to the audit log
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub fn log(&self, event: &AuditEvent) -> std::io::Result<()> {
        use std::os::unix::fs::OpenOptionsExt;

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&self.log_path)?;

        // Single write keeps concurrent appenders from interleaving lines
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Reads the most recent events from the log, newest first
    ///
    /// Lines that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be read
    pub fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.log_path)?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(count)
            .collect();

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

/// Records the outcome of an operation, warning instead of failing when the
/// log cannot be written.
pub fn record<T>(
    event_type: EventType,
    details: serde_json::Value,
    outcome: &crate::core::error::Result<T>,
) {
    let Ok(audit) = AuditLog::new() else {
        return;
    };
    if let Some(parent) = audit.path().parent()
        && let Err(e) = crate::utils::ensure_dirs()
    {
        tracing::warn!("Failed to create {}: {}", parent.display(), e);
        return;
    }

    let event = AuditEvent::new(
        event_type,
        outcome.is_ok(),
        details,
        outcome.as_ref().err().map(ToString::to_string),
    );
    if let Err(e) = audit.log(&event) {
        tracing::warn!("Failed to write audit log: {}", e);
    }
}
