use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Core error types for pfkit
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed (including failure to spawn pfctl)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Control command missing or not executable by this process
    #[error("{} is not executable", path.display())]
    NotExecutable { path: PathBuf },

    /// Packet filter device missing or not read/writable by this process
    #[error("{} is not read-/writable", path.display())]
    DeviceInaccessible { path: PathBuf },

    /// Malformed IP address or CIDR text
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    /// pfctl exited unsuccessfully
    #[error("command execution failed: {status} => {stderr}")]
    Command {
        status: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// pfctl did not finish within the execution bound and was killed
    #[error("command execution failed: timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// One or more table entries failed to apply
    #[error("one or more errors occurred {} table: {}", op.describe(), errors.join(", "))]
    Table { op: TableOp, errors: Vec<String> },

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },
}

/// Table membership change issued through `pfctl -T`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    Add,
    Delete,
}

impl TableOp {
    /// Returns the `pfctl -T` command word
    pub const fn as_str(self) -> &'static str {
        match self {
            TableOp::Add => "add",
            TableOp::Delete => "delete",
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            TableOp::Add => "adding IP(s) to",
            TableOp::Delete => "removing IP(s) from",
        }
    }
}

impl Error {
    /// Captured pfctl stderr, when the error came from a finished process
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Command { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Database of pfctl error patterns and their translations
pub struct PfctlErrorPattern;

impl PfctlErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        // Permission errors
        if lower.contains("permission denied")
            || lower.contains("operation not permitted")
            || lower.contains("not read-/writable")
        {
            return ErrorTranslation::new("Insufficient permissions to modify the packet filter")
                .with_suggestion("Run as root or through sudo/doas")
                .with_suggestion("Check the permissions on /dev/pf: ls -l /dev/pf");
        }

        // Missing pfctl
        if lower.contains("no such file") || lower.contains("not executable") {
            return ErrorTranslation::new("pfctl is not installed or not found at the given path")
                .with_suggestion("pfctl usually lives at /sbin/pfctl")
                .with_suggestion("Pass --pfctl or set PFKIT_PFCTL to point at it");
        }

        // Syntax errors in generated rules
        if lower.contains("syntax error") {
            return ErrorTranslation::new("pfctl rejected the ruleset syntax")
                .with_suggestion("Preview the ruleset with: pfkit load <profile> --dry-run")
                .with_suggestion("Ports only apply to tcp and udp rules")
                .with_suggestion("Ensure IP addresses and network masks are valid");
        }

        // Table missing
        if lower.contains("table does not exist") {
            return ErrorTranslation::new("Table does not exist")
                .with_suggestion("Declare the table in the main ruleset: table <name> persist")
                .with_suggestion("List existing tables with: pfkit tables");
        }

        // Anchor not referenced
        if lower.contains("anchor") && lower.contains("does not exist") {
            return ErrorTranslation::new("Anchor does not exist")
                .with_suggestion("Reference the anchor from pf.conf: anchor \"<name>\"")
                .with_suggestion("Reload pf.conf after adding the reference");
        }

        // Already in the requested state
        if lower.contains("already enabled") || lower.contains("not enabled") {
            return ErrorTranslation::new("pf is already in the requested state")
                .with_suggestion("Check the current state with: pfkit status");
        }

        // Device busy
        if lower.contains("resource busy") || lower.contains("device busy") {
            return ErrorTranslation::new("Packet filter device is busy")
                .with_suggestion("Another process may be modifying pf")
                .with_suggestion("Wait a moment and try again");
        }

        // Timeout errors
        if lower.contains("timed out") {
            return ErrorTranslation::new("pfctl did not respond in time")
                .with_suggestion("Check system load: uptime")
                .with_suggestion("Try again when the system is less busy");
        }

        // Generic fallback
        ErrorTranslation::new(format!("Firewall error: {msg}"))
            .with_suggestion("Check the detailed error message for more information")
            .with_suggestion("Verify pf is working: pfctl -s info")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_embeds_stderr() {
        let err = Error::Command {
            status: "exit status: 1".to_string(),
            stderr: "stdin:1: syntax error".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "command execution failed: exit status: 1 => stdin:1: syntax error"
        );
        assert_eq!(err.stderr(), Some("stdin:1: syntax error"));
    }

    #[test]
    fn test_table_error_joins_messages() {
        let err = Error::Table {
            op: TableOp::Delete,
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "one or more errors occurred removing IP(s) from table: first, second"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            timeout: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("timed out after 2s"));
        assert!(err.stderr().is_none());
    }

    #[test]
    fn test_pfctl_syntax_error() {
        let translation = PfctlErrorPattern::match_error("stdin:3: syntax error");
        assert!(translation.user_message.contains("syntax"));
        assert!(translation.suggestions.iter().any(|s| s.contains("dry-run")));
    }

    #[test]
    fn test_pfctl_missing_table() {
        let translation = PfctlErrorPattern::match_error("pfctl: Table does not exist.");
        assert_eq!(translation.user_message, "Table does not exist");
    }

    #[test]
    fn test_not_executable_translation() {
        let err = Error::NotExecutable {
            path: PathBuf::from("/sbin/pfctl"),
        };
        let translation = PfctlErrorPattern::match_error(&err.to_string());
        assert!(translation.user_message.contains("not installed"));
    }

    #[test]
    fn test_generic_fallback() {
        let translation = PfctlErrorPattern::match_error("something odd");
        assert!(translation.user_message.contains("something odd"));
        assert!(!translation.suggestions.is_empty());
    }
}
