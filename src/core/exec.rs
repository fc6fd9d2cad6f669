//! pfctl process execution
//!
//! Every operation that touches the live packet filter goes through the
//! [`Executor`] trait. [`PfctlExecutor`] is the real implementation: it spawns
//! the control utility once per call, optionally pipes a payload to its stdin,
//! and bounds the whole exchange by [`DEFAULT_TIMEOUT`].
//!
//! The quiet flag (`-q`) is prefixed to every invocation so pfctl never waits
//! for interactive confirmation.

use crate::core::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Upper bound on a single pfctl invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Flag prefixed to every pfctl invocation
pub const QUIET_FLAG: &str = "-q";

/// Narrow capability for running the control utility.
///
/// `args` excludes the quiet flag; implementations add it. Returns stdout split
/// into lines.
pub trait Executor: fmt::Debug + Send + Sync {
    fn execute(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<String>>;
}

/// Runs pfctl as a child process.
///
/// Owns a current-thread tokio runtime and blocks on it, so calls must not be
/// made from inside another async runtime.
#[derive(Debug)]
pub struct PfctlExecutor {
    program: PathBuf,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

impl PfctlExecutor {
    /// Creates an executor for the given control command.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the internal runtime cannot be built.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
            runtime,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<String>> {
        debug!(
            "Executing {} {} {}",
            self.program.display(),
            QUIET_FLAG,
            args.join(" ")
        );

        let mut child = Command::new(&self.program)
            .arg(QUIET_FLAG)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(payload), Some(mut pipe)) = (stdin, pipe) {
                match pipe.write_all(payload).await {
                    // pfctl quit without reading; its exit status tells why
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        debug!("pfctl closed stdin early: {e}");
                    }
                    other => other?,
                }
                // Dropping the pipe closes stdin so pfctl sees EOF
            }
            Ok::<(), std::io::Error>(())
        };

        // stdout/stderr are drained while stdin is fed, so a child that
        // echoes its input cannot block on a full pipe
        let exchange = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            Ok::<_, std::io::Error>((output?, fed))
        };

        // On expiry the exchange future (and with it the child) is dropped,
        // which kills the process.
        let (output, fed) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                warn!(
                    "{} timed out after {:?}",
                    self.program.display(),
                    self.timeout
                );
                Error::Timeout {
                    timeout: self.timeout,
                }
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            warn!("{} failed: {}", self.program.display(), stderr.trim_end());
            return Err(Error::Command {
                status: output.status.to_string(),
                stderr,
                exit_code: output.status.code(),
            });
        }
        fed?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect())
    }
}

impl Executor for PfctlExecutor {
    fn execute(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<String>> {
        self.runtime.block_on(self.run(args, stdin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_two_seconds() {
        let exec = PfctlExecutor::new("/sbin/pfctl").unwrap();
        assert_eq!(exec.timeout(), Duration::from_secs(2));
        assert_eq!(exec.program(), Path::new("/sbin/pfctl"));
    }

    #[test]
    fn test_quiet_flag_prefixed_and_lines_split() {
        // echo prints its arguments, which shows exactly what pfctl would receive
        let exec = PfctlExecutor::new("echo").unwrap();
        let lines = exec.execute(&["-s", "Running"], None).unwrap();
        assert_eq!(lines, vec!["-q -s Running".to_string()]);
    }

    #[test]
    fn test_spawn_failure_is_io_error() {
        let exec = PfctlExecutor::new("/does/not/exist/pfctl").unwrap();
        let err = exec.execute(&["-e"], None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_nonzero_exit_embeds_stderr() {
        // `ls -q <missing>` exits non-zero and complains on stderr
        let exec = PfctlExecutor::new("ls").unwrap();
        let err = exec
            .execute(&["/pfkit/definitely/missing/path"], None)
            .unwrap_err();
        match err {
            Error::Command {
                stderr, exit_code, ..
            } => {
                assert!(stderr.contains("/pfkit/definitely/missing/path"));
                assert_ne!(exit_code, Some(0));
            }
            other => panic!("expected command error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_timeout_overrides_bound() {
        let exec = PfctlExecutor::new("/sbin/pfctl")
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        assert_eq!(exec.timeout(), Duration::from_millis(250));
    }
}
