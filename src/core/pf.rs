//! Top-level pf handle
//!
//! A [`Firewall`] remembers where pfctl and the pf device live and routes every
//! operation through an [`Executor`]. Building one checks, up front, that this
//! process can execute pfctl and read/write the device, so later failures come
//! from pf itself rather than from the local setup.
//!
//! Several handles may coexist; each is validated on its own.

use crate::config::PfConfig;
use crate::core::anchor::{self, Anchor};
use crate::core::error::{Error, Result};
use crate::core::exec::{Executor, PfctlExecutor};
use nix::unistd::{AccessFlags, access};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default location of the pf device
pub const DEFAULT_DEVICE_PATH: &str = "/dev/pf";

/// Default location of pfctl
pub const DEFAULT_CONTROL_PATH: &str = "/sbin/pfctl";

/// Status line printed by `pfctl -s Running` when pf is on
const STATUS_ENABLED: &str = "Enabled";

#[derive(Debug, Clone)]
pub struct Firewall {
    control_path: PathBuf,
    device_path: PathBuf,
    executor: Arc<dyn Executor>,
}

impl Firewall {
    /// Opens a handle for `control_path` using the default device path.
    ///
    /// # Errors
    ///
    /// Returns `Err` if pfctl is not executable or `/dev/pf` is not
    /// read/writable by this process.
    pub fn new(control_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_device(control_path, DEFAULT_DEVICE_PATH)
    }

    /// Opens a handle for a custom control command and device path.
    ///
    /// # Errors
    ///
    /// Same as [`Firewall::new`].
    pub fn with_device(
        control_path: impl AsRef<Path>,
        device_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let control_path = control_path.as_ref();
        validate_paths(control_path, device_path.as_ref())?;
        let executor = Arc::new(PfctlExecutor::new(control_path)?);
        Self::build(control_path, device_path.as_ref(), executor)
    }

    /// Opens a handle from persisted configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Firewall::new`].
    pub fn from_config(config: &PfConfig) -> Result<Self> {
        Self::with_device(&config.control_path, &config.device_path)
    }

    /// Opens a handle that runs pfctl through a caller-supplied executor.
    /// The paths are validated exactly as in [`Firewall::new`].
    ///
    /// # Errors
    ///
    /// Same as [`Firewall::new`].
    pub fn with_executor(
        control_path: impl AsRef<Path>,
        device_path: impl AsRef<Path>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        validate_paths(control_path.as_ref(), device_path.as_ref())?;
        Self::build(control_path.as_ref(), device_path.as_ref(), executor)
    }

    fn build(control_path: &Path, device_path: &Path, executor: Arc<dyn Executor>) -> Result<Self> {
        debug!(
            "Firewall handle ready: control={} device={}",
            control_path.display(),
            device_path.display()
        );
        Ok(Self {
            control_path: control_path.to_path_buf(),
            device_path: device_path.to_path_buf(),
            executor,
        })
    }

    pub fn control_path(&self) -> &Path {
        &self.control_path
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Reports whether pf is running. Any query failure reads as disabled.
    pub fn enabled(&self) -> bool {
        match self.executor.execute(&["-s", "Running"], None) {
            Ok(lines) => lines.first().is_some_and(|l| l == STATUS_ENABLED),
            Err(e) => {
                debug!("Status query failed, treating pf as disabled: {e}");
                false
            }
        }
    }

    /// Enables pf unless it is already enabled.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `pfctl -e` fails.
    pub fn enable(&self) -> Result<()> {
        if self.enabled() {
            debug!("pf already enabled");
            return Ok(());
        }
        self.executor.execute(&["-e"], None)?;
        info!("pf enabled");
        Ok(())
    }

    /// Disables pf unless it is already disabled.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `pfctl -d` fails.
    pub fn disable(&self) -> Result<()> {
        if !self.enabled() {
            debug!("pf already disabled");
            return Ok(());
        }
        self.executor.execute(&["-d"], None)?;
        info!("pf disabled");
        Ok(())
    }

    /// Creates an anchor bound to this firewall with an empty ruleset
    pub fn new_anchor(&self, name: impl Into<String>) -> Anchor {
        Anchor::new(name, Arc::clone(&self.executor))
    }

    /// Loads `anchor`'s ruleset into pf through this firewall's executor.
    ///
    /// # Errors
    ///
    /// Returns the executor's error unchanged if pfctl fails.
    pub fn commit_anchor(&self, anchor: &Anchor) -> Result<()> {
        anchor::load_anchor(self.executor.as_ref(), anchor)
    }

    /// Returns the currently loaded filter rules, one per line
    ///
    /// # Errors
    ///
    /// Returns `Err` if `pfctl -s rules` fails.
    pub fn rules(&self) -> Result<Vec<String>> {
        self.executor.execute(&["-s", "rules"], None)
    }

    /// Returns the names of the currently defined tables
    ///
    /// # Errors
    ///
    /// Returns `Err` if `pfctl -s Tables` fails.
    pub fn tables(&self) -> Result<Vec<String>> {
        self.executor.execute(&["-s", "Tables"], None)
    }
}

/// Checks that `control_path` is an executable file and `device_path` is
/// read/writable for the current process.
fn validate_paths(control_path: &Path, device_path: &Path) -> Result<()> {
    if !control_path.is_file() || access(control_path, AccessFlags::X_OK).is_err() {
        return Err(Error::NotExecutable {
            path: control_path.to_path_buf(),
        });
    }
    if !device_path.exists() || access(device_path, AccessFlags::R_OK | AccessFlags::W_OK).is_err()
    {
        return Err(Error::DeviceInaccessible {
            path: device_path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{FakeExecutor, fake_firewall, fixture};

    #[test]
    fn test_missing_control_path_rejected() {
        let fx = fixture();
        let err = Firewall::with_device("/does/not/exist", &fx.device_path).unwrap_err();
        assert!(matches!(err, Error::NotExecutable { .. }));
    }

    #[test]
    fn test_non_executable_control_path_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        std::fs::set_permissions(&fx.control_path, std::fs::Permissions::from_mode(0o644))
            .unwrap();
        let err = Firewall::with_device(&fx.control_path, &fx.device_path).unwrap_err();
        assert!(matches!(err, Error::NotExecutable { .. }));
        assert!(err.to_string().ends_with("is not executable"));
    }

    #[test]
    fn test_directory_is_not_a_control_command() {
        let fx = fixture();
        let dir = fx.control_path.parent().unwrap();
        let err = Firewall::with_device(dir, &fx.device_path).unwrap_err();
        assert!(matches!(err, Error::NotExecutable { .. }));
    }

    #[test]
    fn test_missing_device_rejected() {
        let fx = fixture();
        let err = Firewall::with_device(&fx.control_path, "/does/also/not/exist").unwrap_err();
        assert!(matches!(err, Error::DeviceInaccessible { .. }));
    }

    #[test]
    fn test_valid_paths_accepted() {
        let fx = fixture();
        let fw = Firewall::with_device(&fx.control_path, &fx.device_path).unwrap();
        assert_eq!(fw.control_path(), fx.control_path.as_path());
        assert_eq!(fw.device_path(), fx.device_path.as_path());
    }

    #[test]
    fn test_with_executor_still_validates() {
        let fake = Arc::new(FakeExecutor::new());
        let fx = fixture();
        assert!(Firewall::with_executor("/nope", &fx.device_path, fake).is_err());
    }

    #[test]
    fn test_enabled_parses_first_line() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Enabled", "ignored"]);
        assert!(fw.enabled());
        assert_eq!(fake.calls()[0].args, ["-s", "Running"]);
    }

    #[test]
    fn test_enabled_requires_exact_match() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Enabled "]);
        assert!(!fw.enabled());
    }

    #[test]
    fn test_enabled_false_on_failure() {
        let (_fx, fw, fake) = fake_firewall();
        fake.fail_when("Running", "pfctl: /dev/pf: Permission denied");
        assert!(!fw.enabled());
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Enabled"]);
        fw.enable().unwrap();
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn test_enable_when_disabled() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Disabled"]);
        fw.enable().unwrap();
        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].args, ["-e"]);
    }

    #[test]
    fn test_disable_when_enabled() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Enabled"]);
        fw.disable().unwrap();
        assert_eq!(fake.calls()[1].args, ["-d"]);
    }

    #[test]
    fn test_disable_is_idempotent() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("Running", &["Disabled"]);
        fw.disable().unwrap();
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn test_enable_failure_propagates() {
        let (_fx, fw, fake) = fake_firewall();
        fake.fail_when("-e", "pfctl: pf already enabled");
        assert!(fw.enable().is_err());
    }

    #[test]
    fn test_new_anchor_is_empty() {
        let (_fx, fw, _fake) = fake_firewall();
        let anchor = fw.new_anchor("testanchor");
        assert_eq!(anchor.name(), "testanchor");
        assert!(anchor.rule_set().is_empty());
    }

    #[test]
    fn test_commit_anchor_uses_firewall_executor() {
        let (_fx, fw, fake) = fake_firewall();
        let mut anchor = fw.new_anchor("web");
        let mut rule = anchor.new_rule();
        rule.commit();
        anchor.add_rule(rule);

        fw.commit_anchor(&anchor).unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].args, ["-a", "web", "-f", "-", "-v"]);
        assert_eq!(calls[0].stdin_text(), "block from any to any\n");
    }

    #[test]
    fn test_rules_and_tables_listing() {
        let (_fx, fw, fake) = fake_firewall();
        fake.respond("rules", &["block drop in all", "pass out all"]);
        fake.respond("Tables", &["bruteforce"]);

        assert_eq!(fw.rules().unwrap().len(), 2);
        assert_eq!(fw.tables().unwrap(), vec!["bruteforce".to_string()]);
    }
}
