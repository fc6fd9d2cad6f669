//! Shared test utilities for core module tests
//!
//! Provides a scripted [`FakeExecutor`] so firewall logic can be tested
//! without spawning pfctl, plus temp-file fixtures that satisfy the
//! permission checks done when a `Firewall` is built.
//! This module is only compiled in test mode.

use crate::core::error::{Error, Result};
use crate::core::exec::Executor;
use crate::core::pf::Firewall;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One recorded executor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl Call {
    pub fn stdin_text(&self) -> String {
        String::from_utf8_lossy(self.stdin.as_deref().unwrap_or_default()).to_string()
    }
}

/// Executor that records every call and answers from a script.
///
/// A call fails if any argument equals a token registered with
/// [`FakeExecutor::fail_when`]; otherwise the first matching
/// [`FakeExecutor::respond`] entry supplies stdout lines.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Vec<(String, String)>>,
    responses: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, token: &str, lines: &[&str]) {
        self.responses.lock().unwrap().push((
            token.to_string(),
            lines.iter().map(|l| (*l).to_string()).collect(),
        ));
    }

    pub fn fail_when(&self, token: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((token.to_string(), stderr.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(Call {
            args: args.iter().map(|a| (*a).to_string()).collect(),
            stdin: stdin.map(<[u8]>::to_vec),
        });

        if let Some((_, stderr)) = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(token, _)| args.contains(&token.as_str()))
        {
            return Err(Error::Command {
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
                exit_code: Some(1),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(token, _)| args.contains(&token.as_str()))
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default())
    }
}

/// Temp directory holding a stand-in control command and device node
pub struct Fixture {
    // Held so the files outlive the test
    _dir: TempDir,
    pub control_path: PathBuf,
    pub device_path: PathBuf,
}

/// Creates an executable `pfctl` file and a read/write `pf` device file.
pub fn fixture() -> Fixture {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let control_path = dir.path().join("pfctl");
    let device_path = dir.path().join("pf");

    std::fs::write(&control_path, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&control_path, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(&device_path, "").unwrap();
    std::fs::set_permissions(&device_path, std::fs::Permissions::from_mode(0o600)).unwrap();

    Fixture {
        _dir: dir,
        control_path,
        device_path,
    }
}

/// Builds a validated firewall wired to a fresh fake executor.
pub fn fake_firewall() -> (Fixture, Firewall, Arc<FakeExecutor>) {
    let fx = fixture();
    let fake = Arc::new(FakeExecutor::new());
    let fw = Firewall::with_executor(&fx.control_path, &fx.device_path, fake.clone()).unwrap();
    (fx, fw, fake)
}
