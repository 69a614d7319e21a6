// Shared test helpers for integration tests
#![allow(dead_code)]

use browser_matrix::core::error::ProviderError;
use browser_matrix::core::models::{Environment, Matrix, Outcome, ProviderKind, SuiteRef};
use browser_matrix::core::provider::{ExecutionProvider, ProviderOutcome, SessionHandle};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Parses `platform/browser[@version]`, panicking on malformed input.
pub fn env(spec: &str) -> Environment {
    spec.parse().expect("valid environment")
}

pub fn matrix(mode: &str, specs: &[&str]) -> Matrix {
    Matrix::new(mode, ProviderKind::CloudRemote, specs.iter().map(|s| env(s)).collect())
        .expect("valid matrix")
}

/// What the scripted provider does for one environment.
#[derive(Debug, Clone)]
pub struct Script {
    /// Number of launch attempts that fail before one succeeds.
    pub launch_failures: u8,
    pub outcome: Outcome,
    /// How long the session "runs" before reporting `outcome`.
    pub delay: Duration,
    pub output: String,
}

impl Script {
    pub fn passing(delay: Duration) -> Self {
        Self {
            launch_failures: 0,
            outcome: Outcome::Passed,
            delay,
            output: "all tests passed".to_string(),
        }
    }

    pub fn failing(delay: Duration) -> Self {
        Self {
            outcome: Outcome::Failed,
            output: "1 test failed".to_string(),
            ..Self::passing(delay)
        }
    }

    pub fn with_launch_failures(mut self, failures: u8) -> Self {
        self.launch_failures = failures;
        self
    }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An in-memory provider driven by per-environment scripts. It records launch
/// attempts, cancellations and the highest number of sessions awaited at once.
pub struct ScriptedProvider {
    default: Script,
    scripts: HashMap<Environment, Script>,
    attempts: Mutex<HashMap<Environment, u8>>,
    cancels: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(default: Script) -> Self {
        Self {
            default,
            scripts: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            cancels: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, environment: &str, script: Script) -> Self {
        self.scripts.insert(env(environment), script);
        self
    }

    fn script_for(&self, environment: &Environment) -> &Script {
        self.scripts.get(environment).unwrap_or(&self.default)
    }

    pub fn launch_attempts(&self, environment: &str) -> u8 {
        self.attempts
            .lock()
            .unwrap()
            .get(&env(environment))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_launch_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().map(|a| *a as usize).sum()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

impl ExecutionProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CloudRemote
    }

    async fn launch(
        &self,
        environment: &Environment,
        _suite: &SuiteRef,
    ) -> Result<SessionHandle, ProviderError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(environment.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt <= self.script_for(environment).launch_failures {
            return Err(ProviderError::provisioning(environment, "no browser available"));
        }
        Ok(SessionHandle::new(environment.clone()))
    }

    async fn await_outcome(&self, handle: &SessionHandle, timeout: Duration) -> ProviderOutcome {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let script = self.script_for(handle.environment()).clone();
        tokio::select! {
            biased;
            _ = handle.cancelled() => ProviderOutcome::new(Outcome::TimedOut, "cancelled"),
            _ = tokio::time::sleep(timeout) => ProviderOutcome::new(Outcome::TimedOut, "session timeout"),
            _ = tokio::time::sleep(script.delay) => ProviderOutcome::new(script.outcome, script.output),
        }
    }

    async fn cancel(&self, handle: &SessionHandle) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        handle.signal_cancel();
    }
}

/// Writes `content` as `BrowserMatrix.toml` inside `temp_dir` and returns its path.
pub fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
    let path = temp_dir.path().join("BrowserMatrix.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

/// A configuration whose `local-headless` provider runs `command` and whose
/// `smoke` matrix holds the given environments.
pub fn command_config(command: &str, environments: &[&str]) -> String {
    let environments = environments
        .iter()
        .map(|e| format!("\"{e}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"language = "en"
session_timeout_secs = 20
global_timeout_secs = 60
retry_backoff_ms = 10

[providers.local-headless]
command = "{command}"

[matrices.smoke]
provider = "local-headless"
environments = [{environments}]
"#
    )
}
