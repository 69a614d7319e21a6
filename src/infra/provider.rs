//! # Command Provider Module / 命令提供者模块
//!
//! The shipped [`ExecutionProvider`]: every session is one run of a configured
//! command template, for example a test-runner CLI pointed at a cloud browser
//! farm or at a local browser. Exit status 0 is a pass.
//!
//! 内置的 [`ExecutionProvider`]：每个会话就是一次配置好的命令模板的运行，
//! 例如指向云端浏览器集群或本地浏览器的测试运行器 CLI。退出码 0 表示通过。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::config::{ProviderSettings, RunConfig};
use crate::core::error::{MatrixError, ProviderError};
use crate::core::models::{Environment, Outcome, ProviderKind, SuiteRef};
use crate::core::provider::{ExecutionProvider, ProviderOutcome, SessionHandle, SessionId};
use crate::infra::command::{self, RunningCommand};

/// Releases one unit of provider quota when dropped.
#[derive(Debug)]
struct QuotaGuard(Arc<AtomicUsize>);

impl Drop for QuotaGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct ActiveSession {
    command: RunningCommand,
    _quota: QuotaGuard,
}

enum Exit {
    Status(std::io::Result<std::process::ExitStatus>),
    Timeout,
    Cancelled,
}

/// Runs sessions as child processes built from a command template.
/// 将会话作为由命令模板构建的子进程运行。
#[derive(Debug)]
pub struct CommandProvider {
    kind: ProviderKind,
    template: Vec<String>,
    browsers: Vec<String>,
    max_sessions: Option<usize>,
    working_dir: Option<PathBuf>,
    allocated: Arc<AtomicUsize>,
    sessions: Mutex<HashMap<SessionId, ActiveSession>>,
}

impl CommandProvider {
    /// Builds a provider from its settings. The template is expanded and
    /// split once here, so a broken template fails before any session starts.
    ///
    /// 根据设置构建提供者。模板在此处展开并拆分一次，
    /// 因此损坏的模板会在任何会话开始之前就失败。
    pub fn new(kind: ProviderKind, settings: &ProviderSettings) -> Result<Self, MatrixError> {
        let template = command::split_template(&settings.command).map_err(|e| {
            MatrixError::ProviderInit {
                kind: kind.to_string(),
                reason: format!("{e:#}"),
            }
        })?;

        Ok(Self {
            kind,
            template,
            browsers: settings
                .browsers
                .iter()
                .map(|b| b.trim().to_lowercase())
                .collect(),
            max_sessions: settings.max_sessions,
            working_dir: None,
            allocated: Arc::new(AtomicUsize::new(0)),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Builds the provider configured under `[providers.<kind>]`.
    /// 构建在 `[providers.<kind>]` 下配置的提供者。
    pub fn from_config(kind: ProviderKind, config: &RunConfig) -> Result<Self, MatrixError> {
        let settings = config
            .provider_settings(kind)
            .ok_or_else(|| MatrixError::ProviderInit {
                kind: kind.to_string(),
                reason: format!("no [providers.{kind}] section in the configuration"),
            })?;
        Self::new(kind, settings)
    }

    /// Runs every session command from `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Number of sessions currently holding provider quota.
    /// 当前占用提供者配额的会话数。
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    fn check_capability(&self, environment: &Environment) -> Result<(), ProviderError> {
        if !self.browsers.is_empty()
            && !self
                .browsers
                .iter()
                .any(|b| b.eq_ignore_ascii_case(environment.browser()))
        {
            return Err(ProviderError::provisioning(
                environment,
                format!("browser '{}' is not offered by the {} provider", environment.browser(), self.kind),
            ));
        }
        if self.kind.is_local() && !is_local_platform(environment.platform()) {
            return Err(ProviderError::provisioning(
                environment,
                format!(
                    "platform '{}' is not available on this {} machine",
                    environment.platform(),
                    std::env::consts::OS
                ),
            ));
        }
        Ok(())
    }

    fn reserve(&self, environment: &Environment) -> Result<QuotaGuard, ProviderError> {
        let reserved = self
            .allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match self.max_sessions {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            });
        match reserved {
            Ok(_) => Ok(QuotaGuard(Arc::clone(&self.allocated))),
            Err(current) => Err(ProviderError::provisioning(
                environment,
                format!("session quota exhausted ({current} in use)"),
            )),
        }
    }

    fn render(&self, environment: &Environment, suite: &SuiteRef) -> Vec<String> {
        let headless = self.kind.is_headless().to_string();
        let label = environment.to_string();
        self.template
            .iter()
            .map(|part| {
                part.replace("{platform}", environment.platform())
                    .replace("{browser}", environment.browser())
                    .replace("{version}", environment.version())
                    .replace("{environment}", &label)
                    .replace("{suite}", suite.as_str())
                    .replace("{headless}", &headless)
            })
            .collect()
    }

    fn build_command(&self, environment: &Environment, suite: &SuiteRef) -> (String, Command) {
        let parts = self.render(environment, suite);
        let program = parts[0].clone();
        let mut cmd = Command::new(&program);
        cmd.args(&parts[1..])
            .env("BROWSER_MATRIX_PROVIDER", self.kind.as_str())
            .env("BROWSER_MATRIX_PLATFORM", environment.platform())
            .env("BROWSER_MATRIX_BROWSER", environment.browser())
            .env("BROWSER_MATRIX_VERSION", environment.version())
            .env("BROWSER_MATRIX_SUITE", suite.as_str())
            .env("BROWSER_MATRIX_HEADLESS", self.kind.is_headless().to_string());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        (parts.join(" "), cmd)
    }
}

/// Local providers only run `local` environments or ones naming the host OS.
fn is_local_platform(platform: &str) -> bool {
    let platform = platform.trim().to_lowercase();
    platform == "local" || platform.starts_with(std::env::consts::OS)
}

impl ExecutionProvider for CommandProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn launch(
        &self,
        environment: &Environment,
        suite: &SuiteRef,
    ) -> Result<SessionHandle, ProviderError> {
        self.check_capability(environment)?;
        let quota = self.reserve(environment)?;

        let (command_line, cmd) = self.build_command(environment, suite);
        let running = command::spawn_captured(cmd).map_err(|e| {
            ProviderError::provisioning(environment, format!("failed to start '{command_line}': {e}"))
        })?;

        let handle = SessionHandle::new(environment.clone());
        info!(
            session = %handle.id(),
            environment = %environment,
            pid = running.pid(),
            command = %command_line,
            "session launched"
        );
        self.sessions.lock().await.insert(
            handle.id(),
            ActiveSession {
                command: running,
                _quota: quota,
            },
        );
        Ok(handle)
    }

    async fn await_outcome(&self, handle: &SessionHandle, timeout: Duration) -> ProviderOutcome {
        let removed = self.sessions.lock().await.remove(&handle.id());
        let Some(mut active) = removed else {
            return if handle.is_cancelled() {
                ProviderOutcome::new(Outcome::TimedOut, "session was cancelled before completion")
            } else {
                ProviderOutcome::new(Outcome::Errored, format!("unknown session {}", handle.id()))
            };
        };

        let exit = tokio::select! {
            biased;
            _ = handle.cancelled() => Exit::Cancelled,
            status = active.command.wait() => Exit::Status(status),
            _ = tokio::time::sleep(timeout) => Exit::Timeout,
        };

        if !matches!(exit, Exit::Status(_)) {
            handle.signal_cancel();
            active.command.kill().await;
        }
        let output = active.command.into_output().await;

        let outcome = match exit {
            Exit::Status(Ok(status)) if status.success() => Outcome::Passed,
            Exit::Status(Ok(status)) => {
                debug!(session = %handle.id(), code = ?status.code(), "session command failed");
                Outcome::Failed
            }
            Exit::Status(Err(e)) => {
                return ProviderOutcome::new(
                    Outcome::Errored,
                    format!("{output}failed to observe exit status: {e}"),
                );
            }
            Exit::Timeout | Exit::Cancelled => Outcome::TimedOut,
        };
        ProviderOutcome::new(outcome, output)
    }

    async fn cancel(&self, handle: &SessionHandle) {
        handle.signal_cancel();
        let removed = self.sessions.lock().await.remove(&handle.id());
        if let Some(mut active) = removed {
            debug!(session = %handle.id(), "cancelling session that was never awaited");
            active.command.kill().await;
        }
    }
}
