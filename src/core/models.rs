//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures shared by the registry, the
//! scheduler and the aggregator: environments, matrices, sessions and their
//! archived records.
//!
//! 此模块定义了注册表、调度器和聚合器共享的核心数据结构：
//! 环境、矩阵、会话及其归档记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::core::error::MatrixError;

/// Version string used when an environment does not pin a browser version.
/// 当环境未固定浏览器版本时使用的版本字符串。
pub const LATEST_VERSION: &str = "latest";

/// A single execution target: an operating system, a browser and a browser version.
/// Environments are immutable values identified by their tuple. They order by
/// platform, then browser, then version, which keeps reports deterministic.
///
/// 单个执行目标：操作系统、浏览器和浏览器版本。
/// 环境是由其元组标识的不可变值。它们按平台、浏览器、版本排序，
/// 以保证报告的确定性。
///
/// The textual form is `platform/browser[@version]`, e.g. `Windows 10/firefox@54`
/// or `Android/chrome`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "EnvironmentRepr")]
pub struct Environment {
    platform: String,
    browser: String,
    version: String,
}

/// Accepted configuration shapes for an environment.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvironmentRepr {
    Short(String),
    Full {
        platform: String,
        browser: String,
        #[serde(default)]
        version: Option<String>,
    },
}

impl TryFrom<EnvironmentRepr> for Environment {
    type Error = MatrixError;

    fn try_from(repr: EnvironmentRepr) -> Result<Self, Self::Error> {
        match repr {
            EnvironmentRepr::Short(spec) => spec.parse(),
            EnvironmentRepr::Full {
                platform,
                browser,
                version,
            } => Environment::new(platform, browser, version.as_deref()),
        }
    }
}

impl Environment {
    /// Creates a validated environment. An absent or blank version means `latest`.
    /// 创建经过校验的环境。缺省或空白版本表示 `latest`。
    pub fn new(
        platform: impl Into<String>,
        browser: impl Into<String>,
        version: Option<&str>,
    ) -> Result<Self, MatrixError> {
        let platform = platform.into().trim().to_string();
        let browser = browser.into().trim().to_string();
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(LATEST_VERSION)
            .to_string();

        let spec = format!("{platform}/{browser}@{version}");
        if platform.is_empty() {
            return Err(MatrixError::InvalidEnvironment {
                spec,
                reason: "platform is empty".to_string(),
            });
        }
        if browser.is_empty() {
            return Err(MatrixError::InvalidEnvironment {
                spec,
                reason: "browser is empty".to_string(),
            });
        }
        if platform.contains('/') || browser.contains('/') || version.contains('/') {
            return Err(MatrixError::InvalidEnvironment {
                spec,
                reason: "platform, browser and version must not contain '/'".to_string(),
            });
        }
        if browser.contains('@') {
            return Err(MatrixError::InvalidEnvironment {
                spec,
                reason: "browser must not contain '@'".to_string(),
            });
        }

        Ok(Self {
            platform,
            browser,
            version,
        })
    }

    /// Builds an environment from trusted static data without validation.
    pub(crate) fn from_static(platform: &str, browser: &str, version: &str) -> Self {
        Self {
            platform: platform.to_string(),
            browser: browser.to_string(),
            version: version.to_string(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn browser(&self) -> &str {
        &self.browser
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    /// A lowercase identifier made only of ASCII alphanumerics and dashes,
    /// suitable for HTML ids and file names.
    /// 仅由 ASCII 字母数字和连字符组成的小写标识符，适用于 HTML id 和文件名。
    pub fn slug(&self) -> String {
        let raw = format!("{}-{}-{}", self.platform, self.browser, self.version);
        let mut slug = String::with_capacity(raw.len());
        let mut last_dash = false;
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        slug.trim_matches('-').to_string()
    }
}

impl FromStr for Environment {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| MatrixError::InvalidEnvironment {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let (platform, rest) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected 'platform/browser[@version]'"))?;
        let (browser, version) = match rest.split_once('@') {
            Some((browser, version)) => {
                if version.trim().is_empty() {
                    return Err(invalid("version after '@' is empty"));
                }
                (browser, Some(version))
            }
            None => (rest, None),
        };

        Environment::new(platform, browser, version)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_latest() {
            write!(f, "{}/{}", self.platform, self.browser)
        } else {
            write!(f, "{}/{}@{}", self.platform, self.browser, self.version)
        }
    }
}

/// The execution backend variants a matrix can be run on.
/// 矩阵可以运行的执行后端类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// A cloud browser farm reached through an opaque command.
    /// 通过不透明命令访问的云端浏览器集群。
    CloudRemote,
    /// Browsers on the local machine without a visible window.
    /// 本机上不显示窗口的浏览器。
    LocalHeadless,
    /// Browsers on the local machine with a visible window.
    /// 本机上显示窗口的浏览器。
    LocalHeaded,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::CloudRemote,
        ProviderKind::LocalHeadless,
        ProviderKind::LocalHeaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CloudRemote => "cloud-remote",
            ProviderKind::LocalHeadless => "local-headless",
            ProviderKind::LocalHeaded => "local-headed",
        }
    }

    pub fn is_local(&self) -> bool {
        !matches!(self, ProviderKind::CloudRemote)
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, ProviderKind::LocalHeadless)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown provider kind '{s}'"))
    }
}

/// A named, non-empty, duplicate-free sequence of environments together with
/// the provider kind that runs it.
/// Declaration order only affects console output; reports are keyed by environment.
///
/// 一个具名的、非空且无重复的环境序列，以及运行它的提供者类型。
/// 声明顺序只影响控制台输出；报告以环境为键。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    mode: String,
    provider: ProviderKind,
    environments: Vec<Environment>,
}

impl Matrix {
    pub fn new(
        mode: impl Into<String>,
        provider: ProviderKind,
        environments: Vec<Environment>,
    ) -> Result<Self, MatrixError> {
        let mode = mode.into();
        if environments.is_empty() {
            return Err(MatrixError::EmptyMatrix { mode });
        }
        for (i, environment) in environments.iter().enumerate() {
            if environments[..i].contains(environment) {
                return Err(MatrixError::DuplicateEnvironment {
                    mode,
                    environment: environment.clone(),
                });
            }
        }
        Ok(Self {
            mode,
            provider,
            environments,
        })
    }

    /// Builds a matrix from trusted static data without validation.
    pub(crate) fn from_parts(mode: &str, provider: ProviderKind, environments: Vec<Environment>) -> Self {
        Self {
            mode: mode.to_string(),
            provider,
            environments,
        }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    pub fn contains(&self, environment: &Environment) -> bool {
        self.environments.contains(environment)
    }

    /// Returns the same matrix bound to a different provider kind.
    /// 返回绑定到另一种提供者类型的相同矩阵。
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Returns the sub-matrix made of the selected environments, keeping order.
    /// `None` when the selection is empty.
    pub(crate) fn subset(&self, keep: impl Fn(usize, &Environment) -> bool) -> Option<Matrix> {
        let environments: Vec<_> = self
            .environments
            .iter()
            .enumerate()
            .filter(|(i, env)| keep(*i, env))
            .map(|(_, env)| env.clone())
            .collect();
        if environments.is_empty() {
            None
        } else {
            Some(Matrix {
                mode: self.mode.clone(),
                provider: self.provider,
                environments,
            })
        }
    }
}

/// Reference to the test suite handed to every session (a path or URL).
/// 传递给每个会话的测试套件引用（路径或 URL）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteRef(String);

impl SuiteRef {
    pub fn new(suite: impl Into<String>) -> Self {
        Self(suite.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SuiteRef {
    fn default() -> Self {
        Self("test/".to_string())
    }
}

impl fmt::Display for SuiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal result of one session.
/// 单个会话的终止结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Passed,
    Failed,
    /// The session or the whole run ran out of time.
    /// 会话或整个运行超时。
    TimedOut,
    /// The session could not be provisioned or its result could not be observed.
    /// 会话无法分配，或无法观察到其结果。
    Errored,
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed-out",
            Outcome::Errored => "errored",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a session: `pending → running → terminal`, or
/// `pending → terminal` when the session never launched.
/// 会话的生命周期状态：`pending → running → 终止`，
/// 或会话从未启动时的 `pending → 终止`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Pending,
    Running,
    Passed,
    Failed,
    TimedOut,
    Errored,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Running)
    }

    /// The outcome carried by a terminal status.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SessionStatus::Pending | SessionStatus::Running => None,
            SessionStatus::Passed => Some(Outcome::Passed),
            SessionStatus::Failed => Some(Outcome::Failed),
            SessionStatus::TimedOut => Some(Outcome::TimedOut),
            SessionStatus::Errored => Some(Outcome::Errored),
        }
    }
}

impl From<Outcome> for SessionStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => SessionStatus::Passed,
            Outcome::Failed => SessionStatus::Failed,
            Outcome::TimedOut => SessionStatus::TimedOut,
            Outcome::Errored => SessionStatus::Errored,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome() {
            Some(outcome) => outcome.fmt(f),
            None if *self == SessionStatus::Pending => f.write_str("pending"),
            None => f.write_str("running"),
        }
    }
}

/// A runtime session binding one environment to one test execution.
/// Terminal states are absorbing: once finished, later transitions are ignored.
///
/// 将一个环境绑定到一次测试执行的运行时会话。
/// 终止状态是吸收态：一旦结束，之后的状态转换都会被忽略。
#[derive(Debug)]
pub struct Session {
    environment: Environment,
    status: SessionStatus,
    attempts: u8,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    duration: Duration,
    logs: Vec<String>,
    cut_off: bool,
}

impl Session {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            status: SessionStatus::Pending,
            attempts: 0,
            started_at: None,
            started: None,
            duration: Duration::ZERO,
            logs: Vec::new(),
            cut_off: false,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn is_cut_off(&self) -> bool {
        self.cut_off
    }

    /// Counts one launch attempt and returns the new total.
    pub fn record_attempt(&mut self) -> u8 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// `pending → running`. Returns `false` if the session was not pending.
    /// `pending → running`。如果会话不处于 pending 状态则返回 `false`。
    pub fn start(&mut self) -> bool {
        if self.status != SessionStatus::Pending {
            return false;
        }
        self.status = SessionStatus::Running;
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        true
    }

    /// Moves the session into the terminal state for `outcome`.
    /// Returns `false` (and changes nothing) if it was already terminal.
    ///
    /// 将会话移入 `outcome` 对应的终止状态。
    /// 如果已经是终止状态，则返回 `false` 且不做任何更改。
    pub fn finish(&mut self, outcome: Outcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.into();
        self.duration = self
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        true
    }

    /// Finishes the session as `timed-out` because the run was stopped.
    /// 由于运行被停止，以 `timed-out` 结束会话。
    pub fn cut_off(&mut self) -> bool {
        let applied = self.finish(Outcome::TimedOut);
        if applied {
            self.cut_off = true;
        }
        applied
    }

    /// Archives the session. A session that never reached a terminal state is
    /// archived as `errored` so that it still shows up in the report.
    ///
    /// 归档会话。从未达到终止状态的会话会被归档为 `errored`，
    /// 以确保它仍然出现在报告中。
    pub fn into_record(mut self) -> SessionRecord {
        let outcome = match self.status.outcome() {
            Some(outcome) => outcome,
            None => {
                self.logs.push(format!(
                    "session archived while still {}",
                    self.status
                ));
                Outcome::Errored
            }
        };
        SessionRecord {
            environment: self.environment,
            outcome,
            attempts: self.attempts,
            started_at: self.started_at,
            duration: self.duration,
            logs: self.logs,
            cut_off: self.cut_off,
        }
    }
}

/// The archived form of a finished session, as it appears in the report.
/// 已结束会话的归档形式，即其在报告中的样子。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub environment: Environment,
    pub outcome: Outcome,
    /// Launch attempts made, including the successful one.
    /// 已进行的启动尝试次数，包括成功的那一次。
    pub attempts: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub logs: Vec<String>,
    /// `true` when the run was stopped before this session could finish.
    /// 当运行在此会话完成之前被停止时为 `true`。
    pub cut_off: bool,
}

impl SessionRecord {
    /// A record for a session that failed outside the normal flow.
    pub fn errored(environment: Environment, message: impl Into<String>) -> Self {
        Self {
            environment,
            outcome: Outcome::Errored,
            attempts: 0,
            started_at: None,
            duration: Duration::ZERO,
            logs: vec![message.into()],
            cut_off: false,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.outcome.is_passed()
    }

    /// Number of extra launch attempts beyond the first.
    pub fn retries(&self) -> u8 {
        self.attempts.saturating_sub(1)
    }

    pub fn output(&self) -> String {
        self.logs.join("\n")
    }
}
