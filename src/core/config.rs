//! # Configuration Module / 配置模块
//!
//! Loads the `BrowserMatrix.toml` run configuration. The configuration is an
//! immutable value built once at start-up and handed explicitly to the registry,
//! the provider and the scheduler.
//!
//! 加载 `BrowserMatrix.toml` 运行配置。配置是在启动时构建一次的不可变值，
//! 并被显式传递给注册表、提供者和调度器。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::MatrixError;
use crate::core::models::{Environment, ProviderKind, SuiteRef};

/// Default file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "BrowserMatrix.toml";

/// Settings for one execution provider kind.
/// 单个执行提供者类型的设置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Command template run once per session. Supports the placeholders
    /// `{platform}`, `{browser}`, `{version}`, `{environment}`, `{suite}` and `{headless}`,
    /// plus `$VAR` / `${VAR}` environment expansion.
    ///
    /// 每个会话运行一次的命令模板。支持占位符
    /// `{platform}`、`{browser}`、`{version}`、`{environment}`、`{suite}` 和 `{headless}`，
    /// 以及 `$VAR` / `${VAR}` 环境变量展开。
    pub command: String,
    /// Browsers this provider can allocate. Empty means any browser.
    /// 此提供者可以分配的浏览器。为空表示任意浏览器。
    #[serde(default)]
    pub browsers: Vec<String>,
    /// Maximum number of sessions the provider may hold at once (vendor quota).
    /// 提供者可同时持有的最大会话数（供应商配额）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<usize>,
}

/// A matrix declared in the configuration file.
/// 在配置文件中声明的矩阵。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatrixDefinition {
    pub provider: ProviderKind,
    pub environments: Vec<Environment>,
}

/// The complete run configuration, loaded from a TOML file.
/// 从 TOML 文件加载的完整运行配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Per-session timeout in seconds.
    /// 单个会话的超时时间（秒）。
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Timeout for the whole run in seconds.
    /// 整个运行的超时时间（秒）。
    #[serde(default = "default_global_timeout_secs")]
    pub global_timeout_secs: u64,

    /// Maximum number of sessions running at once. Defaults to half the CPUs plus one.
    /// 同时运行的最大会话数。默认为 CPU 数的一半加一。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Total launch attempts per session when provisioning fails.
    /// 分配失败时每个会话的总启动尝试次数。
    #[serde(default = "default_max_launch_attempts")]
    pub max_launch_attempts: u8,

    /// Initial backoff between launch attempts, doubled after each failure.
    /// 启动尝试之间的初始退避时间，每次失败后翻倍。
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// The test suite handed to every session.
    #[serde(default)]
    pub suite: SuiteRef,

    /// Provider settings keyed by provider kind (`cloud-remote`, `local-headless`, `local-headed`).
    /// 以提供者类型为键的提供者设置。
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,

    /// Additional or replacement matrices keyed by mode.
    /// 以模式为键的附加或替换矩阵。
    #[serde(default)]
    pub matrices: BTreeMap<String, MatrixDefinition>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            session_timeout_secs: default_session_timeout_secs(),
            global_timeout_secs: default_global_timeout_secs(),
            concurrency: None,
            max_launch_attempts: default_max_launch_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            suite: SuiteRef::default(),
            providers: BTreeMap::new(),
            matrices: BTreeMap::new(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_session_timeout_secs() -> u64 {
    180
}

fn default_global_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_launch_attempts() -> u8 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

impl RunConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, MatrixError> {
        let config: RunConfig = toml::from_str(content).map_err(|source| MatrixError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the constraints serde cannot express.
    /// 检查 serde 无法表达的约束。
    pub fn validate(&self) -> Result<(), MatrixError> {
        if self.concurrency == Some(0) {
            return Err(MatrixError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_launch_attempts == 0 {
            return Err(MatrixError::InvalidConfig(
                "max_launch_attempts must be at least 1".to_string(),
            ));
        }
        if self.session_timeout_secs == 0 || self.global_timeout_secs == 0 {
            return Err(MatrixError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        for (key, settings) in &self.providers {
            if key.parse::<ProviderKind>().is_err() {
                return Err(MatrixError::InvalidConfig(format!(
                    "unknown provider kind '{key}' in [providers]"
                )));
            }
            if settings.max_sessions == Some(0) {
                return Err(MatrixError::InvalidConfig(format!(
                    "providers.{key}.max_sessions must be at least 1"
                )));
            }
        }
        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn global_timeout(&self) -> Duration {
        Duration::from_secs(self.global_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(num_cpus::get() / 2 + 1)
    }

    pub fn provider_settings(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        self.providers.get(kind.as_str())
    }
}

/// Reads and parses the run configuration file.
/// 读取并解析运行配置文件。
pub fn load_run_config(path: &Path) -> Result<RunConfig, MatrixError> {
    let content = fs::read_to_string(path).map_err(|source| MatrixError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    RunConfig::from_toml_str(&content, path)
}
