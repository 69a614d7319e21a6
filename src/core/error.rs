//! # Error Taxonomy Module / 错误分类模块
//!
//! Fatal errors abort a run before any session is launched. Provider errors
//! are per-session: the scheduler retries or degrades the single session and
//! the run continues.
//!
//! 致命错误会在启动任何会话之前中止运行。提供者错误只影响单个会话：
//! 调度器会重试或将该会话降级，运行本身继续。

use std::path::PathBuf;
use thiserror::Error;

use crate::core::models::Environment;

/// Errors that stop a run before scheduling begins.
/// 在调度开始之前终止运行的错误。
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The requested mode key is not registered.
    /// 请求的模式键未注册。
    #[error("unknown mode '{mode}' (known modes: {})", .known.join(", "))]
    UnknownMode { mode: String, known: Vec<String> },

    #[error("invalid environment '{spec}': {reason}")]
    InvalidEnvironment { spec: String, reason: String },

    #[error("matrix '{mode}' has no environments")]
    EmptyMatrix { mode: String },

    #[error("matrix '{mode}' lists {environment} more than once")]
    DuplicateEnvironment { mode: String, environment: Environment },

    #[error("failed to read config file '{}'", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}'", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The execution provider could not be initialized at all.
    /// 执行提供者完全无法初始化。
    #[error("{kind} provider initialization failed: {reason}")]
    ProviderInit { kind: String, reason: String },

    #[error("invalid shard: {0}")]
    InvalidShard(String),
}

/// Per-session errors raised by an execution provider.
/// 执行提供者产生的单会话错误。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not allocate the environment: unsupported
    /// combination, exhausted quota, or a backend that failed to start.
    /// 提供者无法分配该环境：不支持的组合、配额耗尽或后端启动失败。
    #[error("cannot provision {environment}: {reason}")]
    Provisioning {
        environment: Environment,
        reason: String,
    },
}

impl ProviderError {
    pub fn provisioning(environment: &Environment, reason: impl Into<String>) -> Self {
        ProviderError::Provisioning {
            environment: environment.clone(),
            reason: reason.into(),
        }
    }
}
