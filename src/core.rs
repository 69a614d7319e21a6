//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Browser Matrix: the data
//! models, the matrix registry, the provider interface, the session scheduler
//! and the result aggregator.
//!
//! 此模块包含 Browser Matrix 的核心功能：数据模型、矩阵注册表、
//! 提供者接口、会话调度器和结果聚合器。

pub mod aggregate;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod provider;
pub mod registry;
pub mod scheduler;

// Re-exports
pub use aggregate::{Report, RunStatus, Termination};
pub use error::{MatrixError, ProviderError};
pub use models::{Environment, Matrix, Outcome};
pub use provider::ExecutionProvider;
pub use registry::MatrixRegistry;
pub use scheduler::{RunSettings, Scheduler};
