//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Browser Matrix,
//! including process execution, the command-backed execution provider,
//! file system helpers and logging setup.
//!
//! 此模块为 Browser Matrix 提供基础设施服务，
//! 包括进程执行、基于命令的执行提供者、文件系统辅助功能和日志设置。

pub mod command;
pub mod fs;
pub mod logging;
pub mod provider;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
