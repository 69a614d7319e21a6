//! # Browser Matrix Library / Browser Matrix 库
//!
//! This library runs one browser test suite across a matrix of
//! (platform, browser, version) environments, either on a cloud browser farm
//! or on local browsers, with bounded concurrency and bounded time.
//!
//! 此库在一个由 (平台, 浏览器, 版本) 组成的环境矩阵上运行同一个浏览器测试套件，
//! 可以运行在云端浏览器集群或本地浏览器上，并发和时间均有上限。
//!
//! ## Modules / 模块
//!
//! - `core` - Matrix registry, environment model, scheduler and aggregation
//! - `infra` - Command execution, the command-backed provider, logging and file system helpers
//! - `reporting` - Console, HTML and JSON reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 矩阵注册表、环境模型、调度器和结果聚合
//! - `infra` - 命令执行、基于命令的提供者、日志和文件系统辅助函数
//! - `reporting` - 控制台、HTML 和 JSON 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::{
    ExecutionProvider, Matrix, MatrixError, MatrixRegistry, Outcome, ProviderError, Report,
    RunSettings, RunStatus, Scheduler, Termination,
};

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

/// Picks the closest available locale for `requested`: the full tag first
/// (e.g. "zh-CN"), then the language part (e.g. "en" from "en-US"), then "en".
///
/// 为 `requested` 选择最接近的可用语言：先匹配完整标签（如 "zh-CN"），
/// 再匹配语言部分（如从 "en-US" 中取 "en"），最后回退到 "en"。
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();
    if available_locales.contains(&requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .and_then(|lang| available_locales.iter().find(|l| l.split('-').next() == Some(lang)))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "en".to_string())
}

/// Initializes the application's internationalization (i18n) based on the system locale.
/// 根据系统语言初始化应用程序的国际化 (i18n)。
pub fn init() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let lang = resolve_locale(&locale);
    rust_i18n::set_locale(&lang);
    lang
}
