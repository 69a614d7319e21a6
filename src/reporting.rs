//! # Reporting Module / 报告模块
//!
//! This module handles the display and serialization of run reports: a colored
//! console summary, a styled HTML page and a machine-readable JSON document.
//!
//! 此模块处理运行报告的显示和序列化：彩色控制台摘要、
//! 样式化 HTML 页面和机器可读的 JSON 文档。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::write_json_report;
