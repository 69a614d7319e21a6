//! # JSON Reporting Module / JSON 报告模块
//!
//! Writes the report as pretty-printed JSON for CI tooling.
//! 将报告写为格式化的 JSON，供 CI 工具使用。

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::aggregate::Report;
use crate::infra::fs::write_file;

/// Serializes `report` to a JSON string.
pub fn render_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize the run report")
}

/// Writes `report` to `output_path` as JSON.
/// 将 `report` 以 JSON 格式写入 `output_path`。
pub fn write_json_report(report: &Report, output_path: &Path) -> Result<()> {
    let json = render_json_report(report)?;
    write_file(output_path, &json)
}
