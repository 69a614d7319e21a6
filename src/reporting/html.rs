//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a run report into a self-contained HTML page with summary counters,
//! a per-environment table and collapsible session logs.
//!
//! 将运行报告渲染为一个自包含的 HTML 页面，包含摘要计数、
//! 按环境划分的表格和可折叠的会话日志。

use anyhow::Result;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;

use crate::core::aggregate::Report;
use crate::core::models::{Outcome, SessionRecord};
use crate::infra::fs::write_file;
use crate::infra::t;
use crate::reporting::console::status_label;

/// CSS styles for the HTML report
/// HTML 报告的 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// JavaScript code for the HTML report
/// HTML 报告的 JavaScript 代码
const HTML_SCRIPT: &str = include_str!("assets/report.js");

fn status_class(record: &SessionRecord) -> &'static str {
    match record.outcome {
        Outcome::TimedOut if record.cut_off => "cut-off",
        outcome => outcome.as_str(),
    }
}

fn banner(report: &Report, locale: &str) -> (&'static str, String) {
    if report.is_incomplete() {
        (
            "incomplete",
            t!(
                "html_report.banner.incomplete",
                locale = locale,
                termination = report.termination
            )
            .to_string(),
        )
    } else if report.is_passed() {
        ("passed", t!("html_report.banner.passed", locale = locale).to_string())
    } else {
        ("failed", t!("html_report.banner.failed", locale = locale).to_string())
    }
}

fn summary_item(count: usize, class: &str, label: String) -> Markup {
    html! {
        div.summary-item {
            span class={"count " (class)} { (count) }
            span.label { (label) }
        }
    }
}

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html_report(report: &Report, locale: &str) -> String {
    let counts = &report.counts;
    let (banner_class, banner_text) = banner(report, locale);

    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale).to_string()) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale).to_string()) }
                div.subtitle {
                    (t!(
                        "html_report.subtitle",
                        locale = locale,
                        mode = &report.mode,
                        provider = report.provider,
                        started = report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        duration = format!("{:.2}", report.duration.as_secs_f64())
                    ).to_string())
                }
                div class={"banner " (banner_class)} { (banner_text) }

                div.summary-container {
                    (summary_item(counts.total, "", t!("html_report.summary.total", locale = locale).to_string()))
                    (summary_item(counts.passed, "passed-text", t!("html_report.summary.passed", locale = locale).to_string()))
                    (summary_item(counts.failed, "failed-text", t!("html_report.summary.failed", locale = locale).to_string()))
                    (summary_item(counts.timed_out, "timed-out-text", t!("html_report.summary.timed_out", locale = locale).to_string()))
                    (summary_item(counts.errored, "errored-text", t!("html_report.summary.errored", locale = locale).to_string()))
                }

                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.environment", locale = locale).to_string()) }
                            th.status-col { (t!("html_report.table.header.status", locale = locale).to_string()) }
                            th.duration-cell { (t!("html_report.table.header.duration", locale = locale).to_string()) }
                            th.retries-cell { (t!("html_report.table.header.retries", locale = locale).to_string()) }
                        }
                    }
                    tbody {
                        @for (row, record) in report.sessions.values().enumerate() {
                            @let output_id = format!("output-{row}-{}", record.environment.slug());
                            @let output = record.output();
                            tr {
                                td { (record.environment.to_string()) }
                                td.status-col {
                                    div class={"status-cell " (status_class(record))} {
                                        (status_label(record, locale))
                                    }
                                    @if !record.is_passed() && !output.is_empty() {
                                        div.output-toggle onclick={"toggleOutput('" (output_id) "')"} {
                                            (t!("html_report.toggle_output", locale = locale).to_string())
                                        }
                                    }
                                }
                                td.duration-cell {
                                    @if record.started_at.is_some() {
                                        (format!("{:.2}s", record.duration.as_secs_f64()))
                                    } @else {
                                        "N/A"
                                    }
                                }
                                td.retries-cell {
                                    @if record.retries() > 0 {
                                        (record.retries())
                                    }
                                }
                            }
                            @if !record.is_passed() && !output.is_empty() {
                                tr id=(output_id) style="display:none;" {
                                    td colspan="4" {
                                        pre.output-content { (output) }
                                    }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    };
    page.into_string()
}

/// Generates an HTML report file for the run.
/// 为本次运行生成 HTML 报告文件。
///
/// # Errors / 错误
/// Fails when the file or its parent directory cannot be written.
/// 当无法写入文件或其父目录时失败。
pub fn generate_html_report(report: &Report, output_path: &Path, locale: &str) -> Result<()> {
    write_file(output_path, &render_html_report(report, locale))
}
