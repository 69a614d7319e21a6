//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the run report to the console as a colored table, followed by the
//! logs of every environment that did not pass.
//!
//! 以彩色表格的形式将运行报告打印到控制台，随后打印每个未通过环境的日志。

use colored::*;

use crate::core::aggregate::Report;
use crate::core::models::{Outcome, SessionRecord};
use crate::infra::t;

/// Localized status label for a session record.
/// 会话记录的本地化状态标签。
pub fn status_label(record: &SessionRecord, locale: &str) -> String {
    match record.outcome {
        Outcome::Passed => t!("report.status_passed", locale = locale).to_string(),
        Outcome::Failed => t!("report.status_failed", locale = locale).to_string(),
        Outcome::TimedOut if record.cut_off => t!("report.status_cut_off", locale = locale).to_string(),
        Outcome::TimedOut => t!("report.status_timed_out", locale = locale).to_string(),
        Outcome::Errored => t!("report.status_errored", locale = locale).to_string(),
    }
}

/// Prints a formatted summary of the report to the console.
/// 在控制台打印格式化的报告摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Browser Matrix Summary (scheduled, cloud-remote) ---
///   - Passed     | Android/chrome                           |      12.40s
///   - Failed     | Windows 10/chrome@60                     |      30.02s
///   - Errored    | Windows 10/firefox@54                    |         N/A  (3 attempts)
/// ```
pub fn print_summary(report: &Report, locale: &str) {
    println!(
        "\n{}",
        t!(
            "report.summary_banner",
            locale = locale,
            mode = &report.mode,
            provider = report.provider
        )
        .bold()
    );

    for record in report.sessions.values() {
        let label = status_label(record, locale);
        let status = match record.outcome {
            Outcome::Passed => label.green(),
            Outcome::TimedOut if record.cut_off => label.yellow(),
            _ => label.red(),
        };
        let duration = if record.started_at.is_some() {
            format!("{:.2}s", record.duration.as_secs_f64())
        } else {
            "N/A".to_string()
        };
        let attempts = if record.attempts > 1 {
            format!(" ({} attempts)", record.attempts)
        } else {
            String::new()
        };

        println!(
            "  - {:<12} | {:<40} | {:>10} {}",
            status,
            record.environment.to_string(),
            duration,
            attempts
        );
    }

    let counts = &report.counts;
    println!(
        "\n{}",
        t!(
            "report.totals",
            locale = locale,
            total = counts.total,
            passed = counts.passed,
            failed = counts.failed,
            timed_out = counts.timed_out,
            errored = counts.errored,
            duration = format!("{:.2}", report.duration.as_secs_f64())
        )
    );

    let incomplete = report.incomplete();
    if report.is_incomplete() {
        println!(
            "{}",
            t!(
                "report.incomplete_banner",
                locale = locale,
                termination = report.termination,
                count = incomplete.len()
            )
            .yellow()
            .bold()
        );
        for environment in incomplete {
            println!("    - {}", environment.to_string().yellow());
        }
    }
}

/// Prints the captured logs of every environment that finished without passing.
/// Cut-off environments are listed by `print_summary` and skipped here.
///
/// 打印每个未通过而结束的环境所捕获的日志。
/// 被截断的环境已由 `print_summary` 列出，此处跳过。
pub fn print_failure_details(report: &Report, locale: &str) {
    let failures = report.failures();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, record) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}' ({})",
            i + 1,
            failures.len(),
            t!("report.failure_header", locale = locale).red(),
            record.environment.to_string().cyan(),
            status_label(record, locale)
        );

        let output = record.output();
        if output.trim().is_empty() {
            println!("\n{}", t!("report.no_output", locale = locale).dimmed());
        } else {
            println!("\n--- {} ---\n", t!("report.session_log", locale = locale).yellow());
            println!("{}", output.trim_end());
        }
        println!("\n{}", "-".repeat(80));
    }
}
