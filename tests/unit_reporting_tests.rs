//! # Reporting Unit Tests / 报告单元测试
//!
//! Tests for the rendered HTML and JSON reports.
//!
//! 渲染后的 HTML 和 JSON 报告的测试。

mod common;

use browser_matrix::core::aggregate::{Report, RunFacts, Termination, aggregate};
use browser_matrix::core::models::{Outcome, Session};
use browser_matrix::reporting::html::render_html_report;
use browser_matrix::reporting::json::render_json_report;
use chrono::Utc;
use common::{env, matrix};
use std::collections::HashSet;
use std::time::Duration;

fn failed_report(specs: &[&str]) -> Report {
    let records: Vec<_> = specs
        .iter()
        .map(|spec| {
            let mut session = Session::new(env(spec));
            session.record_attempt();
            session.start();
            session.log(format!("log of {spec}"));
            session.finish(Outcome::Failed);
            session.into_record()
        })
        .collect();
    let facts = RunFacts {
        termination: Termination::Completed,
        started_at: Utc::now(),
        duration: Duration::from_secs(1),
        peak_concurrency: 1,
    };
    aggregate(&matrix("m", specs), records, facts)
}

/// Environments whose labels collapse to the same slug still get distinct output rows.
/// 标签折叠为相同 slug 的环境仍然获得不同的输出行。
#[test]
fn test_output_row_ids_are_unique() {
    let report = failed_report(&["Windows 10/chrome@60", "Windows-10/chrome@60"]);
    let page = render_html_report(&report, "en");

    let ids: Vec<&str> = page
        .match_indices("tr id=\"")
        .map(|(at, marker)| {
            let rest = &page[at + marker.len()..];
            &rest[..rest.find('"').unwrap()]
        })
        .collect();
    assert_eq!(ids.len(), 2, "{page}");
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 2, "{ids:?}");
    for id in &ids {
        assert!(page.contains(&format!("toggleOutput('{id}')")), "{id}");
    }
}

#[test]
fn test_html_escapes_session_output() {
    let mut session = Session::new(env("local/chrome"));
    session.record_attempt();
    session.start();
    session.log("<script>alert(1)</script>");
    session.finish(Outcome::Failed);
    let facts = RunFacts {
        termination: Termination::Completed,
        started_at: Utc::now(),
        duration: Duration::from_secs(1),
        peak_concurrency: 1,
    };
    let report = aggregate(&matrix("m", &["local/chrome"]), vec![session.into_record()], facts);

    let page = render_html_report(&report, "en");
    assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!page.contains("<script>alert(1)"));
}

#[test]
fn test_json_report_lists_every_session() {
    let report = failed_report(&["Android/chrome", "Windows 10/firefox@54"]);
    let json: serde_json::Value = serde_json::from_str(&render_json_report(&report).unwrap()).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["sessions"].as_array().unwrap().len(), 2);
}
