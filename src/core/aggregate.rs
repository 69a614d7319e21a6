//! # Result Aggregation Module / 结果聚合模块
//!
//! Turns the archived sessions of a run into a [`Report`] and decides the
//! overall status. Aggregation is a pure function of its inputs.
//!
//! 将一次运行的归档会话转换为 [`Report`] 并决定整体状态。
//! 聚合是其输入的纯函数。

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::core::models::{Environment, Matrix, Outcome, ProviderKind, SessionRecord};

/// Overall verdict of a run.
/// 一次运行的整体结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Passed => f.write_str("passed"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// How the run ended.
/// 运行如何结束。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Every session reached a terminal state on its own.
    /// 每个会话都自行达到了终止状态。
    Completed,
    /// The global timeout fired first.
    /// 全局超时先触发。
    GlobalTimeout,
    /// The run was stopped by a shutdown signal.
    /// 运行被关闭信号停止。
    Interrupted,
}

impl Termination {
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Completed)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => f.write_str("completed"),
            Termination::GlobalTimeout => f.write_str("global-timeout"),
            Termination::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Run-level facts measured by the scheduler.
/// 由调度器测得的运行级事实。
#[derive(Debug, Clone, PartialEq)]
pub struct RunFacts {
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub peak_concurrency: usize,
}

/// Per-outcome session counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub errored: usize,
}

/// Final aggregated outcome of a run across all environments of its matrix.
/// Sessions are keyed by environment, so the report does not depend on
/// the order in which sessions started or finished.
///
/// 一次运行在其矩阵所有环境上的最终聚合结果。
/// 会话以环境为键，因此报告不依赖于会话开始或结束的顺序。
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: String,
    pub provider: ProviderKind,
    pub status: RunStatus,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub peak_concurrency: usize,
    pub counts: OutcomeCounts,
    #[serde(serialize_with = "serialize_sessions")]
    pub sessions: BTreeMap<Environment, SessionRecord>,
}

fn serialize_sessions<S: Serializer>(
    sessions: &BTreeMap<Environment, SessionRecord>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(sessions.values())
}

impl Report {
    pub fn is_passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// `true` when the run was stopped before every session finished on its own.
    /// 当运行在每个会话自行结束之前被停止时为 `true`。
    pub fn is_incomplete(&self) -> bool {
        !self.termination.is_complete()
    }

    pub fn get(&self, environment: &Environment) -> Option<&SessionRecord> {
        self.sessions.get(environment)
    }

    pub fn outcome_of(&self, environment: &Environment) -> Option<Outcome> {
        self.get(environment).map(|record| record.outcome)
    }

    /// Sessions stopped by the run-level timeout or interrupt, listed apart from
    /// genuine failures.
    ///
    /// 被运行级超时或中断停止的会话，与真正的失败分开列出。
    pub fn incomplete(&self) -> Vec<&Environment> {
        self.sessions
            .values()
            .filter(|record| record.cut_off)
            .map(|record| &record.environment)
            .collect()
    }

    /// Sessions that finished on their own without passing.
    /// 自行结束但未通过的会话。
    pub fn failures(&self) -> Vec<&SessionRecord> {
        self.sessions
            .values()
            .filter(|record| !record.is_passed() && !record.cut_off)
            .collect()
    }

    /// Process exit code: 0 passed, 1 failed, 2 incomplete.
    /// 进程退出码：0 通过，1 失败，2 不完整。
    pub fn exit_code(&self) -> u8 {
        if self.is_incomplete() {
            2
        } else if self.is_passed() {
            0
        } else {
            1
        }
    }
}

/// Builds the report for `matrix` from the archived sessions of a run.
///
/// Every environment of the matrix appears exactly once: a missing record
/// becomes `errored`, records for environments outside the matrix are
/// discarded, and only the first record of a duplicated environment is kept.
/// The run passes only if it completed and every session passed.
///
/// 根据一次运行的归档会话为 `matrix` 构建报告。
///
/// 矩阵中的每个环境恰好出现一次：缺失的记录会变为 `errored`，
/// 矩阵之外环境的记录会被丢弃，重复环境只保留第一条记录。
/// 只有当运行完整结束且每个会话都通过时，运行才算通过。
pub fn aggregate(
    matrix: &Matrix,
    records: impl IntoIterator<Item = SessionRecord>,
    facts: RunFacts,
) -> Report {
    let mut sessions = BTreeMap::new();

    for record in records {
        if !matrix.contains(&record.environment) {
            warn!(environment = %record.environment, mode = matrix.mode(), "discarding record outside the matrix");
            continue;
        }
        if sessions.contains_key(&record.environment) {
            warn!(environment = %record.environment, "discarding duplicate record");
            continue;
        }
        sessions.insert(record.environment.clone(), record);
    }

    for environment in matrix.environments() {
        sessions.entry(environment.clone()).or_insert_with(|| {
            warn!(environment = %environment, "no outcome recorded for environment");
            SessionRecord::errored(environment.clone(), "no outcome was recorded for this environment")
        });
    }

    let mut counts = OutcomeCounts {
        total: sessions.len(),
        ..OutcomeCounts::default()
    };
    for record in sessions.values() {
        match record.outcome {
            Outcome::Passed => counts.passed += 1,
            Outcome::Failed => counts.failed += 1,
            Outcome::TimedOut => counts.timed_out += 1,
            Outcome::Errored => counts.errored += 1,
        }
    }

    let all_passed = counts.passed == counts.total;
    let status = if facts.termination.is_complete() && all_passed {
        RunStatus::Passed
    } else {
        RunStatus::Failed
    };

    Report {
        mode: matrix.mode().to_string(),
        provider: matrix.provider(),
        status,
        termination: facts.termination,
        started_at: facts.started_at,
        duration: facts.duration,
        peak_concurrency: facts.peak_concurrency,
        counts,
        sessions,
    }
}
