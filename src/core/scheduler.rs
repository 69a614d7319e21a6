//! # Session Scheduler Module / 会话调度模块
//!
//! Fans a matrix out into sessions with bounded concurrency, bounded launch
//! retries and bounded time, then hands the archived sessions to the aggregator.
//!
//! 以有界并发、有界启动重试和有界时间将矩阵展开为会话，
//! 然后将归档的会话交给聚合器。
//!
//! ## Slots / 槽位
//!
//! A single scheduling loop owns the slots: `buffer_unordered` polls at most
//! `concurrency` session futures and only pulls the next environment once one
//! of them has produced its record. A session holds its slot from its first
//! launch attempt until it is archived, on every path.
//!
//! 单个调度循环拥有所有槽位：`buffer_unordered` 最多同时轮询 `concurrency`
//! 个会话 future，只有在其中一个产出记录后才会拉取下一个环境。
//! 会话从第一次启动尝试到归档为止始终占用其槽位。

use chrono::Utc;
use colored::*;
use futures::{StreamExt, stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::aggregate::{Report, RunFacts, Termination, aggregate};
use crate::core::config::RunConfig;
use crate::core::models::{Environment, Matrix, Outcome, Session, SessionRecord, SuiteRef};
use crate::core::provider::{ExecutionProvider, ProviderOutcome, SessionHandle};
use crate::infra::t;

/// Upper bound for the launch retry backoff.
/// 启动重试退避时间的上限。
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// How long a cut-off session waits for the provider to acknowledge cancellation.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Budgets and limits for one run.
/// 单次运行的预算和限制。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Maximum sessions running at once; never below 1.
    /// 同时运行的最大会话数；不小于 1。
    pub concurrency: usize,
    pub global_timeout: Duration,
    pub session_timeout: Duration,
    /// Total launch attempts per session, including the first one.
    /// 每个会话的总启动尝试次数，包括第一次。
    pub max_launch_attempts: u8,
    pub retry_backoff: Duration,
    pub suite: SuiteRef,
}

impl RunSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            concurrency: config.concurrency().max(1),
            global_timeout: config.global_timeout(),
            session_timeout: config.session_timeout(),
            max_launch_attempts: config.max_launch_attempts.max(1),
            retry_backoff: config.retry_backoff(),
            suite: config.suite.clone(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = timeout;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_max_launch_attempts(mut self, attempts: u8) -> Self {
        self.max_launch_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_suite(mut self, suite: SuiteRef) -> Self {
        self.suite = suite;
        self
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

/// Delay before launch attempt `failed_attempt + 1`: the base delay doubled
/// after every failure, capped at [`MAX_RETRY_BACKOFF`].
///
/// 第 `failed_attempt + 1` 次启动尝试之前的延迟：基础延迟在每次失败后翻倍，
/// 上限为 [`MAX_RETRY_BACKOFF`]。
pub fn retry_backoff(base: Duration, failed_attempt: u8) -> Duration {
    let exponent = u32::from(failed_attempt.saturating_sub(1)).min(16);
    base.saturating_mul(1u32 << exponent).min(MAX_RETRY_BACKOFF)
}

/// Counts sessions in the `running` state and remembers the highest count seen.
#[derive(Debug, Default)]
struct ConcurrencyGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(Arc::clone(self))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard(Arc<ConcurrencyGauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs matrices against one execution provider.
/// 针对一个执行提供者运行矩阵。
pub struct Scheduler<P> {
    provider: Arc<P>,
    settings: Arc<RunSettings>,
    shutdown: CancellationToken,
}

impl<P: ExecutionProvider> Scheduler<P> {
    pub fn new(provider: Arc<P>, settings: RunSettings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stops the run like a global timeout when `shutdown` is cancelled
    /// (the CLI wires Ctrl-C to it).
    ///
    /// 当 `shutdown` 被取消时，像全局超时一样停止运行（CLI 将 Ctrl-C 连接到它）。
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs every environment of `matrix` and returns the aggregated report.
    ///
    /// The report lists every environment exactly once. When the global
    /// timeout fires, running sessions are cancelled through the provider and
    /// recorded `timed-out`, sessions not yet launched are recorded
    /// `timed-out` without attempts, and the run is marked incomplete.
    ///
    /// 运行 `matrix` 的每个环境并返回聚合报告。
    ///
    /// 报告中每个环境恰好出现一次。全局超时触发时，正在运行的会话会通过提供者被取消
    /// 并记录为 `timed-out`，尚未启动的会话记录为没有尝试次数的 `timed-out`，
    /// 运行被标记为不完整。
    pub async fn run(&self, matrix: &Matrix) -> Report {
        let started_at = Utc::now();
        let clock = Instant::now();
        let stop = CancellationToken::new();
        let gauge = Arc::new(ConcurrencyGauge::default());
        let limit = self.settings.concurrency.max(1);

        info!(
            mode = matrix.mode(),
            provider = %self.provider.kind(),
            environments = matrix.len(),
            concurrency = limit,
            global_timeout_secs = self.settings.global_timeout.as_secs(),
            "starting run"
        );

        let mut sessions = stream::iter(matrix.environments().iter().cloned().map(|environment| {
            let provider = Arc::clone(&self.provider);
            let settings = Arc::clone(&self.settings);
            let stop = stop.clone();
            let gauge = Arc::clone(&gauge);
            async move {
                let task = tokio::spawn(drive_session(
                    provider,
                    environment.clone(),
                    settings,
                    stop,
                    gauge,
                ));
                match task.await {
                    Ok(record) => record,
                    Err(e) => {
                        error!(environment = %environment, error = %e, "session task failed");
                        SessionRecord::errored(environment, format!("session task failed: {e}"))
                    }
                }
            }
        }))
        .buffer_unordered(limit);

        let global_timer = tokio::time::sleep(self.settings.global_timeout);
        tokio::pin!(global_timer);

        let mut termination = Termination::Completed;
        let mut records = Vec::with_capacity(matrix.len());

        loop {
            tokio::select! {
                biased;
                _ = &mut global_timer, if !stop.is_cancelled() => {
                    termination = Termination::GlobalTimeout;
                    warn!(
                        timeout_secs = self.settings.global_timeout.as_secs(),
                        "global timeout reached, cancelling remaining sessions"
                    );
                    println!(
                        "{}",
                        t!("run.global_timeout", timeout = self.settings.global_timeout.as_secs()).red().bold()
                    );
                    stop.cancel();
                }
                _ = self.shutdown.cancelled(), if !stop.is_cancelled() => {
                    termination = Termination::Interrupted;
                    warn!("run interrupted, cancelling remaining sessions");
                    stop.cancel();
                }
                next = sessions.next() => match next {
                    Some(record) => {
                        debug!(environment = %record.environment, outcome = %record.outcome, "session archived");
                        records.push(record);
                    }
                    None => break,
                },
            }
        }

        let facts = RunFacts {
            termination,
            started_at,
            duration: clock.elapsed(),
            peak_concurrency: gauge.peak(),
        };
        let report = aggregate(matrix, records, facts);
        info!(
            status = %report.status,
            termination = %report.termination,
            duration_ms = report.duration.as_millis() as u64,
            "run finished"
        );
        report
    }
}

/// Drives one environment from `pending` to a terminal state.
async fn drive_session<P: ExecutionProvider>(
    provider: Arc<P>,
    environment: Environment,
    settings: Arc<RunSettings>,
    stop: CancellationToken,
    gauge: Arc<ConcurrencyGauge>,
) -> SessionRecord {
    let mut session = Session::new(environment.clone());

    let Some(handle) = launch_with_retry(provider.as_ref(), &mut session, &settings, &stop).await
    else {
        let record = session.into_record();
        print_session_result(&record);
        return record;
    };

    session.start();
    let _running = gauge.enter();
    debug!(environment = %environment, session = %handle.id(), "session running");
    println!("{}", t!("run.session_running", env = &environment).blue());

    let awaiting = provider.await_outcome(&handle, settings.session_timeout);
    tokio::pin!(awaiting);

    let finished = tokio::select! {
        biased;
        _ = stop.cancelled() => None,
        outcome = &mut awaiting => Some(outcome),
    };

    match finished {
        Some(ProviderOutcome { outcome, output }) => {
            if !output.trim().is_empty() {
                session.log(output);
            }
            if outcome == Outcome::TimedOut {
                session.log(format!(
                    "no outcome within {}s",
                    settings.session_timeout.as_secs()
                ));
            }
            session.finish(outcome);
        }
        None => {
            cancel_with_grace(provider.as_ref(), &handle).await;
            // The in-flight wait resolves once the provider has stopped the
            // execution; it still carries whatever the session printed.
            match tokio::time::timeout(CANCEL_GRACE, &mut awaiting).await {
                Ok(ProviderOutcome { output, .. }) if !output.trim().is_empty() => session.log(output),
                Ok(_) => {}
                Err(_) => warn!(session = %handle.id(), "no output collected from the cut-off session"),
            }
            session.log("cancelled because the run was stopped");
            session.cut_off();
        }
    }

    let record = session.into_record();
    print_session_result(&record);
    record
}

/// Launches the session, retrying provisioning errors with backoff.
/// Returns `None` once the session has been finished without a handle.
///
/// 启动会话，对分配错误进行带退避的重试。
/// 当会话在没有句柄的情况下结束时返回 `None`。
async fn launch_with_retry<P: ExecutionProvider>(
    provider: &P,
    session: &mut Session,
    settings: &RunSettings,
    stop: &CancellationToken,
) -> Option<SessionHandle> {
    let environment = session.environment().clone();
    let max_attempts = settings.max_launch_attempts.max(1);

    loop {
        if stop.is_cancelled() {
            stop_before_launch(session);
            return None;
        }

        let attempt = session.record_attempt();
        if attempt == 1 {
            println!("{}", t!("run.session_launching", env = &environment).blue());
        }

        let launched = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                stop_before_launch(session);
                return None;
            }
            launched = provider.launch(&environment, &settings.suite) => launched,
        };

        let error = match launched {
            Ok(handle) => return Some(handle),
            Err(error) => error,
        };

        session.log(format!("launch attempt {attempt}/{max_attempts}: {error}"));
        if attempt >= max_attempts {
            warn!(environment = %environment, attempts = attempt, error = %error, "giving up on session");
            session.finish(Outcome::Errored);
            return None;
        }

        let delay = retry_backoff(settings.retry_backoff, attempt);
        debug!(environment = %environment, attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying launch");
        println!(
            "{}",
            t!(
                "run.launch_retrying",
                env = &environment,
                attempt = attempt,
                max = max_attempts,
                delay = format!("{:.1}", delay.as_secs_f64())
            )
            .yellow()
        );

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                stop_before_launch(session);
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn stop_before_launch(session: &mut Session) {
    session.log("run stopped before the session could launch");
    session.cut_off();
}

async fn cancel_with_grace<P: ExecutionProvider>(provider: &P, handle: &SessionHandle) {
    if tokio::time::timeout(CANCEL_GRACE, provider.cancel(handle))
        .await
        .is_err()
    {
        warn!(session = %handle.id(), "provider did not acknowledge cancellation in time");
    }
}

fn print_session_result(record: &SessionRecord) {
    let env = &record.environment;
    let duration = format!("{:.2}", record.duration.as_secs_f64());
    let line = match record.outcome {
        Outcome::Passed => t!("run.session_passed", env = env, duration = duration).green(),
        Outcome::Failed => t!("run.session_failed", env = env, duration = duration).red(),
        Outcome::TimedOut if record.cut_off => t!("run.session_cut_off", env = env).red(),
        Outcome::TimedOut => t!("run.session_timed_out", env = env, duration = duration).red(),
        Outcome::Errored => t!("run.session_errored", env = env, attempts = record.attempts).red(),
    };
    println!("{line}");
}
