//! # Execution Provider Module / 执行提供者模块
//!
//! The capability interface the scheduler drives. A provider allocates a
//! browser for an environment, reports the terminal outcome of the test run,
//! and can be asked to cancel at any time.
//!
//! 调度器所驱动的能力接口。提供者为环境分配浏览器，报告测试运行的终止结果，
//! 并且可以随时被要求取消。

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::error::ProviderError;
use crate::core::models::{Environment, Outcome, ProviderKind, SuiteRef};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a launched session.
/// 已启动会话的进程内唯一标识符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Handle to a launched session. Cloning a handle shares its cancellation state.
/// 已启动会话的句柄。克隆句柄会共享其取消状态。
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    environment: Environment,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new(environment: Environment) -> Self {
        Self {
            id: SessionId::next(),
            environment,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Signals cancellation. Repeated calls have no further effect.
    /// 发出取消信号。重复调用不会产生额外效果。
    pub fn signal_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once cancellation has been signalled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// What a provider observed when a session ended.
/// 会话结束时提供者观察到的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutcome {
    pub outcome: Outcome,
    /// Captured output of the execution, possibly empty.
    /// 执行过程捕获的输出，可能为空。
    pub output: String,
}

impl ProviderOutcome {
    pub fn new(outcome: Outcome, output: impl Into<String>) -> Self {
        Self {
            outcome,
            output: output.into(),
        }
    }
}

/// Capability interface over a concrete browser execution backend.
///
/// Implementations must make `cancel` idempotent and safe to call while an
/// `await_outcome` for the same handle is in flight; the in-flight call then
/// resolves to `Outcome::TimedOut`.
///
/// 具体浏览器执行后端之上的能力接口。
///
/// 实现必须保证 `cancel` 是幂等的，并且在同一句柄的 `await_outcome`
/// 正在进行时调用也是安全的；此时正在进行的调用会返回 `Outcome::TimedOut`。
pub trait ExecutionProvider: Send + Sync + 'static {
    fn kind(&self) -> ProviderKind;

    /// Allocates `environment` and starts running `suite` on it.
    /// 分配 `environment` 并开始在其上运行 `suite`。
    fn launch(
        &self,
        environment: &Environment,
        suite: &SuiteRef,
    ) -> impl Future<Output = Result<SessionHandle, ProviderError>> + Send;

    /// Waits for the session to reach a terminal outcome. When `timeout`
    /// elapses first, the execution is cancelled and `Outcome::TimedOut` is returned.
    ///
    /// 等待会话达到终止结果。如果 `timeout` 先到，执行会被取消并返回 `Outcome::TimedOut`。
    fn await_outcome(
        &self,
        handle: &SessionHandle,
        timeout: Duration,
    ) -> impl Future<Output = ProviderOutcome> + Send;

    /// Best-effort cancellation. Always safe, including after natural completion.
    /// 尽力而为的取消。始终安全，包括在自然完成之后。
    fn cancel(&self, handle: &SessionHandle) -> impl Future<Output = ()> + Send;
}
