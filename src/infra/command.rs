//! # Command Execution Module / 命令执行模块
//!
//! Spawns child processes with their stdout and stderr captured into one
//! buffer, and expands command templates.
//!
//! 派生子进程并将其 stdout 和 stderr 捕获到同一个缓冲区中，以及展开命令模板。

use anyhow::{Context, Result, anyhow};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::infra::t;

/// How long to wait for the output readers after the process has exited.
/// A killed process may leave grandchildren that still hold the pipes open.
const READER_GRACE: Duration = Duration::from_secs(2);

/// A spawned child process whose output is being captured.
/// 一个正在捕获输出的已派生子进程。
#[derive(Debug)]
pub struct RunningCommand {
    child: Child,
    output: Arc<Mutex<String>>,
    readers: Vec<JoinHandle<()>>,
}

impl RunningCommand {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for the process to exit.
    /// 等待进程退出。
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kills the process. Killing a process that already exited is not an error.
    /// 终止进程。终止一个已经退出的进程不算错误。
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "kill failed, the process has probably exited already");
        }
    }

    /// Collects the combined stdout and stderr once the process is gone.
    /// 在进程结束后收集合并的 stdout 和 stderr。
    pub async fn into_output(self) -> String {
        for mut reader in self.readers {
            if tokio::time::timeout(READER_GRACE, &mut reader).await.is_err() {
                reader.abort();
            }
        }
        self.output.lock().await.clone()
    }
}

/// Spawns `cmd` with stdout and stderr piped into a shared buffer.
/// The streams are read concurrently, line by line.
///
/// 派生 `cmd`，并将 stdout 和 stderr 通过管道写入共享缓冲区。
/// 两个输出流被逐行并发读取。
pub fn spawn_captured(mut cmd: Command) -> std::io::Result<RunningCommand> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other(t!("command.capture_stdout_failed").to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other(t!("command.capture_stderr_failed").to_string()))?;

    let output = Arc::new(Mutex::new(String::new()));
    let readers = vec![
        tokio::spawn(pipe_lines(stdout, Arc::clone(&output))),
        tokio::spawn(pipe_lines(stderr, Arc::clone(&output))),
    ];

    Ok(RunningCommand {
        child,
        output,
        readers,
    })
}

async fn pipe_lines<R: AsyncRead + Unpin>(stream: R, output: Arc<Mutex<String>>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut output = output.lock().await;
        output.push_str(&line);
        output.push('\n');
    }
}

/// Expands environment variables and `~` in `template`, then splits it into
/// words with shell quoting rules.
///
/// 展开 `template` 中的环境变量和 `~`，然后按 shell 引号规则拆分成单词。
pub fn split_template(template: &str) -> Result<Vec<String>> {
    let expanded = shellexpand::full(template)
        .with_context(|| format!("Failed to expand command: {template}"))?
        .to_string();

    let parts = shlex::split(&expanded)
        .ok_or_else(|| anyhow!("Failed to parse command: {}", expanded))?;

    if parts.is_empty() {
        return Err(anyhow!("Empty command after parsing."));
    }
    Ok(parts)
}
