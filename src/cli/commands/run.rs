//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: it resolves the requested mode to
//! a matrix, runs every environment through the configured provider and prints
//! and writes the report.
//!
//! 此模块实现了 `run` 命令：将请求的模式解析为矩阵，
//! 通过配置的提供者运行每个环境，并打印和写出报告。

use anyhow::Result;
use colored::*;
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    core::{
        config::{DEFAULT_CONFIG_FILE, RunConfig, load_run_config},
        models::ProviderKind,
        planner,
        registry::MatrixRegistry,
        scheduler::{RunSettings, Scheduler},
    },
    infra::{fs::absolute_path, provider::CommandProvider, t},
    reporting::{generate_html_report, print_failure_details, print_summary, write_json_report},
};

/// Options of the `run` command.
/// `run` 命令的选项。
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Requested mode, already resolved from `--env` or `BROWSER_MATRIX_ENV`.
    pub mode: String,
    pub config: Option<PathBuf>,
    pub jobs: Option<usize>,
    /// Runs the matrix on this provider kind instead of its own.
    pub provider: Option<ProviderKind>,
    pub session_timeout: Option<u64>,
    pub global_timeout: Option<u64>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Loads the run configuration.
///
/// An explicit path must exist. Without one, `BrowserMatrix.toml` in the
/// working directory is used when present and the defaults otherwise.
///
/// 加载运行配置。
///
/// 显式给出的路径必须存在。未给出时，如果工作目录中存在 `BrowserMatrix.toml`
/// 则使用它，否则使用默认值。
pub fn load_config(explicit: Option<&Path>) -> Result<(RunConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default_path.exists() {
                debug!("no {DEFAULT_CONFIG_FILE} found, using the default configuration");
                return Ok((RunConfig::default(), None));
            }
            default_path
        }
    };
    let config = load_run_config(&path)?;
    Ok((config, Some(path)))
}

/// Executes the run command and returns the process exit code:
/// 0 when every environment passed, 1 when any failed and 2 when the run was cut off.
///
/// 执行运行命令并返回进程退出码：
/// 所有环境通过时为 0，有环境失败时为 1，运行被截断时为 2。
///
/// # Errors
/// Configuration errors, unknown modes, invalid shards and provider
/// initialization failures abort before any session is launched. A report
/// file that cannot be written is reported but does not change the exit code.
pub async fn execute(args: RunArgs, explicit_lang: Option<String>) -> Result<ExitCode> {
    let (config, config_path) = load_config(args.config.as_deref())?;

    let locale = explicit_lang.unwrap_or_else(|| crate::resolve_locale(&config.language));
    rust_i18n::set_locale(&locale);

    match &config_path {
        Some(path) => {
            let shown = absolute_path(path).unwrap_or_else(|_| path.clone());
            println!(
                "{}",
                t!("run.loading_config", locale = &locale, path = shown.display())
            );
        }
        None => println!("{}", t!("run.using_default_config", locale = &locale).dimmed()),
    }

    let registry = MatrixRegistry::from_config(&config)?;
    let mut matrix = registry.resolve(&args.mode)?;
    if let Some(kind) = args.provider {
        matrix = matrix.with_provider(kind);
    }

    println!(
        "{}",
        t!(
            "run.mode_selected",
            locale = &locale,
            mode = matrix.mode().yellow(),
            provider = matrix.provider(),
            count = matrix.len()
        )
    );

    let plan = planner::plan_execution(matrix, args.total_runners, args.runner_index)?;

    let Some(matrix) = plan.matrix_to_run else {
        println!("{}", t!("run.no_environments", locale = &locale).green());
        return Ok(ExitCode::SUCCESS);
    };

    if let (true, Some(total), Some(index)) = (plan.is_distributed, args.total_runners, args.runner_index) {
        println!(
            "{}",
            t!(
                "run.split_runner",
                locale = &locale,
                index = index + 1,
                total = total,
                count = matrix.len(),
                all = plan.total_environments
            )
            .bold()
        );
    } else {
        println!("{}", t!("run.single_runner", locale = &locale).bold());
    }

    let provider = CommandProvider::from_config(matrix.provider(), &config)?;

    let mut settings = RunSettings::from_config(&config);
    if let Some(jobs) = args.jobs {
        settings = settings.with_concurrency(jobs);
    }
    if let Some(secs) = args.session_timeout {
        settings = settings.with_session_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.global_timeout {
        settings = settings.with_global_timeout(Duration::from_secs(secs));
    }

    println!(
        "{}",
        t!(
            "run.budgets",
            locale = &locale,
            concurrency = settings.concurrency,
            session = settings.session_timeout.as_secs(),
            global = settings.global_timeout.as_secs()
        )
        .cyan()
    );

    let shutdown = setup_signal_handler(&locale);
    let scheduler = Scheduler::new(Arc::new(provider), settings).with_shutdown(shutdown);
    let report = scheduler.run(&matrix).await;

    print_summary(&report, &locale);

    if let Some(report_path) = &args.html {
        println!(
            "\n{}",
            t!("run.html_report", locale = &locale, path = report_path.display())
        );
        if let Err(e) = generate_html_report(&report, report_path, &locale) {
            error!(error = %e, "failed to write the HTML report");
            eprintln!("{} {:#}", t!("run.html_report_failed", locale = &locale).red(), e);
        }
    }

    if let Some(report_path) = &args.json {
        println!(
            "{}",
            t!("run.json_report", locale = &locale, path = report_path.display())
        );
        if let Err(e) = write_json_report(&report, report_path) {
            error!(error = %e, "failed to write the JSON report");
            eprintln!("{} {:#}", t!("run.json_report_failed", locale = &locale).red(), e);
        }
    }

    if report.is_passed() {
        println!("\n{}", t!("run.all_passed", locale = &locale).green().bold());
    } else {
        print_failure_details(&report, &locale);
        let message = if report.is_incomplete() {
            t!("run.incomplete", locale = &locale)
        } else {
            t!("run.failed", locale = &locale)
        };
        println!("\n{}", message.red().bold());
    }

    Ok(ExitCode::from(report.exit_code()))
}

/// Cancels the returned token on Ctrl-C.
/// 在收到 Ctrl-C 时取消返回的令牌。
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    token
}
