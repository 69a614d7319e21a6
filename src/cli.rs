//! # Command Line Interface / 命令行接口
//!
//! Builds the localized `clap` command tree and dispatches to the commands.
//! 构建本地化的 `clap` 命令树并分发到各个命令。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, process::ExitCode};

use crate::core::models::ProviderKind;
use crate::core::registry::DEFAULT_MODE;
use crate::infra::logging::init_logging;
use crate::infra::t;

pub mod commands {
    pub mod init;
    pub mod list;
    pub mod run;
}

use commands::run::RunArgs;

/// Environment variable consulted when `--env` is not given.
pub const MODE_ENV_VAR: &str = "BROWSER_MATRIX_ENV";

/// Pre-parses the command line arguments to find an explicit `--lang`.
/// This allows i18n to be initialized before the full CLI is built.
///
/// 预解析命令行参数以查找显式的 `--lang`，
/// 以便在构建完整 CLI 之前初始化 i18n。
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter().enumerate().find_map(|(pos, arg)| {
        if arg == "--lang" {
            args.get(pos + 1).cloned()
        } else {
            arg.strip_prefix("--lang=").map(str::to_string)
        }
    })
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg.config", locale = locale).to_string())
        .value_name("CONFIG")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn build_cli(locale: &str) -> Command {
    Command::new("browser-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.verbose", locale = locale).to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.run_about", locale = locale).to_string())
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .help(t!("arg.env", locale = locale).to_string())
                        .value_name("MODE")
                        .env(MODE_ENV_VAR)
                        .default_value(DEFAULT_MODE)
                        .action(ArgAction::Set),
                )
                .arg(config_arg(locale))
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("arg.jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .help(t!("arg.provider", locale = locale).to_string())
                        .value_name("KIND")
                        .value_parser(|s: &str| s.parse::<ProviderKind>())
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("session-timeout")
                        .long("session-timeout")
                        .help(t!("arg.session_timeout", locale = locale).to_string())
                        .value_name("SECS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("global-timeout")
                        .long("global-timeout")
                        .help(t!("arg.global_timeout", locale = locale).to_string())
                        .value_name("SECS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("arg.total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("arg.runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg.html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("arg.json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(t!("cli.list_about", locale = locale).to_string())
                .arg(config_arg(locale)),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg.non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn run_args(matches: &ArgMatches) -> RunArgs {
    RunArgs {
        mode: matches
            .get_one::<String>("env")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODE.to_string()),
        config: matches.get_one::<PathBuf>("config").cloned(),
        jobs: matches.get_one::<usize>("jobs").copied(),
        provider: matches.get_one::<ProviderKind>("provider").copied(),
        session_timeout: matches.get_one::<u64>("session-timeout").copied(),
        global_timeout: matches.get_one::<u64>("global-timeout").copied(),
        total_runners: matches.get_one::<usize>("total-runners").copied(),
        runner_index: matches.get_one::<usize>("runner-index").copied(),
        html: matches.get_one::<PathBuf>("html").cloned(),
        json: matches.get_one::<PathBuf>("json").cloned(),
    }
}

/// Parses the command line and runs the selected command.
/// Returns the process exit code on success.
///
/// 解析命令行并运行所选命令。成功时返回进程退出码。
pub async fn run() -> Result<ExitCode> {
    // An explicit --lang wins over the system locale and the config file.
    let explicit_lang = pre_parse_language().map(|lang| crate::resolve_locale(&lang));
    let language = match &explicit_lang {
        Some(lang) => {
            rust_i18n::set_locale(lang);
            lang.clone()
        }
        None => crate::init(),
    };

    let matches = build_cli(&language).get_matches();
    init_logging(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(run_args(run_matches), explicit_lang).await
        }
        Some(("list", list_matches)) => {
            let config = list_matches.get_one::<PathBuf>("config").cloned();
            commands::list::execute(config, &language)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            if explicit_lang.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("init.system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
            Ok(ExitCode::SUCCESS)
        }
        // subcommand_required makes clap exit before reaching this arm.
        _ => Ok(ExitCode::SUCCESS),
    }
}
