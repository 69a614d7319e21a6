//! # CLI Tests / 命令行测试
//!
//! Runs the `browser-matrix` binary end to end. Sessions are plain shell
//! commands (`true`, `false`, `sleep`) configured as the local provider.
//!
//! 端到端运行 `browser-matrix` 二进制文件。会话是配置为本地提供者的
//! 普通 shell 命令（`true`、`false`、`sleep`）。
#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use browser_matrix::core::config::RunConfig;
use common::{command_config, write_config};
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn browser_matrix(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("browser-matrix").unwrap();
    cmd.current_dir(dir)
        .env_remove("BROWSER_MATRIX_ENV")
        .env_remove("BROWSER_MATRIX_LOG")
        .env("NO_COLOR", "1")
        .arg("--lang")
        .arg("en");
    cmd
}

/// `list` prints the built-in modes and their environments.
/// `list` 打印内置模式及其环境。
#[test]
fn test_list_prints_builtin_modes() {
    let dir = tempdir().unwrap();
    browser_matrix(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("scheduled"))
        .stdout(predicate::str::contains("saucelabs"))
        .stdout(predicate::str::contains("Windows 10/firefox@54"))
        .stdout(predicate::str::contains("saucelabs-cron -> scheduled"));
}

/// An unknown mode fails before any session is launched.
/// 未知模式会在启动任何会话之前失败。
#[test]
fn test_unknown_env_fails_before_launching() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("touch launched", &["local/chrome"]));
    browser_matrix(dir.path())
        .args(["run", "--env", "nonexistent", "-c"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown mode 'nonexistent'"));
    assert!(!dir.path().join("launched").exists());
}

#[test]
fn test_mode_is_read_from_the_environment() {
    let dir = tempdir().unwrap();
    browser_matrix(dir.path())
        .env("BROWSER_MATRIX_ENV", "nonexistent")
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown mode 'nonexistent'"));
}

#[test]
fn test_missing_provider_configuration_fails() {
    let dir = tempdir().unwrap();
    browser_matrix(dir.path())
        .args(["run", "--env", "default"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("provider initialization failed"));
}

#[test]
fn test_passing_run_exits_zero_and_writes_reports() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("true", &["local/chrome", "local/firefox"]));
    let json = dir.path().join("out/report.json");
    let html = dir.path().join("out/report.html");

    browser_matrix(dir.path())
        .args(["run", "--env", "smoke", "-c"])
        .arg(&config)
        .arg("--json")
        .arg(&json)
        .arg("--html")
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("All environments passed!"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["status"], "passed");
    assert_eq!(report["mode"], "smoke");
    assert_eq!(report["sessions"].as_array().unwrap().len(), 2);

    let page = fs::read_to_string(&html).unwrap();
    assert!(page.contains("Browser Matrix Report"));
    assert!(page.contains("local/firefox"));
}

/// Report files that cannot be written do not change the run verdict.
/// 无法写入的报告文件不会改变运行结论。
#[test]
fn test_unwritable_reports_keep_the_exit_code() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("true", &["local/chrome"]));
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    browser_matrix(dir.path())
        .args(["run", "--env", "smoke", "-c"])
        .arg(&config)
        .arg("--json")
        .arg(blocker.join("report.json"))
        .arg("--html")
        .arg(blocker.join("report.html"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to write the JSON report"))
        .stderr(predicate::str::contains("Failed to write the HTML report"));
}

#[test]
fn test_failing_run_exits_one() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("false", &["local/chrome"]));
    browser_matrix(dir.path())
        .args(["run", "--env", "smoke", "-c"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failure Details"));
}

#[test]
fn test_global_timeout_exits_two() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("sleep 30", &["local/chrome", "local/firefox"]));
    browser_matrix(dir.path())
        .args(["run", "--env", "smoke", "--global-timeout", "1", "-c"])
        .arg(&config)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("did not finish"));
}

#[test]
fn test_default_config_file_is_picked_up() {
    let dir = tempdir().unwrap();
    write_config(&dir, &command_config("true", &["local/chrome"]));
    browser_matrix(dir.path())
        .args(["run", "--env", "smoke"])
        .assert()
        .success();
}

#[test]
fn test_empty_shard_is_a_successful_no_op() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, &command_config("false", &["local/chrome"]));
    browser_matrix(dir.path())
        .args(["run", "--env", "smoke", "--total-runners", "3", "--runner-index", "2", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"));
}

#[test]
fn test_init_non_interactive_writes_a_valid_config() {
    let dir = tempdir().unwrap();
    browser_matrix(dir.path())
        .args(["init", "--non-interactive"])
        .assert()
        .success();

    let path = dir.path().join("BrowserMatrix.toml");
    let content = fs::read_to_string(&path).unwrap();
    let config = RunConfig::from_toml_str(&content, &path).unwrap();
    assert!(config.providers.contains_key("local-headless"));
    assert!(config.providers.contains_key("cloud-remote"));
}
