//! # Configuration Unit Tests / 配置单元测试
//!
//! Tests for parsing, defaults and validation of `BrowserMatrix.toml`.
//!
//! `BrowserMatrix.toml` 的解析、默认值和校验测试。

use browser_matrix::core::config::{RunConfig, load_run_config};
use browser_matrix::core::error::MatrixError;
use browser_matrix::core::models::ProviderKind;
use browser_matrix::core::scheduler::RunSettings;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn parse(content: &str) -> Result<RunConfig, MatrixError> {
    RunConfig::from_toml_str(content, Path::new("BrowserMatrix.toml"))
}

#[test]
fn test_defaults() {
    let config = parse("").unwrap();
    assert_eq!(config.language, "en");
    assert_eq!(config.session_timeout(), Duration::from_secs(180));
    assert_eq!(config.global_timeout(), Duration::from_secs(1800));
    assert_eq!(config.max_launch_attempts, 3);
    assert_eq!(config.retry_backoff(), Duration::from_millis(1000));
    assert_eq!(config.suite.as_str(), "test/");
    assert!(config.concurrency() >= 1);
    assert_eq!(config, RunConfig::default());
}

#[test]
fn test_full_config() {
    let config = parse(
        r#"
language = "zh-CN"
session_timeout_secs = 60
global_timeout_secs = 600
concurrency = 4
max_launch_attempts = 5
retry_backoff_ms = 250
suite = "test/index.html"

[providers.cloud-remote]
command = "npx wct --plugin sauce --sauce \"{platform}/{browser}@{version}\""
browsers = ["chrome", "firefox"]
max_sessions = 3
"#,
    )
    .unwrap();

    assert_eq!(config.concurrency(), 4);
    let provider = config.provider_settings(ProviderKind::CloudRemote).unwrap();
    assert_eq!(provider.browsers, vec!["chrome", "firefox"]);
    assert_eq!(provider.max_sessions, Some(3));
    assert!(config.provider_settings(ProviderKind::LocalHeadless).is_none());

    let settings = RunSettings::from_config(&config);
    assert_eq!(settings.concurrency, 4);
    assert_eq!(settings.session_timeout, Duration::from_secs(60));
    assert_eq!(settings.global_timeout, Duration::from_secs(600));
    assert_eq!(settings.max_launch_attempts, 5);
    assert_eq!(settings.retry_backoff, Duration::from_millis(250));
    assert_eq!(settings.suite.as_str(), "test/index.html");
}

#[test]
fn test_invalid_values_are_rejected() {
    for content in [
        "concurrency = 0",
        "max_launch_attempts = 0",
        "session_timeout_secs = 0",
        "global_timeout_secs = 0",
        "[providers.selenium-grid]\ncommand = \"true\"",
        "[providers.cloud-remote]\ncommand = \"true\"\nmax_sessions = 0",
    ] {
        assert!(
            matches!(parse(content), Err(MatrixError::InvalidConfig(_))),
            "{content} should be rejected"
        );
    }
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    assert!(matches!(
        parse("[matrices.broken\nprovider = 1"),
        Err(MatrixError::ConfigParse { .. })
    ));
}

#[test]
fn test_invalid_environment_in_config_is_a_parse_error() {
    let result = parse(
        r#"
[matrices.bad]
provider = "cloud-remote"
environments = ["no-slash-here"]
"#,
    );
    assert!(matches!(result, Err(MatrixError::ConfigParse { .. })));
}

#[test]
fn test_load_missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let result = load_run_config(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(MatrixError::ConfigRead { .. })));
}

#[test]
fn test_settings_builders_clamp_to_one() {
    let settings = RunSettings::default()
        .with_concurrency(0)
        .with_max_launch_attempts(0);
    assert_eq!(settings.concurrency, 1);
    assert_eq!(settings.max_launch_attempts, 1);
}
