//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Tests for environments, matrices and the session lifecycle.
//!
//! 环境、矩阵和会话生命周期的测试。

use browser_matrix::core::config::RunConfig;
use browser_matrix::core::error::MatrixError;
use browser_matrix::core::models::{
    Environment, LATEST_VERSION, Matrix, Outcome, ProviderKind, Session, SessionStatus,
};

fn env(spec: &str) -> Environment {
    spec.parse().unwrap()
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn test_parse_with_version() {
        let e = env("Windows 10/firefox@54");
        assert_eq!(e.platform(), "Windows 10");
        assert_eq!(e.browser(), "firefox");
        assert_eq!(e.version(), "54");
        assert!(!e.is_latest());
        assert_eq!(e.to_string(), "Windows 10/firefox@54");
    }

    #[test]
    fn test_parse_without_version_means_latest() {
        let e = env("Android/chrome");
        assert_eq!(e.version(), LATEST_VERSION);
        assert!(e.is_latest());
        assert_eq!(e.to_string(), "Android/chrome");
        assert_eq!(e, env("Android/chrome@latest"));
    }

    #[test]
    fn test_browser_names_may_contain_spaces() {
        let e = env("Windows 10/internet explorer@11");
        assert_eq!(e.browser(), "internet explorer");
    }

    #[test]
    fn test_invalid_environments_are_rejected() {
        for spec in ["chrome", "/chrome", "Android/", "Android/chrome@", "Android/chrome/x"] {
            let result: Result<Environment, _> = spec.parse();
            assert!(
                matches!(result, Err(MatrixError::InvalidEnvironment { .. })),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn test_separators_are_rejected_in_components() {
        for (platform, browser, version) in [
            ("x/y", "z", None),
            ("P", "a@b", Some("1")),
            ("P", "a/b", None),
            ("P", "a", Some("1/2")),
        ] {
            assert!(
                matches!(
                    Environment::new(platform, browser, version),
                    Err(MatrixError::InvalidEnvironment { .. })
                ),
                "{platform}/{browser}@{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_table_form_environments_reparse_from_their_label() {
        let config = RunConfig::from_toml_str(
            r#"
[matrices.tables]
provider = "cloud-remote"
environments = [
    { platform = "Windows 10", browser = "internet explorer", version = "11" },
    { platform = "P", browser = "a", version = "b@1" },
    { platform = "macOS 13", browser = "safari" },
]
"#,
            std::path::Path::new("BrowserMatrix.toml"),
        )
        .unwrap();

        let environments = &config.matrices["tables"].environments;
        assert_eq!(environments.len(), 3);
        for e in environments {
            assert_eq!(e.to_string().parse::<Environment>().unwrap(), *e);
        }
    }

    #[test]
    fn test_table_form_with_ambiguous_label_is_rejected() {
        for entry in [
            r#"{ platform = "P", browser = "a@b", version = "1" }"#,
            r#"{ platform = "x/y", browser = "z" }"#,
        ] {
            let content = format!(
                "[matrices.bad]\nprovider = \"cloud-remote\"\nenvironments = [{entry}]\n"
            );
            let result = RunConfig::from_toml_str(&content, std::path::Path::new("BrowserMatrix.toml"));
            assert!(matches!(result, Err(MatrixError::ConfigParse { .. })), "{entry}");
        }
    }

    #[test]
    fn test_new_trims_and_defaults_version() {
        let e = Environment::new(" macOS 10.12 ", " safari ", Some("  ")).unwrap();
        assert_eq!(e.platform(), "macOS 10.12");
        assert_eq!(e.browser(), "safari");
        assert!(e.is_latest());
    }

    #[test]
    fn test_slug_is_html_safe() {
        assert_eq!(env("Windows 10/internet explorer@11").slug(), "windows-10-internet-explorer-11");
        assert_eq!(env("macOS 10.12/safari@11.0").slug(), "macos-10-12-safari-11-0");
    }

    #[test]
    fn test_environments_order_by_platform_then_browser_then_version() {
        let mut envs = vec![
            env("Windows 10/firefox@54"),
            env("Android/chrome"),
            env("Windows 10/chrome@60"),
        ];
        envs.sort();
        let names: Vec<String> = envs.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            names,
            vec!["Android/chrome", "Windows 10/chrome@60", "Windows 10/firefox@54"]
        );
    }
}

#[cfg(test)]
mod provider_kind_tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trips_through_text() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("saucelabs".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_flags() {
        assert!(!ProviderKind::CloudRemote.is_local());
        assert!(ProviderKind::LocalHeadless.is_local());
        assert!(ProviderKind::LocalHeadless.is_headless());
        assert!(ProviderKind::LocalHeaded.is_local());
        assert!(!ProviderKind::LocalHeaded.is_headless());
    }
}

#[cfg(test)]
mod matrix_tests {
    use super::*;

    #[test]
    fn test_empty_matrix_is_rejected() {
        let result = Matrix::new("empty", ProviderKind::CloudRemote, vec![]);
        assert!(matches!(result, Err(MatrixError::EmptyMatrix { mode }) if mode == "empty"));
    }

    #[test]
    fn test_duplicate_environment_is_rejected() {
        let result = Matrix::new(
            "dup",
            ProviderKind::CloudRemote,
            vec![env("Android/chrome"), env("Android/chrome@latest")],
        );
        assert!(matches!(result, Err(MatrixError::DuplicateEnvironment { .. })));
    }

    #[test]
    fn test_matrix_keeps_declaration_order() {
        let m = Matrix::new(
            "m",
            ProviderKind::LocalHeadless,
            vec![env("local/firefox"), env("local/chrome")],
        )
        .unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.environments()[0], env("local/firefox"));
        assert!(m.contains(&env("local/chrome")));
        assert_eq!(m.with_provider(ProviderKind::LocalHeaded).provider(), ProviderKind::LocalHeaded);
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new(env("Android/chrome"));
        assert_eq!(session.status(), SessionStatus::Pending);
        assert_eq!(session.record_attempt(), 1);
        assert!(session.start());
        assert!(!session.start());
        assert_eq!(session.status(), SessionStatus::Running);
        assert!(session.finish(Outcome::Passed));

        let record = session.into_record();
        assert_eq!(record.outcome, Outcome::Passed);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.retries(), 0);
        assert!(record.started_at.is_some());
        assert!(!record.cut_off);
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let mut session = Session::new(env("Android/chrome"));
        session.start();
        assert!(session.finish(Outcome::Failed));
        assert!(!session.finish(Outcome::Passed));
        assert!(!session.cut_off());
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(!session.is_cut_off());
    }

    #[test]
    fn test_cut_off_session_is_timed_out() {
        let mut session = Session::new(env("Android/chrome"));
        assert!(session.cut_off());
        let record = session.into_record();
        assert_eq!(record.outcome, Outcome::TimedOut);
        assert!(record.cut_off);
        assert_eq!(record.attempts, 0);
        assert!(record.started_at.is_none());
    }

    #[test]
    fn test_unfinished_session_is_archived_as_errored() {
        let mut session = Session::new(env("Android/chrome"));
        session.start();
        let record = session.into_record();
        assert_eq!(record.outcome, Outcome::Errored);
        assert!(record.output().contains("running"));
    }
}
