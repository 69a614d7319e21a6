//! # Init Command Module / 初始化命令模块
//!
//! Creates a starter `BrowserMatrix.toml`, either through an interactive
//! wizard or with sensible defaults.
//!
//! 通过交互式向导或使用合理的默认值创建初始的 `BrowserMatrix.toml`。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::path::Path;

use crate::core::config::{DEFAULT_CONFIG_FILE, ProviderSettings, RunConfig};
use crate::core::models::{ProviderKind, SuiteRef};
use crate::infra::fs::write_file;
use crate::infra::t;

const HEADER: &str = "# Browser Matrix configuration / 浏览器矩阵配置\n\
# Command placeholders: {platform} {browser} {version} {environment} {suite} {headless}\n\n";

/// Suggested command template for each provider kind.
fn suggested_command(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::CloudRemote => {
            "npx wct --plugin sauce --sauce \"{platform}/{browser}@{version}\" {suite}"
        }
        ProviderKind::LocalHeadless => "npx wct --plugin local --local {browser} --headless {suite}",
        ProviderKind::LocalHeaded => "npx wct --plugin local --local {browser} {suite}",
    }
}

fn provider_settings(kind: ProviderKind, command: String) -> ProviderSettings {
    ProviderSettings {
        command,
        browsers: Vec::new(),
        max_sessions: match kind {
            ProviderKind::CloudRemote => Some(5),
            _ => None,
        },
    }
}

/// The configuration written by `init --non-interactive`.
/// `init --non-interactive` 写出的配置。
pub fn default_config(language: &str) -> RunConfig {
    let mut config = RunConfig {
        language: language.to_string(),
        ..RunConfig::default()
    };
    for kind in [ProviderKind::LocalHeadless, ProviderKind::CloudRemote] {
        config.providers.insert(
            kind.to_string(),
            provider_settings(kind, suggested_command(kind).to_string()),
        );
    }
    config
}

/// Runs the wizard that generates `BrowserMatrix.toml`.
/// 运行生成 `BrowserMatrix.toml` 的向导。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILE);

    if non_interactive {
        return write_config(config_path, &default_config(language), language);
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
    println!("{}", t!("init.description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let kinds = ProviderKind::ALL;
    let defaults: Vec<bool> = kinds
        .iter()
        .map(|kind| *kind == ProviderKind::LocalHeadless)
        .collect();
    let selections = MultiSelect::with_theme(&theme)
        .with_prompt(t!("init.provider_selection_prompt", locale = language))
        .items(&kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>())
        .defaults(&defaults)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let mut config = RunConfig {
        language: language.to_string(),
        ..RunConfig::default()
    };

    if selections.is_empty() {
        println!("{}", t!("init.no_providers_selected", locale = language).yellow());
        config = default_config(language);
    }

    for i in selections {
        let kind = kinds[i];
        let command: String = Input::with_theme(&theme)
            .with_prompt(t!("init.command_prompt", locale = language, kind = kind))
            .default(suggested_command(kind).to_string())
            .interact_text()?;
        config
            .providers
            .insert(kind.to_string(), provider_settings(kind, command));
    }

    let suite: String = Input::with_theme(&theme)
        .with_prompt(t!("init.suite_prompt", locale = language))
        .default(config.suite.to_string())
        .interact_text()?;
    config.suite = SuiteRef::new(suite);

    write_config(config_path, &config, language)
}

fn write_config(path: &Path, config: &RunConfig, language: &str) -> Result<()> {
    let body = toml::to_string_pretty(config)
        .context(t!("init.serialize_failed", locale = language).to_string())?;

    write_file(path, &format!("{HEADER}{body}"))
        .with_context(|| t!("init.write_failed", locale = language, path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language));

    Ok(())
}
