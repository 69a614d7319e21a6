//! # List Command Module / 列表命令模块
//!
//! Prints every registered mode with its provider kind and environments.
//! 打印每个已注册的模式及其提供者类型和环境。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::cli::commands::run::load_config;
use crate::core::registry::{DEFAULT_MODE, MatrixRegistry};
use crate::infra::t;

/// Executes the list command.
///
/// # Arguments
/// * `config` - Optional configuration file adding or replacing matrices
/// * `locale` - Output language
pub fn execute(config: Option<PathBuf>, locale: &str) -> Result<()> {
    let (config, _) = load_config(config.as_deref())?;
    let registry = MatrixRegistry::from_config(&config)?;

    println!("{}", t!("list.header", locale = locale).bold());

    for matrix in registry.matrices() {
        let marker = if matrix.mode() == DEFAULT_MODE {
            format!(" {}", t!("list.default_marker", locale = locale)).dimmed()
        } else {
            "".normal()
        };
        println!(
            "\n{} ({}){}",
            matrix.mode().cyan().bold(),
            matrix.provider(),
            marker
        );
        for environment in matrix.environments() {
            println!("  - {environment}");
        }
    }

    let aliases: Vec<_> = registry.aliases().collect();
    if !aliases.is_empty() {
        println!("\n{}", t!("list.aliases", locale = locale).bold());
        for (alias, target) in aliases {
            println!("  {} -> {}", alias.cyan(), target);
        }
    }

    let configured: Vec<_> = config.providers.keys().cloned().collect();
    if configured.is_empty() {
        println!("\n{}", t!("list.no_providers", locale = locale).yellow());
    } else {
        println!(
            "\n{}",
            t!("list.providers", locale = locale, providers = configured.join(", "))
        );
    }
    Ok(())
}
