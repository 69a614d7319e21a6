//! # Platform Matrix Registry / 平台矩阵注册表
//!
//! Holds the closed set of named matrices a run can select with `--env`.
//! The registry is assembled once from the built-in matrices and the
//! configuration file, and is read-only afterwards.
//!
//! 保存运行时可以通过 `--env` 选择的具名矩阵的封闭集合。
//! 注册表由内置矩阵和配置文件一次性组装而成，之后只读。

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::core::config::RunConfig;
use crate::core::error::MatrixError;
use crate::core::models::{Environment, Matrix, ProviderKind};

/// Mode used when no mode is requested.
/// 未请求模式时使用的模式。
pub const DEFAULT_MODE: &str = "default";

type StaticEnvironment = (&'static str, &'static str, &'static str);

const DEFAULT_ENVIRONMENTS: &[StaticEnvironment] = &[
    ("local", "chrome", "latest"),
    ("local", "firefox", "latest"),
];

const SAUCELABS_ENVIRONMENTS: &[StaticEnvironment] = &[
    ("macOS 10.12", "iphone", "10.3"),
    ("macOS 10.12", "ipad", "11.0"),
    ("Windows 10", "microsoftedge", "15"),
    ("Windows 10", "internet explorer", "11"),
    ("macOS 10.12", "safari", "11.0"),
];

const SCHEDULED_ENVIRONMENTS: &[StaticEnvironment] = &[
    ("Android", "chrome", "latest"),
    ("Windows 10", "firefox", "54"),
    ("Windows 10", "chrome", "60"),
];

const BUILTIN_MATRICES: &[(&str, ProviderKind, &[StaticEnvironment])] = &[
    (DEFAULT_MODE, ProviderKind::LocalHeadless, DEFAULT_ENVIRONMENTS),
    ("saucelabs", ProviderKind::CloudRemote, SAUCELABS_ENVIRONMENTS),
    ("scheduled", ProviderKind::CloudRemote, SCHEDULED_ENVIRONMENTS),
];

/// Alternative names accepted for built-in modes.
const BUILTIN_ALIASES: &[(&str, &str)] = &[("saucelabs-cron", "scheduled")];

static BUILTIN: Lazy<MatrixRegistry> = Lazy::new(|| {
    let matrices = BUILTIN_MATRICES
        .iter()
        .map(|(mode, provider, environments)| {
            let environments = environments
                .iter()
                .map(|(platform, browser, version)| Environment::from_static(platform, browser, version))
                .collect();
            let matrix = Matrix::from_parts(mode, *provider, environments);
            (mode.to_string(), matrix)
        })
        .collect();
    let aliases = BUILTIN_ALIASES
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect();
    MatrixRegistry { matrices, aliases }
});

/// Keyed lookup from mode to matrix.
/// 从模式到矩阵的键控查找。
#[derive(Debug, Clone)]
pub struct MatrixRegistry {
    matrices: BTreeMap<String, Matrix>,
    aliases: BTreeMap<String, String>,
}

impl MatrixRegistry {
    /// The registry made of the built-in matrices only.
    /// 仅由内置矩阵组成的注册表。
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Built-in matrices plus the ones declared in `config`. A configured
    /// matrix with the name of a built-in one replaces it.
    ///
    /// 内置矩阵加上 `config` 中声明的矩阵。与内置矩阵同名的配置矩阵会替换它。
    pub fn from_config(config: &RunConfig) -> Result<Self, MatrixError> {
        let mut registry = Self::builtin();
        for (mode, definition) in &config.matrices {
            let matrix = Matrix::new(
                mode.clone(),
                definition.provider,
                definition.environments.clone(),
            )?;
            registry.aliases.remove(mode);
            registry.matrices.insert(mode.clone(), matrix);
        }
        Ok(registry)
    }

    /// Looks up the matrix registered for `mode`.
    /// 查找为 `mode` 注册的矩阵。
    ///
    /// # Errors
    /// `MatrixError::UnknownMode` if neither a matrix nor an alias has that name.
    pub fn resolve(&self, mode: &str) -> Result<Matrix, MatrixError> {
        let key = self.aliases.get(mode).map(String::as_str).unwrap_or(mode);
        self.matrices
            .get(key)
            .cloned()
            .ok_or_else(|| MatrixError::UnknownMode {
                mode: mode.to_string(),
                known: self.modes(),
            })
    }

    /// Every accepted mode key, aliases included, in sorted order.
    /// 所有可接受的模式键（包括别名），按顺序排列。
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = self
            .matrices
            .keys()
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        modes.sort();
        modes
    }

    /// The registered matrices, without aliases.
    pub fn matrices(&self) -> impl Iterator<Item = &Matrix> {
        self.matrices.values()
    }

    /// Aliases as `(alias, target)` pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }
}
