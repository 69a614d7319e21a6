//! # File System Operations Module / 文件系统操作模块
//!
//! Helpers for resolving paths and writing report files.
//!
//! 用于解析路径和写入报告文件的辅助函数。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `contents` to `path`, creating missing parent directories first.
///
/// # Arguments
/// * `path` - Destination file
/// * `contents` - File contents
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Gets the absolute path from a potentially relative path.
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}
