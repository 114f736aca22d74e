#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

/// Resolve `binary` the way a shell would. Names containing a path separator are checked as is.
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|path| is_executable(path))
}

/// Fails with `MS-ENV-001` naming every binary that cannot be resolved.
pub fn ensure_required_binaries(binaries: &[String]) -> Result<(), AppError> {
    let missing: Vec<&str> = binaries
        .iter()
        .map(String::as_str)
        .filter(|binary| find_in_path(binary).is_none())
        .collect();
    if missing.is_empty() {
        tracing::debug!(binaries = ?binaries, "required binaries present");
        return Ok(());
    }
    let mut error = AppError::new(
        ErrorCategory::ToolExecutionError,
        format!("required binaries not found on PATH: {}", missing.join(", ")),
    )
    .with_code("MS-ENV-001");
    error.add_context("missing", &missing.join(","));
    Err(error)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
