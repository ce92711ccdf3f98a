//! Locating external executables

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::domain::model::ToolKind;
use crate::error::{ClipError, ClipResult};

/// Resolve a configured tool to an executable file.
///
/// Paths with a directory component are checked as given; bare names are
/// searched in `PATH`.
pub fn locate_executable(tool: ToolKind, configured: &Path) -> ClipResult<PathBuf> {
    locate_in(tool, configured, std::env::var_os("PATH"))
}

fn locate_in(tool: ToolKind, configured: &Path, search_path: Option<OsString>) -> ClipResult<PathBuf> {
    let is_bare = configured.components().count() == 1 && !configured.is_absolute();

    let candidate = if is_bare {
        search_path
            .iter()
            .flat_map(std::env::split_paths)
            .flat_map(|dir| candidates_in(&dir, configured))
            .find(|p| p.is_file())
    } else {
        Some(configured.to_path_buf()).filter(|p| p.is_file())
    };

    let path = candidate.ok_or_else(|| ClipError::ToolMissing {
        tool,
        path: configured.to_path_buf(),
    })?;

    if !is_executable(&path) {
        return Err(ClipError::ToolNotExecutable { tool, path });
    }
    Ok(path)
}

#[cfg(windows)]
fn candidates_in(dir: &Path, name: &Path) -> Vec<PathBuf> {
    let plain = dir.join(name);
    if plain.extension().is_some() {
        vec![plain]
    } else {
        vec![plain.with_extension("exe"), plain]
    }
}

#[cfg(not(windows))]
fn candidates_in(dir: &Path, name: &Path) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
