//! Bundled resource paths.
//!
//! A packaged gateway ships its `config.yaml` next to the executable, while a
//! development checkout keeps it in the working directory. Relative paths are
//! looked up in both places.

use std::path::{Path, PathBuf};

/// Resolve a resource path.
///
/// Absolute paths are returned unchanged. Relative paths are tried against the
/// current directory and then the running executable's directory; the first
/// that exists wins. When neither exists the current-directory candidate is
/// returned so errors name a predictable location.
#[must_use]
pub fn resolve_resource_path(path: &Path) -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    resolve_with_roots(path, std::env::current_dir().ok(), exe_dir)
}

fn resolve_with_roots(path: &Path, cwd: Option<PathBuf>, bundle: Option<PathBuf>) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let cwd_candidate = cwd.map_or_else(|| path.to_path_buf(), |dir| dir.join(path));
    if cwd_candidate.exists() {
        return cwd_candidate;
    }

    if let Some(candidate) = bundle.map(|dir| dir.join(path))
        && candidate.exists()
    {
        tracing::debug!(path = %candidate.display(), "Resolved resource from bundle directory");
        return candidate;
    }

    cwd_candidate
}
