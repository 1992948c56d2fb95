//! Path normalization helpers shared by the resolution strategies.
//!
//! Every resolved test path is deduplicated by its normalized form, so all
//! strategies funnel their hits through [`normalize`] before comparison.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. No filesystem access and no symlink resolution.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Render a path relative to the workspace root with forward slashes.
///
/// Falls back to the path as given when it does not share a prefix with the
/// root (absolute inputs outside the workspace stay absolute).
pub fn display_relative(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let display = relative.to_string_lossy().replace('\\', "/");
    if display.starts_with("../") {
        path.to_string_lossy().replace('\\', "/")
    } else {
        display
    }
}

/// Append a raw suffix to a path without treating it as an extension swap.
///
/// `append_suffix("src/helpers", ".ts")` is `src/helpers.ts` even when the
/// base already contains a dot, matching specifier probing semantics.
pub fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut joined = OsString::from(base.as_os_str());
    joined.push(suffix);
    PathBuf::from(joined)
}

/// File name portion of a `/`-separated relative path string.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Split a file name into stem and extension, the extension keeping its dot.
/// Names without a dot (or starting with one) have an empty extension.
pub fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    }
}
