//! Specifier-to-file resolution.
//!
//! Turns a raw import specifier plus the importing file's location into an
//! existing file path, or nothing. Relative specifiers resolve against the
//! importing file's directory; aliased specifiers substitute a configured
//! prefix for a directory under the workspace root. Bare specifiers are
//! external packages and are never traced.

use std::path::{Path, PathBuf};

use crate::paths;
use crate::EcosystemRules;

/// Resolve `specifier` as imported from `importing_file`.
///
/// Probing stops at the first existing path, so a specifier resolves to at
/// most one file. Returns `None` for external packages and misses.
pub fn resolve_specifier(
    specifier: &str,
    importing_file: &Path,
    root: &Path,
    rules: &EcosystemRules,
) -> Option<PathBuf> {
    if specifier.starts_with('.') {
        let parent = importing_file.parent()?;
        let base = paths::normalize(&parent.join(specifier));
        return probe_suffixes(&base, &rules.extensions);
    }

    for alias in &rules.aliases {
        let Some(rest) = strip_alias(specifier, &alias.prefix) else {
            continue;
        };
        let target_root = paths::normalize(&root.join(&alias.target));
        let base = paths::normalize(&target_root.join(rest));
        // An alias resolution may not escape its mapped subtree.
        if !base.starts_with(&target_root) {
            return None;
        }
        return probe_suffixes(&base, &rules.extensions);
    }

    None
}

/// Probe `base` against the ordered suffix list: the bare path first, then
/// each extension, then `index.<ext>` for each extension. First hit wins.
pub fn probe_suffixes(base: &Path, extensions: &[String]) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    for ext in extensions {
        let candidate = paths::append_suffix(base, &format!(".{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for ext in extensions {
        let candidate = base.join(format!("index.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Match `specifier` against an alias prefix. The prefix must be followed by
/// a path separator; a specifier exactly equal to the prefix stays external.
fn strip_alias<'a>(specifier: &'a str, prefix: &str) -> Option<&'a str> {
    specifier.strip_prefix(prefix)?.strip_prefix('/')
}
