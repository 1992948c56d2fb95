//! Convention-based test candidate generation.
//!
//! Crosses two independent transform families (test-file name transforms
//! and test-directory transforms) and existence-tests every combination.
//! Unlike specifier resolution there is no early exit: a source file may
//! legitimately map to several test files, and all existing combinations
//! are kept.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::{EcosystemRules, LocationRules, NamingRules};

/// All existing conventional test locations for `source`.
///
/// `source` is the normalized absolute path of an existing source file;
/// `source_rel` its workspace-relative `/`-separated form (used by the
/// segment-swap transforms). Results are deduplicated by normalized path.
pub fn candidates(
    source: &Path,
    source_rel: &str,
    root: &Path,
    rules: &EcosystemRules,
) -> Vec<PathBuf> {
    let file_name = paths::file_name(source_rel);
    let names = candidate_names(file_name, &rules.naming);
    let Some(source_dir) = source.parent() else {
        return Vec::new();
    };
    let dirs = candidate_dirs(source_dir, source_rel, root, &rules.locations);

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for dir in &dirs {
        if !dir.is_dir() {
            continue;
        }
        for name in &names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                let normalized = paths::normalize(&candidate);
                if seen.insert(normalized.clone()) {
                    hits.push(normalized);
                }
            }
        }
    }
    hits
}

/// Name transforms: each prefix applied to the full name, and each marker
/// inserted before the extension, for the original extension and every
/// configured cross extension.
pub fn candidate_names(file_name: &str, rules: &NamingRules) -> Vec<String> {
    let (stem, ext) = paths::split_name(file_name);

    let mut extensions = vec![ext.to_string()];
    for cross in &rules.cross_extensions {
        let dotted = format!(".{cross}");
        if !extensions.contains(&dotted) {
            extensions.push(dotted);
        }
    }

    let mut names = Vec::new();
    for marker in &rules.markers {
        for extension in &extensions {
            push_unique(&mut names, format!("{stem}{marker}{extension}"));
        }
    }
    for prefix in &rules.prefixes {
        push_unique(&mut names, format!("{prefix}{stem}{ext}"));
    }
    names
}

/// Directory transforms: the source's own directory, configured sibling test
/// subdirectories (optionally repeated one level up), segment swaps applied
/// to the relative path, and fixed project-level roots.
fn candidate_dirs(
    source_dir: &Path,
    source_rel: &str,
    root: &Path,
    rules: &LocationRules,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if rules.include_source_dir {
        dirs.push(source_dir.to_path_buf());
    }
    for sibling in &rules.sibling_dirs {
        dirs.push(source_dir.join(sibling));
    }
    if rules.parent_dirs {
        if let Some(parent) = source_dir.parent() {
            for sibling in &rules.sibling_dirs {
                dirs.push(parent.join(sibling));
            }
        }
    }
    for swap in &rules.segment_swaps {
        if source_rel.contains(&swap.from) {
            let swapped = source_rel.replace(&swap.from, &swap.to);
            if let Some(dir) = Path::new(&swapped).parent() {
                dirs.push(root.join(dir));
            }
        }
    }
    for project_root in &rules.project_roots {
        dirs.push(root.join(project_root));
    }

    let mut seen = HashSet::new();
    dirs.into_iter()
        .map(|dir| paths::normalize(&dir))
        .filter(|dir| seen.insert(dir.clone()))
        .collect()
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn web_names_cover_marker_prefix_and_cross_extension_forms() {
        let rules = Config::default().web.naming;
        let names = candidate_names("Button.svelte", &rules);
        assert_eq!(
            names,
            vec![
                "Button.test.svelte",
                "Button.test.js",
                "Button.test.ts",
                "Button.spec.svelte",
                "Button.spec.js",
                "Button.spec.ts",
                "test_Button.svelte",
            ]
        );
    }

    #[test]
    fn web_names_do_not_duplicate_the_original_extension() {
        let rules = Config::default().web.naming;
        let names = candidate_names("math.js", &rules);
        assert_eq!(
            names,
            vec![
                "math.test.js",
                "math.test.ts",
                "math.spec.js",
                "math.spec.ts",
                "test_math.js",
            ]
        );
    }

    #[test]
    fn script_names_cover_prefix_and_suffix_vocabularies() {
        let rules = Config::default().script.naming;
        let names = candidate_names("serializers.py", &rules);
        assert_eq!(
            names,
            vec![
                "serializers_test.py",
                "serializers_tests.py",
                "test_serializers.py",
                "tests_serializers.py",
            ]
        );
    }

    #[test]
    fn segment_swaps_map_source_roots_into_test_roots() {
        let rules = Config::default().web.locations;
        let dirs = candidate_dirs(
            Path::new("/ws/src/components/forms"),
            "src/components/forms/Input.svelte",
            Path::new("/ws"),
            &rules,
        );
        assert!(dirs.contains(&PathBuf::from("/ws/tests/components/forms")));
        assert!(dirs.contains(&PathBuf::from("/ws/tests/unit")));
        assert!(dirs.contains(&PathBuf::from("/ws/src/components/forms/__tests__")));
    }
}
