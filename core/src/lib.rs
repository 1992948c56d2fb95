//! relatest core resolution engine.
//!
//! Given source files that changed (or are otherwise relevant), determines
//! which existing test files exercise each one. One engine covers both the
//! Python-style scripting ecosystem and the JS/TS/Svelte front-end ecosystem,
//! driven by per-ecosystem configuration tables: naming conventions, test
//! directory layouts, path aliases, and reference-scan rules.
//!
//! The engine only reads from the filesystem and returns plain data
//! structures. Persisting result artifacts is the caller's concern.

pub mod candidates;
pub mod extract;
pub mod paths;
pub mod reference;
pub mod resolve;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use reference::{ReferenceScan, ScanCache};

/// Source ecosystem, inferred from the file extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Ecosystem {
    /// Python-style scripting conventions (`test_*.py`, `tests/` siblings).
    Script,
    /// JS/TS/Svelte conventions (`*.test.js`, `__tests__/`, path aliases).
    Web,
}

/// A symbolic path prefix mapped to a directory under the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasRule {
    pub prefix: String,
    pub target: String,
}

impl AliasRule {
    fn new(prefix: &str, target: &str) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
        }
    }
}

/// Test-file name transforms applied to a source file's name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Prepended to the full file name (`test_` -> `test_views.py`).
    pub prefixes: Vec<String>,
    /// Inserted between stem and extension (`.test` -> `Button.test.js`).
    pub markers: Vec<String>,
    /// Extensions the markers are additionally tried with, covering test
    /// files written in a sibling language (`Button.svelte` ->
    /// `Button.test.ts`).
    pub cross_extensions: Vec<String>,
}

/// One path segment substitution (`src/` -> `tests/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSwap {
    pub from: String,
    pub to: String,
}

impl SegmentSwap {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Test-directory transforms applied to a source file's location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRules {
    /// Probe the source file's own directory.
    pub include_source_dir: bool,
    /// Test subdirectories probed inside the source directory.
    pub sibling_dirs: Vec<String>,
    /// Also probe the sibling subdirectories one level up.
    pub parent_dirs: bool,
    /// Segment substitutions applied to the workspace-relative path.
    pub segment_swaps: Vec<SegmentSwap>,
    /// Fixed directories under the workspace root.
    pub project_roots: Vec<String>,
}

impl Default for LocationRules {
    fn default() -> Self {
        Self {
            include_source_dir: true,
            sibling_dirs: Vec::new(),
            parent_dirs: false,
            segment_swaps: Vec::new(),
            project_roots: Vec::new(),
        }
    }
}

/// Predicate deciding whether a path already names a test file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFilePattern {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub infixes: Vec<String>,
    /// Directory names whose presence anywhere in the path marks the file
    /// as a test (`tests`, `__tests__`).
    pub dir_markers: Vec<String>,
}

impl TestFilePattern {
    /// Name-level predicate, used both for the identity rule and to admit
    /// files into the reference-scan corpus.
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
            || self
                .suffixes
                .iter()
                .any(|suffix| file_name.ends_with(suffix.as_str()))
            || self
                .infixes
                .iter()
                .any(|infix| file_name.contains(infix.as_str()))
    }

    /// Full predicate over a `/`-separated relative path: the name-level
    /// predicate plus directory markers.
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.matches_name(paths::file_name(relative_path)) {
            return true;
        }
        self.dir_markers.iter().any(|marker| {
            relative_path.contains(&format!("/{marker}/"))
                || relative_path.starts_with(&format!("{marker}/"))
        })
    }
}

/// Toggles for the two reference-scan match families. They have different
/// false-positive profiles, so each can be disabled on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceRules {
    pub import_graph: bool,
    pub text_heuristic: bool,
}

impl Default for ReferenceRules {
    fn default() -> Self {
        Self {
            import_graph: true,
            text_heuristic: true,
        }
    }
}

/// Everything the engine knows about one ecosystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemRules {
    /// Probe extensions in resolution priority order (no leading dot).
    pub extensions: Vec<String>,
    /// Extensions of template files whose script regions must be isolated
    /// before import extraction.
    pub template_extensions: Vec<String>,
    pub aliases: Vec<AliasRule>,
    pub naming: NamingRules,
    pub locations: LocationRules,
    pub test_files: TestFilePattern,
    pub reference: ReferenceRules,
}

/// Top-level configuration: both ecosystems plus the corpus settings shared
/// by the reference scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web: EcosystemRules,
    pub script: EcosystemRules,
    /// Directories under the workspace root enumerated as the test corpus.
    pub corpus_roots: Vec<String>,
    /// Subtrees never walked during corpus enumeration.
    pub ignore_globs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let web = EcosystemRules {
            extensions: ["js", "ts", "tsx", "jsx", "svelte", "mjs", "cjs"]
                .map(String::from)
                .to_vec(),
            template_extensions: vec!["svelte".into()],
            aliases: vec![
                AliasRule::new("$lib", "src/lib"),
                AliasRule::new("$components", "src/components"),
                AliasRule::new("$routes", "src/routes"),
                AliasRule::new("$assets", "src/assets"),
                AliasRule::new("$stores", "src/stores"),
                AliasRule::new("@", "src"),
                AliasRule::new("~", "src"),
            ],
            naming: NamingRules {
                prefixes: vec!["test_".into()],
                markers: vec![".test".into(), ".spec".into()],
                cross_extensions: vec!["js".into(), "ts".into()],
            },
            locations: LocationRules {
                include_source_dir: true,
                sibling_dirs: ["__tests__", "tests", "test"].map(String::from).to_vec(),
                parent_dirs: false,
                segment_swaps: vec![
                    SegmentSwap::new("src/components", "tests/components"),
                    SegmentSwap::new("src/routes", "tests/routes"),
                    SegmentSwap::new("src/", "tests/"),
                ],
                project_roots: ["tests", "tests/unit", "tests/e2e"]
                    .map(String::from)
                    .to_vec(),
            },
            test_files: TestFilePattern {
                prefixes: vec!["test_".into()],
                suffixes: [
                    ".test.js",
                    ".test.ts",
                    ".test.svelte",
                    ".spec.js",
                    ".spec.ts",
                    ".spec.svelte",
                ]
                .map(String::from)
                .to_vec(),
                infixes: Vec::new(),
                dir_markers: ["tests", "test", "__tests__"].map(String::from).to_vec(),
            },
            reference: ReferenceRules::default(),
        };

        let script = EcosystemRules {
            extensions: vec!["py".into()],
            template_extensions: Vec::new(),
            aliases: Vec::new(),
            naming: NamingRules {
                prefixes: vec!["test_".into(), "tests_".into()],
                markers: vec!["_test".into(), "_tests".into()],
                cross_extensions: Vec::new(),
            },
            locations: LocationRules {
                include_source_dir: true,
                sibling_dirs: ["tests", "test"].map(String::from).to_vec(),
                parent_dirs: true,
                segment_swaps: Vec::new(),
                project_roots: vec!["tests".into()],
            },
            test_files: TestFilePattern {
                prefixes: vec!["test_".into()],
                suffixes: vec!["_test.py".into()],
                infixes: vec!["tests_".into()],
                dir_markers: Vec::new(),
            },
            reference: ReferenceRules::default(),
        };

        Self {
            web,
            script,
            corpus_roots: vec!["tests".into()],
            ignore_globs: [
                "**/node_modules",
                "**/node_modules/**",
                "**/.git",
                "**/.git/**",
                "**/dist",
                "**/dist/**",
                "**/build",
                "**/build/**",
                "**/target",
                "**/target/**",
                "**/coverage",
                "**/coverage/**",
                "**/__pycache__",
                "**/__pycache__/**",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Config {
    /// Ecosystem for a path, decided by extension membership in the web
    /// probe list. Unknown extensions use the script ruleset.
    pub fn ecosystem_for(&self, path: &str) -> Ecosystem {
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if self.web.extensions.iter().any(|e| e == &extension) {
            Ecosystem::Web
        } else {
            Ecosystem::Script
        }
    }

    pub fn rules_for(&self, ecosystem: Ecosystem) -> &EcosystemRules {
        match ecosystem {
            Ecosystem::Web => &self.web,
            Ecosystem::Script => &self.script,
        }
    }
}

/// Which phase of the pipeline produced a mapping entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// The source is itself a test file and maps to itself.
    Identity,
    /// Naming/directory convention candidates existed.
    Convention,
    /// The reference scan ran (its result may still be empty).
    Reference,
    /// The source file was not found on disk.
    Missing,
}

/// Mapping entry for one input source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileResolution {
    /// The input path exactly as given.
    pub source: String,
    /// Workspace-relative test paths, ordered and deduplicated.
    pub tests: Vec<String>,
    pub strategy: MatchStrategy,
}

/// Result of resolving a batch of source files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionReport {
    /// One entry per input file, in input order; no input is omitted.
    pub files: Vec<FileResolution>,
    /// Deduplicated union of every entry's tests, in discovery order.
    pub superset: Vec<String>,
    /// Per-file problems downgraded from errors; never fatal.
    pub warnings: Vec<String>,
}

/// The resolution engine. Holds the workspace root and compiled
/// configuration; every method is read-only with respect to the filesystem.
pub struct Resolver {
    root: PathBuf,
    config: Config,
    ignore: Option<GlobSet>,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> anyhow::Result<Self> {
        let ignore = if config.ignore_globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &config.ignore_globs {
                let glob = Glob::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid ignore glob `{pattern}`: {e}"))?;
                builder.add(glob);
            }
            Some(builder.build()?)
        };
        Ok(Self {
            root: paths::normalize(&root.into()),
            config,
            ignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve every source file in the batch. Files are independent; a
    /// failure on one never aborts the rest.
    pub fn resolve_all(&self, sources: &[String]) -> ResolutionReport {
        let mut cache = ScanCache::default();
        let mut warnings = Vec::new();
        let mut files = Vec::new();
        let mut seen = HashSet::new();
        let mut superset = Vec::new();

        for source in sources {
            let resolution = self.resolve_with(source, &mut cache, &mut warnings);
            for test in &resolution.tests {
                if seen.insert(test.clone()) {
                    superset.push(test.clone());
                }
            }
            files.push(resolution);
        }

        ResolutionReport {
            files,
            superset,
            warnings,
        }
    }

    /// Resolve a single source file with a fresh cache.
    pub fn resolve_file(&self, source: &str) -> (FileResolution, Vec<String>) {
        let mut cache = ScanCache::default();
        let mut warnings = Vec::new();
        let resolution = self.resolve_with(source, &mut cache, &mut warnings);
        (resolution, warnings)
    }

    fn resolve_with(
        &self,
        source: &str,
        cache: &mut ScanCache,
        warnings: &mut Vec<String>,
    ) -> FileResolution {
        let given = source.trim();
        let predicate_path = given.replace('\\', "/");
        let rules = self.config.rules_for(self.config.ecosystem_for(given));

        let absolute = {
            let candidate = Path::new(given);
            if candidate.is_absolute() {
                paths::normalize(candidate)
            } else {
                paths::normalize(&self.root.join(candidate))
            }
        };

        // A test file maps to itself.
        if rules.test_files.matches(&predicate_path) {
            if absolute.is_file() {
                let display = paths::display_relative(&absolute, &self.root);
                return FileResolution {
                    source: source.to_string(),
                    tests: vec![display],
                    strategy: MatchStrategy::Identity,
                };
            }
            warnings.push(format!("source file not found: {}", absolute.display()));
            return FileResolution {
                source: source.to_string(),
                tests: Vec::new(),
                strategy: MatchStrategy::Missing,
            };
        }

        if !absolute.is_file() {
            warnings.push(format!("source file not found: {}", absolute.display()));
            return FileResolution {
                source: source.to_string(),
                tests: Vec::new(),
                strategy: MatchStrategy::Missing,
            };
        }

        let source_rel = paths::display_relative(&absolute, &self.root);
        let found = candidates::candidates(&absolute, &source_rel, &self.root, rules);
        if !found.is_empty() {
            return FileResolution {
                source: source.to_string(),
                tests: self.display_all(&found),
                strategy: MatchStrategy::Convention,
            };
        }

        let scan = ReferenceScan {
            root: &self.root,
            rules,
            corpus_roots: &self.config.corpus_roots,
            ignore: self.ignore.as_ref(),
        };
        let found = scan.matches(&absolute, cache, warnings);
        FileResolution {
            source: source.to_string(),
            tests: self.display_all(&found),
            strategy: MatchStrategy::Reference,
        }
    }

    fn display_all(&self, found: &[PathBuf]) -> Vec<String> {
        found
            .iter()
            .map(|path| paths::display_relative(path, &self.root))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_inference_by_extension() {
        let config = Config::default();
        assert_eq!(config.ecosystem_for("src/App.svelte"), Ecosystem::Web);
        assert_eq!(config.ecosystem_for("src/app.TS"), Ecosystem::Web);
        assert_eq!(config.ecosystem_for("utils/math.py"), Ecosystem::Script);
        assert_eq!(config.ecosystem_for("Makefile"), Ecosystem::Script);
    }

    #[test]
    fn web_test_predicate_accepts_names_and_directories() {
        let pattern = Config::default().web.test_files;
        assert!(pattern.matches("src/Button.test.js"));
        assert!(pattern.matches("src/Button.spec.svelte"));
        assert!(pattern.matches("src/test_Button.js"));
        assert!(pattern.matches("tests/anything.js"));
        assert!(pattern.matches("src/__tests__/Button.js"));
        assert!(!pattern.matches("src/Button.svelte"));
        assert!(!pattern.matches("attested/Button.js"));
    }

    #[test]
    fn script_test_predicate_is_name_only() {
        let pattern = Config::default().script.test_files;
        assert!(pattern.matches("app/test_views.py"));
        assert!(pattern.matches("app/views_test.py"));
        assert!(pattern.matches("app/tests_helpers.py"));
        assert!(!pattern.matches("tests/views.py"));
        assert!(!pattern.matches("app/views.py"));
    }

    #[test]
    fn config_round_trips_through_json_with_defaults() {
        let parsed: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.corpus_roots, vec!["tests"]);
        assert_eq!(parsed.web.naming.markers, vec![".test", ".spec"]);
        assert!(parsed.script.reference.import_graph);
    }
}
