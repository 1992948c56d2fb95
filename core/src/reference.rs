//! Fallback reference scanning.
//!
//! When no conventional candidate exists for a source file, the test corpus
//! is scanned for files that either import the source (import-grounded,
//! precise) or textually reference its name (heuristic, recall-biased).
//! The textual family can match coincidental substrings; that tradeoff is
//! intentional and the two families can be toggled independently.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use globset::GlobSet;
use regex::Regex;
use walkdir::WalkDir;

use crate::{extract, paths, resolve, EcosystemRules};

/// Per-run memo of corpus walks, file contents, and extracted specifiers.
/// Purely an optimization: results are identical with a fresh cache.
#[derive(Default)]
pub struct ScanCache {
    dir_files: HashMap<PathBuf, Vec<PathBuf>>,
    contents: HashMap<PathBuf, Option<String>>,
    specifiers: HashMap<PathBuf, BTreeSet<String>>,
}

/// One reference scan over the corpus, configured for a single ecosystem.
pub(crate) struct ReferenceScan<'a> {
    pub root: &'a Path,
    pub rules: &'a EcosystemRules,
    pub corpus_roots: &'a [String],
    pub ignore: Option<&'a GlobSet>,
}

/// Name variants and compiled usage patterns for one queried source file.
struct NameContext {
    prescan: AhoCorasick,
    usage: Vec<Regex>,
    dir_token: Option<String>,
}

impl ReferenceScan<'_> {
    /// Test files that reference `source`, via either match family.
    /// `source` is the normalized absolute path of an existing file.
    pub fn matches(
        &self,
        source: &Path,
        cache: &mut ScanCache,
        warnings: &mut Vec<String>,
    ) -> Vec<PathBuf> {
        let Some(source_dir) = source.parent() else {
            return Vec::new();
        };
        let context = self.name_context(source, source_dir);
        let corpus = self.corpus(source_dir, cache);

        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for test_file in corpus {
            if self.file_matches(&test_file, source, &context, cache, warnings)
                && seen.insert(test_file.clone())
            {
                matched.push(test_file);
            }
        }
        matched
    }

    fn file_matches(
        &self,
        test_file: &Path,
        source: &Path,
        context: &NameContext,
        cache: &mut ScanCache,
        warnings: &mut Vec<String>,
    ) -> bool {
        if !cache.contents.contains_key(test_file) {
            let loaded = match fs::read_to_string(test_file) {
                Ok(text) => Some(text),
                Err(err) => {
                    warnings.push(format!("failed to read {}: {err}", test_file.display()));
                    None
                }
            };
            cache.contents.insert(test_file.to_path_buf(), loaded);
        }

        if self.rules.reference.import_graph && self.imports_source(test_file, source, cache) {
            return true;
        }
        if self.rules.reference.text_heuristic {
            if let Some(Some(text)) = cache.contents.get(test_file) {
                return self.text_references(text, context);
            }
        }
        false
    }

    /// Import-grounded family: does any specifier in `test_file` resolve to
    /// the queried source?
    fn imports_source(&self, test_file: &Path, source: &Path, cache: &mut ScanCache) -> bool {
        if !cache.specifiers.contains_key(test_file) {
            let extracted = match cache.contents.get(test_file) {
                Some(Some(text)) => {
                    extract::extract_specifiers(text, self.is_template(test_file))
                }
                _ => BTreeSet::new(),
            };
            cache.specifiers.insert(test_file.to_path_buf(), extracted);
        }

        let specifiers = &cache.specifiers[test_file];
        specifiers.iter().any(|specifier| {
            resolve::resolve_specifier(specifier, test_file, self.root, self.rules)
                .map(|resolved| paths::normalize(&resolved) == source)
                .unwrap_or(false)
        })
    }

    /// Text-heuristic family: usage-shape patterns over the name variants,
    /// plus bare containment of the source's directory name.
    fn text_references(&self, text: &str, context: &NameContext) -> bool {
        if !context.prescan.is_match(text) {
            return false;
        }
        if let Some(token) = &context.dir_token {
            if text.to_lowercase().contains(token) {
                return true;
            }
        }
        context.usage.iter().any(|pattern| pattern.is_match(text))
    }

    fn name_context(&self, source: &Path, source_dir: &Path) -> NameContext {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, _) = paths::split_name(&file_name);
        let variants = name_variants(stem);
        let usage = usage_patterns(&variants);

        // Short directory names match too much coincidental text.
        let dir_token = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .filter(|name| name.len() > 2);

        let mut needles = variants;
        if let Some(token) = &dir_token {
            needles.push(token.clone());
        }
        let prescan = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(&needles);

        NameContext {
            prescan,
            usage,
            dir_token,
        }
    }

    /// Corpus: every test-named file under the configured roots plus the
    /// source file's own directory subtree, ignore globs applied.
    fn corpus(&self, source_dir: &Path, cache: &mut ScanCache) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .corpus_roots
            .iter()
            .map(|root| paths::normalize(&self.root.join(root)))
            .collect();
        dirs.push(paths::normalize(source_dir));

        let mut seen = HashSet::new();
        let mut corpus = Vec::new();
        for dir in dirs {
            let files = cache
                .dir_files
                .entry(dir.clone())
                .or_insert_with(|| walk_files(&dir, self.ignore));
            for file in files.iter() {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if self.rules.test_files.matches_name(&name) && seen.insert(file.clone()) {
                    corpus.push(file.clone());
                }
            }
        }
        corpus
    }

    fn is_template(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.rules
            .template_extensions
            .iter()
            .any(|template| template == &ext)
    }
}

fn walk_files(dir: &Path, ignore: Option<&GlobSet>) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files = Vec::new();
    let mut walker = WalkDir::new(dir).into_iter();
    while let Some(entry_res) = walker.next() {
        // Unreadable subtrees are skipped, never fatal.
        let Ok(entry) = entry_res else {
            continue;
        };
        let entry_path = entry.path();
        if let Some(set) = ignore {
            if set.is_match(entry_path) {
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }
        }
        if entry.file_type().is_file() {
            files.push(paths::normalize(entry_path));
        }
    }
    files
}

/// The queried name in its written, camelCase, and PascalCase forms, derived
/// by splitting on hyphens and underscores.
fn name_variants(stem: &str) -> Vec<String> {
    let mut variants = vec![stem.to_string()];
    for separator in ['-', '_'] {
        if !stem.contains(separator) {
            continue;
        }
        let words: Vec<&str> = stem.split(separator).filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            continue;
        }
        let camel = {
            let mut out = words[0].to_lowercase();
            for word in &words[1..] {
                out.push_str(&capitalize(word));
            }
            out
        };
        let pascal: String = words.iter().map(|word| capitalize(word)).collect();
        for variant in [camel, pascal] {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }
    variants
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Usage-shape patterns compiled once per queried source file: import
/// destructure, default import, variable binding, class declaration, markup
/// tag, render/mount call, and test/describe title.
fn usage_patterns(variants: &[String]) -> Vec<Regex> {
    let mut patterns = Vec::new();
    for variant in variants {
        let escaped = regex::escape(variant);
        let shapes = [
            format!(r"(?i)import\s*\{{[^}}]*\b{escaped}\b"),
            format!(r"(?i)import\s+{escaped}\b"),
            format!(r"(?i)(?:const|let|var)\s+{escaped}\b"),
            format!(r"(?i)class\s+{escaped}\b"),
            format!(r"(?i)<{escaped}[\s/>]"),
            format!(r"(?i)(?:render|mount)\s*\(\s*{escaped}\b"),
            format!(r#"(?i)(?:test|describe)\s*\(\s*['"`][^'"`]*{escaped}"#),
        ];
        for shape in shapes {
            // Variants are regex-escaped, so these always compile.
            patterns.push(Regex::new(&shape).expect("escaped usage pattern"));
        }
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_cover_kebab_case() {
        assert_eq!(
            name_variants("date-picker"),
            vec!["date-picker", "datePicker", "DatePicker"]
        );
    }

    #[test]
    fn variants_cover_snake_case() {
        assert_eq!(
            name_variants("http_client"),
            vec!["http_client", "httpClient", "HttpClient"]
        );
    }

    #[test]
    fn plain_names_have_a_single_variant() {
        assert_eq!(name_variants("Button"), vec!["Button"]);
    }

    #[test]
    fn usage_patterns_match_expected_shapes() {
        let patterns = usage_patterns(&["DatePicker".to_string()]);
        let matches = |text: &str| patterns.iter().any(|p| p.is_match(text));

        assert!(matches("import { DatePicker } from 'somewhere';"));
        assert!(matches("import DatePicker from 'somewhere';"));
        assert!(matches("const datepicker = setup();"));
        assert!(matches("<DatePicker value={today} />"));
        assert!(matches("render(DatePicker, { props: {} });"));
        assert!(matches("describe('DatePicker behavior', () => {});"));
        assert!(!matches("unrelated text mentioning pickers"));
    }

    #[test]
    fn usage_patterns_require_a_shape_not_bare_containment() {
        let patterns = usage_patterns(&["loader".to_string()]);
        assert!(!patterns.iter().any(|p| p.is_match("preloaders are fast")));
    }
}
