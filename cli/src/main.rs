//! relatest CLI entry point.
//!
//! Thin driver around the core engine: reads the newline-delimited list of
//! candidate source paths, resolves related test files, writes the fixed
//! result artifacts, and prints a one-line summary. All resolution logic
//! lives in `relatest-core`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use console::style;
use relatest_core::{Config, ResolutionReport, Resolver};
use serde_json::Value;

/// Flat newline-delimited superset of every matched test file.
const ALL_TEST_FILES: &str = "all_test_files.txt";
/// Mapping of sources that matched at least one test file.
const TEST_FILES_MAPPING: &str = "test_files_mapping.json";
/// Mapping of every input source, in input order, empty arrays included.
const RELATED_TESTS: &str = "related_tests.json";

#[derive(Debug, Parser)]
#[command(
    name = "relatest",
    about = "Find the test files related to a list of source files."
)]
struct Args {
    /// Newline-delimited file listing candidate source paths
    /// (workspace-relative or absolute).
    #[arg(value_name = "FILE_LIST")]
    file_list: PathBuf,

    /// Workspace root the source paths resolve against.
    #[arg(value_name = "WORKSPACE_ROOT")]
    workspace_root: PathBuf,

    /// Path to config file (YAML). Defaults to relatest.yml if present.
    #[arg(long, default_value = "relatest.yml")]
    config: PathBuf,

    /// Emit the full report as JSON to stdout instead of the summary.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Suppress per-file warnings.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let list = fs::read_to_string(&args.file_list)
        .with_context(|| format!("Failed to read file list {}", args.file_list.display()))?;
    let sources = parse_source_list(&list);

    let resolver = Resolver::new(&args.workspace_root, config)?;
    let report = resolver.resolve_all(&sources);

    if !args.quiet {
        for warning in &report.warnings {
            eprintln!("{} {warning}", style("warning:").yellow().bold());
        }
    }

    let out_dir = env::current_dir()?;
    write_artifacts(&report, &out_dir)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Found {} test files related to {} source files.",
            report.superset.len(),
            report.files.len()
        );
        println!("Wrote results to:");
        println!("  - {ALL_TEST_FILES}");
        println!("  - {TEST_FILES_MAPPING}");
        println!("  - {RELATED_TESTS}");
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid config structure in {}", path.display()))?;
    Ok(config)
}

fn parse_source_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Persist the three fixed result artifacts, overwriting previous runs.
/// A write failure here is fatal to the run.
fn write_artifacts(report: &ResolutionReport, out_dir: &Path) -> anyhow::Result<()> {
    let mut flat = String::new();
    for test in &report.superset {
        flat.push_str(test);
        flat.push('\n');
    }
    let flat_path = out_dir.join(ALL_TEST_FILES);
    fs::write(&flat_path, flat)
        .with_context(|| format!("Failed to write {}", flat_path.display()))?;

    let mut discovered = serde_json::Map::new();
    for entry in &report.files {
        if !entry.tests.is_empty() {
            discovered.insert(entry.source.clone(), serde_json::json!(entry.tests));
        }
    }
    let mapping_path = out_dir.join(TEST_FILES_MAPPING);
    fs::write(
        &mapping_path,
        serde_json::to_string_pretty(&Value::Object(discovered))?,
    )
    .with_context(|| format!("Failed to write {}", mapping_path.display()))?;

    let mut related = serde_json::Map::new();
    for entry in &report.files {
        related.insert(entry.source.clone(), serde_json::json!(entry.tests));
    }
    let related_path = out_dir.join(RELATED_TESTS);
    fs::write(
        &related_path,
        serde_json::to_string_pretty(&Value::Object(related))?,
    )
    .with_context(|| format!("Failed to write {}", related_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relatest_core::{FileResolution, MatchStrategy};

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new(prefix: &str) -> Self {
            let mut dir = std::env::temp_dir();
            let unique = format!(
                "{prefix}-{}-{}",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );
            dir.push(unique);
            fs::create_dir_all(&dir).expect("create temp dir");
            Self { path: dir }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn sample_report() -> ResolutionReport {
        ResolutionReport {
            files: vec![
                FileResolution {
                    source: "src/b.js".into(),
                    tests: vec!["tests/b.test.js".into()],
                    strategy: MatchStrategy::Convention,
                },
                FileResolution {
                    source: "src/a.js".into(),
                    tests: Vec::new(),
                    strategy: MatchStrategy::Reference,
                },
            ],
            superset: vec!["tests/b.test.js".into()],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn args_require_both_positionals() {
        assert!(Args::try_parse_from(["relatest"]).is_err());
        assert!(Args::try_parse_from(["relatest", "list.txt"]).is_err());
        assert!(Args::try_parse_from(["relatest", "list.txt", "."]).is_ok());
    }

    #[test]
    fn parse_source_list_skips_blank_lines() {
        let sources = parse_source_list("src/a.js\n\n  src/b.py  \n\n");
        assert_eq!(sources, vec!["src/a.js", "src/b.py"]);
    }

    #[test]
    fn artifacts_include_every_input_in_related_tests() {
        let tmp = TempDir::new("relatest-cli-artifacts");
        write_artifacts(&sample_report(), &tmp.path).unwrap();

        let flat = fs::read_to_string(tmp.path.join(ALL_TEST_FILES)).unwrap();
        assert_eq!(flat, "tests/b.test.js\n");

        let related: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path.join(RELATED_TESTS)).unwrap())
                .unwrap();
        let object = related.as_object().unwrap();
        assert_eq!(object.len(), 2);
        // Input order is preserved; the empty entry is not dropped.
        let keys: Vec<&String> = object.keys().collect();
        assert_eq!(keys, ["src/b.js", "src/a.js"]);
        assert_eq!(object["src/a.js"], serde_json::json!([]));

        let mapping: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path.join(TEST_FILES_MAPPING)).unwrap())
                .unwrap();
        assert_eq!(mapping.as_object().unwrap().len(), 1);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = load_config(Path::new("does-not-exist.yml")).unwrap();
        assert_eq!(config.corpus_roots, vec!["tests"]);
    }
}
