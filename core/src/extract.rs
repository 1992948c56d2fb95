//! Import specifier extraction.
//!
//! Lexical, regex-driven extraction of the raw module specifiers a source
//! file references. This is deliberately not a parser: malformed or
//! unterminated constructs simply fail to match and contribute nothing, and
//! commented-out imports are still extracted. Both are accepted tradeoffs of
//! scanning text instead of building a syntax tree.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// The five recognized specifier forms, matched independently and unioned.
/// Capture group 1 is the specifier across the whole table.
static SPECIFIER_FORMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Static import with a from clause: default, named, or namespace.
        r#"import\s+(?:(?:[\w$]+)|(?:\{[^}]+\})|(?:\*\s+as\s+[\w$]+))\s+from\s+['"]([^'"]+)['"]"#,
        // Bare side-effect import.
        r#"import\s+['"]([^'"]+)['"]"#,
        // Re-export from another module.
        r#"export\s+(?:(?:[\w$]+)|(?:\{[^}]+\})|(?:\*))\s+from\s+['"]([^'"]+)['"]"#,
        // Dynamic import call.
        r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        // Legacy synchronous require call.
        r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("static specifier pattern"))
    .collect()
});

/// Script regions embedded in template markup.
static SCRIPT_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<script[^>]*>(.*?)</script>").expect("static regex"));

/// The distinguished module-level script region (`<script context="module">`).
static MODULE_SCRIPT_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script\s+context="module"[^>]*>(.*?)</script>"#).expect("static regex")
});

/// Extract every raw import specifier from `text`.
///
/// Template files have their embedded script regions isolated and
/// concatenated first; markup is never scanned. A specifier reached through
/// several forms counts once.
pub fn extract_specifiers(text: &str, is_template: bool) -> BTreeSet<String> {
    let scannable;
    let text = if is_template {
        scannable = template_script_text(text);
        scannable.as_str()
    } else {
        text
    };

    let mut specifiers = BTreeSet::new();
    for pattern in SPECIFIER_FORMS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(specifier) = captures.get(1) {
                specifiers.insert(specifier.as_str().to_string());
            }
        }
    }
    specifiers
}

/// Concatenate the contents of every embedded script region, including the
/// module-level region. A template with no script region yields nothing to
/// scan.
fn template_script_text(text: &str) -> String {
    let mut script = String::new();
    for region in [&*SCRIPT_REGION, &*MODULE_SCRIPT_REGION] {
        for captures in region.captures_iter(text) {
            if let Some(body) = captures.get(1) {
                script.push_str(body.as_str());
                script.push('\n');
            }
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<String> {
        extract_specifiers(text, false).into_iter().collect()
    }

    #[test]
    fn extracts_default_named_and_namespace_imports() {
        let text = r#"
import App from './App.svelte';
import { render, fireEvent } from '@testing-library/svelte';
import * as helpers from '../helpers';
"#;
        assert_eq!(
            extract(text),
            vec!["../helpers", "./App.svelte", "@testing-library/svelte"]
        );
    }

    #[test]
    fn extracts_side_effect_imports() {
        assert_eq!(extract(r#"import './styles.css';"#), vec!["./styles.css"]);
    }

    #[test]
    fn extracts_reexports() {
        let text = r#"
export { formatDate } from './dates';
export * from './all';
export default from './entry';
"#;
        assert_eq!(extract(text), vec!["./all", "./dates", "./entry"]);
    }

    #[test]
    fn extracts_dynamic_imports_and_requires() {
        let text = r#"
const mod = await import('./lazy');
const legacy = require("./legacy");
"#;
        assert_eq!(extract(text), vec!["./lazy", "./legacy"]);
    }

    #[test]
    fn specifier_seen_through_multiple_forms_counts_once() {
        let text = r#"
import helpers from './helpers';
const again = require('./helpers');
"#;
        assert_eq!(extract(text), vec!["./helpers"]);
    }

    #[test]
    fn malformed_imports_contribute_nothing() {
        let text = r#"
import { unterminated from './broken
import from;
"#;
        assert!(extract(text).is_empty());
    }

    #[test]
    fn commented_out_imports_are_still_extracted() {
        let text = "// import old from './old';\n";
        assert_eq!(extract(text), vec!["./old"]);
    }

    #[test]
    fn template_markup_is_never_scanned() {
        let text = r#"
<p>import fake from './not-real'</p>
<script>
  import Button from '$lib/Button.svelte';
</script>
"#;
        let found = extract_specifiers(text, true);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["$lib/Button.svelte"]
        );
    }

    #[test]
    fn template_module_script_region_is_scanned() {
        let text = r#"
<script context="module">
  import { preload } from './preload';
</script>
<script>
  import Widget from './Widget.svelte';
</script>
"#;
        let found = extract_specifiers(text, true);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["./Widget.svelte", "./preload"]
        );
    }

    #[test]
    fn template_without_script_region_yields_nothing() {
        let found = extract_specifiers("<h1>static page</h1>", true);
        assert!(found.is_empty());
    }
}
