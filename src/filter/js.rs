//! JS-family import filter: a textual scan, not a parse. Deliberately
//! cheaper than the Python path. Dynamic `eval`/`new Function` or string
//! obfuscation can bypass it, and that's accepted: this is a pre-filter for
//! honest mistakes, not a semantic guarantee (process rlimits are the real
//! containment).

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"from\s*['"]([^'"]+)['"]"#).unwrap());
static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

pub fn check(code: &str, allowed: &HashSet<String>) -> Option<String> {
    for pattern in [&*REQUIRE, &*FROM_IMPORT, &*DYNAMIC_IMPORT] {
        for capture in pattern.captures_iter(code) {
            let specifier = capture.get(1).map(|m| m.as_str()).unwrap_or("");
            let top_level = top_level_package(specifier);
            if !allowed.contains(top_level) {
                return Some(format!("Unsupported package: {top_level}"));
            }
        }
    }
    None
}

/// Normalizes scoped (`@scope/pkg`) and sub-path (`pkg/sub`) specifiers to
/// their top-level package name, per the component before the first `/`.
fn top_level_package(specifier: &str) -> &str {
    specifier.split('/').next().unwrap_or(specifier)
}
