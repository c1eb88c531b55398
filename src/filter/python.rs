//! Python-family import filter: parses the submission to a syntax tree and
//! walks every `import X` / `from X.Y import ...` node, the same shape as
//! the teacher's `analyzer.rs` (which loads a small `ast.walk` helper
//! through an embedded CPython). Here the walk runs over a real Rust AST
//! (`rustpython_parser`) instead of an embedded interpreter, so no Python
//! process (embedded or spawned) needs to exist for this check to run.

use rustpython_parser::ast::{ExcepthandlerKind, Stmt, StmtKind};
use rustpython_parser::parser;
use std::collections::HashSet;

pub fn check(code: &str, allowed: &HashSet<String>) -> Option<String> {
    let suite = match parser::parse_program(code, "<submission>") {
        Ok(suite) => suite,
        Err(e) => return Some(format!("Code syntax error: {e}")),
    };

    let mut rejection = None;
    walk_stmts(&suite, &mut |stmt| {
        if rejection.is_some() {
            return;
        }
        match &stmt.node {
            StmtKind::Import { names } => {
                for alias in names {
                    let top_level = top_level_package(&alias.node.name);
                    if !allowed.contains(top_level) {
                        rejection = Some(format!("Unsupported package: {top_level}"));
                        return;
                    }
                }
            }
            StmtKind::ImportFrom { module, .. } => {
                // `from . import x` (relative, module is None) has no
                // top-level package to check, always allowed. A relative
                // import that still names a module (`from .os import x`)
                // is checked the same as an absolute one; `level` does not
                // exempt it.
                let Some(module) = module else {
                    return;
                };
                let top_level = top_level_package(module);
                if !allowed.contains(top_level) {
                    rejection = Some(format!("Unsupported package: {top_level}"));
                }
            }
            _ => {}
        }
    });

    rejection
}

fn top_level_package(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Recursively visits every statement reachable from `stmts`, mirroring
/// `ast.walk`'s traversal of the whole tree rather than just top-level
/// statements; an `import` nested inside a function body or an `if` block
/// must be caught too. Traversal halts at the caller's first rejection
/// (the callback is a no-op once `rejection` is set).
fn walk_stmts(stmts: &[Stmt], visit: &mut impl FnMut(&Stmt)) {
    for stmt in stmts {
        visit(stmt);
        match &stmt.node {
            StmtKind::FunctionDef { body, .. } | StmtKind::AsyncFunctionDef { body, .. } => {
                walk_stmts(body, visit);
            }
            StmtKind::ClassDef { body, .. } => walk_stmts(body, visit),
            StmtKind::For { body, orelse, .. } | StmtKind::AsyncFor { body, orelse, .. } => {
                walk_stmts(body, visit);
                walk_stmts(orelse, visit);
            }
            StmtKind::While { body, orelse, .. } => {
                walk_stmts(body, visit);
                walk_stmts(orelse, visit);
            }
            StmtKind::If { body, orelse, .. } => {
                walk_stmts(body, visit);
                walk_stmts(orelse, visit);
            }
            StmtKind::With { body, .. } | StmtKind::AsyncWith { body, .. } => {
                walk_stmts(body, visit);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                walk_stmts(body, visit);
                for handler in handlers {
                    let ExcepthandlerKind::ExceptHandler { body, .. } = &handler.node;
                    walk_stmts(body, visit);
                }
                walk_stmts(orelse, visit);
                walk_stmts(finalbody, visit);
            }
            StmtKind::Match { cases, .. } => {
                for case in cases {
                    walk_stmts(&case.body, visit);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn allows_whitelisted_import() {
        assert_eq!(check("import json", &allowed(&["json"])), None);
    }

    #[test]
    fn rejects_non_whitelisted_import() {
        assert_eq!(
            check("import os\nprint(os.name)", &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn checks_top_level_package_for_submodule_import() {
        assert_eq!(
            check("import os.path", &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn checks_top_level_package_for_from_import() {
        assert_eq!(
            check("from os.path import join", &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn relative_import_without_module_is_allowed() {
        assert_eq!(check("from . import helper", &allowed(&[])), None);
    }

    #[test]
    fn relative_import_with_module_is_still_checked() {
        assert_eq!(
            check("from .os import system", &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn syntax_error_is_reported() {
        let result = check("def f(:\n", &allowed(&[]));
        assert!(result.unwrap().starts_with("Code syntax error:"));
    }

    #[test]
    fn nested_import_inside_function_is_caught() {
        let code = "def f():\n    import os\n    return os.name\n";
        assert_eq!(
            check(code, &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn import_inside_match_case_is_caught() {
        let code = "match 1:\n    case _:\n        import os\n        print(os.name)\n";
        assert_eq!(
            check(code, &allowed(&["json"])),
            Some("Unsupported package: os".to_string())
        );
    }

    #[test]
    fn duplicate_rejections_report_first_hit_only() {
        let code = "import os\nimport socket\n";
        assert_eq!(
            check(code, &allowed(&[])),
            Some("Unsupported package: os".to_string())
        );
    }
}
