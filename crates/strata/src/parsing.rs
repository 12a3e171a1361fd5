//! Statement-level import extraction.
//!
//! Parses one module's source with the ruff parser and walks the syntax
//! tree for `import` / `from … import` statements, wherever they appear
//! (module level, functions, classes, conditionals). Imports guarded by
//! `if TYPE_CHECKING:` (or `if <anything>.TYPE_CHECKING:`) are flagged
//! rather than dropped; the builder decides what to do with them.

use std::fs;
use std::path::Path;

use log::warn;
use ruff_python_ast::statement_visitor::{StatementVisitor, walk_body, walk_stmt};
use ruff_python_ast::{Expr, Stmt};
use ruff_python_parser::parse_module;
use ruff_source_file::{LineIndex, SourceCode};

use crate::errors::{StrataError, StrataResult};

/// One imported object, as written in the source.
///
/// The name is untouched apart from joining: relative imports keep their
/// leading dots (`..foo.bar`) and wildcard imports end in `.*`. Resolution
/// to a module happens later, in scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedObject {
    pub name: String,
    pub line_number: usize,
    pub line_contents: String,
    pub is_type_checking: bool,
}

/// Read and parse a source file, returning its imported objects.
///
/// Returns `Ok(None)` if the file is not valid UTF-8: the anomaly is logged
/// and the caller skips the file. Syntax errors are fatal
/// ([`StrataError::SourceSyntaxError`]) so the graph is never silently
/// incomplete.
pub fn parse_imports(path: &Path) -> StrataResult<Option<Vec<ImportedObject>>> {
    let mut bytes = fs::read(path)?;
    // Tolerate (and drop) a UTF-8 BOM.
    if bytes.starts_with(b"\xef\xbb\xbf") {
        bytes.drain(..3);
    }
    let Ok(code) = String::from_utf8(bytes) else {
        warn!("skipping file that is not valid UTF-8: {}", path.display());
        return Ok(None);
    };

    parse_imports_from_code(&code)
        .map(Some)
        .map_err(|error| match error {
            StrataError::SourceSyntaxError {
                line_number, text, ..
            } => StrataError::SourceSyntaxError {
                path: path.to_path_buf(),
                line_number,
                text,
            },
            other => other,
        })
}

pub fn parse_imports_from_code(code: &str) -> StrataResult<Vec<ImportedObject>> {
    let line_index = LineIndex::from_source_text(code);
    let source_code = SourceCode::new(code, &line_index);

    let parsed = match parse_module(code) {
        Ok(parsed) => parsed,
        Err(error) => {
            let location = source_code.line_index(error.location.start());
            return Err(StrataError::SourceSyntaxError {
                path: Path::new("<string>").to_path_buf(),
                line_number: location.get(),
                text: source_code.line_text(location).trim().to_owned(),
            });
        }
    };

    let mut visitor = ImportVisitor {
        source_code,
        imported_objects: vec![],
        in_type_checking: false,
    };
    walk_body(&mut visitor, &parsed.syntax().body);

    Ok(visitor.imported_objects)
}

struct ImportVisitor<'a> {
    source_code: SourceCode<'a, 'a>,
    imported_objects: Vec<ImportedObject>,
    in_type_checking: bool,
}

impl<'a> StatementVisitor<'a> for ImportVisitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(import_stmt) => {
                let line = self.source_code.line_index(import_stmt.range.start());
                for alias in &import_stmt.names {
                    self.imported_objects.push(ImportedObject {
                        name: alias.name.to_string(),
                        line_number: line.get(),
                        line_contents: self.source_code.line_text(line).trim().to_owned(),
                        is_type_checking: self.in_type_checking,
                    });
                }
                walk_stmt(self, stmt);
            }
            Stmt::ImportFrom(import_from) => {
                let line = self.source_code.line_index(import_from.range.start());
                let dots = ".".repeat(import_from.level as usize);
                for alias in &import_from.names {
                    let name = match &import_from.module {
                        Some(module) => format!("{dots}{module}.{}", alias.name),
                        None => format!("{dots}{}", alias.name),
                    };
                    self.imported_objects.push(ImportedObject {
                        name,
                        line_number: line.get(),
                        line_contents: self.source_code.line_text(line).trim().to_owned(),
                        is_type_checking: self.in_type_checking,
                    });
                }
                walk_stmt(self, stmt);
            }
            Stmt::If(if_stmt) if is_type_checking_condition(&if_stmt.test) => {
                let was_type_checking = self.in_type_checking;
                self.in_type_checking = true;
                walk_stmt(self, stmt);
                self.in_type_checking = was_type_checking;
            }
            _ => walk_stmt(self, stmt),
        }
    }
}

fn is_type_checking_condition(expr: &Expr) -> bool {
    match expr {
        Expr::Name(name) => name.id.as_str() == "TYPE_CHECKING",
        Expr::Attribute(attribute) => attribute.attr.as_str() == "TYPE_CHECKING",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_names(code: &str) -> Vec<String> {
        parse_imports_from_code(code)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect()
    }

    #[test]
    fn empty_source_has_no_imports() {
        assert!(parse_names("").is_empty());
    }

    #[test]
    fn plain_import_statements() {
        assert_eq!(parse_names("import foo"), vec!["foo"]);
        assert_eq!(parse_names("import foo.bar.baz"), vec!["foo.bar.baz"]);
        assert_eq!(parse_names("import foo, bar"), vec!["foo", "bar"]);
        assert_eq!(parse_names("import foo as FOO"), vec!["foo"]);
    }

    #[test]
    fn from_import_statements() {
        assert_eq!(parse_names("from foo import bar"), vec!["foo.bar"]);
        assert_eq!(parse_names("from foo.bar import baz"), vec!["foo.bar.baz"]);
        assert_eq!(
            parse_names("from foo import bar, baz"),
            vec!["foo.bar", "foo.baz"]
        );
        assert_eq!(parse_names("from foo import bar as BAR"), vec!["foo.bar"]);
    }

    #[test]
    fn relative_imports_keep_their_dots() {
        assert_eq!(parse_names("from . import foo"), vec![".foo"]);
        assert_eq!(parse_names("from .. import foo"), vec!["..foo"]);
        assert_eq!(parse_names("from .foo import bar"), vec![".foo.bar"]);
        assert_eq!(parse_names("from ..foo.bar import baz"), vec!["..foo.bar.baz"]);
    }

    #[test]
    fn wildcard_imports() {
        assert_eq!(parse_names("from foo import *"), vec!["foo.*"]);
        assert_eq!(parse_names("from . import *"), vec![".*"]);
    }

    #[test]
    fn multiline_from_import() {
        let code = "from foo import (\n    bar,\n    baz,\n)\n";
        assert_eq!(parse_names(code), vec!["foo.bar", "foo.baz"]);
    }

    #[test]
    fn nested_imports_are_found() {
        let code = "import a\ndef foo():\n    import b\nclass Foo:\n    import c\n";
        assert_eq!(parse_names(code), vec!["a", "b", "c"]);
    }

    #[test]
    fn commented_and_string_imports_are_ignored() {
        let code = "import foo\n# import bar\ns = '''\nimport baz\n'''\n";
        assert_eq!(parse_names(code), vec!["foo"]);
    }

    #[test]
    fn type_checking_guard_flags_imports() {
        let code = "import foo\nif TYPE_CHECKING:\n    import bar\nimport baz\n";
        let imports = parse_imports_from_code(code).unwrap();
        let flags: Vec<(&str, bool)> = imports
            .iter()
            .map(|i| (i.name.as_str(), i.is_type_checking))
            .collect();
        assert_eq!(
            flags,
            vec![("foo", false), ("bar", true), ("baz", false)]
        );
    }

    #[test]
    fn dotted_type_checking_guard_is_recognised() {
        let code = "if typing.TYPE_CHECKING:\n    import bar\n";
        let imports = parse_imports_from_code(code).unwrap();
        assert!(imports[0].is_type_checking);
    }

    #[test]
    fn other_conditions_are_not_type_checking() {
        let code = "if DEBUG:\n    import bar\n";
        let imports = parse_imports_from_code(code).unwrap();
        assert!(!imports[0].is_type_checking);
    }

    #[test]
    fn line_metadata_is_recorded() {
        let code = "\nimport a\nfrom b import c  # comment\n";
        let imports = parse_imports_from_code(code).unwrap();
        assert_eq!(imports[0].line_number, 2);
        assert_eq!(imports[0].line_contents, "import a");
        assert_eq!(imports[1].line_number, 3);
        assert_eq!(imports[1].line_contents, "from b import c  # comment");
    }

    #[test]
    fn syntax_errors_are_fatal() {
        let result = parse_imports_from_code("import )");
        assert!(matches!(
            result,
            Err(StrataError::SourceSyntaxError { line_number: 1, .. })
        ));
    }
}
