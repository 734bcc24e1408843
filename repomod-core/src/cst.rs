//! The concrete-syntax-tree façade: the only module in this crate that
//! touches `tree_sitter`/`tree_sitter_python` directly. Every other module
//! reaches source text only through the typed edit primitives here.
//!
//! A parsed file is represented as the pair (source text, `tree_sitter::Tree`).
//! Because the concrete tree already accounts for every byte of the input —
//! trivia is anonymous tokens between named nodes, never dropped — every
//! edit primitive works by computing a list of non-overlapping
//! `(byte_range, replacement)` splices against that tree and applying them
//! back-to-front against the original text. That sidesteps the separate
//! trivia side-table an AST-only façade would need.

use std::collections::HashSet;
use std::ops::Range;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("source does not parse as valid Python")]
    Failed,
}

/// An immutable, parsed source file plus its original text.
#[derive(Clone)]
pub struct Cst {
    text: String,
    tree: Tree,
}

fn make_parser() -> Parser {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .expect("tree-sitter-python grammar must load");
    parser
}

impl Cst {
    /// Parses `text`. A tree containing any ERROR node is treated as a
    /// parse failure per §4.1 — callers decide whether that's fatal
    /// (the file being directly refactored) or a skip-and-warn (any other
    /// file during a whole-project scan).
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parser = make_parser();
        let tree = parser.parse(text, None).ok_or(ParseError::Failed)?;
        if tree.root_node().has_error() {
            return Err(ParseError::Failed);
        }
        Ok(Self {
            text: text.to_string(),
            tree,
        })
    }

    /// Lossless reprint. Always equal to the text this tree was built
    /// from, by construction: every primitive below reparses its output
    /// rather than mutating this tree in place.
    pub fn print(&self) -> &str {
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    fn reparse(new_text: String) -> Result<Self, ParseError> {
        Self::parse(&new_text)
    }

    fn apply_splices(&self, mut splices: Vec<(Range<usize>, String)>) -> String {
        splices.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut text = self.text.clone();
        for (range, replacement) in splices {
            text.replace_range(range, &replacement);
        }
        text
    }

    /// Renames every `identifier` occurrence whose text equals `old` to
    /// `new_name`, except: module-path positions inside any import
    /// statement, alias/asname binding identifiers, and the `attribute`
    /// field of an attribute expression. Keyword-argument labels ARE
    /// renamed (documented caveat, §4.1).
    pub fn rename_name(&self, old: &str, new_name: &str) -> (Self, usize) {
        let source = self.text.as_bytes();
        let mut splices = Vec::new();
        collect_rename_splices(self.root(), source, Ctx::Normal, old, new_name, &mut splices);
        let n = splices.len();
        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, n)
    }

    /// Updates `from`-imports whose module equals `old_module` to
    /// `new_module`, imported names equal to `old_name` to `new_name`, and
    /// bare `import` targets equal to `old_module` to `new_module`.
    /// Star-imports are preserved verbatim.
    pub fn rename_import(
        &self,
        old_module: Option<&str>,
        new_module: Option<&str>,
        old_name: Option<&str>,
        new_name: Option<&str>,
    ) -> (Self, usize) {
        let source = self.text.as_bytes();
        let mut splices = Vec::new();
        let mut n = 0;
        collect_import_splices(
            self.root(),
            source,
            old_module,
            new_module,
            old_name,
            new_name,
            &mut splices,
            &mut n,
        );
        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, n)
    }

    /// Rewrites every `object_name.old_attr` to `object_name.new_attr`.
    pub fn rename_attribute(&self, object_name: &str, old_attr: &str, new_attr: &str) -> (Self, usize) {
        let source = self.text.as_bytes();
        let mut splices = Vec::new();
        collect_attribute_splices(self.root(), source, object_name, old_attr, new_attr, &mut splices);
        let n = splices.len();
        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, n)
    }

    /// Returns the verbatim source of the top-level `class`/`function`/
    /// assignment binding `name`, including a wrapping `decorated_definition`.
    pub fn extract_definition(&self, name: &str) -> Option<String> {
        let node = find_top_level_definition(self.root(), self.text.as_bytes(), name)?;
        Some(self.text[node.byte_range()].to_string())
    }

    /// Removes the top-level definition (and its trailing newline) binding
    /// `name`.
    pub fn remove_definition(&self, name: &str) -> (Self, bool) {
        let Some(node) = find_top_level_definition(self.root(), self.text.as_bytes(), name) else {
            return (
                Self {
                    text: self.text.clone(),
                    tree: reparse_or_panic(self),
                },
                false,
            );
        };

        let mut end = node.end_byte();
        if self.text.as_bytes().get(end) == Some(&b'\n') {
            end += 1;
        }
        let splices = vec![(node.start_byte()..end, String::new())];
        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, true)
    }

    /// Appends `source_slice` at module end, preceded by one blank line.
    /// Textual append regardless of whether the slice parses standalone —
    /// the whole-file text is always reparsed afterward, and a slice that
    /// fails to parse on its own still lands in valid module-level position.
    pub fn add_definition(&self, source_slice: &str) -> Self {
        let mut new_text = self.text.clone();
        if !new_text.ends_with('\n') {
            new_text.push('\n');
        }
        if !new_text.ends_with("\n\n") {
            new_text.push('\n');
        }
        new_text.push_str(source_slice.trim_end_matches('\n'));
        new_text.push('\n');
        Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        })
    }

    /// Adds `from <module_spec> import <name> [as <alias>]` after the last
    /// top-level import statement, else at the top of the file.
    ///
    /// `module_spec` may begin with one or more dots to indicate a
    /// relative-import depth; see "Relative-module spec parsing" (§4.1).
    pub fn add_from_import(&self, module_spec: &str, name: &str, alias: Option<&str>) -> Self {
        let dots: String = module_spec.chars().take_while(|&c| c == '.').collect();
        let rest = &module_spec[dots.len()..];
        let module_part = format!("{dots}{rest}");
        let alias_part = alias.map(|a| format!(" as {a}")).unwrap_or_default();
        let stmt = format!("from {module_part} import {name}{alias_part}\n");
        self.insert_import_statement(&stmt)
    }

    /// Adds `import <dotted_module> [as <alias>]` after the last top-level
    /// import statement, else at the top of the file.
    pub fn add_plain_import(&self, dotted_module: &str, alias: Option<&str>) -> Self {
        let alias_part = alias.map(|a| format!(" as {a}")).unwrap_or_default();
        let stmt = format!("import {dotted_module}{alias_part}\n");
        self.insert_import_statement(&stmt)
    }

    fn insert_import_statement(&self, stmt: &str) -> Self {
        let insert_at = last_top_level_import_end(self.root()).unwrap_or(0);
        let mut new_text = self.text.clone();
        new_text.insert_str(insert_at, stmt);
        Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        })
    }

    /// Removes any imported name whose local binding never appears as an
    /// `identifier` outside of import statements in this file. Preserves
    /// star-imports. Drops the whole statement when no names remain.
    ///
    /// When an import statement keeps only some of its entries, this
    /// rebuilds the statement's name list from the kept entries' verbatim
    /// text rather than preserving the original statement's exact
    /// formatting (e.g. parenthesized multi-line lists collapse to one
    /// line) — a deliberate simplification, recorded in DESIGN.md.
    pub fn remove_unused_imports(&self) -> (Self, Vec<String>) {
        let used = collect_identifier_usages_outside_imports(self.root(), self.text.as_bytes());
        let mut removed = Vec::new();
        let mut splices = Vec::new();

        for stmt in top_level_import_statements(self.root()) {
            let entries = import_entries(stmt, self.text.as_bytes());
            if entries.iter().any(|e| e.is_star) {
                continue;
            }
            let kept: Vec<&ImportEntry> = entries
                .iter()
                .filter(|e| used.contains(&e.local_binding))
                .collect();

            if kept.len() == entries.len() {
                continue;
            }

            for entry in &entries {
                if !used.contains(&entry.local_binding) {
                    removed.push(entry.local_binding.clone());
                }
            }

            let mut end = stmt.end_byte();
            if self.text.as_bytes().get(end) == Some(&b'\n') {
                end += 1;
            }

            if kept.is_empty() {
                splices.push((stmt.start_byte()..end, String::new()));
            } else {
                let rebuilt = rebuild_import_statement(stmt, self.text.as_bytes(), &kept);
                splices.push((stmt.start_byte()..end, format!("{rebuilt}\n")));
            }
        }

        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, removed)
    }

    /// For each `(module_spec, name, alias, is_from_form)` whose local
    /// binding isn't already bound in the file, adds the corresponding
    /// import.
    pub fn ensure_imports(&self, needed: &[(String, String, Option<String>, bool)]) -> Self {
        let mut bound = existing_local_bindings(self.root(), self.text.as_bytes());
        let mut current = Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        };

        for (module_spec, name, alias, is_from_form) in needed {
            let local_binding = alias.clone().unwrap_or_else(|| {
                if *is_from_form {
                    name.clone()
                } else {
                    module_spec
                        .trim_start_matches('.')
                        .split('.')
                        .next()
                        .unwrap_or(module_spec)
                        .to_string()
                }
            });

            if bound.contains(&local_binding) {
                continue;
            }

            current = if *is_from_form {
                current.add_from_import(module_spec, name, alias.as_deref())
            } else {
                current.add_plain_import(module_spec, alias.as_deref())
            };
            bound.insert(local_binding);
        }

        current
    }

    /// Whether `name` occurs as an identifier anywhere outside an import
    /// statement - used to decide if a definition's former home still
    /// needs to import it back after the definition itself moved away.
    pub fn references_identifier(&self, name: &str) -> bool {
        collect_identifier_usages_outside_imports(self.root(), self.text.as_bytes()).contains(name)
    }

    /// Re-targets a bare-relative submodule entry - `from . import b` or
    /// `from ..pkg import b` - whose local name equals `old_entry_name`
    /// into its own `from <new_module_spec> import <new_entry_name>`
    /// statement. A plain module-string rename can't reach this form
    /// because the submodule name lives in the import list, not the
    /// module field; moving a file across packages needs this instead
    /// (§4.5.4). Any other entries on the same statement are kept as-is.
    pub fn retarget_submodule_import(
        &self,
        old_entry_name: &str,
        new_module_spec: &str,
        new_entry_name: &str,
    ) -> (Self, usize) {
        let source = self.text.as_bytes();
        let mut splices: Vec<(Range<usize>, String)> = Vec::new();
        let mut count = 0usize;

        for stmt in top_level_import_statements(self.root()) {
            if stmt.kind() != "import_from_statement" {
                continue;
            }
            let Some(module_name) = stmt.child_by_field_name("module_name") else {
                continue;
            };
            let (depth, dotted) = module_name_text(module_name, source);
            if depth == 0 || !dotted.is_empty() {
                continue;
            }

            let entries = import_entries(stmt, source);
            if entries.iter().any(|e| e.is_star) {
                continue;
            }
            let matched = entries.iter().filter(|e| e.local_binding == old_entry_name).count();
            if matched == 0 {
                continue;
            }
            let kept: Vec<&ImportEntry> = entries.iter().filter(|e| e.local_binding != old_entry_name).collect();

            let new_stmt_text = format!("from {new_module_spec} import {new_entry_name}\n");
            let mut end = stmt.end_byte();
            if source.get(end) == Some(&b'\n') {
                end += 1;
            }

            let replacement = if kept.is_empty() {
                new_stmt_text
            } else {
                let rebuilt = rebuild_import_statement(stmt, source, &kept);
                format!("{rebuilt}\n{new_stmt_text}")
            };

            splices.push((stmt.start_byte()..end, replacement));
            count += matched;
        }

        let new_text = self.apply_splices(splices);
        let parsed = Self::reparse(new_text).unwrap_or_else(|_| Self {
            text: self.text.clone(),
            tree: reparse_or_panic(self),
        });
        (parsed, count)
    }
}

fn reparse_or_panic(cst: &Cst) -> Tree {
    // Reparsing our own previously-valid text cannot fail; this only
    // exists so edit primitives have a total fallback if it somehow does.
    let mut parser = make_parser();
    parser
        .parse(&cst.text, None)
        .expect("re-parsing known-valid text must succeed")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Normal,
    Excluded,
}

fn collect_rename_splices(
    node: Node,
    source: &[u8],
    ctx: Ctx,
    old: &str,
    new_name: &str,
    out: &mut Vec<(Range<usize>, String)>,
) {
    if ctx == Ctx::Normal && node.kind() == "identifier" {
        if let Ok(text) = node.utf8_text(source) {
            if text == old {
                out.push((node.byte_range(), new_name.to_string()));
            }
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            let field = node.field_name_for_child(i as u32);
            let child_ctx = match (node.kind(), field) {
                ("import_statement", Some("name")) => Ctx::Excluded,
                ("import_from_statement", Some("module_name")) => Ctx::Excluded,
                ("aliased_import", Some("alias")) => Ctx::Excluded,
                ("attribute", Some("attribute")) => Ctx::Excluded,
                _ => ctx,
            };
            collect_rename_splices(child, source, child_ctx, old, new_name, out);
        }
    }
}

fn collect_attribute_splices(
    node: Node,
    source: &[u8],
    object_name: &str,
    old_attr: &str,
    new_attr: &str,
    out: &mut Vec<(Range<usize>, String)>,
) {
    if node.kind() == "attribute" {
        if let (Some(object), Some(attr)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("attribute"),
        ) {
            if object.kind() == "identifier" {
                if let (Ok(object_text), Ok(attr_text)) =
                    (object.utf8_text(source), attr.utf8_text(source))
                {
                    if object_text == object_name && attr_text == old_attr {
                        out.push((attr.byte_range(), new_attr.to_string()));
                    }
                }
            }
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_attribute_splices(child, source, object_name, old_attr, new_attr, out);
        }
    }
}

fn module_name_text(module_name: Node, source: &[u8]) -> (usize, String) {
    match module_name.kind() {
        "relative_import" => {
            let mut depth = 0usize;
            let mut dotted = String::new();
            for i in 0..module_name.child_count() {
                if let Some(child) = module_name.child(i) {
                    if child.kind() == "import_prefix" {
                        depth += child
                            .utf8_text(source)
                            .unwrap_or("")
                            .chars()
                            .filter(|&c| c == '.')
                            .count();
                    } else if child.kind() == "dotted_name" {
                        dotted = child.utf8_text(source).unwrap_or("").to_string();
                    }
                }
            }
            (depth, dotted)
        },
        "dotted_name" | "identifier" => (0, module_name.utf8_text(source).unwrap_or("").to_string()),
        _ => (0, String::new()),
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_import_splices(
    node: Node,
    source: &[u8],
    old_module: Option<&str>,
    new_module: Option<&str>,
    old_name: Option<&str>,
    new_name: Option<&str>,
    out: &mut Vec<(Range<usize>, String)>,
    count: &mut usize,
) {
    match node.kind() {
        "import_from_statement" => {
            if let Some(module_name) = node.child_by_field_name("module_name") {
                let (depth, dotted) = module_name_text(module_name, source);
                let full = format!("{}{}", ".".repeat(depth), dotted);

                if let (Some(old_mod), Some(new_mod)) = (old_module, new_module) {
                    if full == old_mod {
                        out.push((module_name.byte_range(), new_mod.to_string()));
                        *count += 1;
                    }
                    // A bare relative import (`from . import X`) has no
                    // dotted module text here at all - its module-like
                    // reference lives in the name list as an entry equal
                    // to the bare stem, handled below. See rename_file's
                    // second rule (§4.5.3).
                }

                for child in import_list_children(node) {
                    rename_import_name_entry(child, source, old_module, new_module, old_name, new_name, dotted.is_empty() && module_name.kind() == "relative_import", out, count);
                }
            }
        },
        "import_statement" => {
            let mut cursor = node.walk();
            for name_child in node.children_by_field_name("name", &mut cursor) {
                let target = match name_child.kind() {
                    "aliased_import" => name_child.child_by_field_name("name"),
                    "dotted_name" | "identifier" => Some(name_child),
                    _ => None,
                };
                if let Some(target) = target {
                    if let (Some(old_mod), Some(new_mod), Ok(text)) =
                        (old_module, new_module, target.utf8_text(source))
                    {
                        if text == old_mod {
                            out.push((target.byte_range(), new_mod.to_string()));
                            *count += 1;
                        }
                    }
                }
            }
        },
        _ => {},
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_import_splices(child, source, old_module, new_module, old_name, new_name, out, count);
        }
    }
}

fn import_list_children(import_from: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = import_from.walk();
    for child in import_from.children_by_field_name("name", &mut cursor) {
        out.push(child);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn rename_import_name_entry(
    entry: Node,
    source: &[u8],
    old_module: Option<&str>,
    new_module: Option<&str>,
    old_name: Option<&str>,
    new_name: Option<&str>,
    bare_relative: bool,
    out: &mut Vec<(Range<usize>, String)>,
    count: &mut usize,
) {
    let (name_node, is_star) = match entry.kind() {
        "aliased_import" => (entry.child_by_field_name("name"), false),
        "wildcard_import" => (None, true),
        "identifier" | "dotted_name" => (Some(entry), false),
        _ => (None, false),
    };

    if is_star {
        return;
    }

    let Some(name_node) = name_node else { return };
    let Ok(text) = name_node.utf8_text(source) else {
        return;
    };

    if bare_relative {
        if let (Some(old_mod), Some(new_mod)) = (old_module, new_module) {
            if text == old_mod {
                out.push((name_node.byte_range(), new_mod.to_string()));
                *count += 1;
                return;
            }
        }
    }

    if let (Some(old), Some(new)) = (old_name, new_name) {
        if text == old {
            out.push((name_node.byte_range(), new.to_string()));
            *count += 1;
        }
    }
}

fn find_top_level_definition<'a>(root: Node<'a>, source: &[u8], name: &str) -> Option<Node<'a>> {
    for i in 0..root.child_count() {
        let child = root.child(i)?;
        let candidate = if child.kind() == "decorated_definition" {
            child.child_by_field_name("definition")
        } else {
            Some(child)
        };

        let Some(candidate) = candidate else { continue };

        let matches = match candidate.kind() {
            "function_definition" | "class_definition" => candidate
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source).ok())
                == Some(name),
            "expression_statement" => candidate
                .child(0)
                .is_some_and(|inner| assignment_target_matches(inner, source, name)),
            _ => false,
        };

        if matches {
            return Some(child);
        }
    }
    None
}

fn assignment_target_matches(node: Node, source: &[u8], name: &str) -> bool {
    if node.kind() != "assignment" {
        return false;
    }
    node.child_by_field_name("left")
        .filter(|left| left.kind() == "identifier")
        .and_then(|left| left.utf8_text(source).ok())
        == Some(name)
}

fn top_level_import_statements(root: Node) -> Vec<Node> {
    let mut out = Vec::new();
    for i in 0..root.child_count() {
        if let Some(child) = root.child(i) {
            if matches!(child.kind(), "import_statement" | "import_from_statement") {
                out.push(child);
            }
        }
    }
    out
}

fn last_top_level_import_end(root: Node) -> Option<usize> {
    top_level_import_statements(root)
        .last()
        .map(|n| n.end_byte() + 1)
}

struct ImportEntry<'a> {
    node: Node<'a>,
    local_binding: String,
    is_star: bool,
}

fn import_entries<'a>(stmt: Node<'a>, source: &[u8]) -> Vec<ImportEntry<'a>> {
    let mut out = Vec::new();
    match stmt.kind() {
        "import_from_statement" => {
            for entry in import_list_children(stmt) {
                match entry.kind() {
                    "wildcard_import" => out.push(ImportEntry {
                        node: entry,
                        local_binding: "*".to_string(),
                        is_star: true,
                    }),
                    "aliased_import" => {
                        let alias = entry
                            .child_by_field_name("alias")
                            .and_then(|n| n.utf8_text(source).ok())
                            .unwrap_or("");
                        out.push(ImportEntry {
                            node: entry,
                            local_binding: alias.to_string(),
                            is_star: false,
                        });
                    },
                    "identifier" | "dotted_name" => {
                        let text = entry.utf8_text(source).unwrap_or("");
                        out.push(ImportEntry {
                            node: entry,
                            local_binding: text.to_string(),
                            is_star: false,
                        });
                    },
                    _ => {},
                }
            }
        },
        "import_statement" => {
            let mut cursor = stmt.walk();
            for name_child in stmt.children_by_field_name("name", &mut cursor) {
                match name_child.kind() {
                    "aliased_import" => {
                        let alias = name_child
                            .child_by_field_name("alias")
                            .and_then(|n| n.utf8_text(source).ok())
                            .unwrap_or("");
                        out.push(ImportEntry {
                            node: name_child,
                            local_binding: alias.to_string(),
                            is_star: false,
                        });
                    },
                    "dotted_name" | "identifier" => {
                        let text = name_child.utf8_text(source).unwrap_or("");
                        let first = text.split('.').next().unwrap_or(text);
                        out.push(ImportEntry {
                            node: name_child,
                            local_binding: first.to_string(),
                            is_star: false,
                        });
                    },
                    _ => {},
                }
            }
        },
        _ => {},
    }
    out
}

fn rebuild_import_statement(stmt: Node, source: &[u8], kept: &[&ImportEntry]) -> String {
    let texts: Vec<&str> = kept
        .iter()
        .map(|e| e.node.utf8_text(source).unwrap_or(""))
        .collect();
    let joined = texts.join(", ");

    match stmt.kind() {
        "import_from_statement" => {
            let module_name = stmt
                .child_by_field_name("module_name")
                .map(|n| n.utf8_text(source).unwrap_or(""))
                .unwrap_or("");
            format!("from {module_name} import {joined}")
        },
        "import_statement" => format!("import {joined}"),
        _ => String::new(),
    }
}

fn collect_identifier_usages_outside_imports(node: Node, source: &[u8]) -> HashSet<String> {
    fn walk(node: Node, source: &[u8], in_import: bool, out: &mut HashSet<String>) {
        if !in_import && node.kind() == "identifier" {
            if let Ok(text) = node.utf8_text(source) {
                out.insert(text.to_string());
            }
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                let child_in_import =
                    in_import || matches!(child.kind(), "import_statement" | "import_from_statement");
                walk(child, source, child_in_import, out);
            }
        }
    }
    let mut out = HashSet::new();
    walk(node, source, false, &mut out);
    out
}

fn existing_local_bindings(root: Node, source: &[u8]) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in top_level_import_statements(root) {
        for entry in import_entries(stmt, source) {
            if !entry.is_star {
                out.insert(entry.local_binding);
            }
        }
    }
    out
}
