//! Project-wide symbol table: walks every source file once per operation
//! and indexes top-level definitions, references, and import statements.
//!
//! Built fresh for each refactor operation (§9, "symbol table rebuild
//! cost") and discarded once the operation completes — there is no
//! process-wide mutable state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::cst::Cst;
use crate::location::{Location, Position};
use crate::project_walker::{module_of, walk_source_files};

/// One of the four kinds of top-level binding the table tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Function,
    Variable,
    Import,
}

/// A top-level (or nested, for bookkeeping) binding.
///
/// Only entries with an empty `scope_stack` (i.e. `qualified_name ==
/// format!("{module}.{name}")`) participate in cross-file operations;
/// nested defs are recorded so `qualified_name` is always meaningful but
/// are never returned as rename/move targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub qualified_name: String,
    pub location: Location,
    pub kind: SymbolKind,
    pub is_top_level: bool,
}

/// A name-use occurrence outside of any import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub location: Location,
}

/// One imported name within an import statement, with its optional
/// alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

/// One `import`/`from ... import ...` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Dotted module string, without leading dots.
    pub module: String,
    /// Count of leading dots; 0 for an absolute import.
    pub relative_depth: usize,
    pub names: Vec<ImportedName>,
    pub is_star: bool,
    pub location: Location,
    pub is_from_form: bool,
}

impl ImportRecord {
    /// The dotted module string as it would appear as a target to
    /// `rename_import`'s `old_module`/`new_module`, including leading
    /// dots.
    pub fn full_module(&self) -> String {
        format!("{}{}", ".".repeat(self.relative_depth), self.module)
    }

    /// Whether this record brings `name` into scope, directly or via a
    /// star-import.
    pub fn imports(&self, name: &str) -> bool {
        self.is_star || self.names.iter().any(|n| n.name == name)
    }
}

/// Everything recorded for a single file.
#[derive(Debug, Clone)]
pub struct FileSymbols {
    pub file_path: PathBuf,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub imports: Vec<ImportRecord>,
}

impl FileSymbols {
    /// The top-level definitions with bare name `name` in this file.
    /// More than one means the file is ambiguous for that name (§3).
    pub fn top_level_definitions_named<'a>(&'a self, name: &str) -> Vec<&'a Definition> {
        self.definitions
            .iter()
            .filter(|d| d.is_top_level && d.name == name)
            .collect()
    }
}

/// The whole-project index: one `FileSymbols` per source file, plus a
/// multimap from bare name to every top-level definition of that name
/// across the project.
pub struct ProjectSymbolTable {
    pub root: PathBuf,
    pub extension: String,
    pub file_symbols: HashMap<PathBuf, FileSymbols>,
    pub definitions_by_name: HashMap<String, Vec<(PathBuf, Definition)>>,
    /// Files that failed to parse during the whole-project walk (§4.1).
    /// The operation continues; these are surfaced as info messages.
    pub parse_warnings: Vec<PathBuf>,
}

impl ProjectSymbolTable {
    /// Walks `root`, parses every accepted file once, and indexes its
    /// definitions, references, and imports. Per §4.1, a parse failure of
    /// one of these "other" files is non-fatal: the file is skipped and
    /// recorded in `parse_warnings`.
    pub fn build(root: &Path, extension: &str) -> anyhow::Result<Self> {
        let files = walk_source_files(root, extension)?;
        let mut file_symbols = HashMap::new();
        let mut definitions_by_name: HashMap<String, Vec<(PathBuf, Definition)>> = HashMap::new();
        let mut parse_warnings = Vec::new();

        for file in files {
            let text = match std::fs::read_to_string(&file) {
                Ok(text) => text,
                Err(_) => {
                    parse_warnings.push(file);
                    continue;
                },
            };
            let Ok(cst) = Cst::parse(&text) else {
                parse_warnings.push(file);
                continue;
            };

            let module = module_of(root, &file, extension);
            let symbols = scan_file(&file, &module, &text, cst.root());
            for def in &symbols.definitions {
                if def.is_top_level {
                    definitions_by_name
                        .entry(def.name.clone())
                        .or_default()
                        .push((file.clone(), def.clone()));
                }
            }
            file_symbols.insert(file.clone(), symbols);
        }

        // File-path lexicographic, then location - the spec's stated
        // ordering for a multimap over bare names (§5).
        for entries in definitions_by_name.values_mut() {
            entries.sort_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| a.1.location.start.cmp(&b.1.location.start))
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            extension: extension.to_string(),
            file_symbols,
            definitions_by_name,
            parse_warnings,
        })
    }

    pub fn module_of(&self, file: &Path) -> String {
        module_of(&self.root, file, &self.extension)
    }

    /// Returns the single top-level definition named `name` in `file`,
    /// if there's exactly one there (callers check ambiguity separately
    /// via `top_level_definitions_named`).
    pub fn find_definition(&self, file: &Path, name: &str) -> Option<&Definition> {
        self.file_symbols
            .get(file)
            .and_then(|fs| fs.top_level_definitions_named(name).into_iter().next())
    }

    /// Every top-level definition of `name` across the whole project.
    pub fn find_all_definitions_by_name(&self, name: &str) -> Vec<(&Path, &Definition)> {
        self.definitions_by_name
            .get(name)
            .map(|entries| entries.iter().map(|(p, d)| (p.as_path(), d)).collect())
            .unwrap_or_default()
    }

    /// References to `name` restricted to the defining file itself, plus
    /// files that import `name` (or `*`) from a module that resolves to
    /// `defining_file`.
    ///
    /// Relative-import resolution is the planner's job (it knows the
    /// defining file's module and can resolve `..pkg` against a caller's
    /// location); here we only match already-resolved absolute imports
    /// and star-imports whose textual module equals the defining file's
    /// absolute module name.
    pub fn find_all_references(&self, name: &str, defining_file: &Path) -> Vec<(&Path, &Reference)> {
        let defining_module = self.module_of(defining_file);
        let mut out = Vec::new();

        for (path, symbols) in &self.file_symbols {
            let is_defining_file = path == defining_file;
            let imports_from_defining_file = symbols.imports.iter().any(|imp| {
                imp.relative_depth == 0 && imp.module == defining_module && imp.imports(name)
            });

            if is_defining_file || imports_from_defining_file {
                for reference in &symbols.references {
                    if reference.name == name {
                        out.push((path.as_path(), reference));
                    }
                }
            }
        }

        out.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.location.start.cmp(&b.1.location.start)));
        out
    }
}

/// Visits `root` once, emitting definitions/references/imports for a
/// single file per the build procedure in §4.3. `module` is the dotted
/// module name for `file_path` (from `project_walker::module_of`), used
/// to build each definition's `qualified_name`.
fn scan_file(file_path: &Path, module: &str, source: &str, root: Node) -> FileSymbols {
    let bytes = source.as_bytes();
    let mut definitions = Vec::new();
    let mut references = Vec::new();
    let mut imports = Vec::new();
    let mut scope_stack: Vec<String> = Vec::new();

    visit(
        root,
        bytes,
        file_path,
        module,
        &mut scope_stack,
        &mut definitions,
        &mut references,
        &mut imports,
    );

    FileSymbols {
        file_path: file_path.to_path_buf(),
        definitions,
        references,
        imports,
    }
}

#[allow(clippy::too_many_arguments)]
fn visit(
    node: Node,
    source: &[u8],
    file_path: &Path,
    module: &str,
    scope_stack: &mut Vec<String>,
    definitions: &mut Vec<Definition>,
    references: &mut Vec<Reference>,
    imports: &mut Vec<ImportRecord>,
) {
    match node.kind() {
        "import_statement" | "import_from_statement" => {
            if let Some(record) = import_record_from_node(node, source, file_path) {
                imports.push(record);
            }
            return; // don't descend into import statements for references
        },
        "function_definition" | "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                if let Ok(name) = name_node.utf8_text(source) {
                    let is_top_level = scope_stack.is_empty();
                    let qualified_name = qualify(module, scope_stack, name);
                    definitions.push(Definition {
                        name: name.to_string(),
                        qualified_name,
                        location: node_location(file_path, node),
                        kind: if node.kind() == "class_definition" {
                            SymbolKind::Class
                        } else {
                            SymbolKind::Function
                        },
                        is_top_level,
                    });
                }
            }

            scope_stack.push(
                node.child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok())
                    .unwrap_or("")
                    .to_string(),
            );
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    visit(child, source, file_path, module, scope_stack, definitions, references, imports);
                }
            }
            scope_stack.pop();
            return;
        },
        "expression_statement" => {
            if let Some(assign) = node.child(0) {
                record_assignment_targets(assign, source, file_path, module, scope_stack, definitions);
            }
        },
        "identifier" => {
            if let Ok(text) = node.utf8_text(source) {
                // Only a genuine reference if this identifier isn't itself
                // the binding name of the definition/parameter it sits in;
                // the simplest faithful rule per §4.3 is "every identifier
                // occurrence outside an import statement", so callers of
                // `internal_dependency` classification (the analyzer) are
                // responsible for excluding self-references to `S`.
                references.push(Reference {
                    name: text.to_string(),
                    location: node_location(file_path, node),
                });
            }
        },
        _ => {},
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            visit(child, source, file_path, module, scope_stack, definitions, references, imports);
        }
    }
}

fn record_assignment_targets(
    node: Node,
    source: &[u8],
    file_path: &Path,
    module: &str,
    scope_stack: &[String],
    definitions: &mut Vec<Definition>,
) {
    let (kind, target) = match node.kind() {
        "assignment" => (node.kind(), node.child_by_field_name("left")),
        _ => return,
    };
    let _ = kind;

    let Some(target) = target else { return };
    if target.kind() != "identifier" {
        return;
    }
    let Ok(name) = target.utf8_text(source) else {
        return;
    };

    let is_top_level = scope_stack.is_empty();
    let qualified_name = qualify(module, scope_stack, name);
    definitions.push(Definition {
        name: name.to_string(),
        qualified_name,
        location: node_location(file_path, node),
        kind: SymbolKind::Variable,
        is_top_level,
    });
}

/// Builds `module.scope.scope.name` — the module's dotted name plus any
/// nested scope path, per the `qualified_name` convention in §3.
fn qualify(module: &str, scope_stack: &[String], name: &str) -> String {
    let mut parts = vec![module.to_string()];
    parts.extend(scope_stack.iter().cloned());
    parts.push(name.to_string());
    parts.join(".")
}

fn node_location(file_path: &Path, node: Node) -> Location {
    Location::new(
        file_path.to_path_buf(),
        Position::from_tree_sitter(node.start_position()),
        Position::from_tree_sitter(node.end_position()),
    )
}

fn import_record_from_node(node: Node, source: &[u8], file_path: &Path) -> Option<ImportRecord> {
    let location = node_location(file_path, node);

    match node.kind() {
        "import_from_statement" => {
            let module_name = node.child_by_field_name("module_name")?;
            let (relative_depth, module) = match module_name.kind() {
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
                "dotted_name" | "identifier" => {
                    (0, module_name.utf8_text(source).unwrap_or("").to_string())
                },
                _ => (0, String::new()),
            };

            let mut names = Vec::new();
            let mut is_star = false;
            let mut cursor = node.walk();
            for entry in node.children_by_field_name("name", &mut cursor) {
                match entry.kind() {
                    "wildcard_import" => is_star = true,
                    "aliased_import" => {
                        let name = entry
                            .child_by_field_name("name")
                            .and_then(|n| n.utf8_text(source).ok())
                            .unwrap_or("")
                            .to_string();
                        let alias = entry
                            .child_by_field_name("alias")
                            .and_then(|n| n.utf8_text(source).ok())
                            .map(str::to_string);
                        names.push(ImportedName { name, alias });
                    },
                    "identifier" | "dotted_name" => {
                        let name = entry.utf8_text(source).unwrap_or("").to_string();
                        names.push(ImportedName { name, alias: None });
                    },
                    _ => {},
                }
            }

            if is_star {
                names = vec![ImportedName {
                    name: "*".to_string(),
                    alias: None,
                }];
            }

            Some(ImportRecord {
                module,
                relative_depth,
                names,
                is_star,
                location,
                is_from_form: true,
            })
        },
        "import_statement" => {
            let mut names = Vec::new();
            let mut module = String::new();
            let mut cursor = node.walk();
            for entry in node.children_by_field_name("name", &mut cursor) {
                match entry.kind() {
                    "aliased_import" => {
                        let name = entry
                            .child_by_field_name("name")
                            .and_then(|n| n.utf8_text(source).ok())
                            .unwrap_or("")
                            .to_string();
                        let alias = entry
                            .child_by_field_name("alias")
                            .and_then(|n| n.utf8_text(source).ok())
                            .map(str::to_string);
                        module = name.clone();
                        names.push(ImportedName {
                            name,
                            alias,
                        });
                    },
                    "dotted_name" | "identifier" => {
                        let name = entry.utf8_text(source).unwrap_or("").to_string();
                        module = name.clone();
                        names.push(ImportedName { name, alias: None });
                    },
                    _ => {},
                }
            }

            Some(ImportRecord {
                module,
                relative_depth: 0,
                names,
                is_star: false,
                location,
                is_from_form: false,
            })
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(tmp: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn indexes_top_level_definitions_and_references() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "utils.py",
            "def helper_function(x):\n    return x * 2\n",
        );
        write(
            &tmp,
            "main.py",
            "from utils import helper_function\n\nresult = helper_function(3)\n",
        );

        let table = ProjectSymbolTable::build(tmp.path(), "py").unwrap();
        assert!(table.parse_warnings.is_empty());

        let utils = tmp.path().join("utils.py");
        let defs = table.find_all_definitions_by_name("helper_function");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].0, utils.as_path());

        let main = tmp.path().join("main.py");
        let main_symbols = &table.file_symbols[&main];
        assert_eq!(main_symbols.imports.len(), 1);
        assert!(main_symbols.imports[0].imports("helper_function"));
    }

    #[test]
    fn records_all_definitions_of_an_ambiguous_name() {
        let tmp = TempDir::new().unwrap();
        let file = write(&tmp, "mod.py", "x = 1\nx = 2\n");
        let table = ProjectSymbolTable::build(tmp.path(), "py").unwrap();
        let matches = table.file_symbols[&file].top_level_definitions_named("x");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn skips_unparseable_files_and_records_warning() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "bad.py", "def (((( not valid python");
        write(&tmp, "good.py", "x = 1\n");
        let table = ProjectSymbolTable::build(tmp.path(), "py").unwrap();
        assert_eq!(table.parse_warnings.len(), 1);
        assert!(table.parse_warnings[0].ends_with("bad.py"));
    }

    #[test]
    fn finds_references_via_star_import() {
        let tmp = TempDir::new().unwrap();
        let utils = write(&tmp, "utils.py", "def helper():\n    pass\n");
        write(&tmp, "main.py", "from utils import *\nhelper()\n");

        let table = ProjectSymbolTable::build(tmp.path(), "py").unwrap();
        let refs = table.find_all_references("helper", &utils);
        let main = tmp.path().join("main.py");
        assert!(refs.iter().any(|(p, _)| *p == main.as_path()));
    }
}
