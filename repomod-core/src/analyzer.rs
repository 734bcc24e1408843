//! Per-file dependency analysis: classifies the names a top-level
//! definition references, lists its internal users, and drives the move
//! closure algorithm (§4.4).

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::cst::Cst;

/// How a name referenced by a definition classifies, relative to one
/// file's import index and definition index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameClass {
    RequiredImport(RequiredImport),
    InternalDependency(String),
}

/// An import a definition needs, resolved enough to call
/// `Cst::ensure_imports` with directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredImport {
    pub module_spec: String,
    pub name: String,
    pub alias: Option<String>,
    pub is_from_form: bool,
}

/// Ingests one file's parsed tree and builds the import index,
/// definition index, and per-definition referenced-name sets described
/// in §4.4. Built once per source file per operation, transiently, like
/// the CST it wraps.
pub struct DependencyAnalyzer<'a> {
    source: &'a str,
    /// local binding -> resolved import info
    import_index: HashMap<String, RequiredImport>,
    /// bare top-level name -> its node
    definition_names: HashSet<String>,
    /// bare top-level name -> referenced identifier set (includes self)
    referenced_names: HashMap<String, HashSet<String>>,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(cst: &Cst, source: &'a str) -> Self {
        let root = cst.root();
        let bytes = source.as_bytes();

        let import_index = build_import_index(root, bytes);
        let definition_names = top_level_definition_names(root, bytes);

        let mut referenced_names = HashMap::new();
        for i in 0..root.child_count() {
            let Some(child) = root.child(i) else { continue };
            let Some((name, def_node)) = top_level_definition_name_and_node(child, bytes) else {
                continue;
            };
            let mut names = HashSet::new();
            collect_identifier_and_attribute_bases(def_node, bytes, &mut names);
            referenced_names.insert(name, names);
        }

        Self {
            source,
            import_index,
            definition_names,
            referenced_names,
        }
    }

    /// Classifies every name referenced by top-level symbol `s` as a
    /// required import or an internal dependency; builtins, locals, and
    /// parameters are silently dropped.
    pub fn analyze(&self, s: &str) -> Vec<NameClass> {
        let Some(names) = self.referenced_names.get(s) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for name in names {
            if name == s {
                continue;
            }
            if let Some(import) = self.import_index.get(name) {
                out.push(NameClass::RequiredImport(import.clone()));
            } else if self.definition_names.contains(name) {
                out.push(NameClass::InternalDependency(name.clone()));
            }
        }
        out
    }

    /// Every other top-level definition whose referenced-name set
    /// includes `s`.
    pub fn internal_usages(&self, s: &str) -> Vec<String> {
        self.referenced_names
            .iter()
            .filter(|(name, refs)| name.as_str() != s && refs.contains(s))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether `name` is a top-level definition in this file at all.
    pub fn has_definition(&self, name: &str) -> bool {
        self.definition_names.contains(name)
    }

    /// The verbatim source of `s`'s top-level definition, including any
    /// wrapping `decorated_definition` (preceding decorators) and, for
    /// functions/classes, their docstring since that's part of the node's
    /// own byte range.
    pub fn get_symbol_code(&self, cst: &Cst, s: &str) -> Option<String> {
        cst.extract_definition(s)
    }

    pub fn source(&self) -> &str {
        self.source
    }
}

fn top_level_definition_name_and_node<'t>(node: Node<'t>, source: &[u8]) -> Option<(String, Node<'t>)> {
    let candidate = if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition")?
    } else {
        node
    };

    match candidate.kind() {
        "function_definition" | "class_definition" => {
            let name = candidate
                .child_by_field_name("name")?
                .utf8_text(source)
                .ok()?
                .to_string();
            Some((name, node))
        },
        "expression_statement" => {
            let assign = candidate.child(0)?;
            if assign.kind() != "assignment" {
                return None;
            }
            let left = assign.child_by_field_name("left")?;
            if left.kind() != "identifier" {
                return None;
            }
            let name = left.utf8_text(source).ok()?.to_string();
            Some((name, node))
        },
        _ => None,
    }
}

fn top_level_definition_names(root: Node, source: &[u8]) -> HashSet<String> {
    let mut out = HashSet::new();
    for i in 0..root.child_count() {
        if let Some(child) = root.child(i) {
            if let Some((name, _)) = top_level_definition_name_and_node(child, source) {
                out.insert(name);
            }
        }
    }
    out
}

/// Recursively collects every `identifier` reference within `node`,
/// including the base of attribute expressions (`a.b.c` contributes only
/// `a`), skipping nested import statements (there shouldn't be any inside
/// a definition body under this grammar's module-level-only import
/// convention, but this matches the CST façade's same caution).
fn collect_identifier_and_attribute_bases(node: Node, source: &[u8], out: &mut HashSet<String>) {
    if node.kind() == "attribute" {
        if let Some(object) = node.child_by_field_name("object") {
            collect_identifier_and_attribute_bases(object, source, out);
        }
        // Don't descend into the `.attribute` field - it's not a name
        // reference in its own right.
        return;
    }

    if node.kind() == "identifier" {
        if let Ok(text) = node.utf8_text(source) {
            out.insert(text.to_string());
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_identifier_and_attribute_bases(child, source, out);
        }
    }
}

fn build_import_index(root: Node, source: &[u8]) -> HashMap<String, RequiredImport> {
    let mut out = HashMap::new();

    for i in 0..root.child_count() {
        let Some(node) = root.child(i) else { continue };
        match node.kind() {
            "import_from_statement" => {
                let Some(module_name) = node.child_by_field_name("module_name") else {
                    continue;
                };
                let (depth, dotted) = match module_name.kind() {
                    "relative_import" => {
                        let mut depth = 0usize;
                        let mut dotted = String::new();
                        for j in 0..module_name.child_count() {
                            if let Some(c) = module_name.child(j) {
                                if c.kind() == "import_prefix" {
                                    depth += c
                                        .utf8_text(source)
                                        .unwrap_or("")
                                        .chars()
                                        .filter(|&ch| ch == '.')
                                        .count();
                                } else if c.kind() == "dotted_name" {
                                    dotted = c.utf8_text(source).unwrap_or("").to_string();
                                }
                            }
                        }
                        (depth, dotted)
                    },
                    "dotted_name" | "identifier" => {
                        (0, module_name.utf8_text(source).unwrap_or("").to_string())
                    },
                    _ => continue,
                };
                let module_spec = format!("{}{}", ".".repeat(depth), dotted);

                let mut cursor = node.walk();
                for entry in node.children_by_field_name("name", &mut cursor) {
                    match entry.kind() {
                        "aliased_import" => {
                            let Some(name) = entry
                                .child_by_field_name("name")
                                .and_then(|n| n.utf8_text(source).ok())
                            else {
                                continue;
                            };
                            let alias = entry
                                .child_by_field_name("alias")
                                .and_then(|n| n.utf8_text(source).ok())
                                .map(str::to_string);
                            let local = alias.clone().unwrap_or_else(|| name.to_string());
                            out.insert(
                                local,
                                RequiredImport {
                                    module_spec: module_spec.clone(),
                                    name: name.to_string(),
                                    alias,
                                    is_from_form: true,
                                },
                            );
                        },
                        "identifier" | "dotted_name" => {
                            if let Ok(name) = entry.utf8_text(source) {
                                out.insert(
                                    name.to_string(),
                                    RequiredImport {
                                        module_spec: module_spec.clone(),
                                        name: name.to_string(),
                                        alias: None,
                                        is_from_form: true,
                                    },
                                );
                            }
                        },
                        _ => {},
                    }
                }
            },
            "import_statement" => {
                let mut cursor = node.walk();
                for entry in node.children_by_field_name("name", &mut cursor) {
                    match entry.kind() {
                        "aliased_import" => {
                            let Some(name) = entry
                                .child_by_field_name("name")
                                .and_then(|n| n.utf8_text(source).ok())
                            else {
                                continue;
                            };
                            let alias = entry
                                .child_by_field_name("alias")
                                .and_then(|n| n.utf8_text(source).ok())
                                .map(str::to_string);
                            let local = alias.clone().unwrap_or_else(|| name.to_string());
                            out.insert(
                                local,
                                RequiredImport {
                                    module_spec: name.to_string(),
                                    name: name.to_string(),
                                    alias,
                                    is_from_form: false,
                                },
                            );
                        },
                        "dotted_name" | "identifier" => {
                            if let Ok(text) = entry.utf8_text(source) {
                                let first = text.split('.').next().unwrap_or(text);
                                out.insert(
                                    first.to_string(),
                                    RequiredImport {
                                        module_spec: text.to_string(),
                                        name: text.to_string(),
                                        alias: None,
                                        is_from_form: false,
                                    },
                                );
                            }
                        },
                        _ => {},
                    }
                }
            },
            _ => {},
        }
    }

    out
}

/// Policy for how `move_closure` treats a shared internal dependency
/// (one still used by a top-level symbol that isn't moving).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosurePolicy {
    /// Leave it out of `move_set`; report it in `shared` instead.
    LeaveShared,
    /// Pull it into `move_set` regardless of remaining external users.
    PullIn,
}

/// Result of running the move closure algorithm (§4.4).
#[derive(Debug, Clone, Default)]
pub struct MoveClosure {
    pub move_set: Vec<String>,
    pub shared: Vec<String>,
    pub required_imports: Vec<RequiredImport>,
}

/// Computes the move closure for `seed` against `analyzer`, per the
/// fixpoint algorithm in §4.4. The loop terminates because each
/// iteration can only grow `move_set`, bounded by the total number of
/// top-level names in the file.
pub fn move_closure(analyzer: &DependencyAnalyzer, seed: &[String], policy: ClosurePolicy) -> MoveClosure {
    let mut move_set: Vec<String> = seed.to_vec();
    let mut move_set_index: HashSet<String> = move_set.iter().cloned().collect();
    let mut shared: Vec<String> = Vec::new();
    let mut shared_index: HashSet<String> = HashSet::new();
    let mut required_imports: Vec<RequiredImport> = Vec::new();
    let mut required_import_bindings: HashSet<String> = HashSet::new();

    loop {
        let mut grew = false;
        let snapshot = move_set.clone();

        for s in &snapshot {
            for class in analyzer.analyze(s) {
                match class {
                    NameClass::RequiredImport(import) => {
                        let binding = import.alias.clone().unwrap_or_else(|| {
                            if import.is_from_form {
                                import.name.clone()
                            } else {
                                import.module_spec.split('.').next().unwrap_or(&import.module_spec).to_string()
                            }
                        });
                        if required_import_bindings.insert(binding) {
                            required_imports.push(import);
                        }
                    },
                    NameClass::InternalDependency(d) => {
                        if move_set_index.contains(&d) {
                            continue;
                        }
                        let remaining_users: Vec<String> = analyzer
                            .internal_usages(&d)
                            .into_iter()
                            .filter(|u| !move_set_index.contains(u))
                            .collect();

                        if remaining_users.is_empty() || policy == ClosurePolicy::PullIn {
                            move_set_index.insert(d.clone());
                            move_set.push(d);
                            grew = true;
                        } else if shared_index.insert(d.clone()) {
                            shared.push(d);
                        }
                    },
                }
            }
        }

        if !grew {
            break;
        }
    }

    // A name recorded as `shared` on an earlier pass (when its other
    // callers hadn't joined `move_set` yet) can end up pulled into
    // `move_set` itself once those callers do. `move_set` always wins.
    shared.retain(|d| !move_set_index.contains(d));

    MoveClosure {
        move_set,
        shared,
        required_imports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_import_and_internal_dependency() {
        let source = "import os\n\ndef internal_helper():\n    pass\n\ndef main_func():\n    return os.getcwd() + internal_helper()\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);

        let classes = analyzer.analyze("main_func");
        assert!(classes.iter().any(|c| matches!(c, NameClass::InternalDependency(n) if n == "internal_helper")));
        assert!(classes
            .iter()
            .any(|c| matches!(c, NameClass::RequiredImport(i) if i.name == "os")));
    }

    #[test]
    fn internal_usages_finds_callers() {
        let source = "def shared_helper():\n    pass\n\ndef func_a():\n    return shared_helper()\n\ndef func_b():\n    return shared_helper()\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);

        let mut users = analyzer.internal_usages("shared_helper");
        users.sort();
        assert_eq!(users, vec!["func_a".to_string(), "func_b".to_string()]);
    }

    #[test]
    fn move_closure_pulls_in_sole_dependency() {
        let source = "def internal_helper():\n    pass\n\ndef main_func():\n    return internal_helper()\n\ndef other_func():\n    pass\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);

        let closure = move_closure(&analyzer, &["main_func".to_string()], ClosurePolicy::LeaveShared);
        let mut move_set = closure.move_set.clone();
        move_set.sort();
        assert_eq!(move_set, vec!["internal_helper".to_string(), "main_func".to_string()]);
        assert!(closure.shared.is_empty());
    }

    #[test]
    fn move_closure_reports_shared_dependency_under_reject() {
        let source = "def shared_helper():\n    pass\n\ndef func_a():\n    return shared_helper()\n\ndef func_b():\n    return shared_helper()\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);

        let closure = move_closure(&analyzer, &["func_a".to_string()], ClosurePolicy::LeaveShared);
        assert_eq!(closure.move_set, vec!["func_a".to_string()]);
        assert_eq!(closure.shared, vec!["shared_helper".to_string()]);
    }

    #[test]
    fn move_closure_pull_in_policy_grows_move_set() {
        let source = "def shared_helper():\n    pass\n\ndef func_a():\n    return shared_helper()\n\ndef func_b():\n    return shared_helper()\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);

        let closure = move_closure(&analyzer, &["func_a".to_string()], ClosurePolicy::PullIn);
        assert!(closure.move_set.contains(&"shared_helper".to_string()));
        assert!(closure.shared.is_empty());
    }

    #[test]
    fn closure_is_monotonic_and_contains_seed() {
        let source = "def a():\n    pass\n\ndef b():\n    return a()\n";
        let cst = Cst::parse(source).unwrap();
        let analyzer = DependencyAnalyzer::new(&cst, source);
        let closure = move_closure(&analyzer, &["b".to_string()], ClosurePolicy::LeaveShared);
        assert!(closure.move_set.contains(&"b".to_string()));
    }
}
