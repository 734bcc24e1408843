//! The refactor planner: combines the target parser, symbol table, and
//! dependency analyzer into whole-project edits for the four operations
//! (§4.5). Every edit is computed in memory first; only once a whole
//! operation succeeds are files written - atomically, via a sibling temp
//! file per path (§9, "atomic commit") - and any filesystem rename/move
//! performed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyzer::{move_closure, ClosurePolicy, DependencyAnalyzer, NameClass, RequiredImport};
use crate::cst::Cst;
use crate::diff::{file_diff, PathChange};
use crate::error::{RefactorError, Result};
use crate::location::Position;
use crate::project_walker::{
    missing_package_markers, resolve_relative_import, relative_spec_for, PACKAGE_MARKER_CONTENT,
};
use crate::symbol_table::ProjectSymbolTable;
use crate::target::{expand_identifier_at, parse_target, Target};

/// Policy for a shared dependency found while computing `move_symbol`'s
/// dependency closure - one still used by a top-level symbol that isn't
/// moving (§4.4, §4.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedDepPolicy {
    /// Refuse the move and report the shared names.
    Reject,
    /// Pull every shared dependency into the move regardless of its
    /// remaining external users.
    PullIn,
    /// Extract shared dependencies into a separate common module that
    /// both the source and the destination import from.
    Extract,
}

impl Default for SharedDepPolicy {
    fn default() -> Self {
        Self::Reject
    }
}

/// Knobs shared by `rename_symbol`, `rename_file`, and `move_file`.
#[derive(Debug, Clone)]
pub struct RefactorOptions {
    pub extension: String,
    pub dry_run: bool,
}

impl Default for RefactorOptions {
    fn default() -> Self {
        Self {
            extension: "py".to_string(),
            dry_run: false,
        }
    }
}

/// Knobs `move_symbol` needs on top of the shared ones.
#[derive(Debug, Clone)]
pub struct MoveOptions {
    pub extension: String,
    pub dry_run: bool,
    pub policy: SharedDepPolicy,
    /// Explicit shared-file path, relative to the project root. Only
    /// consulted under `SharedDepPolicy::Extract`; defaults to
    /// `<source_stem>_common.<ext>` alongside the source file.
    pub shared_file_path: Option<PathBuf>,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            extension: "py".to_string(),
            dry_run: false,
            policy: SharedDepPolicy::default(),
            shared_file_path: None,
        }
    }
}

/// What an operation changed, shaped per §6: a dry run yields unified
/// diffs, a committed run yields the relative paths actually written or
/// moved.
#[derive(Debug, Clone)]
pub enum ChangedFiles {
    Diffs(Vec<String>),
    Paths(Vec<PathBuf>),
}

/// The result of any of the four operations.
#[derive(Debug, Clone)]
pub struct RefactorResult {
    pub changed: ChangedFiles,
    pub info_messages: Vec<String>,
}

/// Renames a top-level symbol and every reference to it across the
/// project: direct uses in its own file, `module.name` attribute access
/// from files that import the module, and `from module import name`
/// bindings elsewhere (§4.5.1).
pub fn rename_symbol(root: &Path, target_str: &str, new_name: &str, options: &RefactorOptions) -> Result<RefactorResult> {
    let target = parse_target(target_str, &options.extension)?;
    if matches!(target, Target::ByNames { .. }) {
        return Err(RefactorError::TargetParse {
            input: target_str.to_string(),
            reason: "multi-symbol targets are only valid for move-symbol".to_string(),
        });
    }

    let file = root.join(target.path());
    let source_text = read_required(&file)?;
    let source_cst = parse_required(&file, &source_text)?;

    let old_name = resolve_seed_name(&target, &file, &source_text)?;

    let table = ProjectSymbolTable::build(root, &options.extension).map_err(RefactorError::from)?;
    let Some(file_symbols) = table.file_symbols.get(&file) else {
        return Err(RefactorError::SymbolNotFound { name: old_name, file });
    };

    let matches = file_symbols.top_level_definitions_named(&old_name);
    if matches.is_empty() {
        return Err(RefactorError::SymbolNotFound { name: old_name, file });
    }
    if matches.len() > 1 {
        return Err(RefactorError::AmbiguousSymbol {
            name: old_name,
            file,
            matches: matches.into_iter().map(|d| d.location.clone()).collect(),
        });
    }

    let mut info_messages = Vec::new();
    let others: Vec<PathBuf> = table
        .find_all_definitions_by_name(&old_name)
        .into_iter()
        .filter(|(path, _)| *path != file)
        .map(|(path, _)| path.to_path_buf())
        .collect();
    if !others.is_empty() {
        let shown: Vec<String> = others.iter().take(5).map(|p| p.display().to_string()).collect();
        info_messages.push(format!(
            "`{old_name}` is also defined in {} other file(s): {}",
            others.len(),
            shown.join(", ")
        ));
    }

    let file_module = table.module_of(&file);
    let module_last = file_module.rsplit('.').next().unwrap_or(&file_module).to_string();

    let mut edits = EditSet::new(root);
    edits.seed_original(&file, source_text);
    let (renamed, _) = source_cst.rename_name(&old_name, new_name);
    edits.set_text(&file, renamed.print().to_string());

    for (other, other_symbols) in &table.file_symbols {
        if other == &file {
            continue;
        }
        let text = edits.current_text(other).map_err(RefactorError::from)?;
        let Ok(cst) = Cst::parse(&text) else { continue };

        let (cst, n1) = cst.rename_import(None, None, Some(&old_name), Some(new_name));
        let (cst, n2) = cst.rename_attribute(&module_last, &old_name, new_name);

        let imports_old_from_file = other_symbols.imports.iter().any(|imp| {
            let resolved = if imp.relative_depth > 0 {
                resolve_relative_import(root, other, &options.extension, imp.relative_depth, &imp.module)
            } else {
                imp.module.clone()
            };
            resolved == file_module && imp.imports(&old_name)
        });

        let (cst, n3) = if imports_old_from_file {
            cst.rename_name(&old_name, new_name)
        } else {
            (cst, 0)
        };

        if n1 + n2 + n3 > 0 {
            edits.set_text(other, cst.print().to_string());
        }
    }

    finish(edits, options.dry_run, info_messages)
}

/// Moves one or more top-level symbols, plus whatever their dependency
/// closure drags in, from the target file to `dest_file` (§4.4, §4.5.2).
pub fn move_symbol(root: &Path, target_str: &str, dest_file: &Path, options: &MoveOptions) -> Result<RefactorResult> {
    let target = parse_target(target_str, &options.extension)?;
    let source_file = root.join(target.path());
    let source_text = read_required(&source_file)?;
    let source_cst = parse_required(&source_file, &source_text)?;

    let table = ProjectSymbolTable::build(root, &options.extension).map_err(RefactorError::from)?;
    let Some(source_symbols) = table.file_symbols.get(&source_file) else {
        return Err(RefactorError::refactoring(format!(
            "{} is not part of the project",
            source_file.display()
        )));
    };

    let seeds: Vec<String> = match &target {
        Target::ByName { name, .. } => vec![name.clone()],
        Target::ByNames { names, .. } => names.clone(),
        Target::ByPosition { .. } => vec![resolve_seed_name(&target, &source_file, &source_text)?],
    };

    for seed in &seeds {
        let matches = source_symbols.top_level_definitions_named(seed);
        if matches.is_empty() {
            return Err(RefactorError::SymbolNotFound {
                name: seed.clone(),
                file: source_file.clone(),
            });
        }
        if matches.len() > 1 {
            return Err(RefactorError::AmbiguousSymbol {
                name: seed.clone(),
                file: source_file.clone(),
                matches: matches.into_iter().map(|d| d.location.clone()).collect(),
            });
        }
    }

    let analyzer = DependencyAnalyzer::new(&source_cst, &source_text);
    let closure_policy = if options.policy == SharedDepPolicy::PullIn {
        ClosurePolicy::PullIn
    } else {
        ClosurePolicy::LeaveShared
    };
    let closure = move_closure(&analyzer, &seeds, closure_policy);

    if !closure.shared.is_empty() && options.policy == SharedDepPolicy::Reject {
        return Err(RefactorError::CircularDependency {
            shared_symbols: closure.shared.clone(),
        });
    }

    let mut info_messages = Vec::new();
    let auto_included: Vec<&String> = closure.move_set.iter().filter(|s| !seeds.contains(s)).collect();
    if !auto_included.is_empty() {
        let names: Vec<&str> = auto_included.iter().map(|s| s.as_str()).collect();
        let reason = if options.policy == SharedDepPolicy::PullIn {
            "pulled in under --policy pull-in"
        } else {
            "used only by the moved symbol(s)"
        };
        info_messages.push(format!(
            "auto-included {} dependenc{} {}: {}",
            auto_included.len(),
            if auto_included.len() == 1 { "y" } else { "ies" },
            reason,
            names.join(", ")
        ));
    }

    let dest_path = root.join(dest_file);
    let shared_path = if options.policy == SharedDepPolicy::Extract && !closure.shared.is_empty() {
        Some(options.shared_file_path.clone().map(|p| root.join(p)).unwrap_or_else(|| {
            let stem = source_file.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
            source_file.with_file_name(format!("{stem}_common.{}", options.extension))
        }))
    } else {
        None
    };
    if let Some(shared_path) = &shared_path {
        info_messages.push(format!(
            "extracted {} shared dependenc{} into {}",
            closure.shared.len(),
            if closure.shared.len() == 1 { "y" } else { "ies" },
            shared_path.display()
        ));
    }

    let mut edits = EditSet::new(root);
    edits.seed_original(&source_file, source_text.clone());

    if let Some(parent) = dest_path.parent() {
        edits.queue_missing_package_markers(root, parent, &options.extension);
    }
    if let Some(shared_path) = &shared_path {
        if let Some(parent) = shared_path.parent() {
            edits.queue_missing_package_markers(root, parent, &options.extension);
        }
    }

    // Shared file (EXTRACT only): the shared symbols move here instead of
    // with the rest of the closure, and both source and destination will
    // import them from it.
    if let Some(shared_path) = &shared_path {
        let shared_text = edits.current_text(shared_path).map_err(RefactorError::from)?;
        let mut shared_cst = load_or_seed(shared_path, &shared_text)?;
        let mut shared_required: Vec<(String, String, Option<String>, bool)> = Vec::new();
        for s in &closure.shared {
            if let Some(code) = analyzer.get_symbol_code(&source_cst, s) {
                shared_cst = shared_cst.add_definition(&code);
            }
            for class in analyzer.analyze(s) {
                if let NameClass::RequiredImport(import) = class {
                    shared_required.push((import.module_spec, import.name, import.alias, import.is_from_form));
                }
            }
        }
        shared_cst = shared_cst.ensure_imports(&shared_required);
        edits.set_text(shared_path, shared_cst.print().to_string());
    }

    // Destination file.
    let dest_text = edits.current_text(&dest_path).map_err(RefactorError::from)?;
    let mut dest_cst = load_or_seed(&dest_path, &dest_text)?;
    for s in &closure.move_set {
        if let Some(code) = analyzer.get_symbol_code(&source_cst, s) {
            dest_cst = dest_cst.add_definition(&code);
        }
    }
    let dest_needed: Vec<(String, String, Option<String>, bool)> = closure
        .required_imports
        .iter()
        .map(|i| (i.module_spec.clone(), i.name.clone(), i.alias.clone(), i.is_from_form))
        .collect();
    dest_cst = dest_cst.ensure_imports(&dest_needed);

    if let Some(shared_path) = &shared_path {
        let shared_module = table.module_of(shared_path);
        let shared_needed: Vec<(String, String, Option<String>, bool)> = closure
            .shared
            .iter()
            .map(|s| (shared_module.clone(), s.clone(), None, true))
            .collect();
        dest_cst = dest_cst.ensure_imports(&shared_needed);
    }
    edits.set_text(&dest_path, dest_cst.print().to_string());

    // Source file: drop the migrated definitions, tidy now-unused
    // imports, and re-import anything still referenced from its new home.
    let mut new_source_cst = source_cst.clone();
    for s in closure.move_set.iter().chain(closure.shared.iter()) {
        new_source_cst = new_source_cst.remove_definition(s).0;
    }
    let (new_source_cst, _) = new_source_cst.remove_unused_imports();

    let dest_module = table.module_of(&dest_path);
    let mut source_needed: Vec<(String, String, Option<String>, bool)> = Vec::new();
    for s in &closure.move_set {
        if new_source_cst.references_identifier(s) {
            source_needed.push((dest_module.clone(), s.clone(), None, true));
        }
    }
    if let Some(shared_path) = &shared_path {
        let shared_module = table.module_of(shared_path);
        for s in &closure.shared {
            if new_source_cst.references_identifier(s) {
                source_needed.push((shared_module.clone(), s.clone(), None, true));
            }
        }
    }
    let new_source_cst = new_source_cst.ensure_imports(&source_needed);
    edits.set_text(&source_file, new_source_cst.print().to_string());

    // Every other file: follow the moved (and extracted) symbols to
    // their new module.
    let source_module = table.module_of(&source_file);
    for (other, _) in &table.file_symbols {
        if other == &source_file || other == &dest_path || shared_path.as_deref() == Some(other.as_path()) {
            continue;
        }
        let text = edits.current_text(other).map_err(RefactorError::from)?;
        let Ok(mut cst) = Cst::parse(&text) else { continue };
        let mut total = 0usize;
        for s in &closure.move_set {
            let (next, n) = cst.rename_import(Some(&source_module), Some(&dest_module), Some(s), Some(s));
            cst = next;
            total += n;
        }
        if let Some(shared_path) = &shared_path {
            let shared_module = table.module_of(shared_path);
            for s in &closure.shared {
                let (next, n) = cst.rename_import(Some(&source_module), Some(&shared_module), Some(s), Some(s));
                cst = next;
                total += n;
            }
        }
        if total > 0 {
            edits.set_text(other, cst.print().to_string());
        }
    }

    finish(edits, options.dry_run, info_messages)
}

/// Renames a file in place (same directory, new stem) and fixes up every
/// importer (§4.5.3).
pub fn rename_file(root: &Path, file: &Path, new_stem: &str, options: &RefactorOptions) -> Result<RefactorResult> {
    let old_path = root.join(file);
    if !old_path.exists() {
        return Err(RefactorError::refactoring(format!("{} does not exist", old_path.display())));
    }
    let table = ProjectSymbolTable::build(root, &options.extension).map_err(RefactorError::from)?;
    let old_module = table.module_of(&old_path);
    let new_module = format!("{}{new_stem}", with_trailing_dot(&parent_module(&old_module)));
    let old_stem = old_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
    let new_path = old_path.with_file_name(format!("{new_stem}.{}", options.extension));

    let mut edits = EditSet::new(root);
    rewrite_importers(
        root,
        &table,
        &old_path,
        &old_module,
        &new_module,
        &old_stem,
        new_stem,
        &options.extension,
        &mut edits,
    )?;
    edits.set_path_change(old_path, new_path, PathChange::Rename);

    finish(edits, options.dry_run, Vec::new())
}

/// Moves a file to a different directory, preserving its name, and fixes
/// up every importer - including bare-relative submodule imports whose
/// package changed underneath them (§4.5.4).
pub fn move_file(root: &Path, file: &Path, dest_dir: &Path, options: &RefactorOptions) -> Result<RefactorResult> {
    let old_path = root.join(file);
    if !old_path.exists() {
        return Err(RefactorError::refactoring(format!("{} does not exist", old_path.display())));
    }
    let table = ProjectSymbolTable::build(root, &options.extension).map_err(RefactorError::from)?;
    let old_module = table.module_of(&old_path);
    let file_name = old_path
        .file_name()
        .ok_or_else(|| RefactorError::refactoring("file has no name"))?
        .to_owned();
    let dest_dir_path = root.join(dest_dir);
    let new_path = dest_dir_path.join(&file_name);
    let new_module = table.module_of(&new_path);
    let stem = old_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();

    let mut edits = EditSet::new(root);
    edits.queue_missing_package_markers(root, &dest_dir_path, &options.extension);
    rewrite_importers(
        root,
        &table,
        &old_path,
        &old_module,
        &new_module,
        &stem,
        &stem,
        &options.extension,
        &mut edits,
    )?;
    edits.set_path_change(old_path, new_path, PathChange::Move);

    finish(edits, options.dry_run, Vec::new())
}

/// Shared rewrite pass for `rename_file`/`move_file`: absolute-style
/// imports of the old module become imports of the new one, and
/// bare-relative submodule imports (`from . import old_stem`) are either
/// renamed in place (same parent package) or re-targeted to a new dotted
/// spec (different parent package, §8 scenario 6).
#[allow(clippy::too_many_arguments)]
fn rewrite_importers(
    root: &Path,
    table: &ProjectSymbolTable,
    old_path: &Path,
    old_module: &str,
    new_module: &str,
    old_stem: &str,
    new_stem: &str,
    extension: &str,
    edits: &mut EditSet,
) -> Result<()> {
    let old_parent = parent_module(old_module);
    let new_parent = parent_module(new_module);
    let same_parent = old_parent == new_parent;

    for (other, symbols) in &table.file_symbols {
        if other == old_path {
            continue;
        }
        let text = edits.current_text(other).map_err(RefactorError::from)?;
        let Ok(cst) = Cst::parse(&text) else { continue };

        let (mut cst, n1) = cst.rename_import(Some(old_module), Some(new_module), None, None);
        let mut n2 = 0usize;

        if same_parent {
            let (next, n) = cst.rename_import(Some(old_stem), Some(new_stem), None, None);
            cst = next;
            n2 += n;
        } else {
            for import in &symbols.imports {
                if import.relative_depth == 0 || !import.module.is_empty() || !import.imports(old_stem) {
                    continue;
                }
                let resolved_parent = resolve_relative_import(root, other, extension, import.relative_depth, "");
                if resolved_parent != old_parent {
                    continue;
                }
                let new_spec = relative_spec_for(root, other, extension, import.relative_depth, &new_parent);
                let (next, n) = cst.retarget_submodule_import(old_stem, &new_spec, new_stem);
                cst = next;
                n2 += n;
            }
        }

        if n1 + n2 > 0 {
            edits.set_text(other, cst.print().to_string());
        }
    }
    Ok(())
}

fn parent_module(module: &str) -> String {
    let mut parts: Vec<&str> = module.split('.').collect();
    parts.pop();
    parts.join(".")
}

fn with_trailing_dot(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}.")
    }
}

fn resolve_seed_name(target: &Target, file: &Path, source_text: &str) -> Result<String> {
    match target {
        Target::ByName { name, .. } => Ok(name.clone()),
        Target::ByPosition { line, column, .. } => expand_identifier_at(source_text, Position::new(*line, *column))
            .ok_or_else(|| RefactorError::refactoring(format!("no identifier at {}:{}:{}", file.display(), line, column))),
        Target::ByNames { .. } => Err(RefactorError::TargetParse {
            input: file.display().to_string(),
            reason: "multi-symbol targets are only valid for move-symbol".to_string(),
        }),
    }
}

fn read_required(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| RefactorError::refactoring(format!("could not read {}: {e}", path.display())))
}

fn parse_required(path: &Path, text: &str) -> Result<Cst> {
    Cst::parse(text).map_err(|_| RefactorError::refactoring(format!("{} failed to parse", path.display())))
}

/// Parses `text` if the file already existed, or seeds a fresh one with a
/// minimal module docstring if this operation is the one creating it.
fn load_or_seed(path: &Path, text: &str) -> Result<Cst> {
    if path.exists() {
        parse_required(path, text)
    } else {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
        Ok(Cst::parse(&minimal_header(stem)).expect("minimal header parses"))
    }
}

fn minimal_header(stem: &str) -> String {
    format!("\"\"\"{stem} module.\"\"\"\n")
}

fn finish(edits: EditSet, dry_run: bool, info_messages: Vec<String>) -> Result<RefactorResult> {
    if dry_run {
        Ok(RefactorResult {
            changed: ChangedFiles::Diffs(edits.diffs()),
            info_messages,
        })
    } else {
        let touched = edits.commit()?;
        Ok(RefactorResult {
            changed: ChangedFiles::Paths(touched),
            info_messages,
        })
    }
}

/// Accumulates in-memory edits and creations for one operation, then
/// either renders them as diffs (dry run) or commits them to disk.
struct EditSet {
    root: PathBuf,
    originals: HashMap<PathBuf, String>,
    edited: BTreeMap<PathBuf, String>,
    path_change: Option<(PathBuf, PathBuf, PathChange)>,
}

impl EditSet {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            originals: HashMap::new(),
            edited: BTreeMap::new(),
            path_change: None,
        }
    }

    /// Seeds the original-text cache for a file this operation already
    /// read directly (avoids a second disk read through `current_text`).
    fn seed_original(&mut self, path: &Path, text: String) {
        self.originals.insert(path.to_path_buf(), text);
    }

    /// Current text for `path`: the edited version if one exists yet,
    /// else the on-disk original (cached), else "" for a file this
    /// operation itself is about to create.
    fn current_text(&mut self, path: &Path) -> anyhow::Result<String> {
        if let Some(text) = self.edited.get(path) {
            return Ok(text.clone());
        }
        if let Some(text) = self.originals.get(path) {
            return Ok(text.clone());
        }
        if path.exists() {
            let text = fs::read_to_string(path)?;
            self.originals.insert(path.to_path_buf(), text.clone());
            Ok(text)
        } else {
            self.originals.insert(path.to_path_buf(), String::new());
            Ok(String::new())
        }
    }

    fn set_text(&mut self, path: &Path, text: String) {
        self.edited.insert(path.to_path_buf(), text);
    }

    fn original_text(&self, path: &Path) -> &str {
        self.originals.get(path).map(String::as_str).unwrap_or("")
    }

    fn set_path_change(&mut self, old: PathBuf, new: PathBuf, kind: PathChange) {
        self.path_change = Some((old, new, kind));
    }

    fn queue_missing_package_markers(&mut self, root: &Path, dir: &Path, extension: &str) {
        for marker in missing_package_markers(root, dir, extension) {
            if self.edited.contains_key(&marker) {
                continue;
            }
            self.originals.insert(marker.clone(), String::new());
            self.edited.insert(marker, PACKAGE_MARKER_CONTENT.to_string());
        }
    }

    /// Renders diffs for every changed/created file, plus the path-change
    /// annotation for the renamed/moved file, even when its own content
    /// is untouched (the common case for `rename_file`/`move_file`).
    fn diffs(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen: HashSet<&Path> = HashSet::new();

        for (path, new_text) in &self.edited {
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            let old_text = self.original_text(path);
            let path_change = self.path_change.as_ref().and_then(|(old, new, kind)| {
                if new == path {
                    seen.insert(new.as_path());
                    let old_rel = old.strip_prefix(&self.root).unwrap_or(old);
                    Some((old_rel, rel, *kind))
                } else {
                    None
                }
            });
            if let Some(d) = file_diff(rel, old_text, new_text, path_change) {
                out.push(d.diff_text);
            }
        }

        if let Some((old, new, kind)) = &self.path_change {
            if !seen.contains(new.as_path()) {
                let old_rel = old.strip_prefix(&self.root).unwrap_or(old);
                let new_rel = new.strip_prefix(&self.root).unwrap_or(new);
                let text = self.original_text(old);
                if let Some(d) = file_diff(new_rel, text, text, Some((old_rel, new_rel, *kind))) {
                    out.push(d.diff_text);
                }
            }
        }

        out
    }

    /// Writes every edited/created file atomically, then performs any
    /// queued filesystem rename/move. Returns the relative paths touched.
    fn commit(&self) -> Result<Vec<PathBuf>> {
        let mut touched = Vec::new();
        for (path, text) in &self.edited {
            atomic_write(path, text)?;
            touched.push(path.strip_prefix(&self.root).unwrap_or(path).to_path_buf());
        }
        if let Some((old, new, _)) = &self.path_change {
            if let Some(parent) = new.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(old, new)?;
            touched.push(new.strip_prefix(&self.root).unwrap_or(new).to_path_buf());
        }
        Ok(touched)
    }
}

/// Writes `content` to `path` via a sibling temp file, then renames it
/// into place - so a crash mid-write never leaves a half-written file
/// where a caller expects either the old or the new content (§9).
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".repomod-")
        .tempfile_in(parent)
        .map_err(|e| RefactorError::refactoring(format!("could not create temp file next to {}: {e}", path.display())))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| RefactorError::refactoring(format!("could not write {}: {e}", path.display())))?;
    tmp.persist(path)
        .map_err(|e| RefactorError::refactoring(format!("could not commit {}: {e}", path.display())))?;
    Ok(())
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
    fn rename_symbol_updates_definition_and_caller() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "utils.py", "def helper(x):\n    return x * 2\n");
        write(
            &tmp,
            "main.py",
            "from utils import helper\n\nresult = helper(3)\n",
        );

        let result = rename_symbol(
            tmp.path(),
            "utils.py::helper",
            "transform",
            &RefactorOptions {
                extension: "py".to_string(),
                dry_run: false,
            },
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Paths(paths) => assert_eq!(paths.len(), 2),
            ChangedFiles::Diffs(_) => panic!("expected a committed run"),
        }

        let utils_text = fs::read_to_string(tmp.path().join("utils.py")).unwrap();
        assert!(utils_text.contains("def transform(x):"));
        let main_text = fs::read_to_string(tmp.path().join("main.py")).unwrap();
        assert!(main_text.contains("from utils import transform"));
        assert!(main_text.contains("result = transform(3)"));
    }

    #[test]
    fn rename_symbol_dry_run_leaves_disk_untouched() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "utils.py", "def helper(x):\n    return x\n");

        let result = rename_symbol(
            tmp.path(),
            "utils.py::helper",
            "transform",
            &RefactorOptions {
                extension: "py".to_string(),
                dry_run: true,
            },
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Diffs(diffs) => {
                assert_eq!(diffs.len(), 1);
                assert!(diffs[0].contains("-def helper(x):"));
                assert!(diffs[0].contains("+def transform(x):"));
            },
            ChangedFiles::Paths(_) => panic!("expected a dry run"),
        }

        let on_disk = fs::read_to_string(tmp.path().join("utils.py")).unwrap();
        assert!(on_disk.contains("def helper(x):"));
    }

    #[test]
    fn rename_symbol_rejects_ambiguous_target() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "mod.py", "x = 1\nx = 2\n");

        let err = rename_symbol(tmp.path(), "mod.py::x", "y", &RefactorOptions::default()).unwrap_err();
        assert!(matches!(err, RefactorError::AmbiguousSymbol { .. }));
    }

    #[test]
    fn move_symbol_rejects_shared_dependency_by_default() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "source.py",
            "def shared_helper():\n    pass\n\ndef func_a():\n    return shared_helper()\n\ndef func_b():\n    return shared_helper()\n",
        );

        let err = move_symbol(
            tmp.path(),
            "source.py::func_a",
            Path::new("dest.py"),
            &MoveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RefactorError::CircularDependency { .. }));
    }

    #[test]
    fn move_symbol_pulls_in_sole_dependency_and_updates_source() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "source.py",
            "def internal_helper():\n    pass\n\ndef main_func():\n    return internal_helper()\n",
        );

        let result = move_symbol(
            tmp.path(),
            "source.py::main_func",
            Path::new("dest.py"),
            &MoveOptions {
                extension: "py".to_string(),
                dry_run: false,
                policy: SharedDepPolicy::PullIn,
                shared_file_path: None,
            },
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Paths(_) => {},
            ChangedFiles::Diffs(_) => panic!("expected a committed run"),
        }

        let dest_text = fs::read_to_string(tmp.path().join("dest.py")).unwrap();
        assert!(dest_text.contains("def main_func"));
        assert!(dest_text.contains("def internal_helper"));

        let source_text = fs::read_to_string(tmp.path().join("source.py")).unwrap();
        assert!(!source_text.contains("def main_func"));
        assert!(!source_text.contains("def internal_helper"));
    }

    #[test]
    fn move_symbol_extract_creates_shared_module() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "source.py",
            "def shared_helper():\n    pass\n\ndef func_a():\n    return shared_helper()\n\ndef func_b():\n    return shared_helper()\n",
        );

        let result = move_symbol(
            tmp.path(),
            "source.py::func_a",
            Path::new("dest.py"),
            &MoveOptions {
                extension: "py".to_string(),
                dry_run: false,
                policy: SharedDepPolicy::Extract,
                shared_file_path: Some(PathBuf::from("source_common.py")),
            },
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Paths(_) => {},
            ChangedFiles::Diffs(_) => panic!("expected a committed run"),
        }

        let shared_text = fs::read_to_string(tmp.path().join("source_common.py")).unwrap();
        assert!(shared_text.contains("def shared_helper"));

        let dest_text = fs::read_to_string(tmp.path().join("dest.py")).unwrap();
        assert!(dest_text.contains("def func_a"));
        assert!(dest_text.contains("from source_common import shared_helper"));

        let source_text = fs::read_to_string(tmp.path().join("source.py")).unwrap();
        assert!(source_text.contains("def func_b"));
        assert!(source_text.contains("from source_common import shared_helper"));
    }

    #[test]
    fn rename_file_updates_importer_and_moves_file_on_disk() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "utils.py", "def helper():\n    pass\n");
        write(&tmp, "main.py", "from utils import helper\nhelper()\n");

        let result = rename_file(
            tmp.path(),
            Path::new("utils.py"),
            "tools",
            &RefactorOptions::default(),
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Paths(paths) => assert!(paths.iter().any(|p| p == Path::new("tools.py"))),
            ChangedFiles::Diffs(_) => panic!("expected a committed run"),
        }

        assert!(!tmp.path().join("utils.py").exists());
        assert!(tmp.path().join("tools.py").exists());
        let main_text = fs::read_to_string(tmp.path().join("main.py")).unwrap();
        assert!(main_text.contains("from tools import helper"));
    }

    #[test]
    fn move_file_retargets_bare_relative_submodule_import() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "pkg/__init__.py", "\"\"\"Package marker.\"\"\"\n");
        write(&tmp, "pkg/a.py", "from . import b\nb.run()\n");
        write(&tmp, "pkg/b.py", "def run():\n    pass\n");

        let result = move_file(
            tmp.path(),
            Path::new("pkg/b.py"),
            Path::new("pkg/sub"),
            &RefactorOptions::default(),
        )
        .unwrap();

        match result.changed {
            ChangedFiles::Paths(_) => {},
            ChangedFiles::Diffs(_) => panic!("expected a committed run"),
        }

        assert!(tmp.path().join("pkg/sub/b.py").exists());
        assert!(tmp.path().join("pkg/sub/__init__.py").exists());
        let a_text = fs::read_to_string(tmp.path().join("pkg/a.py")).unwrap();
        assert!(a_text.contains("from .sub import b"));
    }
}
