//! Enumerates source files under a project root and maps file paths to
//! dotted module names.
//!
//! The walk is a plain recursive directory scan rather than an
//! `ignore::WalkBuilder` pass: the spec's exclusion list is a fixed set of
//! directory names, not a `.gitignore` dialect, so pulling in gitignore
//! semantics here would just be a wrong abstraction for what this component
//! does (see DESIGN.md).

use std::fs;
use std::path::{Path, PathBuf};

/// Directory names skipped outright, on top of any name starting with `.`.
const EXCLUDED_DIR_NAMES: &[&str] = &["__pycache__", "node_modules", ".git", "venv", ".venv"];

/// The conventional package-marker stem (`__init__`), dropped from the end
/// of a module path and used to seed new package directories.
pub const PACKAGE_MARKER_STEM: &str = "__init__";

fn is_excluded_dir(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIR_NAMES.contains(&name)
}

/// Recursively collects every file under `root` whose extension matches
/// `extension` (without the leading dot), skipping excluded directories.
///
/// Returns paths in lexicographic order so callers that need a stable scan
/// order (the symbol table's per-name ordering, §3) don't have to sort
/// separately.
pub fn walk_source_files(root: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(root, extension, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_dir() {
            if !is_excluded_dir(&name) {
                walk_dir(&path, extension, out)?;
            }
        } else if file_type.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(extension)
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Computes the dotted module name for `file`, relative to `root`.
///
/// Strips the source extension, replaces directory separators with `.`,
/// and drops a trailing `__init__` component.
pub fn module_of(root: &Path, file: &Path, extension: &str) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let without_ext = relative.with_extension("");
    let mut components: Vec<String> = without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if components.last().map(String::as_str) == Some(PACKAGE_MARKER_STEM) {
        components.pop();
    }

    components.join(".")
}

/// Resolves a relative import's `(depth, dotted_remainder)` to an
/// absolute dotted module, given the file the import statement lives in.
///
/// Depth 1 means "the importer's own package" (for a regular module,
/// its containing directory; for a package-marker file, the package
/// itself, since `module_of` already drops the trailing `__init__`).
/// Each additional dot walks one more level up.
pub fn resolve_relative_import(
    root: &Path,
    importer_file: &Path,
    extension: &str,
    depth: usize,
    dotted_remainder: &str,
) -> String {
    let importer_module = module_of(root, importer_file, extension);
    let is_package_init = importer_file.file_stem().and_then(|s| s.to_str()) == Some(PACKAGE_MARKER_STEM);

    let mut components: Vec<&str> = importer_module.split('.').filter(|s| !s.is_empty()).collect();
    if !is_package_init {
        components.pop();
    }
    for _ in 0..depth.saturating_sub(1) {
        components.pop();
    }

    if !dotted_remainder.is_empty() {
        components.extend(dotted_remainder.split('.'));
    }

    components.join(".")
}

/// Computes the file path a module name would live at, given `extension`.
pub fn path_for_module(root: &Path, module: &str, extension: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in module.split('.') {
        path.push(component);
    }
    path.set_extension(extension);
    path
}

/// Content written into a newly created package-marker file.
pub const PACKAGE_MARKER_CONTENT: &str = "\"\"\"Package marker.\"\"\"\n";

/// Lists the package-marker files that would need to be created to make
/// every intermediate directory between `root` and `dir` (exclusive of
/// `root`) a package, without touching the filesystem. Used by the planner
/// so a dry run can report these as additions without creating them.
pub fn missing_package_markers(root: &Path, dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(relative) = dir.strip_prefix(root) else {
        return out;
    };

    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        let marker = current.join(format!("{PACKAGE_MARKER_STEM}.{extension}"));
        if !marker.exists() {
            out.push(marker);
        }
    }
    out
}

/// Creates any missing intermediate package directories between `root` and
/// `dir` (exclusive of `root`), seeding each new directory with a
/// package-marker file unless one already exists.
///
/// The marker's content is a single module-docstring line; existing markers
/// are never overwritten.
pub fn ensure_package_markers(root: &Path, dir: &Path, extension: &str) -> anyhow::Result<()> {
    for marker in missing_package_markers(root, dir, extension) {
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&marker, PACKAGE_MARKER_CONTENT)?;
    }
    Ok(())
}

/// Computes the relative-import spec (leading dots plus dotted remainder)
/// that `importer_file` would need to use, at `depth`, to reach
/// `new_absolute_module` - the inverse of `resolve_relative_import`.
///
/// Falls back to `new_absolute_module` as an absolute replacement if the
/// importer's base package at `depth` isn't a prefix of the new module
/// (the new target moved out from under what `depth` dots can reach).
pub fn relative_spec_for(
    root: &Path,
    importer_file: &Path,
    extension: &str,
    depth: usize,
    new_absolute_module: &str,
) -> String {
    let importer_module = module_of(root, importer_file, extension);
    let is_package_init = importer_file.file_stem().and_then(|s| s.to_str()) == Some(PACKAGE_MARKER_STEM);

    let mut base: Vec<&str> = importer_module.split('.').filter(|s| !s.is_empty()).collect();
    if !is_package_init {
        base.pop();
    }
    for _ in 0..depth.saturating_sub(1) {
        base.pop();
    }

    let new_components: Vec<&str> = new_absolute_module.split('.').filter(|s| !s.is_empty()).collect();
    if new_components.len() >= base.len() && new_components[..base.len()] == base[..] {
        let remainder = &new_components[base.len()..];
        format!("{}{}", ".".repeat(depth), remainder.join("."))
    } else {
        new_absolute_module.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn module_of_strips_extension_and_joins_components() {
        let root = Path::new("/proj");
        let file = Path::new("/proj/pkg/sub/mod.py");
        assert_eq!(module_of(root, file, "py"), "pkg.sub.mod");
    }

    #[test]
    fn module_of_drops_trailing_init() {
        let root = Path::new("/proj");
        let file = Path::new("/proj/pkg/__init__.py");
        assert_eq!(module_of(root, file, "py"), "pkg");
    }

    #[test]
    fn walk_skips_hidden_and_cache_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("pkg/mod.py"), "x = 1\n").unwrap();
        fs::write(root.join("__pycache__/mod.cpython.py"), "x = 1\n").unwrap();
        fs::write(root.join(".git/mod.py"), "x = 1\n").unwrap();

        let files = walk_source_files(root, "py").unwrap();
        assert_eq!(files, vec![root.join("pkg/mod.py")]);
    }

    #[test]
    fn resolves_bare_relative_import_to_containing_package() {
        let root = Path::new("/proj");
        let importer = Path::new("/proj/pkg/a.py");
        assert_eq!(resolve_relative_import(root, importer, "py", 1, ""), "pkg");
    }

    #[test]
    fn resolves_relative_import_with_dotted_remainder() {
        let root = Path::new("/proj");
        let importer = Path::new("/proj/pkg/a.py");
        assert_eq!(resolve_relative_import(root, importer, "py", 1, "sub"), "pkg.sub");
    }

    #[test]
    fn resolves_relative_import_from_package_init() {
        let root = Path::new("/proj");
        let importer = Path::new("/proj/pkg/__init__.py");
        assert_eq!(resolve_relative_import(root, importer, "py", 1, "sub"), "pkg.sub");
    }

    #[test]
    fn relative_spec_for_recomputes_dotted_remainder() {
        let root = Path::new("/proj");
        let importer = Path::new("/proj/pkg/a.py");
        assert_eq!(relative_spec_for(root, importer, "py", 1, "pkg.sub.b"), ".sub.b");
    }

    #[test]
    fn relative_spec_for_falls_back_to_absolute_when_out_of_reach() {
        let root = Path::new("/proj");
        let importer = Path::new("/proj/pkg/a.py");
        assert_eq!(relative_spec_for(root, importer, "py", 1, "other.b"), "other.b");
    }

    #[test]
    fn missing_package_markers_lists_only_absent_ones() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "\"\"\"Existing.\"\"\"\n").unwrap();

        let missing = missing_package_markers(root, &root.join("pkg/sub"), "py");
        assert_eq!(missing, vec![root.join("pkg/sub/__init__.py")]);
    }

    #[test]
    fn ensure_package_markers_does_not_overwrite_existing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "\"\"\"Existing.\"\"\"\n").unwrap();

        ensure_package_markers(root, &root.join("pkg/sub"), "py").unwrap();

        let existing = fs::read_to_string(root.join("pkg/__init__.py")).unwrap();
        assert_eq!(existing, "\"\"\"Existing.\"\"\"\n");
        assert!(root.join("pkg/sub/__init__.py").exists());
    }
}
