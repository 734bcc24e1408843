//! Produces unified diffs from (old, new) text pairs, and the two
//! annotation lines for file renames/moves (§6, "Dry-run output").

use std::fmt::Write as _;
use std::path::Path;

use similar::TextDiff;

/// Kind of path-level change a diff entry may additionally describe, on
/// top of its text changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathChange {
    None,
    Rename,
    Move,
}

/// One changed file: its relative path, the unified diff of its text
/// (empty if only a path change with no text edits), and any path-level
/// change.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub relative_path: std::path::PathBuf,
    pub diff_text: String,
}

/// Renders a unified diff between `old_text` and `new_text` using
/// `a/<rel>` and `b/<rel>` headers, per §6.
pub fn unified_diff(relative_path: &Path, old_text: &str, new_text: &str) -> String {
    let rel = relative_path.to_string_lossy().replace('\\', "/");
    let diff = TextDiff::from_lines(old_text, new_text);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{rel}"), &format!("b/{rel}"))
        .to_string()
}

/// Appends the `rename from <old>` / `rename to <new>` annotation lines
/// (or `move from`/`move to`) to an existing diff body.
pub fn with_path_change_annotation(
    mut diff_text: String,
    old_relative: &Path,
    new_relative: &Path,
    kind: PathChange,
) -> String {
    let (from_label, to_label) = match kind {
        PathChange::None => return diff_text,
        PathChange::Rename => ("rename from", "rename to"),
        PathChange::Move => ("move from", "move to"),
    };

    let mut annotation = String::new();
    let _ = writeln!(
        annotation,
        "{from_label} {}",
        old_relative.to_string_lossy().replace('\\', "/")
    );
    let _ = writeln!(
        annotation,
        "{to_label} {}",
        new_relative.to_string_lossy().replace('\\', "/")
    );
    annotation.push_str(&diff_text);
    diff_text = annotation;
    diff_text
}

/// Builds a `FileDiff` for a changed file, given its path (relative to
/// the project root) and old/new text. Returns `None` when the text is
/// unchanged and there's no path change to annotate - a no-op edit
/// produces no diff entry at all (§8, "no phantom edits").
pub fn file_diff(
    relative_path: &Path,
    old_text: &str,
    new_text: &str,
    path_change: Option<(&Path, &Path, PathChange)>,
) -> Option<FileDiff> {
    if old_text == new_text && path_change.is_none() {
        return None;
    }

    let mut diff_text = if old_text == new_text {
        String::new()
    } else {
        unified_diff(relative_path, old_text, new_text)
    };

    if let Some((old_rel, new_rel, kind)) = path_change {
        diff_text = with_path_change_annotation(diff_text, old_rel, new_rel, kind);
    }

    Some(FileDiff {
        relative_path: relative_path.to_path_buf(),
        diff_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unified_diff_uses_a_b_headers() {
        let diff = unified_diff(Path::new("pkg/mod.py"), "x = 1\n", "x = 2\n");
        assert!(diff.contains("--- a/pkg/mod.py"));
        assert!(diff.contains("+++ b/pkg/mod.py"));
        assert!(diff.contains("-x = 1"));
        assert!(diff.contains("+x = 2"));
    }

    #[test]
    fn file_diff_returns_none_for_unchanged_text_without_path_change() {
        let result = file_diff(Path::new("mod.py"), "x = 1\n", "x = 1\n", None);
        assert!(result.is_none());
    }

    #[test]
    fn file_diff_annotates_rename() {
        let result = file_diff(
            Path::new("new_name.py"),
            "x = 1\n",
            "x = 1\n",
            Some((
                &PathBuf::from("old_name.py"),
                &PathBuf::from("new_name.py"),
                PathChange::Rename,
            )),
        )
        .unwrap();
        assert!(result.diff_text.starts_with("rename from old_name.py\nrename to new_name.py\n"));
    }

    #[test]
    fn file_diff_annotates_move() {
        let result = file_diff(
            Path::new("pkg/sub/mod.py"),
            "x = 1\n",
            "x = 1\n",
            Some((
                &PathBuf::from("pkg/mod.py"),
                &PathBuf::from("pkg/sub/mod.py"),
                PathChange::Move,
            )),
        )
        .unwrap();
        assert!(result.diff_text.starts_with("move from pkg/mod.py\nmove to pkg/sub/mod.py\n"));
    }
}
