use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A 1-indexed line, 0-indexed column position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub(crate) fn from_tree_sitter(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row + 1,
            column: point.column,
        }
    }
}

/// A span within a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, start: Position, end: Position) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}
