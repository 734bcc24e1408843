//! Parses the user-facing target string into one of three shapes.
//!
//! ```text
//! target  := name_target | multi_target | pos_target
//! name_target  := path "::" ident
//! multi_target := path "::" ident ("," ident)+
//! pos_target   := path ":" integer ":" integer
//! ```

use crate::error::RefactorError;
use crate::location::Position;
use regex::Regex;
use std::path::PathBuf;

/// A parsed target, resolved to a concrete file plus whatever identifies
/// the symbol within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `path::ident`
    ByName { path: PathBuf, name: String },
    /// `path::ident,ident,...` - move only.
    ByNames { path: PathBuf, names: Vec<String> },
    /// `path:line:col`
    ByPosition {
        path: PathBuf,
        line: usize,
        column: usize,
    },
}

impl Target {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::ByName { path, .. } | Self::ByNames { path, .. } | Self::ByPosition { path, .. } => path,
        }
    }
}

/// Parses `input` against the target grammar, checking in order:
/// multi-name, single-name, then position. `extension` is the required
/// source-file suffix (without the leading dot).
pub fn parse_target(input: &str, extension: &str) -> Result<Target, RefactorError> {
    let multi_re = Regex::new(&format!(
        r"^(?P<path>.+\.{})::(?P<idents>[A-Za-z_][A-Za-z0-9_]*(?:,[A-Za-z_][A-Za-z0-9_]*)+)$",
        regex::escape(extension)
    ))
    .expect("multi-name target regex is a valid pattern");

    if let Some(caps) = multi_re.captures(input) {
        let path = PathBuf::from(&caps["path"]);
        let names = caps["idents"].split(',').map(str::to_string).collect();
        return Ok(Target::ByNames { path, names });
    }

    let name_re = Regex::new(&format!(
        r"^(?P<path>.+\.{})::(?P<ident>[A-Za-z_][A-Za-z0-9_]*)$",
        regex::escape(extension)
    ))
    .expect("name target regex is a valid pattern");

    if let Some(caps) = name_re.captures(input) {
        let path = PathBuf::from(&caps["path"]);
        let name = caps["ident"].to_string();
        return Ok(Target::ByName { path, name });
    }

    let pos_re = Regex::new(&format!(
        r"^(?P<path>.+\.{}):(?P<line>\d+):(?P<col>\d+)$",
        regex::escape(extension)
    ))
    .expect("position target regex is a valid pattern");

    if let Some(caps) = pos_re.captures(input) {
        let path = PathBuf::from(&caps["path"]);
        let line: usize = caps["line"].parse().map_err(|_| RefactorError::TargetParse {
            input: input.to_string(),
            reason: "line number out of range".to_string(),
        })?;
        let column: usize = caps["col"].parse().map_err(|_| RefactorError::TargetParse {
            input: input.to_string(),
            reason: "column number out of range".to_string(),
        })?;
        return Ok(Target::ByPosition { path, line, column });
    }

    Err(RefactorError::TargetParse {
        input: input.to_string(),
        reason: format!("does not match name, multi-name, or position grammar for `.{extension}` files"),
    })
}

/// Expands the identifier touching `position` in `source`, per §4.2:
/// walk backward while alphanumeric/underscore, then forward the same way.
/// The resulting slice must start with a letter or underscore.
pub fn expand_identifier_at(source: &str, position: Position) -> Option<String> {
    let offset = byte_offset_for(source, position)?;
    let bytes = source.as_bytes();

    let is_ident_char = |b: u8| b.is_ascii_alphanumeric() || b == b'_';

    let mut start = offset;
    while start > 0 && is_ident_char(bytes[start - 1]) {
        start -= 1;
    }

    let mut end = offset;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }

    if start >= end {
        return None;
    }

    let slice = &source[start..end];
    let first = slice.chars().next()?;
    if first.is_alphabetic() || first == '_' {
        Some(slice.to_string())
    } else {
        None
    }
}

fn byte_offset_for(source: &str, position: Position) -> Option<usize> {
    let mut offset = 0usize;
    for (line_idx, line) in source.split_inclusive('\n').enumerate() {
        if line_idx + 1 == position.line {
            let stripped_len = line.trim_end_matches('\n').len();
            let column = position.column.min(stripped_len);
            return Some(offset + column);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_name_target() {
        let target = parse_target("pkg/mod.py::helper", "py").unwrap();
        assert_eq!(
            target,
            Target::ByName {
                path: PathBuf::from("pkg/mod.py"),
                name: "helper".to_string(),
            }
        );
    }

    #[test]
    fn parses_multi_name_target() {
        let target = parse_target("pkg/mod.py::a,b,c", "py").unwrap();
        assert_eq!(
            target,
            Target::ByNames {
                path: PathBuf::from("pkg/mod.py"),
                names: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }
        );
    }

    #[test]
    fn parses_position_target() {
        let target = parse_target("pkg/mod.py:10:4", "py").unwrap();
        assert_eq!(
            target,
            Target::ByPosition {
                path: PathBuf::from("pkg/mod.py"),
                line: 10,
                column: 4,
            }
        );
    }

    #[test]
    fn rejects_wrong_extension() {
        assert!(parse_target("pkg/mod.txt::helper", "py").is_err());
    }

    #[test]
    fn expands_identifier_at_position() {
        let source = "def helper_function(x):\n    return x\n";
        let found = expand_identifier_at(source, Position::new(1, 4)).unwrap();
        assert_eq!(found, "helper_function");
    }

    #[test]
    fn rejects_position_not_starting_with_letter_or_underscore() {
        let source = "x = 123\n";
        assert_eq!(expand_identifier_at(source, Position::new(1, 4)), None);
    }
}
