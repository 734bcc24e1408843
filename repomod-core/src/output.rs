//! Renders a `RefactorResult` as either a human summary or JSON (§6).

use serde::Serialize;
use serde_json::json;
use std::fmt::Write;

use crate::planner::{ChangedFiles, RefactorResult};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Trait for formatting a result in either supported format.
pub trait OutputFormatter {
    fn format(&self, format: OutputFormat) -> String;
    fn format_json(&self) -> String;
    fn format_text(&self) -> String;
}

#[derive(Debug, Serialize)]
struct JsonResult<'a> {
    dry_run: bool,
    diffs: Option<&'a [String]>,
    changed_files: Option<&'a [String]>,
    info_messages: &'a [String],
}

impl OutputFormatter for RefactorResult {
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => self.format_json(),
            OutputFormat::Text => self.format_text(),
        }
    }

    fn format_json(&self) -> String {
        let (dry_run, diffs, changed_files) = match &self.changed {
            ChangedFiles::Diffs(diffs) => (true, Some(diffs.as_slice()), None),
            ChangedFiles::Paths(paths) => {
                let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                (false, None, Some(rendered))
            },
        };

        let payload = JsonResult {
            dry_run,
            diffs,
            changed_files: changed_files.as_deref(),
            info_messages: &self.info_messages,
        };
        serde_json::to_string(&json!({ "success": true, "result": payload })).unwrap_or_default()
    }

    fn format_text(&self) -> String {
        let mut output = String::new();

        match &self.changed {
            ChangedFiles::Diffs(diffs) => {
                if diffs.is_empty() {
                    output.push_str("No changes.\n");
                } else {
                    for diff in diffs {
                        output.push_str(diff);
                        if !diff.ends_with('\n') {
                            output.push('\n');
                        }
                    }
                }
            },
            ChangedFiles::Paths(paths) => {
                if paths.is_empty() {
                    output.push_str("No files changed.\n");
                } else {
                    writeln!(output, "Changed {} file(s):", paths.len()).unwrap();
                    for path in paths {
                        writeln!(output, "  {}", path.display()).unwrap();
                    }
                }
            },
        }

        for message in &self.info_messages {
            writeln!(output, "note: {message}").unwrap();
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn dry_run_text_lists_each_diff() {
        let result = RefactorResult {
            changed: ChangedFiles::Diffs(vec!["--- a/mod.py\n+++ b/mod.py\n".to_string()]),
            info_messages: Vec::new(),
        };
        let text = result.format_text();
        assert!(text.contains("--- a/mod.py"));
    }

    #[test]
    fn dry_run_with_no_changes_says_so() {
        let result = RefactorResult {
            changed: ChangedFiles::Diffs(vec![]),
            info_messages: Vec::new(),
        };
        assert!(result.format_text().contains("No changes"));
    }

    #[test]
    fn committed_text_lists_changed_paths() {
        let result = RefactorResult {
            changed: ChangedFiles::Paths(vec![PathBuf::from("mod.py"), PathBuf::from("main.py")]),
            info_messages: Vec::new(),
        };
        let text = result.format_text();
        assert!(text.contains("Changed 2 file(s)"));
        assert!(text.contains("mod.py"));
        assert!(text.contains("main.py"));
    }

    #[test]
    fn info_messages_are_appended_as_notes() {
        let result = RefactorResult {
            changed: ChangedFiles::Paths(vec![PathBuf::from("mod.py")]),
            info_messages: vec!["also defined elsewhere".to_string()],
        };
        assert!(result.format_text().contains("note: also defined elsewhere"));
    }

    #[test]
    fn json_format_reports_dry_run_flag() {
        let result = RefactorResult {
            changed: ChangedFiles::Diffs(vec!["diff".to_string()]),
            info_messages: Vec::new(),
        };
        let json = result.format_json();
        assert!(json.contains("\"dry_run\":true"));
        assert!(json.contains("\"diffs\""));
    }

    #[test]
    fn json_format_reports_changed_files_when_committed() {
        let result = RefactorResult {
            changed: ChangedFiles::Paths(vec![PathBuf::from("mod.py")]),
            info_messages: Vec::new(),
        };
        let json = result.format_json();
        assert!(json.contains("\"dry_run\":false"));
        assert!(json.contains("\"changed_files\""));
        assert!(json.contains("mod.py"));
    }
}
