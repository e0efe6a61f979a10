//! Logical-line reader for Makefile-like text.
//!
//! Physical lines are turned into logical lines: `#` comments removed
//! (`\#` is a literal hash), trailing whitespace stripped, blank lines
//! skipped and backslash continuations joined.

use std::path::Path;
use tracing::warn;

/// Read `path` and split it into logical lines.
///
/// Bytes that aren't valid UTF-8 are replaced rather than rejected; the
/// generated files occasionally carry Latin-1 paths.
pub fn read_logical_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(logical_lines(&content))
}

pub fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buildup: Option<String> = None;

    for physical in content.lines() {
        let Some(line) = strip_comment(physical) else {
            continue;
        };

        let line = match buildup.take() {
            Some(mut joined) => {
                joined.push_str(&line);
                joined
            }
            None => line,
        };

        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(head) = line.strip_suffix('\\') {
            buildup = Some(head.to_string());
            continue;
        }

        lines.push(line.to_string());
    }

    if let Some(rest) = buildup {
        warn!("continuation line immediately precedes end-of-file");
        lines.push(rest);
    }

    lines
}

/// Returns `None` when the line held only a comment.
fn strip_comment(line: &str) -> Option<String> {
    match line.find('#') {
        None => Some(line.to_string()),
        Some(pos) if pos == 0 || !line[..pos].ends_with('\\') => {
            let kept = &line[..pos];
            if kept.trim().is_empty() {
                None
            } else {
                Some(kept.to_string())
            }
        }
        Some(_) => Some(line.replace("\\#", "#")),
    }
}
