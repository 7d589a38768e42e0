//! # redgreen-extract
//!
//! Turns free-form model output into `(path, content)` file blocks.
//!
//! The generation backend enforces no output schema, so extraction runs an
//! ordered chain of pattern matchers, each targeting a layout models commonly
//! produce. The first pattern that yields at least one block wins; later
//! patterns are never consulted for input an earlier one matched. The chain
//! deliberately trades precision for recall: a later pattern might fit a
//! truncated response better, but first-match-wins keeps precedence a total
//! order.
//!
//! Layouts, in precedence order:
//! 1. `### path` heading followed by a fenced code block
//! 2. a bare file-path line followed by a fenced code block
//! 3. a `File: path` label followed by a fenced code block
//! 4. layout 1 with the closing fence missing (truncated response)
//! 5. layout 2 with the closing fence missing
//! 6. a single untagged fenced block, attributed to a caller-supplied
//!    default path
//!
//! Zero blocks after the whole chain is a hard failure for the caller.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// One extracted file: workspace-relative path plus full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub path: String,
    pub content: String,
}

lazy_static! {
    static ref HEADING_FENCED: Regex = Regex::new(
        r"(?s)###\s*(?P<path>[^\n]+?)\s*\n```[A-Za-z0-9_+-]*\n(?P<content>.*?)\n```"
    )
    .unwrap();
    static ref PATH_LINE_FENCED: Regex = Regex::new(
        r"(?sm)^(?P<path>[\w./-]+\.\w+)\s*\n```[A-Za-z0-9_+-]*\n(?P<content>.*?)\n```"
    )
    .unwrap();
    static ref FILE_LABEL_FENCED: Regex = Regex::new(
        r"(?si)file:\s*(?P<path>[^\n]+?\.\w+)\s*\n```[A-Za-z0-9_+-]*\n(?P<content>.*?)\n```"
    )
    .unwrap();
    static ref HEADING_OPEN: Regex = Regex::new(
        r"(?s)###\s*(?P<path>[^\n]+?)\s*\n```[A-Za-z0-9_+-]*\n(?P<content>.*?)(?:\n```|\z)"
    )
    .unwrap();
    static ref PATH_LINE_OPEN: Regex = Regex::new(
        r"(?sm)^(?P<path>[\w./-]+\.\w+)\s*\n```[A-Za-z0-9_+-]*\n(?P<content>.*?)(?:\n```|\z)"
    )
    .unwrap();
    static ref BARE_FENCE: Regex =
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*\n(?P<content>.*?)(?:\n```|\z)").unwrap();
}

/// Extract file blocks from generated text.
///
/// `default_path` feeds the final fence-only fallback: when the text holds
/// exactly one untagged code block and no path was recoverable, that block is
/// attributed to `default_path`. Callers that cannot accept a pathless block
/// (the Tester) pass `None`, which disables the fallback.
pub fn extract_file_blocks(text: &str, default_path: Option<&str>) -> Vec<FileBlock> {
    let patterns: [(&str, &Regex); 5] = [
        ("heading", &HEADING_FENCED),
        ("path-line", &PATH_LINE_FENCED),
        ("file-label", &FILE_LABEL_FENCED),
        ("heading-open", &HEADING_OPEN),
        ("path-line-open", &PATH_LINE_OPEN),
    ];

    for (name, pattern) in patterns {
        let blocks: Vec<FileBlock> = pattern
            .captures_iter(text)
            .map(|caps| FileBlock {
                path: clean_path(&caps["path"]),
                content: caps["content"].trim().to_string(),
            })
            .filter(|block| !block.path.is_empty())
            .collect();

        if !blocks.is_empty() {
            debug!(pattern = name, count = blocks.len(), "Extracted file blocks");
            return blocks;
        }
    }

    // Last resort: a lone untagged block is attributed to the default path.
    if let Some(default) = default_path {
        let mut fences = BARE_FENCE.captures_iter(text);
        if let (Some(caps), None) = (fences.next(), fences.next()) {
            debug!(path = default, "No path found; using default for single code block");
            return vec![FileBlock {
                path: default.to_string(),
                content: caps["content"].trim().to_string(),
            }];
        }
    }

    Vec::new()
}

fn clean_path(raw: &str) -> String {
    raw.trim().trim_matches('`').trim().to_string()
}
