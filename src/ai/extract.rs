//! Output Extraction
//!
//! Best-effort recovery of structured content (JSON or Markdown) from
//! free-text model output. Collaborators are instructed to emit fenced JSON
//! or a front-matter Markdown document, but in practice wrap their answers
//! in prose, stray fences, and partial formatting. Each rule below targets
//! one concrete failure mode.
//!
//! ## Precedence (first match wins)
//!
//! 1. Markdown document with YAML front matter - returned from the opening
//!    `---` line through the end of the input
//! 2. Fenced block labeled `markdown` - inner content
//! 3. Fenced block labeled `json` (or unlabeled) - inner text, only if it
//!    parses as JSON
//! 4. Brace-matched line scan - accumulated `{..}` block, only if it parses
//! 5. Naive first-`{` to last-`}` substring, only if it parses
//! 6. The trimmed input
//!
//! Front matter is checked before the JSON fence deliberately: the synthesis
//! stage emits a complete front-matter document that may embed JSON example
//! blocks, and those must not shadow the document. The JSON-producing stages
//! never emit front matter, so rules 3-5 still apply to them unchanged.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static MARKDOWN_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```markdown\s*(.*?)\s*```").expect("markdown fence regex")
});

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("json fence regex")
});

/// Extract the most plausible structured payload from raw collaborator output.
///
/// Never fails: when no rule matches, the trimmed input is returned as-is.
/// The result is a string; callers that expect JSON attempt the parse
/// themselves (the extractor only guarantees that JSON-rule matches parsed
/// at extraction time).
pub fn extract_clean_output(raw: &str) -> String {
    if let Some(doc) = find_front_matter_document(raw) {
        return doc.to_string();
    }

    if let Some(caps) = MARKDOWN_FENCE.captures(raw) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().to_string();
        }
    }

    if let Some(caps) = JSON_FENCE.captures(raw) {
        if let Some(inner) = caps.get(1) {
            if is_valid_json(inner.as_str()) {
                return inner.as_str().to_string();
            }
        }
    }

    if let Some(block) = brace_matched_scan(raw) {
        if is_valid_json(&block) {
            return block;
        }
    }

    if let Some(candidate) = naive_brace_span(raw) {
        if is_valid_json(candidate) {
            return candidate.to_string();
        }
    }

    raw.trim().to_string()
}

fn is_valid_json(s: &str) -> bool {
    serde_json::from_str::<Value>(s).is_ok()
}

/// Locate a front-matter Markdown document embedded in the input.
///
/// The opening delimiter is the first line that is exactly `---` (modulo
/// trailing whitespace); the closing delimiter is the *first* subsequent
/// `---` line, with at least one line of metadata between them. The returned
/// span runs from the start of the opening line to the end of the input.
fn find_front_matter_document(raw: &str) -> Option<&str> {
    let mut delimiters = Vec::new();
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        if line.trim_end() == "---" {
            delimiters.push((offset, line));
        }
        offset += line.len();
    }

    let (open_offset, _) = *delimiters.first()?;
    let (close_offset, close_line) = *delimiters.get(1)?;

    // An empty metadata block is a horizontal-rule pair, not front matter.
    let open_line_len = raw[open_offset..].split_inclusive('\n').next()?.len();
    if close_offset <= open_offset + open_line_len {
        return None;
    }

    // The closing delimiter must be a complete line.
    if !close_line.ends_with('\n') && close_offset + close_line.len() != raw.len() {
        return None;
    }

    Some(&raw[open_offset..])
}

/// Line-by-line brace-matched scan.
///
/// Starts accumulating at the first line containing `{`, tracks the running
/// `{` minus `}` count across accumulated lines, and stops once the count
/// falls to zero or below. The accumulated block is then trimmed to the span
/// between its first `{` and last `}`.
fn brace_matched_scan(raw: &str) -> Option<String> {
    let mut accumulating = false;
    let mut depth: i64 = 0;
    let mut block = String::new();

    for line in raw.lines() {
        if !accumulating {
            if !line.contains('{') {
                continue;
            }
            accumulating = true;
        }

        block.push_str(line);
        block.push('\n');
        depth += line.matches('{').count() as i64;
        depth -= line.matches('}').count() as i64;

        if depth <= 0 {
            break;
        }
    }

    if !accumulating {
        return None;
    }

    let start = block.find('{')?;
    let end = block.rfind('}')?;
    if end < start {
        return None;
    }
    Some(block[start..=end].to_string())
}

/// Last-resort span from the first `{` anywhere to the last `}` anywhere.
fn naive_brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
