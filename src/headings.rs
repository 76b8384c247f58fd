//! Heading normalization for concatenated pages.
//!
//! Each page becomes one section of the assembled document, so the top heading
//! level is reserved for page titles:
//!
//! 1. Setext headings (`Title` over `=====` / `-----`) become ATX (`#` / `##`).
//! 2. A leading top-level heading is removed. The page title replaces it.
//! 3. Remaining headings outside fenced code are demoted one level (max 6).
//! 4. `# {title}` is prepended.
//!
//! When step 2 removed a heading and the rest of the page has no top-level
//! heading, the body already sits under a title and step 3 is skipped. This
//! keeps [`normalize_page`] stable when applied to its own output.

use regex::Regex;
use std::sync::LazyLock;

static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?P<hashes>#{1,6})(?P<sp>[ \t]+)(?P<text>.+?)\s*$").expect("valid regex")
});

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(=+|-+)\s*$").expect("valid regex"));

const MAX_LEVEL: usize = 6;

/// Fence lines toggle code-block state: ```` ``` ```` or `~~~`, any indent.
fn is_fence(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("```") || t.starts_with("~~~")
}

/// Level of an ATX heading line, if it is one. Up to three spaces of indent
/// are allowed, as in CommonMark.
fn heading_level(line: &str) -> Option<usize> {
    ATX_HEADING.captures(line).map(|c| c["hashes"].len())
}

/// Convert setext headings outside code fences to ATX form.
pub fn convert_setext_headings(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_code = false;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_fence(line) {
            in_code = !in_code;
            out.push(line.to_string());
            i += 1;
            continue;
        }
        let title = line.trim();
        let indent = line.len() - line.trim_start_matches(' ').len();
        let is_setext = !in_code
            && !title.is_empty()
            && indent <= 3
            && heading_level(line).is_none()
            && !SETEXT_UNDERLINE.is_match(line)
            && lines
                .get(i + 1)
                .is_some_and(|next| SETEXT_UNDERLINE.is_match(next));
        if is_setext {
            let hashes = if lines[i + 1].trim_start().starts_with('=') { "#" } else { "##" };
            out.push(format!("{hashes} {title}"));
            i += 2;
        } else {
            out.push(line.to_string());
            i += 1;
        }
    }
    out.join("\n")
}

/// Demote every ATX heading outside fenced code by one level, capped at 6.
///
/// Heading indentation is dropped from rewritten lines.
///
/// Unbalanced fences are tolerated: everything after an unclosed fence is
/// treated as code.
pub fn demote_headings(text: &str) -> String {
    let mut in_code = false;
    text.split('\n')
        .map(|line| {
            if is_fence(line) {
                in_code = !in_code;
                return line.to_string();
            }
            if in_code {
                return line.to_string();
            }
            match ATX_HEADING.captures(line) {
                Some(c) => {
                    let level = (c["hashes"].len() + 1).min(MAX_LEVEL);
                    format!("{}{}{}", "#".repeat(level), &c["sp"], &c["text"])
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether any level-1 ATX heading appears outside fenced code.
pub fn has_top_level_heading(text: &str) -> bool {
    let mut in_code = false;
    for line in text.split('\n') {
        if is_fence(line) {
            in_code = !in_code;
        } else if !in_code && heading_level(line) == Some(1) {
            return true;
        }
    }
    false
}

/// Split off a leading level-1 heading.
///
/// Returns the text after it (following blank lines dropped), or `None` when
/// the first non-blank line is not a level-1 heading.
pub fn strip_leading_title(text: &str) -> Option<&str> {
    let mut rest = text;
    loop {
        let (line, after) = match rest.split_once('\n') {
            Some((line, after)) => (line, after),
            None => (rest, ""),
        };
        if line.trim().is_empty() {
            if after.is_empty() {
                return None;
            }
            rest = after;
            continue;
        }
        return (heading_level(line) == Some(1)).then(|| after.trim_start_matches(['\n', '\r']));
    }
}

/// Normalize a page into a section headed by `# {title}`.
pub fn normalize_page(title: &str, text: &str) -> String {
    let converted = convert_setext_headings(text);
    let body = match strip_leading_title(&converted) {
        Some(rest) if !has_top_level_heading(rest) => rest.to_string(),
        Some(rest) => demote_headings(rest),
        None => demote_headings(&converted),
    };
    format!("# {title}\n\n{}", body.trim_start())
}
