//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! The primary display for every page is its semantic identity: position,
//! ordering label, title and anchor. The source filename is secondary context
//! on an indented `Source:` line.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Pages
//! 001 [01] Introduction → #introduction
//!     Source: 01-Introduction.md
//! 002 [02] 02 Setup Guide → #02-setup-guide
//!     Source: 02-Setup.md
//! 003 [--] FAQ → #faq
//!     Source: FAQ.md
//!
//! Config
//!     wikicat.toml
//! ```
//!
//! ## Check
//!
//! ```text
//! Unresolved links
//! 02-Setup.md
//!     [[Missing Page]]
//!     (Missing.md)
//!
//! 2 unresolved links in 5 pages
//! ```
//!
//! ## Build
//!
//! ```text
//! Generated dist/wiki.md (5 pages)
//! Images: 3 fetched, 1 failed
//! Saved 3 images to dist/images
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::assemble::BuildReport;
use crate::config::CONFIG_FILENAME;
use crate::links::{LinkKind, PageLinks, UnresolvedLink};
use crate::scan::Wiki;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn link_display(link: &UnresolvedLink) -> String {
    match link.kind {
        LinkKind::Wiki => format!("[[{}]]", link.target),
        LinkKind::Markdown => format!("({})", link.target),
    }
}

/// Format the page inventory in document order.
///
/// `has_config_file` controls whether the `Config` section lists a config file.
pub fn format_scan_output(wiki: &Wiki, has_config_file: bool) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in wiki.pages.iter().enumerate() {
        lines.push(format!(
            "{} [{}] {} → #{}",
            format_index(i + 1),
            page.sort_key.label(),
            page.title,
            page.anchor
        ));
        lines.push(format!("    Source: {}", page.file_name));
    }
    if wiki.pages.is_empty() {
        lines.push("    (no pages)".to_string());
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if has_config_file {
        lines.push(format!("    {CONFIG_FILENAME}"));
    } else {
        lines.push("    (defaults)".to_string());
    }
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(wiki: &Wiki, has_config_file: bool) {
    for line in format_scan_output(wiki, has_config_file) {
        println!("{}", line);
    }
}

/// Format unresolved internal links, grouped by page.
pub fn format_check_output(report: &[PageLinks], page_count: usize) -> Vec<String> {
    let total: usize = report.iter().map(|p| p.missing.len()).sum();
    if total == 0 {
        return vec![format!(
            "All internal links resolve ({})",
            plural(page_count, "page")
        )];
    }

    let mut lines = vec!["Unresolved links".to_string()];
    for page in report.iter().filter(|p| !p.missing.is_empty()) {
        lines.push(page.file_name.clone());
        for link in &page.missing {
            lines.push(format!("    {}", link_display(link)));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{} in {}",
        plural(total, "unresolved link"),
        plural(page_count, "page")
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &[PageLinks], page_count: usize) {
    for line in format_check_output(report, page_count) {
        println!("{}", line);
    }
}

/// Format the build confirmation.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Generated {} ({})",
        report.output.display(),
        plural(report.pages, "page")
    )];
    let stats = report.images;
    if stats.fetched + stats.failed > 0 {
        lines.push(format!(
            "Images: {} fetched, {} failed",
            stats.fetched, stats.failed
        ));
    }
    if let Some(dir) = &report.images_dir {
        lines.push(format!(
            "Saved {} to {}",
            plural(stats.saved, "image"),
            dir.display()
        ));
    }
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}
