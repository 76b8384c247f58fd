//! Shared types used by the scan, rewrite and assemble stages.

use crate::naming::SortKey;
use serde::Serialize;

/// One wiki page, loaded from a markdown file in the source directory.
///
/// Pages are immutable once loaded. Rewriting produces new strings from
/// [`Page::raw`] and never edits it in place.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Source filename, e.g. `02-Setup.md`
    pub file_name: String,
    /// Filename without extension, e.g. `02-Setup`
    pub stem: String,
    /// Display title (see [`crate::config::TitleSource`])
    pub title: String,
    /// Ordering parsed from the filename stem
    pub sort_key: SortKey,
    /// Canonical in-document anchor, derived from the title
    pub anchor: String,
    /// Source text as loaded (invalid UTF-8 replaced, BOM removed, CRLF as LF)
    #[serde(skip)]
    pub raw: String,
}
