//! Wiki directory scanning.
//!
//! First pass of the build. Reads every page in the source directory, derives
//! its title, sort key and anchor, sorts the pages, and builds the
//! [`AnchorMap`]. Nothing is rewritten here: link rewriting needs the complete
//! anchor map, so it can only start once this pass is done.
//!
//! ## Directory Layout
//!
//! ```text
//! wiki/                          # Checked-out <repo>.wiki repository
//! ├── wikicat.toml               # Optional config
//! ├── Home.md                    # Excluded (default exclusion list)
//! ├── _Sidebar.md                # Excluded
//! ├── 01-Introduction.md         # Ordered page
//! ├── 02-Setup.md
//! ├── 02a-Advanced-Setup.md      # Letter suffix sorts after 02
//! ├── FAQ.md                     # Unordered: sorts after all numbered pages
//! └── diagram.png                # Not a page
//! ```
//!
//! Only the top level is read. Hidden files are skipped.

use crate::anchors::{AnchorMap, anchor_slug};
use crate::config::{PagesConfig, TitleSource, WikiConfig};
use crate::naming::{self, fallback_title};
use crate::types::Page;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Loaded wiki: pages in document order plus the anchor map built from them.
#[derive(Debug)]
pub struct Wiki {
    pub pages: Vec<Page>,
    pub anchors: AnchorMap,
}

pub fn scan(root: &Path, config: &WikiConfig) -> Result<Wiki, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut pages = Vec::new();
    for path in collect_page_files(root, &config.pages)? {
        let bytes = fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        pages.push(load_page(&file_name, &text, config.document.title_source));
    }

    sort_pages(&mut pages);
    for dup in duplicate_anchors(&pages) {
        log::warn!(
            "{} and {} share the anchor #{}; contents links to the second page jump to the first",
            dup.first,
            dup.second,
            dup.anchor
        );
    }
    let anchors = AnchorMap::from_pages(&pages);
    log::debug!(
        "scanned {} pages, {} anchor keys",
        pages.len(),
        anchors.len()
    );
    for (key, anchor) in anchors.iter() {
        log::trace!("{key:?} -> #{anchor}");
    }

    Ok(Wiki { pages, anchors })
}

/// List page files directly under `root`, sorted by filename.
fn collect_page_files(root: &Path, pages: &PagesConfig) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || pages.exclude.iter().any(|e| *e == name) {
            continue;
        }
        let matches_ext = entry
            .path()
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(&pages.extension));
        if matches_ext {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Build a [`Page`] from a filename and its decoded text.
pub fn load_page(file_name: &str, text: &str, title_source: TitleSource) -> Page {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.replace("\r\n", "\n");
    let text = text.as_str();
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());

    let title = derive_title(&stem, text, title_source);
    let mut anchor = anchor_slug(&title);
    if anchor.is_empty() {
        // Titles without any ASCII alphanumerics still need a jump target
        anchor = anchor_slug(&stem);
    }
    if anchor.is_empty() {
        anchor = "page".to_string();
    }

    Page {
        file_name: file_name.to_string(),
        sort_key: naming::sort_key(&stem),
        stem,
        title,
        anchor,
        raw: text.to_string(),
    }
}

/// Display title for a page under the given policy.
pub fn derive_title(stem: &str, text: &str, title_source: TitleSource) -> String {
    let from_file = || {
        let t = fallback_title(stem);
        if t.is_empty() { stem.to_string() } else { t }
    };
    match title_source {
        TitleSource::Heading => first_heading(text).unwrap_or_else(from_file),
        TitleSource::Filename => from_file(),
    }
}

/// Text of the first top-level heading, ATX or setext, outside code blocks.
///
/// Inline markup is flattened to its text (`# Using *fast* mode` →
/// `Using fast mode`).
pub fn first_heading(text: &str) -> Option<String> {
    let mut in_h1 = false;
    let mut title = String::new();
    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => {
                in_h1 = true;
                title.clear();
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let trimmed = title.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
                in_h1 = false;
            }
            Event::Text(t) | Event::Code(t) if in_h1 => title.push_str(&t),
            Event::SoftBreak | Event::HardBreak if in_h1 => title.push(' '),
            _ => {}
        }
    }
    None
}

/// Two pages that ended up with the same anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateAnchor {
    pub anchor: String,
    /// File name of the earlier page in document order
    pub first: String,
    pub second: String,
}

/// Pages whose anchor is already used by an earlier page.
pub fn duplicate_anchors(pages: &[Page]) -> Vec<DuplicateAnchor> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut dups = Vec::new();
    for page in pages {
        match seen.get(page.anchor.as_str()) {
            Some(first) => dups.push(DuplicateAnchor {
                anchor: page.anchor.clone(),
                first: first.to_string(),
                second: page.file_name.clone(),
            }),
            None => {
                seen.insert(&page.anchor, &page.file_name);
            }
        }
    }
    dups
}

/// Sort pages by `(number, letter)`, unordered last, ties by lowercase filename.
pub fn sort_pages(pages: &mut [Page]) {
    pages.sort_by(|a, b| {
        a.sort_key
            .cmp(&b.sort_key)
            .then_with(|| a.file_name.to_lowercase().cmp(&b.file_name.to_lowercase()))
    });
}
