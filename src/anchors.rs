//! Page name → anchor resolution.
//!
//! Every page gets exactly one canonical anchor slug, derived from its title.
//! Wiki links name pages in many spellings (`Setup Guide`, `02-Setup`,
//! `setup_guide`), so the [`AnchorMap`] registers several normalized keys per
//! page, all pointing at the same slug.
//!
//! Keys are registered in page sort order and never overwritten: when two
//! pages share a normalized name, the lower-ordered page claims it.

use crate::naming::strip_numeric_prefix;
use crate::types::Page;
use std::collections::HashMap;

/// URL-fragment slug for a title.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` to a
/// single hyphen, and trims hyphens from both ends.
///
/// ```
/// use wikicat::anchors::anchor_slug;
/// assert_eq!(anchor_slug("02 Setup Guide"), "02-setup-guide");
/// assert_eq!(anchor_slug("  C++ / Rust FFI!  "), "c-rust-ffi");
/// ```
pub fn anchor_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Normalize a page identifier for lookup.
///
/// Trims, lowercases, turns `-` and `_` into spaces, and collapses whitespace
/// runs to a single space.
pub fn normalize_key(s: &str) -> String {
    s.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The normalized keys a page may be referred to by, deduplicated in
/// registration order.
pub fn page_keys(title: &str, stem: &str) -> Vec<String> {
    let variants = [
        title.to_string(),
        strip_numeric_prefix(title).to_string(),
        stem.to_string(),
        strip_numeric_prefix(stem).to_string(),
        stem.replace(['-', '_'], " "),
    ];
    let mut keys: Vec<String> = Vec::with_capacity(variants.len());
    for v in &variants {
        let key = normalize_key(v);
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Insertion-ordered map from normalized page key to anchor slug.
#[derive(Debug, Clone, Default)]
pub struct AnchorMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl AnchorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from pages already in sort order.
    pub fn from_pages(pages: &[Page]) -> Self {
        let mut map = Self::new();
        for page in pages {
            map.register_page(page);
        }
        map
    }

    /// Register all keys for a page. Keys claimed by an earlier page are left
    /// pointing at that page.
    pub fn register_page(&mut self, page: &Page) {
        for key in page_keys(&page.title, &page.stem) {
            self.insert_if_absent(key, &page.anchor);
        }
    }

    /// Insert `key → anchor` unless `key` is already present.
    ///
    /// Returns `true` when the entry was inserted.
    pub fn insert_if_absent(&mut self, key: String, anchor: &str) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, anchor.to_string()));
        true
    }

    /// Exact lookup of an already-normalized key.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Resolve a page name as written in a link.
    ///
    /// Tries the normalized name first, then the name with its numeric prefix
    /// stripped.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.lookup(&normalize_key(name))
            .or_else(|| self.lookup(&normalize_key(strip_numeric_prefix(name.trim()))))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
