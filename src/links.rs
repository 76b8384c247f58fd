//! Cross-page link rewriting.
//!
//! Two link forms are rewritten to in-document anchors, in this order:
//!
//! 1. Wiki links: `[[Target]]` and `[[Target|Label]]`
//! 2. Relative markdown links: `[Label](Other-Page.md#section)`
//!
//! A link whose target does not resolve through the [`AnchorMap`] passes
//! through byte-for-byte. Rewritten links point at `#anchor`, and targets
//! starting with `#` are never touched, so rewriting is idempotent.

use crate::anchors::AnchorMap;
use crate::naming::separators_to_spaces;
use crate::scan::Wiki;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").expect("valid regex"));

/// Matches `[label](target)` with an optional leading `!` so images can be
/// recognized and skipped.
static MD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!?\[(?P<label>[^\]]+)\]\((?P<target>[^)]+)\)").expect("valid regex")
});

/// Targets that never point at another wiki page.
pub fn is_absolute_or_special(target: &str) -> bool {
    let t = target.trim();
    t.starts_with("http://")
        || t.starts_with("https://")
        || t.starts_with("data:")
        || t.starts_with("mailto:")
        || t.starts_with('#')
}

/// Page name referenced by a relative markdown link target.
///
/// `"./02-Setup.md#install \"Setup\""` → `"02 Setup"`.
pub fn page_name_from_target(target: &str) -> String {
    let url = target.trim().split(' ').next().unwrap_or_default();
    let url = url.split(['#', '?']).next().unwrap_or_default();
    let name = url.rsplit('/').next().unwrap_or_default();
    let name = match name.len().checked_sub(3) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".md") => {
            &name[..cut]
        }
        _ => name,
    };
    separators_to_spaces(name)
}

/// Rewrite `[[Page]]` / `[[Page|Label]]` to `[Label](#anchor)` where resolvable.
pub fn rewrite_wiki_links(text: &str, anchors: &AnchorMap) -> String {
    WIKI_LINK
        .replace_all(text, |caps: &Captures| {
            let page = caps[1].trim();
            let label = caps.get(2).map_or(page, |m| m.as_str().trim());
            match anchors.resolve(page) {
                Some(anchor) => format!("[{label}](#{anchor})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrite relative `[Label](Target)` links to `[Label](#anchor)` where
/// resolvable. Images, absolute URLs and anchors are left alone.
pub fn rewrite_markdown_links(text: &str, anchors: &AnchorMap) -> String {
    MD_LINK
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let target = &caps["target"];
            if whole.starts_with('!') || is_absolute_or_special(target) {
                return whole.to_string();
            }
            let name = page_name_from_target(target);
            match anchors.resolve(&name) {
                Some(anchor) => format!("[{}](#{anchor})", &caps["label"]),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

/// Both rewrites, in order.
pub fn rewrite_links(text: &str, anchors: &AnchorMap) -> String {
    let text = rewrite_wiki_links(text, anchors);
    rewrite_markdown_links(&text, anchors)
}

/// Which syntax an unresolved link was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Wiki,
    Markdown,
}

/// An internal link that does not resolve to any page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedLink {
    pub kind: LinkKind,
    /// The link target as written
    pub target: String,
}

/// Internal links in `text` that would be left unchanged by [`rewrite_links`].
pub fn unresolved_links(text: &str, anchors: &AnchorMap) -> Vec<UnresolvedLink> {
    let mut missing = Vec::new();
    for caps in WIKI_LINK.captures_iter(text) {
        let page = caps[1].trim();
        if anchors.resolve(page).is_none() {
            missing.push(UnresolvedLink {
                kind: LinkKind::Wiki,
                target: page.to_string(),
            });
        }
    }
    for caps in MD_LINK.captures_iter(text) {
        let target = &caps["target"];
        if caps[0].starts_with('!') || is_absolute_or_special(target) {
            continue;
        }
        if anchors.resolve(&page_name_from_target(target)).is_none() {
            missing.push(UnresolvedLink {
                kind: LinkKind::Markdown,
                target: target.trim().to_string(),
            });
        }
    }
    missing
}

/// Unresolved links found in one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageLinks {
    pub file_name: String,
    pub missing: Vec<UnresolvedLink>,
}

/// Unresolved links for every page, in document order.
pub fn check_links(wiki: &Wiki) -> Vec<PageLinks> {
    wiki.pages
        .iter()
        .map(|page| PageLinks {
            file_name: page.file_name.clone(),
            missing: unresolved_links(&page.raw, &wiki.anchors),
        })
        .collect()
}
