//! Document assembly.
//!
//! Second pass of the build. Takes the scanned [`Wiki`] and produces one
//! markdown document:
//!
//! ```text
//! # proj compiled wiki pages
//!
//! _Source: https://github.com/acme/proj/wiki_
//!
//! ## Contents
//!
//! - [Introduction](#introduction)
//! - [02 Setup Guide](#02-setup-guide)
//!
//! ---
//!
//! # Introduction
//! ...
//! <sub>Original page: <a href="…/wiki/01-Introduction">01-Introduction.md</a></sub>
//!
//! ---
//!
//! # 02 Setup Guide
//! ...
//! ```
//!
//! Each page goes through the same steps, in order: wiki links, markdown links,
//! images, heading normalization, provenance note.

use crate::anchors::AnchorMap;
use crate::config::{ImageMode, WikiConfig};
use crate::headings::normalize_page;
use crate::images::{ImageFetcher, ImageResolver, ImageStats};
use crate::links::rewrite_links;
use crate::scan::{self, ScanError, Wiki};
use crate::types::Page;
use maud::html;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Characters left unescaped in a single URL path segment.
const SEGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Failed to write output: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Summary of a finished build.
#[derive(Debug)]
pub struct BuildReport {
    pub output: PathBuf,
    pub pages: usize,
    /// Set in `local` mode
    pub images_dir: Option<PathBuf>,
    pub images: ImageStats,
}

/// Everything a section needs while being rendered.
pub struct RenderContext<'a> {
    pub config: &'a WikiConfig,
    pub anchors: &'a AnchorMap,
    pub images: ImageResolver,
}

/// Live wiki URL for a page.
pub fn wiki_page_url(repo: &str, stem: &str) -> String {
    format!(
        "https://github.com/{repo}/wiki/{}",
        utf8_percent_encode(stem, SEGMENT_SAFE)
    )
}

/// `<sub>` note naming the page's source file, linked when a repo is known.
pub fn provenance_note(repo: Option<&str>, page: &Page) -> String {
    let markup = match repo {
        Some(repo) => html! {
            sub { "Original page: " a href=(wiki_page_url(repo, &page.stem)) { (page.file_name) } }
        },
        None => html! {
            sub { "Original page: " (page.file_name) }
        },
    };
    markup.into_string()
}

/// Document heading, source line, image mode line and version section.
pub fn render_preamble(config: &WikiConfig) -> String {
    let mut lines = vec![format!("# {}", config.document_title()), String::new()];
    if let Some(repo) = &config.repo {
        lines.push(format!("_Source: https://github.com/{repo}/wiki_"));
        lines.push(String::new());
    }
    match config.images.mode {
        ImageMode::Skip => {}
        ImageMode::Embed => {
            lines.push("_Self-contained version with embedded images_".to_string());
            lines.push(String::new());
        }
        ImageMode::Local => {
            lines.push("_Self-contained version with local images_".to_string());
            lines.push(String::new());
        }
    }
    if let Some(timestamp) = &config.timestamp {
        lines.push("## Version".to_string());
        lines.push(String::new());
        lines.push(format!("This document was generated on {timestamp}"));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// `## Contents` with one link per page, in document order.
pub fn render_toc(pages: &[Page]) -> String {
    let mut lines = vec!["## Contents".to_string(), String::new()];
    lines.extend(
        pages
            .iter()
            .map(|p| format!("- [{}](#{})", p.title, p.anchor)),
    );
    lines.join("\n") + "\n"
}

/// One page as a document section, without the leading rule.
pub fn render_section(page: &Page, ctx: &mut RenderContext) -> String {
    let text = rewrite_links(&page.raw, ctx.anchors);
    let text = ctx.images.rewrite(&text);
    let section = normalize_page(&page.title, &text);
    format!(
        "{}\n\n{}\n",
        section.trim_end(),
        provenance_note(ctx.config.repo.as_deref(), page)
    )
}

/// The complete document.
pub fn render_document(wiki: &Wiki, ctx: &mut RenderContext) -> String {
    let mut parts = vec![render_preamble(ctx.config), render_toc(&wiki.pages)];
    for page in &wiki.pages {
        log::debug!("rendering {}", page.file_name);
        parts.push(format!("---\n\n{}", render_section(page, ctx)));
    }
    parts.join("\n")
}

/// Write `contents` to `path` via a temp file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), BuildError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Scan `source`, assemble the document and write it to `out`.
pub fn build(
    source: &Path,
    out: &Path,
    config: &WikiConfig,
    fetcher: Box<dyn ImageFetcher>,
) -> Result<BuildReport, BuildError> {
    let wiki = scan::scan(source, config)?;
    log::info!(
        "loaded {} pages, {} anchor keys",
        wiki.pages.len(),
        wiki.anchors.len()
    );

    let images_dir = match config.images.mode {
        ImageMode::Local => {
            let dir = parent_dir(out).join(&config.images.dir);
            fs::create_dir_all(&dir)?;
            Some(dir)
        }
        ImageMode::Skip | ImageMode::Embed => None,
    };

    let mut ctx = RenderContext {
        config,
        anchors: &wiki.anchors,
        images: ImageResolver::new(
            config.images.mode,
            config.repo.clone(),
            images_dir.clone(),
            &config.images.dir,
            fetcher,
        ),
    };
    let document = render_document(&wiki, &mut ctx);
    write_atomic(out, &document)?;

    Ok(BuildReport {
        output: out.to_path_buf(),
        pages: wiki.pages.len(),
        images_dir,
        images: ctx.images.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{StubFetcher, page, setup_fixtures};
    use tempfile::TempDir;

    fn config_with_repo() -> WikiConfig {
        WikiConfig {
            repo: Some("acme/proj".into()),
            ..WikiConfig::default()
        }
    }

    #[test]
    fn wiki_page_url_encodes_stem() {
        assert_eq!(
            wiki_page_url("acme/proj", "02-Setup Guide"),
            "https://github.com/acme/proj/wiki/02-Setup%20Guide"
        );
    }

    #[test]
    fn provenance_with_repo() {
        let p = page("02-Setup", "Setup", "setup");
        assert_eq!(
            provenance_note(Some("acme/proj"), &p),
            r#"<sub>Original page: <a href="https://github.com/acme/proj/wiki/02-Setup">02-Setup.md</a></sub>"#
        );
    }

    #[test]
    fn provenance_without_repo_is_escaped_text() {
        let mut p = page("a<b", "A", "a");
        p.file_name = "a<b.md".into();
        assert_eq!(provenance_note(None, &p), "<sub>Original page: a&lt;b.md</sub>");
    }

    #[test]
    fn preamble_minimal() {
        assert_eq!(render_preamble(&WikiConfig::default()), "# Compiled wiki pages\n");
    }

    #[test]
    fn preamble_full() {
        let mut config = config_with_repo();
        config.timestamp = Some("2024-05-01".into());
        config.images.mode = ImageMode::Embed;
        assert_eq!(
            render_preamble(&config),
            "# proj compiled wiki pages\n\n\
             _Source: https://github.com/acme/proj/wiki_\n\n\
             _Self-contained version with embedded images_\n\n\
             ## Version\n\n\
             This document was generated on 2024-05-01\n"
        );
    }

    #[test]
    fn toc_lists_pages_in_order() {
        let pages = vec![
            page("01-Introduction", "Introduction", "introduction"),
            page("02-Setup", "02 Setup Guide", "02-setup-guide"),
        ];
        assert_eq!(
            render_toc(&pages),
            "## Contents\n\n- [Introduction](#introduction)\n- [02 Setup Guide](#02-setup-guide)\n"
        );
    }

    #[test]
    fn section_applies_all_steps() {
        let config = config_with_repo();
        let intro = page("01-Introduction", "Introduction", "introduction");
        let mut setup = page("02-Setup", "Setup", "setup");
        setup.raw = "# Setup\n\nRead [[Introduction|the intro]].\n\n# Extra\n".into();
        let anchors = AnchorMap::from_pages(&[intro, setup.clone()]);
        let mut ctx = RenderContext {
            config: &config,
            anchors: &anchors,
            images: ImageResolver::new(
                ImageMode::Skip,
                None,
                None,
                "images",
                Box::new(StubFetcher::new()),
            ),
        };
        assert_eq!(
            render_section(&setup, &mut ctx),
            "# Setup\n\nRead [the intro](#introduction).\n\n## Extra\n\n\
             <sub>Original page: <a href=\"https://github.com/acme/proj/wiki/02-Setup\">02-Setup.md</a></sub>\n"
        );
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist/nested/wiki.md");
        write_atomic(&out, "one").unwrap();
        write_atomic(&out, "two").unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "two");
        let leftovers = fs::read_dir(out.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn build_fixture_skip_mode() {
        let tmp = setup_fixtures();
        let out = tmp.path().join("out/wiki.md");
        let report = build(
            tmp.path(),
            &out,
            &config_with_repo(),
            Box::new(StubFetcher::new()),
        )
        .unwrap();

        assert_eq!(report.pages, 5);
        assert!(report.images_dir.is_none());
        assert!(!tmp.path().join("out/images").exists());

        let doc = fs::read_to_string(&out).unwrap();
        let intro = doc.find("- [Introduction](#introduction)").unwrap();
        let setup = doc.find("- [02 Setup Guide](#02-setup-guide)").unwrap();
        assert!(intro < setup);
        assert!(doc.contains("![diagram](diagram.png)"));
        assert!(!doc.contains("Home page"));
    }

    #[test]
    fn build_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let result = build(
            &tmp.path().join("nope"),
            &tmp.path().join("out.md"),
            &WikiConfig::default(),
            Box::new(StubFetcher::new()),
        );
        assert!(matches!(
            result,
            Err(BuildError::Scan(ScanError::NotADirectory(_)))
        ));
    }
}
