//! Shared test utilities for the wikicat test suite.
//!
//! Provides fixture setup, page builders and lookups over scan-phase data
//! (`Wiki`, `Page`), plus a [`StubFetcher`] that serves canned responses so
//! image handling can be tested without a network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let wiki = scan(tmp.path(), &WikiConfig::default()).unwrap();
//!
//! let setup = find_page(&wiki, "02-Setup.md");
//! assert_eq!(setup.anchor, "02-setup-guide");
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

use crate::images::{FetchError, FetchedResponse, ImageFetcher};
use crate::naming::sort_key;
use crate::scan::Wiki;
use crate::types::Page;

/// Smallest byte string accepted as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png-data";

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/wiki/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/wiki");
    for entry in std::fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        if entry.path().is_file() {
            std::fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
        }
    }
    tmp
}

/// Write a page file into `dir`.
pub fn write_page(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// Build a page directly, without going through the scanner.
pub fn page(stem: &str, title: &str, anchor: &str) -> Page {
    Page {
        file_name: format!("{stem}.md"),
        stem: stem.to_string(),
        title: title.to_string(),
        sort_key: sort_key(stem),
        anchor: anchor.to_string(),
        raw: String::new(),
    }
}

// =========================================================================
// Wiki lookups (panic with a clear message on miss)
// =========================================================================

/// File names of all pages, in document order.
pub fn page_files(wiki: &Wiki) -> Vec<&str> {
    wiki.pages.iter().map(|p| p.file_name.as_str()).collect()
}

/// Find a page by file name. Panics if not found.
pub fn find_page<'a>(wiki: &'a Wiki, file_name: &str) -> &'a Page {
    wiki.pages
        .iter()
        .find(|p| p.file_name == file_name)
        .unwrap_or_else(|| panic!("page '{file_name}' not found. Available: {:?}", page_files(wiki)))
}

// =========================================================================
// Image fetching
// =========================================================================

/// Serves canned responses by URL. Unknown URLs fail with a not-found error.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, FetchedResponse>,
    calls: Rc<Cell<usize>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `url` with the given content type and body.
    pub fn respond(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedResponse {
                content_type: content_type.to_string(),
                body: body.to_vec(),
            },
        );
        self
    }

    /// Respond to `url` with a PNG.
    pub fn image(self, url: &str, body: &[u8]) -> Self {
        self.respond(url, "image/png", body)
    }

    /// Shared counter of requests made, readable after the fetcher is boxed.
    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl ImageFetcher for StubFetcher {
    fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.responses.get(url).cloned().ok_or_else(|| {
            FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no stub response for {url}"),
            ))
        })
    }
}
