//! Image reference handling.
//!
//! Wiki pages reference images either relative to the wiki repository
//! (`![diagram](diagram.png)`) or by absolute URL, often a GitHub `/blob/`
//! page rather than the file itself. Depending on [`ImageMode`] each reference
//! is left alone, inlined as a `data:` URI, or downloaded into a folder next to
//! the output document.
//!
//! ## URL Resolution
//!
//! ```text
//! diagram.png                     → https://raw.githubusercontent.com/{repo}.wiki/HEAD/diagram.png
//! ./img/My%20Chart.png            → https://raw.githubusercontent.com/{repo}.wiki/HEAD/img/My%20Chart.png
//! https://github.com/o/r/blob/x.png → https://github.com/o/r/raw/x.png
//! data:… / #anchor / mailto:…     → unchanged
//! ```
//!
//! ## Failure Handling
//!
//! Fetching is best-effort. Every failure (network error, non-image content
//! type, an HTML page without a usable image link, unknown file signature) is
//! logged as a warning and the original reference is kept. Results, failures
//! included, are cached per URL for the rest of the run.
//!
//! Downloads go through the [`ImageFetcher`] trait so the rewriting logic can
//! be tested without a network.

use crate::config::{ImageMode, ImagesConfig};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Characters left unescaped in URL paths (RFC 3986 unreserved plus `/`).
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Upper bound on a single downloaded image.
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Leading bytes accepted as image data.
const IMAGE_SIGNATURES: &[&[u8]] = &[
    b"\xFF\xD8\xFF", // JPEG
    b"\x89PNG",      // PNG
    b"GIF87a",
    b"GIF89a",
    b"<svg",
    b"<?xml", // SVG with XML declaration
];

static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(?P<alt>[^\]]*)\]\((?P<url>(?:[^)]|\([^)]*\))+)\)").expect("valid regex")
});

static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*"([^"]+)"[^>]*>"#).expect("valid regex")
});

static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+property="og:image"\s+content="([^"]+)""#).expect("valid regex")
});

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("non-image content type '{0}'")]
    NotAnImage(String),
    #[error("data does not start with a known image signature")]
    UnknownSignature,
    #[error("got an HTML page without a usable image link")]
    Html,
    #[error("image link inside HTML page led to another HTML page")]
    NestedHtml,
}

/// A raw HTTP response body with its content type.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Source of remote bytes.
pub trait ImageFetcher {
    fn get(&self, url: &str) -> Result<FetchedResponse, FetchError>;
}

/// Blocking HTTP fetcher with a fixed per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(Duration::from_secs(config.timeout_secs), &config.user_agent)
    }
}

impl ImageFetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let response = self.agent.get(url).call().map_err(Box::new)?;
        let content_type = response.header("Content-Type").unwrap_or("").to_string();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut body)?;
        Ok(FetchedResponse { content_type, body })
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// Convert a GitHub `/blob/` page URL to the matching `/raw/` file URL.
pub fn github_blob_to_raw(url: &str) -> String {
    if url.contains("github.com") && url.contains("/blob/") {
        url.replacen("/blob/", "/raw/", 1)
    } else {
        url.to_string()
    }
}

/// Raw-content URL for a path relative to the wiki repository.
pub fn raw_wiki_url(repo: &str, path: &str) -> String {
    let path = path.trim_start_matches(['.', '/']);
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    format!(
        "https://raw.githubusercontent.com/{repo}.wiki/HEAD/{}",
        utf8_percent_encode(&decoded, PATH_SAFE)
    )
}

/// Split an image reference token into its URL and any trailing title.
///
/// - `diagram.png "Diagram"` → (`diagram.png`, ` "Diagram"`)
/// - `"my chart.png"` → (`my chart.png`, ``)
/// - `<my chart.png>` → (`my chart.png`, ``)
pub fn split_image_token(token: &str) -> (&str, &str) {
    let token = token.trim();
    if let Some(inner) = token.strip_prefix('<')
        && let Some(end) = inner.find('>')
    {
        return (&inner[..end], &inner[end + 1..]);
    }
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return (&token[1..token.len() - 1], "");
        }
    }
    match token.find(char::is_whitespace) {
        Some(pos) => (&token[..pos], &token[pos..]),
        None => (token, ""),
    }
}

/// MIME type from the URL's file extension; PNG when unknown.
pub fn mime_type_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_lowercase();
    let ext = path.rsplit('.').next().unwrap_or_default();
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

/// Local filename for a downloaded image: the last URL path segment,
/// percent-decoded. URLs without one get a stable hashed name.
pub fn local_file_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split_once('/')
        .map_or("", |(_, path)| path);
    let segment = path.rsplit('/').next().unwrap_or_default();
    let decoded = percent_decode_str(segment)
        .decode_utf8_lossy()
        .replace(['/', '\\'], "_");
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        let digest = Sha256::digest(url.as_bytes());
        let hex = format!("{digest:x}");
        format!("image-{}.png", &hex[..12])
    } else {
        decoded
    }
}

fn looks_like_html(content_type: &str, data: &[u8]) -> bool {
    let ct = content_type.to_lowercase();
    if ct.contains("text/html") || ct.contains("application/xhtml") {
        return true;
    }
    if ct.starts_with("image/") {
        return false;
    }
    let head: Vec<u8> = data.iter().take(200).map(u8::to_ascii_lowercase).collect();
    head.starts_with(b"<!doctype")
        || head.starts_with(b"<html")
        || head.windows(5).any(|w| w == b"<html")
}

fn has_image_signature(data: &[u8]) -> bool {
    IMAGE_SIGNATURES.iter().any(|sig| data.starts_with(sig))
        || (data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP")
}

/// Find the real image URL on an HTML page: `og:image`, else the first
/// absolute or root-relative `<img src>`.
pub fn extract_image_from_html(html: &[u8], base_url: &str) -> Option<String> {
    let html = String::from_utf8_lossy(html);
    if let Some(caps) = OG_IMAGE.captures(&html) {
        let url = &caps[1];
        return Some(if url.starts_with("http") {
            github_blob_to_raw(url)
        } else {
            url.to_string()
        });
    }
    let caps = HTML_IMAGE.captures(&html)?;
    let src = &caps[1];
    let absolute = if src.starts_with('/') {
        let (scheme, rest) = base_url.split_once("://")?;
        let host = rest.split('/').next()?;
        format!("{scheme}://{host}{src}")
    } else if src.starts_with("http") {
        src.to_string()
    } else {
        return None;
    };
    Some(github_blob_to_raw(&absolute))
}

/// Download and validate image bytes.
///
/// An HTML page is followed once to the image it links to.
pub fn download_image(fetcher: &dyn ImageFetcher, url: &str) -> Result<Vec<u8>, FetchError> {
    download_with_depth(fetcher, url, 0)
}

fn download_with_depth(
    fetcher: &dyn ImageFetcher,
    url: &str,
    depth: u8,
) -> Result<Vec<u8>, FetchError> {
    let response = fetcher.get(url)?;

    if looks_like_html(&response.content_type, &response.body) {
        if depth > 0 {
            return Err(FetchError::NestedHtml);
        }
        let Some(image_url) = extract_image_from_html(&response.body, url) else {
            return Err(FetchError::Html);
        };
        log::info!("{url} is an HTML page, following image link {image_url}");
        return download_with_depth(fetcher, &image_url, depth + 1);
    }

    if !response.content_type.starts_with("image/") {
        return Err(FetchError::NotAnImage(response.content_type));
    }
    if !has_image_signature(&response.body) {
        return Err(FetchError::UnknownSignature);
    }
    Ok(response.body)
}

// ============================================================================
// Resolver
// ============================================================================

/// Counters reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    /// Distinct URLs successfully fetched
    pub fetched: usize,
    /// Distinct URLs that could not be fetched
    pub failed: usize,
    /// Files newly written to the images folder
    pub saved: usize,
}

/// Rewrites image references for one run, caching results per URL.
pub struct ImageResolver {
    mode: ImageMode,
    repo: Option<String>,
    images_dir: Option<PathBuf>,
    dir_name: String,
    fetcher: Box<dyn ImageFetcher>,
    /// Resolved URL → replacement URL, or `None` for "leave unchanged".
    cache: HashMap<String, Option<String>>,
    stats: ImageStats,
}

impl ImageResolver {
    /// `images_dir` is where `local` mode writes files. References in the
    /// document use `dir_name/<file>`, relative to the output file.
    pub fn new(
        mode: ImageMode,
        repo: Option<String>,
        images_dir: Option<PathBuf>,
        dir_name: &str,
        fetcher: Box<dyn ImageFetcher>,
    ) -> Self {
        Self {
            mode,
            repo,
            images_dir,
            dir_name: dir_name.to_string(),
            fetcher,
            cache: HashMap::new(),
            stats: ImageStats::default(),
        }
    }

    pub fn stats(&self) -> ImageStats {
        self.stats
    }

    /// Rewrite markdown and HTML image references in `text`.
    pub fn rewrite(&mut self, text: &str) -> String {
        if self.mode == ImageMode::Skip {
            return text.to_string();
        }
        let text = MD_IMAGE
            .replace_all(text, |caps: &Captures| {
                let token = &caps["url"];
                match self.resolve_token(token) {
                    Some(new_token) => format!("![{}]({new_token})", &caps["alt"]),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();
        HTML_IMAGE
            .replace_all(&text, |caps: &Captures| {
                let (Some(tag), Some(src)) = (caps.get(0), caps.get(1)) else {
                    return caps[0].to_string();
                };
                match self.resolve_url(src.as_str()) {
                    Some(new_url) => {
                        let start = src.start() - tag.start();
                        let end = src.end() - tag.start();
                        let tag = tag.as_str();
                        format!("{}{new_url}{}", &tag[..start], &tag[end..])
                    }
                    None => tag.as_str().to_string(),
                }
            })
            .into_owned()
    }

    /// Replacement for a markdown image token, keeping any title text.
    fn resolve_token(&mut self, token: &str) -> Option<String> {
        let (url, suffix) = split_image_token(token);
        let new_url = self.resolve_url(url)?;
        Some(format!("{new_url}{suffix}"))
    }

    /// Replacement URL for one reference, or `None` to leave it unchanged.
    pub fn resolve_url(&mut self, url: &str) -> Option<String> {
        let url = url.trim().trim_matches(['"', '\'']);
        if url.is_empty() || url.starts_with("data:") || url.starts_with('#') || url.starts_with("mailto:") {
            return None;
        }
        let full_url = if url.starts_with("http://") || url.starts_with("https://") {
            github_blob_to_raw(url)
        } else {
            let Some(repo) = self.repo.as_deref() else {
                log::debug!("no repo configured, leaving relative image {url}");
                return None;
            };
            raw_wiki_url(repo, url)
        };

        if let Some(cached) = self.cache.get(&full_url) {
            return cached.clone();
        }
        let resolved = self.fetch_and_store(&full_url);
        self.cache.insert(full_url, resolved.clone());
        resolved
    }

    fn fetch_and_store(&mut self, full_url: &str) -> Option<String> {
        let (data, fetched_from) = match download_image(self.fetcher.as_ref(), full_url) {
            Ok(data) => (data, full_url.to_string()),
            Err(first) if full_url.contains("/blob/") => {
                let raw_url = full_url.replacen("/blob/", "/raw/", 1);
                log::info!("{full_url}: {first}; retrying with {raw_url}");
                match download_image(self.fetcher.as_ref(), &raw_url) {
                    Ok(data) => (data, raw_url),
                    Err(err) => {
                        log::warn!("Failed to download image {raw_url}: {err}");
                        self.stats.failed += 1;
                        return None;
                    }
                }
            }
            Err(err) => {
                log::warn!("Failed to download image {full_url}: {err}");
                self.stats.failed += 1;
                return None;
            }
        };
        self.stats.fetched += 1;

        match self.mode {
            ImageMode::Skip => None,
            ImageMode::Embed => Some(format!(
                "data:{};base64,{}",
                mime_type_for(&fetched_from),
                BASE64.encode(&data)
            )),
            ImageMode::Local => {
                let dir = self.images_dir.clone()?;
                let file_name = local_file_name(&fetched_from);
                match self.save(&dir, &file_name, &data) {
                    Ok(()) => Some(format!("{}/{file_name}", self.dir_name)),
                    Err(err) => {
                        log::warn!("Failed to save image {file_name}: {err}");
                        None
                    }
                }
            }
        }
    }

    /// Write an image unless a file with that name already exists.
    fn save(&mut self, dir: &Path, file_name: &str, data: &[u8]) -> std::io::Result<()> {
        let path = dir.join(file_name);
        if !path.exists() {
            fs::write(&path, data)?;
            self.stats.saved += 1;
        }
        Ok(())
    }
}
