//! Configuration module.
//!
//! Handles loading, validating, and layering `wikicat.toml`. Values are
//! resolved in three layers, each overriding the one before:
//!
//! ```text
//! stock defaults
//!   ← wiki/wikicat.toml      (or the file given with --config)
//!     ← command-line flags   (--repo, --images, --timestamp, --title)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! repo = "owner/name"         # GitHub repository (no .wiki suffix)
//! timestamp = "2024-05-01"    # Adds a "Version" section to the preamble
//!
//! [document]
//! title = "My wiki"           # Default: "<repo name> compiled wiki pages"
//! title_source = "heading"    # "heading" or "filename"
//!
//! [pages]
//! exclude = ["_Sidebar.md", "_Footer.md", "_Header.md", "Home.md"]
//! extension = "md"
//!
//! [images]
//! mode = "skip"               # "skip", "embed" or "local"
//! dir = "images"              # Folder next to the output file (local mode)
//! timeout_secs = 10
//! user_agent = "Mozilla/5.0"
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the optional config file inside the source directory.
pub const CONFIG_FILENAME: &str = "wikicat.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WikiConfig {
    /// GitHub repository as `owner/name`. Used for provenance links and to
    /// resolve relative image paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Generation timestamp shown in the version preamble.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Document-level settings (title, title policy).
    pub document: DocumentConfig,
    /// Which files are treated as pages.
    pub pages: PagesConfig,
    /// Image handling.
    pub images: ImagesConfig,
}

impl WikiConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repo) = &self.repo {
            let valid = repo
                .split_once('/')
                .is_some_and(|(owner, name)| {
                    !owner.is_empty() && !name.is_empty() && !name.contains('/')
                });
            if !valid {
                return Err(ConfigError::Validation(format!(
                    "repo must look like 'owner/name', got '{repo}'"
                )));
            }
        }
        if self.images.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "images.timeout_secs must be at least 1".into(),
            ));
        }
        if self.images.dir.is_empty() || self.images.dir.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "images.dir must be a single directory name".into(),
            ));
        }
        if self.pages.extension.is_empty() || self.pages.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "pages.extension must be non-empty and given without a dot".into(),
            ));
        }
        Ok(())
    }

    /// Repository name without the owner (`acme/proj` → `proj`).
    pub fn repo_name(&self) -> Option<&str> {
        self.repo
            .as_deref()
            .and_then(|r| r.rsplit('/').next())
            .filter(|n| !n.is_empty())
    }

    /// Top-level heading of the assembled document.
    pub fn document_title(&self) -> String {
        match (&self.document.title, self.repo_name()) {
            (Some(title), _) => title.clone(),
            (None, Some(name)) => format!("{name} compiled wiki pages"),
            (None, None) => "Compiled wiki pages".to_string(),
        }
    }
}

/// Where a page's display title comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    /// First top-level heading, verbatim; filename title when there is none.
    #[default]
    Heading,
    /// Always the filename with its numeric prefix removed.
    Filename,
}

/// Document-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// Overrides the generated document heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Title derivation policy for pages.
    pub title_source: TitleSource,
}

/// Page selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Exact filenames to skip (case-sensitive).
    pub exclude: Vec<String>,
    /// Page file extension, matched case-insensitively.
    pub extension: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            exclude: ["_Sidebar.md", "_Footer.md", "_Header.md", "Home.md"]
                .map(String::from)
                .to_vec(),
            extension: "md".to_string(),
        }
    }
}

/// How image references are handled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Leave image references as they are.
    #[default]
    Skip,
    /// Inline images as base64 `data:` URIs.
    Embed,
    /// Download images into a folder next to the output file.
    Local,
}

/// Image handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub mode: ImageMode,
    /// Folder name for downloaded images, created next to the output file.
    pub dir: String,
    /// Per-request timeout for image downloads.
    pub timeout_secs: u64,
    /// User-Agent header sent with image requests.
    pub user_agent: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            mode: ImageMode::Skip,
            dir: "images".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(WikiConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `wikicat.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_config_file(&config_path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WikiConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WikiConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Resolve the full config for a run.
///
/// Layers stock defaults, then the config file (`explicit` if given, which
/// must exist, otherwise `wikicat.toml` in `source` if present), then
/// `overrides` built from command-line flags.
pub fn load_config(
    source: &Path,
    explicit: Option<&Path>,
    overrides: Option<toml::Value>,
) -> Result<WikiConfig, ConfigError> {
    let file_layer = match explicit {
        Some(path) => Some(read_config_file(path)?),
        None => load_raw_config(source)?,
    };
    let base = match file_layer {
        Some(file) => merge_toml(stock_defaults_value(), file),
        None => stock_defaults_value(),
    };
    resolve_config(base, overrides)
}

/// Returns a fully-commented stock `wikicat.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# wikicat configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as wikicat.toml in the wiki directory, or pass --config.
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# GitHub repository as owner/name (without the .wiki suffix). Enables
# provenance links and fetching of relative images.
# repo = "owner/name"

# Adds a "Version" section to the document preamble.
# timestamp = "2024-05-01"

# ---------------------------------------------------------------------------
# Document
# ---------------------------------------------------------------------------
[document]
# Heading of the assembled document.
# Default: "<repo name> compiled wiki pages".
# title = "Project handbook"

# Where page titles come from:
#   "heading"  - first top-level heading in the page, else the filename
#   "filename" - always the filename, numeric prefix removed
title_source = "heading"

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# Exact filenames that are never included (case-sensitive).
exclude = ["_Sidebar.md", "_Footer.md", "_Header.md", "Home.md"]

# Page file extension (matched case-insensitively).
extension = "md"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# "skip"  - leave image references untouched
# "embed" - inline images as base64 data URIs
# "local" - download images into a folder next to the output file
mode = "skip"

# Folder name used by "local" mode.
dir = "images"

# Per-request download timeout in seconds.
timeout_secs = 10

# User-Agent header for image requests.
user_agent = "Mozilla/5.0"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = WikiConfig::default();
        assert_eq!(config.repo, None);
        assert_eq!(config.document.title_source, TitleSource::Heading);
        assert_eq!(config.images.mode, ImageMode::Skip);
        assert_eq!(config.images.dir, "images");
        assert_eq!(config.images.timeout_secs, 10);
        assert_eq!(config.pages.extension, "md");
        assert!(config.pages.exclude.contains(&"Home.md".to_string()));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
repo = "acme/proj"

[images]
mode = "embed"
"#;
        let config: WikiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repo.as_deref(), Some("acme/proj"));
        assert_eq!(config.images.mode, ImageMode::Embed);
        // Defaults preserved
        assert_eq!(config.images.timeout_secs, 10);
        assert_eq!(config.pages.exclude.len(), 4);
    }

    #[test]
    fn parse_title_source() {
        let toml = r#"
[document]
title_source = "filename"
"#;
        let config: WikiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.document.title_source, TitleSource::Filename);
    }

    #[test]
    fn document_title_defaults() {
        let mut config = WikiConfig::default();
        assert_eq!(config.document_title(), "Compiled wiki pages");

        config.repo = Some("acme/proj".into());
        assert_eq!(config.document_title(), "proj compiled wiki pages");

        config.document.title = Some("Handbook".into());
        assert_eq!(config.document_title(), "Handbook");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path(), None, None).unwrap();
        assert_eq!(config.images.mode, ImageMode::Skip);
    }

    #[test]
    fn load_config_reads_file_in_source_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
repo = "acme/proj"

[pages]
exclude = ["Home.md"]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path(), None, None).unwrap();
        assert_eq!(config.repo.as_deref(), Some("acme/proj"));
        assert_eq!(config.pages.exclude, vec!["Home.md".to_string()]);
        assert_eq!(config.pages.extension, "md");
    }

    #[test]
    fn load_config_explicit_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let result = load_config(tmp.path(), Some(&missing), None);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_overrides_win() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
repo = "acme/proj"

[images]
mode = "embed"
timeout_secs = 30
"#,
        )
        .unwrap();
        let overrides: toml::Value = toml::from_str(
            r#"
[images]
mode = "local"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path(), None, Some(overrides)).unwrap();
        assert_eq!(config.images.mode, ImageMode::Local);
        assert_eq!(config.images.timeout_secs, 30);
        assert_eq!(config.repo.as_deref(), Some("acme/proj"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path(), None, None);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[images]
mode = "skip"
timeout_secs = 10
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[images]
mode = "embed"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let images = merged.get("images").unwrap();
        assert_eq!(images.get("mode").unwrap().as_str(), Some("embed"));
        assert_eq!(images.get("timeout_secs").unwrap().as_integer(), Some(10));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"exclude = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"exclude = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("exclude").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<WikiConfig, _> = toml::from_str(
            r#"
[images]
mdoe = "embed"
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_image_mode_rejected() {
        let result: Result<WikiConfig, _> = toml::from_str(
            r#"
[images]
mode = "inline"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_repo_format() {
        let mut config = WikiConfig::default();
        for bad in ["acme", "/proj", "acme/", "a/b/c"] {
            config.repo = Some(bad.into());
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
        config.repo = Some("acme/proj".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_timeout_nonzero() {
        let mut config = WikiConfig::default();
        config.images.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn validate_images_dir_is_single_component() {
        let mut config = WikiConfig::default();
        config.images.dir = "assets/img".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), r#"repo = "not-a-repo""#).unwrap();
        let result = load_config(tmp.path(), None, None);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: WikiConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = WikiConfig::default();
        assert_eq!(config.images.mode, defaults.images.mode);
        assert_eq!(config.images.dir, defaults.images.dir);
        assert_eq!(config.images.timeout_secs, defaults.images.timeout_secs);
        assert_eq!(config.pages.exclude, defaults.pages.exclude);
        assert_eq!(config.document.title_source, defaults.document.title_source);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.get("document").is_some());
        assert!(val.get("pages").is_some());
        assert!(val.get("images").is_some());
        assert!(val.get("repo").is_none());
    }
}
