//! # wikicat
//!
//! Compiles a directory of GitHub-wiki markdown pages into one self-contained
//! markdown document, with a table of contents, in-document cross links and
//! optionally embedded or downloaded images.
//!
//! # Architecture: Two Passes
//!
//! ```text
//! 1. Scan      wiki/  →  Wiki { pages, anchors }   (titles, order, anchor map)
//! 2. Assemble  Wiki   →  wiki.md (+ images/)       (rewrite, normalize, concatenate)
//! ```
//!
//! Link rewriting needs to know every page's anchor, so nothing is rewritten
//! until the first pass has loaded, sorted and registered all pages.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Pass 1: reads the source directory, derives titles and sort keys, builds the anchor map |
//! | [`assemble`] | Pass 2: renders preamble, contents and sections, writes the output file |
//! | [`naming`] | `NN[a]-name` filename convention: sort keys, prefix stripping, fallback titles |
//! | [`anchors`] | Anchor slugs and the page-name → anchor lookup table |
//! | [`links`] | `[[Wiki]]` and relative markdown link rewriting, unresolved link reports |
//! | [`headings`] | Setext conversion, heading demotion, page title injection |
//! | [`images`] | Image reference resolution: skip, embed as data URI, or download |
//! | [`config`] | `wikicat.toml` loading, layering with CLI flags, validation |
//! | [`types`] | Shared `Page` type |
//! | [`output`] | CLI output formatting |
//!
//! # Page Ordering
//!
//! Pages are ordered by a two-digit filename prefix with an optional letter
//! (`01-`, `02-`, `02a-`). Pages without one come after all numbered pages.
//! Remaining ties break on the lowercase filename, so output is deterministic.
//!
//! # Stability
//!
//! Rewriting is idempotent: rewritten links point at `#anchor`, which is never
//! rewritten again, and heading normalization applied to its own output
//! changes nothing.

pub mod anchors;
pub mod assemble;
pub mod config;
pub mod headings;
pub mod images;
pub mod links;
pub mod naming;
pub mod output;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
