//! Records shared between the compiler passes, the artifact writer and the
//! catalog.
//!
//! `TocEntry` and `PublicationMeta` are written to disk as JSON (`<name>.toc`,
//! `<name>.meta`) and read back by the catalog commands, so their serialized
//! shape is part of the output format.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One heading in the table of contents.
///
/// Serialized as a JSON array `[level, label, id]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u8, String, String)", into = "(u8, String, String)")]
pub struct TocEntry {
    /// Heading level 1–6.
    pub level: u8,
    /// Flattened heading text.
    pub label: String,
    /// Anchor id written onto the heading.
    pub id: String,
}

impl From<(u8, String, String)> for TocEntry {
    fn from((level, label, id): (u8, String, String)) -> Self {
        Self { level, label, id }
    }
}

impl From<TocEntry> for (u8, String, String) {
    fn from(entry: TocEntry) -> Self {
        (entry.level, entry.label, entry.id)
    }
}

/// The `.meta` record describing a compiled publication.
///
/// Optional fields serialize as `null`; missing fields in catalog files read
/// back as their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMeta {
    /// Output name; the catalog key.
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Article image, rewritten to its copied location.
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub img_alt: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_show")]
    pub show: bool,
}

fn default_show() -> bool {
    true
}

/// A file to copy into the output resource directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Resolved source path on disk.
    pub source: PathBuf,
    /// Destination relative to the output directory (`<name>/<file>`).
    pub target: String,
    /// A failed copy of an essential resource aborts the write.
    pub essential: bool,
}
