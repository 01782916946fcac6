//! Site catalog: a JSON list of `.meta` records keyed by `url`.
//!
//! ```text
//! merge-meta catalog.json box.meta   drop entries with box's url, append box
//! rm-meta    catalog.json box        drop entries with url "box"
//! ```
//!
//! Both operations are idempotent. The file is rewritten through a temp file
//! in the same directory; concurrent writers are not coordinated.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::types::PublicationMeta;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tempfile::PersistError> for CatalogError {
    fn from(e: tempfile::PersistError) -> Self {
        Self::Io(e.error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<PublicationMeta>,
}

impl Catalog {
    /// Load a catalog. A missing file is an empty catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            entries: serde_json::from_str(&text)?,
        })
    }

    /// Read a single `.meta` record.
    pub fn read_meta(path: &Path) -> Result<PublicationMeta, CatalogError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Replace every entry sharing `meta.url` with `meta`, appended last.
    pub fn merge(&mut self, meta: PublicationMeta) {
        self.entries.retain(|e| e.url != meta.url);
        tracing::debug!(url = %meta.url, "Merged catalog entry");
        self.entries.push(meta);
    }

    /// Drop every entry with `url`. Returns whether anything was removed.
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.url != url);
        let removed = self.entries.len() != before;
        tracing::debug!(url, removed, "Removed catalog entry");
        removed
    }

    pub fn entries(&self) -> &[PublicationMeta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write atomically: temp file in the target directory, then rename.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.entries)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)?;
        tracing::info!(path = %path.display(), entries = self.len(), "Saved catalog");
        Ok(())
    }
}
