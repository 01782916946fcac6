//! Shared test utilities for the pubgen test suite.
//!
//! Provides fixture writers (documents, tiny PNGs) and artifact readers so
//! unit tests can build a throwaway document tree in a `TempDir` and inspect
//! what the compiler wrote.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let doc = write_doc(tmp.path(), "demo.md", "title: Demo\n\n# Heading\n");
//! write_png(&tmp.path().join("figs/plot.png"), 8, 8);
//! ```

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a solid-colour RGB PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(width, height, Rgb([200, 80, 40]))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Write a markdown document under `dir` and return its path.
pub fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

// =========================================================================
// Artifact readers: panic with a clear message on failure
// =========================================================================

/// Read and parse a JSON artifact.
pub fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

/// Sorted relative paths of every file under `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}
