//! Render cache for LaTeX images.
//!
//! Typesetting a block runs pdflatex twice plus a rasterizer, which takes
//! seconds per image. The compiler skips that work when the image on disk was
//! produced from exactly the same LaTeX source.
//!
//! # Design
//!
//! The cache key is the SHA-256 of the *composed* document (template +
//! preamble + block body), so a change to the shared preamble rebuilds every
//! image that depends on it.
//!
//! There is no manifest file. The hash travels inside the rendered PNG as a
//! `tEXt` chunk with keyword [`HASH_KEYWORD`], which means:
//!
//! - copying or committing the image directory keeps the cache valid,
//! - deleting an image is enough to force its rebuild,
//! - an unreadable or foreign PNG is simply a miss.
//!
//! Writing the chunk re-encodes the PNG through a temp file in the same
//! directory and renames it over the original, so a crash never leaves a
//! truncated image behind.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use png::{Decoder, Encoder, Transformations};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// `tEXt` keyword under which the source hash is stored.
pub const HASH_KEYWORD: &str = "tex_hash";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("PNG decode error: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("Failed to replace image: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// SHA-256 of a composed LaTeX document, as lowercase hex.
pub fn source_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

/// The hash stored in `png`, if any.
///
/// A missing, unreadable or chunk-less file yields `None`.
pub fn stored_hash(png: &Path) -> Option<String> {
    let file = File::open(png).ok()?;
    let reader = Decoder::new(BufReader::new(file)).read_info().ok()?;
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == HASH_KEYWORD)
    {
        return Some(chunk.text.clone());
    }
    info.utf8_text
        .iter()
        .find(|c| c.keyword == HASH_KEYWORD)
        .and_then(|c| c.get_text().ok())
}

/// Embed `hash` into `png`, replacing any previous value.
///
/// The image is decoded and re-encoded. Pixel data, palette, `tRNS` and the
/// other uncompressed `tEXt` chunks carry over; `zTXt`, `iTXt` and every
/// other ancillary chunk are dropped.
pub fn store_hash(png: &Path, hash: &str) -> Result<(), CacheError> {
    let mut decoder = Decoder::new(BufReader::new(File::open(png)?));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut pixels = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());

    let info = reader.info();
    let (width, height) = (info.width, info.height);
    let palette = info.palette.as_ref().map(|p| p.to_vec());
    let trns = info.trns.as_ref().map(|t| t.to_vec());
    let texts: Vec<(String, String)> = info
        .uncompressed_latin1_text
        .iter()
        .filter(|c| c.keyword != HASH_KEYWORD)
        .map(|c| (c.keyword.clone(), c.text.clone()))
        .collect();

    let dir = match png.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut out = BufWriter::new(tmp.as_file());
    {
        let mut encoder = Encoder::new(&mut out, width, height);
        encoder.set_color(frame.color_type);
        encoder.set_depth(frame.bit_depth);
        if let Some(palette) = palette {
            encoder.set_palette(palette);
        }
        if let Some(trns) = trns {
            encoder.set_trns(trns);
        }
        for (keyword, text) in texts {
            encoder.add_text_chunk(keyword, text)?;
        }
        encoder.add_text_chunk(HASH_KEYWORD.to_string(), hash.to_string())?;

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
        writer.finish()?;
    }
    // Flush errors are lost on drop.
    out.into_inner().map_err(io::IntoInnerError::into_error)?;
    tmp.persist(png)?;
    Ok(())
}

/// Cached vs rendered LaTeX images for one compile.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}
