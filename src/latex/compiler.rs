//! Per-document LaTeX compilation: preamble, naming and render-or-reuse.

use std::fs;
use std::path::{Path, PathBuf};

use super::LatexError;
use super::block::{image_reference, parse_block};
use super::cache::{CacheStats, source_hash, store_hash, stored_hash};
use super::render::{LatexRenderer, RasterJob, RenderError, TypesetJob};
use crate::naming::{NameRegistry, slugify};

/// pdflatex needs a second pass to settle references and bounding boxes.
const TYPESET_PASSES: u32 = 2;

/// Characters of the block body quoted in a render error.
const SNIPPET_LEN: usize = 120;

/// Everything before the document preamble.
const TEMPLATE_HEAD: &str = r"\documentclass[border=0pt]{standalone}

\usepackage{amsmath}
\usepackage{amssymb}

\usepackage{graphicx}

\usepackage{tikz}
\usetikzlibrary{positioning}

";

/// Whether an image was reused or rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Cached,
    Rendered,
}

/// Compiles the LaTeX regions of one document, in order.
///
/// Holds the running preamble (blocks only see preamble text declared above
/// them) and the image-id namespace.
pub struct LatexCompiler<'r> {
    renderer: &'r dyn LatexRenderer,
    base_dir: PathBuf,
    image_dir: String,
    preamble: String,
    names: NameRegistry,
    stats: CacheStats,
}

impl<'r> LatexCompiler<'r> {
    /// `base_dir` is the document's directory; images go to
    /// `<base_dir>/<image_dir>/`.
    pub fn new(renderer: &'r dyn LatexRenderer, base_dir: &Path, image_dir: &str) -> Self {
        let base_dir = if base_dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            base_dir.to_path_buf()
        };
        Self {
            renderer,
            base_dir,
            image_dir: image_dir.trim_end_matches('/').to_string(),
            preamble: String::new(),
            names: NameRegistry::new(),
            stats: CacheStats::default(),
        }
    }

    /// Compile one raw region and return the markdown that replaces it.
    ///
    /// Preamble regions return an empty string.
    pub fn compile_region(&mut self, raw: &str) -> Result<String, LatexError> {
        let block = parse_block(raw)?;
        if block.is_preamble() {
            tracing::debug!(len = block.body.len(), "Extending LaTeX preamble");
            self.preamble.push_str(&block.body);
            return Ok(String::new());
        }

        let mut slug = slugify(&block.alt, '_');
        if slug.is_empty() {
            slug = "latex".to_string();
        }
        let id = self.names.claim(&slug);

        let png_rel = self.relative(&format!("{}.png", id));
        let pdf_rel = block.want_pdf.then(|| self.relative(&format!("{}.pdf", id)));
        let png = self.base_dir.join(&png_rel);
        let pdf = pdf_rel.as_ref().map(|rel| self.base_dir.join(rel));

        let outcome = self.render_or_reuse(&block.body, &png, pdf.as_deref())?;
        tracing::debug!(id = %id, ?outcome, "LaTeX block");

        Ok(image_reference(&block.alt, &png_rel, pdf_rel.as_deref()))
    }

    /// Full standalone document for `body` under the current preamble.
    pub fn compose(&self, body: &str) -> String {
        format!(
            "{}{}\n\\begin{{document}}\n{}\n\\end{{document}}\n",
            TEMPLATE_HEAD, self.preamble, body
        )
    }

    /// Render `body` into `png` (and `pdf`) unless `png` already carries the
    /// hash of the composed source.
    pub fn render_or_reuse(
        &mut self,
        body: &str,
        png: &Path,
        pdf: Option<&Path>,
    ) -> Result<RenderOutcome, LatexError> {
        let source = self.compose(body);
        let hash = source_hash(&source);

        let pdf_present = pdf.is_none_or(Path::exists);
        if pdf_present && stored_hash(png).as_deref() == Some(hash.as_str()) {
            self.stats.hit();
            return Ok(RenderOutcome::Cached);
        }

        tracing::info!(png = %png.display(), "Rendering LaTeX");
        self.render(&source, png, pdf)
            .map_err(|source| LatexError::Render {
                snippet: snippet(body),
                source,
            })?;
        store_hash(png, &hash)?;
        self.stats.miss();
        Ok(RenderOutcome::Rendered)
    }

    /// The scratch directory is removed when `scratch` drops, on every path.
    fn render(&self, source: &str, png: &Path, pdf: Option<&Path>) -> Result<(), RenderError> {
        let scratch = tempfile::Builder::new()
            .prefix("pubgen-latex-")
            .tempdir()?;
        let tex_file = scratch.path().join("file.tex");
        fs::write(&tex_file, source)?;

        let job = TypesetJob {
            tex_file,
            output_dir: scratch.path().to_path_buf(),
            working_dir: self.base_dir.clone(),
        };
        for pass in 1..=TYPESET_PASSES {
            tracing::debug!(pass, "Typesetting");
            self.renderer.typeset(&job)?;
        }

        if let Some(parent) = png.parent() {
            fs::create_dir_all(parent)?;
        }
        let typeset_pdf = scratch.path().join("file.pdf");
        self.renderer.rasterize(&RasterJob {
            pdf: typeset_pdf.clone(),
            png: png.to_path_buf(),
            log_dir: scratch.path().to_path_buf(),
        })?;

        if let Some(pdf) = pdf {
            fs::copy(&typeset_pdf, pdf)?;
        }
        Ok(())
    }

    fn relative(&self, file: &str) -> String {
        if self.image_dir.is_empty() || self.image_dir == "." {
            file.to_string()
        } else {
            format!("{}/{}", self.image_dir, file)
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
