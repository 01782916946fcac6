//! LaTeX blocks embedded in markdown, compiled to images.
//!
//! ```text
//! \begin{latex}[alt text]        raw region (block.rs)
//!   ...                              │
//! \end{latex}                        ▼
//!                               LatexCompiler (compiler.rs)
//!                                 ├─ <preamble>? append, emit nothing
//!                                 ├─ id = unique(slugify(alt, '_'))
//!                                 ├─ hash(template + preamble + body)
//!                                 │    └─ PNG tEXt tex_hash matches? reuse (cache.rs)
//!                                 └─ typeset ×2, rasterize, embed hash (render.rs)
//!                                    │
//!                                    ▼
//!                               ![alt](<file://id.png>)
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`block`] | region recognition, shape validation, markdown emission |
//! | [`cache`] | source hashing and the PNG-embedded render cache |
//! | [`render`] | the [`LatexRenderer`] seam and the process-backed implementation |
//! | [`compiler`] | per-document state: preamble, id namespace, statistics |
//!
//! Every error here is fatal to the compile: a malformed block or a failed
//! render would otherwise silently drop content from the publication.

pub mod block;
pub mod cache;
pub mod compiler;
pub mod render;

use std::io;

use thiserror::Error;

pub use block::{BodyPart, LatexBlock, split_regions};
pub use cache::{CacheError, CacheStats};
pub use compiler::{LatexCompiler, RenderOutcome};
pub use render::{ExternalRenderer, LatexRenderer, RasterJob, RenderError, TypesetJob};

#[derive(Error, Debug)]
pub enum LatexError {
    #[error("malformed LaTeX block:\n{raw}")]
    Malformed { raw: String },
    #[error("failed to render LaTeX block `{snippet}`: {source}")]
    Render {
        snippet: String,
        #[source]
        source: RenderError,
    },
    #[error("LaTeX cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
