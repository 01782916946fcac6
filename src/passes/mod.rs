//! Tree passes run after parsing, in a fixed order.
//!
//! ```text
//! ParseTree ─ abstract_text (read-only)
//!           ─ resources     (rewrites file:// src/href, claims names)
//!           ─ toc           (writes heading ids)
//! ```
//!
//! The order is explicit in [`crate::assemble::compile_markdown`]. Anchors
//! are assigned after resources so the ToC sees the final tree.

pub mod abstract_text;
pub mod resources;
pub mod toc;

pub use abstract_text::extract_abstract;
pub use resources::{ResourceManifest, extract_resources};
pub use toc::extract_toc;
