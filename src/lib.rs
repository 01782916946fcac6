//! # pubgen
//!
//! A publication compiler: markdown documents with a metadata header and
//! embedded LaTeX become an HTML fragment plus the files a site needs to
//! list and serve them.
//!
//! # Architecture: One Document, Ordered Passes
//!
//! ```text
//! box.md ─ split header ─ expand LaTeX blocks ─ parse markdown
//!        ─ abstract ─ resources ─ toc ─ render HTML
//!        ─ write box.html, box.toc, box.meta, box/…
//! ```
//!
//! Each pass is a plain function over the parse tree, called in a fixed
//! order by [`assemble::compile_markdown`]. Passes are pure except for LaTeX
//! rendering and the article thumbnail, which write images next to their
//! sources; the output directory is only touched by
//! [`assemble::write_artifacts`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`metadata`] | `key: value` header parsing and typed field access |
//! | [`latex`] | LaTeX regions, PNG-embedded render cache, external renderer |
//! | [`parse`] | markdown → [`tree::ParseTree`] with LaTeX expanded inline |
//! | [`tree`] | the owned document tree the passes walk and rewrite |
//! | [`passes`] | abstract, resource and table-of-contents extraction |
//! | [`html`] | tree → HTML fragment |
//! | [`imaging`] | article thumbnails |
//! | [`assemble`] | the compile pipeline and artifact writer |
//! | [`catalog`] | merge / remove `.meta` records in a site catalog |
//! | [`config`] | `pubgen.toml` loading, validation, merging |
//! | [`naming`] | slugs and the `N_name` collision scheme |
//! | [`types`] | records serialized to `.toc` and `.meta` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Cache Lives in the Image
//!
//! A rendered LaTeX image carries the SHA-256 of its full source in a PNG
//! `tEXt` chunk. Recompiling compares the hash and skips both typesetting
//! passes and rasterization when it matches. There is no side database to go
//! stale: deleting or replacing the PNG is enough to force a render.
//!
//! ## A Renderer Trait at the Process Boundary
//!
//! [`latex::LatexRenderer`] is the only place external programs run. The
//! compiler owns hashing, naming and scratch directories; tests swap in a
//! recording renderer and exercise the cache policy without a TeX install.
//!
//! ## One Naming Scheme
//!
//! Anchors, LaTeX image ids and resource file names all resolve collisions
//! the same way: the first claim keeps the name, later ones become `1_name`,
//! `2_name`, …

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod html;
pub mod imaging;
pub mod latex;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod parse;
pub mod passes;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
