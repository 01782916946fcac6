//! Table of contents and heading anchors.

use crate::naming::{NameRegistry, slugify};
use crate::tree::{NodeKind, ParseTree};
use crate::types::TocEntry;

/// Anchor used when a heading has no sluggable text.
const FALLBACK_ANCHOR: &str = "section";

/// Collect headings in document order and give each a unique `id`.
pub fn extract_toc(tree: &mut ParseTree) -> Vec<TocEntry> {
    let mut anchors = NameRegistry::new();
    let mut entries = Vec::new();

    tree.root_mut().walk_mut(&mut |node| {
        let NodeKind::Heading(level) = node.kind else {
            return;
        };
        let label = node.flatten_text().trim().to_string();
        let mut slug = slugify(&label, '-');
        if slug.is_empty() {
            slug = FALLBACK_ANCHOR.to_string();
        }
        let id = anchors.claim(&slug);
        node.set_attr("id", id.clone());
        entries.push(TocEntry { level, label, id });
    });

    tracing::debug!(count = entries.len(), "Extracted table of contents");
    entries
}
