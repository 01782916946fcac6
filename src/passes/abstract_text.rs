//! The abstract: text of the first real paragraph.

use crate::tree::{NodeKind, ParseTree};

/// Flattened text of the first paragraph (pre-order) that has visible text.
///
/// Paragraphs that are empty, whitespace-only or nothing but raw HTML are
/// skipped. Returns `""` when no paragraph qualifies.
pub fn extract_abstract(tree: &ParseTree) -> String {
    let mut found = String::new();
    tree.root().walk(&mut |node| {
        if node.kind != NodeKind::Paragraph || node.is_raw_placeholder() {
            return true;
        }
        let text = node.flatten_text();
        let text = text.trim();
        if text.is_empty() {
            return true;
        }
        found = text.to_string();
        false
    });
    tracing::debug!(len = found.len(), "Extracted abstract");
    found
}
