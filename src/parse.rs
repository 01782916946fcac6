//! Document parsing: header metadata, LaTeX regions, markdown → [`ParseTree`].
//!
//! ```text
//! text ─ split_header ─→ Metadata
//!          │
//!          └─ body ─ split_regions ─→ markdown / LaTeX regions
//!                                         │  (LaTeX compiled, replaced by
//!                                         │   an image reference)
//!                                         ▼
//!                              pulldown-cmark events ─→ ParseTree
//! ```
//!
//! The markdown grammar is CommonMark plus tables, footnotes,
//! strikethrough, task lists, definition lists and `$`-math. Malformed
//! markdown never fails; the only errors come from LaTeX compilation.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, LinkType, Options, Parser, Tag};

use crate::latex::{BodyPart, LatexCompiler, LatexError, split_regions};
use crate::metadata::{self, Metadata};
use crate::tree::{Node, NodeKind, ParseTree};

/// Markdown extensions enabled for every document.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_DEFINITION_LIST
}

/// Parse a full document, compiling its LaTeX regions on the way.
pub fn parse_document(
    text: &str,
    latex: &mut LatexCompiler<'_>,
) -> Result<(ParseTree, Metadata), LatexError> {
    let (meta, body) = metadata::split_header(text);
    tracing::debug!(keys = meta.keys().count(), "Parsed header");
    let markdown = expand_latex(body, latex)?;
    Ok((parse_markdown(&markdown), meta))
}

/// Replace every LaTeX region in `body` with the markdown it compiles to.
pub fn expand_latex(body: &str, latex: &mut LatexCompiler<'_>) -> Result<String, LatexError> {
    let mut out = String::with_capacity(body.len());
    for part in split_regions(body) {
        match part {
            BodyPart::Markdown(text) => out.push_str(&text),
            BodyPart::Latex(raw) => out.push_str(&latex.compile_region(&raw)?),
        }
    }
    Ok(out)
}

/// Parse markdown (no header, no LaTeX) into a tree.
pub fn parse_markdown(markdown: &str) -> ParseTree {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(markdown, markdown_options()) {
        builder.event(event);
    }
    builder.finish()
}

struct TreeBuilder {
    /// Open containers; index 0 is the document.
    stack: Vec<Node>,
    table_aligns: Vec<Alignment>,
    cell_index: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Node::new(NodeKind::Document)],
            table_aligns: Vec::new(),
            cell_index: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                let node = self.open(tag);
                self.stack.push(node);
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.leaf(Node::text(text.to_string())),
            Event::Code(code) => self.leaf(Node::leaf(NodeKind::Code, code.to_string())),
            Event::InlineMath(math) => self.leaf(Node::leaf(
                NodeKind::Formula { display: false },
                math.to_string(),
            )),
            Event::DisplayMath(math) => self.leaf(Node::leaf(
                NodeKind::Formula { display: true },
                math.to_string(),
            )),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.leaf(Node::leaf(NodeKind::RawHtml, html.to_string()))
            }
            Event::FootnoteReference(label) => {
                self.leaf(Node::leaf(NodeKind::FootnoteReference, label.to_string()))
            }
            Event::SoftBreak => self.leaf(Node::new(NodeKind::SoftBreak)),
            Event::HardBreak => self.leaf(Node::new(NodeKind::HardBreak)),
            Event::Rule => self.leaf(Node::new(NodeKind::Rule)),
            Event::TaskListMarker(checked) => self.leaf(Node::new(NodeKind::TaskMarker { checked })),
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) -> Node {
        match tag {
            Tag::Paragraph => Node::new(NodeKind::Paragraph),
            Tag::Heading { level, .. } => Node::new(NodeKind::Heading(level as u8)),
            Tag::BlockQuote(_) => Node::new(NodeKind::BlockQuote),
            Tag::CodeBlock(kind) => {
                let node = Node::new(NodeKind::CodeBlock);
                match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                        let lang = lang.split_whitespace().next().unwrap_or_default();
                        node.with_attr("class", format!("language-{}", lang))
                    }
                    _ => node,
                }
            }
            Tag::HtmlBlock => Node::new(NodeKind::HtmlBlock),
            Tag::List(start) => Node::new(NodeKind::List { start }),
            Tag::Item => Node::new(NodeKind::ListItem),
            Tag::FootnoteDefinition(label) => {
                Node::new(NodeKind::FootnoteDefinition).with_attr("id", label.to_string())
            }
            Tag::DefinitionList => Node::new(NodeKind::DefinitionList),
            Tag::DefinitionListTitle => Node::new(NodeKind::DefinitionTitle),
            Tag::DefinitionListDefinition => Node::new(NodeKind::DefinitionDetails),
            Tag::Table(aligns) => {
                self.table_aligns = aligns;
                Node::new(NodeKind::Table)
            }
            Tag::TableHead => {
                self.cell_index = 0;
                Node::new(NodeKind::TableHead)
            }
            Tag::TableRow => {
                self.cell_index = 0;
                Node::new(NodeKind::TableRow)
            }
            Tag::TableCell => {
                let node = Node::new(NodeKind::TableCell);
                let align = self.table_aligns.get(self.cell_index).copied();
                self.cell_index += 1;
                match align {
                    Some(Alignment::Left) => node.with_attr("style", "text-align: left"),
                    Some(Alignment::Center) => node.with_attr("style", "text-align: center"),
                    Some(Alignment::Right) => node.with_attr("style", "text-align: right"),
                    _ => node,
                }
            }
            Tag::Emphasis => Node::new(NodeKind::Emphasis),
            Tag::Strong => Node::new(NodeKind::Strong),
            Tag::Strikethrough => Node::new(NodeKind::Strikethrough),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => Node::new(NodeKind::Link {
                email: link_type == LinkType::Email,
            })
            .with_attr("href", dest_url.to_string())
            .with_attr("title", title.to_string()),
            Tag::Image {
                dest_url, title, ..
            } => Node::new(NodeKind::Image)
                .with_attr("src", dest_url.to_string())
                .with_attr("alt", "")
                .with_attr("title", title.to_string()),
            _ => Node::new(NodeKind::Span),
        }
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(mut node) = self.stack.pop() {
            if node.kind == NodeKind::Image {
                let alt = node.flatten_text();
                node.children.clear();
                node.set_attr("alt", alt);
            }
            self.leaf(node);
        }
    }

    fn leaf(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn finish(mut self) -> ParseTree {
        while self.stack.len() > 1 {
            self.close();
        }
        ParseTree::new(self.stack.pop().unwrap_or_else(|| Node::new(NodeKind::Document)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latex::render::tests::MockRenderer;
    use tempfile::TempDir;

    fn kinds(node: &Node) -> Vec<NodeKind> {
        node.children.iter().map(|c| c.kind.clone()).collect()
    }

    // =========================================================================
    // parse_markdown
    // =========================================================================

    #[test]
    fn headings_and_paragraphs() {
        let tree = parse_markdown("# One\n\nText.\n\n## Two\n");
        assert_eq!(
            kinds(tree.root()),
            vec![
                NodeKind::Heading(1),
                NodeKind::Paragraph,
                NodeKind::Heading(2)
            ]
        );
        assert_eq!(tree.root().children[0].flatten_text(), "One");
    }

    #[test]
    fn image_alt_becomes_attribute() {
        let tree = parse_markdown("![A *big* plot](file://plot.png \"T\")\n");
        let img = tree.find(|n| n.kind == NodeKind::Image).unwrap();
        assert!(img.children.is_empty());
        assert_eq!(img.attr("src"), Some("file://plot.png"));
        assert_eq!(img.attr("alt"), Some("A big plot"));
        assert_eq!(img.attr("title"), Some("T"));

        let para = tree.find(|n| n.kind == NodeKind::Paragraph).unwrap();
        assert_eq!(para.flatten_text(), "");
    }

    #[test]
    fn angle_bracket_destination() {
        let tree = parse_markdown("![x](<file://my dir/a.png>)\n");
        let img = tree.find(|n| n.kind == NodeKind::Image).unwrap();
        assert_eq!(img.attr("src"), Some("file://my dir/a.png"));
    }

    #[test]
    fn links_keep_href() {
        let tree = parse_markdown("[data](file://data.csv)\n");
        let link = tree.find(|n| n.kind == NodeKind::Link { email: false }).unwrap();
        assert_eq!(link.attr("href"), Some("file://data.csv"));
        assert_eq!(link.flatten_text(), "data");
    }

    #[test]
    fn email_autolink_is_marked() {
        let tree = parse_markdown("Mail <me@example.com>.\n");
        let link = tree.find(|n| n.kind == NodeKind::Link { email: true }).unwrap();
        assert_eq!(link.attr("href"), Some("me@example.com"));
    }

    #[test]
    fn math_is_formula_verbatim() {
        let tree = parse_markdown("Energy $E_n = n^2 \\pi$ here.\n\n$$\\int_0^1 x$$\n");
        let inline = tree
            .find(|n| n.kind == NodeKind::Formula { display: false })
            .unwrap();
        assert_eq!(inline.text.as_deref(), Some("E_n = n^2 \\pi"));
        assert!(
            tree.find(|n| n.kind == NodeKind::Formula { display: true })
                .is_some()
        );
    }

    #[test]
    fn html_block_is_raw() {
        let tree = parse_markdown("<div class=\"note\">\nhi\n</div>\n");
        let block = &tree.root().children[0];
        assert_eq!(block.kind, NodeKind::HtmlBlock);
        assert!(block.children.iter().all(|c| c.kind == NodeKind::RawHtml));
    }

    #[test]
    fn table_cells_carry_alignment() {
        let tree = parse_markdown("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        let cells = tree.find_all(|n| n.kind == NodeKind::TableCell);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].attr("style"), Some("text-align: left"));
        assert_eq!(cells[3].attr("style"), Some("text-align: right"));
    }

    #[test]
    fn fenced_code_language_class() {
        let tree = parse_markdown("```rust\nfn main() {}\n```\n");
        let code = &tree.root().children[0];
        assert_eq!(code.kind, NodeKind::CodeBlock);
        assert_eq!(code.attr("class"), Some("language-rust"));
        assert_eq!(code.flatten_text(), "fn main() {}\n");
    }

    #[test]
    fn footnotes_and_tasks() {
        let tree = parse_markdown("- [x] done\n\nNote[^1].\n\n[^1]: The note.\n");
        assert!(
            tree.find(|n| n.kind == NodeKind::TaskMarker { checked: true })
                .is_some()
        );
        assert!(
            tree.find(|n| n.kind == NodeKind::FootnoteReference)
                .is_some()
        );
        let def = tree
            .find(|n| n.kind == NodeKind::FootnoteDefinition)
            .unwrap();
        assert_eq!(def.attr("id"), Some("1"));
    }

    #[test]
    fn empty_document() {
        let tree = parse_markdown("");
        assert!(tree.root().children.is_empty());
    }

    // =========================================================================
    // parse_document
    // =========================================================================

    #[test]
    fn document_splits_header_and_body() {
        let tmp = TempDir::new().unwrap();
        let mock = MockRenderer::new();
        let mut latex = LatexCompiler::new(&mock, tmp.path(), ".");

        let (tree, meta) =
            parse_document("title: Demo\n\n# Heading One\n\nText.\n", &mut latex).unwrap();
        assert_eq!(meta.first("title"), Some("Demo"));
        assert_eq!(tree.root().children[0].kind, NodeKind::Heading(1));
    }

    #[test]
    fn latex_region_becomes_image() {
        let tmp = TempDir::new().unwrap();
        let mock = MockRenderer::new();
        let mut latex = LatexCompiler::new(&mock, tmp.path(), ".");

        let text = "Intro.\n\n\\begin{latex}[Energy levels]\nE\n\\end{latex}\n\nOutro.\n";
        let (tree, _) = parse_document(text, &mut latex).unwrap();
        let img = tree.find(|n| n.kind == NodeKind::Image).unwrap();
        assert_eq!(img.attr("src"), Some("file://energy_levels.png"));
        assert_eq!(img.attr("alt"), Some("Energy levels"));
        assert_eq!(tree.find_all(|n| n.kind == NodeKind::Paragraph).len(), 3);
    }

    #[test]
    fn latex_alt_with_punctuation_survives() {
        let tmp = TempDir::new().unwrap();
        let mock = MockRenderer::new();
        let mut latex = LatexCompiler::new(&mock, tmp.path(), ".");

        let text = "\\begin{latex}[f(x) = *x*_1]\nE\n\\end{latex}\n";
        let (tree, _) = parse_document(text, &mut latex).unwrap();
        let img = tree.find(|n| n.kind == NodeKind::Image).unwrap();
        assert_eq!(img.attr("alt"), Some("f(x) = *x*_1"));
    }

    #[test]
    fn preamble_region_leaves_no_trace() {
        let tmp = TempDir::new().unwrap();
        let mock = MockRenderer::new();
        let mut latex = LatexCompiler::new(&mock, tmp.path(), ".");

        let text = "\\begin{latex}[<preamble>]\n\\usepackage{bm}\n\\end{latex}\n\nText.\n";
        let (tree, _) = parse_document(text, &mut latex).unwrap();
        assert_eq!(kinds(tree.root()), vec![NodeKind::Paragraph]);
        assert_eq!(latex.preamble(), "\n\\usepackage{bm}\n");
    }

    #[test]
    fn malformed_latex_fails_parse() {
        let tmp = TempDir::new().unwrap();
        let mock = MockRenderer::new();
        let mut latex = LatexCompiler::new(&mock, tmp.path(), ".");

        let result = parse_document("\\begin{latex}[X]\nopen\n", &mut latex);
        assert!(matches!(result, Err(LatexError::Malformed { .. })));
    }
}
