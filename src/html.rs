//! HTML serialization of a [`ParseTree`].
//!
//! The tree is replayed as pulldown-cmark events and written with
//! [`md_html::push_html`], so escaping, element layout and footnote numbering
//! are pulldown-cmark's own. Produces body HTML only (no `<html>`/`<head>`
//! shell).
//!
//! What the tree passes rewrote travels on the events: heading `id`s from the
//! table of contents, `src` / `href` from resource extraction.

use pulldown_cmark::{
    Alignment, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, html as md_html,
};

use crate::tree::{Node, NodeKind, ParseTree};

/// Serialize the tree to an HTML fragment.
pub fn render(tree: &ParseTree) -> String {
    let mut events = Vec::new();
    for child in &tree.root().children {
        push_events(child, &mut events);
    }
    let mut out = String::new();
    md_html::push_html(&mut out, events.into_iter());
    out
}

fn text_of(node: &Node) -> CowStr<'_> {
    CowStr::Borrowed(node.text.as_deref().unwrap_or_default())
}

fn attr_of<'a>(node: &'a Node, key: &str) -> CowStr<'a> {
    CowStr::Borrowed(node.attr(key).unwrap_or_default())
}

fn push_events<'a>(node: &'a Node, events: &mut Vec<Event<'a>>) {
    let tag = match &node.kind {
        NodeKind::Document | NodeKind::Span => {
            for child in &node.children {
                push_events(child, events);
            }
            return;
        }
        NodeKind::Text => return events.push(Event::Text(text_of(node))),
        NodeKind::Code => return events.push(Event::Code(text_of(node))),
        NodeKind::RawHtml => return events.push(Event::InlineHtml(text_of(node))),
        NodeKind::Formula { display: false } => {
            return events.push(Event::InlineMath(text_of(node)));
        }
        NodeKind::Formula { display: true } => {
            return events.push(Event::DisplayMath(text_of(node)));
        }
        NodeKind::FootnoteReference => {
            return events.push(Event::FootnoteReference(text_of(node)));
        }
        NodeKind::TaskMarker { checked } => return events.push(Event::TaskListMarker(*checked)),
        NodeKind::SoftBreak => return events.push(Event::SoftBreak),
        NodeKind::HardBreak => return events.push(Event::HardBreak),
        NodeKind::Rule => return events.push(Event::Rule),
        NodeKind::HtmlBlock => {
            events.push(Event::Start(Tag::HtmlBlock));
            for child in &node.children {
                events.push(Event::Html(text_of(child)));
            }
            events.push(Event::End(Tag::HtmlBlock.to_end()));
            return;
        }
        NodeKind::Image => {
            // Alt text was folded into an attribute by the parser.
            let tag = Tag::Image {
                link_type: LinkType::Inline,
                dest_url: attr_of(node, "src"),
                title: attr_of(node, "title"),
                id: CowStr::Borrowed(""),
            };
            let end = tag.to_end();
            events.push(Event::Start(tag));
            let alt = attr_of(node, "alt");
            if !alt.is_empty() {
                events.push(Event::Text(alt));
            }
            events.push(Event::End(end));
            return;
        }
        NodeKind::Paragraph => Tag::Paragraph,
        NodeKind::Heading(level) => Tag::Heading {
            level: HeadingLevel::try_from(usize::from(*level)).unwrap_or(HeadingLevel::H6),
            id: node.attr("id").map(CowStr::Borrowed),
            classes: Vec::new(),
            attrs: Vec::new(),
        },
        NodeKind::BlockQuote => Tag::BlockQuote(None),
        NodeKind::CodeBlock => {
            match node
                .attr("class")
                .and_then(|class| class.strip_prefix("language-"))
            {
                Some(lang) => Tag::CodeBlock(CodeBlockKind::Fenced(CowStr::Borrowed(lang))),
                None => Tag::CodeBlock(CodeBlockKind::Indented),
            }
        }
        NodeKind::List { start } => Tag::List(*start),
        NodeKind::ListItem => Tag::Item,
        NodeKind::Table => Tag::Table(table_alignments(node)),
        NodeKind::TableHead => Tag::TableHead,
        NodeKind::TableRow => Tag::TableRow,
        NodeKind::TableCell => Tag::TableCell,
        NodeKind::FootnoteDefinition => Tag::FootnoteDefinition(attr_of(node, "id")),
        NodeKind::DefinitionList => Tag::DefinitionList,
        NodeKind::DefinitionTitle => Tag::DefinitionListTitle,
        NodeKind::DefinitionDetails => Tag::DefinitionListDefinition,
        NodeKind::Emphasis => Tag::Emphasis,
        NodeKind::Strong => Tag::Strong,
        NodeKind::Strikethrough => Tag::Strikethrough,
        NodeKind::Link { email } => Tag::Link {
            link_type: if *email {
                LinkType::Email
            } else {
                LinkType::Inline
            },
            dest_url: attr_of(node, "href"),
            title: attr_of(node, "title"),
            id: CowStr::Borrowed(""),
        },
    };
    let end = tag.to_end();
    events.push(Event::Start(tag));
    for child in &node.children {
        push_events(child, events);
    }
    events.push(Event::End(end));
}

/// Column alignments, read back from the header cells' `style`.
fn table_alignments(table: &Node) -> Vec<Alignment> {
    let Some(head) = table
        .children
        .iter()
        .find(|child| child.kind == NodeKind::TableHead)
    else {
        return Vec::new();
    };
    head.children
        .iter()
        .map(|cell| match cell.attr("style") {
            Some("text-align: left") => Alignment::Left,
            Some("text-align: center") => Alignment::Center,
            Some("text-align: right") => Alignment::Right,
            _ => Alignment::None,
        })
        .collect()
}
