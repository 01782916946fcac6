//! The document tree shared by the parser, the tree passes and the HTML writer.
//!
//! A [`ParseTree`] owns a root [`Node`] of kind [`NodeKind::Document`]. Every
//! node owns its children, and children are stored in document order, so a
//! pre-order walk visits content exactly as the author wrote it.
//!
//! Text lives in leaf nodes ([`NodeKind::Text`], [`NodeKind::Code`],
//! [`NodeKind::Formula`], [`NodeKind::RawHtml`]). Container nodes carry
//! attributes such as `href`, `src`, `alt` or `id` as ordered key/value
//! pairs.

/// Semantic kind of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    /// Heading level 1–6.
    Heading(u8),
    BlockQuote,
    CodeBlock,
    /// Raw HTML block; children are [`NodeKind::RawHtml`] leaves.
    HtmlBlock,
    /// `start` is `Some` for ordered lists.
    List { start: Option<u64> },
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition,
    DefinitionList,
    DefinitionTitle,
    DefinitionDetails,
    Rule,
    Text,
    Code,
    RawHtml,
    /// `$…$` (inline) or `$$…$$` (display) math, content kept verbatim.
    Formula { display: bool },
    Emphasis,
    Strong,
    Strikethrough,
    /// `email` marks `<user@host>` autolinks, written with a `mailto:` href.
    Link { email: bool },
    Image,
    SoftBreak,
    HardBreak,
    FootnoteReference,
    TaskMarker { checked: bool },
    /// Inline container for extensions without a dedicated kind.
    Span,
}

impl NodeKind {
    pub fn is_heading(&self) -> bool {
        matches!(self, NodeKind::Heading(_))
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            text: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A leaf carrying text content (text, code, formula, raw HTML, ...).
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(kind)
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text, text)
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    /// Concatenated text of this node and all descendants.
    ///
    /// Text and inline code are included, formulas keep their `$` / `$$`
    /// delimiters, breaks become `\n`. Raw HTML is markup, not text, and is
    /// skipped.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::RawHtml | NodeKind::HtmlBlock => return,
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
            NodeKind::Formula { display } => {
                let delim = if display { "$$" } else { "$" };
                out.push_str(delim);
                out.push_str(self.text.as_deref().unwrap_or_default());
                out.push_str(delim);
                return;
            }
            _ => {}
        }
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// True when the node's only content is raw HTML.
    ///
    /// Such a paragraph stands in for stripped markup, not prose.
    pub fn is_raw_placeholder(&self) -> bool {
        let mut saw_raw = false;
        for child in &self.children {
            match child.kind {
                NodeKind::RawHtml => saw_raw = true,
                NodeKind::SoftBreak | NodeKind::HardBreak => {}
                NodeKind::Text if child.text.as_deref().is_none_or(|t| t.trim().is_empty()) => {}
                _ => return false,
            }
        }
        saw_raw
    }

    /// Pre-order walk; `visit` returns `false` to stop the walk.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node) -> bool) -> bool {
        if !visit(self) {
            return false;
        }
        for child in &self.children {
            if !child.walk(visit) {
                return false;
            }
        }
        true
    }

    /// Pre-order walk with mutable access.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Node)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// A parsed document: a root node of kind [`NodeKind::Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    root: Node,
}

impl ParseTree {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// First node (pre-order) matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&Node) -> bool) -> Option<&Node> {
        let mut found = None;
        self.root.walk(&mut |node| {
            if predicate(node) {
                found = Some(node);
                false
            } else {
                true
            }
        });
        found
    }

    /// All nodes (pre-order) matching `predicate`.
    pub fn find_all(&self, predicate: impl Fn(&Node) -> bool) -> Vec<&Node> {
        let mut found = Vec::new();
        self.root.walk(&mut |node| {
            if predicate(node) {
                found.push(node);
            }
            true
        });
        found
    }
}

impl Default for ParseTree {
    fn default() -> Self {
        Self::new(Node::new(NodeKind::Document))
    }
}
