//! Recognizing LaTeX regions in a markdown body.
//!
//! A region opens with a block (a chunk of lines after a blank line, not
//! indented) whose first line starts with `\begin{latex}[`. It extends over
//! following blank-line separated chunks until a line `\end{latex}` that ends
//! a chunk:
//!
//! ```text
//! \begin{latex}[Energy levels --pdf]
//!   \begin{tikzpicture}
//!     ...
//!
//!     ...
//!   \end{tikzpicture}
//! \end{latex}
//! ```
//!
//! The bracketed text is the alt text. The reserved alt text `<preamble>`
//! adds the body to the preamble of every later block instead of producing
//! an image. A `--pdf` token requests the typeset PDF next to the PNG.
//!
//! Fenced code blocks are passed through untouched, so documentation *about*
//! the syntax is never compiled.

use std::sync::LazyLock;

use regex::Regex;

use super::LatexError;

const OPENER: &str = "\\begin{latex}[";
const CLOSER: &str = "\\end{latex}";

/// Alt text marking a preamble block.
pub const PREAMBLE_ALT: &str = "<preamble>";

/// Alt-text token requesting a PDF alongside the PNG.
pub const PDF_FLAG: &str = "--pdf";

static LATEX_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)\A\\begin\{latex\}\[([^\]]*)\](.*)^\\end\{latex\}\s*\z").expect("valid regex")
});

/// A piece of the markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// Ordinary markdown, passed to the parser as-is.
    Markdown(String),
    /// The raw text of a LaTeX region, from opener to closer.
    Latex(String),
}

/// A validated LaTeX region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexBlock {
    /// Alt text with the PDF flag removed, trimmed.
    pub alt: String,
    pub body: String,
    pub want_pdf: bool,
}

impl LatexBlock {
    pub fn is_preamble(&self) -> bool {
        self.alt == PREAMBLE_ALT
    }
}

/// Split `body` into markdown and LaTeX regions, in document order.
///
/// An opener that is never closed extends to the end of the document; the
/// resulting region fails [`parse_block`].
pub fn split_regions(body: &str) -> Vec<BodyPart> {
    let lines: Vec<&str> = body.split_inclusive('\n').collect();
    let mut parts = Vec::new();
    let mut markdown = String::new();
    let mut fence: Option<String> = None;
    let mut prev_blank = true;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(marker) = &fence {
            if closes_fence(line, marker) {
                fence = None;
            }
            markdown.push_str(line);
            prev_blank = false;
            i += 1;
            continue;
        }

        if let Some(marker) = opens_fence(line) {
            fence = Some(marker);
            markdown.push_str(line);
            prev_blank = false;
            i += 1;
            continue;
        }

        if prev_blank && line.starts_with(OPENER) {
            let end = region_end(&lines, i);
            if !markdown.is_empty() {
                parts.push(BodyPart::Markdown(std::mem::take(&mut markdown)));
            }
            parts.push(BodyPart::Latex(lines[i..end].concat()));
            prev_blank = false;
            i = end;
            continue;
        }

        prev_blank = is_blank(line);
        markdown.push_str(line);
        i += 1;
    }

    if !markdown.is_empty() {
        parts.push(BodyPart::Markdown(markdown));
    }
    parts
}

/// Index one past the closing line of the region opened at `start`.
fn region_end(lines: &[&str], start: usize) -> usize {
    for j in start..lines.len() {
        let ends_chunk = lines.get(j + 1).is_none_or(|next| is_blank(next));
        if lines[j].trim_end() == CLOSER && ends_chunk {
            return j + 1;
        }
    }
    lines.len()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The fence marker (run of backticks or tildes) if `line` opens a fence.
fn opens_fence(line: &str) -> Option<String> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = rest.chars().take_while(|c| *c == ch).count();
    (run >= 3).then(|| ch.to_string().repeat(run))
}

fn closes_fence(line: &str, marker: &str) -> bool {
    let trimmed = line.trim();
    let Some(ch) = marker.chars().next() else {
        return false;
    };
    trimmed.len() >= marker.len() && trimmed.chars().all(|c| c == ch)
}

/// Validate a raw region and split it into alt text and body.
pub fn parse_block(raw: &str) -> Result<LatexBlock, LatexError> {
    let caps = LATEX_SHAPE
        .captures(raw)
        .ok_or_else(|| LatexError::Malformed {
            raw: raw.to_string(),
        })?;

    let alt = &caps[1];
    let body = caps[2].to_string();
    if alt == PREAMBLE_ALT {
        return Ok(LatexBlock {
            alt: alt.to_string(),
            body,
            want_pdf: false,
        });
    }

    let want_pdf = alt.split_whitespace().any(|t| t == PDF_FLAG);
    let alt = if want_pdf {
        alt.split_whitespace()
            .filter(|t| *t != PDF_FLAG)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        alt.trim().to_string()
    };
    Ok(LatexBlock {
        alt,
        body,
        want_pdf,
    })
}

/// Backslash-escape ASCII punctuation so `text` reads literally as markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_punctuation() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Markdown referencing a rendered image, linked to its PDF when present.
///
/// ```text
/// ![Energy levels](<file://img/energy_levels.png>)
/// [![Energy levels](<file://img/energy_levels.png>)](<file://img/energy_levels.pdf>)
/// ```
pub fn image_reference(alt: &str, png: &str, pdf: Option<&str>) -> String {
    let image = format!("![{}](<file://{}>)", escape_markdown(alt), png);
    match pdf {
        Some(pdf) => format!("[{}](<file://{}>)\n", image, pdf),
        None => format!("{}\n", image),
    }
}
