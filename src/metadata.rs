//! Document header metadata.
//!
//! A publication may open with a block of `key: value` lines:
//!
//! ```text
//! title: Energy levels of a particle in a box
//! subtitle: A worked example
//! tags: physics, quantum
//! include: data/
//!          notebooks/box.ipynb
//! img: file://figures/box.png
//!
//! # Introduction
//! ...
//! ```
//!
//! ## Header grammar
//!
//! - An optional first line `---` is skipped.
//! - A line `key: value` (up to three leading spaces, key made of letters,
//!   digits, `_` and `-`) starts a key. Keys are case-insensitive and stored
//!   lower-cased.
//! - A line indented by four or more spaces adds another value to the
//!   previous key.
//! - A blank line, or a line `---` / `...`, ends the header and is consumed.
//! - Any other line ends the header and stays in the body.
//!
//! Keys may repeat; every value is kept in order. A document with no header
//! simply has empty metadata.
//!
//! ## Resolution
//!
//! The header is raw data. Consumers decide per field which source wins via
//! [`resolve`], which picks the first non-empty candidate:
//!
//! ```text
//! title:   resolve(&[header title, first heading])  → else output name
//! img_alt: resolve(&[header img_alt, title])
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static KEY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ ]{0,3}(?P<key>[A-Za-z0-9_-]+):\s*(?P<value>.*)$").expect("valid regex")
});

static CONTINUATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ ]{4,}(?P<value>.*)$").expect("valid regex"));

/// Parsed header: lower-cased key → ordered values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values for `key`, in header order. Empty if the key is absent.
    pub fn values(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value for `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }

    /// Every value for `key` split on commas, trimmed, empties dropped.
    ///
    /// `tags: a, b` and two lines `tags: a` / `    b` give the same list.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.values(key)
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Boolean view of the first value.
    ///
    /// `true`/`yes`/`1` and `false`/`no`/`0` are recognised case-insensitively;
    /// a missing key or any other value yields `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.first(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "true" | "yes" | "1") => true,
            Some(v) if matches!(v.as_str(), "false" | "no" | "0") => false,
            _ => default,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Split a document into its header metadata and the remaining body.
pub fn split_header(text: &str) -> (Metadata, &str) {
    let mut meta = Metadata::new();
    let mut current_key: Option<String> = None;
    let mut rest = text;
    let mut first_line = true;

    while !rest.is_empty() {
        let (line, after) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        if first_line && line.trim_end() == "---" {
            first_line = false;
            rest = after;
            continue;
        }
        first_line = false;

        if line.trim().is_empty() || matches!(line.trim_end(), "---" | "...") {
            rest = after;
            break;
        }

        if let Some(caps) = KEY_LINE.captures(line) {
            let key = caps["key"].to_ascii_lowercase();
            meta.push(&key, caps["value"].trim());
            current_key = Some(key);
        } else if let (Some(key), Some(caps)) =
            (current_key.as_deref(), CONTINUATION_LINE.captures(line))
        {
            meta.push(key, caps["value"].trim());
        } else {
            break;
        }
        rest = after;
    }

    (meta, rest)
}

/// Resolve a field from candidates in priority order.
///
/// Returns the first candidate that is present and non-empty after trimming.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // split_header
    // =========================================================================

    #[test]
    fn header_and_body_are_split() {
        let (meta, body) = split_header("title: Demo\ntags: a, b\n\n# Heading One\n");
        assert_eq!(meta.first("title"), Some("Demo"));
        assert_eq!(meta.values("tags"), ["a, b"]);
        assert_eq!(body, "# Heading One\n");
    }

    #[test]
    fn no_header_leaves_body_untouched() {
        let text = "# Heading\n\nParagraph.\n";
        let (meta, body) = split_header(text);
        assert_eq!(meta.keys().count(), 0);
        assert_eq!(body, text);
    }

    #[test]
    fn header_without_blank_line_stops_at_first_non_key_line() {
        let (meta, body) = split_header("title: Demo\n# Heading\n");
        assert_eq!(meta.first("title"), Some("Demo"));
        assert_eq!(body, "# Heading\n");
    }

    #[test]
    fn continuation_lines_add_values() {
        let (meta, _) = split_header("include: data/\n    notes.txt\n    extra/\n\nbody");
        assert_eq!(meta.values("include"), ["data/", "notes.txt", "extra/"]);
    }

    #[test]
    fn repeated_keys_preserve_order() {
        let (meta, _) = split_header("tags: one\ntags: two\n\nbody");
        assert_eq!(meta.values("tags"), ["one", "two"]);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let (meta, _) = split_header("Title: Demo\n\n");
        assert_eq!(meta.first("title"), Some("Demo"));
        assert_eq!(meta.first("TITLE"), Some("Demo"));
    }

    #[test]
    fn yaml_style_fences_are_accepted() {
        let (meta, body) = split_header("---\ntitle: Fenced\n---\nBody text\n");
        assert_eq!(meta.first("title"), Some("Fenced"));
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn crlf_line_endings() {
        let (meta, body) = split_header("title: Demo\r\n\r\nBody\r\n");
        assert_eq!(meta.first("title"), Some("Demo"));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn header_only_document() {
        let (meta, body) = split_header("title: Only");
        assert_eq!(meta.first("title"), Some("Only"));
        assert_eq!(body, "");
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[test]
    fn list_splits_commas_across_values() {
        let mut meta = Metadata::new();
        meta.push("tags", "a, b");
        meta.push("tags", "c,,");
        assert_eq!(meta.list("tags"), vec!["a", "b", "c"]);
        assert!(meta.list("missing").is_empty());
    }

    #[test]
    fn flag_recognises_true_and_false() {
        let mut meta = Metadata::new();
        meta.push("show", "False");
        assert!(!meta.flag("show", true));

        let mut meta = Metadata::new();
        meta.push("show", "True");
        assert!(meta.flag("show", false));
    }

    #[test]
    fn flag_defaults_when_missing_or_unknown() {
        let meta = Metadata::new();
        assert!(meta.flag("show", true));

        let mut meta = Metadata::new();
        meta.push("show", "maybe");
        assert!(meta.flag("show", true));
    }

    // =========================================================================
    // resolve
    // =========================================================================

    #[test]
    fn resolve_first_non_empty_wins() {
        assert_eq!(
            resolve(&[None, Some("  "), Some("Heading"), Some("name")]),
            Some("Heading".to_string())
        );
    }

    #[test]
    fn resolve_all_empty_is_none() {
        assert_eq!(resolve(&[None, Some("")]), None);
    }
}
