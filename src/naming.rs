//! Slugs and collision-free names.
//!
//! Three parts of the compiler hand out names that must not collide within a
//! single document:
//!
//! - resource files copied into the output directory (`diagram.png`),
//! - heading anchors written onto the HTML (`heading-one`),
//! - LaTeX image ids derived from alt text (`energy_levels`).
//!
//! All three use the same scheme. A candidate is derived from the source text
//! and, when it is already claimed, gets an incrementing numeric prefix:
//!
//! ```text
//! diagram.png → diagram.png, 1_diagram.png, 2_diagram.png, ...
//! ```
//!
//! Each use keeps its own [`NameRegistry`], so an anchor never blocks a
//! resource name and vice versa.

use std::collections::HashSet;

/// Turn arbitrary text into a URL and filesystem safe identifier.
///
/// - Non-ASCII text is transliterated (`"Café"` → `"cafe"`).
/// - Anything that is not alphanumeric, `_`, `-` or whitespace is dropped.
/// - The result is trimmed and lower-cased.
/// - Runs of whitespace and `separator` collapse into a single `separator`.
///
/// ```text
/// slugify("Heading One", '-')        → "heading-one"
/// slugify("Energy  Levels!", '_')    → "energy_levels"
/// slugify("What's new?", '-')        → "whats-new"
/// ```
pub fn slugify(text: &str, separator: char) -> String {
    let ascii = deunicode::deunicode(text);
    let filtered: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let lowered = filtered.trim().to_ascii_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut in_run = false;
    for c in lowered.chars() {
        if c == separator || c.is_whitespace() {
            if !in_run {
                slug.push(separator);
                in_run = true;
            }
        } else {
            slug.push(c);
            in_run = false;
        }
    }
    slug
}

/// Return `base` if it is not taken, otherwise the first free `N_base`.
pub fn unique(base: &str, taken: &HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1u32;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", counter, base);
        counter += 1;
    }
    candidate
}

/// A namespace of claimed names.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique name derived from `base` and record it.
    pub fn claim(&mut self, base: &str) -> String {
        let name = unique(base, &self.taken);
        self.taken.insert(name.clone());
        name
    }
}
