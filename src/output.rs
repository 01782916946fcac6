//! CLI output formatting for compile and catalog commands.
//!
//! # Information-First Display
//!
//! The header line names the publication by its title, with the written
//! HTML file as secondary context. Indented lines summarize what the
//! compile produced and anything that went wrong without aborting.
//!
//! # Output Format
//!
//! ## Compile
//!
//! ```text
//! Particle in a box → out/particle.html
//!     Contents: 3 headings
//!     Resources: 2 files → out/particle/
//!     LaTeX: 1 cached, 1 rendered (2 total)
//!     Warning: could not copy /docs/gone.png to particle/gone.png: ...
//! ```
//!
//! ## Catalog
//!
//! ```text
//! Merged particle → site/catalog.json (4 entries)
//! Removed particle → site/catalog.json (3 entries)
//! No entry for particle in site/catalog.json
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use std::path::Path;

use crate::assemble::CompileReport;

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

// ============================================================================
// Compile
// ============================================================================

/// Format the summary of one compiled document.
pub fn format_compile_output(report: &CompileReport) -> Vec<String> {
    let artifact = &report.artifact;
    let mut lines = vec![format!(
        "{} → {}",
        artifact.meta.title,
        report.target.html_path().display()
    )];

    lines.push(format!(
        "    Contents: {}",
        plural(artifact.toc.len(), "heading", "headings")
    ));

    let mut resource_dir = report.target.resource_dir().display().to_string();
    resource_dir.push('/');
    lines.push(format!(
        "    Resources: {} → {}",
        plural(report.write.copied, "file", "files"),
        resource_dir
    ));

    if artifact.latex_stats.total() > 0 {
        lines.push(format!("    LaTeX: {}", artifact.latex_stats));
    }
    if !artifact.meta.show {
        lines.push("    Hidden from listings".to_string());
    }
    for warning in &report.write.warnings {
        lines.push(format!("    Warning: {}", warning));
    }
    lines
}

pub fn print_compile_output(report: &CompileReport) {
    for line in format_compile_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// What a catalog command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    Merged,
    Removed,
    NotFound,
}

pub fn format_catalog_output(
    change: CatalogChange,
    url: &str,
    catalog: &Path,
    entries: usize,
) -> Vec<String> {
    let line = match change {
        CatalogChange::Merged => format!(
            "Merged {} → {} ({})",
            url,
            catalog.display(),
            plural(entries, "entry", "entries")
        ),
        CatalogChange::Removed => format!(
            "Removed {} → {} ({})",
            url,
            catalog.display(),
            plural(entries, "entry", "entries")
        ),
        CatalogChange::NotFound => format!("No entry for {} in {}", url, catalog.display()),
    };
    vec![line]
}

pub fn print_catalog_output(change: CatalogChange, url: &str, catalog: &Path, entries: usize) {
    for line in format_catalog_output(change, url, catalog, entries) {
        println!("{}", line);
    }
}
