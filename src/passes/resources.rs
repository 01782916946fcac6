//! Local resources: `file://` images and links.
//!
//! Every `Image` `src` and `Link` `href` starting with `file://` names a file
//! relative to the document. The pass gives each reference a collision-free
//! name in the output resource directory and rewrites the attribute to point
//! there:
//!
//! ```text
//! ![a](file://figs/diagram.png)   → src="particle-box/diagram.png"
//! ![b](file://old/diagram.png)    → src="particle-box/1_diagram.png"
//! ```
//!
//! The returned [`ResourceManifest`] lists what to copy and keeps the name
//! namespace, so the assembler can add the article image later without
//! clobbering a body resource.

use std::path::{Path, PathBuf};

use crate::naming::NameRegistry;
use crate::tree::{NodeKind, ParseTree};
use crate::types::ResourceReference;

/// Scheme marking a local file reference.
pub const FILE_SCHEME: &str = "file://";

/// Files to copy into the resource directory, in first-seen order.
#[derive(Debug, Clone)]
pub struct ResourceManifest {
    resource_dir: String,
    names: NameRegistry,
    entries: Vec<ResourceReference>,
}

impl ResourceManifest {
    pub fn new(resource_dir: &str) -> Self {
        Self {
            resource_dir: resource_dir.to_string(),
            names: NameRegistry::new(),
            entries: Vec::new(),
        }
    }

    /// Record `source` under a unique name and return its target path.
    pub fn claim(&mut self, source: PathBuf, essential: bool) -> String {
        let basename = file_name_of(&source);
        self.claim_as(source, &basename, essential)
    }

    /// Record `source` to be published under `basename` (made unique).
    ///
    /// Used when the copied file is a derivative of the file the author
    /// named, such as an article thumbnail.
    pub fn claim_as(&mut self, source: PathBuf, basename: &str, essential: bool) -> String {
        let name = self.names.claim(basename);
        let target = format!("{}/{}", self.resource_dir, name);
        self.entries.push(ResourceReference {
            source,
            target: target.clone(),
            essential,
        });
        target
    }

    pub fn entries(&self) -> &[ResourceReference] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ResourceReference> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final path component, or `resource` when there is none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "resource".to_string())
}

/// Resolve a `file://` reference against `base_dir`. `None` for other URLs.
pub fn resolve_file_url(url: &str, base_dir: &Path) -> Option<PathBuf> {
    let path = Path::new(url.strip_prefix(FILE_SCHEME)?);
    Some(if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    })
}

/// Rewrite every `file://` image and link, collecting the files to copy.
pub fn extract_resources(
    tree: &mut ParseTree,
    resource_dir: &str,
    base_dir: &Path,
) -> ResourceManifest {
    let mut manifest = ResourceManifest::new(resource_dir);
    tree.root_mut().walk_mut(&mut |node| {
        let key = match node.kind {
            NodeKind::Image => "src",
            NodeKind::Link { .. } => "href",
            _ => return,
        };
        let Some(source) = node.attr(key).and_then(|url| resolve_file_url(url, base_dir)) else {
            return;
        };
        let target = manifest.claim(source, false);
        node.set_attr(key, target);
    });
    tracing::debug!(count = manifest.len(), "Extracted resources");
    manifest
}
