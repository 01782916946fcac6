//! Artifact assembly: the compile pipeline and its filesystem output.
//!
//! ```text
//! compile_markdown   source ─ parse (LaTeX inline) ─ abstract ─ resources ─ toc ─ html
//!                                                                           │
//!                    metadata record + article image/thumbnail ─────────────┤
//!                                                                           ▼
//!                                                                  PublicationArtifact
//! write_artifacts    <dir>/<name>.html  <name>.toc  <name>.meta  <name>/…
//! ```
//!
//! [`compile_markdown`] never touches the output directory; it only reads
//! sources, renders LaTeX images next to the document and writes the article
//! thumbnail next to its image. Everything under the output directory is
//! written by [`write_artifacts`].
//!
//! ## Failure policy
//!
//! Malformed LaTeX, a failed render, a failed thumbnail or a failed copy of
//! the article image abort the compile. Other resources and includes are
//! copied best-effort: [`write_artifacts`] logs each failure as a warning and
//! carries on, then [`compile_file_with`] turns a non-empty warning list into
//! [`CompileError::CopyFailed`] so the command still exits non-zero.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{self, CompilerConfig, ConfigError};
use crate::html;
use crate::imaging::{self, ImagingError};
use crate::latex::{CacheStats, ExternalRenderer, LatexCompiler, LatexError, LatexRenderer};
use crate::metadata::{self, Metadata};
use crate::parse;
use crate::passes::resources::{file_name_of, resolve_file_url};
use crate::passes::{self, ResourceManifest};
use crate::types::{PublicationMeta, ResourceReference, TocEntry};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to copy essential resource {} to {target}: {source}", .path.display())]
    EssentialCopy {
        path: PathBuf,
        target: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Latex(#[from] LatexError),
    #[error("thumbnail failed: {0}")]
    Thumbnail(#[from] ImagingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    /// Artifacts were written but some resources or includes were not copied.
    #[error("{} file(s) could not be copied", .0.write.warnings.len())]
    CopyFailed(Box<CompileReport>),
}

/// Per-document compile inputs.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Output name: file stem of the artifacts and the resource directory.
    pub name: String,
    /// Directory `file://` references, includes and LaTeX images resolve against.
    pub base_dir: PathBuf,
}

/// Everything a compile produced. Immutable once returned.
#[derive(Debug, Clone)]
pub struct PublicationArtifact {
    pub name: String,
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub meta: PublicationMeta,
    pub resources: Vec<ResourceReference>,
    /// Files and directories copied wholesale into the resource directory.
    pub includes: Vec<PathBuf>,
    pub latex_stats: CacheStats,
}

/// Compile a document held in memory.
pub fn compile_markdown(
    source: &str,
    options: &CompileOptions,
    config: &CompilerConfig,
    renderer: &dyn LatexRenderer,
) -> Result<PublicationArtifact, CompileError> {
    let mut latex = LatexCompiler::new(renderer, &options.base_dir, &config.latex.image_dir);
    let (mut tree, header) = parse::parse_document(source, &mut latex)?;

    tracing::debug!(transform = "abstract", "Running transform");
    let abstract_text = passes::extract_abstract(&tree);
    tracing::debug!(transform = "resources", "Running transform");
    let mut resources = passes::extract_resources(&mut tree, &options.name, &options.base_dir);
    tracing::debug!(transform = "toc", "Running transform");
    let toc = passes::extract_toc(&mut tree);

    let html = html::render(&tree);

    let img = match metadata::resolve(&[header.first("img")]) {
        Some(img) => Some(article_image(&img, options, config, &mut resources)?),
        None => None,
    };
    let meta = build_meta(&header, &toc, &options.name, abstract_text, img);
    let includes = header
        .values("include")
        .iter()
        .map(|v| resolve_path(v, &options.base_dir))
        .collect();

    Ok(PublicationArtifact {
        name: options.name.clone(),
        html,
        toc,
        meta,
        resources: resources.into_entries(),
        includes,
        latex_stats: latex.stats(),
    })
}

/// Assemble the `.meta` record from header fields and extracted values.
fn build_meta(
    header: &Metadata,
    toc: &[TocEntry],
    name: &str,
    abstract_text: String,
    img: Option<String>,
) -> PublicationMeta {
    let title = metadata::resolve(&[
        header.first("title"),
        toc.first().map(|e| e.label.as_str()),
        Some(name),
    ])
    .unwrap_or_else(|| name.to_string());
    let img_alt = metadata::resolve(&[header.first("img_alt"), Some(&title)])
        .unwrap_or_else(|| title.clone());

    PublicationMeta {
        url: name.to_string(),
        subtitle: metadata::resolve(&[header.first("subtitle")]),
        img,
        img_alt,
        abstract_text,
        tags: header.list("tags"),
        show: header.flag("show", true),
        title,
    }
}

/// Register the article image as an essential resource.
///
/// With thumbnails enabled the thumbnail is copied, but under the image's own
/// file name. Non-`file://` images are published as written.
fn article_image(
    img: &str,
    options: &CompileOptions,
    config: &CompilerConfig,
    resources: &mut ResourceManifest,
) -> Result<String, CompileError> {
    let Some(source) = resolve_file_url(img, &options.base_dir) else {
        return Ok(img.to_string());
    };
    if !config.thumbnails.enabled {
        return Ok(resources.claim(source, true));
    }
    let name = file_name_of(&source);
    let thumb = imaging::thumbnail_path(&source);
    imaging::create_thumbnail(&source, &thumb, config.thumbnails.size)?;
    Ok(resources.claim_as(thumb, &name, true))
}

fn resolve_path(value: &str, base_dir: &Path) -> PathBuf {
    resolve_file_url(value, base_dir).unwrap_or_else(|| base_dir.join(value))
}

/// Where artifacts are written: `<dir>/<name>.html` etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub dir: PathBuf,
    pub name: String,
}

impl OutputTarget {
    /// Resolve the CLI output argument.
    ///
    /// ```text
    /// (doc.md, None)            → (".", "doc")
    /// (doc.md, "out/")          → ("out/", "doc")
    /// (doc.md, "out/article")   → ("out", "article")
    /// (doc.md, "article")       → (".", "article")
    /// ```
    pub fn resolve(input: &Path, output_arg: Option<&str>) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        match output_arg {
            None => Self {
                dir: PathBuf::from("."),
                name: stem,
            },
            Some(arg) if arg.ends_with('/') || arg.ends_with(std::path::MAIN_SEPARATOR) => Self {
                dir: PathBuf::from(arg),
                name: stem,
            },
            Some(arg) => {
                let path = Path::new(arg);
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(stem);
                Self { dir, name }
            }
        }
    }

    pub fn html_path(&self) -> PathBuf {
        self.dir.join(format!("{}.html", self.name))
    }

    pub fn toc_path(&self) -> PathBuf {
        self.dir.join(format!("{}.toc", self.name))
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(format!("{}.meta", self.name))
    }

    pub fn resource_dir(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Outcome of [`write_artifacts`].
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    /// Artifact files written (html, toc, meta).
    pub written: Vec<PathBuf>,
    /// Resource and include files copied.
    pub copied: usize,
    /// Non-fatal copy failures.
    pub warnings: Vec<String>,
}

impl WriteReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Write the artifact bundle under `target`.
pub fn write_artifacts(
    artifact: &PublicationArtifact,
    target: &OutputTarget,
) -> Result<WriteReport, AssembleError> {
    let mut report = WriteReport::default();
    fs::create_dir_all(&target.dir)?;

    let html_path = target.html_path();
    fs::write(&html_path, &artifact.html)?;
    report.written.push(html_path);

    let toc_path = target.toc_path();
    fs::write(&toc_path, serde_json::to_string_pretty(&artifact.toc)?)?;
    report.written.push(toc_path);

    let meta_path = target.meta_path();
    fs::write(&meta_path, serde_json::to_string_pretty(&artifact.meta)?)?;
    report.written.push(meta_path);

    let resource_dir = target.resource_dir();
    fs::create_dir_all(&resource_dir)?;

    for resource in &artifact.resources {
        let dest = target.dir.join(&resource.target);
        match copy_file(&resource.source, &dest) {
            Ok(()) => report.copied += 1,
            Err(source) if resource.essential => {
                return Err(AssembleError::EssentialCopy {
                    path: resource.source.clone(),
                    target: resource.target.clone(),
                    source,
                });
            }
            Err(e) => report.warn(format!(
                "could not copy {} to {}: {}",
                resource.source.display(),
                resource.target,
                e
            )),
        }
    }

    for include in &artifact.includes {
        copy_include(include, &resource_dir, &mut report);
    }

    tracing::info!(
        name = %target.name,
        dir = %target.dir.display(),
        copied = report.copied,
        "Wrote publication"
    );
    Ok(report)
}

fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest).map(|_| ())
}

/// Copy an include into `resource_dir`: files by basename, directories
/// recursively under their own name.
fn copy_include(include: &Path, resource_dir: &Path, report: &mut WriteReport) {
    let Some(name) = include.file_name() else {
        report.warn(format!("include {} has no file name", include.display()));
        return;
    };
    if include.is_file() {
        match copy_file(include, &resource_dir.join(name)) {
            Ok(()) => report.copied += 1,
            Err(e) => report.warn(format!("could not copy include {}: {}", include.display(), e)),
        }
        return;
    }
    if !include.is_dir() {
        report.warn(format!("include {} does not exist", include.display()));
        return;
    }

    let dest_root = resource_dir.join(name);
    for entry in WalkDir::new(include) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.warn(format!("could not read include {}: {}", include.display(), e));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(include) else {
            continue;
        };
        match copy_file(entry.path(), &dest_root.join(relative)) {
            Ok(()) => report.copied += 1,
            Err(e) => report.warn(format!(
                "could not copy include {}: {}",
                entry.path().display(),
                e
            )),
        }
    }
}

/// CLI-level switches for [`compile_file`].
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// Explicit config file instead of `pubgen.toml` next to the input.
    pub config_path: Option<PathBuf>,
    /// Skip the article thumbnail and publish the full image.
    pub no_thumbnail: bool,
}

/// Result of compiling and writing one document.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub artifact: PublicationArtifact,
    pub target: OutputTarget,
    pub write: WriteReport,
}

fn input_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Config for `input`: explicit file or `pubgen.toml` beside it, then CLI switches.
pub fn effective_config(input: &Path, options: &FileOptions) -> Result<CompilerConfig, ConfigError> {
    let mut config = match &options.config_path {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&input_dir(input))?,
    };
    if options.no_thumbnail {
        config.thumbnails.enabled = false;
    }
    Ok(config)
}

/// Read, compile and write `input` with the external LaTeX toolchain.
pub fn compile_file(
    input: &Path,
    output_arg: Option<&str>,
    options: &FileOptions,
) -> Result<CompileReport, CompileError> {
    let config = effective_config(input, options)?;
    let renderer = ExternalRenderer::from_config(&config.latex);
    compile_file_with(input, output_arg, &config, &renderer)
}

/// [`compile_file`] with an explicit config and renderer.
pub fn compile_file_with(
    input: &Path,
    output_arg: Option<&str>,
    config: &CompilerConfig,
    renderer: &dyn LatexRenderer,
) -> Result<CompileReport, CompileError> {
    let source = fs::read_to_string(input).map_err(|source| CompileError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let target = OutputTarget::resolve(input, output_arg);
    let options = CompileOptions {
        name: target.name.clone(),
        base_dir: input_dir(input),
    };

    tracing::info!(input = %input.display(), name = %target.name, "Compiling");
    let artifact = compile_markdown(&source, &options, config, renderer)?;
    let write = write_artifacts(&artifact, &target)?;
    let report = CompileReport {
        artifact,
        target,
        write,
    };
    if !report.write.warnings.is_empty() {
        return Err(CompileError::CopyFailed(Box::new(report)));
    }
    Ok(report)
}
