//! End-to-end compile scenarios through the public API.
//!
//! A recording renderer stands in for pdflatex and ImageMagick: typesetting
//! writes a placeholder PDF, rasterizing writes a small PNG. That is enough
//! to exercise the hash cache, resource copying and the artifact bundle.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pubgen::assemble::{self, CompileError, OutputTarget};
use pubgen::catalog::Catalog;
use pubgen::config::CompilerConfig;
use pubgen::latex::{LatexError, LatexRenderer, RasterJob, RenderError, TypesetJob};
use tempfile::TempDir;

#[derive(Default)]
struct FakeRenderer {
    typesets: RefCell<Vec<String>>,
    rasters: RefCell<Vec<PathBuf>>,
    scratch_dirs: RefCell<Vec<PathBuf>>,
    fail: bool,
}

impl FakeRenderer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> (usize, usize) {
        (self.typesets.borrow().len(), self.rasters.borrow().len())
    }
}

impl LatexRenderer for FakeRenderer {
    fn typeset(&self, job: &TypesetJob) -> Result<(), RenderError> {
        self.scratch_dirs.borrow_mut().push(job.output_dir.clone());
        if self.fail {
            return Err(RenderError::Spawn {
                program: "fake-latex".into(),
                source: io::Error::other("! Undefined control sequence."),
            });
        }
        self.typesets
            .borrow_mut()
            .push(fs::read_to_string(&job.tex_file)?);
        fs::write(job.output_dir.join("file.pdf"), b"%PDF-1.5\n")?;
        Ok(())
    }

    fn rasterize(&self, job: &RasterJob) -> Result<(), RenderError> {
        self.rasters.borrow_mut().push(job.png.clone());
        image::RgbImage::new(6, 3)
            .save_with_format(&job.png, image::ImageFormat::Png)
            .map_err(io::Error::other)?;
        Ok(())
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn out_arg(dir: &Path) -> String {
    format!("{}/", dir.display())
}

const DOC: &str = "\
title: Particle in a box
tags: physics, quantum

# Energy

The energy levels are quantised.

\\begin{latex}[<preamble>]
\\usepackage{bm}
\\end{latex}

\\begin{latex}[Energy levels]
$E_n = n^2$
\\end{latex}
";

// =========================================================================
// LaTeX cache
// =========================================================================

#[test]
fn unchanged_source_renders_once() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write(src.path(), "box.md", DOC);
    let config = CompilerConfig::default();

    let first = FakeRenderer::default();
    assemble::compile_file_with(&input, Some(&out_arg(out.path())), &config, &first).unwrap();
    assert_eq!(first.calls(), (2, 1));
    assert!(first.typesets.borrow()[0].contains("\\usepackage{bm}"));
    let png = src.path().join("energy_levels.png");
    let bytes = fs::read(&png).unwrap();

    let second = FakeRenderer::default();
    let report =
        assemble::compile_file_with(&input, Some(&out_arg(out.path())), &config, &second)
            .unwrap();
    assert_eq!(second.calls(), (0, 0));
    assert_eq!(report.artifact.latex_stats.hits, 1);
    assert_eq!(fs::read(&png).unwrap(), bytes);
}

#[test]
fn changed_preamble_rebuilds_once() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write(src.path(), "box.md", DOC);
    let config = CompilerConfig::default();

    let first = FakeRenderer::default();
    assemble::compile_file_with(&input, Some(&out_arg(out.path())), &config, &first).unwrap();

    write(
        src.path(),
        "box.md",
        &DOC.replace("\\usepackage{bm}", "\\usepackage{physics}"),
    );
    let second = FakeRenderer::default();
    assemble::compile_file_with(&input, Some(&out_arg(out.path())), &config, &second).unwrap();
    assert_eq!(second.calls(), (2, 1));
}

#[test]
fn pdf_flag_links_image_to_pdf() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write(
        src.path(),
        "box.md",
        "\\begin{latex}[Levels --pdf]\n$E$\n\\end{latex}\n",
    );
    let renderer = FakeRenderer::default();

    let report = assemble::compile_file_with(
        &input,
        Some(&out_arg(out.path())),
        &CompilerConfig::default(),
        &renderer,
    )
    .unwrap();
    assert!(
        report
            .artifact
            .html
            .contains("<a href=\"box/levels.pdf\"><img src=\"box/levels.png\" alt=\"Levels\" /></a>")
    );
    assert!(out.path().join("box/levels.pdf").exists());
    assert!(out.path().join("box/levels.png").exists());
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn failed_render_removes_scratch_dir() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write(
        src.path(),
        "box.md",
        "\\begin{latex}[Broken]\n\\nosuchmacro\n\\end{latex}\n",
    );
    let renderer = FakeRenderer::failing();

    let result = assemble::compile_file_with(
        &input,
        Some(&out_arg(out.path())),
        &CompilerConfig::default(),
        &renderer,
    );
    assert!(matches!(
        result,
        Err(CompileError::Latex(LatexError::Render { .. }))
    ));
    let scratch = renderer.scratch_dirs.borrow();
    assert_eq!(scratch.len(), 1);
    assert!(!scratch[0].exists());
    assert!(!out.path().join("box.html").exists());
}

#[test]
fn missing_resource_fails_after_writing() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(src.path().join("here.csv"), "n\n").unwrap();
    let input = write(
        src.path(),
        "box.md",
        "[here](file://here.csv) and [gone](file://gone.csv)\n",
    );
    let renderer = FakeRenderer::default();

    let result = assemble::compile_file_with(
        &input,
        Some(&out_arg(out.path())),
        &CompilerConfig::default(),
        &renderer,
    );
    match result {
        Err(CompileError::CopyFailed(report)) => {
            assert_eq!(report.write.copied, 1);
            assert_eq!(report.write.warnings.len(), 1);
        }
        other => panic!("expected copy failure, got {other:?}"),
    }
    assert!(out.path().join("box.html").exists());
    assert!(out.path().join("box/here.csv").exists());
}

#[test]
fn malformed_block_carries_raw_text() {
    let src = TempDir::new().unwrap();
    let input = write(
        src.path(),
        "box.md",
        "Intro.\n\n\\begin{latex}[Open]\n$x$\n",
    );
    let renderer = FakeRenderer::default();

    let result = assemble::compile_file_with(
        &input,
        Some(&out_arg(src.path())),
        &CompilerConfig::default(),
        &renderer,
    );
    match result {
        Err(CompileError::Latex(LatexError::Malformed { raw })) => {
            assert!(raw.starts_with("\\begin{latex}[Open]"));
        }
        other => panic!("expected malformed block, got {other:?}"),
    }
    assert_eq!(renderer.calls(), (0, 0));
}

// =========================================================================
// Artifact bundle and catalog
// =========================================================================

#[test]
fn bundle_and_catalog() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    image::RgbImage::new(200, 100)
        .save_with_format(src.path().join("cover.png"), image::ImageFormat::Png)
        .unwrap();
    write(src.path(), "data/results.csv", "n,E\n1,1\n");
    let input = write(
        src.path(),
        "box.md",
        "title: Box\nimg: file://cover.png\ninclude: data\n\n# Energy\n\nSee [results](file://data/results.csv).\n",
    );
    let renderer = FakeRenderer::default();

    let report = assemble::compile_file_with(
        &input,
        Some(&format!("{}/particle", out.path().display())),
        &CompilerConfig::default(),
        &renderer,
    )
    .unwrap();
    assert!(report.write.warnings.is_empty());

    let target = OutputTarget {
        dir: out.path().to_path_buf(),
        name: "particle".into(),
    };
    assert_eq!(report.target, target);
    assert!(target.html_path().exists());
    assert!(out.path().join("particle/results.csv").exists());
    assert!(!out.path().join("particle/cover.thumb.png").exists());
    assert!(out.path().join("particle/data/results.csv").exists());

    let thumb = image::open(out.path().join("particle/cover.png")).unwrap();
    // Fits within 64x64, keeping the aspect ratio.
    assert_eq!((thumb.width(), thumb.height()), (64, 32));

    let toc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(target.toc_path()).unwrap()).unwrap();
    assert_eq!(toc, serde_json::json!([[1, "Energy", "energy"]]));

    let catalog_path = out.path().join("catalog.json");
    let meta = Catalog::read_meta(&target.meta_path()).unwrap();
    assert_eq!(meta.img.as_deref(), Some("particle/cover.png"));
    assert_eq!(meta.abstract_text, "See results.");

    let mut catalog = Catalog::load(&catalog_path).unwrap();
    catalog.merge(meta.clone());
    catalog.merge(meta);
    catalog.save(&catalog_path).unwrap();
    let catalog = Catalog::load(&catalog_path).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.entries()[0].url, "particle");

    let mut catalog = catalog;
    assert!(catalog.remove("particle"));
    assert!(!catalog.remove("particle"));
    assert!(catalog.is_empty());
}
