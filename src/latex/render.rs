//! The renderer seam: typesetting and rasterizing LaTeX documents.
//!
//! [`LatexRenderer`] is the only place external programs are invoked. The
//! compiler decides *whether* to render (hash policy, file layout); the
//! renderer only knows *how*.
//!
//! The production implementation is [`ExternalRenderer`], which shells out to
//! the configured typesetter (`pdflatex`) and rasterizer (ImageMagick
//! `convert`). Each invocation has a timeout; a child that overruns it is
//! killed and reported as [`RenderError::TimedOut`].
//!
//! Tool output is captured into a log file inside the scratch directory. On
//! failure the tail of that log is attached to the error so the author sees
//! the LaTeX diagnostic without hunting for files that no longer exist.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::LatexConfig;

/// Lines of tool output kept in a failure report.
const LOG_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}\n{log}")]
    Failed {
        program: String,
        status: ExitStatus,
        log: String,
    },
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One typesetter pass: `tex_file` → `<output_dir>/<stem>.pdf`.
#[derive(Debug, Clone)]
pub struct TypesetJob {
    pub tex_file: PathBuf,
    /// Where the PDF and auxiliary files go (the scratch directory).
    pub output_dir: PathBuf,
    /// Working directory, so `\input` and `\includegraphics` resolve relative
    /// to the document.
    pub working_dir: PathBuf,
}

/// PDF → PNG conversion.
#[derive(Debug, Clone)]
pub struct RasterJob {
    pub pdf: PathBuf,
    pub png: PathBuf,
    /// Directory for the tool log.
    pub log_dir: PathBuf,
}

/// Executes the external steps of a LaTeX render.
pub trait LatexRenderer {
    /// Run one typesetter pass.
    fn typeset(&self, job: &TypesetJob) -> Result<(), RenderError>;

    /// Rasterize a typeset PDF into a PNG.
    fn rasterize(&self, job: &RasterJob) -> Result<(), RenderError>;
}

/// Process-backed renderer driven by `[latex]` config.
#[derive(Debug, Clone)]
pub struct ExternalRenderer {
    typesetter: String,
    typeset_args: Vec<String>,
    rasterizer: String,
    density: u32,
    resize: String,
    timeout: Duration,
}

impl ExternalRenderer {
    pub fn from_config(config: &LatexConfig) -> Self {
        Self {
            typesetter: config.typesetter.clone(),
            typeset_args: config.typeset_args.clone(),
            rasterizer: config.rasterizer.clone(),
            density: config.density,
            resize: config.resize.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl LatexRenderer for ExternalRenderer {
    fn typeset(&self, job: &TypesetJob) -> Result<(), RenderError> {
        let mut cmd = Command::new(&self.typesetter);
        cmd.args(&self.typeset_args)
            .arg("-output-directory")
            .arg(&job.output_dir)
            .arg(&job.tex_file)
            .current_dir(&job.working_dir);
        run_with_timeout(
            cmd,
            &self.typesetter,
            &job.output_dir.join("typeset.log"),
            self.timeout,
        )
    }

    fn rasterize(&self, job: &RasterJob) -> Result<(), RenderError> {
        let mut cmd = Command::new(&self.rasterizer);
        cmd.arg("-density")
            .arg(self.density.to_string())
            .arg(&job.pdf)
            .arg("-resize")
            .arg(&self.resize)
            .arg(&job.png);
        run_with_timeout(
            cmd,
            &self.rasterizer,
            &job.log_dir.join("rasterize.log"),
            self.timeout,
        )
    }
}

/// Spawn `cmd` with output redirected to `log_path` and wait at most `timeout`.
fn run_with_timeout(
    mut cmd: Command,
    program: &str,
    log_path: &Path,
    timeout: Duration,
) -> Result<(), RenderError> {
    let log = File::create(log_path)?;
    cmd.stdin(Stdio::null())
        .stdout(log.try_clone()?)
        .stderr(log);

    tracing::debug!(program, ?cmd, "Spawning");
    let mut child = cmd.spawn().map_err(|source| RenderError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) if status.success() => return Ok(()),
            Some(status) => {
                return Err(RenderError::Failed {
                    program: program.to_string(),
                    status,
                    log: log_tail(log_path),
                });
            }
            None => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::TimedOut {
                        program: program.to_string(),
                        timeout,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Last [`LOG_TAIL_LINES`] lines of a tool log; empty if unreadable.
fn log_tail(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
