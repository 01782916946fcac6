use clap::{Parser, Subcommand};
use pubgen::assemble::{self, CompileError, FileOptions};
use pubgen::catalog::Catalog;
use pubgen::output::{self, CatalogChange};
use pubgen::config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pubgen")]
#[command(about = "Compile markdown publications with embedded LaTeX")]
#[command(long_about = "\
Compile markdown publications with embedded LaTeX

A document is markdown with an optional metadata header:

  title: Particle in a box
  subtitle: Quantised energy levels
  img: file://figs/box.png
  tags: physics, quantum
  include: data/

  # Introduction
  ...

  \\begin{latex}[Energy levels]
  $E_n = \\frac{n^2 h^2}{8 m L^2}$
  \\end{latex}

Compiling box.md writes box.html, box.toc, box.meta and a box/ directory
holding every file:// image and link, rendered LaTeX, the article thumbnail
and includes.

LaTeX images are cached: the source hash is stored inside the PNG, so an
unchanged block is never re-rendered.

Run 'pubgen gen-config' to generate a documented pubgen.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a markdown document into HTML, toc, meta and resources
    Compile {
        /// Markdown document
        input: PathBuf,
        /// Output name or directory (trailing '/' keeps the input name)
        output: Option<String>,
        /// Publish the full article image instead of a thumbnail
        #[arg(long)]
        no_thumbnail: bool,
        /// Config file (default: pubgen.toml next to the input)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Merge a .meta record into a catalog, replacing its url
    MergeMeta {
        catalog: PathBuf,
        meta: PathBuf,
    },
    /// Remove every catalog entry with a url
    RmMeta {
        catalog: PathBuf,
        url: String,
    },
    /// Print a stock pubgen.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pubgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Compile {
            input,
            output: output_arg,
            no_thumbnail,
            config,
        } => {
            let options = FileOptions {
                config_path: config,
                no_thumbnail,
            };
            match assemble::compile_file(&input, output_arg.as_deref(), &options) {
                Ok(report) => output::print_compile_output(&report),
                Err(CompileError::CopyFailed(report)) => {
                    output::print_compile_output(&report);
                    eprintln!("Error: {}", CompileError::CopyFailed(report));
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::MergeMeta { catalog, meta } => {
            let record = Catalog::read_meta(&meta)?;
            let url = record.url.clone();
            let mut entries = Catalog::load(&catalog)?;
            entries.merge(record);
            entries.save(&catalog)?;
            output::print_catalog_output(CatalogChange::Merged, &url, &catalog, entries.len());
        }
        Command::RmMeta { catalog, url } => {
            let mut entries = Catalog::load(&catalog)?;
            let change = if entries.remove(&url) {
                entries.save(&catalog)?;
                CatalogChange::Removed
            } else {
                CatalogChange::NotFound
            };
            output::print_catalog_output(change, &url, &catalog, entries.len());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
