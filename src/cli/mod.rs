//! Command-line interface for maker.
//!
//! Three command families: `pdf` (images to PDF), `resume` (JSON Resume to
//! PDF), and `yt` (download / clip / audio / info / list). Every command
//! exits 0 on success and 1 on any reported failure; `--json` switches the
//! human-readable output to a single JSON document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::config;
use crate::pdf::{self, PaperSize};
use crate::resume::{Resume, ResumeGenerator};

pub mod yt;

pub use yt::YtCommands;

pub const GREEN: &str = "\x1b[92m";
pub const RED: &str = "\x1b[91m";
pub const BLUE: &str = "\x1b[94m";
pub const YELLOW: &str = "\x1b[93m";
pub const RESET: &str = "\x1b[0m";

/// maker - personal CLI for PDFs, resumes, and video clips
#[derive(Parser, Debug)]
#[command(name = "maker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert images to a PDF, one image per page
    Pdf {
        /// Directory path, glob pattern, or comma-separated list of images
        input: String,

        /// Output PDF path
        #[arg(short, long, default_value = "output.pdf")]
        output: PathBuf,

        /// Page size (A0-A10, B0-B10)
        #[arg(short, long, default_value = "A4")]
        size: String,
    },

    /// Convert a JSON Resume file to a PDF
    Resume {
        /// Path to a .json or .yaml resume file
        input: PathBuf,

        /// Output PDF path
        #[arg(short, long, default_value = "resume.pdf")]
        output: PathBuf,

        /// Font family name
        #[arg(long, default_value = "Helvetica")]
        font: String,

        /// Download the font from Google Fonts when not installed
        #[arg(long)]
        download_fonts: bool,

        /// Layout theme (reserved)
        #[arg(long, default_value = "modern")]
        theme: String,
    },

    /// YouTube video operations
    Yt {
        #[command(subcommand)]
        command: YtCommands,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Pdf {
                input,
                output,
                size,
            } => convert_images(&input, &output, &size).await,
            Commands::Resume {
                input,
                output,
                font,
                download_fonts,
                theme: _,
            } => render_resume(&input, &output, &font, download_fonts).await,
            Commands::Yt { command } => command.execute().await,
        }
    }
}

async fn convert_images(input: &str, output: &PathBuf, size: &str) -> Result<()> {
    let paper: PaperSize = size.parse()?;

    let images = pdf::collect_images_async(input.to_string()).await?;
    if images.is_empty() {
        anyhow::bail!("No images to process");
    }

    println!("{}Creating PDF with {} image(s)...{}", BLUE, images.len(), RESET);

    let output_path = output.clone();
    let pages = tokio::task::spawn_blocking(move || pdf::render_pdf(&images, &output_path, paper))
        .await
        .context("PDF render task failed")??;

    println!(
        "{}PDF created successfully: {} ({} page(s)){}",
        GREEN,
        output.display(),
        pages,
        RESET
    );
    Ok(())
}

async fn render_resume(
    input: &PathBuf,
    output: &PathBuf,
    font: &str,
    download_fonts: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let resume = Resume::from_file(input)?;
    let cfg = config()?;

    let generator = ResumeGenerator::new(font, download_fonts, &cfg.fonts_dir);
    generator.generate(&resume, output).await?;

    println!(
        "{}Resume PDF created: {}{}",
        GREEN,
        output.display(),
        RESET
    );
    Ok(())
}
