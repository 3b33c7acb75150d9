//! maker - personal CLI for PDFs, resumes, and video clips
//!
//! Three unrelated tasks behind one binary:
//! - `pdf`: assemble a folder, glob, or list of images into a PDF, one image
//!   per page, fitted to a chosen paper size
//! - `resume`: render a JSON Resume document to a styled PDF, with system
//!   font discovery and optional Google Fonts download
//! - `yt`: download YouTube videos via yt-dlp and cut frame-accurate clips
//!   or audio extracts via ffmpeg, tracking provenance in JSON manifests
//!
//! # Manifest layout
//!
//! - `<downloads_dir>/<alias>/manifest.json` — one download record,
//!   overwritten wholesale per download
//! - `<output_dir>/artifacts.jsonl` — append-only log of derived clips and
//!   audio extracts, each carrying a SHA-256 of its source
//!
//! # Usage
//!
//! ```bash
//! maker pdf ./scans -o scans.pdf -s A4
//! maker resume resume.json --font "Open Sans" --download-fonts
//! maker yt download <url> --id talk
//! maker yt clip --src talk --start 1:00 --end 1:23.5 --fmt mp4
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod pdf;
pub mod resume;
pub mod time;
pub mod video;

pub use error::{MakerError, MakerResult};
