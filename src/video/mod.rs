//! Video acquisition and cutting, backed by the yt-dlp and ffmpeg binaries.

pub mod cutter;
pub mod downloader;
pub mod ffmpeg;

pub use cutter::Cutter;
pub use downloader::{Downloader, InfoOutcome};
