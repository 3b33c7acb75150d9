//! `yt` subcommands: download, clip, audio, info, list.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::cli::{BLUE, GREEN, RESET};
use crate::config::config;
use crate::domain::{ArtifactSpec, AudioFormat, VideoFormat};
use crate::time::{format_time, parse_range};
use crate::video::downloader::{self, InfoOutcome};
use crate::video::{cutter, ffmpeg, Cutter, Downloader};

/// Video clip formats accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ClipFormatArg {
    Mp4,
    Mkv,
    Webm,
    Gif,
}

impl From<ClipFormatArg> for VideoFormat {
    fn from(arg: ClipFormatArg) -> Self {
        match arg {
            ClipFormatArg::Mp4 => VideoFormat::Mp4,
            ClipFormatArg::Mkv => VideoFormat::Mkv,
            ClipFormatArg::Webm => VideoFormat::Webm,
            ClipFormatArg::Gif => VideoFormat::Gif,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AudioFormatArg {
    M4a,
    Wav,
    Mp3,
}

impl From<AudioFormatArg> for AudioFormat {
    fn from(arg: AudioFormatArg) -> Self {
        match arg {
            AudioFormatArg::M4a => AudioFormat::M4a,
            AudioFormatArg::Wav => AudioFormat::Wav,
            AudioFormatArg::Mp3 => AudioFormat::Mp3,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum YtCommands {
    /// Download a YouTube video
    Download {
        /// YouTube URL
        url: String,

        /// Alias for the video (defaults to video ID)
        #[arg(long)]
        id: Option<String>,

        /// Output directory
        #[arg(long, default_value = downloader::DEFAULT_DOWNLOADS_DIR)]
        out: PathBuf,

        /// yt-dlp format selector
        #[arg(long, default_value = downloader::DEFAULT_FORMAT)]
        format: String,

        /// Download playlists instead of single videos
        #[arg(long)]
        playlist: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create a video clip
    Clip {
        /// Source alias or path
        #[arg(long)]
        src: String,

        /// Start time (HH:MM:SS.mmm, MM:SS, or seconds)
        #[arg(long)]
        start: String,

        /// End time (HH:MM:SS.mmm, MM:SS, or seconds)
        #[arg(long)]
        end: String,

        /// Output directory
        #[arg(long, default_value = cutter::DEFAULT_OUTPUT_DIR)]
        out: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "mp4")]
        fmt: ClipFormatArg,

        /// Downloads directory for alias resolution
        #[arg(long, default_value = downloader::DEFAULT_DOWNLOADS_DIR)]
        downloads_dir: PathBuf,

        /// Path to FFmpeg binary
        #[arg(long, env = "MAKER_FFMPEG")]
        ffmpeg_bin: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        overwrite: bool,

        /// Allow video-only output
        #[arg(long)]
        allow_no_audio: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create an audio clip
    Audio {
        /// Source alias or path
        #[arg(long)]
        src: String,

        /// Start time (HH:MM:SS.mmm, MM:SS, or seconds)
        #[arg(long)]
        start: String,

        /// End time (HH:MM:SS.mmm, MM:SS, or seconds)
        #[arg(long)]
        end: String,

        /// Output directory
        #[arg(long, default_value = cutter::DEFAULT_AUDIO_DIR)]
        out: PathBuf,

        /// Clips output directory
        #[arg(long, default_value = cutter::DEFAULT_OUTPUT_DIR)]
        clips_out: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "m4a")]
        fmt: AudioFormatArg,

        /// Downloads directory for alias resolution
        #[arg(long, default_value = downloader::DEFAULT_DOWNLOADS_DIR)]
        downloads_dir: PathBuf,

        /// Path to FFmpeg binary
        #[arg(long, env = "MAKER_FFMPEG")]
        ffmpeg_bin: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        overwrite: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Get video information
    Info {
        /// URL, alias, or local path
        #[arg(long)]
        src: String,

        /// Downloads directory for alias resolution
        #[arg(long, default_value = downloader::DEFAULT_DOWNLOADS_DIR)]
        downloads_dir: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List downloaded videos
    List {
        /// Downloads directory
        #[arg(long, default_value = downloader::DEFAULT_DOWNLOADS_DIR)]
        downloads_dir: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl YtCommands {
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Download {
                url,
                id,
                out,
                format,
                playlist,
                json,
            } => download(&url, id.as_deref(), out, &format, playlist, json).await,
            Self::Clip {
                src,
                start,
                end,
                out,
                fmt,
                downloads_dir,
                ffmpeg_bin,
                overwrite,
                allow_no_audio,
                json,
            } => {
                clip(
                    &src,
                    &start,
                    &end,
                    out,
                    fmt.into(),
                    downloads_dir,
                    ffmpeg_bin,
                    overwrite,
                    allow_no_audio,
                    json,
                )
                .await
            }
            Self::Audio {
                src,
                start,
                end,
                out,
                clips_out,
                fmt,
                downloads_dir,
                ffmpeg_bin,
                overwrite,
                json,
            } => {
                audio(
                    &src,
                    &start,
                    &end,
                    out,
                    clips_out,
                    fmt.into(),
                    downloads_dir,
                    ffmpeg_bin,
                    overwrite,
                    json,
                )
                .await
            }
            Self::Info {
                src,
                downloads_dir,
                json,
            } => info(&src, downloads_dir, json).await,
            Self::List {
                downloads_dir,
                json,
            } => list(downloads_dir, json).await,
        }
    }
}

fn artifact_json(spec: &ArtifactSpec) -> serde_json::Value {
    json!({
        "artifact": spec.artifact_path,
        "start": spec.start,
        "end": spec.end,
        "format": spec.format,
        "derived_from": spec.derived_from,
        "created_at": spec.created_at,
    })
}

async fn download(
    url: &str,
    id: Option<&str>,
    out: PathBuf,
    format: &str,
    playlist: bool,
    json: bool,
) -> Result<()> {
    let downloader = Downloader::new(out);
    let spec = downloader.download(url, id, format, playlist).await?;

    if json {
        let doc = json!({
            "alias": spec.alias,
            "video_id": spec.video_id,
            "title": spec.title,
            "duration": spec.duration,
            "files": spec.downloaded_files,
            "created_at": spec.created_at,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!(
            "{}Downloaded: {} ({}){}",
            GREEN,
            spec.title,
            spec.alias,
            RESET
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn clip(
    src: &str,
    start: &str,
    end: &str,
    out: PathBuf,
    fmt: VideoFormat,
    downloads_dir: PathBuf,
    ffmpeg_bin: Option<PathBuf>,
    overwrite: bool,
    allow_no_audio: bool,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_range(start, end)?;

    let downloader = Downloader::new(downloads_dir);
    let source = downloader.resolve_source(src).await?;

    let cfg = config()?;
    let cutter = Cutter::new(out, cutter::DEFAULT_AUDIO_DIR, ffmpeg_bin.as_deref(), cfg)?;
    let spec = cutter
        .clip(&source, start, end, fmt, overwrite, allow_no_audio)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifact_json(&spec))?);
    } else {
        println!(
            "{}Clip created: {}{}",
            GREEN,
            spec.artifact_path.display(),
            RESET
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn audio(
    src: &str,
    start: &str,
    end: &str,
    out: PathBuf,
    clips_out: PathBuf,
    fmt: AudioFormat,
    downloads_dir: PathBuf,
    ffmpeg_bin: Option<PathBuf>,
    overwrite: bool,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_range(start, end)?;

    let downloader = Downloader::new(downloads_dir);
    let source = downloader.resolve_source(src).await?;

    let cfg = config()?;
    let cutter = Cutter::new(clips_out, out, ffmpeg_bin.as_deref(), cfg)?;
    let spec = cutter.audio(&source, start, end, fmt, overwrite).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifact_json(&spec))?);
    } else {
        println!(
            "{}Audio created: {}{}",
            GREEN,
            spec.artifact_path.display(),
            RESET
        );
    }
    Ok(())
}

async fn info(src: &str, downloads_dir: PathBuf, json: bool) -> Result<()> {
    let downloader = Downloader::new(downloads_dir);
    let is_url = src.starts_with("http://") || src.starts_with("https://");

    let outcome = if is_url {
        downloader.get_info(src).await
    } else {
        let source = downloader.resolve_source(src).await?;
        let cfg = config()?;
        let ffmpeg_bin = ffmpeg::resolve_ffmpeg(None, cfg)?;
        let ffprobe = ffmpeg::resolve_ffprobe(&ffmpeg_bin)?;
        InfoOutcome::Local(downloader.local_info(&ffprobe, &source).await?)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        InfoOutcome::Remote(i) => {
            println!("{}Title: {}{}", BLUE, i.title, RESET);
            println!("{}Duration: {}{}", BLUE, format_time(i.duration), RESET);
            println!("{}Uploader: {}{}", BLUE, i.uploader, RESET);
            println!("{}Views: {}{}", BLUE, i.view_count, RESET);
            println!("{}URL: {}{}", BLUE, i.webpage_url, RESET);
            Ok(())
        }
        InfoOutcome::Local(i) => {
            println!("{}File: {}{}", BLUE, i.title, RESET);
            println!("{}Duration: {}{}", BLUE, format_time(i.duration), RESET);
            println!("{}Resolution: {}x{}{}", BLUE, i.width, i.height, RESET);
            if i.fps > 0.0 {
                println!("{}FPS: {:.2}{}", BLUE, i.fps, RESET);
            }
            println!(
                "{}Has Audio: {}{}",
                BLUE,
                if i.has_audio { "Yes" } else { "No" },
                RESET
            );
            println!("{}Format: {}{}", BLUE, i.format, RESET);
            Ok(())
        }
        // main renders returned errors; nothing prints here
        InfoOutcome::Error { error } => Err(info_failure(&error)),
    }
}

fn info_failure(error: &str) -> anyhow::Error {
    anyhow::anyhow!("Failed to get info: {}", error)
}


async fn list(downloads_dir: PathBuf, json: bool) -> Result<()> {
    let downloader = Downloader::new(downloads_dir);
    let downloads = downloader.list_downloads().await?;

    if json {
        let mut doc = serde_json::Map::new();
        for (alias, spec) in &downloads {
            doc.insert(
                alias.clone(),
                json!({
                    "title": spec.title,
                    "duration": spec.duration,
                    "created_at": spec.created_at,
                    "files": spec.downloaded_files,
                }),
            );
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else if downloads.is_empty() {
        println!("No downloads found.");
    } else {
        println!("{}Downloaded videos:{}", BLUE, RESET);
        for (alias, spec) in &downloads {
            println!("  {}: {} ({})", alias, spec.title, format_time(spec.duration));
        }
    }

    Ok(())
}
