//! Error types shared across maker operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for maker operations.
pub type MakerResult<T> = Result<T, MakerError>;

/// Errors that can occur while making things.
///
/// Every failure kind is raised at its point of detection and handled once
/// at the command-dispatch boundary, where it becomes a colored message and
/// exit code 1. No retries happen anywhere.
#[derive(Debug, Error)]
pub enum MakerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid paper size: {0}. Valid sizes: A0-A10, B0-B10")]
    InvalidPaperSize(String),

    #[error("Invalid time format: '{0}'. Use seconds, MM:SS[.mmm], or HH:MM:SS[.mmm]")]
    InvalidTimeFormat(String),

    #[error("Invalid time range: start ({start}) must be before end ({end})")]
    TimeRange { start: f64, end: f64 },

    #[error("Unsupported format: {requested}. Supported: {supported}")]
    UnsupportedFormat {
        requested: String,
        supported: String,
    },

    #[error("File already exists: {0} (use --overwrite to replace)")]
    FileAlreadyExists(PathBuf),

    #[error("No audio stream in source: {0}")]
    NoAudioStream(PathBuf),

    #[error("FFmpeg binary not found")]
    FfmpegNotFound,

    #[error("yt-dlp binary not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("No manifest found for alias: {0}")]
    AliasNotFound(String),

    #[error("No downloaded file exists on disk for alias: {0}")]
    NotFoundForAlias(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Failed to download font '{font}': {reason}")]
    FontDownloadError { font: String, reason: String },

    #[error("Resume validation failed:\n{0}")]
    ResumeValidation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MakerError {
    /// Create an FFmpeg failure carrying the engine's diagnostic output.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed(message.into())
    }

    pub fn unsupported_format(requested: impl Into<String>, supported: &[&str]) -> Self {
        Self::UnsupportedFormat {
            requested: requested.into(),
            supported: supported.join(", "),
        }
    }
}
