//! FFmpeg/ffprobe invocation.
//!
//! Binary resolution order: explicit `--ffmpeg-bin` path, then a bundled
//! binary under `<home>/bin/`, then whatever is on `PATH`. An explicit path
//! that does not exist is an error rather than a silent fallback.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::ResolvedConfig;
use crate::error::{MakerError, MakerResult};

/// How many trailing stderr lines to carry in an error message.
const STDERR_TAIL_LINES: usize = 15;

/// Resolve the ffmpeg binary to invoke.
pub fn resolve_ffmpeg(explicit: Option<&Path>, cfg: &ResolvedConfig) -> MakerResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(MakerError::FfmpegNotFound);
    }

    let bundled = cfg.bundled_ffmpeg();
    if bundled.exists() {
        debug!(path = %bundled.display(), "using bundled ffmpeg");
        return Ok(bundled);
    }

    which::which("ffmpeg").map_err(|_| MakerError::FfmpegNotFound)
}

/// Resolve ffprobe, preferring a sibling of the resolved ffmpeg binary.
pub fn resolve_ffprobe(ffmpeg: &Path) -> MakerResult<PathBuf> {
    let name = if cfg!(windows) {
        "ffprobe.exe"
    } else {
        "ffprobe"
    };

    if let Some(dir) = ffmpeg.parent() {
        let sibling = dir.join(name);
        if sibling.exists() {
            return Ok(sibling);
        }
    }

    which::which("ffprobe").map_err(|_| MakerError::FfmpegNotFound)
}

/// Builder for a single ffmpeg invocation.
///
/// Argument order matters to ffmpeg (input options precede their `-i`, output
/// options precede the output path), so the builder just accumulates args in
/// call order and appends `-y`/output last.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    bin: PathBuf,
    args: Vec<OsString>,
}

impl FfmpegCommand {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            args: vec!["-hide_banner".into(), "-nostdin".into()],
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.arg("-i").arg(path.as_ref())
    }

    /// Terminal: append `-y` and the output path, then run to completion.
    pub async fn run(self, output: impl AsRef<Path>) -> MakerResult<()> {
        let output = output.as_ref();
        let mut args = self.args;
        args.push("-y".into());
        args.push(output.into());

        trace!(bin = %self.bin.display(), ?args, "running ffmpeg");

        let result = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MakerError::FfmpegNotFound
                } else {
                    MakerError::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr
                .lines()
                .rev()
                .take(STDERR_TAIL_LINES)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();

            return Err(MakerError::ffmpeg_failed(
                format!("encoding {} failed", output.display()),
                Some(tail.join("\n")),
                result.status.code(),
            ));
        }

        Ok(())
    }
}

/// Stream and container facts ffprobe reports about a media file.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub format_name: String,
    pub has_audio: bool,
    pub has_video: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    r_frame_rate: Option<String>,
}

/// Probe a media file with ffprobe.
pub async fn probe(ffprobe: &Path, media: &Path) -> MakerResult<MediaInfo> {
    let result = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(media)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MakerError::FfmpegNotFound
            } else {
                MakerError::Io(e)
            }
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).to_string();
        return Err(MakerError::ffmpeg_failed(
            format!("ffprobe failed for {}", media.display()),
            Some(stderr),
            result.status.code(),
        ));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&result.stdout)?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration: parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        fps: video
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
        format_name: parsed.format.format_name.unwrap_or_default(),
        has_audio,
        has_video: video.is_some(),
    })
}

/// Parse ffprobe's rational frame rate ("30000/1001", "25/1", or "25").
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(num / den)
        }
        None => rate.parse().ok(),
    }
}
