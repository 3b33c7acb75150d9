//! Video acquisition via the `yt-dlp` binary.
//!
//! yt-dlp is driven as a subprocess: metadata comes from `-J` (single JSON
//! document on stdout), and the set of files a download produced is recovered
//! from the engine's progress lines. Every successful download ends with a
//! manifest write keyed by alias.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::{DownloadSpec, DownloadedFile};
use crate::error::{MakerError, MakerResult};
use crate::manifest::ManifestStore;
use crate::video::ffmpeg::{self, MediaInfo};

/// Default yt-dlp format selector.
pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";

/// Default directory downloads and their manifests land in.
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Remote video metadata, projected down to the fields we report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub duration: f64,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: String,
    pub description: String,
    pub thumbnail: String,
    pub webpage_url: String,
}

/// Facts about a local media file, reported by `yt info` for non-URL sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFileInfo {
    pub title: String,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
    pub path: PathBuf,
    pub format: String,
}

/// Outcome of an info lookup.
///
/// Metadata extraction failing is an expected result, not an exceptional
/// path, so the failure travels as a value and serializes as
/// `{"error": "..."}` the same way a successful lookup serializes its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoOutcome {
    Remote(VideoInfo),
    Local(LocalFileInfo),
    Error { error: String },
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Pick out the output file paths yt-dlp mentioned on stdout.
///
/// Three line shapes carry a path:
/// - `[download] Destination: <path>`
/// - `[Merging] Merging formats into "<path>"`
/// - `[download] <path> has already been downloaded`
///
/// Order is preserved and duplicates dropped.
pub fn collect_output_files(stdout: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for line in stdout.lines() {
        let candidate = if let Some(rest) = line.split_once("Destination: ").map(|(_, r)| r) {
            Some(rest.trim().to_string())
        } else if let Some(idx) = line.find("Merging formats into \"") {
            let rest = &line[idx + "Merging formats into \"".len()..];
            rest.strip_suffix('"').map(str::to_string)
        } else if let Some(rest) = line
            .strip_prefix("[download] ")
            .and_then(|r| r.strip_suffix(" has already been downloaded"))
        {
            Some(rest.trim().to_string())
        } else {
            None
        };

        if let Some(p) = candidate {
            let p = PathBuf::from(p);
            if !paths.contains(&p) {
                paths.push(p);
            }
        }
    }

    paths
}

fn metadata_args(playlist: bool) -> Vec<&'static str> {
    let mut args = vec!["-J", "--no-warnings"];
    if !playlist {
        args.push("--no-playlist");
    }
    args
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(10);
    lines[start..].join("\n")
}

pub struct Downloader {
    downloads_dir: PathBuf,
    store: ManifestStore,
}

impl Downloader {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        let downloads_dir = downloads_dir.into();
        let store = ManifestStore::new(&downloads_dir);
        Self {
            downloads_dir,
            store,
        }
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    fn yt_dlp_bin(&self) -> MakerResult<PathBuf> {
        which::which("yt-dlp").map_err(|_| MakerError::YtDlpNotFound)
    }

    /// Fetch metadata for a URL without downloading (`yt-dlp -J`).
    ///
    /// `playlist` keeps playlist extraction enabled; otherwise the lookup is
    /// pinned to the single video.
    pub async fn extract_info(&self, url: &str, playlist: bool) -> MakerResult<serde_json::Value> {
        let bin = self.yt_dlp_bin()?;

        let output = Command::new(&bin)
            .args(metadata_args(playlist))
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MakerError::download_failed(format!(
                "metadata extraction failed for {}: {}",
                url,
                stderr_tail(&output.stderr)
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Download a video, write its manifest, and return the record.
    ///
    /// The alias defaults to the platform video id. A repeat download under
    /// the same alias replaces the previous manifest.
    pub async fn download(
        &self,
        url: &str,
        alias: Option<&str>,
        format: &str,
        playlist: bool,
    ) -> MakerResult<DownloadSpec> {
        let meta = self.extract_info(url, playlist).await?;

        let video_id = meta
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let title = meta
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Title")
            .to_string();
        let duration = meta.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0);

        let alias = alias.unwrap_or(&video_id).to_string();
        let sanitized_title = sanitize_filename(&title);

        info!(%alias, %title, "downloading");

        let bin = self.yt_dlp_bin()?;
        let mut cmd = Command::new(&bin);
        cmd.args(["-f", format]);
        if !playlist {
            cmd.arg("--no-playlist");
        }
        cmd.args(["--newline", "--no-warnings", "-o"])
            .arg(format!("{}/{}.%(ext)s", alias, sanitized_title))
            .arg("-P")
            .arg(&self.downloads_dir)
            .arg(url)
            .stdin(Stdio::null());

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(MakerError::download_failed(format!(
                "yt-dlp failed for {}: {}",
                url,
                stderr_tail(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut files = Vec::new();
        for reported in collect_output_files(&stdout) {
            // yt-dlp prints paths relative to its working directory; fall
            // back to joining the downloads dir when the raw path is gone.
            let path = if reported.exists() {
                reported
            } else {
                let joined = self.downloads_dir.join(&reported);
                if joined.exists() {
                    joined
                } else {
                    debug!(path = %reported.display(), "reported file missing, skipping");
                    continue;
                }
            };

            let filesize = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string();
            files.push(DownloadedFile {
                path,
                ext,
                filesize,
            });
        }

        if files.is_empty() {
            warn!(%alias, "no output files reported by yt-dlp");
        }

        let spec = DownloadSpec::new(url, video_id, &alias, title, duration)
            .with_files(files)
            .with_opt("format", serde_json::json!(format))
            .with_opt("noplaylist", serde_json::json!(!playlist));

        self.store.write_download_manifest(&spec).await?;

        info!(dir = %self.downloads_dir.join(&alias).display(), "download complete");
        Ok(spec)
    }

    /// Look up remote metadata, folding failure into the outcome value.
    pub async fn get_info(&self, url: &str) -> InfoOutcome {
        match self.extract_info(url, false).await {
            Ok(meta) => InfoOutcome::Remote(VideoInfo {
                title: str_field(&meta, "title", "Unknown"),
                duration: meta.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0),
                uploader: str_field(&meta, "uploader", "Unknown"),
                view_count: meta.get("view_count").and_then(|v| v.as_u64()).unwrap_or(0),
                upload_date: str_field(&meta, "upload_date", "Unknown"),
                description: {
                    let d = str_field(&meta, "description", "");
                    d.chars().take(500).collect()
                },
                thumbnail: str_field(&meta, "thumbnail", ""),
                webpage_url: str_field(&meta, "webpage_url", url),
            }),
            Err(e) => InfoOutcome::Error {
                error: e.to_string(),
            },
        }
    }

    /// Probe a local media file for the info report.
    pub async fn local_info(&self, ffprobe: &Path, path: &Path) -> MakerResult<LocalFileInfo> {
        let MediaInfo {
            duration,
            width,
            height,
            fps,
            format_name,
            has_audio,
            ..
        } = ffmpeg::probe(ffprobe, path).await?;

        Ok(LocalFileInfo {
            title: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            duration,
            width: width.unwrap_or(0),
            height: height.unwrap_or(0),
            fps: fps.unwrap_or(0.0),
            has_audio,
            path: path.to_path_buf(),
            format: if format_name.is_empty() {
                "unknown".to_string()
            } else {
                format_name
            },
        })
    }

    /// Resolve an alias or literal path to a media file on disk.
    ///
    /// Alias lookup wins; when it fails, a source that names an existing file
    /// is used as-is, otherwise the lookup error propagates.
    pub async fn resolve_source(&self, source: &str) -> MakerResult<PathBuf> {
        let lookup = self.resolve_alias(source).await;
        match lookup {
            Ok(path) => Ok(path),
            Err(e) => {
                let path = Path::new(source);
                if path.exists() {
                    Ok(path.to_path_buf())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn resolve_alias(&self, alias: &str) -> MakerResult<PathBuf> {
        let spec = self.store.read_download_manifest(alias).await?;

        for file in &spec.downloaded_files {
            if file.path.exists() {
                return Ok(file.path.clone());
            }
        }

        Err(MakerError::NotFoundForAlias(alias.to_string()))
    }

    pub async fn list_downloads(
        &self,
    ) -> MakerResult<std::collections::BTreeMap<String, DownloadSpec>> {
        self.store.list_downloads().await
    }
}

fn str_field(meta: &serde_json::Value, key: &str, default: &str) -> String {
    meta.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("A Talk: Part 1"), "A_Talk__Part_1");
        assert_eq!(sanitize_filename("clean-name_1.0"), "clean-name_1.0");
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_collect_output_files() {
        let stdout = "\
[youtube] abc: Downloading webpage
[download] Destination: downloads/talk/A_Talk.f137.mp4
[download] 100% of 10.00MiB
[download] Destination: downloads/talk/A_Talk.f140.m4a
[Merging] Merging formats into \"downloads/talk/A_Talk.mp4\"
[download] Destination: downloads/talk/A_Talk.f137.mp4
";
        let files = collect_output_files(stdout);
        assert_eq!(
            files,
            vec![
                PathBuf::from("downloads/talk/A_Talk.f137.mp4"),
                PathBuf::from("downloads/talk/A_Talk.f140.m4a"),
                PathBuf::from("downloads/talk/A_Talk.mp4"),
            ]
        );
    }

    #[test]
    fn test_collect_already_downloaded() {
        let stdout = "[download] downloads/talk/A_Talk.mp4 has already been downloaded\n";
        assert_eq!(
            collect_output_files(stdout),
            vec![PathBuf::from("downloads/talk/A_Talk.mp4")]
        );
    }

    #[test]
    fn test_metadata_args_follow_playlist_mode() {
        let single = metadata_args(false);
        assert!(single.contains(&"-J"));
        assert!(single.contains(&"--no-playlist"));

        let playlist = metadata_args(true);
        assert!(playlist.contains(&"-J"));
        assert!(!playlist.contains(&"--no-playlist"));
    }

    #[test]
    fn test_info_outcome_error_shape() {
        let outcome = InfoOutcome::Error {
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_info_outcome_remote_shape() {
        let outcome = InfoOutcome::Remote(VideoInfo {
            title: "T".into(),
            duration: 1.0,
            uploader: "U".into(),
            view_count: 7,
            upload_date: "20240101".into(),
            description: "d".into(),
            thumbnail: String::new(),
            webpage_url: "https://example.com".into(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["view_count"], 7);
        assert!(json.get("error").is_none());
    }
}
