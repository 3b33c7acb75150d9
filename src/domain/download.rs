//! Download manifest records.
//!
//! One `DownloadSpec` is written per downloaded source video, keyed by its
//! alias. Once written, a manifest only changes by being overwritten wholesale
//! by a fresh download under the same alias.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One on-disk file produced by a download.
///
/// A single video can yield multiple files (e.g. separate audio and video
/// streams that get muxed afterwards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedFile {
    /// Absolute or downloads-dir-relative path
    pub path: PathBuf,

    /// File extension without the dot
    pub ext: String,

    /// Size in bytes at download time
    pub filesize: u64,
}

/// Provenance record for a downloaded source video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSpec {
    /// Origin URL
    pub source_url: String,

    /// Stable identifier from the source platform
    pub video_id: String,

    /// User-chosen name, or `video_id` when none was supplied. Unique key
    /// under which the manifest is stored.
    pub alias: String,

    /// Files produced by this download, in the order they were reported
    pub downloaded_files: Vec<DownloadedFile>,

    /// Format-selection options used, stored for reproducibility
    pub yt_dlp_opts: BTreeMap<String, serde_json::Value>,

    /// When the download started
    pub created_at: DateTime<Utc>,

    pub title: String,

    /// Duration in seconds
    pub duration: f64,
}

impl DownloadSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_url: impl Into<String>,
        video_id: impl Into<String>,
        alias: impl Into<String>,
        title: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            video_id: video_id.into(),
            alias: alias.into(),
            downloaded_files: Vec::new(),
            yt_dlp_opts: BTreeMap::new(),
            created_at: Utc::now(),
            title: title.into(),
            duration,
        }
    }

    pub fn with_files(mut self, files: Vec<DownloadedFile>) -> Self {
        self.downloaded_files = files;
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.yt_dlp_opts.insert(key.into(), value);
        self
    }
}
