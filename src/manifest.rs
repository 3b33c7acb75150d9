//! File-backed persistence for download manifests and artifact records.
//!
//! Layout conventions:
//! - `<downloads_dir>/<alias>/manifest.json` — one `DownloadSpec` JSON object,
//!   overwritten wholesale on each download to that alias.
//! - `<output_dir>/artifacts.jsonl` — newline-delimited JSON, one artifact
//!   record per line, strictly append-only.
//!
//! All I/O is synchronous-per-call file I/O; no locking is provided. Two
//! simultaneous invocations targeting the same alias or output directory can
//! interleave writes, which is acceptable for a single-user interactive tool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::{ArtifactSpec, DownloadSpec};
use crate::error::{MakerError, MakerResult};

/// Name of the per-alias manifest file
pub const MANIFEST_FILE: &str = "manifest.json";

/// Name of the per-output-directory artifact log
pub const ARTIFACTS_FILE: &str = "artifacts.jsonl";

/// Manifest store rooted at a downloads directory.
///
/// The store owns all manifest files; the downloader and cutter construct
/// in-memory records and delegate persistence here. Nothing is cached in
/// memory between invocations.
pub struct ManifestStore {
    downloads_dir: PathBuf,
}

impl ManifestStore {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Path of the manifest for an alias.
    pub fn manifest_path(&self, alias: &str) -> PathBuf {
        self.downloads_dir.join(alias).join(MANIFEST_FILE)
    }

    /// Write a download manifest, creating parent directories and replacing
    /// any previous manifest under the same alias.
    pub async fn write_download_manifest(&self, spec: &DownloadSpec) -> MakerResult<()> {
        let path = self.manifest_path(&spec.alias);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(spec)?;
        fs::write(&path, json).await?;

        debug!(alias = %spec.alias, path = %path.display(), "wrote download manifest");
        Ok(())
    }

    /// Read the manifest for an alias.
    pub async fn read_download_manifest(&self, alias: &str) -> MakerResult<DownloadSpec> {
        let path = self.manifest_path(alias);

        if !path.exists() {
            return Err(MakerError::AliasNotFound(alias.to_string()));
        }

        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Scan `*/manifest.json` under the downloads directory.
    ///
    /// Returns a map from alias (the parent directory name) to its parsed
    /// spec. A missing or malformed entry is simply absent from the result,
    /// not an error.
    pub async fn list_downloads(&self) -> MakerResult<BTreeMap<String, DownloadSpec>> {
        let mut downloads = BTreeMap::new();

        if !self.downloads_dir.exists() {
            return Ok(downloads);
        }

        let mut entries = fs::read_dir(&self.downloads_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let Some(alias) = entry.file_name().to_str().map(String::from) else {
                continue;
            };

            let manifest_path = entry.path().join(MANIFEST_FILE);
            let Ok(content) = fs::read_to_string(&manifest_path).await else {
                continue;
            };

            match serde_json::from_str::<DownloadSpec>(&content) {
                Ok(spec) => {
                    downloads.insert(alias, spec);
                }
                Err(e) => {
                    debug!(alias = %alias, error = %e, "skipping malformed manifest");
                }
            }
        }

        Ok(downloads)
    }

    /// Append one artifact record to `<output_dir>/artifacts.jsonl`.
    ///
    /// Prior entries are never read or rewritten; repeated invocations
    /// accumulate history in the same directory.
    pub async fn append_artifact_record(
        spec: &ArtifactSpec,
        output_dir: &Path,
    ) -> MakerResult<PathBuf> {
        fs::create_dir_all(output_dir).await?;
        let log_path = output_dir.join(ARTIFACTS_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?;

        let json = serde_json::to_string(spec)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(log_path)
    }
}
