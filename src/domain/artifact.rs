//! Artifact records for clips and audio extracts.
//!
//! One record is appended to the output directory's `artifacts.jsonl` per
//! successful cut. Records are never mutated or deleted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MakerError;

/// What kind of artifact a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Clip,
    Audio,
}

/// Supported video clip containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Mkv,
    Webm,
    Gif,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 4] = [Self::Mp4, Self::Mkv, Self::Webm, Self::Gif];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Gif => "gif",
        }
    }

    /// ffmpeg muxer name, needed because partial outputs carry a `.part`
    /// suffix the engine cannot infer a container from.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "matroska",
            Self::Webm => "webm",
            Self::Gif => "gif",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for VideoFormat {
    type Err = MakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            "webm" => Ok(Self::Webm),
            "gif" => Ok(Self::Gif),
            other => Err(MakerError::unsupported_format(
                other,
                &["mp4", "mkv", "webm", "gif"],
            )),
        }
    }
}

/// Supported audio extract containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    M4a,
    Wav,
    Mp3,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [Self::M4a, Self::Wav, Self::Mp3];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn muxer(&self) -> &'static str {
        match self {
            Self::M4a => "ipod",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = MakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m4a" => Ok(Self::M4a),
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(MakerError::unsupported_format(
                other,
                &["m4a", "wav", "mp3"],
            )),
        }
    }
}

/// Derivation record for a clip or audio extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,

    /// Output file location
    pub artifact_path: PathBuf,

    /// Trim range in seconds; `start < end` is enforced before construction
    pub start: f64,
    pub end: f64,

    /// Output container/format name (e.g. "mp4", "m4a")
    pub format: String,

    /// Codec/container options applied, stored for reproducibility
    pub ffmpeg_params: BTreeMap<String, String>,

    /// Path of the source file the artifact was cut from
    pub derived_from: PathBuf,

    /// SHA-256 of the source file at derivation time, hex encoded. Lets a
    /// consumer detect whether the source changed since the cut.
    pub source_hash: String,

    pub created_at: DateTime<Utc>,
}

impl ArtifactSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: ArtifactKind,
        artifact_path: PathBuf,
        start: f64,
        end: f64,
        format: impl Into<String>,
        ffmpeg_params: BTreeMap<String, String>,
        derived_from: PathBuf,
        source_hash: String,
    ) -> Self {
        Self {
            kind,
            artifact_path,
            start,
            end,
            format: format.into(),
            ffmpeg_params,
            derived_from,
            source_hash,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for fmt in VideoFormat::ALL {
            assert_eq!(fmt.extension().parse::<VideoFormat>().unwrap(), fmt);
        }
        for fmt in AudioFormat::ALL {
            assert_eq!(fmt.extension().parse::<AudioFormat>().unwrap(), fmt);
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(matches!(
            "avi".parse::<VideoFormat>(),
            Err(MakerError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            "flac".parse::<AudioFormat>(),
            Err(MakerError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_artifact_spec_serializes_kind_lowercase() {
        let spec = ArtifactSpec::new(
            ArtifactKind::Clip,
            PathBuf::from("clips/out.mp4"),
            5.0,
            10.0,
            "mp4",
            BTreeMap::new(),
            PathBuf::from("downloads/talk/talk.mp4"),
            "ab".repeat(32),
        );

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"kind\":\"clip\""));

        let parsed: ArtifactSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, ArtifactKind::Clip);
        assert_eq!(parsed.start, 5.0);
        assert_eq!(parsed.source_hash.len(), 64);
    }
}
