//! Data structures for downloads and derived artifacts.

pub mod artifact;
pub mod download;

pub use artifact::{ArtifactKind, ArtifactSpec, AudioFormat, VideoFormat};
pub use download::{DownloadSpec, DownloadedFile};
