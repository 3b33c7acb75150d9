//! Frame-accurate clip and audio extraction.
//!
//! Cuts go through filter-graph trimming (`trim`/`atrim` plus a PTS reset)
//! rather than input seeking, trading speed for exact boundaries. The engine
//! writes to a `.part` path that is renamed into place only on success, so a
//! file at the final path is always complete, and every artifact record in
//! `artifacts.jsonl` refers to a file that finished encoding.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::domain::{ArtifactKind, ArtifactSpec, AudioFormat, VideoFormat};
use crate::error::{MakerError, MakerResult};
use crate::manifest::ManifestStore;
use crate::time::format_time_for_filename;
use crate::video::ffmpeg::{self, FfmpegCommand};

/// Default output directory for video clips.
pub const DEFAULT_OUTPUT_DIR: &str = "clips";

/// Default output directory for audio extracts.
pub const DEFAULT_AUDIO_DIR: &str = "audio";

/// Platform family for codec selection. macOS gets hardware H.264 encoding
/// via VideoToolbox; everything else uses libx264.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    MacOs,
    Other,
}

impl PlatformFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

/// Codec parameter table for video formats, keyed by (platform, format).
/// Container selection is not part of the table; `run_to` passes the muxer.
pub fn video_codec_params(
    platform: PlatformFamily,
    format: VideoFormat,
) -> &'static [(&'static str, &'static str)] {
    use PlatformFamily::*;
    use VideoFormat::*;

    match (platform, format) {
        (MacOs, Mp4) => &[("c:v", "h264_videotoolbox"), ("b:v", "10M"), ("c:a", "aac")],
        (Other, Mp4) => &[("c:v", "libx264"), ("c:a", "aac"), ("movflags", "+faststart")],
        (_, Mkv) => &[("c:v", "libx264"), ("c:a", "aac")],
        (_, Webm) => &[("c:v", "libvpx-vp9"), ("c:a", "libopus")],
        (_, Gif) => &[],
    }
}

/// Codec parameter table for audio formats. Platform-independent.
pub fn audio_codec_params(format: AudioFormat) -> &'static [(&'static str, &'static str)] {
    match format {
        AudioFormat::M4a => &[("c:a", "aac")],
        AudioFormat::Wav => &[("c:a", "pcm_s16le")],
        AudioFormat::Mp3 => &[("c:a", "libmp3lame")],
    }
}

/// SHA-256 of a file's content, hex encoded. Runs on a blocking worker.
pub async fn compute_file_hash(path: &Path) -> MakerResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> MakerResult<String> {
        use sha2::{Digest, Sha256};
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| MakerError::Io(std::io::Error::other(e)))?
}

/// Deterministic output filename: `<stem>_<start>_to_<end>.<ext>` with the
/// times rendered as `HH-MM-SS.mmm`.
pub fn output_path(
    source: &Path,
    start: f64,
    end: f64,
    ext: &str,
    output_dir: &Path,
) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip");
    let filename = format!(
        "{}_{}_to_{}.{}",
        stem,
        format_time_for_filename(start),
        format_time_for_filename(end),
        ext
    );
    output_dir.join(filename)
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    final_path.with_file_name(name)
}

pub struct Cutter {
    output_dir: PathBuf,
    audio_dir: PathBuf,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Cutter {
    /// Resolve engine binaries up front; a missing ffmpeg fails here rather
    /// than mid-cut.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
        ffmpeg_bin: Option<&Path>,
        cfg: &ResolvedConfig,
    ) -> MakerResult<Self> {
        let ffmpeg = ffmpeg::resolve_ffmpeg(ffmpeg_bin, cfg)?;
        let ffprobe = ffmpeg::resolve_ffprobe(&ffmpeg)?;
        Ok(Self {
            output_dir: output_dir.into(),
            audio_dir: audio_dir.into(),
            ffmpeg,
            ffprobe,
        })
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    async fn has_audio(&self, source: &Path) -> bool {
        ffmpeg::probe(&self.ffprobe, source)
            .await
            .map(|i| i.has_audio)
            .unwrap_or(false)
    }

    /// Cut a video clip. `allow_no_audio` lets a silent source through with
    /// a video-only output.
    pub async fn clip(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        format: VideoFormat,
        overwrite: bool,
        allow_no_audio: bool,
    ) -> MakerResult<ArtifactSpec> {
        fs::create_dir_all(&self.output_dir).await?;
        let out = output_path(source, start, end, format.extension(), &self.output_dir);

        if out.exists() && !overwrite {
            return Err(MakerError::FileAlreadyExists(out));
        }

        let has_audio = self.has_audio(source).await;
        if !has_audio && !allow_no_audio && format != VideoFormat::Gif {
            return Err(MakerError::NoAudioStream(source.to_path_buf()));
        }

        let source_hash = compute_file_hash(source).await?;

        info!(format = %format, output = %out.display(), "creating clip");

        if format == VideoFormat::Gif {
            self.encode_gif(source, start, end, &out).await?;
        } else {
            self.encode_clip(source, start, end, format, has_audio, &out)
                .await?;
        }

        let params: BTreeMap<String, String> =
            video_codec_params(PlatformFamily::current(), format)
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();

        let spec = ArtifactSpec::new(
            ArtifactKind::Clip,
            out,
            start,
            end,
            format.extension(),
            params,
            source.to_path_buf(),
            source_hash,
        );

        ManifestStore::append_artifact_record(&spec, &self.output_dir).await?;
        Ok(spec)
    }

    /// Extract an audio segment. A source with no audio stream is always an
    /// error here.
    pub async fn audio(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        format: AudioFormat,
        overwrite: bool,
    ) -> MakerResult<ArtifactSpec> {
        fs::create_dir_all(&self.audio_dir).await?;
        let out = output_path(source, start, end, format.extension(), &self.audio_dir);

        if out.exists() && !overwrite {
            return Err(MakerError::FileAlreadyExists(out));
        }

        if !self.has_audio(source).await {
            return Err(MakerError::NoAudioStream(source.to_path_buf()));
        }

        let source_hash = compute_file_hash(source).await?;

        info!(format = %format, output = %out.display(), "extracting audio");

        let cmd = FfmpegCommand::new(&self.ffmpeg)
            .input(source)
            .arg("-filter_complex")
            .arg(format!(
                "[0:a]atrim=start={}:end={},asetpts=PTS-STARTPTS[a]",
                start, end
            ))
            .args(["-map", "[a]"])
            .args(flag_args(audio_codec_params(format)));

        self.run_to(cmd, &out, format.muxer()).await?;

        let params: BTreeMap<String, String> = audio_codec_params(format)
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let spec = ArtifactSpec::new(
            ArtifactKind::Audio,
            out,
            start,
            end,
            format.extension(),
            params,
            source.to_path_buf(),
            source_hash,
        );

        ManifestStore::append_artifact_record(&spec, &self.audio_dir).await?;
        Ok(spec)
    }

    async fn encode_clip(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        format: VideoFormat,
        has_audio: bool,
        out: &Path,
    ) -> MakerResult<()> {
        let filter = if has_audio {
            format!(
                "[0:v]trim=start={s}:end={e},setpts=PTS-STARTPTS[v];\
                 [0:a]atrim=start={s}:end={e},asetpts=PTS-STARTPTS[a]",
                s = start,
                e = end
            )
        } else {
            format!(
                "[0:v]trim=start={}:end={},setpts=PTS-STARTPTS[v]",
                start, end
            )
        };

        let mut cmd = FfmpegCommand::new(&self.ffmpeg)
            .input(source)
            .arg("-filter_complex")
            .arg(filter)
            .args(["-map", "[v]"]);
        if has_audio {
            cmd = cmd.args(["-map", "[a]"]);
        }
        cmd = cmd.args(flag_args(video_codec_params(
            PlatformFamily::current(),
            format,
        )));

        self.run_to(cmd, out, format.muxer()).await
    }

    /// Two-pass GIF: generate a 256-color palette from the trimmed segment,
    /// then map frames through it. The palette intermediate is removed in
    /// all cases.
    async fn encode_gif(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        out: &Path,
    ) -> MakerResult<()> {
        let palette = out.with_extension("palette.png");

        let pass1 = FfmpegCommand::new(&self.ffmpeg)
            .input(source)
            .arg("-filter_complex")
            .arg(format!(
                "[0:v]trim=start={}:end={},setpts=PTS-STARTPTS,palettegen=max_colors=256[p]",
                start, end
            ))
            .args(["-map", "[p]"])
            .run(&palette)
            .await;

        let result = match pass1 {
            Ok(()) => {
                let pass2 = FfmpegCommand::new(&self.ffmpeg)
                    .input(source)
                    .input(&palette)
                    .arg("-filter_complex")
                    .arg(format!(
                        "[0:v]trim=start={}:end={},setpts=PTS-STARTPTS[v];\
                         [v][1:v]paletteuse[out]",
                        start, end
                    ))
                    .args(["-map", "[out]"]);
                self.run_to(pass2, out, VideoFormat::Gif.muxer()).await
            }
            Err(e) => Err(e),
        };

        if palette.exists() {
            let _ = fs::remove_file(&palette).await;
        }

        result
    }

    /// Run an encode to `<out>.part`, renaming into place only on success.
    async fn run_to(&self, cmd: FfmpegCommand, out: &Path, muxer: &str) -> MakerResult<()> {
        let tmp = part_path(out);

        match cmd.args(["-f", muxer]).run(&tmp).await {
            Ok(()) => {
                fs::rename(&tmp, out).await?;
                Ok(())
            }
            Err(e) => {
                if tmp.exists() {
                    debug!(path = %tmp.display(), "removing partial output");
                    let _ = fs::remove_file(&tmp).await;
                }
                Err(e)
            }
        }
    }
}

fn flag_args(params: &[(&str, &str)]) -> Vec<String> {
    params
        .iter()
        .flat_map(|(k, v)| [format!("-{}", k), v.to_string()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_filename_shape() {
        let out = output_path(
            Path::new("downloads/talk/A_Talk.mp4"),
            5.0,
            83.5,
            "mp4",
            Path::new("clips"),
        );
        assert_eq!(
            out,
            Path::new("clips/A_Talk_00-00-05.000_to_00-01-23.500.mp4")
        );
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("clips/a.mp4")),
            Path::new("clips/a.mp4.part")
        );
    }

    #[test]
    fn test_codec_tables() {
        let mp4 = video_codec_params(PlatformFamily::Other, VideoFormat::Mp4);
        assert!(mp4.contains(&("c:v", "libx264")));
        assert!(mp4.contains(&("movflags", "+faststart")));

        let mac_mp4 = video_codec_params(PlatformFamily::MacOs, VideoFormat::Mp4);
        assert!(mac_mp4.contains(&("c:v", "h264_videotoolbox")));

        // mkv is the same on every platform
        for p in [PlatformFamily::MacOs, PlatformFamily::Other] {
            let mkv = video_codec_params(p, VideoFormat::Mkv);
            assert!(mkv.contains(&("c:v", "libx264")));
        }

        assert!(video_codec_params(PlatformFamily::Other, VideoFormat::Gif).is_empty());
        assert_eq!(audio_codec_params(AudioFormat::Wav), &[("c:a", "pcm_s16le")]);
    }

    #[test]
    fn test_codec_tables_never_carry_the_muxer() {
        // run_to passes `-f <muxer>` itself; a table entry would duplicate it
        for p in [PlatformFamily::MacOs, PlatformFamily::Other] {
            for fmt in VideoFormat::ALL {
                assert!(
                    !video_codec_params(p, fmt).iter().any(|(k, _)| *k == "f"),
                    "{fmt} table carries an -f flag"
                );
            }
        }
        for fmt in AudioFormat::ALL {
            assert!(!audio_codec_params(fmt).iter().any(|(k, _)| *k == "f"));
        }
    }

    #[test]
    fn test_flag_args_prefixing() {
        assert_eq!(
            flag_args(&[("c:v", "libx264"), ("c:a", "aac")]),
            vec!["-c:v", "libx264", "-c:a", "aac"]
        );
    }

    #[tokio::test]
    async fn test_compute_file_hash() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("f.bin");
        std::fs::write(&path, b"hello").unwrap();

        let hash = compute_file_hash(&path).await.unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
