//! Cutter gate behavior: existing-output refusal, overwrite, and the audio
//! gate, driven through stub engine binaries so no real encode runs.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use maker::config::ResolvedConfig;
use maker::domain::{AudioFormat, VideoFormat};
use maker::error::MakerError;
use maker::video::Cutter;

const PROBE_WITH_AUDIO: &str = r#"{"streams":[{"codec_type":"video","width":640,"height":360,"r_frame_rate":"25/1"},{"codec_type":"audio"}],"format":{"duration":"10.000000","format_name":"mov,mp4"}}"#;
const PROBE_VIDEO_ONLY: &str = r#"{"streams":[{"codec_type":"video","width":640,"height":360,"r_frame_rate":"25/1"}],"format":{"duration":"10.000000","format_name":"mov,mp4"}}"#;

fn write_script(dir: &Path, name: &str, body: String) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// An ffmpeg that writes its output argument and exits 0, next to an ffprobe
/// reporting the given stream layout.
fn stub_engine(dir: &Path, probe_json: &str) -> PathBuf {
    let ffmpeg = write_script(
        dir,
        "ffmpeg",
        "#!/bin/sh\nfor last; do :; done\nprintf encoded > \"$last\"\n".to_string(),
    );
    write_script(
        dir,
        "ffprobe",
        format!("#!/bin/sh\nprintf '%s' '{}'\n", probe_json),
    );
    ffmpeg
}

struct Fixture {
    _temp: TempDir,
    cutter: Cutter,
    clips: PathBuf,
    audio: PathBuf,
    source: PathBuf,
}

fn fixture(probe_json: &str) -> Fixture {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let ffmpeg = stub_engine(&bin, probe_json);

    let source = temp.path().join("talk.mp4");
    std::fs::write(&source, b"media bytes").unwrap();

    let clips = temp.path().join("clips");
    let audio = temp.path().join("audio");
    let cfg = ResolvedConfig::with_home(temp.path().join(".maker"));
    let cutter = Cutter::new(&clips, &audio, Some(&ffmpeg), &cfg).unwrap();

    Fixture {
        _temp: temp,
        cutter,
        clips,
        audio,
        source,
    }
}

fn artifact_lines(dir: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(dir.join("artifacts.jsonl")).unwrap();
    text.lines().map(str::to_string).collect()
}

#[tokio::test]
async fn second_identical_clip_is_rejected_without_overwrite() {
    let fx = fixture(PROBE_WITH_AUDIO);

    let spec = fx
        .cutter
        .clip(&fx.source, 1.0, 2.0, VideoFormat::Mp4, false, false)
        .await
        .unwrap();
    assert!(spec.artifact_path.exists());
    assert_eq!(artifact_lines(&fx.clips).len(), 1);

    let again = fx
        .cutter
        .clip(&fx.source, 1.0, 2.0, VideoFormat::Mp4, false, false)
        .await;
    assert!(matches!(again, Err(MakerError::FileAlreadyExists(p)) if p == spec.artifact_path));
    // the refused cut leaves no record behind
    assert_eq!(artifact_lines(&fx.clips).len(), 1);
}

#[tokio::test]
async fn overwrite_reencodes_and_appends_a_second_record() {
    let fx = fixture(PROBE_WITH_AUDIO);

    let first = fx
        .cutter
        .clip(&fx.source, 1.0, 2.0, VideoFormat::Mp4, false, false)
        .await
        .unwrap();
    let second = fx
        .cutter
        .clip(&fx.source, 1.0, 2.0, VideoFormat::Mp4, true, false)
        .await
        .unwrap();
    assert_eq!(first.artifact_path, second.artifact_path);

    let lines = artifact_lines(&fx.clips);
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let doc: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(doc["kind"], "clip");
        assert_eq!(doc["start"], 1.0);
    }
}

#[tokio::test]
async fn silent_source_is_gated_unless_allowed() {
    let fx = fixture(PROBE_VIDEO_ONLY);

    let refused = fx
        .cutter
        .clip(&fx.source, 0.0, 1.0, VideoFormat::Mp4, false, false)
        .await;
    assert!(matches!(refused, Err(MakerError::NoAudioStream(_))));
    assert!(!fx.clips.join("artifacts.jsonl").exists());

    let spec = fx
        .cutter
        .clip(&fx.source, 0.0, 1.0, VideoFormat::Mp4, false, true)
        .await
        .unwrap();
    assert!(spec.artifact_path.exists());
    assert_eq!(artifact_lines(&fx.clips).len(), 1);
}

#[tokio::test]
async fn gif_ignores_the_audio_gate() {
    let fx = fixture(PROBE_VIDEO_ONLY);

    let spec = fx
        .cutter
        .clip(&fx.source, 0.0, 1.0, VideoFormat::Gif, false, false)
        .await
        .unwrap();
    assert!(spec.artifact_path.exists());
}

#[tokio::test]
async fn audio_extraction_from_silent_source_is_always_an_error() {
    let fx = fixture(PROBE_VIDEO_ONLY);

    let result = fx
        .cutter
        .audio(&fx.source, 0.0, 1.0, AudioFormat::M4a, false)
        .await;
    assert!(matches!(result, Err(MakerError::NoAudioStream(_))));
    assert!(!fx.audio.join("artifacts.jsonl").exists());
}
