//! Integration tests for manifest persistence across invocations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tempfile::TempDir;

use maker::domain::{ArtifactKind, ArtifactSpec, DownloadSpec, DownloadedFile};
use maker::manifest::ManifestStore;

fn download_spec(alias: &str, title: &str) -> DownloadSpec {
    DownloadSpec::new(
        format!("https://youtube.com/watch?v={}", alias),
        format!("{}_id", alias),
        alias,
        title,
        60.0,
    )
    .with_files(vec![DownloadedFile {
        path: PathBuf::from(format!("downloads/{}/{}.mp4", alias, title)),
        ext: "mp4".to_string(),
        filesize: 4096,
    }])
}

#[tokio::test]
async fn manifest_round_trip_across_store_instances() {
    let temp = TempDir::new().unwrap();

    // First invocation writes.
    {
        let store = ManifestStore::new(temp.path());
        store
            .write_download_manifest(&download_spec("talk", "A Talk"))
            .await
            .unwrap();
    }

    // Second invocation reads fresh, nothing cached.
    let store = ManifestStore::new(temp.path());
    let spec = store.read_download_manifest("talk").await.unwrap();
    assert_eq!(spec.title, "A Talk");
    assert_eq!(spec.video_id, "talk_id");

    let on_disk = temp.path().join("talk").join("manifest.json");
    assert!(on_disk.exists());
}

#[tokio::test]
async fn list_downloads_maps_alias_to_spec_and_skips_junk() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path());

    store
        .write_download_manifest(&download_spec("a", "First"))
        .await
        .unwrap();
    store
        .write_download_manifest(&download_spec("b", "Second"))
        .await
        .unwrap();

    // Malformed manifest, plain file, and empty directory must all be
    // silently absent from the listing.
    let junk_dir = temp.path().join("broken");
    std::fs::create_dir_all(&junk_dir).unwrap();
    std::fs::write(junk_dir.join("manifest.json"), "{ not json").unwrap();
    std::fs::write(temp.path().join("stray.txt"), "x").unwrap();
    std::fs::create_dir_all(temp.path().join("empty")).unwrap();

    let downloads = store.list_downloads().await.unwrap();
    assert_eq!(downloads.len(), 2);
    assert_eq!(downloads["a"].title, "First");
    assert_eq!(downloads["b"].title, "Second");
}

#[tokio::test]
async fn artifact_log_accumulates_history() {
    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("clips");

    for i in 0..5 {
        let spec = ArtifactSpec::new(
            if i % 2 == 0 {
                ArtifactKind::Clip
            } else {
                ArtifactKind::Audio
            },
            out_dir.join(format!("cut{}.mp4", i)),
            i as f64,
            i as f64 + 1.0,
            "mp4",
            BTreeMap::new(),
            PathBuf::from("src.mp4"),
            format!("{:064}", i),
        );
        ManifestStore::append_artifact_record(&spec, &out_dir)
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(out_dir.join("artifacts.jsonl")).unwrap();
    let records: Vec<ArtifactSpec> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(records.len(), 5);
    assert_eq!(records[0].kind, ArtifactKind::Clip);
    assert_eq!(records[1].kind, ArtifactKind::Audio);
    assert_eq!(records[4].artifact_path, out_dir.join("cut4.mp4"));
}
