//! Spec -> plan -> fetched directory -> per-track file, without the network.

use albumsync::album::AlbumSpec;
use albumsync::fetch::Inventory;
use albumsync::{plan_sources, resolve_track, Error};
use std::fs;
use std::path::Path;

fn fetched_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for f in files {
        fs::write(dir.path().join(f), b"mp3").unwrap();
    }
    dir
}

fn file_name(path: &Path) -> &str {
    path.file_name().unwrap().to_str().unwrap()
}

#[test]
fn test_basic_album_maps_files_in_order() {
    let album = AlbumSpec::from_yaml(
        r#"
album: Record
album_artist: Band
url: X
tracks:
  - title: A
  - title: B
"#,
    )
    .unwrap();
    let dir = fetched_dir(&["02 - bar.mp3", "01 - foo.mp3", "01 - foo.jpg"]);
    let inventory = Inventory::scan(dir.path()).unwrap();

    let sources = plan_sources(&album).unwrap();
    let files: Vec<String> = sources
        .iter()
        .map(|s| file_name(&resolve_track(s, &inventory).unwrap()).to_string())
        .collect();
    assert_eq!(files, vec!["01 - foo.mp3", "02 - bar.mp3"]);
}

#[test]
fn test_advanced_missing_named_file() {
    let album = AlbumSpec::from_yaml(
        r#"
album: Record
album_artist: Band
url: X
tracks:
  - title: A
    file: 0
  - title: B
    url: Y
    file: track.mp3
"#,
    )
    .unwrap();
    let sources = plan_sources(&album).unwrap();
    assert_eq!(sources[1].url, "Y");

    let y = fetched_dir(&["01 - something else.mp3"]);
    let inventory = Inventory::scan(y.path()).unwrap();
    let err = resolve_track(&sources[1], &inventory).unwrap_err();
    assert!(matches!(err, Error::Expectation(_)));
    let msg = err.to_string();
    assert!(msg.contains("\"Y\""), "{}", msg);
    assert!(msg.contains("track.mp3"), "{}", msg);
}

#[test]
fn test_gap_in_fetched_numbering() {
    let album = AlbumSpec::from_yaml("album_artist: Band\nurl: X\ntracks:\n  - title: A\n").unwrap();
    let sources = plan_sources(&album).unwrap();
    let dir = fetched_dir(&["01 - a.mp3", "02 - b.mp3", "04 - d.mp3"]);
    let inventory = Inventory::scan(dir.path()).unwrap();

    let err = resolve_track(&sources[0], &inventory).unwrap_err();
    assert!(matches!(err, Error::Expectation(_)));
    assert!(err.to_string().contains("index 3"), "{}", err);
}

#[test]
fn test_fetched_count_mismatch() {
    let album = AlbumSpec::from_yaml(
        "album_artist: Band\nurl: X\ntracks:\n  - title: A\n  - title: B\n  - title: C\n  - title: D\n",
    )
    .unwrap();
    let sources = plan_sources(&album).unwrap();
    assert!(sources.iter().all(|s| s.expect_count == Some(4)));

    let dir = fetched_dir(&["01 - a.mp3", "02 - b.mp3", "03 - c.mp3"]);
    let inventory = Inventory::scan(dir.path()).unwrap();
    let err = resolve_track(&sources[0], &inventory).unwrap_err();
    assert!(
        err.to_string().contains("expected to fetch 4 from X, got 3"),
        "{}",
        err
    );
}

#[test]
fn test_singles_collection_expects_one_file_each() {
    let album = AlbumSpec::from_yaml(
        "album_artist: Band\ntracks:\n  - title: S1\n    url: U1\n  - title: S2\n    url: U2\n",
    )
    .unwrap();
    let sources = plan_sources(&album).unwrap();
    let two = fetched_dir(&["01 - a.mp3", "02 - b.mp3"]);
    let inventory = Inventory::scan(two.path()).unwrap();
    let err = resolve_track(&sources[0], &inventory).unwrap_err();
    assert!(err.to_string().contains("expected to fetch 1 from U1, got 2"), "{}", err);
}
