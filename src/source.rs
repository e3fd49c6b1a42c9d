//! Track source planning.
//!
//! An album spec describes where its audio comes from in one of two shapes:
//!
//! 1. Basic: one album URL whose items map one-to-one, in order, onto the
//!    tracks. No track names a URL or file.
//! 2. Advanced: tracks name their own URL (a singles collection), or every
//!    track names a file, optionally from its own URL with the album URL as
//!    the default.
//!
//! Planning turns that into one `TrackSource` per track.

use crate::album::{AlbumSpec, FileSelector, TrackSpec};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Basic,
    Advanced,
}

impl SourceMode {
    pub fn of(album: &AlbumSpec) -> Self {
        if album
            .tracks
            .iter()
            .all(|t| t.url.is_none() && t.file.is_none())
        {
            SourceMode::Basic
        } else {
            SourceMode::Advanced
        }
    }
}

/// How one track's file is located, decided once at plan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOrigin {
    /// Position within the shared album URL.
    AlbumPosition { url: String, position: usize, count: usize },
    /// Explicitly selected file, from the track URL or the album URL.
    Selected { url: String, file: FileSelector },
    /// The single item behind the track's own URL.
    Sole { url: String },
}

/// Resolved plan entry: where to fetch from, how many items to expect there,
/// and which one belongs to this track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSource {
    pub url: String,
    pub expect_count: Option<usize>,
    pub selector: FileSelector,
}

impl From<TrackOrigin> for TrackSource {
    fn from(origin: TrackOrigin) -> Self {
        match origin {
            TrackOrigin::AlbumPosition { url, position, count } => TrackSource {
                url,
                expect_count: Some(count),
                selector: FileSelector::Index(position),
            },
            TrackOrigin::Selected { url, file } => TrackSource {
                url,
                expect_count: None,
                selector: file,
            },
            TrackOrigin::Sole { url } => TrackSource {
                url,
                expect_count: Some(1),
                selector: FileSelector::Index(0),
            },
        }
    }
}

fn advanced_origin(album: &AlbumSpec, index: usize, track: &TrackSpec) -> Result<TrackOrigin> {
    match &track.file {
        Some(file) => {
            let url = track.url.as_ref().or(album.url.as_ref()).ok_or_else(|| {
                Error::config(format!("no url for both album and track[{}]", index))
            })?;
            Ok(TrackOrigin::Selected {
                url: url.clone(),
                file: file.clone(),
            })
        }
        None => {
            let url = track.url.as_ref().ok_or_else(|| {
                Error::config(format!(
                    "track[{}] has neither its own url nor a file selector",
                    index
                ))
            })?;
            Ok(TrackOrigin::Sole { url: url.clone() })
        }
    }
}

/// Decide the origin of every track, in spec order.
pub fn plan_origins(album: &AlbumSpec) -> Result<Vec<TrackOrigin>> {
    match SourceMode::of(album) {
        SourceMode::Basic => {
            let url = album
                .url
                .as_ref()
                .ok_or_else(|| Error::config("album url is required when no track sets url or file"))?;
            let count = album.tracks.len();
            Ok((0..count)
                .map(|position| TrackOrigin::AlbumPosition {
                    url: url.clone(),
                    position,
                    count,
                })
                .collect())
        }
        SourceMode::Advanced => album
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| advanced_origin(album, i, track))
            .collect(),
    }
}

/// One descriptor per track, in track order.
pub fn plan_sources(album: &AlbumSpec) -> Result<Vec<TrackSource>> {
    Ok(plan_origins(album)?
        .into_iter()
        .map(TrackSource::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(url: Option<&str>, tracks: Vec<TrackSpec>) -> AlbumSpec {
        AlbumSpec {
            album: Some("Record".into()),
            album_artist: "Band".into(),
            date: None,
            cover: None,
            url: url.map(str::to_string),
            lrc: Default::default(),
            expect_files: None,
            tracks,
        }
    }

    fn track(title: &str, url: Option<&str>, file: Option<FileSelector>) -> TrackSpec {
        TrackSpec {
            url: url.map(str::to_string),
            file,
            ..TrackSpec::new(title)
        }
    }

    #[test]
    fn test_basic_mode() {
        let spec = album(
            Some("X"),
            vec![track("A", None, None), track("B", None, None), track("C", None, None)],
        );
        assert_eq!(SourceMode::of(&spec), SourceMode::Basic);
        let plan = plan_sources(&spec).unwrap();
        assert_eq!(plan.len(), 3);
        for (i, src) in plan.iter().enumerate() {
            assert_eq!(src.url, "X");
            assert_eq!(src.expect_count, Some(3));
            assert_eq!(src.selector, FileSelector::Index(i));
        }
    }

    #[test]
    fn test_basic_mode_without_album_url() {
        let spec = album(None, vec![track("A", None, None)]);
        assert!(matches!(plan_sources(&spec), Err(Error::Config(_))));
    }

    #[test]
    fn test_singles_mode() {
        let spec = album(None, vec![track("A", Some("U1"), None), track("B", Some("U2"), None)]);
        assert_eq!(SourceMode::of(&spec), SourceMode::Advanced);
        let plan = plan_sources(&spec).unwrap();
        assert_eq!(
            plan,
            vec![
                TrackSource { url: "U1".into(), expect_count: Some(1), selector: FileSelector::Index(0) },
                TrackSource { url: "U2".into(), expect_count: Some(1), selector: FileSelector::Index(0) },
            ]
        );
    }

    #[test]
    fn test_mixed_mode_album_url_is_default() {
        let spec = album(
            Some("X"),
            vec![
                track("A", None, Some(FileSelector::Name("01 - a.mp3".into()))),
                track("B", Some("Y"), Some(FileSelector::Index(4))),
            ],
        );
        let plan = plan_sources(&spec).unwrap();
        assert_eq!(plan[0].url, "X");
        assert_eq!(plan[0].expect_count, None);
        assert_eq!(plan[0].selector, FileSelector::Name("01 - a.mp3".into()));
        assert_eq!(plan[1].url, "Y");
        assert_eq!(plan[1].selector, FileSelector::Index(4));
    }

    #[test]
    fn test_advanced_track_without_any_url() {
        let spec = album(None, vec![track("A", Some("U"), None), track("B", None, Some(FileSelector::Index(0)))]);
        let err = plan_sources(&spec).unwrap_err();
        assert!(err.to_string().contains("track[1]"), "{}", err);
    }

    #[test]
    fn test_advanced_track_without_url_or_file() {
        let spec = album(Some("X"), vec![track("A", Some("U"), None), track("B", None, None)]);
        let err = plan_sources(&spec).unwrap_err();
        assert!(err.to_string().contains("track[1]"), "{}", err);
    }

    #[test]
    fn test_file_index_zero_is_an_explicit_selector() {
        let spec = album(Some("X"), vec![track("A", None, Some(FileSelector::Index(0)))]);
        assert_eq!(SourceMode::of(&spec), SourceMode::Advanced);
        let plan = plan_sources(&spec).unwrap();
        assert_eq!(plan[0].expect_count, None);
    }
}
