//! Album spec files.
//!
//! An album spec is a YAML document describing the album metadata, where its
//! audio comes from, and per-track overrides. Everything is validated up
//! front so a bad spec fails before any download starts.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::settings::LyricSettings;
use crate::timestamp::Timestamp;

/// Which fetched file a track uses: a 0-based position or an exact file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileSelector {
    Index(usize),
    Name(String),
}

impl fmt::Display for FileSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSelector::Index(i) => write!(f, "item {}", i),
            FileSelector::Name(name) => write!(f, "{:?}", name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackSpec {
    pub title: String,
    #[serde(default)]
    pub artists: Option<Vec<String>>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file: Option<FileSelector>,
    /// Expected audio length, checked against the fetched file.
    #[serde(default)]
    pub expect_duration: Option<Timestamp>,
    #[serde(default)]
    pub lrc: LyricSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumSpec {
    /// Absent for a loose collection of singles.
    #[serde(default)]
    pub album: Option<String>,
    pub album_artist: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub lrc: LyricSettings,
    /// File names each track must resolve to, in track order.
    #[serde(default)]
    pub expect_files: Option<Vec<String>>,
    pub tracks: Vec<TrackSpec>,
}

impl TrackSpec {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            artists: None,
            cover: None,
            url: None,
            file: None,
            expect_duration: None,
            lrc: LyricSettings::default(),
        }
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains(std::path::MAIN_SEPARATOR)
}

impl AlbumSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::from(e).context(path.display()))?;
        Self::from_yaml(&text).map_err(|e| e.context(path.display()))
    }

    /// Parse and validate a YAML spec.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let spec: AlbumSpec =
            serde_yaml::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(Error::config("album has no tracks"));
        }
        self.lrc.validate().map_err(|e| e.context("album lrc"))?;

        let mut titles = HashSet::new();
        for (i, track) in self.tracks.iter().enumerate() {
            if !is_bare_name(&track.title) {
                return Err(Error::config(format!(
                    "track[{}] title {:?} must be non-empty and contain no path separator",
                    i, track.title
                )));
            }
            if !titles.insert(track.title.as_str()) {
                return Err(Error::config(format!(
                    "track[{}] title {:?} is used by more than one track",
                    i, track.title
                )));
            }
            if let Some(FileSelector::Name(name)) = &track.file {
                if !is_bare_name(name) {
                    return Err(Error::config(format!(
                        "track[{}] file {:?} must be a bare file name",
                        i, name
                    )));
                }
            }
            track
                .lrc
                .validate()
                .map_err(|e| e.context(format!("track[{}] lrc", i)))?;
        }
        self.validate_lyric_layers(&LyricSettings::default())?;

        let with_file = self.tracks.iter().filter(|t| t.file.is_some()).count();
        if with_file != 0 && with_file != self.tracks.len() {
            return Err(Error::config(
                "must specify file for either every or no tracks",
            ));
        }

        if self.url.is_none() {
            if let Some(i) = self.tracks.iter().position(|t| t.url.is_none()) {
                return Err(Error::config(format!("no url for both album and track[{}]", i)));
            }
        }

        if let Some(files) = &self.expect_files {
            if files.len() != self.tracks.len() {
                return Err(Error::config(format!(
                    "expect_files lists {} names for {} tracks",
                    files.len(),
                    self.tracks.len()
                )));
            }
        }

        Ok(())
    }

    /// Check every track's lyric settings as they will be merged at run time:
    /// `defaults < album lrc < track lrc`.
    pub fn validate_lyric_layers(&self, defaults: &LyricSettings) -> Result<()> {
        for (i, track) in self.tracks.iter().enumerate() {
            defaults
                .merge(&self.lrc)
                .merge(&track.lrc)
                .validate()
                .map_err(|e| e.context(format!("track[{}] lrc (merged with defaults and album)", i)))?;
        }
        Ok(())
    }

    pub fn is_singles(&self) -> bool {
        self.album.is_none()
    }

    /// Output directory name: `Artist - Album`, or just `Artist` for singles.
    pub fn dir_name(&self) -> String {
        match &self.album {
            Some(album) => format!("{} - {}", self.album_artist, album),
            None => self.album_artist.clone(),
        }
    }

    pub fn year(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y").to_string())
    }

    pub fn track_artists(&self, track: &TrackSpec) -> Vec<String> {
        match &track.artists {
            Some(artists) if !artists.is_empty() => artists.clone(),
            _ => vec![self.album_artist.clone()],
        }
    }

    /// Album name used for tagging and lyric lookup; singles use their own title.
    pub fn album_title<'a>(&'a self, track: &'a TrackSpec) -> &'a str {
        self.album.as_deref().unwrap_or(&track.title)
    }

    pub fn cover_for<'a>(&'a self, track: &'a TrackSpec) -> Option<&'a str> {
        track.cover.as_deref().or(self.cover.as_deref())
    }
}
