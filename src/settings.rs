//! Layered lyric lookup settings.
//!
//! Every field is optional. Layers are merged field by field with the
//! narrowest explicit setter winning:
//! built-in defaults < config file < values derived from the track <
//! album `lrc:` < track `lrc:`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::postprocess::Correction;
use crate::timestamp::Timestamp;

/// Default tolerance between lyric and audio durations, in seconds.
pub const DEFAULT_DURATION_SLOP: f64 = 2.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LyricSettings {
    /// `true`: lyrics must be found. `false`: instrumental, skip the lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect: Option<bool>,

    /// lrclib.net record id to use instead of searching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_exact: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_search: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Target duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// How far (seconds) a lyric duration may drift from `duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_slop: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
}

/// Fully resolved lookup parameters for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricQuery {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub duration: f64,
    pub duration_slop: f64,
    pub try_exact: bool,
    pub try_search: bool,
    pub id: Option<u64>,
    pub expect: Option<bool>,
}

impl LyricSettings {
    /// Settings a track contributes before any `lrc:` overrides.
    pub fn for_track(track: &str, artist: &str, album: &str, duration: f64) -> Self {
        Self {
            track: Some(track.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Merge `narrower` over `self`: every field it sets wins.
    pub fn merge(&self, narrower: &LyricSettings) -> LyricSettings {
        fn pick<T: Clone>(wide: &Option<T>, narrow: &Option<T>) -> Option<T> {
            narrow.clone().or_else(|| wide.clone())
        }

        LyricSettings {
            expect: pick(&self.expect, &narrower.expect),
            id: pick(&self.id, &narrower.id),
            try_exact: pick(&self.try_exact, &narrower.try_exact),
            try_search: pick(&self.try_search, &narrower.try_search),
            track: pick(&self.track, &narrower.track),
            artist: pick(&self.artist, &narrower.artist),
            album: pick(&self.album, &narrower.album),
            duration: pick(&self.duration, &narrower.duration),
            duration_slop: pick(&self.duration_slop, &narrower.duration_slop),
            offset: pick(&self.offset, &narrower.offset),
            start: pick(&self.start, &narrower.start),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_some() && self.expect == Some(false) {
            return Err(Error::config("instrumental track cannot have id set"));
        }
        if self.offset.is_some() && self.start.is_some() {
            return Err(Error::config("cannot set both offset and start"));
        }
        if let Some(slop) = self.duration_slop {
            if slop.is_nan() || slop < 0.0 {
                return Err(Error::config(format!("duration_slop must be >= 0, got {}", slop)));
            }
        }
        Ok(())
    }

    pub fn duration_slop(&self) -> f64 {
        self.duration_slop.unwrap_or(DEFAULT_DURATION_SLOP)
    }

    pub fn correction(&self) -> Result<Correction> {
        Correction::from_settings(self.offset, self.start)
    }

    pub fn query(&self) -> Result<LyricQuery> {
        self.validate()?;
        Ok(LyricQuery {
            track: self.track.clone().unwrap_or_default(),
            artist: self.artist.clone().unwrap_or_default(),
            album: self.album.clone().unwrap_or_default(),
            duration: self.duration.unwrap_or(0.0),
            duration_slop: self.duration_slop(),
            try_exact: self.try_exact.unwrap_or(true),
            try_search: self.try_search.unwrap_or(true),
            id: self.id,
            expect: self.expect,
        })
    }
}
