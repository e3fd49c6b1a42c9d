//! lrclib.net client.
//!
//! Three lookups are used: by record id, exact match on
//! (track, artist, album, duration), and fuzzy search on (track, artist, album).
//! A 404 from the exact endpoint means "no match" and is not an error.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::memo::SingleFlight;
use crate::settings::LyricQuery;

pub const LRCLIB_API_BASE: &str = "https://lrclib.net/api";

/// Which lookup produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    ById,
    Exact,
    Search,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::ById => "by-id",
            Provenance::Exact => "exact",
            Provenance::Search => "search",
        })
    }
}

/// Raw record as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibRecord {
    id: u64,
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    artist_name: String,
    #[serde(default)]
    album_name: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LyricCandidate {
    pub id: u64,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration: f64,
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
    pub provenance: Provenance,
}

impl LyricCandidate {
    fn from_record(record: LrclibRecord, provenance: Provenance) -> Self {
        Self {
            id: record.id,
            track_name: record.track_name,
            artist_name: record.artist_name,
            album_name: record.album_name,
            duration: record.duration,
            instrumental: record.instrumental,
            plain_lyrics: record.plain_lyrics,
            synced_lyrics: record.synced_lyrics,
            provenance,
        }
    }

    /// The synced body, if present and non-empty.
    pub fn synced(&self) -> Option<&str> {
        self.synced_lyrics.as_deref().filter(|s| !s.is_empty())
    }

    pub fn has_synced(&self) -> bool {
        self.synced().is_some()
    }

    pub fn duration_diff(&self, target: f64) -> f64 {
        (self.duration - target).abs()
    }
}

// ============================================================================
// Repository trait
// ============================================================================

/// A source of lyric candidates. Transport failures propagate as errors;
/// "no exact match" is `Ok(None)`.
pub trait LyricsRepository: Send + Sync {
    fn fetch_by_id(&self, id: u64) -> Result<LyricCandidate>;

    fn fetch_exact(&self, query: &LyricQuery) -> Result<Option<LyricCandidate>>;

    fn search(&self, query: &LyricQuery) -> Result<Vec<LyricCandidate>>;
}

// ============================================================================
// HTTP client
// ============================================================================

pub struct LrclibClient {
    agent: ureq::Agent,
    base_url: String,
}

impl LrclibClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T> {
        let url = response.get_url().to_string();
        serde_json::from_reader(response.into_reader()).map_err(|e| {
            // A body that stops arriving is a network failure, not bad JSON.
            if e.is_io() {
                Error::transport(format!("reading response from {}: {}", url, e))
            } else {
                Error::internal(format!("undecodable response from {}: {}", url, e))
            }
        })
    }
}

impl LyricsRepository for LrclibClient {
    fn fetch_by_id(&self, id: u64) -> Result<LyricCandidate> {
        let response = self
            .agent
            .get(&format!("{}/get/{}", self.base_url, id))
            .call()?;
        let record: LrclibRecord = Self::decode(response)?;
        Ok(LyricCandidate::from_record(record, Provenance::ById))
    }

    fn fetch_exact(&self, query: &LyricQuery) -> Result<Option<LyricCandidate>> {
        let result = self
            .agent
            .get(&format!("{}/get", self.base_url))
            .query("track_name", &query.track)
            .query("artist_name", &query.artist)
            .query("album_name", &query.album)
            .query("duration", &(query.duration.round() as i64).to_string())
            .call();

        match result {
            Ok(response) => {
                let record: LrclibRecord = Self::decode(response)?;
                Ok(Some(LyricCandidate::from_record(record, Provenance::Exact)))
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn search(&self, query: &LyricQuery) -> Result<Vec<LyricCandidate>> {
        let response = self
            .agent
            .get(&format!("{}/search", self.base_url))
            .query("track_name", &query.track)
            .query("artist_name", &query.artist)
            .query("album_name", &query.album)
            .call()?;
        let records: Vec<LrclibRecord> = Self::decode(response)?;
        Ok(records
            .into_iter()
            .map(|r| LyricCandidate::from_record(r, Provenance::Search))
            .collect())
    }
}

// ============================================================================
// Read-through memo
// ============================================================================

/// Exact-match key. Duration is sent rounded to whole seconds, so it is keyed
/// the same way.
type ExactKey = (String, String, String, i64);
type SearchKey = (String, String, String);

/// Wraps a repository with per-request single-flight memoization, so tracks
/// that issue identical lookups hit the service once.
pub struct CachedRepository<R> {
    inner: R,
    by_id: SingleFlight<u64, LyricCandidate>,
    exact: SingleFlight<ExactKey, Option<LyricCandidate>>,
    search: SingleFlight<SearchKey, Vec<LyricCandidate>>,
}

impl<R: LyricsRepository> CachedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            by_id: SingleFlight::new(),
            exact: SingleFlight::new(),
            search: SingleFlight::new(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: LyricsRepository> LyricsRepository for CachedRepository<R> {
    fn fetch_by_id(&self, id: u64) -> Result<LyricCandidate> {
        self.by_id.get_or_try_init(&id, || self.inner.fetch_by_id(id))
    }

    fn fetch_exact(&self, query: &LyricQuery) -> Result<Option<LyricCandidate>> {
        let key = (
            query.track.clone(),
            query.artist.clone(),
            query.album.clone(),
            query.duration.round() as i64,
        );
        self.exact.get_or_try_init(&key, || self.inner.fetch_exact(query))
    }

    fn search(&self, query: &LyricQuery) -> Result<Vec<LyricCandidate>> {
        let key = (query.track.clone(), query.artist.clone(), query.album.clone());
        self.search.get_or_try_init(&key, || self.inner.search(query))
    }
}
