//! Album processing: fetch, copy, tag and attach lyrics for every track.
//!
//! Specs are loaded and planned up front (`AlbumPlan::load`), so a bad spec
//! never triggers a download. Tracks then run in parallel; a failing track is
//! recorded in the report and does not stop the others.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::album::AlbumSpec;
use crate::cover::{CoverFetcher, CoverSource};
use crate::error::{Error, Result};
use crate::fetch::{resolve_track, Downloader, FetchCache};
use crate::lrclib::{LyricsRepository, Provenance};
use crate::progress::{create_progress_bar, format_duration, is_log_only, log_line, track_scope};
use crate::selector::resolve_lyrics;
use crate::settings::LyricSettings;
use crate::source::{plan_sources, TrackSource};
use crate::tagging::{Tagger, TrackTags};

// ============================================================================
// Planning
// ============================================================================

/// A validated spec together with its track sources.
#[derive(Debug, Clone)]
pub struct AlbumPlan {
    pub spec_path: PathBuf,
    pub album: AlbumSpec,
    pub sources: Vec<TrackSource>,
}

impl AlbumPlan {
    /// `lyric_defaults` are the config-level lyric settings the pipeline will
    /// merge under each album; conflicts with them are reported here.
    pub fn load(path: &Path, lyric_defaults: &LyricSettings) -> Result<Self> {
        let album = AlbumSpec::load(path)?;
        Self::new(path, album, lyric_defaults)
    }

    pub fn new(spec_path: &Path, album: AlbumSpec, lyric_defaults: &LyricSettings) -> Result<Self> {
        album
            .validate_lyric_layers(lyric_defaults)
            .map_err(|e| e.context(spec_path.display()))?;
        let sources = plan_sources(&album).map_err(|e| e.context(spec_path.display()))?;
        Ok(Self {
            spec_path: spec_path.to_path_buf(),
            album,
            sources,
        })
    }

    /// `out/<artist> - <album>`, or `out/<artist>` for singles.
    pub fn album_dir(&self, out: &Path) -> PathBuf {
        out.join(self.album.dir_name())
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    pub path: PathBuf,
    pub duration: f64,
    /// Lyric record id and how it was found, when a `.lrc` was written.
    pub lyrics: Option<(u64, Provenance)>,
}

#[derive(Debug)]
pub struct TrackOutcome {
    pub index: usize,
    pub title: String,
    pub result: Result<TrackReport>,
}

#[derive(Debug)]
pub struct AlbumReport {
    pub dir: PathBuf,
    pub tracks: Vec<TrackOutcome>,
}

impl AlbumReport {
    pub fn failures(&self) -> impl Iterator<Item = &TrackOutcome> {
        self.tracks.iter().filter(|t| t.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The collaborators one run needs. All of them memoize, so one pipeline is
/// shared by every album of a run.
pub struct Pipeline<D, S, R, T> {
    pub fetcher: FetchCache<D>,
    pub covers: CoverFetcher<S>,
    pub lyrics: R,
    pub tagger: T,
    /// Config-file lyric defaults, the widest settings layer.
    pub lyric_defaults: LyricSettings,
}

impl<D, S, R, T> Pipeline<D, S, R, T>
where
    D: Downloader,
    S: CoverSource,
    R: LyricsRepository,
    T: Tagger,
{
    pub fn process_album(&self, plan: &AlbumPlan, album_dir: &Path) -> Result<AlbumReport> {
        let album = &plan.album;
        let scope = album.dir_name();
        let start = Instant::now();

        fs::create_dir_all(album_dir).map_err(|e| Error::from(e).context(album_dir.display()))?;

        if let Some(url) = &album.cover {
            let cover = self.covers.fetch(url).map_err(|e| e.context("album cover"))?;
            let ext = cover.extension().ok_or_else(|| {
                Error::internal(format!("cover {} has unsupported type {}", url, cover.mime))
            })?;
            fs::write(album_dir.join(format!("cover.{}", ext)), &cover.data)?;
        }

        let pb = create_progress_bar(album.tracks.len() as u64, &scope);
        let tracks: Vec<TrackOutcome> = (0..album.tracks.len())
            .into_par_iter()
            .map(|index| {
                let title = album.tracks[index].title.clone();
                let result = self.process_track(plan, index, album_dir);
                if let Err(e) = &result {
                    log_line(&track_scope(index, &title), &format!("failed: {}", e));
                }
                pb.inc(1);
                TrackOutcome { index, title, result }
            })
            .collect();

        let report = AlbumReport {
            dir: album_dir.to_path_buf(),
            tracks,
        };
        let failed = report.failures().count();
        let msg = format!(
            "{}: {} tracks, {} failed in {}",
            scope,
            report.tracks.len(),
            failed,
            format_duration(start.elapsed())
        );
        pb.finish_with_message(msg.clone());
        if is_log_only() {
            log_line("album", &msg);
        }
        Ok(report)
    }

    fn process_track(&self, plan: &AlbumPlan, index: usize, album_dir: &Path) -> Result<TrackReport> {
        let album = &plan.album;
        let track = &album.tracks[index];
        let source = &plan.sources[index];
        let scope = track_scope(index, &track.title);

        let inventory = self.fetcher.fetch(&source.url)?;
        let fetched = resolve_track(source, &inventory)?;

        let fetched_name = fetched
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if let Some(expected) = album.expect_files.as_ref().and_then(|f| f.get(index)) {
            if fetched_name != expected {
                return Err(Error::expectation(format!(
                    "{} resolved to {:?}, expected {:?}",
                    source.selector, fetched_name, expected
                )));
            }
        }

        let ext = fetched.extension().and_then(|e| e.to_str()).unwrap_or("mp3");
        let dest = album_dir.join(format!("{}.{}", track.title, ext));
        fs::copy(&fetched, &dest).map_err(|e| Error::from(e).context(dest.display()))?;
        log_line(&scope, &format!("{} -> {}", fetched_name, dest.display()));

        let duration = self.tagger.duration(&dest)?;

        let artist = album.track_artists(track).join(", ");
        let settings = self
            .lyric_defaults
            .merge(&LyricSettings::for_track(
                &track.title,
                &artist,
                album.album_title(track),
                duration,
            ))
            .merge(&album.lrc)
            .merge(&track.lrc);

        if let Some(expected) = track.expect_duration {
            let diff = (expected.as_secs_f64() - duration).abs();
            if diff > settings.duration_slop() {
                return Err(Error::expectation(format!(
                    "audio is {:.2}s long, expected {} (slop {}s)",
                    duration,
                    expected,
                    settings.duration_slop()
                )));
            }
        }

        let mut tags = TrackTags::for_track(album, index, track);
        if let Some(url) = album.cover_for(track) {
            let cover = self.covers.fetch(url).map_err(|e| e.context("track cover"))?;
            tags = tags.with_cover(url, cover);
        }
        self.tagger.tag(&dest, &tags)?;

        let lyrics = match resolve_lyrics(&self.lyrics, &settings, &scope)? {
            Some(resolved) => {
                let lrc_path = album_dir.join(format!("{}.lrc", track.title));
                fs::write(&lrc_path, &resolved.lrc)?;
                Some((resolved.id, resolved.provenance))
            }
            None => None,
        };

        Ok(TrackReport {
            path: dest,
            duration,
            lyrics,
        })
    }
}
