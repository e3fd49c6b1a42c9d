//! Lyric candidate selection and the per-track lyric resolution step.
//!
//! Precedence, stopping at the first hit:
//! 1. explicit id: used as returned, synced body or not
//! 2. exact match: used only if it carries a synced body
//! 3. search: closest duration first, skipping candidates without a synced body

use crate::error::{Error, Result};
use crate::lrclib::{LyricCandidate, LyricsRepository, Provenance};
use crate::postprocess;
use crate::progress::log_line;
use crate::settings::{LyricQuery, LyricSettings};

/// A lyric body ready to be written next to the audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLyrics {
    pub id: u64,
    pub provenance: Provenance,
    pub duration: f64,
    pub lrc: String,
}

pub fn select<R: LyricsRepository + ?Sized>(
    repo: &R,
    query: &LyricQuery,
) -> Result<Option<LyricCandidate>> {
    if let Some(id) = query.id {
        return repo.fetch_by_id(id).map(Some);
    }

    if query.try_exact {
        if let Some(candidate) = repo.fetch_exact(query)? {
            if candidate.has_synced() {
                return Ok(Some(candidate));
            }
        }
    }

    if query.try_search {
        let mut candidates = repo.search(query)?;
        // Stable sort: equal distances keep service order.
        candidates.sort_by(|a, b| {
            a.duration_diff(query.duration)
                .total_cmp(&b.duration_diff(query.duration))
        });
        return Ok(candidates.into_iter().find(|c| c.has_synced()));
    }

    Ok(None)
}

/// Look up, check, and realign lyrics for one track.
///
/// Absence is a normal outcome unless `expect: true` was declared. A candidate
/// whose duration is outside the tolerance is never attached: it fails the
/// track when lyrics were expected and is dropped with a warning otherwise.
pub fn resolve_lyrics<R: LyricsRepository + ?Sized>(
    repo: &R,
    settings: &LyricSettings,
    scope: &str,
) -> Result<Option<ResolvedLyrics>> {
    let query = settings.query()?;
    let correction = settings.correction()?;

    if query.expect == Some(false) {
        return Ok(None);
    }

    let expected = query.expect == Some(true);
    let chosen = select(repo, &query)?;

    let (candidate, synced) = match chosen.as_ref().and_then(|c| c.synced().map(|s| (c, s))) {
        Some(found) => found,
        None => {
            if expected {
                return Err(Error::expectation(format!(
                    "expected lyrics for {:?} by {:?} but found none",
                    query.track, query.artist
                )));
            }
            log_line(scope, "lrc: none found");
            return Ok(None);
        }
    };

    log_line(
        scope,
        &format!("lrc id: {} ({})", candidate.id, candidate.provenance),
    );

    let diff = candidate.duration_diff(query.duration);
    if diff > query.duration_slop {
        let msg = format!(
            "lrc {} duration {}s too different from audio duration {}s (slop {}s)",
            candidate.id, candidate.duration, query.duration, query.duration_slop
        );
        if expected {
            return Err(Error::expectation(msg));
        }
        log_line(scope, &format!("warning: {}, not attaching", msg));
        return Ok(None);
    }

    let lrc = postprocess::apply(synced, correction, scope)?;
    Ok(Some(ResolvedLyrics {
        id: candidate.id,
        provenance: candidate.provenance,
        duration: candidate.duration,
        lrc,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrclib::testing::{candidate, FakeRepository};
    use crate::timestamp::Timestamp;

    const LRC: &str = "[00:10.00]a\n[00:12.00]b";

    fn settings(duration: f64) -> LyricSettings {
        LyricSettings::for_track("Song", "Band", "Record", duration)
    }

    fn query(duration: f64) -> LyricQuery {
        settings(duration).query().unwrap()
    }

    #[test]
    fn test_explicit_id_wins_even_without_synced() {
        let repo = FakeRepository {
            by_id: vec![candidate(7, 100.0, None, Provenance::ById)],
            exact: Some(candidate(1, 100.0, Some(LRC), Provenance::Exact)),
            ..Default::default()
        };
        let mut q = query(100.0);
        q.id = Some(7);
        let chosen = select(&repo, &q).unwrap().unwrap();
        assert_eq!(chosen.id, 7);
        assert_eq!(repo.calls(), 1);
    }

    #[test]
    fn test_exact_with_synced_short_circuits() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 100.0, Some(LRC), Provenance::Exact)),
            results: vec![candidate(2, 100.0, Some(LRC), Provenance::Search)],
            ..Default::default()
        };
        let chosen = select(&repo, &query(100.0)).unwrap().unwrap();
        assert_eq!(chosen.provenance, Provenance::Exact);
        assert_eq!(repo.calls(), 1);
    }

    #[test]
    fn test_exact_without_synced_falls_through_to_search() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 100.0, None, Provenance::Exact)),
            results: vec![candidate(2, 103.0, Some(LRC), Provenance::Search)],
            ..Default::default()
        };
        let chosen = select(&repo, &query(100.0)).unwrap().unwrap();
        assert_eq!(chosen.id, 2);
        assert_eq!(chosen.provenance, Provenance::Search);
    }

    #[test]
    fn test_exact_without_synced_and_no_search_is_absent() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 100.0, None, Provenance::Exact)),
            ..Default::default()
        };
        let mut q = query(100.0);
        q.try_search = false;
        assert_eq!(select(&repo, &q).unwrap(), None);
    }

    #[test]
    fn test_search_prefers_closest_synced_candidate() {
        let repo = FakeRepository {
            results: vec![
                candidate(1, 150.0, Some(LRC), Provenance::Search),
                candidate(2, 100.5, None, Provenance::Search),
                candidate(3, 97.0, Some(LRC), Provenance::Search),
                candidate(4, 104.0, Some(LRC), Provenance::Search),
            ],
            ..Default::default()
        };
        let mut q = query(100.0);
        q.try_exact = false;
        let chosen = select(&repo, &q).unwrap().unwrap();
        assert_eq!(chosen.id, 3);
    }

    #[test]
    fn test_search_ties_keep_service_order() {
        let repo = FakeRepository {
            results: vec![
                candidate(5, 102.0, Some(LRC), Provenance::Search),
                candidate(6, 98.0, Some(LRC), Provenance::Search),
            ],
            ..Default::default()
        };
        let chosen = select(&repo, &query(100.0)).unwrap().unwrap();
        assert_eq!(chosen.id, 5);
    }

    #[test]
    fn test_nothing_enabled_is_absent() {
        let repo = FakeRepository::default();
        let mut q = query(100.0);
        q.try_exact = false;
        q.try_search = false;
        assert_eq!(select(&repo, &q).unwrap(), None);
        assert_eq!(repo.calls(), 0);
    }

    #[test]
    fn test_transport_error_propagates() {
        let repo = FakeRepository {
            fail_search: true,
            ..Default::default()
        };
        let err = select(&repo, &query(100.0)).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_resolve_instrumental_skips_lookup() {
        let repo = FakeRepository::default();
        let s = settings(100.0).merge(&LyricSettings {
            expect: Some(false),
            ..Default::default()
        });
        assert_eq!(resolve_lyrics(&repo, &s, "t").unwrap(), None);
        assert_eq!(repo.calls(), 0);
    }

    #[test]
    fn test_resolve_absent_is_silent_without_expectation() {
        let repo = FakeRepository::default();
        assert_eq!(resolve_lyrics(&repo, &settings(100.0), "t").unwrap(), None);
    }

    #[test]
    fn test_resolve_absent_with_expectation_fails() {
        let repo = FakeRepository::default();
        let s = settings(100.0).merge(&LyricSettings {
            expect: Some(true),
            ..Default::default()
        });
        let err = resolve_lyrics(&repo, &s, "t").unwrap_err();
        assert!(matches!(err, Error::Expectation(_)));
    }

    #[test]
    fn test_resolve_by_id_without_synced_counts_as_absent() {
        let repo = FakeRepository {
            by_id: vec![candidate(7, 100.0, None, Provenance::ById)],
            ..Default::default()
        };
        let s = settings(100.0).merge(&LyricSettings {
            id: Some(7),
            ..Default::default()
        });
        assert_eq!(resolve_lyrics(&repo, &s, "t").unwrap(), None);
    }

    #[test]
    fn test_resolve_duration_mismatch_with_expectation_fails() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 110.0, Some(LRC), Provenance::Exact)),
            ..Default::default()
        };
        let s = settings(100.0).merge(&LyricSettings {
            expect: Some(true),
            try_search: Some(false),
            ..Default::default()
        });
        let err = resolve_lyrics(&repo, &s, "t").unwrap_err();
        assert!(matches!(err, Error::Expectation(_)));
        assert!(err.to_string().contains("too different"));
    }

    #[test]
    fn test_resolve_duration_mismatch_without_expectation_is_dropped() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 110.0, Some(LRC), Provenance::Exact)),
            ..Default::default()
        };
        let s = settings(100.0).merge(&LyricSettings {
            try_search: Some(false),
            ..Default::default()
        });
        assert_eq!(resolve_lyrics(&repo, &s, "t").unwrap(), None);
    }

    #[test]
    fn test_resolve_within_slop_applies_start() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 102.0, Some(LRC), Provenance::Exact)),
            ..Default::default()
        };
        let s = settings(100.0).merge(&LyricSettings {
            expect: Some(true),
            start: Some(Timestamp::from_millis(4_000)),
            ..Default::default()
        });
        let resolved = resolve_lyrics(&repo, &s, "t").unwrap().unwrap();
        assert_eq!(resolved.id, 1);
        assert_eq!(resolved.provenance, Provenance::Exact);
        assert_eq!(resolved.lrc, "[00:04.00]a\n[00:06.00]b");
    }

    #[test]
    fn test_resolve_custom_slop() {
        let repo = FakeRepository {
            exact: Some(candidate(1, 104.0, Some(LRC), Provenance::Exact)),
            ..Default::default()
        };
        let s = settings(100.0).merge(&LyricSettings {
            expect: Some(true),
            duration_slop: Some(5.0),
            ..Default::default()
        });
        let resolved = resolve_lyrics(&repo, &s, "t").unwrap().unwrap();
        assert_eq!(resolved.lrc, LRC);
    }

    #[test]
    fn test_resolve_rejects_invalid_settings() {
        let repo = FakeRepository::default();
        let s = settings(100.0).merge(&LyricSettings {
            offset: Some(Timestamp::from_millis(1_000)),
            start: Some(Timestamp::from_millis(1_000)),
            ..Default::default()
        });
        assert!(matches!(resolve_lyrics(&repo, &s, "t"), Err(Error::Config(_))));
        assert_eq!(repo.calls(), 0);
    }
}
