//! Fetching audio for a source URL and checking what came back.
//!
//! Downloads land in a per-URL cache directory as `NN - title.mp3`. The
//! validator only looks at that directory listing; it never talks to the
//! network.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::album::FileSelector;
use crate::error::{Error, Result};
use crate::memo::SingleFlight;
use crate::progress::{create_spinner, format_duration, is_log_only, log_line};
use crate::source::TrackSource;

/// `NN - anything`, where NN is the downloader's sequence number.
static ITEM_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+) - ").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub index: u32,
    pub path: PathBuf,
}

/// The audio items found in one fetched directory.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub dir: PathBuf,
    pub items: Vec<FetchedItem>,
}

impl Inventory {
    /// List the `.mp3` files in `dir`. Anything else (thumbnails, partial
    /// files) is ignored.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut items = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::from(e).context(dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| Error::internal(format!("non-UTF-8 file name in {}", dir.display())))?;
            let index = ITEM_PREFIX
                .captures(name)
                .and_then(|caps| caps[1].parse::<u32>().ok())
                .ok_or_else(|| {
                    Error::internal(format!("fetched file {} has no sequence prefix", path.display()))
                })?;
            items.push(FetchedItem { index, path });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            items,
        })
    }
}

/// Pick the file for one track out of a fetched directory.
///
/// The items must be numbered exactly `1..=N`; any gap or duplicate means the
/// download is incomplete or the directory was tampered with.
pub fn resolve_track(source: &TrackSource, inventory: &Inventory) -> Result<PathBuf> {
    let mut items: Vec<&FetchedItem> = inventory.items.iter().collect();
    items.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));

    for (position, item) in items.iter().enumerate() {
        let expected = position as u32 + 1;
        if item.index != expected {
            return Err(Error::expectation(format!(
                "skipped track index {} (found {} next)",
                expected,
                item.path.display()
            )));
        }
    }

    if let Some(count) = source.expect_count {
        if count != items.len() {
            return Err(Error::expectation(format!(
                "expected to fetch {} from {}, got {}",
                count,
                source.url,
                items.len()
            )));
        }
    }

    match &source.selector {
        FileSelector::Index(i) => items.get(*i).map(|item| item.path.clone()).ok_or_else(|| {
            Error::expectation(format!(
                "url {} yielded {} files, no file at index {}",
                source.url,
                items.len(),
                i
            ))
        }),
        FileSelector::Name(name) => {
            let path = inventory.dir.join(name);
            if path.exists() {
                Ok(path)
            } else {
                Err(Error::expectation(format!(
                    "url {:?} did not yield file {:?}",
                    source.url, name
                )))
            }
        }
    }
}

// ============================================================================
// Downloading
// ============================================================================

pub trait Downloader: Send + Sync {
    /// Download everything behind `url` into the (existing, empty) `dest`.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Shells out to yt-dlp, extracting mp3 audio plus thumbnails.
pub struct YtDlp {
    pub binary: PathBuf,
    pub socket_timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, socket_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            socket_timeout,
        }
    }

    /// Output template: the directory is escaped for yt-dlp's printf syntax.
    pub fn output_template(dest: &Path) -> String {
        format!(
            "{}/%(autonumber)02d - %(title)s.%(ext)s",
            dest.display().to_string().replace('%', "%%")
        )
    }
}

impl Downloader for YtDlp {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-f", "bestaudio/best", "-x", "--audio-format", "mp3", "--write-thumbnail"])
            .arg("--socket-timeout")
            .arg(self.socket_timeout.as_secs().max(1).to_string())
            .arg("-o")
            .arg(Self::output_template(dest))
            .arg(url);
        if is_log_only() {
            cmd.arg("--quiet");
        }

        let status = cmd.status().map_err(|e| {
            Error::transport(format!("failed to run {}: {}", self.binary.display(), e))
        })?;
        if !status.success() {
            return Err(Error::transport(format!(
                "{} exited with {} for {}",
                self.binary.display(),
                status,
                url
            )));
        }
        Ok(())
    }
}

/// Cache directory name for a URL.
pub fn cache_key(url: &str) -> String {
    url.replace('/', "%")
}

/// Downloads each URL at most once per run and reuses directories left by
/// earlier runs.
pub struct FetchCache<D> {
    cache_dir: PathBuf,
    downloader: D,
    fetched: SingleFlight<String, PathBuf>,
}

impl<D: Downloader> FetchCache<D> {
    pub fn new(cache_dir: impl Into<PathBuf>, downloader: D) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            downloader,
            fetched: SingleFlight::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Fetch (or reuse) `url` and list what it produced.
    pub fn fetch(&self, url: &str) -> Result<Inventory> {
        let dir = self
            .fetched
            .get_or_try_init(&url.to_string(), || self.download_once(url))?;
        Inventory::scan(&dir)
    }

    fn download_once(&self, url: &str) -> Result<PathBuf> {
        let dir = self.cache_dir.join(cache_key(url));
        if dir.is_dir() {
            return Ok(dir);
        }

        // Only a completed download is ever visible under the final name.
        let partial = self.cache_dir.join(format!("{}.partial", cache_key(url)));
        if partial.exists() {
            fs::remove_dir_all(&partial)?;
        }
        fs::create_dir_all(&partial)?;

        let spinner = create_spinner(&format!("Fetching {}", url));
        let started = std::time::Instant::now();
        let result = self.downloader.download(url, &partial);
        spinner.finish_and_clear();

        match result {
            Ok(()) => {
                fs::rename(&partial, &dir)?;
                log_line(
                    "fetch",
                    &format!("{} in {}", url, format_duration(started.elapsed())),
                );
                Ok(dir)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&partial);
                Err(e.context(url))
            }
        }
    }
}
