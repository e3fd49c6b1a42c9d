//! Run configuration (~/.config/albumsync/config.toml).
//!
//! Every key is optional; command-line flags are merged over the file, and
//! accessors fall back to built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::lrclib::LRCLIB_API_BASE;
use crate::settings::LyricSettings;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where downloads are kept between runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lrclib_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// yt-dlp binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt_dlp: Option<PathBuf>,

    /// Lyric lookup defaults, below album and track `lrc:` settings.
    #[serde(default, skip_serializing_if = "is_default_lyrics")]
    pub lyrics: LyricSettings,
}

fn is_default_lyrics(s: &LyricSettings) -> bool {
    *s == LyricSettings::default()
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::config("HOME environment variable not set"))
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        Ok(home_dir()?.join(".config").join("albumsync").join("config.toml"))
    }

    /// Load `path`, or the default location when `None`. A missing default
    /// file is an empty config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_path()?;
                if !p.exists() {
                    return Ok(Config::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| Error::from(e).context(path.display()))?;
        Self::from_toml(&content).map_err(|e| e.context(path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.lyrics.validate().map_err(|e| e.context("[lyrics]"))?;
        Ok(config)
    }

    /// Merge `other` over this config; every value it sets wins.
    pub fn merge(&mut self, other: &Config) {
        if other.cache_dir.is_some() {
            self.cache_dir = other.cache_dir.clone();
        }
        if other.lrclib_url.is_some() {
            self.lrclib_url = other.lrclib_url.clone();
        }
        if other.http_timeout_secs.is_some() {
            self.http_timeout_secs = other.http_timeout_secs;
        }
        if other.socket_timeout_secs.is_some() {
            self.socket_timeout_secs = other.socket_timeout_secs;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent.clone();
        }
        if other.yt_dlp.is_some() {
            self.yt_dlp = other.yt_dlp.clone();
        }
        self.lyrics = self.lyrics.merge(&other.lyrics);
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(home_dir()?.join(".cache").join("albumsync")),
        }
    }

    pub fn lrclib_url(&self) -> &str {
        self.lrclib_url.as_deref().unwrap_or(LRCLIB_API_BASE)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("albumsync/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn yt_dlp(&self) -> PathBuf {
        self.yt_dlp.clone().unwrap_or_else(|| PathBuf::from("yt-dlp"))
    }

    /// Print the effective settings.
    pub fn print(&self, title: &str) {
        println!("{}:", title);
        match self.cache_dir() {
            Ok(dir) => println!("  Cache dir:        {}", dir.display()),
            Err(e) => println!("  Cache dir:        ({})", e),
        }
        println!("  lrclib API:       {}", self.lrclib_url());
        println!("  HTTP timeout:     {}s", self.http_timeout().as_secs());
        println!("  Socket timeout:   {}s", self.socket_timeout().as_secs());
        match self.workers {
            Some(n) => println!("  Workers:          {}", n),
            None => println!("  Workers:          auto"),
        }
        println!("  yt-dlp:           {}", self.yt_dlp().display());
        if !is_default_lyrics(&self.lyrics) {
            if let Ok(text) = toml::to_string(&self.lyrics) {
                println!("  Lyric defaults:");
                for line in text.lines() {
                    println!("    {}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.lrclib_url(), "https://lrclib.net/api");
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.yt_dlp(), PathBuf::from("yt-dlp"));
        assert!(config.user_agent().starts_with("albumsync/"));
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
cache_dir = "/var/cache/albums"
lrclib_url = "http://localhost:3000/api"
http_timeout_secs = 5
workers = 4

[lyrics]
duration_slop = 4.0
try_search = false
offset = -0.25
"#,
        )
        .unwrap();
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/var/cache/albums"));
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.socket_timeout(), Duration::from_secs(30));
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.lyrics.duration_slop, Some(4.0));
        assert_eq!(config.lyrics.try_search, Some(false));
        assert_eq!(config.lyrics.offset, Some(Timestamp::from_millis(-250)));
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_lyrics() {
        assert!(Config::from_toml("colour = \"red\"").is_err());
        let err = Config::from_toml("[lyrics]\noffset = 1\nstart = 2\n").unwrap_err();
        assert!(err.to_string().contains("[lyrics]"), "{}", err);
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config::from_toml("workers = 2\nlrclib_url = \"http://a\"\n[lyrics]\nexpect = true\n").unwrap();
        let flags = Config {
            workers: Some(8),
            lyrics: LyricSettings {
                duration_slop: Some(1.0),
                ..Default::default()
            },
            ..Default::default()
        };
        base.merge(&flags);
        assert_eq!(base.workers, Some(8));
        assert_eq!(base.lrclib_url(), "http://a");
        assert_eq!(base.lyrics.expect, Some(true));
        assert_eq!(base.lyrics.duration_slop, Some(1.0));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "socket_timeout_secs = 12\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.socket_timeout(), Duration::from_secs(12));
    }
}
