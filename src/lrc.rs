//! Synced lyric documents in LRC form: one `[MM:SS.CC]text` entry per line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;

static LRC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]*)\](.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub timestamp: Timestamp,
    pub text: String,
}

impl LyricLine {
    /// Parse a single `[MM:SS.CC]text` line. Negative stamps are rejected.
    pub fn parse(line: &str) -> Result<Self> {
        let caps = LRC_LINE
            .captures(line)
            .ok_or_else(|| Error::internal(format!("not an LRC line: {:?}", line)))?;
        let timestamp = Timestamp::parse(&caps[1])?;
        if timestamp.is_negative() {
            return Err(Error::internal(format!("negative LRC timestamp: {:?}", line)));
        }
        Ok(Self {
            timestamp,
            text: caps[2].to_string(),
        })
    }
}

impl fmt::Display for LyricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.timestamp, self.text)
    }
}

/// Ordered lyric lines. Order is kept as given; timestamps need not be sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricDocument {
    pub lines: Vec<LyricLine>,
}

impl LyricDocument {
    /// Parse a synced lyric body. Blank lines are skipped; any other line that
    /// does not parse is an error naming its 1-based line number.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (i, raw) in text.split('\n').enumerate() {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }
            let line = LyricLine::parse(raw)
                .map_err(|e| e.context(format!("line {}", i + 1)))?;
            lines.push(line);
        }
        Ok(Self { lines })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.lines.first().map(|l| l.timestamp)
    }

    /// Render back to LRC text, lines joined by `\n`.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
