//! Timestamp realignment for a chosen lyric body.

use crate::error::{Error, Result};
use crate::lrc::{LyricDocument, LyricLine};
use crate::progress::log_line;
use crate::timestamp::Timestamp;

/// How to move lyric lines relative to the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Shift every line by a fixed amount.
    Offset(Timestamp),
    /// Move the first line to this time and every other line by the same delta.
    Start(Timestamp),
}

impl Correction {
    /// Build from the two mutually exclusive settings fields.
    pub fn from_settings(offset: Option<Timestamp>, start: Option<Timestamp>) -> Result<Self> {
        match (offset, start) {
            (Some(_), Some(_)) => Err(Error::config("cannot set both offset and start")),
            (Some(o), None) => Ok(Self::Offset(o)),
            (None, Some(s)) => Ok(Self::Start(s)),
            (None, None) => Ok(Self::None),
        }
    }
}

/// Shift an already parsed document. Results are clamped at zero.
pub fn shift(doc: &LyricDocument, correction: Correction) -> LyricDocument {
    let offset = match (correction, doc.first_timestamp()) {
        (Correction::None, _) | (_, None) => return doc.clone(),
        (Correction::Offset(o), _) => o,
        (Correction::Start(target), Some(first)) => target - first,
    };

    let lines = doc
        .lines
        .iter()
        .map(|l| LyricLine {
            timestamp: (l.timestamp + offset).clamp_non_negative(),
            text: l.text.clone(),
        })
        .collect();
    LyricDocument { lines }
}

/// Apply a correction to raw LRC text.
///
/// `Correction::None` returns the text untouched without parsing it. Otherwise
/// the body is parsed, shifted, rendered, and every output line re-parsed.
pub fn apply(lrc: &str, correction: Correction, scope: &str) -> Result<String> {
    if correction == Correction::None {
        return Ok(lrc.to_string());
    }

    let doc = LyricDocument::parse(lrc)?;
    let shifted = shift(&doc, correction);

    if let (Correction::Start(target), Some(first)) = (correction, doc.first_timestamp()) {
        log_line(scope, &format!("lrc offset: {}", target - first));
    }
    if let (Correction::Offset(_), Some(first)) = (correction, shifted.first_timestamp()) {
        log_line(scope, &format!("lrc start: {}", first));
    }

    let rendered = shifted.render();
    for (i, line) in rendered.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        LyricLine::parse(line).map_err(|e| e.context(format!("re-rendered line {}", i + 1)))?;
    }
    Ok(rendered)
}
