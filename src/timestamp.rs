//! LRC timestamp codec.
//!
//! A timestamp is written `MM:SS.CC` (minutes, seconds, hundredths), with an
//! optional leading `-` for the signed offsets used in lyric settings.
//! Internally it is a signed millisecond count; formatting truncates to
//! hundredths.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use crate::error::{Error, Result};

static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-)?(\d{2,}):(\d{2})\.(\d{2})$").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { millis: 0 };

    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            millis: (secs * 1000.0).round() as i64,
        }
    }

    pub fn as_millis(self) -> i64 {
        self.millis
    }

    pub fn as_secs_f64(self) -> f64 {
        self.millis as f64 / 1000.0
    }

    pub fn is_negative(self) -> bool {
        self.millis < 0
    }

    /// Clamp at zero; lyric lines never carry negative times.
    pub fn clamp_non_negative(self) -> Self {
        self.max(Self::ZERO)
    }

    /// Parse `[-]MM:SS.CC`.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = TIMESTAMP
            .captures(text)
            .ok_or_else(|| Error::internal(format!("malformed timestamp {:?}", text)))?;

        let field = |i: usize| -> Result<i64> {
            caps[i]
                .parse::<i64>()
                .map_err(|_| Error::internal(format!("timestamp field out of range in {:?}", text)))
        };
        let minutes = field(2)?;
        let seconds = field(3)?;
        let hundredths = field(4)?;
        if seconds >= 60 {
            return Err(Error::internal(format!(
                "timestamp {:?} has {} seconds",
                text, seconds
            )));
        }

        let magnitude = minutes
            .checked_mul(60_000)
            .and_then(|m| m.checked_add(seconds * 1000 + hundredths * 10))
            .ok_or_else(|| Error::internal(format!("timestamp {:?} out of range", text)))?;
        let millis = if caps.get(1).is_some() {
            -magnitude
        } else {
            magnitude
        };
        Ok(Self { millis })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.millis.unsigned_abs();
        let minutes = magnitude / 60_000;
        let seconds = (magnitude % 60_000) / 1000;
        let hundredths = (magnitude % 1000) / 10;
        write!(
            f,
            "{}{:02}:{:02}.{:02}",
            if self.is_negative() { "-" } else { "" },
            minutes,
            seconds,
            hundredths
        )
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp::from_millis(self.millis.saturating_add(rhs.millis))
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp::from_millis(self.millis.saturating_sub(rhs.millis))
    }
}

impl Neg for Timestamp {
    type Output = Timestamp;

    fn neg(self) -> Timestamp {
        Timestamp::from_millis(self.millis.saturating_neg())
    }
}

// ============================================================================
// Serde: seconds as a number, or the `MM:SS.CC` text form
// ============================================================================

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number of seconds or a MM:SS.CC string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Timestamp, E> {
        Ok(Timestamp::from_secs_f64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Timestamp, E> {
        Ok(Timestamp::from_millis(v * 1000))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Timestamp, E> {
        Ok(Timestamp::from_millis(v as i64 * 1000))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Timestamp, E> {
        Timestamp::parse(v.trim()).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}
