//! Cover art download.

use std::io::Read;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::memo::SingleFlight;

/// Upper bound on a cover image body.
const MAX_COVER_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub mime: String,
    pub data: Vec<u8>,
}

impl Cover {
    /// File extension for the image type, without the dot.
    pub fn extension(&self) -> Option<&'static str> {
        mime_extension(&self.mime)
    }
}

pub fn mime_extension(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

pub trait CoverSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Cover>;
}

pub struct HttpCoverSource {
    agent: ureq::Agent,
}

impl HttpCoverSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .user_agent(user_agent)
                .build(),
        }
    }
}

impl CoverSource for HttpCoverSource {
    fn fetch(&self, url: &str) -> Result<Cover> {
        let response = self.agent.get(url).call()?;
        let mime = response
            .header("content-type")
            .ok_or_else(|| Error::internal(format!("cover {} has no content type", url)))?
            .to_string();

        let mut data = Vec::new();
        response
            .into_reader()
            .take(MAX_COVER_BYTES)
            .read_to_end(&mut data)
            .map_err(|e| Error::transport(format!("reading cover {}: {}", url, e)))?;
        Ok(Cover { mime, data })
    }
}

/// Fetches every cover URL once; album and track covers are usually the same.
pub struct CoverFetcher<S> {
    source: S,
    covers: SingleFlight<String, Cover>,
}

impl<S: CoverSource> CoverFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            covers: SingleFlight::new(),
        }
    }

    pub fn fetch(&self, url: &str) -> Result<Cover> {
        self.covers
            .get_or_try_init(&url.to_string(), || self.source.fetch(url))
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
