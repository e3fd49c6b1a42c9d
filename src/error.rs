//! Error taxonomy shared by every stage of the pipeline.
//!
//! The variants mirror how a failure should be handled by the driver:
//! - `Config`: the album spec is malformed or contradicts itself. Raised
//!   before any network I/O.
//! - `Expectation`: something the album spec declared (file count, file name,
//!   lyric existence, duration) did not match what was observed.
//! - `Transport`: network or downloader failure. Retryable by the caller.
//! - `Internal`: a collaborator returned data that breaks an invariant we
//!   rely on (e.g. an LRC line that does not parse).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("expectation failed: {0}")]
    Expectation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal consistency error: {0}")]
    Internal(String),

    #[error("tagging error: {0}")]
    Tag(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn expectation(msg: impl Into<String>) -> Self {
        Self::Expectation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Prefix the message with where the failure happened, keeping the variant.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            Self::Config(m) => Self::Config(format!("{}: {}", ctx, m)),
            Self::Expectation(m) => Self::Expectation(format!("{}: {}", ctx, m)),
            Self::Transport(m) => Self::Transport(format!("{}: {}", ctx, m)),
            Self::Internal(m) => Self::Internal(format!("{}: {}", ctx, m)),
            Self::Tag(m) => Self::Tag(format!("{}: {}", ctx, m)),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx, e))),
        }
    }

    /// True for failures worth retrying on a later run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                Self::Transport(format!("HTTP {} from {}", code, response.get_url()))
            }
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

impl From<lofty::error::LoftyError> for Error {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::Tag(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(Error::transport("timed out").is_retryable());
        assert!(!Error::config("bad").is_retryable());
        assert!(!Error::expectation("count").is_retryable());
        assert!(!Error::internal("lrc").is_retryable());
    }

    #[test]
    fn test_context_keeps_variant() {
        let err = Error::config("cannot set both offset and start").context("track[2] lrc");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "configuration error: track[2] lrc: cannot set both offset and start"
        );
    }

    #[test]
    fn test_display_includes_category() {
        let err = Error::expectation("expected to fetch 4 from X, got 3");
        assert_eq!(
            err.to_string(),
            "expectation failed: expected to fetch 4 from X, got 3"
        );
    }
}
