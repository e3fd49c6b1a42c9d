//! albumsync - build tagged, lyric-synced album directories from YAML specs.

pub mod album;
pub mod config;
pub mod cover;
pub mod error;
pub mod fetch;
pub mod lrc;
pub mod lrclib;
pub mod memo;
pub mod pipeline;
pub mod postprocess;
pub mod progress;
pub mod safety;
pub mod selector;
pub mod settings;
pub mod source;
pub mod tagging;
pub mod timestamp;

pub use error::{Error, Result};
pub use fetch::resolve_track;
pub use selector::resolve_lyrics;
pub use source::plan_sources;
