//! Audio tag writing and duration probing (lofty).

use lofty::{
    AudioFile, ItemKey, ItemValue, MimeType, Picture, PictureType, Probe, Tag, TagExt, TagItem,
    TaggedFileExt,
};
use std::path::Path;

use crate::album::{AlbumSpec, TrackSpec};
use crate::cover::Cover;
use crate::error::{Error, Result};

/// Everything written into one output file's tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTags {
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_artist: String,
    pub year: Option<String>,
    /// 1-based.
    pub track_number: u32,
    pub track_total: u32,
    pub source_url: Option<String>,
    pub cover: Option<(String, Cover)>,
}

impl TrackTags {
    /// Tags for track `index` (0-based) of `album`. The cover is attached
    /// separately once fetched.
    pub fn for_track(album: &AlbumSpec, index: usize, track: &TrackSpec) -> Self {
        Self {
            title: track.title.clone(),
            artists: album.track_artists(track),
            album: album.album_title(track).to_string(),
            album_artist: album.album_artist.clone(),
            year: album.year(),
            track_number: index as u32 + 1,
            track_total: album.tracks.len() as u32,
            source_url: track.url.clone().or_else(|| album.url.clone()),
            cover: None,
        }
    }

    pub fn with_cover(mut self, url: &str, cover: Cover) -> Self {
        self.cover = Some((url.to_string(), cover));
        self
    }
}

/// Reads and writes the metadata of an output audio file.
pub trait Tagger: Send + Sync {
    /// Audio length in seconds.
    fn duration(&self, path: &Path) -> Result<f64>;

    fn tag(&self, path: &Path, tags: &TrackTags) -> Result<()>;
}

/// Writes the file's native tag format; ID3v2 for mp3.
pub struct LoftyTagger;

/// Front cover picture; the source URL goes into the description.
fn cover_picture(url: &str, cover: &Cover) -> Picture {
    Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::from_str(&cover.mime)),
        Some(url.to_string()),
        cover.data.clone(),
    )
}

impl Tagger for LoftyTagger {
    fn duration(&self, path: &Path) -> Result<f64> {
        probe_duration(path)
    }

    fn tag(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        let mut tagged_file = Probe::open(path)?.read()?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag_mut(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| Error::Tag(format!("cannot create tag for {}", path.display())))?;

        tag.insert_text(ItemKey::TrackTitle, tags.title.clone());
        let mut artists = tags.artists.iter();
        if let Some(first) = artists.next() {
            tag.insert_text(ItemKey::TrackArtist, first.clone());
        }
        for extra in artists {
            tag.push(TagItem::new(ItemKey::TrackArtist, ItemValue::Text(extra.clone())));
        }
        tag.insert_text(ItemKey::AlbumTitle, tags.album.clone());
        tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
        if let Some(year) = &tags.year {
            tag.insert_text(ItemKey::Year, year.clone());
        }
        tag.insert_text(ItemKey::TrackNumber, tags.track_number.to_string());
        tag.insert_text(ItemKey::TrackTotal, tags.track_total.to_string());
        if let Some(url) = &tags.source_url {
            tag.insert_text(ItemKey::AudioSourceUrl, url.clone());
        }
        if let Some((url, cover)) = &tags.cover {
            tag.push_picture(cover_picture(url, cover));
        }

        tag.save_to_path(path)?;
        Ok(())
    }
}

/// Audio length in seconds.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let tagged_file = Probe::open(path)?.read()?;
    Ok(tagged_file.properties().duration().as_secs_f64())
}
