use crate::error::{ConvertError, Result};
use lofty::prelude::*;
use lofty::read_from_path;
use std::path::Path;

/// The tag fields used to match an audio file against a catalog record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl TrackTags {
    /// True when title, artist and album are all present.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.artist.is_some() && self.album.is_some()
    }
}

/// Reads title/artist/album from the primary tag, or the first tag found.
pub fn read_tags<P: AsRef<Path>>(path: P) -> Result<TrackTags> {
    let path = path.as_ref();
    let tagged_file = read_from_path(path).map_err(|e| ConvertError::Tags {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(TrackTags::default());
    };

    Ok(TrackTags {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
    })
}
