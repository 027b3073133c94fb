use std::fmt;

use serde::Deserialize;

use crate::error::{ConvertError, Result};

/// One catalog entry, built from a single row of a takeout export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub duration_ms: i64,
    pub rating: i64,
    pub play_count: i64,
    // Meaning unknown; only "empty or not" is carried through.
    pub removed: bool,
}

/// The seven export columns exactly as read, before any coercion.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawRow {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub duration_ms: String,
    pub rating: String,
    pub play_count: String,
    #[serde(default)]
    pub removed: String,
}

impl SongRecord {
    /// Builds a record from its text fields. The three numeric fields must
    /// parse as integers; `removed` is true for any non-empty text.
    pub fn new(
        title: &str,
        album: &str,
        artist: &str,
        duration_ms: &str,
        rating: &str,
        play_count: &str,
        removed: &str,
    ) -> Result<Self> {
        Ok(Self {
            title: title.to_string(),
            album: album.to_string(),
            artist: artist.to_string(),
            duration_ms: parse_integer("duration_ms", duration_ms)?,
            rating: parse_integer("rating", rating)?,
            play_count: parse_integer("play_count", play_count)?,
            removed: !removed.is_empty(),
        })
    }

    /// True when a text field would break the unquoted line format.
    pub fn has_unsafe_field(&self) -> bool {
        [&self.title, &self.album, &self.artist]
            .iter()
            .any(|f| f.contains([',', '"', '\n', '\r']))
    }
}

impl TryFrom<RawRow> for SongRecord {
    type Error = ConvertError;

    fn try_from(row: RawRow) -> Result<Self> {
        SongRecord::new(
            &row.title,
            &row.album,
            &row.artist,
            &row.duration_ms,
            &row.rating,
            &row.play_count,
            &row.removed,
        )
    }
}

impl fmt::Display for SongRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.title,
            self.album,
            self.artist,
            self.duration_ms,
            self.rating,
            self.play_count,
            if self.removed { "True" } else { "" }
        )
    }
}

fn parse_integer(field: &'static str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ConvertError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}
