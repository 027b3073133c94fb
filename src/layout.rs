use crate::models::SongRecord;
use std::path::{Path, PathBuf};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

// Characters that are invalid in a path component on at least one platform
const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Decodes the HTML entities the takeout exports embed in text fields
/// (`&#39;`, `&#x27;`, `&amp;`, `&eacute;` ...).
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Makes `text` usable as a single path component: entities decoded,
/// reserved and control characters replaced with `_`, trailing dots and
/// spaces trimmed. Returns `fallback` when nothing usable is left.
pub fn sanitize_component(text: &str, fallback: &str) -> String {
    let cleaned: String = decode_entities(text)
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Key used to compare export text with file names and tags.
pub fn normalize_key(text: &str) -> String {
    sanitize_component(text, "").to_lowercase()
}

/// `<library>/<artist>/<album>/<file name>` for a record's audio file.
pub fn destination_for(library_dir: &Path, record: &SongRecord, source: &Path) -> PathBuf {
    let artist = sanitize_component(&record.artist, UNKNOWN_ARTIST);
    let album = sanitize_component(&record.album, UNKNOWN_ALBUM);

    let mut destination = library_dir.join(artist).join(album);
    if let Some(file_name) = source.file_name() {
        destination.push(file_name);
    }
    destination
}
