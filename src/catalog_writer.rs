use crate::error::Result;
use crate::models::SongRecord;
use std::fs;
use std::path::Path;

/// Name of the merged catalog, written to the working directory by default.
pub const CATALOG_FILE_NAME: &str = "main_csv.csv";

/// Documentary only: the column names do not match the record field names,
/// readers skip this line instead of mapping by it.
pub const CATALOG_HEADER: &str = "Title,Album,Artist,Duration (ms),Rating,Play Count,Removed";

/// Header plus one line per record, newline separated, no trailing newline.
pub fn render_catalog(records: &[SongRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CATALOG_HEADER.to_string());
    lines.extend(records.iter().map(|record| record.to_string()));
    lines.join("\n")
}

/// Writes the catalog to `path`, replacing whatever was there.
pub fn write_catalog<P: AsRef<Path>>(records: &[SongRecord], path: P) -> Result<()> {
    let path = path.as_ref();

    for record in records.iter().filter(|r| r.has_unsafe_field()) {
        tracing::warn!(
            "'{}' by '{}' contains a comma, quote or line break and will not read back cleanly",
            record.title,
            record.artist
        );
    }

    fs::write(path, render_catalog(records))?;
    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
