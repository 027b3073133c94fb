use crate::error::{ConvertError, Result};
use crate::models::{RawRow, SongRecord};
use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};

const EXPORT_EXTENSION: &str = "csv";
const MIN_FIELDS: usize = 6;
const MAX_FIELDS: usize = 7;

/// Lists the `.csv` files directly inside `dir`, sorted by path.
pub fn find_csv_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_export = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION))
            .unwrap_or(false);
        if is_export {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Parses one export. The first record is discarded whatever it holds, every
/// following record maps positionally onto the seven `SongRecord` fields.
pub fn parse_export<P: AsRef<Path>>(path: P) -> Result<Vec<SongRecord>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() < MIN_FIELDS || row.len() > MAX_FIELDS {
            return Err(ConvertError::FieldCount {
                path: path.to_path_buf(),
                line: row.position().map(|p| p.line()).unwrap_or(0),
                found: row.len(),
            });
        }

        let raw: RawRow = row.deserialize(None)?;
        records.push(SongRecord::try_from(raw)?);
    }

    tracing::debug!("Parsed {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Merges every export in `dir` into one catalog, file by file.
pub fn fuse_catalog<P: AsRef<Path>>(dir: P) -> Result<Vec<SongRecord>> {
    let dir = dir.as_ref();
    let files = find_csv_files(dir)?;
    tracing::info!("Found {} CSV exports in {}", files.len(), dir.display());

    let mut catalog = Vec::new();
    for file in &files {
        catalog.extend(parse_export(file)?);
    }

    Ok(catalog)
}

/// Reads a catalog written earlier by `catalog_writer`.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<SongRecord>> {
    parse_export(path)
}
