//! TLE file ingestion
//!
//! Parses text files of consecutive two-line element sets, each optionally
//! preceded by a name line. Malformed blocks are skipped with a warning; a
//! file yielding no objects at all is an error. Identifiers handed to the
//! catalog are made unique (NORAD id suffix, then a counter) since TLE name
//! lines are not guaranteed distinct.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::propagation::Catalog;
use crate::sgp4_adapter::Sgp4Propagator;

/// Errors at the TLE ingestion boundary. Fatal to loading, not to any
/// already-running pipeline.
#[derive(Debug, Error)]
pub enum TleError {
    #[error("failed to read TLE file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no valid TLEs parsed from {0}")]
    Empty(PathBuf),

    #[error("invalid element set for {name}: {reason}")]
    InvalidElements { name: String, reason: String },
}

/// One parsed TLE block, not yet bound to a propagator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleRecord {
    /// Name line content, or "UNKNOWN" when the block had no name line
    pub name: String,
    pub line1: String,
    pub line2: String,
    /// NORAD catalog number from line 1, when parseable
    pub norad_id: Option<u32>,
}

fn norad_from_line1(line1: &str) -> Option<u32> {
    // Line 1 format: "1 NNNNNC ..." where NNNNN is the catalog number.
    let field = line1.split_whitespace().nth(1)?;
    let digits: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Parse TLE text into records, skipping malformed blocks.
pub fn parse_tle_text(text: &str) -> Vec<TleRecord> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()).collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (name, line1, line2) = if lines[i].starts_with("1 ")
            && i + 1 < lines.len()
            && lines[i + 1].starts_with("2 ")
        {
            let block = ("UNKNOWN".to_string(), lines[i], lines[i + 1]);
            i += 2;
            block
        } else {
            // Assume a name line followed by the two element lines.
            if i + 2 >= lines.len() {
                warn!("trailing lines do not form a TLE block, skipping");
                break;
            }
            let block = (lines[i].trim().to_string(), lines[i + 1], lines[i + 2]);
            i += 3;
            block
        };

        if !(line1.starts_with("1 ") && line2.starts_with("2 ")) {
            warn!("skipping malformed TLE block near {name:?}");
            continue;
        }

        records.push(TleRecord {
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            norad_id: norad_from_line1(line1),
        });
    }
    records
}

/// Load and parse a TLE file.
pub fn load_tle_file(path: &Path) -> Result<Vec<TleRecord>, TleError> {
    let text = fs::read_to_string(path).map_err(|source| TleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_tle_text(&text);
    if records.is_empty() {
        return Err(TleError::Empty(path.to_path_buf()));
    }
    Ok(records)
}

/// Build a screening catalog from a TLE file.
///
/// Element sets SGP4 rejects are skipped with a warning; the file is an
/// error only if nothing loads. Duplicate names are disambiguated with the
/// NORAD id, then a running counter.
pub fn catalog_from_tle_file(path: &Path) -> Result<Catalog, TleError> {
    let records = load_tle_file(path)?;
    let mut catalog = Catalog::new();

    for record in &records {
        let propagator = match Sgp4Propagator::from_tle(&record.name, &record.line1, &record.line2)
        {
            Ok(propagator) => Arc::new(propagator),
            Err(err) => {
                warn!("skipping {}: {err}", record.name);
                continue;
            }
        };

        let mut id = record.name.clone();
        if catalog.index_of(&id).is_some() {
            if let Some(norad) = record.norad_id {
                id = format!("{id}-{norad}");
            }
        }
        let mut attempt = 1;
        while catalog.index_of(&id).is_some() {
            attempt += 1;
            id = format!("{}-{attempt}", record.name);
        }

        // Cannot fail: the id was just made unique.
        if let Err(err) = catalog.add(id, record.norad_id, propagator) {
            warn!("skipping {}: {err}", record.name);
        }
    }

    if catalog.is_empty() {
        return Err(TleError::Empty(path.to_path_buf()));
    }
    Ok(catalog)
}
