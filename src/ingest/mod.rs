//! Catalog ingestion.
//!
//! Reads the raw anime catalog, checks that the columns needed for indexing
//! exist, and collapses each row into one canonical text value. Rows that
//! are malformed or lack a required value are skipped; nothing is invented
//! to fill the gaps.

use crate::error::{AnirecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Header of the canonical intermediate file.
pub const CANONICAL_COLUMN: &str = "combined";

/// Required columns, in the lowercase form headers are matched against.
const REQUIRED_COLUMNS: [&str; 3] = ["name", "genres", "synopsis"];

/// Known misspellings and their canonical column.
const COLUMN_ALIASES: [(&str, &str); 1] = [("sypnopsis", "synopsis")];

/// One catalog row before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: Option<String>,
    pub genres: Option<String>,
    pub synopsis: Option<String>,
}

impl RawRecord {
    /// Render the canonical text, or `None` when a required value is missing.
    pub fn canonical_text(&self) -> Option<String> {
        let name = present(&self.name)?;
        let synopsis = present(&self.synopsis)?;
        let genres = present(&self.genres)?;
        Some(format!(
            "Title: {} Overview: {} Genre: {} ",
            name, synopsis, genres
        ))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A catalog item reduced to the single text field that gets indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Position in the ingested sequence; used as the source identity.
    pub index: usize,
    /// `Title: {name} Overview: {synopsis} Genre: {genres} `
    pub text: String,
}

impl CanonicalRecord {
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }

    /// Title segment of the canonical text, if it has the usual layout.
    pub fn title(&self) -> Option<&str> {
        let rest = self.text.strip_prefix("Title: ")?;
        rest.split(" Overview: ").next()
    }
}

/// Outcome of reading a raw catalog.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Canonical records, in source order.
    pub records: Vec<CanonicalRecord>,
    /// Rows dropped for missing values.
    pub skipped_missing: usize,
    /// Rows dropped because they could not be parsed.
    pub skipped_malformed: usize,
}

impl IngestOutcome {
    /// Total rows that did not make it into the catalog.
    pub fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_malformed
    }
}

/// Column positions after alias normalization.
struct ColumnMap {
    name: usize,
    genres: usize,
    synopsis: usize,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            positions
                .entry(header.trim().trim_start_matches('\u{feff}').to_lowercase())
                .or_insert(i);
        }

        for (alias, canonical) in COLUMN_ALIASES {
            if !positions.contains_key(canonical) {
                if let Some(pos) = positions.get(alias).copied() {
                    debug!("Renaming column '{}' to '{}'", alias, canonical);
                    positions.insert(canonical.to_string(), pos);
                }
            }
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !positions.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(AnirecError::Schema(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            name: positions["name"],
            genres: positions["genres"],
            synopsis: positions["synopsis"],
        })
    }

    fn raw_record(&self, row: &csv::StringRecord) -> RawRecord {
        let field = |i: usize| row.get(i).map(str::to_string);
        RawRecord {
            name: field(self.name),
            genres: field(self.genres),
            synopsis: field(self.synopsis),
        }
    }
}

/// Read a raw catalog from any reader.
///
/// Fails with a schema error before producing anything when a required
/// column is absent.
pub fn read_catalog<R: Read>(reader: R) -> Result<IngestOutcome> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut outcome = IngestOutcome::default();
    for (line, row) in csv_reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed row {}: {}", line + 2, e);
                outcome.skipped_malformed += 1;
                continue;
            }
        };

        match columns.raw_record(&row).canonical_text() {
            Some(text) => {
                let index = outcome.records.len();
                outcome.records.push(CanonicalRecord::new(index, text));
            }
            None => outcome.skipped_missing += 1,
        }
    }

    Ok(outcome)
}

/// Write canonical records as a single-column CSV, replacing any existing file.
pub fn write_canonical(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([CANONICAL_COLUMN])?;
    for record in records {
        writer.write_record([record.text.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Load the canonical intermediate written by [`write_canonical`].
#[instrument]
pub fn load_canonical(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == CANONICAL_COLUMN)
        .ok_or_else(|| {
            AnirecError::Schema(format!(
                "{} has no '{}' column",
                path.display(),
                CANONICAL_COLUMN
            ))
        })?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(text) = row.get(column).filter(|t| !t.trim().is_empty()) {
            records.push(CanonicalRecord::new(records.len(), text.to_string()));
        }
    }

    debug!("Loaded {} canonical records", records.len());
    Ok(records)
}

/// Turns the raw catalog file into the canonical intermediate file.
pub struct DocumentIngestor {
    raw_path: PathBuf,
    canonical_path: PathBuf,
}

impl DocumentIngestor {
    /// Create an ingestor for the given input and output locations.
    pub fn new(raw_path: impl Into<PathBuf>, canonical_path: impl Into<PathBuf>) -> Self {
        Self {
            raw_path: raw_path.into(),
            canonical_path: canonical_path.into(),
        }
    }

    /// Read, validate and canonicalize the catalog, then persist the result.
    #[instrument(skip(self), fields(raw = %self.raw_path.display()))]
    pub fn ingest(&self) -> Result<IngestOutcome> {
        let file = std::fs::File::open(&self.raw_path).map_err(|e| {
            AnirecError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open catalog {}: {}", self.raw_path.display(), e),
            ))
        })?;

        let outcome = read_catalog(file)?;

        if outcome.skipped() > 0 {
            warn!(
                "Skipped {} rows ({} missing values, {} malformed)",
                outcome.skipped(),
                outcome.skipped_missing,
                outcome.skipped_malformed
            );
        }

        write_canonical(&self.canonical_path, &outcome.records)?;
        info!(
            "Wrote {} canonical records to {}",
            outcome.records.len(),
            self.canonical_path.display()
        );

        Ok(outcome)
    }
}
