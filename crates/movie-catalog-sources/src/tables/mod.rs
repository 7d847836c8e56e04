//! Readers for the three CSV source tables.
//!
//! Column names are fixed. A missing required column fails the whole table;
//! a bad value fails only its row (`TableError::InvalidRow`).

mod links;
mod movies;
mod ratings;


pub use links::{load_external_ids, LINKS_COLUMNS};
pub use movies::{open_movies, MovieRow, MovieRows, MOVIES_COLUMNS};
pub use ratings::{open_ratings, RatingRow, RatingRows, RATINGS_COLUMNS};

use crate::error::TableError;
use csv::{Reader, ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A CSV file with a validated header.
pub(crate) struct SourceTable {
    path: PathBuf,
    reader: Reader<File>,
    columns: HashMap<String, usize>,
}

impl SourceTable {
    pub(crate) fn open(path: &Path, required: &[&str]) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| TableError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let headers = reader
            .headers()
            .map_err(|source| TableError::Read {
                path: path.to_path_buf(),
                line: 1,
                source,
            })?
            .clone();
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();

        let available: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        debug!("Columns in {}: {:?}", path.display(), available);

        for col in required {
            if !columns.contains_key(*col) {
                return Err(TableError::MissingColumn {
                    path: path.to_path_buf(),
                    column: col.to_string(),
                    available,
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    /// Read the next record with its line number.
    pub(crate) fn next_record(&mut self) -> Option<Result<(u64, StringRecord), TableError>> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                Some(Ok((line, record)))
            }
            Ok(false) => None,
            Err(source) => {
                let line = source.position().map(|p| p.line()).unwrap_or(0);
                Some(Err(TableError::Read {
                    path: self.path.clone(),
                    line,
                    source,
                }))
            }
        }
    }

    /// Trimmed value of a column; `None` when absent or blank.
    pub(crate) fn field<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.columns
            .get(column)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn required_field<'r>(
        &self,
        record: &'r StringRecord,
        line: u64,
        column: &str,
    ) -> Result<&'r str, TableError> {
        self.field(record, column)
            .ok_or_else(|| self.invalid_row(line, format!("missing value for '{}'", column)))
    }

    pub(crate) fn parse_id(
        &self,
        record: &StringRecord,
        line: u64,
        column: &str,
    ) -> Result<i64, TableError> {
        let raw = self.required_field(record, line, column)?;
        raw.parse::<i64>()
            .map_err(|_| self.invalid_row(line, format!("'{}' is not a valid {}", raw, column)))
    }

    pub(crate) fn invalid_row(&self, line: u64, message: String) -> TableError {
        TableError::InvalidRow {
            path: self.path.clone(),
            line,
            message,
        }
    }
}
