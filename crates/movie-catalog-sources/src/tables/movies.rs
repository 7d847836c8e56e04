use super::SourceTable;
use crate::error::TableError;
use csv::StringRecord;
use std::path::Path;

pub const MOVIES_COLUMNS: [&str; 3] = ["movie_id", "title", "genres"];

const GENRE_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRow {
    pub line: u64,
    pub movie_id: i64,
    pub title: String,
    pub genres: Vec<String>,
}

/// Streaming iterator over the movies table.
pub struct MovieRows {
    table: SourceTable,
}

pub fn open_movies<P: AsRef<Path>>(path: P) -> Result<MovieRows, TableError> {
    let table = SourceTable::open(path.as_ref(), &MOVIES_COLUMNS)?;
    Ok(MovieRows { table })
}

/// Split a pipe-delimited genre list, dropping empty segments.
pub(crate) fn split_genres(raw: &str) -> Vec<String> {
    raw.split(GENRE_SEPARATOR)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

impl Iterator for MovieRows {
    type Item = Result<MovieRow, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, record) = match self.table.next_record()? {
            Ok(next) => next,
            Err(e) => return Some(Err(e)),
        };

        Some(self.parse(line, &record))
    }
}

impl MovieRows {
    fn parse(&self, line: u64, record: &StringRecord) -> Result<MovieRow, TableError> {
        let movie_id = self.table.parse_id(record, line, "movie_id")?;
        let title = self.table.required_field(record, line, "title")?.to_string();
        let genres = self
            .table
            .field(record, "genres")
            .map(split_genres)
            .unwrap_or_default();
        Ok(MovieRow {
            line,
            movie_id,
            title,
            genres,
        })
    }
}
