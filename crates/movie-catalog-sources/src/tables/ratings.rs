use super::SourceTable;
use crate::error::TableError;
use csv::StringRecord;
use movie_catalog_models::Rating;
use std::path::Path;

pub const RATINGS_COLUMNS: [&str; 3] = ["user_id", "movie_id", "rating"];

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    pub line: u64,
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: u8,
}

pub struct RatingRows {
    table: SourceTable,
}

pub fn open_ratings<P: AsRef<Path>>(path: P) -> Result<RatingRows, TableError> {
    let table = SourceTable::open(path.as_ref(), &RATINGS_COLUMNS)?;
    Ok(RatingRows { table })
}

impl Iterator for RatingRows {
    type Item = Result<RatingRow, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, record) = match self.table.next_record()? {
            Ok(next) => next,
            Err(e) => return Some(Err(e)),
        };

        Some(self.parse(line, &record))
    }
}

impl RatingRows {
    fn parse(&self, line: u64, record: &StringRecord) -> Result<RatingRow, TableError> {
        let user_id = self.table.parse_id(record, line, "user_id")?;
        let movie_id = self.table.parse_id(record, line, "movie_id")?;
        let raw = self.table.required_field(record, line, "rating")?;
        let value: f64 = raw.parse().map_err(|_| {
            self.table
                .invalid_row(line, format!("'{}' is not a numeric rating", raw))
        })?;
        let rating = Rating::from_source_value(value).ok_or_else(|| {
            self.table
                .invalid_row(line, format!("rating {} is outside 0-5", raw))
        })?;
        Ok(RatingRow {
            line,
            user_id,
            movie_id,
            rating,
        })
    }
}
