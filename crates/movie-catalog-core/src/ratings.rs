//! Ratings table import.

use crate::progress::RowProgress;
use crate::store::Store;
use anyhow::Result;
use movie_catalog_sources::{open_ratings, RatingRow};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const RATINGS_PROGRESS_INTERVAL: usize = 1000;

/// Counts for a ratings import.
///
/// `skipped` covers every row that did not create a rating, updates
/// included. `updated`, `missing_movie` and `invalid` break it down.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RatingImportReport {
    pub rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub updated: usize,
    pub missing_movie: usize,
    pub invalid: usize,
    pub interrupted: bool,
}

impl fmt::Display for RatingImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Imported: {}, Skipped: {}", self.imported, self.skipped)
    }
}

enum RowResult {
    Created,
    Updated,
    MissingMovie,
}

/// Import every rating row. Stops between rows once `cancel` fires.
pub fn import_ratings(
    store: &Store,
    ratings_path: &Path,
    cancel: &CancellationToken,
) -> Result<RatingImportReport> {
    import_ratings_with(store, ratings_path, cancel, |_| {})
}

/// `on_checkpoint` receives the row count each time a progress line is
/// logged. Every row counts, whatever its result.
fn import_ratings_with(
    store: &Store,
    ratings_path: &Path,
    cancel: &CancellationToken,
    mut on_checkpoint: impl FnMut(usize),
) -> Result<RatingImportReport> {
    let rows = open_ratings(ratings_path)?;
    let mut report = RatingImportReport::default();
    let mut progress = RowProgress::new("Ratings", RATINGS_PROGRESS_INTERVAL);

    for row in rows {
        if cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }
        report.rows += 1;
        match row {
            Ok(row) => match import_row(store, &row) {
                Ok(RowResult::Created) => report.imported += 1,
                Ok(RowResult::Updated) => {
                    report.skipped += 1;
                    report.updated += 1;
                }
                Ok(RowResult::MissingMovie) => {
                    report.skipped += 1;
                    report.missing_movie += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to store rating user_id={} movie_id={}: {}",
                        row.user_id, row.movie_id, e
                    );
                    report.skipped += 1;
                }
            },
            Err(e) if e.is_row_level() => {
                warn!("Skipping rating row: {}", e);
                report.skipped += 1;
                report.invalid += 1;
            }
            Err(e) => return Err(e.into()),
        }
        if progress.advance(&report) {
            on_checkpoint(report.rows);
        }
    }

    info!(
        "Ratings import completed: {} rows in {:.1}s | {} | Updated: {} | Missing movie: {} | Invalid: {}",
        report.rows,
        progress.elapsed().as_secs_f64(),
        report,
        report.updated,
        report.missing_movie,
        report.invalid
    );
    Ok(report)
}

fn import_row(store: &Store, row: &RatingRow) -> Result<RowResult> {
    store.get_or_create_user(row.user_id)?;

    match store.get_movie(row.movie_id) {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            warn!(
                "Movie {} not found, skipping rating from user {} (line {})",
                row.movie_id, row.user_id, row.line
            );
            return Ok(RowResult::MissingMovie);
        }
        Err(e) => return Err(e.into()),
    }

    let (_, created) = store.update_or_create_rating(row.user_id, row.movie_id, row.rating)?;
    Ok(if created { RowResult::Created } else { RowResult::Updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ratings_file(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("ratings.csv");
        fs::write(&path, format!("user_id,movie_id,rating,timestamp\n{}", body)).unwrap();
        path
    }

    fn store_with_movie(movie_id: i64) -> Store {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_movie(movie_id, "Seven (1995)").unwrap();
        store
    }

    #[test]
    fn test_repeated_rows_update_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = ratings_file(&dir, "7,42,3.0,964982703\n7,42,3.0,964982703\n7,42,5.0,964982931\n");
        let store = store_with_movie(42);

        let report = import_ratings(&store, &path, &CancellationToken::new()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.updated, 2);
        assert_eq!(report.to_string(), "Imported: 1, Skipped: 2");

        let rating = store.get_rating(7, 42).unwrap().unwrap();
        assert_eq!(rating.rating, 5);
        assert_eq!(store.counts().unwrap().ratings, 1);
    }

    #[test]
    fn test_missing_movie_still_creates_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = ratings_file(&dir, "7,999,4.0,964982703\n");
        let store = store_with_movie(42);

        let report = import_ratings(&store, &path, &CancellationToken::new()).unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.missing_movie, 1);
        assert!(store.get_rating(7, 999).unwrap().is_none());
        assert_eq!(store.counts().unwrap().users, 1);
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = ratings_file(&dir, "7,42,7.5,0\n7,42,abc,0\n7,42,-1,0\n8,42,3.5,0\n");
        let store = store_with_movie(42);

        let report = import_ratings(&store, &path, &CancellationToken::new()).unwrap();
        assert_eq!(report.invalid, 3);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.imported, 1);
        assert!(store.get_rating(7, 42).unwrap().is_none());
        assert_eq!(store.get_rating(8, 42).unwrap().unwrap().rating, 3);
    }

    #[test]
    fn test_progress_every_thousand_rows_counts_all_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::new();
        for n in 0..2500 {
            let line = match n % 10 {
                0 => format!("{},42,abc,0\n", n),
                1 => format!("{},999,4.0,0\n", n),
                _ => format!("{},42,4.0,0\n", n),
            };
            body.push_str(&line);
        }
        let path = ratings_file(&dir, &body);
        let store = store_with_movie(42);

        let mut checkpoints = Vec::new();
        let report =
            import_ratings_with(&store, &path, &CancellationToken::new(), |rows| checkpoints.push(rows)).unwrap();

        assert_eq!(report.rows, 2500);
        assert_eq!(report.invalid, 250);
        assert_eq!(report.missing_movie, 250);
        assert_eq!(report.imported, 2000);
        assert_eq!(report.skipped, 500);
        assert_eq!(checkpoints, vec![1000, 2000]);
    }

    #[test]
    fn test_missing_rating_column_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.csv");
        fs::write(&path, "user_id,movie_id\n7,42\n").unwrap();
        let store = store_with_movie(42);

        assert!(import_ratings(&store, &path, &CancellationToken::new()).is_err());
        assert_eq!(store.counts().unwrap().users, 0);
    }
}
