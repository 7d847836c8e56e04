//! Movies table import: movies, genres and the poster work list.

use crate::progress::RowProgress;
use crate::store::{Store, StoreError};
use anyhow::{Context, Result};
use movie_catalog_models::{EnrichmentItem, ExternalIdMap, Movie};
use movie_catalog_sources::{open_movies, MovieRow};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const MOVIES_PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub movies_created: usize,
    pub genres_created: usize,
    pub invalid_rows: usize,
    pub failed_rows: usize,
    pub eligible: usize,
    pub interrupted: bool,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Movies created: {} | Genres created: {} | Invalid: {} | Failed: {} | Eligible for posters: {}",
            self.movies_created, self.genres_created, self.invalid_rows, self.failed_rows, self.eligible
        )
    }
}

/// Result of a movies import: the counts plus the movies that have an
/// external id and can therefore be enriched.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub report: LoadReport,
    pub work: Vec<EnrichmentItem>,
}

/// Upsert every movie and genre from the movies table.
///
/// Re-running against the same table creates nothing new. Existing titles
/// are never overwritten. A row the store rejects is logged, counted in
/// `failed_rows` and skipped. Stops between rows once `cancel` fires.
pub fn load_movies(
    store: &Store,
    movies_path: &Path,
    links: &ExternalIdMap,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let rows = open_movies(movies_path)?;
    let mut report = LoadReport::default();
    let mut work = Vec::new();
    let mut queued = HashSet::new();
    let mut progress = RowProgress::new("Movies", MOVIES_PROGRESS_INTERVAL);

    for row in rows {
        if cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }
        report.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_row_level() => {
                warn!("Skipping movie row: {}", e);
                report.invalid_rows += 1;
                progress.advance(&report);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let movie = match store_row(store, &row, &mut report) {
            Ok(movie) => movie,
            Err(e) => {
                warn!("Failed to store movie {} (line {}): {}", row.movie_id, row.line, e);
                report.failed_rows += 1;
                progress.advance(&report);
                continue;
            }
        };

        if let Some(external_id) = links.get(movie.movie_id) {
            if queued.insert(movie.movie_id) {
                work.push(EnrichmentItem::new(movie, external_id));
                report.eligible += 1;
            }
        }

        progress.advance(&report);
    }

    info!(
        "Movies import completed: {} rows in {:.1}s | {}",
        report.rows,
        progress.elapsed().as_secs_f64(),
        report
    );
    Ok(LoadOutcome { report, work })
}

fn store_row(store: &Store, row: &MovieRow, report: &mut LoadReport) -> Result<Movie, StoreError> {
    let (movie, created) = store.get_or_create_movie(row.movie_id, &row.title)?;
    if created {
        report.movies_created += 1;
    }

    for name in &row.genres {
        let (genre, created) = store.get_or_create_genre(name)?;
        if created {
            debug!("Created genre '{}'", genre.name);
            report.genres_created += 1;
        }
        store.add_movie_genre(movie.movie_id, genre.id)?;
    }
    Ok(movie)
}

/// Build the poster work list from movies already in the store.
pub fn work_list_from_store(store: &Store, links: &ExternalIdMap) -> Result<Vec<EnrichmentItem>> {
    let movies = store.all_movies().context("failed to list stored movies")?;
    Ok(work_list(movies, links))
}

fn work_list(movies: Vec<Movie>, links: &ExternalIdMap) -> Vec<EnrichmentItem> {
    movies
        .into_iter()
        .filter_map(|movie| {
            let external_id = links.get(movie.movie_id)?.to_string();
            Some(EnrichmentItem::new(movie, external_id))
        })
        .collect()
}
