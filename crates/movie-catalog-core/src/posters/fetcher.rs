use crate::posters::cache::AssetCache;
use crate::store::Store;
use movie_catalog_config::{Config, PathManager};
use movie_catalog_models::{EnrichmentItem, FetchOutcome};
use movie_catalog_sources::{CatalogError, PosterCatalog};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the poster stage needs, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub api_key: Option<String>,
    pub worker_count: usize,
    pub assets_dir: PathBuf,
    pub per_call_timeout: Duration,
    pub progress_interval: usize,
}

impl EnrichmentSettings {
    pub fn from_config(config: &Config, paths: &PathManager, api_key: Option<String>) -> Self {
        Self {
            api_key,
            worker_count: config.enrichment.worker_count,
            assets_dir: config.paths.assets_dir(paths),
            per_call_timeout: config.enrichment.per_call_timeout(),
            progress_interval: config.enrichment.progress_interval,
        }
    }
}

/// Fetches one poster per call and persists the result.
///
/// Never returns an error: every failure is logged with the movie title and
/// folded into a `FetchOutcome`.
#[derive(Clone)]
pub struct PosterFetcher {
    catalog: Arc<dyn PosterCatalog>,
    cache: AssetCache,
    store: Store,
}

impl PosterFetcher {
    pub fn new(catalog: Arc<dyn PosterCatalog>, cache: AssetCache, store: Store) -> Self {
        Self { catalog, cache, store }
    }

    pub async fn fetch(&self, item: &EnrichmentItem) -> FetchOutcome {
        let movie = &item.movie;
        let reference = self.cache.reference_for(movie.movie_id);

        if self.cache.exists(movie.movie_id).await {
            return match self.store.backfill_poster(movie.movie_id, &reference) {
                Ok(true) => {
                    debug!("Back-filled poster reference for '{}'", movie.title);
                    FetchOutcome::Skipped
                }
                Ok(false) => FetchOutcome::Skipped,
                Err(e) => {
                    warn!("Failed to record cached poster for '{}': {}", movie.title, e);
                    FetchOutcome::Error
                }
            };
        }

        let url = match self.catalog.locate_poster(&item.external_id).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                info!(catalog = self.catalog.catalog_name(), "No poster available for '{}'", movie.title);
                return FetchOutcome::Missing;
            }
            Err(e) => return self.catalog_failure(&movie.title, e),
        };

        let bytes = match self.catalog.download_poster(&url).await {
            Ok(bytes) => bytes,
            Err(e) => return self.catalog_failure(&movie.title, e),
        };

        if let Err(e) = self.cache.write(movie.movie_id, &bytes).await {
            warn!("Error saving poster for '{}': {:#}", movie.title, e);
            return FetchOutcome::Error;
        }

        // A failure here leaves the file in place; the next run back-fills it
        if let Err(e) = self.store.set_poster(movie.movie_id, &reference) {
            warn!("Error recording poster for '{}': {}", movie.title, e);
            return FetchOutcome::Error;
        }

        info!(catalog = self.catalog.catalog_name(), "Downloaded poster for '{}'", movie.title);
        FetchOutcome::Downloaded
    }

    fn catalog_failure(&self, title: &str, error: CatalogError) -> FetchOutcome {
        let catalog = self.catalog.catalog_name();
        let outcome = outcome_for(&error);
        match outcome {
            FetchOutcome::Missing => info!(catalog, "Poster not found for '{}': {}", title, error),
            FetchOutcome::Timeout => warn!(catalog, "Timeout fetching poster for '{}': {}", title, error),
            _ => warn!(catalog, "Error fetching poster for '{}': {}", title, error),
        }
        outcome
    }
}

pub(crate) fn outcome_for(error: &CatalogError) -> FetchOutcome {
    match error {
        CatalogError::Status { .. } => FetchOutcome::Missing,
        CatalogError::Timeout { .. } => FetchOutcome::Timeout,
        CatalogError::Transport { .. } | CatalogError::Decode { .. } => FetchOutcome::Error,
    }
}
