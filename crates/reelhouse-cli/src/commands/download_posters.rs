use super::context::AppContext;
use super::INTERRUPTED_MESSAGE;
use crate::output::Output;
use crate::progress_ui::poster_reporter;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use movie_catalog_config::FetchMode;
use movie_catalog_core::{
    work_list_from_store, AssetCache, DispatchReport, EnrichmentSettings, PosterDispatcher,
    PosterFetcher, Store,
};
use movie_catalog_models::EnrichmentItem;
use movie_catalog_sources::{load_external_ids, TmdbCatalog, TmdbSettings};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line overrides for the poster stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosterOptions {
    pub mode: Option<FetchMode>,
    pub workers: Option<usize>,
}

pub async fn run_download_posters(
    ctx: &AppContext,
    links: Option<PathBuf>,
    options: PosterOptions,
    output: &Output,
) -> Result<()> {
    let links_path = links.unwrap_or_else(|| ctx.config.paths.links_csv());
    let links = load_external_ids(&links_path)
        .wrap_err_with(|| format!("Failed to load links from {}", links_path.display()))?;
    tracing::info!("Loaded {} TMDB ids from {}", links.len(), links_path.display());

    let store = ctx.open_store()?;
    let items = work_list_from_store(&store, &links).map_err(|e| eyre!("{:#}", e))?;

    run_enrichment(ctx, store, items, options, output).await
}

/// Fetch posters for `items`. Shared with `import-movies --download-posters`.
pub async fn run_enrichment(
    ctx: &AppContext,
    store: Store,
    items: Vec<EnrichmentItem>,
    options: PosterOptions,
    output: &Output,
) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(mode) = options.mode {
        config.tmdb.fetch_mode = mode;
    }
    if let Some(workers) = options.workers {
        config.enrichment.worker_count = workers;
    }

    let api_key = config.resolve_api_key(&ctx.credentials()?);
    config
        .validate(Some(api_key.as_deref().unwrap_or_default()))
        .map_err(|e| eyre!("Configuration validation failed: {}", e))?;

    let settings = EnrichmentSettings::from_config(&config, &ctx.paths, api_key);
    let cache = AssetCache::new(&settings.assets_dir);
    cache.ensure_dir().map_err(|e| eyre!("{:#}", e))?;

    if items.is_empty() {
        output.info("No movies with a TMDB id to fetch posters for");
        return Ok(());
    }

    tracing::info!(
        mode = ?config.tmdb.fetch_mode,
        workers = settings.worker_count,
        items = items.len(),
        "Starting poster download"
    );

    let catalog = TmdbCatalog::new(TmdbSettings::from_config(
        &config.tmdb,
        settings.api_key.clone(),
        settings.per_call_timeout,
    ));
    let fetcher = PosterFetcher::new(Arc::new(catalog), cache, store);
    let dispatcher = PosterDispatcher::new(fetcher, settings.worker_count, settings.progress_interval);

    let reporter = poster_reporter(output);
    let report = dispatcher
        .run(items, ctx.cancel.clone(), reporter.as_ref())
        .await
        .wrap_err("Poster download failed")?;

    if report.interrupted {
        output.warn(INTERRUPTED_MESSAGE);
    }
    output.summary(
        "posters",
        headline(&report),
        serde_json::to_value(&report).unwrap_or_default(),
    );
    Ok(())
}

fn headline(report: &DispatchReport) -> String {
    let tally = &report.tally;
    format!(
        "Posters: {} downloaded, {} skipped, {} missing, {} timeout, {} error ({}/{} in {:.1}s)",
        tally.downloaded,
        tally.skipped,
        tally.missing,
        tally.timeout,
        tally.error,
        report.completed,
        report.total,
        report.elapsed.as_secs_f64()
    )
}
