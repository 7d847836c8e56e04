use super::context::AppContext;
use super::download_posters::{run_enrichment, PosterOptions};
use super::INTERRUPTED_MESSAGE;
use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use movie_catalog_core::load_movies;
use movie_catalog_sources::load_external_ids;
use std::path::PathBuf;

pub async fn run_import_movies(
    ctx: &AppContext,
    movies: Option<PathBuf>,
    links: Option<PathBuf>,
    download_posters: bool,
    output: &Output,
) -> Result<()> {
    let movies_path = movies.unwrap_or_else(|| ctx.config.paths.movies_csv());
    let links_path = links.unwrap_or_else(|| ctx.config.paths.links_csv());

    let links = load_external_ids(&links_path)
        .wrap_err_with(|| format!("Failed to load links from {}", links_path.display()))?;
    tracing::info!("Loaded {} TMDB ids from {}", links.len(), links_path.display());

    let store = ctx.open_store()?;
    let load_store = store.clone();
    let cancel = ctx.cancel.clone();
    let path = movies_path.clone();
    let outcome = tokio::task::spawn_blocking(move || load_movies(&load_store, &path, &links, &cancel))
        .await
        .wrap_err("Movies import worker failed")?
        .map_err(|e| eyre!("Failed to import {}: {:#}", movies_path.display(), e))?;

    let report = outcome.report;
    output.summary(
        "movies_import",
        format!(
            "Imported movies: {} rows, {} movies created, {} genres created, {} invalid, {} failed, {} eligible for posters",
            report.rows,
            report.movies_created,
            report.genres_created,
            report.invalid_rows,
            report.failed_rows,
            report.eligible
        ),
        serde_json::to_value(report).unwrap_or_default(),
    );

    if report.interrupted {
        output.warn(INTERRUPTED_MESSAGE);
        return Ok(());
    }

    if download_posters {
        run_enrichment(ctx, store, outcome.work, PosterOptions::default(), output).await?;
    }

    Ok(())
}
