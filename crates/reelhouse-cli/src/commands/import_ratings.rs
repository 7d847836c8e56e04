use super::context::AppContext;
use super::INTERRUPTED_MESSAGE;
use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use movie_catalog_core::import_ratings;
use std::path::PathBuf;

pub async fn run_import_ratings(ctx: &AppContext, ratings: Option<PathBuf>, output: &Output) -> Result<()> {
    let ratings_path = ratings.unwrap_or_else(|| ctx.config.paths.ratings_csv());
    let store = ctx.open_store()?;
    let cancel = ctx.cancel.clone();
    let path = ratings_path.clone();

    let report = tokio::task::spawn_blocking(move || import_ratings(&store, &path, &cancel))
        .await
        .wrap_err("Ratings import worker failed")?
        .map_err(|e| eyre!("Failed to import {}: {:#}", ratings_path.display(), e))?;

    if report.interrupted {
        output.warn(INTERRUPTED_MESSAGE);
    }
    if output.is_human() && (report.updated > 0 || report.missing_movie > 0 || report.invalid > 0) {
        output.info(format!(
            "Updated: {}, Missing movie: {}, Invalid: {}",
            report.updated, report.missing_movie, report.invalid
        ));
    }
    output.summary(
        "ratings_import",
        report.to_string(),
        serde_json::to_value(report).unwrap_or_default(),
    );
    Ok(())
}
