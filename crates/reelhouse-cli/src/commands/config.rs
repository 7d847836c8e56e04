use super::context::AppContext;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use movie_catalog_config::{mask_secret, Config, TMDB_API_KEY_ENV};
use serde_json::json;

pub async fn run_config(cmd: ConfigCommands, ctx: &AppContext, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(ctx, full, output),
        ConfigCommands::Init { force } => init_config(ctx, force, output),
        ConfigCommands::SetApiKey { key } => set_api_key(ctx, key, output),
    }
}

fn show_config(ctx: &AppContext, full: bool, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let credentials = ctx.credentials()?;
    let api_key = config.resolve_api_key(&credentials);
    let api_key_display = match (&api_key, full) {
        (Some(key), true) => key.clone(),
        (Some(key), false) => mask_secret(key),
        (None, _) => "(not set)".to_string(),
    };
    let config_exists = ctx.config_file.exists();

    if !output.is_human() {
        output.json(&json!({
            "config_file": ctx.config_file.display().to_string(),
            "config_file_exists": config_exists,
            "credentials_file": ctx.paths.credentials_file().display().to_string(),
            "tmdb": {
                "fetch_mode": config.tmdb.fetch_mode,
                "api_base": config.tmdb.api_base,
                "image_base": config.tmdb.image_base,
                "api_key": api_key.as_ref().map(|_| api_key_display.clone()),
            },
            "enrichment": config.enrichment,
            "paths": {
                "database": config.paths.database(&ctx.paths).display().to_string(),
                "assets_dir": config.paths.assets_dir(&ctx.paths).display().to_string(),
                "movies_csv": config.paths.movies_csv().display().to_string(),
                "links_csv": config.paths.links_csv().display().to_string(),
                "ratings_csv": config.paths.ratings_csv().display().to_string(),
            },
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    if !config_exists {
        output.warn(format!(
            "Configuration file not found at {}, showing defaults. Run 'reelhouse config init' to create it.",
            ctx.config_file.display()
        ));
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Setting").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    let rows = [
        ("Config file", ctx.config_file.display().to_string()),
        ("Fetch mode", format!("{:?}", config.tmdb.fetch_mode).to_lowercase()),
        ("API base", config.tmdb.api_base.clone()),
        ("Image base", config.tmdb.image_base.clone()),
        ("API key", api_key_display),
        ("Workers", config.enrichment.worker_count.to_string()),
        ("Per-call timeout", format!("{}s", config.enrichment.per_call_timeout_secs)),
        ("Progress interval", config.enrichment.progress_interval.to_string()),
        ("Database", config.paths.database(&ctx.paths).display().to_string()),
        ("Poster directory", config.paths.assets_dir(&ctx.paths).display().to_string()),
        ("Movies table", config.paths.movies_csv().display().to_string()),
        ("Links table", config.paths.links_csv().display().to_string()),
        ("Ratings table", config.paths.ratings_csv().display().to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    Ok(())
}

fn init_config(ctx: &AppContext, force: bool, output: &Output) -> Result<()> {
    if ctx.config_file.exists() && !force {
        output.warn(format!(
            "Configuration already exists at {}. Use --force to overwrite it.",
            ctx.config_file.display()
        ));
        return Ok(());
    }

    ctx.paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;
    Config::default()
        .save_to_file(&ctx.config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", ctx.config_file.display(), e))?;

    output.success(format!("Wrote default configuration to {}", ctx.config_file.display()));
    Ok(())
}

fn set_api_key(ctx: &AppContext, key: String, output: &Output) -> Result<()> {
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(eyre!("API key must not be empty"));
    }

    let mut credentials = ctx.credentials()?;
    credentials.set_tmdb_api_key(key);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.success(format!(
        "Saved TMDB API key to {}",
        ctx.paths.credentials_file().display()
    ));
    if std::env::var(TMDB_API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        output.warn(format!("{} is set and takes precedence over the stored key", TMDB_API_KEY_ENV));
    }
    Ok(())
}
