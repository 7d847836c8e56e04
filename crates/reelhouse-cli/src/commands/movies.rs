use super::context::AppContext;
use crate::output::Output;
use color_eyre::eyre::Context;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Table};
use serde_json::json;

pub const DEFAULT_LIST_LIMIT: usize = 50;

pub async fn run_movies(ctx: &AppContext, limit: usize, output: &Output) -> Result<()> {
    let store = ctx.open_store()?;
    let movies = store.list_movies(limit).wrap_err("Failed to list movies")?;

    if !output.is_human() {
        output.json(&json!({ "type": "movies", "data": movies }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }
    if movies.is_empty() {
        output.info("No movies imported yet. Run 'reelhouse import-movies' first.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Genres").add_attribute(Attribute::Bold),
        Cell::new("Poster").add_attribute(Attribute::Bold),
    ]);
    for movie in &movies {
        let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
        table.add_row(vec![
            Cell::new(movie.movie_id),
            Cell::new(&movie.title),
            Cell::new(genres.join(", ")),
            Cell::new(movie.poster.as_deref().unwrap_or("-")),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    Ok(())
}
