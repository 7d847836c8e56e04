use super::context::AppContext;
use crate::output::Output;
use color_eyre::eyre::Context;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use serde_json::json;

pub async fn run_stats(ctx: &AppContext, output: &Output) -> Result<()> {
    let store = ctx.open_store()?;
    let counts = store.counts().wrap_err("Failed to read catalog counts")?;

    if !output.is_human() {
        output.json(&json!({ "type": "stats", "data": counts }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Catalog").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
    ]);
    let rows = [
        ("Movies", counts.movies),
        ("Movies with posters", counts.movies_with_posters),
        ("Genres", counts.genres),
        ("Movie genres", counts.movie_genres),
        ("Users", counts.users),
        ("Ratings", counts.ratings),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    Ok(())
}
