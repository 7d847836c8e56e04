use super::SourceTable;
use crate::error::TableError;
use movie_catalog_models::ExternalIdMap;
use std::path::Path;
use tracing::info;

pub const LINKS_COLUMNS: [&str; 2] = ["movie_id", "tmdb_id"];

/// Build the movie id -> TMDB id join from the links table.
///
/// Rows with a blank `tmdb_id` are left out. Any malformed row fails the
/// whole load.
pub fn load_external_ids<P: AsRef<Path>>(path: P) -> Result<ExternalIdMap, TableError> {
    let path = path.as_ref();
    let mut table = SourceTable::open(path, &LINKS_COLUMNS)?;
    let mut map = ExternalIdMap::new();
    let mut rows = 0usize;

    while let Some(next) = table.next_record() {
        let (line, record) = next?;
        rows += 1;
        let movie_id = table.parse_id(&record, line, "movie_id")?;
        if let Some(tmdb_id) = table.field(&record, "tmdb_id") {
            map.insert(movie_id, tmdb_id);
        }
    }

    info!(
        "Loaded {} external ids from {} ({} rows)",
        map.len(),
        path.display(),
        rows
    );
    Ok(map)
}
