use std::collections::HashMap;

/// In-memory join from dataset movie id to external catalog (TMDB) id.
///
/// Built once per run from the links table and discarded afterwards. Only
/// non-empty external ids are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalIdMap {
    entries: HashMap<i64, String>,
}

impl ExternalIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping. Blank external ids are ignored; returns whether the
    /// entry was stored.
    pub fn insert(&mut self, movie_id: i64, external_id: &str) -> bool {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return false;
        }
        self.entries.insert(movie_id, external_id.to_string());
        true
    }

    pub fn get(&self, movie_id: i64) -> Option<&str> {
        self.entries.get(&movie_id).map(|s| s.as_str())
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.entries.contains_key(&movie_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
