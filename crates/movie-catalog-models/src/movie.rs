use serde::{Deserialize, Serialize};

use crate::genre::Genre;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    pub movie_id: i64, // Primary key from the source dataset, never reassigned
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Genre>,
    pub poster: Option<String>, // Local asset reference, e.g. "movie_posters/42.jpg"
}

impl std::fmt::Display for Movie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// One unit of poster work: a stored movie paired with its external catalog id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichmentItem {
    pub movie: Movie,
    pub external_id: String,
}

impl EnrichmentItem {
    pub fn new(movie: Movie, external_id: impl Into<String>) -> Self {
        Self {
            movie,
            external_id: external_id.into(),
        }
    }
}
