pub mod config;
pub mod context;
pub mod download_posters;
pub mod import_movies;
pub mod import_ratings;
pub mod movies;
pub mod stats;

pub const INTERRUPTED_MESSAGE: &str = "Interrupted by user. Exiting cleanly.";
