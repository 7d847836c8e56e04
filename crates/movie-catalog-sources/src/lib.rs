pub mod traits;
pub mod tables;
pub mod tmdb;
pub mod error;

pub use traits::PosterCatalog;
pub use error::{CatalogError, TableError};
pub use tables::{MovieRow, MovieRows, RatingRow, RatingRows, load_external_ids, open_movies, open_ratings};
pub use tmdb::{TmdbCatalog, TmdbSettings};
