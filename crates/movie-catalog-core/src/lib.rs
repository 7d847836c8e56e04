pub mod store;
pub mod loader;
pub mod ratings;
pub mod posters;
pub mod progress;

pub use store::{Store, StoreCounts, StoreError};
pub use loader::{load_movies, work_list_from_store, LoadOutcome, LoadReport};
pub use ratings::{import_ratings, RatingImportReport};
pub use posters::{
    AssetCache, DispatchError, DispatchReport, EnrichmentSettings, PosterDispatcher, PosterFetcher,
};
pub use progress::{ProgressReporter, RowProgress, TracingReporter};
