//! Poster enrichment: cache lookup, single-item fetcher and the bounded
//! concurrent dispatcher that drives it.

pub mod cache;
pub mod dispatcher;
pub mod fetcher;

#[cfg(test)]
mod tests;

pub use cache::{AssetCache, POSTER_REFERENCE_PREFIX};
pub use dispatcher::{DispatchError, DispatchReport, PosterDispatcher};
pub use fetcher::{EnrichmentSettings, PosterFetcher};
