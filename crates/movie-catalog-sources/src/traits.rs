use async_trait::async_trait;

use crate::error::CatalogError;

/// Remote source of poster images.
///
/// A fetch is at most two calls: `locate_poster` resolves an external id to a
/// downloadable URL (possibly without touching the network), then
/// `download_poster` fetches the bytes. Implementations apply their own
/// per-call timeout.
#[async_trait]
pub trait PosterCatalog: Send + Sync {
    fn catalog_name(&self) -> &str;

    /// Resolve the poster URL for an external id. `Ok(None)` means the
    /// catalog knows the title but has no poster for it.
    async fn locate_poster(&self, external_id: &str) -> Result<Option<String>, CatalogError>;

    /// Download the raw image bytes.
    async fn download_poster(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}
