use crate::error::CatalogError;
use crate::tmdb::api;
use crate::traits::PosterCatalog;
use async_trait::async_trait;
use movie_catalog_config::{FetchMode, TmdbConfig};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub mode: FetchMode,
    pub api_base: String,
    pub image_base: String,
    pub api_key: String,
    pub per_call_timeout: Duration,
}

impl TmdbSettings {
    pub fn from_config(config: &TmdbConfig, api_key: Option<String>, per_call_timeout: Duration) -> Self {
        Self {
            mode: config.fetch_mode,
            api_base: config.api_base.clone(),
            image_base: config.image_base.clone(),
            api_key: api_key.unwrap_or_default(),
            per_call_timeout,
        }
    }
}

/// Create the shared HTTP client. Timeouts are applied per request.
pub fn create_tmdb_client() -> Client {
    Client::builder()
        .user_agent(concat!("reelhouse/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Clone)]
pub struct TmdbCatalog {
    client: Arc<Client>,
    settings: TmdbSettings,
}

impl TmdbCatalog {
    pub fn new(settings: TmdbSettings) -> Self {
        Self {
            client: Arc::new(create_tmdb_client()),
            settings,
        }
    }
}

#[async_trait]
impl PosterCatalog for TmdbCatalog {
    fn catalog_name(&self) -> &str {
        "tmdb"
    }

    async fn locate_poster(&self, external_id: &str) -> Result<Option<String>, CatalogError> {
        match self.settings.mode {
            FetchMode::Direct => Ok(Some(api::direct_poster_url(
                &self.settings.image_base,
                external_id,
            ))),
            FetchMode::Details => {
                let details = api::get_movie_details(
                    &self.client,
                    &self.settings.api_base,
                    &self.settings.api_key,
                    external_id,
                    self.settings.per_call_timeout,
                )
                .await?;

                match details.poster_path() {
                    Some(path) => Ok(Some(api::poster_url(&self.settings.image_base, path))),
                    None => {
                        debug!("TMDB has no poster for tmdb_id={}", external_id);
                        Ok(None)
                    }
                }
            }
        }
    }

    async fn download_poster(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        api::download_image(&self.client, url, self.settings.per_call_timeout).await
    }
}
