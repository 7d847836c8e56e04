use crate::error::CatalogError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Subset of `GET /movie/{id}` that poster resolution needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieDetails {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl MovieDetails {
    /// `poster_path` if present and non-empty.
    pub fn poster_path(&self) -> Option<&str> {
        self.poster_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

pub fn details_url(api_base: &str, tmdb_id: &str) -> String {
    format!("{}/movie/{}", api_base.trim_end_matches('/'), tmdb_id)
}

/// CDN URL for a `poster_path` returned by the details endpoint.
pub fn poster_url(image_base: &str, poster_path: &str) -> String {
    let base = image_base.trim_end_matches('/');
    if poster_path.starts_with('/') {
        format!("{}{}", base, poster_path)
    } else {
        format!("{}/{}", base, poster_path)
    }
}

/// CDN URL addressed directly by TMDB id.
pub fn direct_poster_url(image_base: &str, tmdb_id: &str) -> String {
    format!("{}/{}.jpg", image_base.trim_end_matches('/'), tmdb_id)
}

/// Map a reqwest failure onto the catalog error taxonomy.
pub(crate) fn classify_error(url: &str, timeout: Duration, err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else if err.is_decode() {
        CatalogError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if let Some(status) = err.status() {
        CatalogError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        CatalogError::Transport {
            url: url.to_string(),
            message: err.without_url().to_string(),
        }
    }
}

/// Fetch movie details. The API key travels as a query parameter and never
/// appears in errors or logs.
pub async fn get_movie_details(
    client: &Client,
    api_base: &str,
    api_key: &str,
    tmdb_id: &str,
    timeout: Duration,
) -> Result<MovieDetails, CatalogError> {
    let url = details_url(api_base, tmdb_id);
    trace!("TMDB details request: {}", url);

    let response = client
        .get(&url)
        .query(&[("api_key", api_key)])
        .header("Accept", "application/json")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_error(&url, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(&url, timeout, e))?;
    parse_movie_details(&url, &body)
}

pub(crate) fn parse_movie_details(url: &str, body: &[u8]) -> Result<MovieDetails, CatalogError> {
    serde_json::from_slice(body).map_err(|e| CatalogError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Download an image body.
pub async fn download_image(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, CatalogError> {
    trace!("TMDB image request: {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_error(url, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, timeout, e))?;
    Ok(bytes.to_vec())
}
