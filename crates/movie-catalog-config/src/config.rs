use crate::credentials::CredentialStore;
use crate::paths::PathManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// How poster locations are resolved against the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Look up `poster_path` through the metadata endpoint, then download it
    #[default]
    Details,
    /// Download `{image_base}/{tmdb_id}.jpg` straight from the CDN
    Direct,
}

impl std::str::FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "details" => Ok(FetchMode::Details),
            "direct" => Ok(FetchMode::Direct),
            _ => Err(format!("Invalid fetch mode: {}. Use 'details' or 'direct'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub fetch_mode: FetchMode,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_image_base")]
    pub image_base: String,
    /// Lowest-priority key source; prefer the environment or credentials file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_per_call_timeout_secs")]
    pub per_call_timeout_secs: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Optional overrides; unset entries fall back to `PathManager` locations or
/// the current directory for source tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movies_csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_csv: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("enrichment.worker_count must be at least 1")]
    ZeroWorkers,
    #[error("enrichment.per_call_timeout_secs must be at least 1")]
    ZeroTimeout,
    #[error("enrichment.progress_interval must be at least 1")]
    ZeroProgressInterval,
    #[error("TMDB API key is required for '{0}' fetch mode (set TMDB_API_KEY or run `reelhouse config set-api-key`)")]
    MissingApiKey(&'static str),
    #[error("tmdb.{0} must not be empty")]
    EmptyEndpoint(&'static str),
}

fn default_api_base() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base() -> String {
    "https://image.tmdb.org/t/p/w200".to_string()
}

fn default_worker_count() -> usize {
    5
}

fn default_per_call_timeout_secs() -> u64 {
    5
}

fn default_progress_interval() -> usize {
    10
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            fetch_mode: FetchMode::default(),
            api_base: default_api_base(),
            image_base: default_image_base(),
            api_key: None,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            per_call_timeout_secs: default_per_call_timeout_secs(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl EnrichmentConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs(self.per_call_timeout_secs)
    }
}

impl PathsConfig {
    pub fn database(&self, paths: &PathManager) -> PathBuf {
        self.database.clone().unwrap_or_else(|| paths.database_file())
    }

    pub fn assets_dir(&self, paths: &PathManager) -> PathBuf {
        self.assets_dir.clone().unwrap_or_else(|| paths.poster_dir())
    }

    pub fn movies_csv(&self) -> PathBuf {
        self.movies_csv.clone().unwrap_or_else(|| PathBuf::from("movies.csv"))
    }

    pub fn links_csv(&self) -> PathBuf {
        self.links_csv.clone().unwrap_or_else(|| PathBuf::from("links.csv"))
    }

    pub fn ratings_csv(&self) -> PathBuf {
        self.ratings_csv.clone().unwrap_or_else(|| PathBuf::from("ratings.csv"))
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings. The API key is only checked when `api_key` is
    /// `Some`, i.e. when a poster run is about to start.
    pub fn validate(&self, api_key: Option<&str>) -> Result<(), ConfigError> {
        if self.enrichment.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.enrichment.per_call_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.enrichment.progress_interval == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }
        if self.tmdb.image_base.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint("image_base"));
        }

        if let Some(key) = api_key {
            if self.tmdb.fetch_mode == FetchMode::Details {
                if self.tmdb.api_base.trim().is_empty() {
                    return Err(ConfigError::EmptyEndpoint("api_base"));
                }
                if key.trim().is_empty() {
                    return Err(ConfigError::MissingApiKey("details"));
                }
            }
        }

        Ok(())
    }

    /// Resolve the TMDB key: environment, then credentials file, then config.
    pub fn resolve_api_key(&self, credentials: &CredentialStore) -> Option<String> {
        let from_env = std::env::var(TMDB_API_KEY_ENV).ok();
        resolve_key_from(from_env, credentials, self.tmdb.api_key.as_deref())
    }
}

fn resolve_key_from(
    from_env: Option<String>,
    credentials: &CredentialStore,
    from_config: Option<&str>,
) -> Option<String> {
    from_env
        .filter(|k| !k.trim().is_empty())
        .or_else(|| credentials.get_tmdb_api_key().cloned())
        .or_else(|| from_config.map(str::to_string))
        .filter(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tmdb.fetch_mode = FetchMode::Direct;
        config.enrichment.worker_count = 8;
        config.paths.movies_csv = Some(PathBuf::from("/data/movies.csv"));

        config.save_to_file(file.path()).unwrap();
        let loaded = Config::load_from_file(file.path()).unwrap();

        assert_eq!(loaded.tmdb.fetch_mode, FetchMode::Direct);
        assert_eq!(loaded.enrichment.worker_count, 8);
        assert_eq!(loaded.enrichment.per_call_timeout_secs, 5);
        assert_eq!(loaded.paths.movies_csv(), PathBuf::from("/data/movies.csv"));
        assert_eq!(loaded.paths.links_csv(), PathBuf::from("links.csv"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[enrichment]\nworker_count = 3\n").unwrap();
        assert_eq!(config.enrichment.worker_count, 3);
        assert_eq!(config.enrichment.progress_interval, 10);
        assert_eq!(config.tmdb.fetch_mode, FetchMode::Details);
        assert_eq!(config.tmdb.image_base, "https://image.tmdb.org/t/p/w200");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.enrichment.worker_count, 5);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate(None).is_ok());
        assert_eq!(config.validate(Some("")), Err(ConfigError::MissingApiKey("details")));
        assert!(config.validate(Some("abc123")).is_ok());

        config.tmdb.fetch_mode = FetchMode::Direct;
        assert!(config.validate(Some("")).is_ok());

        config.enrichment.worker_count = 0;
        assert_eq!(config.validate(None), Err(ConfigError::ZeroWorkers));

        config.enrichment.worker_count = 5;
        config.enrichment.per_call_timeout_secs = 0;
        assert_eq!(config.validate(None), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_api_key_resolution_order() {
        let file = NamedTempFile::new().unwrap();
        let mut creds = CredentialStore::new(file.path().to_path_buf());

        assert_eq!(resolve_key_from(None, &creds, None), None);
        assert_eq!(resolve_key_from(None, &creds, Some("cfg")), Some("cfg".to_string()));

        creds.set_tmdb_api_key("stored".to_string());
        assert_eq!(resolve_key_from(None, &creds, Some("cfg")), Some("stored".to_string()));
        assert_eq!(
            resolve_key_from(Some("env".to_string()), &creds, Some("cfg")),
            Some("env".to_string())
        );
        assert_eq!(
            resolve_key_from(Some("  ".to_string()), &creds, None),
            Some("stored".to_string())
        );
    }

    #[test]
    fn test_fetch_mode_from_str() {
        assert_eq!("Direct".parse::<FetchMode>(), Ok(FetchMode::Direct));
        assert_eq!("details".parse::<FetchMode>(), Ok(FetchMode::Details));
        assert!("cdn".parse::<FetchMode>().is_err());
    }
}
