pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, ConfigError, EnrichmentConfig, FetchMode, PathsConfig, TmdbConfig, TMDB_API_KEY_ENV};
pub use credentials::{CredentialStore, mask_secret};
pub use paths::{PathManager, container_base_path};
