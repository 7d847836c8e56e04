use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use movie_catalog_config::{Config, CredentialStore, PathManager};
use movie_catalog_core::Store;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Paths, configuration and the interrupt token shared by every command.
pub struct AppContext {
    pub paths: PathManager,
    pub config_file: PathBuf,
    pub config: Config,
    pub cancel: CancellationToken,
}

impl AppContext {
    pub fn load(config_override: Option<PathBuf>, cancel: CancellationToken) -> Result<Self> {
        let paths = PathManager::default();
        let config_file = config_override.unwrap_or_else(|| paths.config_file());
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config
            .validate(None)
            .map_err(|e| eyre!("Configuration validation failed: {}", e))?;

        Ok(Self {
            paths,
            config_file,
            config,
            cancel,
        })
    }

    pub fn open_store(&self) -> Result<Store> {
        let database = self.config.paths.database(&self.paths);
        tracing::debug!("Using database {}", database.display());
        Store::open(&database).wrap_err_with(|| format!("Failed to open database {}", database.display()))
    }

    pub fn credentials(&self) -> Result<CredentialStore> {
        let credentials_file = self.paths.credentials_file();
        let mut store = CredentialStore::new(credentials_file.clone());
        store
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
        Ok(store)
    }
}
