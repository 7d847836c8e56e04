use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of the stored poster reference, relative to the media root.
pub const POSTER_REFERENCE_PREFIX: &str = "movie_posters";

const POSTER_EXTENSION: &str = "jpg";

/// On-disk poster directory with one deterministic file per movie.
///
/// Presence of the file is the only record that a poster was fetched, so it
/// is checked before any network call.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create poster directory {}", self.dir.display()))
    }

    pub fn path_for(&self, movie_id: i64) -> PathBuf {
        self.dir.join(format!("{}.{}", movie_id, POSTER_EXTENSION))
    }

    /// The value stored in `movies.poster` for this movie.
    pub fn reference_for(&self, movie_id: i64) -> String {
        format!("{}/{}.{}", POSTER_REFERENCE_PREFIX, movie_id, POSTER_EXTENSION)
    }

    pub async fn exists(&self, movie_id: i64) -> bool {
        tokio::fs::try_exists(self.path_for(movie_id))
            .await
            .unwrap_or(false)
    }

    /// Write the poster bytes: temp file first, then rename into place, so
    /// a crash never leaves a partial file at the final path.
    pub async fn write(&self, movie_id: i64, bytes: &[u8]) -> Result<PathBuf> {
        let final_path = self.path_for(movie_id);
        let temp_path = final_path.with_extension("jpg.part");

        tokio::fs::write(&temp_path, bytes)
            .await
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("failed to move poster into {}", final_path.display()));
        }

        debug!("Saved poster for movie {} ({} bytes)", movie_id, bytes.len());
        Ok(final_path)
    }
}
