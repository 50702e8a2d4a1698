//! Generated media: image providers and artifact staging
//!
//! Plugins that produce files stage them under a per-category directory of
//! the uploads root. Filenames are random so concurrent writers never
//! collide and no locking is needed.

mod config;
pub mod providers;

pub use config::ImageConfig;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Length of generated artifact file stems
const NAME_LEN: usize = 15;

/// Attempts before giving up on finding a free filename
const MAX_NAME_ATTEMPTS: usize = 5;

/// Image bytes returned by a provider
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Encoded image data
    pub data: Vec<u8>,
    /// File extension without the dot
    pub extension: &'static str,
}

/// Trait for image generation backends
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image for the prompt
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails or returns no image
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Staging area for generated artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root` (created lazily)
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uploads root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one category of artifacts
    #[must_use]
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(category)
    }

    /// Write `data` to a fresh file in `category`, returning its path
    ///
    /// A partially written file is removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or written
    pub async fn save(&self, category: &str, extension: &str, data: &[u8]) -> Result<PathBuf> {
        let (path, mut file) = self.create(category, extension).await?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            discard(&path).await;
            return Err(Error::Io(e));
        }

        tracing::debug!(path = %path.display(), bytes = data.len(), "staged artifact");
        Ok(path)
    }

    /// Create an empty file with a random name in `category`
    async fn create(&self, category: &str, extension: &str) -> Result<(PathBuf, tokio::fs::File)> {
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(format!("{}.{extension}", random_name(NAME_LEN)));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::Media(format!(
            "no free artifact name in {}",
            dir.display()
        )))
    }
}

/// Remove a staged artifact, ignoring files that are already gone
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
    }
}

/// Random ASCII letters and digits
#[must_use]
pub fn random_name(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
