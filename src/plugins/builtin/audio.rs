//! YouTube audio extraction via `yt-dlp`

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::plugins::{
    ArtifactFormat, ArtifactKind, CallSpec, Context, Envelope, ParamSpec, Params, Plugin,
};
use crate::tools::process;
use crate::{Error, Result};

const DEFAULT_BINARY: &str = "yt-dlp";

/// Upper bound on one download
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads older than this are removed before each extraction
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Downloads the best audio stream of a video into the temp directory
pub struct AudioExtractPlugin {
    binary: String,
    tmp_dir: PathBuf,
    specs: Vec<CallSpec>,
}

impl AudioExtractPlugin {
    /// Create the plugin writing into `tmp_dir`
    #[must_use]
    pub fn new(tmp_dir: &Path) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            tmp_dir: tmp_dir.to_path_buf(),
            specs: vec![
                CallSpec::new(
                    "extract_youtube_audio",
                    "Extract audio from a YouTube video and return the audio file",
                )
                .param(
                    "youtube_link",
                    ParamSpec::string("The URL of the YouTube video").required(),
                ),
            ],
        }
    }

    /// Use a different downloader executable
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn args(&self, link: &str) -> Vec<String> {
        let template = self.tmp_dir.join("%(title)s.%(ext)s");
        [
            "-f",
            "bestaudio",
            "--socket-timeout",
            "30",
            "--no-color",
            "--quiet",
            "--no-simulate",
            "--print",
            "after_move:filepath",
            "-o",
        ]
        .into_iter()
        .map(String::from)
        .chain([template.to_string_lossy().into_owned(), "--".to_string(), link.to_string()])
        .collect()
    }

    async fn extract(&self, link: &str) -> Result<PathBuf> {
        let program = process::locate(&self.binary)?;
        tokio::fs::create_dir_all(&self.tmp_dir).await?;
        prune_stale(&self.tmp_dir, STALE_AFTER).await;

        let output = process::run(&program, self.args(link), DOWNLOAD_TIMEOUT).await?;
        let path = downloaded_path(&output.stdout).ok_or_else(|| {
            Error::Upstream(format!("{} did not report an output file", self.binary))
        })?;

        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::Upstream(format!(
                "output file {} does not exist",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Path printed by `--print after_move:filepath` (last non-empty line)
fn downloaded_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Remove regular files in `dir` last modified more than `max_age` ago
async fn prune_stale(dir: &Path, max_age: Duration) {
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return;
    };
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let stale = metadata.is_file()
            && metadata.modified().is_ok_and(|modified| modified < cutoff);
        if !stale {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => tracing::debug!(path = %entry.path().display(), "pruned stale download"),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to prune download");
            }
        }
    }
}

#[async_trait]
impl Plugin for AudioExtractPlugin {
    fn source_name(&self) -> &str {
        "YouTube Audio Extractor"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let link = params.require_str("youtube_link")?;

        let path = self.extract(link).await.map_err(|e| match e {
            Error::Config(_) => e,
            other => Error::Upstream(format!("Failed to extract audio: {other}")),
        })?;

        tracing::info!(path = %path.display(), "extracted audio");
        Ok(Envelope::direct(
            ArtifactKind::File,
            ArtifactFormat::Path,
            path.to_string_lossy().into_owned(),
        ))
    }
}
