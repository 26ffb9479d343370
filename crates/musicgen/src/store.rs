//! Local directory of downloaded audio files
//!
//! The store is the only writer of its directory. Downloads stream into a
//! hidden temporary file and are published under their final name with a
//! no-clobber link, so an existing file is never overwritten and readers
//! never observe a partially written file.

use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures_util::StreamExt;
use reqwest::Client;
use resona_config::OutputFormat;
use resona_telemetry::metrics::DownloadMetrics;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Longest stem derived from a prompt
const MAX_SLUG_LEN: usize = 40;
/// Longest stem accepted from a custom filename
const MAX_CUSTOM_STEM_LEN: usize = 100;
/// Name candidates tried before giving up on publishing a download
const MAX_PUBLISH_ATTEMPTS: u64 = 100;
/// Extensions kept as-is on custom filenames
const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "flac", "ogg"];

#[derive(Debug, Error)]
pub enum StoreError {
    /// Name is empty, hidden, or would leave the store directory
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Remote audio could not be fetched
    #[error("Audio download failed: {0}")]
    Download(String),

    /// Every candidate name was already taken
    #[error("No free filename in '{0}'")]
    NameExhausted(String),

    #[error("Audio store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A file in the audio store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedAudioFile {
    pub filename: String,
    pub size_bytes: u64,
    /// Last modification time, RFC 3339
    pub modified_at: Option<String>,
}

/// Work item for a detached download
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub source_url: String,
    pub prompt: String,
    pub custom_filename: Option<String>,
}

/// Manages the on-disk audio directory
pub struct AudioStore {
    root: PathBuf,
    client: Client,
    extension: &'static str,
    sequence: Arc<AtomicU64>,
    tasks: TaskTracker,
    metrics: DownloadMetrics,
}

impl AudioStore {
    /// Open the store, creating its directory if needed
    pub fn open(
        root: impl Into<PathBuf>,
        client: Client,
        output_format: OutputFormat,
        metrics: DownloadMetrics,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        tracing::debug!(directory = %root.display(), "audio store ready");

        Ok(Self {
            root,
            client,
            extension: output_format.as_str(),
            sequence: Arc::new(AtomicU64::new(0)),
            tasks: TaskTracker::new(),
            metrics,
        })
    }

    /// Queue a download that outlives the current request
    ///
    /// The outcome is only logged; nothing is reported back to the caller.
    pub fn spawn_save(self: &Arc<Self>, request: SaveRequest) {
        let store = Arc::clone(self);
        let span = tracing::info_span!("audio_download", source_url = %request.source_url);

        self.tasks.spawn(
            async move {
                match store
                    .download_and_save(&request.source_url, &request.prompt, request.custom_filename.as_deref())
                    .await
                {
                    Ok(file) => {
                        tracing::info!(filename = %file.filename, size_bytes = file.size_bytes, "audio saved");
                    }
                    Err(e) => {
                        store.metrics.record_failure();
                        tracing::error!(error = %e, "background audio download failed");
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Stop accepting downloads and wait for in-flight ones
    pub async fn shutdown(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            tracing::info!(pending = self.tasks.len(), "waiting for audio downloads");
        }
        self.tasks.wait().await;
    }

    /// Fetch remote audio and store it under a fresh name
    pub async fn download_and_save(
        &self,
        source_url: &str,
        prompt: &str,
        custom_filename: Option<&str>,
    ) -> Result<SavedAudioFile, StoreError> {
        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| StoreError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Download(format!("source responded with {status}")));
        }

        // dropped (and deleted) on any early return
        let temp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(&self.root)?;

        let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);
        let mut stream = response.bytes_stream();
        let mut size_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StoreError::Download(e.to_string()))?;
            file.write_all(&chunk).await?;
            size_bytes += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let naming = match custom_filename.and_then(|name| sanitize_custom(name, self.extension)) {
            Some((stem, extension)) => Naming::Custom { stem, extension },
            None => Naming::Generated {
                slug: slugify(prompt),
                timestamp: jiff::Timestamp::now().strftime("%Y%m%d_%H%M%S").to_string(),
            },
        };

        let filename = self.publish(temp, naming).await?;
        self.metrics.record_success(size_bytes);

        Ok(SavedAudioFile {
            filename,
            size_bytes,
            modified_at: Some(jiff::Timestamp::now().to_string()),
        })
    }

    /// Link the finished temp file under the first free candidate name
    ///
    /// Candidates are drawn one at a time, so the sequence only advances
    /// past a name that was actually tried.
    async fn publish(&self, temp: tempfile::NamedTempFile, naming: Naming) -> Result<String, StoreError> {
        let root = self.root.clone();
        let sequence = Arc::clone(&self.sequence);
        let extension = self.extension;

        tokio::task::spawn_blocking(move || {
            let mut temp = temp;
            for attempt in 0..MAX_PUBLISH_ATTEMPTS {
                let candidate = naming.candidate(attempt, &sequence, extension);
                match temp.persist_noclobber(root.join(&candidate)) {
                    Ok(_) => return Ok(candidate),
                    Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => temp = e.file,
                    Err(e) => return Err(StoreError::Io(e.error)),
                }
            }
            Err(StoreError::NameExhausted(root.display().to_string()))
        })
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))?
    }

    /// Saved files, newest first
    pub async fn list_saved(&self) -> Result<Vec<SavedAudioFile>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if filename.starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                // removed between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let modified = metadata
                .modified()
                .ok()
                .and_then(|time| jiff::Timestamp::try_from(time).ok());

            files.push((
                modified,
                SavedAudioFile {
                    filename,
                    size_bytes: metadata.len(),
                    modified_at: modified.map(|ts| ts.to_string()),
                },
            ));
        }

        files.sort_by(|(a_time, a), (b_time, b)| b_time.cmp(a_time).then_with(|| a.filename.cmp(&b.filename)));

        Ok(files.into_iter().map(|(_, file)| file).collect())
    }

    /// Resolve a filename to a regular file inside the store
    ///
    /// Returns `Ok(None)` if there is no such file; names that could escape
    /// the directory are rejected before touching the filesystem.
    pub async fn get_path(&self, filename: &str) -> Result<Option<PathBuf>, StoreError> {
        validate_filename(filename)?;

        let path = self.root.join(filename);
        match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a file; `false` when it did not exist
    pub async fn delete(&self, filename: &str) -> Result<bool, StoreError> {
        let Some(path) = self.get_path(filename).await? else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(filename, "audio file deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

enum Naming {
    Custom { stem: String, extension: String },
    Generated { slug: String, timestamp: String },
}

impl Naming {
    /// Candidate `attempt` for this naming scheme
    ///
    /// Generated names draw a fresh value from the store-wide sequence on
    /// every call, so concurrent downloads within the same second differ.
    fn candidate(&self, attempt: u64, sequence: &AtomicU64, default_extension: &str) -> String {
        match self {
            Self::Custom { stem, extension } if attempt == 0 => format!("{stem}.{extension}"),
            Self::Custom { stem, extension } => format!("{stem}_{attempt}.{extension}"),
            Self::Generated { slug, timestamp } => {
                let seq = sequence.fetch_add(1, Ordering::Relaxed);
                format!("{slug}_{timestamp}_{seq:04}.{default_extension}")
            }
        }
    }
}

/// Reject names that are not a single visible path component
fn validate_filename(filename: &str) -> Result<(), StoreError> {
    let mut components = Path::new(filename).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();

    let valid = single_normal
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\', '\0'])
        && !filename.contains("..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidFilename(filename.to_string()))
    }
}

/// Lowercase ASCII slug of a prompt, `music` when nothing survives
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_LEN);

    for c in text.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "music".to_string()
    } else {
        slug.to_string()
    }
}

/// Reduce a client-supplied filename to a safe stem and extension
///
/// Only the final path component is considered. Returns `None` when no
/// usable characters remain.
fn sanitize_custom(name: &str, default_extension: &str) -> Option<(String, String)> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            (stem, ext.to_ascii_lowercase())
        }
        _ => (base, default_extension.to_string()),
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_CUSTOM_STEM_LEN)
        .collect();
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        None
    } else {
        Some((cleaned.to_string(), extension))
    }
}
