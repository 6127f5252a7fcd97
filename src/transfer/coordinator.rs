//! Transfer pipeline for one detected file.
//!
//! Sequence: move into the queue area, convert, tag. The move is the commit
//! point: once the file leaves the watch directory it can never be detected
//! as a new arrival again, which is what prevents double-processing. A crash
//! after the move leaves the file recoverable in the queue area; an operator
//! reprocesses it manually.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{Converter, TagSet, Tagger};
use crate::config::Config;
use crate::transfer::paths;

/// Errors from processing one candidate
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write sidecar log {path}: {source}")]
    SidecarLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Converter could not be invoked: {0}")]
    ConverterUnavailable(anyhow::Error),

    #[error("Converter failed for {queued} (output captured in {log})")]
    ConverterFailed { queued: PathBuf, log: PathBuf },

    #[error("Converter exited cleanly but produced no usable output at {0}")]
    MissingOutput(PathBuf),

    /// The converted audio exists and is valid; only metadata is missing.
    #[error("Tagging failed for {output}: {cause}")]
    Tag {
        output: PathBuf,
        cause: anyhow::Error,
    },
}

impl TransferError {
    /// Whether a usable audio file was produced despite the error
    pub fn output_produced(&self) -> bool {
        matches!(self, TransferError::Tag { .. })
    }
}

/// A changed path that passed the completeness filter, with its modification
/// time captured once at detection. All downstream naming uses this capture;
/// re-reading later could observe a different value.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: DateTime<Tz>,
}

impl CandidateFile {
    pub fn new(path: PathBuf, modified: std::time::SystemTime, tz: Tz) -> Self {
        let modified = DateTime::<Utc>::from(modified).with_timezone(&tz);
        Self { path, modified }
    }
}

/// The paths threaded through one completed move → convert → tag sequence
#[derive(Debug, Clone)]
pub struct ProcessingRecord {
    pub original: PathBuf,
    pub queue_path: PathBuf,
    pub output_path: PathBuf,
    pub modified: DateTime<Tz>,
}

/// Orchestrates queueing, conversion and tagging for detected files.
///
/// Generic over the collaborator traits so tests can run the full sequence
/// without sox or metaflac installed.
pub struct TransferCoordinator<C, T> {
    config: Arc<Config>,
    converter: C,
    tagger: T,
}

impl<C: Converter, T: Tagger> TransferCoordinator<C, T> {
    pub fn new(config: Arc<Config>, converter: C, tagger: T) -> Self {
        Self {
            config,
            converter,
            tagger,
        }
    }

    /// Run the full sequence for one candidate.
    ///
    /// On converter failure the queued copy, its sidecar log and any partial
    /// output stay on disk for inspection; nothing is deleted and tagging is
    /// not attempted. No step is retried.
    pub async fn process(&self, candidate: &CandidateFile) -> Result<ProcessingRecord, TransferError> {
        let arrival = Utc::now().with_timezone(&self.config.timezone);
        let queue_path = paths::queue_path(&candidate.path, arrival, &self.config.queue_dir);

        create_dir_idempotent(&self.config.queue_dir).await?;

        info!(
            "Moving {} to {}",
            candidate.path.display(),
            queue_path.display()
        );
        move_file(&candidate.path, &queue_path).await?;

        let output_path = paths::allocate_output_path(
            candidate.modified,
            &self.config.output_dir,
            &self.config.converter.output_ext,
        );
        if let Some(parent) = output_path.parent() {
            create_dir_idempotent(parent).await?;
        }

        info!(
            "Converting {} to {}",
            queue_path.display(),
            output_path.display()
        );
        let outcome = self
            .converter
            .convert(&queue_path, &output_path)
            .await
            .map_err(TransferError::ConverterUnavailable)?;

        let log_path = sidecar_log_path(&queue_path);
        tokio::fs::write(&log_path, &outcome.log)
            .await
            .map_err(|source| TransferError::SidecarLog {
                path: log_path.clone(),
                source,
            })?;

        if !outcome.success {
            return Err(TransferError::ConverterFailed {
                queued: queue_path,
                log: log_path,
            });
        }
        // A missing or zero-byte output is a converter failure even when the
        // process reported success; the tagger must never see it.
        match tokio::fs::metadata(&output_path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => return Err(TransferError::MissingOutput(output_path)),
        }

        let tags = TagSet::render(&self.config.tags, candidate.modified);
        self.tagger
            .tag(&output_path, &tags)
            .await
            .map_err(|cause| TransferError::Tag {
                output: output_path.clone(),
                cause,
            })?;

        info!("Conversion complete {}", output_path.display());

        Ok(ProcessingRecord {
            original: candidate.path.clone(),
            queue_path,
            output_path,
            modified: candidate.modified,
        })
    }
}

/// Idempotent directory create
async fn create_dir_idempotent(path: &Path) -> Result<(), TransferError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| TransferError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

/// Rename `from` to `to`, falling back to copy-then-delete when the queue
/// directory sits on a different filesystem. The fallback has weaker failure
/// atomicity, so it is logged.
async fn move_file(from: &Path, to: &Path) -> Result<(), TransferError> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            warn!(
                "Queue directory is on a different filesystem; copying {} instead of renaming",
                from.display()
            );
            copy_then_delete(from, to).await
        }
        Err(source) => Err(TransferError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }),
    }
}

async fn copy_then_delete(from: &Path, to: &Path) -> Result<(), TransferError> {
    let map_err = |source| TransferError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    tokio::fs::copy(from, to).await.map_err(map_err)?;
    tokio::fs::remove_file(from).await.map_err(map_err)
}

/// The converter's combined output lands next to the queued file
fn sidecar_log_path(queue_path: &Path) -> PathBuf {
    let mut name = queue_path.as_os_str().to_os_string();
    name.push(".log");
    PathBuf::from(name)
}
