//! The polling watch loop.
//!
//! Two states for the tracked directory: uninitialized (no prior snapshot;
//! the first snapshot only establishes the baseline) and tracking (every
//! cycle diffs against the prior snapshot). One cycle runs to completion,
//! conversions included, before the next snapshot is taken, so conversion
//! latency delays detection, which is the accepted tradeoff for having a
//! single actor on the queue and output directories.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::adapters::{Converter, Tagger};
use crate::config::Config;
use crate::transfer::{CandidateFile, TransferCoordinator};
use crate::watch::snapshot::{diff, snapshot, DirectorySnapshot};
use crate::watch::wav;

/// What one polling cycle did.
///
/// Failures are recorded here and logged rather than propagated; a single
/// file's failure never stops the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates handed to the coordinator that completed fully
    pub dispatched: usize,

    /// Changed files not yet complete, left for a later cycle
    pub deferred: usize,

    /// Candidates whose processing failed
    pub failed: usize,
}

/// Polling loop over the watch directory
pub struct WatchLoop<C, T> {
    config: Arc<Config>,
    coordinator: TransferCoordinator<C, T>,
    previous: Option<DirectorySnapshot>,
}

impl<C: Converter, T: Tagger> WatchLoop<C, T> {
    pub fn new(config: Arc<Config>, coordinator: TransferCoordinator<C, T>) -> Self {
        Self {
            config,
            coordinator,
            previous: None,
        }
    }

    /// Run one polling cycle: snapshot, diff, filter, dispatch.
    pub async fn cycle(&mut self) -> CycleReport {
        let current = snapshot(&self.config.watch_dir);
        let changed = diff(self.previous.as_ref(), &current);

        let mut report = CycleReport::default();

        for path in changed {
            if !self.config.is_watched_extension(&path) {
                continue;
            }

            if !wav::is_complete(&path) {
                debug!("Waiting for {}", path.display());
                report.deferred += 1;
                continue;
            }

            // Let any final filesystem buffer flush settle before the move
            tokio::time::sleep(self.config.grace).await;

            let stamp = match current.get(&path) {
                Some(s) => *s,
                None => continue,
            };
            let candidate = CandidateFile::new(path, stamp.modified, self.config.timezone);

            match self.coordinator.process(&candidate).await {
                Ok(record) => {
                    report.dispatched += 1;
                    info!(
                        "Imported {} as {}",
                        record.original.display(),
                        record.output_path.display()
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    if e.output_produced() {
                        error!("{} (converted audio is still usable)", e);
                    } else {
                        error!("{}", e);
                    }
                }
            }
        }

        self.previous = Some(current);
        report
    }

    /// Poll until `shutdown` is set. The in-flight cycle always finishes;
    /// the flag is only checked between cycles.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!(
            "Watching {} every {:?}",
            self.config.watch_dir.display(),
            self.config.poll_interval
        );

        loop {
            let report = self.cycle().await;
            if report.dispatched > 0 || report.failed > 0 {
                info!(
                    "Cycle done: {} imported, {} deferred, {} failed",
                    report.dispatched, report.deferred, report.failed
                );
            }

            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.config.poll_interval).await;

            if shutdown.load(Ordering::SeqCst) {
                break;
            }
        }

        info!("Shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ConvertOutcome;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct CopyConverter;

    #[async_trait]
    impl Converter for CopyConverter {
        fn name(&self) -> &str {
            "copy"
        }

        async fn convert(&self, input: &Path, output: &Path) -> Result<ConvertOutcome> {
            tokio::fs::copy(input, output).await?;
            Ok(ConvertOutcome {
                success: true,
                log: String::new(),
            })
        }
    }

    struct NullTagger;

    #[async_trait]
    impl Tagger for NullTagger {
        fn name(&self) -> &str {
            "null"
        }

        async fn tag(&self, _output: &Path, _tags: &crate::adapters::TagSet) -> Result<()> {
            Ok(())
        }
    }

    fn test_loop(root: &Path) -> (Arc<Config>, WatchLoop<CopyConverter, NullTagger>) {
        let file: crate::config::ConfigFile = serde_yaml::from_str(
            r#"
watch_dir: watch
queue_dir: queue
output_dir: output
log_path: wavegate.log
pid_path: wavegate.pid
grace_secs: 0
"#,
        )
        .unwrap();
        let config = Arc::new(Config::resolve(file, &root.join("config.yaml")).unwrap());
        std::fs::create_dir_all(&config.watch_dir).unwrap();

        let coordinator = TransferCoordinator::new(config.clone(), CopyConverter, NullTagger);
        (config.clone(), WatchLoop::new(config, coordinator))
    }

    fn write_complete_wav(path: &Path, body: usize) {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&(body as u32).to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data.extend_from_slice(b"fmt ");
        data.resize(8 + body, 0);
        std::fs::write(path, data).unwrap();
    }

    #[tokio::test]
    async fn test_first_cycle_only_establishes_baseline() {
        let temp = TempDir::new().unwrap();
        let (config, mut watch) = test_loop(temp.path());

        let path = config.watch_dir.join("talk.wav");
        write_complete_wav(&path, 64);

        // A file already present at startup is the baseline, not an arrival
        let report = watch.cycle().await;
        assert_eq!(report, CycleReport::default());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_unwatched_extensions_ignored() {
        let temp = TempDir::new().unwrap();
        let (config, mut watch) = test_loop(temp.path());

        watch.cycle().await;

        write_complete_wav(&config.watch_dir.join("notes.txt"), 16);
        let report = watch.cycle().await;

        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_arrival_dispatched_from_second_cycle() {
        let temp = TempDir::new().unwrap();
        let (config, mut watch) = test_loop(temp.path());

        watch.cycle().await;

        let path = config.watch_dir.join("talk.wav");
        write_complete_wav(&path, 64);

        let report = watch.cycle().await;
        assert_eq!(report.dispatched, 1);
        assert!(!path.exists());

        // Nothing left to detect on the following cycle
        let report = watch.cycle().await;
        assert_eq!(report, CycleReport::default());
    }
}
