//! Collaborator interfaces for external tools.
//!
//! Conversion and tagging are done by external programs (sox, metaflac).
//! Both sit behind traits so the transfer pipeline can be exercised in tests
//! without either tool installed.

pub mod sox;
pub mod tags;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

pub use sox::SoxConverter;
pub use tags::{MetaflacTagger, TagSet};

/// Outcome of one converter invocation
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    /// Whether the converter exited successfully
    pub success: bool,

    /// Combined stdout and stderr, persisted as the sidecar log
    pub log: String,
}

/// External audio converter
#[async_trait]
pub trait Converter: Send + Sync {
    /// Human-readable converter name
    fn name(&self) -> &str;

    /// Convert `input` into `output`. A spawn failure is an `Err`; a clean
    /// spawn with a non-zero exit is `Ok` with `success: false`, so the
    /// caller can still persist the tool's output.
    async fn convert(&self, input: &Path, output: &Path) -> Result<ConvertOutcome>;
}

/// External metadata writer
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Human-readable tagger name
    fn name(&self) -> &str;

    /// Write `tags` into the file at `output`
    async fn tag(&self, output: &Path, tags: &TagSet) -> Result<()>;
}
