//! sox converter collaborator.
//!
//! Invokes `sox -V3 --no-clobber --norm <input> <output>` and captures the
//! combined output stream for the sidecar log. `--no-clobber` backs up the
//! allocator's never-overwrite invariant at the tool level.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{ConvertOutcome, Converter};

/// Converter backed by the sox command-line tool
pub struct SoxConverter {
    program: String,
}

impl SoxConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SoxConverter {
    fn default() -> Self {
        Self::new("sox")
    }
}

#[async_trait]
impl Converter for SoxConverter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConvertOutcome> {
        let result = Command::new(&self.program)
            .arg("-V3")
            .arg("--no-clobber")
            .arg("--norm")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to spawn converter '{}'", self.program))?;

        let mut log = String::from_utf8_lossy(&result.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&result.stderr));

        Ok(ConvertOutcome {
            success: result.status.success(),
            log,
        })
    }
}
