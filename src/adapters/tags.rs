//! Metadata tagging collaborator.
//!
//! Field values render from the source file's modification time plus the
//! configured text templates. The comment field *name* is part of the
//! template config because the right name depends on the consuming tool.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use tokio::process::Command;

use super::Tagger;
use crate::config::TagConfig;

/// Fully rendered tag fields for one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub album: String,
    pub year: String,
    pub date: String,
    pub comment_field: String,
    pub comment: String,
    pub genre: String,
}

impl TagSet {
    /// Render the configured templates against a source modification time.
    pub fn render(config: &TagConfig, modified: DateTime<Tz>) -> Self {
        Self {
            album: render_template(&config.album, modified),
            year: modified.format("%Y").to_string(),
            date: modified.format("%Y-%m-%d").to_string(),
            comment_field: config.comment_field.clone(),
            comment: render_template(&config.comment, modified),
            genre: config.genre.clone(),
        }
    }
}

/// Substitute `{year}`, `{month}`, `{day}` and `{date}` tokens
fn render_template(template: &str, dt: DateTime<Tz>) -> String {
    template
        .replace("{year}", &dt.format("%Y").to_string())
        .replace("{month}", &dt.format("%B").to_string())
        .replace("{day}", &dt.day().to_string())
        .replace("{date}", &dt.format("%Y-%m-%d").to_string())
}

/// Tagger backed by the metaflac command-line tool
pub struct MetaflacTagger {
    program: String,
}

impl MetaflacTagger {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for MetaflacTagger {
    fn default() -> Self {
        Self::new("metaflac")
    }
}

#[async_trait]
impl Tagger for MetaflacTagger {
    fn name(&self) -> &str {
        &self.program
    }

    async fn tag(&self, output: &Path, tags: &TagSet) -> Result<()> {
        let mut command = Command::new(&self.program);

        for field in ["ALBUM", "YEAR", "DATE", "GENRE", tags.comment_field.as_str()] {
            command.arg(format!("--remove-tag={field}"));
        }
        command
            .arg(format!("--set-tag=ALBUM={}", tags.album))
            .arg(format!("--set-tag=YEAR={}", tags.year))
            .arg(format!("--set-tag=DATE={}", tags.date))
            .arg(format!("--set-tag={}={}", tags.comment_field, tags.comment))
            .arg(format!("--set-tag=GENRE={}", tags.genre))
            .arg(output);

        let result = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to spawn tagger '{}'", self.program))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!(
                "{} failed for {}: {}",
                self.program,
                output.display(),
                stderr.trim()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Tz> {
        chrono_tz::America::Los_Angeles
            .with_ymd_and_hms(2019, 7, 4, 10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_render_tokens() {
        let rendered = render_template("{date}: offered on {month} {day}, {year}", sample_time());
        assert_eq!(rendered, "2019-07-04: offered on July 4, 2019");
    }

    #[test]
    fn test_tag_set_from_defaults() {
        let tags = TagSet::render(&TagConfig::default(), sample_time());

        assert_eq!(tags.album, "2019 Recordings");
        assert_eq!(tags.year, "2019");
        assert_eq!(tags.date, "2019-07-04");
        assert_eq!(tags.comment, "Recorded on July 4, 2019.");
        assert_eq!(tags.comment_field, "COMMENTS");
        assert_eq!(tags.genre, "Speech");
    }

    #[test]
    fn test_comment_field_name_follows_config() {
        let config = TagConfig {
            comment_field: "COMMENT".to_string(),
            ..TagConfig::default()
        };
        let tags = TagSet::render(&config, sample_time());
        assert_eq!(tags.comment_field, "COMMENT");
    }
}
