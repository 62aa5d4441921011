//! Output sinks for the finished study-plan document.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::Regex;

static RE_UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid filename regex"));

/// Marker inserted before the extension of forced-output files.
pub const LIMITED_MARKER: &str = "_LIMITED";

/// Destination for the final document.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Persist `document`, returning where it was written.
    async fn persist(&self, document: &str, suggested_filename: &str) -> Result<PathBuf>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn OutputSink) {}
};

/// Writes each document as a file inside a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn persist(&self, document: &str, suggested_filename: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create output directory {}", self.dir.display()))?;
        let path = self.dir.join(suggested_filename);
        tokio::fs::write(&path, document)
            .await
            .with_context(|| format!("failed to write study plan to {}", path.display()))?;
        Ok(path)
    }
}

/// Discards every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl OutputSink for NullSink {
    async fn persist(&self, _document: &str, suggested_filename: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(suggested_filename))
    }
}

/// Reduce a topic to characters that are safe in a filename.
pub fn safe_topic(topic: &str) -> String {
    RE_UNSAFE_FILENAME_CHARS
        .replace_all(topic, "")
        .trim()
        .replace(' ', "_")
}

/// `study_plan_<topic>_<YYYYmmdd_HHMMSS>[_LIMITED].txt`
pub fn suggested_filename(topic: &str, at: DateTime<Local>, limited: bool) -> String {
    format!(
        "study_plan_{}_{}{}.txt",
        safe_topic(topic),
        at.format("%Y%m%d_%H%M%S"),
        if limited { LIMITED_MARKER } else { "" }
    )
}
