//! Per-key processing state.

use std::path::{Path, PathBuf};

use panel_ingest::{build_output_name, group_key};
use panel_model::YearSpan;
use tracing::warn;

/// State owned by the stage while it resolves one output key.
///
/// Nothing here outlives the key: a new context is created for every
/// (entity, span[, tags]) group and consumed when its outcome is recorded.
#[derive(Debug, Clone)]
pub struct KeyContext {
    pub key: String,
    pub entity: String,
    pub span: YearSpan,
    pub output: PathBuf,
    warnings: Vec<String>,
}

impl KeyContext {
    pub fn new(entity: &str, span: YearSpan, tags: Option<&str>, output_dir: &Path) -> Self {
        Self {
            key: group_key(entity, span, tags),
            entity: entity.to_string(),
            span,
            output: output_dir.join(build_output_name(entity, span, tags)),
            warnings: Vec::new(),
        }
    }

    /// Logs a skip-and-continue condition and keeps it for the stage report.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(key = %self.key, "{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Warnings prefixed with the key, ready for a stage report.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
            .into_iter()
            .map(|message| format!("{}: {message}", self.key))
            .collect()
    }
}
