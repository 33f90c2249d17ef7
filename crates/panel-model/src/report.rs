//! Per-stage outcome reports.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Written,
    /// Inspected without producing an output (audit stage).
    Checked,
    Skipped,
    Failed,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Written => "written",
            Self::Checked => "checked",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of processing one logical key (an output file or an input file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutcome {
    /// Display key, e.g. `US-2015A` or `Denmark-2015-2017`.
    pub key: String,
    pub status: KeyStatus,
    pub detail: Option<String>,
    pub output: Option<PathBuf>,
}

impl KeyOutcome {
    pub fn written(key: impl Into<String>, output: PathBuf) -> Self {
        Self {
            key: key.into(),
            status: KeyStatus::Written,
            detail: None,
            output: Some(output),
        }
    }

    pub fn checked(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: KeyStatus::Checked,
            detail: Some(detail.into()),
            output: None,
        }
    }

    pub fn skipped(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: KeyStatus::Skipped,
            detail: Some(detail.into()),
            output: None,
        }
    }

    pub fn failed(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: KeyStatus::Failed,
            detail: Some(detail.into()),
            output: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Company indices that did not contribute to a merged key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingGroups {
    pub key: String,
    pub missing: Vec<u32>,
}

/// Summary of one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub outcomes: Vec<KeyOutcome>,
    pub warnings: Vec<String>,
    pub missing_groups: Vec<MissingGroups>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, outcome: KeyOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn count(&self, status: KeyStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    pub fn written_count(&self) -> usize {
        self.count(KeyStatus::Written)
    }

    pub fn checked_count(&self) -> usize {
        self.count(KeyStatus::Checked)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(KeyStatus::Skipped)
    }

    pub fn failed_count(&self) -> usize {
        self.count(KeyStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}
