//! Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout::{MASTER_SHEET, REQUEST_SHEET};
use crate::span::YearSpan;

/// What to do when a stage finds an output left by a previous run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingOutputPolicy {
    /// Leave the output alone and skip the key.
    #[default]
    Skip,
    /// Delete the output and rebuild it. Requires operator confirmation.
    Replace,
}

/// Header names of the entity reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceColumns {
    pub name: String,
    pub code: String,
    pub code2: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            name: "Country_name".to_string(),
            code: "Country_code".to_string(),
            code2: "Country_code2".to_string(),
        }
    }
}

/// Directory and file names used by each stage, relative to the work root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDirs {
    /// Per-company workbooks (entities stage input).
    pub companies: PathBuf,
    /// Per-variable-group workbooks (entities output, variables input).
    pub variables: PathBuf,
    /// Per-entity-per-span workbooks (variables output, years input).
    pub spans: PathBuf,
    /// Per-entity master tables (years output, combine input).
    pub masters: PathBuf,
    pub reference_table: PathBuf,
    pub processed_log: PathBuf,
    pub combined_csv: PathBuf,
    pub combined_xlsx: PathBuf,
}

impl Default for StageDirs {
    fn default() -> Self {
        Self {
            companies: PathBuf::from("data-split-by-entity"),
            variables: PathBuf::from("data-split-by-variable"),
            spans: PathBuf::from("data"),
            masters: PathBuf::from("data-2015-2024"),
            reference_table: PathBuf::from("country-code.xlsx"),
            processed_log: PathBuf::from("processed_log.txt"),
            combined_csv: PathBuf::from("all-countries.csv"),
            combined_xlsx: PathBuf::from("all-countries.xlsx"),
        }
    }
}

impl StageDirs {
    /// Resolves every relative entry against `root`.
    pub fn resolve(&self, root: &Path) -> StageDirs {
        let join = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            }
        };
        StageDirs {
            companies: join(&self.companies),
            variables: join(&self.variables),
            spans: join(&self.spans),
            masters: join(&self.masters),
            reference_table: join(&self.reference_table),
            processed_log: join(&self.processed_log),
            combined_csv: join(&self.combined_csv),
            combined_xlsx: join(&self.combined_xlsx),
        }
    }
}

/// Options shared by every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Companies expected per (entity, span, tag) key; indices `1..=N`.
    pub expected_companies: u32,
    pub start_year: i32,
    pub end_year: i32,
    /// Descriptor series prefix; company `n` must declare `{prefix}{n}`.
    pub series_prefix: String,
    pub key_column: String,
    pub placeholder: String,
    pub descriptor_sheet: String,
    pub master_sheet: String,
    pub reference: ReferenceColumns,
    pub dirs: StageDirs,
    pub existing: ExistingOutputPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            expected_companies: 1,
            start_year: 2015,
            end_year: 2024,
            series_prefix: "FDEALL".to_string(),
            key_column: "Type".to_string(),
            placeholder: ".".to_string(),
            descriptor_sheet: REQUEST_SHEET.to_string(),
            master_sheet: MASTER_SHEET.to_string(),
            reference: ReferenceColumns::default(),
            dirs: StageDirs::default(),
            existing: ExistingOutputPolicy::default(),
        }
    }
}

impl PipelineOptions {
    /// The global year window every entity must cover.
    pub fn window(&self) -> crate::Result<YearSpan> {
        YearSpan::new(self.start_year, self.end_year)
    }

    pub fn replaces_existing(&self) -> bool {
        self.existing == ExistingOutputPolicy::Replace
    }
}
