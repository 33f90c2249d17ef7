//! Pipeline stages over panel workbooks.
//!
//! Each stage reads one directory, resolves every output key in turn and
//! returns a [`StageReport`](panel_model::StageReport):
//!
//! 1. [`merge_entities`] appends company workbooks onto company 1.
//! 2. [`audit_row_keys`] reports row keys missing from a variable group.
//! 3. [`merge_variables`] outer-joins variable groups onto group `A`.
//! 4. [`aggregate_years`] stacks every year of an entity into a master table.
//! 5. [`combine_master_tables`] folds master tables into one CSV.
//!
//! Failures are scoped: a skipped unit is logged and recorded, a failed key
//! leaves no output behind, and only process-fatal errors are returned.

mod audit;
mod combine;
mod context;
mod entity;
mod error;
mod join;
mod processed_log;
mod stage;
mod variable;
mod year;

// === Error Types ===
pub use error::{ErrorScope, MergeError, Result};

// === Per-key State ===
pub use context::KeyContext;

// === Outer Join ===
pub use join::{
    AddedKey, JoinError, JoinOutcome, JoinReport, JoinSide, MissingKey, outer_join_on_key,
};

// === Stages ===
pub use audit::{AuditReport, KeyGap, KeyLocation, audit_row_keys, audit_sheet};
pub use combine::{combine_master_tables, export_combined_xlsx, sheet_to_frame};
pub use entity::merge_entities;
pub use variable::merge_variables;
pub use year::{EntityAccumulator, aggregate_years};

// === Processed Log ===
pub use processed_log::ProcessedLog;
