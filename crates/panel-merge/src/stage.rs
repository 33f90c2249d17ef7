//! Plumbing shared by every merge stage.

use std::path::{Path, PathBuf};

use panel_ingest::{list_workbook_files, remove_output, write_workbook};
use panel_model::{ExistingOutputPolicy, KeyOutcome, StageReport, Workbook};
use tracing::{error, info};

use crate::context::KeyContext;
use crate::error::{MergeError, Result};

pub(crate) fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    list_workbook_files(dir).map_err(|source| MergeError::InputDirectory { source })
}

pub(crate) fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| MergeError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Applies the existing-output policy. Returns `false` when the key must be
/// skipped because a previous run already produced it.
pub(crate) fn claim_output(
    ctx: &KeyContext,
    policy: ExistingOutputPolicy,
    report: &mut StageReport,
) -> Result<bool> {
    if !ctx.output.exists() {
        return Ok(true);
    }
    match policy {
        ExistingOutputPolicy::Skip => {
            info!(key = %ctx.key, output = %ctx.output.display(), "output exists, skipping");
            report.push(KeyOutcome::skipped(&ctx.key, "output exists"));
            Ok(false)
        }
        ExistingOutputPolicy::Replace => {
            remove_output(&ctx.output).map_err(MergeError::workbook(&ctx.output))?;
            info!(key = %ctx.key, output = %ctx.output.display(), "removed previous output");
            Ok(true)
        }
    }
}

pub(crate) fn persist(ctx: &KeyContext, workbook: &Workbook) -> Result<()> {
    write_workbook(workbook, &ctx.output).map_err(MergeError::workbook(&ctx.output))
}

/// Records a key-level failure, removing any partial output. Process-fatal
/// errors are handed back to the caller.
pub(crate) fn fail_key(
    ctx: &mut KeyContext,
    err: MergeError,
    report: &mut StageReport,
) -> Result<()> {
    if err.is_process_fatal() {
        return Err(err);
    }
    error!(key = %ctx.key, error = %err, "key failed");
    if let Ok(true) = remove_output(&ctx.output) {
        info!(key = %ctx.key, output = %ctx.output.display(), "removed partial output");
    }
    report.warnings.extend(ctx.take_warnings());
    report.push(KeyOutcome::failed(&ctx.key, err.to_string()));
    Ok(())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
