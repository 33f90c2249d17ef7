//! Row-key coverage audit of variable-group workbooks.
//!
//! Before the variable merge, every variable group of an (entity, span) should
//! list the same row keys on every sheet. The audit reports, for each key a
//! group lacks, which other groups carry it and on which row.

use std::collections::BTreeMap;
use std::time::Instant;

use panel_ingest::{group_key, parse_variable_file, read_workbook};
use panel_model::{KeyOutcome, PipelineOptions, Sheet, SourceFile, StageReport, Workbook};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::error::Result;
use crate::stage::{discover, file_name};

/// Where a row key was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLocation {
    pub group: String,
    /// 1-based spreadsheet row.
    pub row: usize,
}

/// A row key missing from one variable group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGap {
    pub key: String,
    pub sheet: String,
    pub group: String,
    pub row_key: String,
    pub present_in: Vec<KeyLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub report: StageReport,
    pub gaps: Vec<KeyGap>,
}

/// Row keys of a sheet with their 1-based rows, or `None` without a key header.
fn row_keys(sheet: &Sheet, key_column: &str) -> Option<Vec<(String, usize)>> {
    let rows = sheet.used_rows();
    let header = rows.first()?;
    let key_col = header
        .iter()
        .position(|cell| cell.as_key().as_deref() == Some(key_column))?;
    Some(
        rows.iter()
            .enumerate()
            .skip(1)
            .filter_map(|(idx, row)| row[key_col].as_key().map(|key| (key, idx + 1)))
            .collect(),
    )
}

/// Compares one sheet across groups and returns the gaps found.
pub fn audit_sheet(
    key: &str,
    sheet: &str,
    groups: &[(String, Vec<(String, usize)>)],
) -> Vec<KeyGap> {
    let mut locations: BTreeMap<&str, Vec<KeyLocation>> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (group, keys) in groups {
        for (row_key, row) in keys {
            let seen = locations.entry(row_key.as_str()).or_default();
            if seen.is_empty() {
                order.push(row_key.as_str());
            }
            if seen.iter().all(|location| &location.group != group) {
                seen.push(KeyLocation {
                    group: group.clone(),
                    row: *row,
                });
            }
        }
    }

    let mut gaps = Vec::new();
    for (group, keys) in groups {
        for row_key in &order {
            if keys.iter().any(|(k, _)| k == row_key) {
                continue;
            }
            gaps.push(KeyGap {
                key: key.to_string(),
                sheet: sheet.to_string(),
                group: group.clone(),
                row_key: (*row_key).to_string(),
                present_in: locations.get(row_key).cloned().unwrap_or_default(),
            });
        }
    }
    gaps
}

/// Audits row-key coverage across the variable groups of every (entity, span).
pub fn audit_row_keys(options: &PipelineOptions) -> Result<AuditReport> {
    let dirs = &options.dirs;
    let stage_span = info_span!("audit", input = %dirs.variables.display());
    let _stage_guard = stage_span.enter();
    let started = Instant::now();

    let mut audit = AuditReport {
        report: StageReport::new("audit"),
        gaps: Vec::new(),
    };
    let mut blocks: BTreeMap<String, BTreeMap<String, SourceFile>> = BTreeMap::new();
    for path in discover(&dirs.variables)? {
        let Some(source) = parse_variable_file(&path) else {
            warn!(file = %path.display(), "file name not recognised, skipped");
            audit
                .report
                .warn(format!("{}: file name not recognised, skipped", file_name(&path)));
            continue;
        };
        let key = group_key(&source.entity, source.span, None);
        let tags = source.tags.clone().unwrap_or_default();
        blocks.entry(key).or_default().entry(tags).or_insert(source);
    }

    for (key, sources) in &blocks {
        let key_span = info_span!("key", key = %key);
        let _key_guard = key_span.enter();

        let mut workbooks: Vec<(String, Workbook)> = Vec::new();
        for (tags, source) in sources {
            match read_workbook(&source.path) {
                Ok(workbook) => workbooks.push((tags.clone(), workbook)),
                Err(err) => {
                    warn!(file = %source.path.display(), error = %err, "unreadable, skipped");
                    audit
                        .report
                        .push(KeyOutcome::skipped(source.file_name(), err.to_string()));
                }
            }
        }
        let Some((_, first)) = workbooks.first() else {
            continue;
        };

        let mut key_gaps = Vec::new();
        for sheet_name in first.data_sheet_names(&options.descriptor_sheet) {
            let mut groups = Vec::with_capacity(workbooks.len());
            for (tags, workbook) in &workbooks {
                let keys = workbook
                    .sheet(&sheet_name)
                    .and_then(|sheet| row_keys(sheet, &options.key_column));
                match keys {
                    Some(keys) => groups.push((tags.clone(), keys)),
                    None => {
                        let message = format!(
                            "{key}: group {tags} has no sheet '{sheet_name}' with a '{}' column",
                            options.key_column
                        );
                        warn!("{message}");
                        audit.report.warn(message);
                    }
                }
            }
            key_gaps.extend(audit_sheet(key, &sheet_name, &groups));
        }

        for gap in &key_gaps {
            warn!(
                sheet = %gap.sheet,
                group = %gap.group,
                row_key = %gap.row_key,
                present_in = ?gap.present_in,
                "row key missing from group"
            );
        }
        let detail = format!("{} groups, {} missing row keys", workbooks.len(), key_gaps.len());
        info!(groups = workbooks.len(), gaps = key_gaps.len(), "row keys audited");
        audit.report.push(KeyOutcome::checked(key, detail));
        audit.gaps.extend(key_gaps);
    }

    info!(
        checked = audit.report.checked_count(),
        gaps = audit.gaps.len(),
        duration_ms = started.elapsed().as_millis(),
        "audit stage complete"
    );
    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::CellValue;

    fn keys(values: &[(&str, usize)]) -> Vec<(String, usize)> {
        values.iter().map(|(k, r)| ((*k).to_string(), *r)).collect()
    }

    #[test]
    fn reports_keys_missing_from_each_group() {
        let groups = vec![
            ("A".to_string(), keys(&[("x", 2), ("y", 3)])),
            ("B".to_string(), keys(&[("y", 2), ("z", 3)])),
        ];
        let gaps = audit_sheet("DK-2015", "2015", &groups);
        let summary: Vec<(&str, &str)> = gaps
            .iter()
            .map(|gap| (gap.group.as_str(), gap.row_key.as_str()))
            .collect();
        assert_eq!(summary, vec![("A", "z"), ("B", "x")]);
        assert_eq!(
            gaps[0].present_in,
            vec![KeyLocation {
                group: "B".to_string(),
                row: 3
            }]
        );
    }

    #[test]
    fn row_keys_need_the_key_header() {
        let sheet = Sheet::from_rows(
            "2015",
            vec![
                vec![CellValue::text("Type"), CellValue::text("V1")],
                vec![CellValue::text("a"), CellValue::number(1.0)],
                vec![CellValue::Empty, CellValue::number(2.0)],
                vec![CellValue::text("b"), CellValue::number(3.0)],
            ],
        );
        assert_eq!(row_keys(&sheet, "Type"), Some(keys(&[("a", 2), ("b", 4)])));
        assert_eq!(row_keys(&sheet, "Code"), None);
    }
}
