//! Key-preserving outer join of two sheets.
//!
//! Rows of the existing sheet keep their positions; keys found only in the
//! source are appended after them in source order. Source columns other than
//! the key are appended to the right of the existing columns and never
//! overwrite them. Every cell created by a one-sided key is filled with the
//! placeholder marker.

use std::collections::HashMap;
use std::fmt;

use panel_model::{CellValue, Sheet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinSide {
    Existing,
    Source,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => f.write_str("merged sheet"),
            Self::Source => f.write_str("source sheet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("{side} has no '{column}' header")]
    KeyColumnMissing { side: JoinSide, column: String },
    #[error("{side} repeats key '{key}' at row {row}")]
    DuplicateKey {
        side: JoinSide,
        key: String,
        row: usize,
    },
}

/// A key present only in the source, with its 1-based row in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedKey {
    pub key: String,
    pub row: usize,
}

/// A key absent from the source, with its 1-based row in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingKey {
    pub key: String,
    pub row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReport {
    pub added: Vec<AddedKey>,
    pub missing: Vec<MissingKey>,
    /// Source rows without a key value; they cannot be placed and are dropped.
    pub dropped_source_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub sheet: Sheet,
    pub report: JoinReport,
}

struct KeyedRows {
    header: Vec<CellValue>,
    key_col: usize,
    rows: Vec<Vec<CellValue>>,
}

impl KeyedRows {
    fn new(sheet: &Sheet, key_column: &str, side: JoinSide) -> Result<Self, JoinError> {
        let mut rows = sheet.used_rows();
        let missing = || JoinError::KeyColumnMissing {
            side,
            column: key_column.to_string(),
        };
        if rows.is_empty() {
            return Err(missing());
        }
        let header = rows.remove(0);
        let key_col = header
            .iter()
            .position(|cell| cell.as_key().as_deref() == Some(key_column))
            .ok_or_else(missing)?;
        Ok(Self {
            header,
            key_col,
            rows,
        })
    }

    fn key(&self, idx: usize) -> Option<String> {
        self.rows[idx][self.key_col].as_key()
    }

    /// First-seen index of every key; a repeated key is an error.
    fn index(&self, side: JoinSide) -> Result<HashMap<String, usize>, JoinError> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for (idx, cells) in self.rows.iter().enumerate() {
            let Some(key) = cells[self.key_col].as_key() else {
                continue;
            };
            if index.contains_key(&key) {
                return Err(JoinError::DuplicateKey {
                    side,
                    key,
                    row: idx + 2,
                });
            }
            index.insert(key, idx);
        }
        Ok(index)
    }

    fn value_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.header.len()).filter(|col| *col != self.key_col)
    }
}

/// Joins `source` onto `existing` by the `key_column` header.
///
/// The output sheet keeps the name of `existing`.
pub fn outer_join_on_key(
    existing: &Sheet,
    source: &Sheet,
    key_column: &str,
    placeholder: &str,
) -> Result<JoinOutcome, JoinError> {
    let left = KeyedRows::new(existing, key_column, JoinSide::Existing)?;
    let right = KeyedRows::new(source, key_column, JoinSide::Source)?;
    let left_index = left.index(JoinSide::Existing)?;
    let right_index = right.index(JoinSide::Source)?;

    let fill = CellValue::text(placeholder);
    let right_cols: Vec<usize> = right.value_columns().collect();
    let gap = || vec![fill.clone(); right_cols.len()];
    let source_values = |idx: usize| -> Vec<CellValue> {
        right_cols
            .iter()
            .map(|col| right.rows[idx][*col].clone())
            .collect()
    };

    let mut report = JoinReport::default();
    let mut header = left.header.clone();
    header.extend(right_cols.iter().map(|col| right.header[*col].clone()));
    let mut rows = Vec::with_capacity(left.rows.len() + right.rows.len() + 1);
    rows.push(header);

    for (idx, cells) in left.rows.iter().enumerate() {
        let mut row = cells.clone();
        match left.key(idx) {
            Some(key) => match right_index.get(&key) {
                Some(src_idx) => row.extend(source_values(*src_idx)),
                None => {
                    report.missing.push(MissingKey {
                        key,
                        row: rows.len() + 1,
                    });
                    row.extend(gap());
                }
            },
            None => row.extend(gap()),
        }
        rows.push(row);
    }

    for (idx, cells) in right.rows.iter().enumerate() {
        let Some(key) = right.key(idx) else {
            if cells.iter().any(|cell| !cell.is_blank()) {
                report.dropped_source_rows += 1;
            }
            continue;
        };
        if left_index.contains_key(&key) {
            continue;
        }
        let mut row = vec![fill.clone(); left.header.len()];
        row[left.key_col] = cells[right.key_col].clone();
        row.extend(source_values(idx));
        report.added.push(AddedKey {
            key,
            row: rows.len() + 1,
        });
        rows.push(row);
    }

    Ok(JoinOutcome {
        sheet: Sheet::from_rows(existing.name(), rows),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            name,
            rows.iter()
                .map(|row| row.iter().map(|v| CellValue::text(*v)).collect())
                .collect(),
        )
    }

    fn texts(sheet: &Sheet) -> Vec<Vec<String>> {
        sheet
            .used_rows()
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn outer_join_preserves_order_and_fills_gaps() {
        let existing = sheet(
            "2015",
            &[&["Type", "A1"], &["a", "1"], &["b", "2"], &["c", "3"]],
        );
        let source = sheet(
            "2015",
            &[&["Type", "B1"], &["b", "20"], &["c", "30"], &["d", "40"]],
        );
        let outcome = outer_join_on_key(&existing, &source, "Type", ".").unwrap();
        assert_eq!(
            texts(&outcome.sheet),
            vec![
                vec!["Type", "A1", "B1"],
                vec!["a", "1", "."],
                vec!["b", "2", "20"],
                vec!["c", "3", "30"],
                vec!["d", ".", "40"],
            ]
        );
        assert_eq!(
            outcome.report.added,
            vec![AddedKey {
                key: "d".to_string(),
                row: 5
            }]
        );
        assert_eq!(
            outcome.report.missing,
            vec![MissingKey {
                key: "a".to_string(),
                row: 2
            }]
        );
    }

    #[test]
    fn new_keys_follow_source_order() {
        let existing = sheet("S", &[&["Type", "A1"], &["m", "1"]]);
        let source = sheet("S", &[&["Type", "B1"], &["z", "9"], &["k", "8"]]);
        let outcome = outer_join_on_key(&existing, &source, "Type", ".").unwrap();
        let keys: Vec<_> = outcome.report.added.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "k"]);
    }

    #[test]
    fn key_column_may_sit_anywhere() {
        let existing = sheet("S", &[&["V1", "Type"], &["1", "x"]]);
        let source = sheet("S", &[&["W1", "W2", "Type"], &["7", "8", "x"]]);
        let outcome = outer_join_on_key(&existing, &source, "Type", ".").unwrap();
        assert_eq!(
            texts(&outcome.sheet),
            vec![vec!["V1", "Type", "W1", "W2"], vec!["1", "x", "7", "8"]]
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let existing = sheet("S", &[&["Type", "A1"], &["a", "1"]]);
        let source = sheet("S", &[&["Type", "B1"], &["a", "1"], &["a", "2"]]);
        let err = outer_join_on_key(&existing, &source, "Type", ".").unwrap_err();
        assert_eq!(
            err,
            JoinError::DuplicateKey {
                side: JoinSide::Source,
                key: "a".to_string(),
                row: 3
            }
        );
    }

    #[test]
    fn missing_key_header_is_rejected() {
        let existing = sheet("S", &[&["Type", "A1"], &["a", "1"]]);
        let source = sheet("S", &[&["Code", "B1"], &["a", "1"]]);
        let err = outer_join_on_key(&existing, &source, "Type", ".").unwrap_err();
        assert_eq!(err.to_string(), "source sheet has no 'Type' header");
    }

    #[test]
    fn keyless_source_rows_are_dropped() {
        let existing = sheet("S", &[&["Type", "A1"], &["a", "1"]]);
        let source = sheet("S", &[&["Type", "B1"], &["", "5"], &["a", "2"]]);
        let outcome = outer_join_on_key(&existing, &source, "Type", ".").unwrap();
        assert_eq!(outcome.report.dropped_source_rows, 1);
        assert_eq!(outcome.sheet.extent().rows, 2);
    }
}
