//! Entity reference table: display name to short codes.

use std::collections::BTreeMap;
use std::path::Path;

use panel_model::{ReferenceColumns, Sheet};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::xlsx::read_first_sheet;

/// Codes attached to every master table row of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCodes {
    pub code: String,
    pub code2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    codes: BTreeMap<String, EntityCodes>,
}

impl ReferenceTable {
    /// Loads the first sheet of the reference workbook.
    pub fn load(path: &Path, columns: &ReferenceColumns) -> Result<Self> {
        if !path.is_file() {
            return Err(IngestError::ReferenceNotFound {
                path: path.to_path_buf(),
            });
        }
        let sheet = read_first_sheet(path)?;
        let table = Self::from_sheet(&sheet, columns, path)?;
        debug!(path = %path.display(), entries = table.len(), "loaded reference table");
        Ok(table)
    }

    pub fn from_sheet(sheet: &Sheet, columns: &ReferenceColumns, path: &Path) -> Result<Self> {
        let rows = sheet.used_rows();
        let Some(header) = rows.first() else {
            return Err(IngestError::ReferenceEmpty {
                path: path.to_path_buf(),
            });
        };
        let position = |column: &str| {
            header
                .iter()
                .position(|cell| cell.as_key().as_deref() == Some(column))
                .ok_or_else(|| IngestError::ReferenceColumnMissing {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        let name_col = position(&columns.name)?;
        let code_col = position(&columns.code)?;
        let code2_col = position(&columns.code2)?;

        let mut codes = BTreeMap::new();
        for row in rows.iter().skip(1) {
            let Some(name) = row[name_col].as_key() else {
                continue;
            };
            codes.entry(name).or_insert_with(|| EntityCodes {
                code: row[code_col].as_key().unwrap_or_default(),
                code2: row[code2_col].as_key().unwrap_or_default(),
            });
        }
        Ok(Self { codes })
    }

    /// Codes for a display name; blank codes when the name is unknown.
    pub fn lookup(&self, display_name: &str) -> EntityCodes {
        self.codes
            .get(display_name.trim())
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.codes.contains_key(display_name.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Display name of an entity: inner hyphens become spaces (`South Korea`).
pub fn display_name(entity: &str) -> String {
    entity.replace('-', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::CellValue;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            "codes",
            rows.iter()
                .map(|row| row.iter().map(|v| CellValue::text(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn looks_up_codes_by_display_name() {
        let sheet = sheet(&[
            &["Country_code", "Country_name", "Country_code2"],
            &["KR", "South Korea", "KOR"],
            &["DK", " Denmark ", "DNK"],
        ]);
        let table =
            ReferenceTable::from_sheet(&sheet, &ReferenceColumns::default(), Path::new("c.xlsx"))
                .unwrap();
        assert_eq!(
            table.lookup(&display_name("South-Korea")),
            EntityCodes {
                code: "KR".to_string(),
                code2: "KOR".to_string()
            }
        );
        assert_eq!(table.lookup("Denmark").code, "DK");
        assert_eq!(table.lookup("Atlantis"), EntityCodes::default());
        assert!(!table.contains("Atlantis"));
    }

    #[test]
    fn missing_column_is_reported() {
        let sheet = sheet(&[&["Country_name", "Country_code"], &["Denmark", "DK"]]);
        let err =
            ReferenceTable::from_sheet(&sheet, &ReferenceColumns::default(), Path::new("c.xlsx"))
                .unwrap_err();
        assert!(matches!(
            err,
            IngestError::ReferenceColumnMissing { ref column, .. } if column == "Country_code2"
        ));
    }
}
