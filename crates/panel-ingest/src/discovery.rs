//! Workbook discovery in stage directories.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

const WORKBOOK_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// True for the lock files office suites leave next to open workbooks.
pub fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"))
}

/// True for `.xlsx` and `.xlsm` files (case-insensitive).
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Lists all workbook files in a directory.
///
/// Lock files are never listed. Returns files sorted by filename.
pub fn list_workbook_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        if !path.is_file() || is_lock_file(&path) {
            continue;
        }
        if is_workbook(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_workbook_files() {
        let dir = TempDir::new().unwrap();
        for name in [
            "US2-2015A.xlsx",
            "US1-2015A.xlsm",
            "~$US1-2015A.xlsx",
            "notes.txt",
            "FR1-2015A.XLSX",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.xlsx")).unwrap();

        let files = list_workbook_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["FR1-2015A.XLSX", "US1-2015A.xlsm", "US2-2015A.xlsx"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        let err = list_workbook_files(&missing).unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
    }
}
