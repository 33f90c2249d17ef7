//! Append-only record of master tables already folded into the combined CSV.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};

/// One file name per line, appended and flushed after every successful write.
#[derive(Debug, Clone, Default)]
pub struct ProcessedLog {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl ProcessedLog {
    /// Loads the log, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => {
                return Err(MergeError::ProcessedLog {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Records `name` durably.
    pub fn append(&mut self, name: &str) -> Result<()> {
        let io_err = |source| MergeError::ProcessedLog {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{name}").map_err(io_err)?;
        file.flush().map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        self.entries.insert(name.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
