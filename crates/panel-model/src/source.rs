//! Source file descriptors derived from file names.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::span::YearSpan;

/// One variable-group letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableTag(char);

impl VariableTag {
    /// The structural template group.
    pub const TEMPLATE: VariableTag = VariableTag('A');

    pub fn new(letter: char) -> Result<Self> {
        if !letter.is_ascii_alphabetic() {
            return Err(ModelError::InvalidTag(letter));
        }
        Ok(Self(letter.to_ascii_uppercase()))
    }

    pub fn letter(self) -> char {
        self.0
    }

    pub fn is_template(self) -> bool {
        self == Self::TEMPLATE
    }
}

impl fmt::Display for VariableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a tag list such as `"CD"` into sorted, deduplicated tags.
pub fn parse_tags(tags: &str) -> Result<Vec<VariableTag>> {
    if tags.is_empty() {
        return Err(ModelError::EmptyTags);
    }
    let mut parsed = tags
        .chars()
        .map(VariableTag::new)
        .collect::<Result<Vec<_>>>()?;
    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}

/// Immutable facts about one input workbook, taken from its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    pub entity: String,
    pub group_index: Option<u32>,
    pub span: YearSpan,
    /// Raw tag suffix as written in the file name (`"A"`, `"CD"`).
    pub tags: Option<String>,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The single tag of a logical source, if it carries exactly one letter.
    pub fn tag(&self) -> Option<VariableTag> {
        let tags = self.tags.as_deref()?;
        let mut chars = tags.chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        VariableTag::new(first).ok()
    }

    /// Fans a multi-letter tag file into one logical source per letter.
    ///
    /// Every expanded source keeps the same physical `path`. A file without
    /// tags expands to itself.
    pub fn expand_tags(&self) -> Result<Vec<SourceFile>> {
        let Some(tags) = self.tags.as_deref() else {
            return Ok(vec![self.clone()]);
        };
        Ok(parse_tags(tags)?
            .into_iter()
            .map(|tag| SourceFile {
                tags: Some(tag.to_string()),
                ..self.clone()
            })
            .collect())
    }
}
