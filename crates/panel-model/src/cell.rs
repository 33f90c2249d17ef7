//! Cell values as read from and written to workbooks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single spreadsheet cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Builds a text cell, mapping the empty string to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    pub fn number(value: impl Into<f64>) -> Self {
        Self::Number(value.into())
    }

    /// True for cells that hold nothing (the `None` of a spreadsheet).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) => value.is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Interprets the cell as an integer.
    ///
    /// Accepts integral numbers and trimmed text such as `"2015"` or `"2015.0"`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => integral(*value),
            Self::Text(value) => {
                let trimmed = value.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
            }
            Self::Empty | Self::Bool(_) => None,
        }
    }

    /// Trimmed display text, or `None` when the cell is blank.
    pub fn as_key(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        let rendered = self.to_string();
        let trimmed = rendered.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => f.write_str(&format_numeric(*value)),
            Self::Bool(value) => f.write_str(if *value { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

/// Formats a floating-point number as a string without trailing zeros.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
