//! Inclusive year spans and per-entity span partitioning.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Inclusive `(start, end)` year interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearSpan {
    start: i32,
    end: i32,
}

impl YearSpan {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if end < start {
            return Err(ModelError::InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(year: i32) -> Self {
        Self {
            start: year,
            end: year,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Number of years covered.
    pub fn year_count(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn is_single_year(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &YearSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_year() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Why a set of spans for one entity cannot be partitioned into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanConflict {
    /// Two files start the same block but disagree on where it ends.
    Inconsistent { expected: YearSpan, found: YearSpan },
    /// A block starts before the previous block ended.
    Overlap {
        previous: YearSpan,
        current: YearSpan,
    },
}

impl fmt::Display for SpanConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inconsistent { expected, found } => {
                write!(f, "inconsistent span {found}, block already declared as {expected}")
            }
            Self::Overlap { previous, current } => {
                write!(f, "span {current} overlaps preceding span {previous}")
            }
        }
    }
}

/// Reduces the spans declared by every file of one entity to distinct blocks.
///
/// Spans are visited in ascending order. Files sharing a start year must
/// declare the same end year, and a new block must start after the previous
/// block ends. The returned blocks are sorted and deduplicated.
pub fn partition_spans(spans: &[YearSpan]) -> std::result::Result<Vec<YearSpan>, SpanConflict> {
    let mut sorted = spans.to_vec();
    sorted.sort();

    let mut blocks: Vec<YearSpan> = Vec::new();
    for span in sorted {
        match blocks.last() {
            Some(last) if last.start == span.start => {
                if last.end != span.end {
                    return Err(SpanConflict::Inconsistent {
                        expected: *last,
                        found: span,
                    });
                }
            }
            Some(last) if last.overlaps(&span) => {
                return Err(SpanConflict::Overlap {
                    previous: *last,
                    current: span,
                });
            }
            _ => blocks.push(span),
        }
    }
    Ok(blocks)
}
