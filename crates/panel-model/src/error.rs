use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid year span {start}-{end}: end year precedes start year")]
    InvalidSpan { start: i32, end: i32 },
    #[error("invalid variable tag '{0}': expected a single ASCII letter")]
    InvalidTag(char),
    #[error("empty variable tag list")]
    EmptyTags,
}

pub type Result<T> = std::result::Result<T, ModelError>;
