use std::fmt::Debug;

use hcore::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HtpackError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("format error: {0}")]
    FormatError(String),
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("bad metadata: {0}")]
    MetadataError(#[from] serde_json::Error),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("not implemented for node type {0}")]
    UnsupportedNode(&'static str),
    #[error("can't happen: attr name contains equals: {0:?}")]
    InvalidAttrName(String),
    #[error("extended attribute {name}: {source}")]
    AttrError {
        name: String,
        source: std::io::Error,
    },
}

impl HtpackError {
    /// True for errors caused by a truncated stream.
    pub fn is_short_read(&self) -> bool {
        matches!(self, HtpackError::Core(CoreError::ShortRead { .. }))
    }
}
