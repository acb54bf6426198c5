use std::fmt::Debug;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("bad value {0} for a {1} bit field")]
    InvalidValue(String, u32),
    #[error("length overrun past the 32 bit limit")]
    LengthOverflow,
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },
    #[error("record at offset {off} needs {size} bytes, buffer holds {len}")]
    OutOfBounds { off: usize, size: usize, len: usize },
}
