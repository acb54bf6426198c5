//! Format-agnostic building blocks for the htpack container: fixed-width
//! little endian record views, the growable write buffer used while encoding,
//! the exact-length chunked reader used while streaming, and the hashing
//! writer used to content-address finished files.
pub mod buf;
pub mod error;
pub mod hash;
pub mod reader;
pub mod structs;

pub use crate::error::CoreError;

/// Largest length any single u32 length field can carry.
pub const U32_MAX: usize = u32::MAX as usize;
