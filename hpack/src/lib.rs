//! Compact binary storage for html documents.
//!
//! A document tree is flattened into two streams: a pack stream holding the
//! element structure with interned names and attributes, and a text stream
//! holding every text node back to back. Many documents are then framed one
//! after another into a write-once container file.
//!
//! ```text
//! html ──encode──▶ (pack, text) ──page_to_htpack──▶ container file
//!                       ▲                                   │
//!                       └────── HtmlDocument ◀── read ──────┘
//! ```
pub mod container;
pub mod decode;
pub mod dom;
pub mod encode;
pub mod error;
pub mod fattr;
pub mod names;

pub use crate::container::reader::HtpackFile;
pub use crate::container::stream::{read_stream, HtpackStream};
pub use crate::container::writer::{
    page_to_htpack, verify_htpack, write_htpack, HtpackBuilder, Page, Verified, WriteOptions,
    WriteSummary,
};
pub use crate::container::{PageMetadata, ReadPage};
pub use crate::decode::{HtmlDocument, HtmlElement};
pub use crate::encode::{encode, Buffers, Packed, PageTree};
pub use crate::error::HtpackError;
