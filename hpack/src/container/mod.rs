//! htpack container file format
//!
//! A container multiplexes many encoded documents into one write-once file.
//! It can be read either by seeking to a known page offset
//! ([`reader::HtpackFile`]) or as a single forward pass over any byte source
//! ([`stream::HtpackStream`]). Everything is stored in Little Endian.
//!
//! # Top Level
//!
//! | Type           | Name     | Description |
//! | -------------: | -------- | ----------- |
//! | [u8; 4]        | magic    | Always `Pak1` |
//! | FileHeader     | header   | `metadata_len: u32` |
//! | [u8; N]        | metadata | JSON object of file level metadata, currently always `{}` |
//! | Page           | pages    | Zero or more page records, back to back until the end of file |
//!
//! ## Page
//!
//! | Type           | Name     | Description |
//! | -------------: | -------- | ----------- |
//! | PageHeader     | header   | `metadata_len: u32, pack_len: u32, text_len: u32` |
//! | [u8; N]        | metadata | JSON `{url, title, keywords}`, other keys are carried through |
//! | [u8; N]        | pack     | The pack stream, see [`crate::encode`] |
//! | [u8; N]        | text     | The text stream |
//!
//! The content digest of a finished file is not part of the byte stream, it
//! is stored next to the file as an extended attribute (see [`crate::fattr`]).
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hcore::structs::{PageHeader, Record};

use crate::decode::HtmlDocument;
use crate::error::HtpackError;

pub mod reader;
pub mod stream;
pub mod writer;

pub const MAGIC: [u8; 4] = *b"Pak1";

/// Offset of the file level metadata.
pub const FILE_METADATA_OFFSET: usize = MAGIC.len() + hcore::structs::FileHeader::SIZE;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub keywords: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) fn check_magic(head: &[u8]) -> Result<(), HtpackError> {
    if head != MAGIC {
        return Err(HtpackError::FormatError(format!(
            "unexpected header {:?}",
            String::from_utf8_lossy(head)
        )));
    }
    Ok(())
}

pub(crate) fn parse_file_metadata(raw: &[u8]) -> Result<Map<String, Value>, HtpackError> {
    match serde_json::from_slice(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(HtpackError::FormatError(format!(
            "file metadata is not an object: {}",
            other
        ))),
    }
}

/// Lengths from a raw page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLengths {
    pub metadata_len: u32,
    pub pack_len: u32,
    pub text_len: u32,
}

impl PageLengths {
    pub(crate) fn from_bytes(raw: &[u8]) -> Result<Self, HtpackError> {
        let header = PageHeader::at(raw, 0)?;
        Ok(PageLengths {
            metadata_len: header.metadata_len(),
            pack_len: header.pack_len(),
            text_len: header.text_len(),
        })
    }

    /// Bytes following the page header.
    pub fn payload_len(&self) -> u64 {
        self.metadata_len as u64 + self.pack_len as u64 + self.text_len as u64
    }
}

/// One page as read back from a container.
#[derive(Debug)]
pub struct ReadPage {
    pub position: u64,
    pub header: PageLengths,
    pub metadata: PageMetadata,
    data: Vec<u8>,
}

impl ReadPage {
    // `data` is the whole payload following the header at `position`
    pub(crate) fn decode(position: u64, header: PageLengths, data: Vec<u8>) -> Result<Self, HtpackError> {
        if data.len() as u64 != header.payload_len() {
            return Err(HtpackError::FormatError(format!(
                "page at {} has {} payload bytes, header claims {}",
                position,
                data.len(),
                header.payload_len()
            )));
        }

        let metadata = serde_json::from_slice(&data[..header.metadata_len as usize])?;
        Ok(ReadPage {
            position,
            header,
            metadata,
            data,
        })
    }

    /// Metadata, pack and text bytes as stored.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pack(&self) -> &[u8] {
        let start = self.header.metadata_len as usize;
        &self.data[start..start + self.header.pack_len as usize]
    }

    pub fn text(&self) -> &[u8] {
        let start = self.header.metadata_len as usize + self.header.pack_len as usize;
        &self.data[start..]
    }

    pub fn document(&self) -> HtmlDocument<'_> {
        HtmlDocument::new(self.pack(), self.text())
    }

    /// Offset of the page that follows this one.
    pub fn next_position(&self) -> u64 {
        self.position + PageHeader::SIZE as u64 + self.data.len() as u64
    }
}
