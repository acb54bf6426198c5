use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use hcore::buf::fill_buf;
use hcore::structs::{FileHeader, PageHeader, Record};
use hcore::CoreError;

use crate::container::{check_magic, parse_file_metadata, PageLengths, ReadPage, MAGIC};
use crate::error::HtpackError;

/// Random access over a container.
///
/// Page positions come from [`ReadPage::next_position`] or from
/// [`HtpackFile::start_position`] for the first page, which allows paging
/// through a file without scanning it from the start.
pub struct HtpackFile<R: Read + Seek> {
    inner: R,
    len: u64,
    metadata: Map<String, Value>,
    start_position: u64,
}

impl HtpackFile<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HtpackError> {
        HtpackFile::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> HtpackFile<R> {
    pub fn new(mut reader: R) -> Result<Self, HtpackError> {
        let len = reader.seek(SeekFrom::End(0))?;

        let head = match read_at(&mut reader, 0, MAGIC.len() + FileHeader::SIZE) {
            Ok(head) => head,
            Err(CoreError::ShortRead { .. }) => {
                return Err(HtpackError::FormatError("truncated file header".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        check_magic(&head[..MAGIC.len()])?;
        let metadata_len = FileHeader::at(&head[..], MAGIC.len())?.metadata_len() as u64;

        let start_position = head.len() as u64 + metadata_len;
        if start_position > len {
            return Err(HtpackError::FormatError(format!(
                "file metadata runs to {}, file is {} bytes",
                start_position, len
            )));
        }
        let raw = read_at(&mut reader, head.len() as u64, metadata_len as usize)?;
        let metadata = parse_file_metadata(&raw)?;

        debug!("opened container: {} bytes, pages start at {}", len, start_position);
        Ok(HtpackFile {
            inner: reader,
            len,
            metadata,
            start_position,
        })
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn start_position(&self) -> u64 {
        self.start_position
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.start_position == self.len
    }

    /// Read the page at `position`, `None` at the end of the file.
    pub fn read_document(&mut self, position: u64) -> Result<Option<ReadPage>, HtpackError> {
        if position == self.len {
            return Ok(None);
        }
        if position < self.start_position || position > self.len {
            return Err(HtpackError::FormatError(format!(
                "page position {} outside of {}..{}",
                position, self.start_position, self.len
            )));
        }

        let raw = read_at(&mut self.inner, position, PageHeader::SIZE)?;
        let header = PageLengths::from_bytes(&raw)?;

        let end = position + PageHeader::SIZE as u64 + header.payload_len();
        if end > self.len {
            return Err(HtpackError::FormatError(format!(
                "page at {} runs to {}, file is {} bytes",
                position, end, self.len
            )));
        }

        let data = read_at(
            &mut self.inner,
            position + PageHeader::SIZE as u64,
            header.payload_len() as usize,
        )?;
        debug!("read page at {}: {:?}", position, header);
        ReadPage::decode(position, header, data).map(Some)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

// Exactly `len` bytes at `position`
fn read_at<R: Read + Seek>(reader: &mut R, position: u64, len: usize) -> Result<Vec<u8>, CoreError> {
    reader.seek(SeekFrom::Start(position))?;

    let mut buf = vec![0u8; len];
    match fill_buf(reader, &mut buf)? {
        (true, got) if got < len => Err(CoreError::ShortRead { wanted: len, got }),
        _ => Ok(buf),
    }
}
