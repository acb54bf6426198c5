use std::io::Read;

use log::debug;
use serde_json::{Map, Value};

use hcore::reader::{ByteReader, ReadChunks};
use hcore::structs::{FileHeader, PageHeader, Record};
use hcore::CoreError;

use crate::container::{check_magic, parse_file_metadata, PageLengths, ReadPage, MAGIC};
use crate::error::HtpackError;

type Chunk = std::io::Result<Vec<u8>>;

/// Single forward pass over a container from any sequential byte source.
///
/// The source must end exactly on a page boundary. The underlying reader is
/// closed as soon as the stream is exhausted or hits an error, after which
/// the iterator only returns `None`.
pub struct HtpackStream<S>
where
    S: Iterator<Item = Chunk>,
{
    reader: ByteReader<S>,
    metadata: Map<String, Value>,
    done: bool,
}

/// Stream a container out of a reader.
pub fn read_stream<R: Read>(reader: R) -> Result<HtpackStream<ReadChunks<R>>, HtpackError> {
    HtpackStream::new(ReadChunks::new(reader))
}

impl<S> HtpackStream<S>
where
    S: Iterator<Item = Chunk>,
{
    pub fn new(source: S) -> Result<Self, HtpackError> {
        let mut reader = ByteReader::new(source);

        match read_file_header(&mut reader) {
            Ok(metadata) => Ok(HtpackStream {
                reader,
                metadata,
                done: false,
            }),
            Err(e) => {
                reader.close();
                Err(e)
            }
        }
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Bytes consumed so far, the position of the next page.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    fn read_page(&mut self) -> Result<Option<ReadPage>, HtpackError> {
        let position = self.reader.position();

        let raw = match self.reader.read(PageHeader::SIZE)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let header = PageLengths::from_bytes(&raw)?;

        let wanted = header.payload_len() as usize;
        let data = match self.reader.read(wanted)? {
            Some(data) => data,
            None => return Err(CoreError::ShortRead { wanted, got: 0 }.into()),
        };

        debug!("streamed page at {}: {:?}", position, header);
        ReadPage::decode(position, header, data).map(Some)
    }
}

fn read_file_header<S>(reader: &mut ByteReader<S>) -> Result<Map<String, Value>, HtpackError>
where
    S: Iterator<Item = Chunk>,
{
    let truncated = || HtpackError::FormatError("truncated file header".to_string());
    let mut read = |len: usize| match reader.read(len) {
        Ok(Some(data)) => Ok(data),
        Ok(None) | Err(CoreError::ShortRead { .. }) => Err(truncated()),
        Err(e) => Err(e.into()),
    };

    check_magic(&read(MAGIC.len())?)?;
    let metadata_len = FileHeader::at(&read(FileHeader::SIZE)?[..], 0)?.metadata_len();
    parse_file_metadata(&read(metadata_len as usize)?)
}

impl<S> Iterator for HtpackStream<S>
where
    S: Iterator<Item = Chunk>,
{
    type Item = Result<ReadPage, HtpackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let page = self.read_page().transpose();
        if !matches!(page, Some(Ok(_))) {
            self.done = true;
            self.reader.close();
        }
        page
    }
}

#[cfg(test)]
mod test_stream {
    use super::*;
    use std::io::Cursor;

    fn file(pages: &[(&str, &str)]) -> Vec<u8> {
        let mut out = b"Pak1\x02\x00\x00\x00{}".to_vec();
        for (metadata, text) in pages {
            out.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(text.len() as u32).to_le_bytes());
            out.extend_from_slice(metadata.as_bytes());
            out.extend_from_slice(text.as_bytes());
        }
        out
    }

    const META_A: &str = r#"{"url":"a","title":"A","keywords":[]}"#;
    const META_B: &str = r#"{"url":"b","title":"B","keywords":[]}"#;

    // One byte per chunk to exercise reads spanning chunks
    fn trickle(raw: Vec<u8>) -> HtpackStream<ReadChunks<Cursor<Vec<u8>>>> {
        HtpackStream::new(ReadChunks::with_chunk_size(Cursor::new(raw), 1)).unwrap()
    }

    #[test]
    fn empty() {
        let mut stream = read_stream(Cursor::new(file(&[]))).unwrap();
        assert!(stream.metadata().is_empty());
        assert!(stream.next().is_none());
        assert!(stream.reader.is_closed());
    }

    #[test]
    fn pages() {
        let stream = trickle(file(&[(META_A, "one"), (META_B, "")]));
        let pages: Vec<ReadPage> = stream.map(|p| p.unwrap()).collect();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].position, 10);
        assert_eq!(pages[0].metadata.url, "a");
        assert_eq!(pages[0].text(), b"one");
        assert_eq!(pages[1].position, pages[0].next_position());
        assert_eq!(pages[1].metadata.title, "B");
        assert!(pages[1].text().is_empty());
    }

    #[test]
    fn bad_magic() {
        let raw = b"PK\x03\x04\x02\x00\x00\x00{}".to_vec();
        assert!(matches!(
            read_stream(Cursor::new(raw)),
            Err(HtpackError::FormatError(_))
        ));
    }

    #[test]
    fn truncated_header() {
        for len in [0, 3, 6, 9] {
            let mut raw = file(&[]);
            raw.truncate(len);
            assert!(matches!(
                read_stream(Cursor::new(raw)),
                Err(HtpackError::FormatError(_))
            ));
        }
    }

    #[test]
    fn truncated_page() {
        let full = file(&[(META_A, "one"), (META_B, "two")]);

        // Cut inside the second page header and inside its payload
        for cut in [full.len() - 3 - META_B.len() - 5, full.len() - 1] {
            let mut stream = trickle(full[..cut].to_vec());

            assert_eq!(stream.next().unwrap().unwrap().metadata.url, "a");
            assert!(stream.next().unwrap().unwrap_err().is_short_read());
            assert!(stream.next().is_none());
            assert!(stream.reader.is_closed());
        }
    }

    #[test]
    fn cut_at_payload_start() {
        let full = file(&[(META_A, "one")]);
        let cut = 10 + PageHeader::SIZE;

        let mut stream = trickle(full[..cut].to_vec());
        assert!(stream.next().unwrap().unwrap_err().is_short_read());
    }

    #[test]
    fn bad_page_metadata() {
        let mut stream = trickle(file(&[("{}", ""), (META_A, "")]));
        assert!(matches!(stream.next(), Some(Err(HtpackError::MetadataError(_)))));
        assert!(stream.next().is_none());
    }
}
