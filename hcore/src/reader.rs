use std::cmp;
use std::io::Read;

use crate::buf::fill_buf;
use crate::error::CoreError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Splits a reader into a sequence of owned chunks.
pub struct ReadChunks<R: Read> {
    inner: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReadChunks<R> {
    pub fn new(reader: R) -> Self {
        ReadChunks::with_chunk_size(reader, CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ReadChunks {
            inner: reader,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = std::io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data = vec![0u8; self.chunk_size];
        match fill_buf(&mut self.inner, &mut data) {
            Ok((true, 0)) => {
                self.done = true;
                None
            }
            Ok((eof, len)) => {
                self.done = eof;
                data.truncate(len);
                Some(Ok(data))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Exact-length reads over a sequential source of byte chunks.
///
/// `read(n)` hands back exactly `n` bytes, stitching chunks together as
/// needed. `Ok(None)` is only returned when the source is exhausted at the
/// point of the call; running dry part way through a read is a
/// [`CoreError::ShortRead`]. A zero length read always succeeds.
///
/// Taking `&mut self` keeps reads strictly one at a time.
pub struct ByteReader<S>
where
    S: Iterator<Item = std::io::Result<Vec<u8>>>,
{
    source: Option<S>,
    value: Vec<u8>,
    value_off: usize,
    position: u64,
}

impl<R: Read> ByteReader<ReadChunks<R>> {
    pub fn from_reader(reader: R) -> Self {
        ByteReader::new(ReadChunks::new(reader))
    }
}

impl<S> ByteReader<S>
where
    S: Iterator<Item = std::io::Result<Vec<u8>>>,
{
    pub fn new(source: S) -> Self {
        ByteReader {
            source: Some(source),
            value: Vec::new(),
            value_off: 0,
            position: 0,
        }
    }

    /// Total bytes handed out so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Release the underlying source. Any later read reports end of stream.
    pub fn close(&mut self) {
        self.source = None;
        self.value = Vec::new();
        self.value_off = 0;
    }

    // Make sure there is at least one unread byte buffered, false if the
    // source has run dry
    fn fill(&mut self) -> Result<bool, CoreError> {
        while self.value_off == self.value.len() {
            let next = match self.source.as_mut() {
                Some(source) => source.next(),
                None => None,
            };

            match next {
                Some(Ok(chunk)) => {
                    self.value = chunk;
                    self.value_off = 0;
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    self.close();
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn read(&mut self, len: usize) -> Result<Option<Vec<u8>>, CoreError> {
        if len == 0 {
            return Ok(Some(Vec::new()));
        }
        if !self.fill()? {
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(cmp::min(len, CHUNK_SIZE));
        while buf.len() < len {
            if !self.fill()? {
                return Err(CoreError::ShortRead {
                    wanted: len,
                    got: buf.len(),
                });
            }

            let take = cmp::min(len - buf.len(), self.value.len() - self.value_off);
            buf.extend_from_slice(&self.value[self.value_off..self.value_off + take]);
            self.value_off += take;
        }

        self.position += len as u64;
        Ok(Some(buf))
    }
}


#[cfg(test)]
mod test_byte_reader {
    use super::*;
    use std::io::{Cursor, Error, ErrorKind};

    fn chunked(chunks: Vec<Vec<u8>>) -> ByteReader<std::vec::IntoIter<std::io::Result<Vec<u8>>>> {
        ByteReader::new(chunks.into_iter().map(Ok).collect::<Vec<_>>().into_iter())
    }

    #[test]
    fn across_chunks() {
        let mut reader = chunked(vec![vec![1, 2], vec![3], vec![], vec![4, 5, 6]]);

        assert_eq!(reader.read(3).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read(1).unwrap(), Some(vec![4]));
        assert_eq!(reader.read(2).unwrap(), Some(vec![5, 6]));
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read(4).unwrap(), None);
        assert!(reader.is_closed());
    }

    #[test]
    fn short_read() {
        let mut reader = chunked(vec![vec![1, 2], vec![3]]);

        assert_eq!(reader.read(1).unwrap(), Some(vec![1]));
        assert!(matches!(
            reader.read(5),
            Err(CoreError::ShortRead { wanted: 5, got: 2 })
        ));
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn zero_length() {
        let mut reader = chunked(vec![]);
        assert_eq!(reader.read(0).unwrap(), Some(vec![]));
        assert_eq!(reader.read(1).unwrap(), None);
        assert_eq!(reader.read(0).unwrap(), Some(vec![]));
    }

    #[test]
    fn from_reader() {
        let mut reader = ByteReader::from_reader(Cursor::new(b"Pak1rest".to_vec()));
        assert_eq!(reader.read(4).unwrap().unwrap(), b"Pak1");
        assert_eq!(reader.read(4).unwrap().unwrap(), b"rest");
        assert_eq!(reader.read(1).unwrap(), None);
    }

    #[test]
    fn source_error() {
        let source: Vec<std::io::Result<Vec<u8>>> = vec![Ok(vec![1]), Err(Error::new(ErrorKind::Other, "boom"))];
        let mut reader = ByteReader::new(source.into_iter());

        assert!(matches!(reader.read(2), Err(CoreError::IOError(_))));
    }

    #[test]
    fn close() {
        let mut reader = chunked(vec![vec![1, 2, 3]]);
        assert_eq!(reader.read(1).unwrap(), Some(vec![1]));

        reader.close();
        assert!(reader.is_closed());
        assert_eq!(reader.read(1).unwrap(), None);
    }
}
