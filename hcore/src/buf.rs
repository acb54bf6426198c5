use std::io::Read;

use crate::error::CoreError;
use crate::structs::Record;
use crate::U32_MAX;

// 64Kb starting window, doubled as needed
const INITIAL_CAPACITY: usize = 64 * 1024;

pub fn fill_buf<R: Read>(data: &mut R, buf: &mut [u8]) -> std::io::Result<(bool, usize)> {
    let mut buf_read = 0;

    while buf_read < buf.len() {
        match data.read(&mut buf[buf_read..]) {
            Ok(0) => return Ok((true, buf_read)),
            Ok(x) => buf_read += x,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
    }
    Ok((false, buf_read))
}

/// Append only byte buffer used to build the pack and text streams.
///
/// The backing storage only ever grows (by doubling) and is kept across
/// [`GrowBuf::reset`] so that one buffer can be reused for every document in
/// a run. Records handed out by [`GrowBuf::add`] are zeroed, raw bytes are
/// copied as is.
pub struct GrowBuf {
    buf: Vec<u8>,
    len: usize,
    limit: usize,
}

impl Default for GrowBuf {
    fn default() -> Self {
        GrowBuf::new()
    }
}

impl GrowBuf {
    pub fn new() -> Self {
        GrowBuf::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GrowBuf {
            buf: vec![0; capacity],
            len: 0,
            limit: U32_MAX,
        }
    }

    #[cfg(test)]
    fn with_limit(capacity: usize, limit: usize) -> Self {
        GrowBuf {
            buf: vec![0; capacity],
            len: 0,
            limit,
        }
    }

    // Grow the logical length by `len` bytes, returning where they start
    fn expand(&mut self, len: usize) -> Result<usize, CoreError> {
        let mark = self.len;
        let new_len = match self.len.checked_add(len) {
            Some(l) if l <= self.limit => l,
            _ => return Err(CoreError::LengthOverflow),
        };

        if new_len > self.buf.len() {
            let mut capacity = self.buf.len().max(1);
            while capacity < new_len {
                capacity *= 2;
            }
            self.buf.resize(capacity, 0);
        }

        self.len = new_len;
        Ok(mark)
    }

    /// Reserve a zeroed record at the end of the buffer and return a live
    /// view over it.
    pub fn add<'a, T: Record<&'a mut [u8]>>(&'a mut self) -> Result<T, CoreError> {
        let mark = self.expand(T::SIZE)?;
        self.buf[mark..self.len].fill(0);
        T::at(&mut self.buf[..self.len], mark)
    }

    /// Re-open a view over a record that was previously added at `off`.
    pub fn at<'a, T: Record<&'a mut [u8]>>(&'a mut self, off: usize) -> Result<T, CoreError> {
        T::at(&mut self.buf[..self.len], off)
    }

    /// Append raw bytes, returning how many were appended.
    pub fn add_raw(&mut self, data: &[u8]) -> Result<usize, CoreError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mark = self.expand(data.len())?;
        self.buf[mark..self.len].copy_from_slice(data);
        Ok(data.len())
    }

    pub fn mark(&self) -> usize {
        self.len
    }

    pub fn diff(&self, mark: usize) -> usize {
        self.len - mark
    }

    pub fn view(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Truncate to zero without releasing or zeroing the storage.
    pub fn reset(&mut self) {
        self.len = 0;
    }
}
