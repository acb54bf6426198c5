use std::io::{copy, Read, Write};

use sha2::{Digest as _, Sha512};

// Make the digest api be similiar to the streaming hasher api
pub struct Digest(Sha512);

impl Default for Digest {
    fn default() -> Self {
        Digest::new()
    }
}

impl Digest {
    pub fn new() -> Digest {
        Digest(Sha512::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Lowercase hex of the SHA-512 digest.
    pub fn finalize(self) -> String {
        hex::encode(self.0.finalize())
    }
}

/// SHA-512 over everything left in `data`.
pub fn hash<R: Read>(data: &mut R) -> Result<String, std::io::Error> {
    let mut hash = Sha512::new();
    copy(data, &mut hash)?;
    Ok(hex::encode(hash.finalize()))
}

/// Passes writes through to `inner` while hashing every byte that was
/// actually accepted.
pub struct HashWriter<W: Write> {
    inner: W,
    digest: Digest,
    written: u64,
}

impl<W: Write> HashWriter<W> {
    pub fn new(writer: W) -> Self {
        HashWriter {
            inner: writer,
            digest: Digest::new(),
            written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Hand back the writer and the hex digest of everything written.
    pub fn finalize(self) -> (W, String) {
        (self.inner, self.digest.finalize())
    }
}

impl<W: Write> Write for HashWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let len = self.inner.write(buf)?;
        self.digest.update(&buf[..len]);
        self.written += len as u64;
        Ok(len)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
