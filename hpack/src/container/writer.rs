use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info, warn};
use serde_json::{Map, Value};

use hcore::hash::{hash, HashWriter};
use hcore::structs::{FileHeader, PageHeader, Record};
use hcore::{CoreError, U32_MAX};

use crate::container::{PageMetadata, MAGIC};
use crate::encode::{Buffers, Packed, PageTree};
use crate::error::HtpackError;
use crate::fattr::{digest_name, AttrStore, DEFAULT_NAMESPACE};

/// One document on its way into a container.
pub struct Page {
    pub url: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub tree: PageTree,
}

/// A page record, fully built but not yet written.
pub struct PageRecord<'a> {
    header: Vec<u8>,
    metadata: Vec<u8>,
    packed: Packed<'a>,
}

impl PageRecord<'_> {
    fn len(&self) -> usize {
        self.header.len() + self.metadata.len() + self.packed.pack.len() + self.packed.text.len()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, HtpackError> {
        writer.write_all(&self.header)?;
        writer.write_all(&self.metadata)?;
        writer.write_all(self.packed.pack)?;
        writer.write_all(self.packed.text)?;
        Ok(self.len())
    }
}

fn check_len(len: usize) -> Result<(), HtpackError> {
    if len > U32_MAX {
        return Err(CoreError::LengthOverflow.into());
    }
    Ok(())
}

/// Encode a page and frame it. Nothing of a page that fails here ever
/// reaches the output.
pub fn page_to_htpack<'a>(page: &'a Page, bufs: &'a mut Buffers) -> Result<PageRecord<'a>, HtpackError> {
    if page.url.is_empty() {
        return Err(HtpackError::MissingField("url"));
    }

    let metadata = serde_json::to_vec(&PageMetadata {
        url: page.url.clone(),
        title: page.title.clone(),
        keywords: page.keywords.clone(),
        extra: Map::new(),
    })?;
    let packed = page.tree.pack(bufs)?;

    check_len(metadata.len())?;
    check_len(packed.pack.len())?;
    check_len(packed.text.len())?;

    let mut header = vec![0u8; PageHeader::SIZE];
    {
        let mut view = PageHeader::at(&mut header[..], 0)?;
        view.set_metadata_len(metadata.len())?;
        view.set_pack_len(packed.pack.len())?;
        view.set_text_len(packed.text.len())?;
    }

    Ok(PageRecord {
        header,
        metadata,
        packed,
    })
}

/// Writes the container framing to any writer.
pub struct HtpackBuilder<W: Write> {
    inner: W,
    bufs: Buffers,
    pages: usize,
    skipped: usize,
}

impl<W: Write> HtpackBuilder<W> {
    pub fn new(writer: W) -> Self {
        HtpackBuilder {
            inner: writer,
            bufs: Buffers::new(),
            pages: 0,
            skipped: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn write_file_header(&mut self, metadata: &Map<String, Value>) -> Result<usize, HtpackError> {
        let metadata = serde_json::to_vec(metadata)?;
        check_len(metadata.len())?;

        let mut header = [0u8; 4];
        FileHeader::at(&mut header[..], 0)?.set_metadata_len(metadata.len())?;

        self.inner.write_all(&MAGIC)?;
        self.inner.write_all(&header)?;
        self.inner.write_all(&metadata)?;
        Ok(MAGIC.len() + header.len() + metadata.len())
    }

    /// Write one page, returning the bytes written.
    pub fn write_page(&mut self, page: &Page) -> Result<usize, HtpackError> {
        let record = page_to_htpack(page, &mut self.bufs)?;
        let len = record.write_to(&mut self.inner)?;
        self.pages += 1;
        Ok(len)
    }

    /// Write every page of `source`.
    ///
    /// A page that fails to encode is logged and skipped unless `strict` is
    /// set. Errors from the source itself or from the writer always abort.
    pub fn append_pages<I>(&mut self, source: I, strict: bool) -> Result<usize, HtpackError>
    where
        I: IntoIterator<Item = Result<Page, HtpackError>>,
    {
        let mut written = 0;
        for page in source {
            let page = page?;

            let record = match page_to_htpack(&page, &mut self.bufs) {
                Ok(record) => record,
                Err(e) if !strict => {
                    warn!("Error while converting to htpack: {}: {}", page.url, e);
                    self.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let len = record.write_to(&mut self.inner)?;
            debug!("page {}: {} bytes", page.url, len);
            self.pages += 1;
            written += len;
        }
        Ok(written)
    }
}

pub struct WriteOptions {
    /// Namespace of the digest attribute.
    pub namespace: String,
    pub strict: bool,
    /// Extra attributes set on the finished file, by full attribute name.
    pub additional_attrs: BTreeMap<String, String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            namespace: DEFAULT_NAMESPACE.to_string(),
            strict: false,
            additional_attrs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Hex SHA-512 of the whole file.
    pub digest: String,
    pub pages: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Write a new container at `path` and seal it.
///
/// Once every page is written the file is synced and closed, its digest is
/// attached through `attrs` and the file is made read only. A file that
/// fails part way through, writing or sealing, is removed.
pub fn write_htpack<P, I>(
    path: P,
    source: I,
    opts: &WriteOptions,
    attrs: &dyn AttrStore,
) -> Result<WriteSummary, HtpackError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Result<Page, HtpackError>>,
{
    let path = path.as_ref();
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;

    let res = write_pages(file, source, opts.strict)
        .and_then(|summary| seal(path, &summary.digest, opts, attrs).map(|_| summary));

    let summary = match res {
        Ok(summary) => summary,
        Err(e) => {
            if let Err(rm) = fs::remove_file(path) {
                warn!("Unable to remove partial file {}: {}", path.display(), rm);
            }
            return Err(e);
        }
    };

    info!(
        "Wrote {}: {} pages, {} skipped, {} bytes",
        path.display(),
        summary.pages,
        summary.skipped,
        summary.bytes
    );
    Ok(summary)
}

// Digest and extra attributes, then read only
fn seal(
    path: &Path,
    digest: &str,
    opts: &WriteOptions,
    attrs: &dyn AttrStore,
) -> Result<(), HtpackError> {
    attrs.set(path, &digest_name(&opts.namespace), digest.as_bytes())?;
    for (name, value) in &opts.additional_attrs {
        attrs.set(path, name, value.as_bytes())?;
    }

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)?;
    Ok(())
}

fn write_pages<I>(file: File, source: I, strict: bool) -> Result<WriteSummary, HtpackError>
where
    I: IntoIterator<Item = Result<Page, HtpackError>>,
{
    let mut builder = HtpackBuilder::new(HashWriter::new(BufWriter::new(file)));
    builder.write_file_header(&Map::new())?;
    builder.append_pages(source, strict)?;

    let (pages, skipped) = (builder.pages(), builder.skipped());
    let mut writer = builder.into_inner();
    writer.flush()?;
    let bytes = writer.bytes_written();

    let (buf, digest) = writer.finalize();
    let file = buf.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(WriteSummary {
        digest,
        pages,
        skipped,
        bytes,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verified {
    Match,
    Mismatch { stored: String, actual: String },
    Missing { actual: String },
}

/// Recompute the digest of `path` and check it against the stored one.
pub fn verify_htpack<P: AsRef<Path>>(
    path: P,
    namespace: &str,
    attrs: &dyn AttrStore,
) -> Result<Verified, HtpackError> {
    let path = path.as_ref();
    let actual = hash(&mut File::open(path)?)?;

    let verified = match attrs.get(path, &digest_name(namespace))? {
        None => Verified::Missing { actual },
        Some(stored) => {
            let stored = String::from_utf8_lossy(&stored).into_owned();
            if stored == actual {
                Verified::Match
            } else {
                Verified::Mismatch { stored, actual }
            }
        }
    };
    debug!("verify {}: {:?}", path.display(), verified);
    Ok(verified)
}
