use std::borrow::Cow;

use markup5ever_rcdom::{Handle, NodeData, RcDom};

use hcore::buf::GrowBuf;
use hcore::structs::{Attribute, ElementHeader};

use crate::dom::Node;
use crate::error::HtpackError;
use crate::names;

/// Pack and text buffers owned by the caller and reused across documents.
///
/// Every encode starts by resetting both buffers, and the returned
/// [`Packed`] borrows them, so a view can never outlive the next encode.
#[derive(Default)]
pub struct Buffers {
    pack: GrowBuf,
    text: GrowBuf,
}

impl Buffers {
    pub fn new() -> Self {
        Buffers::default()
    }

    pub fn reset(&mut self) {
        self.pack.reset();
        self.text.reset();
    }
}

/// The two streams of one encoded document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packed<'a> {
    pub pack: &'a [u8],
    pub text: &'a [u8],
}

/// What a document can be handed to the writer as.
pub enum PageTree {
    /// A tree built by hand.
    LiveTree(Node),
    /// A tree out of the html5ever parser.
    ParsedTree(RcDom),
    /// Streams that were already encoded, copied through as is.
    PrepackedBytes { pack: Vec<u8>, text: Vec<u8> },
}

impl PageTree {
    pub fn pack<'a>(&'a self, bufs: &'a mut Buffers) -> Result<Packed<'a>, HtpackError> {
        match self {
            PageTree::LiveTree(node) => encode(node, bufs),
            PageTree::ParsedTree(dom) => encode(dom, bufs),
            PageTree::PrepackedBytes { pack, text } => Ok(Packed { pack, text }),
        }
    }
}

/// A tree that knows how to walk itself into an [`Encoder`].
pub trait DomTree {
    fn walk(&self, enc: &mut Encoder<'_>) -> Result<(), HtpackError>;
}

/// Encode one document into `bufs`.
pub fn encode<'a, T: DomTree + ?Sized>(tree: &T, bufs: &'a mut Buffers) -> Result<Packed<'a>, HtpackError> {
    bufs.reset();
    {
        let mut enc = Encoder {
            pack: &mut bufs.pack,
            text: &mut bufs.text,
        };
        tree.walk(&mut enc)?;
    }

    Ok(Packed {
        pack: bufs.pack.view(),
        text: bufs.text.view(),
    })
}

/// An element whose header has been written but whose children have not.
#[must_use]
pub struct OpenElement {
    header_off: usize,
    text_start: usize,
    attr_len: usize,
}

pub struct Encoder<'b> {
    pack: &'b mut GrowBuf,
    text: &'b mut GrowBuf,
}

impl<'b> Encoder<'b> {
    pub fn text(&mut self, content: &str) -> Result<(), HtpackError> {
        self.text.add_raw(content.as_bytes())?;
        Ok(())
    }

    /// Write the element header and all of its attributes.
    pub fn open_element<I, K, V>(&mut self, name: &str, attrs: I) -> Result<OpenElement, HtpackError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let header_off = self.pack.mark();
        let text_start = self.text.mark();
        {
            let mut header = self.pack.add::<ElementHeader<&mut [u8]>>()?;
            header.set_name(names::element_code(name).unwrap_or(names::ELEMENT_NAME_UNKNOWN))?;
            header.set_text_start(text_start)?;
        }
        let header_end = self.pack.mark();

        for (key, value) in attrs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let code = names::attribute_code(key);
            if code.is_none() && key.contains('=') {
                return Err(HtpackError::InvalidAttrName(key.to_string()));
            }

            let attr_off = self.pack.mark();
            self.pack.add::<Attribute<&mut [u8]>>()?;
            let size = match code {
                Some(_) => self.pack.add_raw(value.as_bytes())?,
                // Unknown names ride along in the value as `name=value`
                None => {
                    self.pack.add_raw(key.as_bytes())?
                        + self.pack.add_raw(b"=")?
                        + self.pack.add_raw(value.as_bytes())?
                }
            };

            let mut attr = self.pack.at::<Attribute<&mut [u8]>>(attr_off)?;
            attr.set_name(code.unwrap_or(names::ATTRIBUTE_NAME_UNKNOWN))?;
            attr.set_size(size)?;
        }

        let attr_len = self.pack.diff(header_end);
        self.pack
            .at::<ElementHeader<&mut [u8]>>(header_off)?
            .set_attr_len(attr_len)?;

        Ok(OpenElement {
            header_off,
            text_start,
            attr_len,
        })
    }

    /// Fill in the text and child lengths once every child is written.
    pub fn close_element(&mut self, open: OpenElement) -> Result<(), HtpackError> {
        let text_len = self.text.diff(open.text_start);
        let child_len = self.pack.diff(open.header_off + ElementHeader::SIZE) - open.attr_len;

        let mut header = self.pack.at::<ElementHeader<&mut [u8]>>(open.header_off)?;
        header.set_text_len(text_len)?;
        if text_len == 0 {
            header.set_text_start(0u32)?;
        }
        header.set_child_len(child_len)?;
        Ok(())
    }
}

impl DomTree for Node {
    fn walk(&self, enc: &mut Encoder<'_>) -> Result<(), HtpackError> {
        match self {
            Node::Document(children) => {
                for child in children {
                    child.walk(enc)?;
                }
                Ok(())
            }
            Node::Doctype(_) | Node::Comment(_) => Ok(()),
            Node::Text(content) => enc.text(content),
            Node::Element(element) => {
                let open = enc.open_element(
                    &element.name,
                    element.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                )?;
                for child in &element.children {
                    child.walk(enc)?;
                }
                enc.close_element(open)
            }
        }
    }
}

// Namespaced attributes such as `xlink:href` keep their prefix
fn attr_name(name: &html5ever::QualName) -> Cow<'_, str> {
    match &name.prefix {
        Some(prefix) => Cow::Owned(format!("{}:{}", &**prefix, &*name.local)),
        None => Cow::Borrowed(&*name.local),
    }
}

impl DomTree for Handle {
    fn walk(&self, enc: &mut Encoder<'_>) -> Result<(), HtpackError> {
        match &self.data {
            NodeData::Document => {
                for child in self.children.borrow().iter() {
                    child.walk(enc)?;
                }
                Ok(())
            }
            NodeData::Doctype { .. } | NodeData::Comment { .. } => Ok(()),
            NodeData::Text { contents } => enc.text(&contents.borrow()),
            NodeData::Element { name, attrs, .. } => {
                let open = {
                    let attrs = attrs.borrow();
                    enc.open_element(
                        &name.local,
                        attrs.iter().map(|a| (attr_name(&a.name), &*a.value)),
                    )?
                };
                for child in self.children.borrow().iter() {
                    child.walk(enc)?;
                }
                enc.close_element(open)
            }
            NodeData::ProcessingInstruction { .. } => {
                Err(HtpackError::UnsupportedNode("processing instruction"))
            }
        }
    }
}

impl DomTree for RcDom {
    fn walk(&self, enc: &mut Encoder<'_>) -> Result<(), HtpackError> {
        self.document.walk(enc)
    }
}
