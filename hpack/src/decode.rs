//! Read only views over an encoded document.
//!
//! Nothing is materialised: a [`HtmlDocument`] is just the two borrowed
//! streams and a [`HtmlElement`] is an offset into the pack stream. Every
//! walk re-reads the headers it needs.
use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{json, Value};

use hcore::structs::{Attribute, ElementHeader, Record};
use hcore::CoreError;

use crate::error::HtpackError;
use crate::names;

// Elements rendered without a closing tag when they are empty
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn corrupt(e: CoreError) -> HtpackError {
    HtpackError::CorruptData(e.to_string())
}

pub fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

#[derive(Debug, Clone, Copy)]
pub struct HtmlDocument<'a> {
    pack: &'a [u8],
    text: &'a [u8],
}

impl<'a> HtmlDocument<'a> {
    pub fn new(pack: &'a [u8], text: &'a [u8]) -> Self {
        HtmlDocument { pack, text }
    }

    pub fn pack(&self) -> &'a [u8] {
        self.pack
    }

    pub fn text_bytes(&self) -> &'a [u8] {
        self.text
    }

    /// Every text node of the document, concatenated.
    pub fn text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.text)
    }

    fn text_range(&self, start: usize, end: usize) -> Result<Cow<'a, str>, HtpackError> {
        match self.text.get(start..end) {
            Some(raw) => Ok(String::from_utf8_lossy(raw)),
            None => Err(HtpackError::CorruptData(format!(
                "text range {}..{} past end of text stream ({})",
                start,
                end,
                self.text.len()
            ))),
        }
    }

    /// Top level elements.
    pub fn children(&self) -> Children<'a> {
        Children {
            doc: *self,
            off: 0,
            end: self.pack.len(),
            done: false,
        }
    }

    /// Every element in document order, ignoring nesting.
    pub fn all_elements(&self) -> AllElements<'a> {
        AllElements {
            doc: *self,
            off: 0,
            done: false,
        }
    }

    pub fn write_html(&self, out: &mut String) -> Result<(), HtpackError> {
        for element in self.children() {
            element?.write_html(out)?;
        }
        Ok(())
    }

    pub fn to_html(&self) -> Result<String, HtpackError> {
        let mut out = String::with_capacity(self.pack.len() + self.text.len());
        self.write_html(&mut out)?;
        Ok(out)
    }

    /// The element tree as `[{name, attributes, children}]`.
    pub fn to_json(&self) -> Result<Value, HtpackError> {
        let children = self
            .children()
            .map(|element| element?.to_json())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(children))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HtmlElement<'a> {
    doc: HtmlDocument<'a>,
    off: usize,
    name: u8,
    text_start: usize,
    text_len: usize,
    attr_len: usize,
    child_len: usize,
}

impl<'a> HtmlElement<'a> {
    // View the element at `off`, which must fit entirely before `end`
    fn at(doc: HtmlDocument<'a>, off: usize, end: usize) -> Result<Self, HtpackError> {
        let header = ElementHeader::at(&doc.pack[..end], off).map_err(corrupt)?;
        let attr_len = header.attr_len() as usize;
        let child_len = header.child_len() as usize;

        if attr_len + child_len > end - header.end_off() {
            return Err(HtpackError::CorruptData(format!(
                "element at {} overruns its parent ({} + {} bytes past {})",
                off,
                attr_len,
                child_len,
                header.end_off()
            )));
        }

        Ok(HtmlElement {
            doc,
            off,
            name: header.name(),
            text_start: header.text_start() as usize,
            text_len: header.text_len() as usize,
            attr_len,
            child_len,
        })
    }

    pub fn off(&self) -> usize {
        self.off
    }

    /// Header, attributes and children.
    pub fn size(&self) -> usize {
        ElementHeader::SIZE + self.attr_len + self.child_len
    }

    pub fn attr_len(&self) -> usize {
        self.attr_len
    }

    pub fn child_len(&self) -> usize {
        self.child_len
    }

    pub fn name_code(&self) -> u8 {
        self.name
    }

    pub fn name(&self) -> Result<&'static str, HtpackError> {
        match self.name_code() {
            names::ELEMENT_NAME_UNKNOWN => Ok(names::UNKNOWN_ELEMENT),
            code => names::element_name(code)
                .ok_or_else(|| HtpackError::CorruptData(format!("invalid element name {}", code))),
        }
    }

    pub fn text_start(&self) -> usize {
        self.text_start
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn text_end(&self) -> usize {
        self.text_start() + self.text_len()
    }

    /// All text under this element, in document order.
    pub fn text_content(&self) -> Result<Cow<'a, str>, HtpackError> {
        self.doc.text_range(self.text_start(), self.text_end())
    }

    pub fn attributes(&self) -> Attributes<'a> {
        let start = self.off + ElementHeader::SIZE;
        Attributes {
            pack: self.doc.pack,
            off: start,
            end: start + self.attr_len,
            done: false,
        }
    }

    /// Values of the named attributes that are present.
    pub fn get_attrs(&self, names: &[&str]) -> Result<HashMap<String, String>, HtpackError> {
        let mut ret = HashMap::new();
        for attr in self.attributes() {
            let (name, value) = attr?;
            if names.contains(&&*name) {
                ret.insert(name.into_owned(), value.into_owned());
            }
        }
        Ok(ret)
    }

    pub fn children(&self) -> Children<'a> {
        let start = self.off + ElementHeader::SIZE + self.attr_len;
        Children {
            doc: self.doc,
            off: start,
            end: start + self.child_len,
            done: false,
        }
    }

    pub fn write_html(&self, out: &mut String) -> Result<(), HtpackError> {
        let name = self.name()?;
        out.push('<');
        out.push_str(name);
        for attr in self.attributes() {
            let (key, value) = attr?;
            out.push(' ');
            out.push_str(&key);
            out.push_str("=\"");
            escape_into(&value, out);
            out.push('"');
        }
        out.push('>');

        // Text between children is only recorded as ranges, walk a cursor
        // through them to put it back in between
        let mut t = self.text_start();
        for child in self.children() {
            let child = child?;
            if child.text_start() > t {
                escape_into(&self.doc.text_range(t, child.text_start())?, out);
            }
            child.write_html(out)?;
            if child.text_end() != 0 {
                t = child.text_end();
            }
        }
        if self.text_end() > t {
            escape_into(&self.doc.text_range(t, self.text_end())?, out);
        }

        if self.child_len == 0 && self.text_len() == 0 && VOID_ELEMENTS.contains(&name) {
            return Ok(());
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
        Ok(())
    }

    pub fn to_html(&self) -> Result<String, HtpackError> {
        let mut out = String::new();
        self.write_html(&mut out)?;
        Ok(out)
    }

    pub fn to_json(&self) -> Result<Value, HtpackError> {
        let attributes = self
            .attributes()
            .map(|attr| attr.map(|(k, v)| json!([k, v])))
            .collect::<Result<Vec<_>, _>>()?;
        let children = self
            .children()
            .map(|element| element?.to_json())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(json!({
            "name": self.name()?,
            "attributes": attributes,
            "children": children,
        }))
    }
}

/// Sibling elements within one region of the pack stream.
pub struct Children<'a> {
    doc: HtmlDocument<'a>,
    off: usize,
    end: usize,
    done: bool,
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<HtmlElement<'a>, HtpackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.off >= self.end {
            return None;
        }

        match HtmlElement::at(self.doc, self.off, self.end) {
            Ok(element) => {
                self.off += element.size();
                Some(Ok(element))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Flat scan of the pack stream.
///
/// Attributes are packed before children, so stepping over just the header
/// and the attributes always lands on the next element in document order,
/// whether that is a child, a sibling or a sibling of some ancestor.
pub struct AllElements<'a> {
    doc: HtmlDocument<'a>,
    off: usize,
    done: bool,
}

impl<'a> Iterator for AllElements<'a> {
    type Item = Result<HtmlElement<'a>, HtpackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.off >= self.doc.pack.len() {
            return None;
        }

        match HtmlElement::at(self.doc, self.off, self.doc.pack.len()) {
            Ok(element) => {
                self.off += ElementHeader::SIZE + element.attr_len();
                Some(Ok(element))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// `(name, value)` pairs of one element.
pub struct Attributes<'a> {
    pack: &'a [u8],
    off: usize,
    end: usize,
    done: bool,
}

impl<'a> Attributes<'a> {
    fn read_attr(&mut self) -> Result<(Cow<'a, str>, Cow<'a, str>), HtpackError> {
        let region = &self.pack[..self.end];
        let attr = Attribute::at(region, self.off).map_err(corrupt)?;
        let start = attr.end_off();
        let raw = region
            .get(start..start + attr.size() as usize)
            .ok_or_else(|| HtpackError::CorruptData(format!("attribute at {} overruns its element", self.off)))?;
        self.off = start + raw.len();

        match attr.name() {
            names::ATTRIBUTE_NAME_UNKNOWN => match raw.iter().position(|b| *b == b'=') {
                Some(eq) => Ok((
                    String::from_utf8_lossy(&raw[..eq]),
                    String::from_utf8_lossy(&raw[eq + 1..]),
                )),
                None => Err(HtpackError::CorruptData(
                    "missing equals in unknown attr".to_string(),
                )),
            },
            code => match names::attribute_name(code) {
                Some(name) => Ok((Cow::Borrowed(name), String::from_utf8_lossy(raw))),
                None => Err(HtpackError::CorruptData(format!("unknown attribute id {}", code))),
            },
        }
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Result<(Cow<'a, str>, Cow<'a, str>), HtpackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.off >= self.end {
            return None;
        }

        let attr = self.read_attr();
        if attr.is_err() {
            self.done = true;
        }
        Some(attr)
    }
}
