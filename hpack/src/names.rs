//! Interned element and attribute names.
//!
//! A name's code is its index in the table. Code 0 is reserved in both
//! tables for names that are not in the table. These tables are part of the
//! on-disk format: only ever append to them.
use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const ELEMENT_NAME_UNKNOWN: u8 = 0;
pub const ATTRIBUTE_NAME_UNKNOWN: u8 = 0;

/// Rendered in place of an element name that was not interned.
pub const UNKNOWN_ELEMENT: &str = "unknown";

static ELEMENTS: &[&str] = &[
    "", "a", "abbr", "acronym", "address", "applet", "area", "article",
    "aside", "audio", "b", "base", "basefont", "bdi", "bdo", "big",
    "blink", "blockquote", "body", "br", "button", "canvas", "caption", "center",
    "cite", "code", "col", "colgroup", "data", "datalist", "dd", "del",
    "details", "dfn", "dialog", "dir", "div", "dl", "dt", "em",
    "embed", "fieldset", "figcaption", "figure", "font", "footer", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "header", "hgroup", "hr", "html", "i", "iframe", "img", "input",
    "ins", "kbd", "label", "legend", "li", "link", "main", "map",
    "mark", "marquee", "menu", "meta", "meter", "nav", "nobr", "noembed",
    "noframes", "noscript", "object", "ol", "optgroup", "option", "output", "p",
    "param", "picture", "plaintext", "pre", "progress", "q", "rb", "rp",
    "rt", "rtc", "ruby", "s", "samp", "script", "search", "section",
    "select", "slot", "small", "source", "span", "strike", "strong", "style",
    "sub", "summary", "sup", "table", "tbody", "td", "template", "textarea",
    "tfoot", "th", "thead", "time", "title", "tr", "track", "tt",
    "u", "ul", "var", "video", "wbr", "xmp", "svg", "math",
    "path", "g", "circle", "rect", "line", "polyline", "polygon", "ellipse",
    "use", "defs", "symbol", "text", "tspan", "lineargradient", "radialgradient", "stop",
    "clippath", "mask", "pattern", "image", "foreignobject", "mi", "mo", "mn",
    "ms", "mtext", "mrow", "msup", "msub", "mfrac", "msqrt", "mroot",
    "semantics", "annotation", "annotation-xml",
];

static ATTRIBUTES: &[&str] = &[
    "", "abbr", "accept", "accept-charset", "accesskey", "action", "align", "allow",
    "allowfullscreen", "alt", "aria-controls", "aria-describedby", "aria-expanded", "aria-hidden", "aria-label", "aria-labelledby",
    "aria-live", "aria-selected", "async", "autocapitalize", "autocomplete", "autofocus", "autoplay", "bgcolor",
    "border", "cellpadding", "cellspacing", "charset", "checked", "cite", "class", "color",
    "cols", "colspan", "content", "contenteditable", "controls", "coords", "crossorigin", "d",
    "data", "datetime", "decoding", "default", "defer", "dir", "dirname", "disabled",
    "download", "draggable", "enctype", "enterkeyhint", "fill", "for", "form", "formaction",
    "frameborder", "headers", "height", "hidden", "high", "href", "hreflang", "http-equiv",
    "id", "inert", "inputmode", "integrity", "is", "itemid", "itemprop", "itemscope",
    "itemtype", "kind", "label", "lang", "list", "loading", "loop", "low",
    "max", "maxlength", "media", "method", "min", "minlength", "multiple", "muted",
    "name", "nomodule", "nonce", "novalidate", "open", "optimum", "pattern", "ping",
    "placeholder", "playsinline", "popover", "poster", "preload", "property", "readonly", "referrerpolicy",
    "rel", "required", "reversed", "role", "rows", "rowspan", "sandbox", "scope",
    "selected", "shape", "size", "sizes", "slot", "span", "spellcheck", "src",
    "srcdoc", "srclang", "srcset", "start", "step", "stroke", "stroke-width", "style",
    "tabindex", "target", "title", "translate", "type", "usemap", "valign", "value",
    "viewbox", "width", "wrap", "xmlns", "xmlns:xlink", "xlink:href", "x", "y",
    "cx", "cy", "r", "rx", "ry", "x1", "x2", "y1",
    "y2", "points", "transform", "fill-rule", "clip-rule", "stroke-linecap", "stroke-linejoin", "opacity",
    "version", "focusable", "data-src", "data-id", "data-type", "data-toggle", "data-target", "nowrap",
];

static ELEMENTS_BY_NAME: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| by_name(ELEMENTS));
static ATTRIBUTES_BY_NAME: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| by_name(ATTRIBUTES));

fn by_name(table: &'static [&'static str]) -> HashMap<&'static str, u8> {
    table
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, name)| (*name, i as u8))
        .collect()
}

/// Code for an element name, matched case insensitively.
pub fn element_code(name: &str) -> Option<u8> {
    match ELEMENTS_BY_NAME.get(name) {
        Some(code) => Some(*code),
        None => ELEMENTS_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied(),
    }
}

pub fn element_name(code: u8) -> Option<&'static str> {
    match code {
        ELEMENT_NAME_UNKNOWN => None,
        c => ELEMENTS.get(c as usize).copied(),
    }
}

/// Code for an attribute name, matched exactly.
pub fn attribute_code(name: &str) -> Option<u8> {
    ATTRIBUTES_BY_NAME.get(name).copied()
}

pub fn attribute_name(code: u8) -> Option<&'static str> {
    match code {
        ATTRIBUTE_NAME_UNKNOWN => None,
        c => ATTRIBUTES.get(c as usize).copied(),
    }
}

#[cfg(test)]
mod test_names {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tables_fit_in_a_byte() {
        assert!(ELEMENTS.len() <= 256);
        assert!(ATTRIBUTES.len() <= 256);
    }

    #[test]
    fn no_duplicates() {
        let elements: HashSet<_> = ELEMENTS.iter().collect();
        assert_eq!(elements.len(), ELEMENTS.len());

        let attributes: HashSet<_> = ATTRIBUTES.iter().collect();
        assert_eq!(attributes.len(), ATTRIBUTES.len());
    }

    #[test]
    fn no_equals_in_attribute_names() {
        assert!(ATTRIBUTES.iter().all(|name| !name.contains('=')));
    }

    #[test]
    fn element_lookup() {
        let code = element_code("p").unwrap();
        assert_ne!(code, ELEMENT_NAME_UNKNOWN);
        assert_eq!(element_name(code), Some("p"));
        assert_eq!(element_code("DIV"), element_code("div"));
        assert_eq!(element_code("my-widget"), None);
        assert_eq!(element_code(""), None);
    }

    #[test]
    fn attribute_lookup() {
        let code = attribute_code("href").unwrap();
        assert_eq!(attribute_name(code), Some("href"));
        assert_eq!(attribute_code("data-custom-xyz"), None);
        assert_eq!(attribute_code(""), None);
    }

    #[test]
    fn reserved_codes() {
        assert_eq!(element_name(ELEMENT_NAME_UNKNOWN), None);
        assert_eq!(attribute_name(ATTRIBUTE_NAME_UNKNOWN), None);
        assert_eq!(element_name(255), None);
        assert_eq!(attribute_name(255), None);
    }
}
