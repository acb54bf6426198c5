use std::io::Cursor;

use hpack::dom::{collapse_whitespace_rcdom, parse_html, Node};
use hpack::fattr::MemAttrs;
use hpack::{
    encode, read_stream, write_htpack, Buffers, HtmlDocument, HtpackBuilder, HtpackError,
    HtpackFile, Page, PageTree, Verified, WriteOptions,
};

fn parsed_page(url: &str, html: &str) -> Page {
    let dom = parse_html(html);
    collapse_whitespace_rcdom(&dom.document);
    Page {
        url: url.to_string(),
        title: hpack::dom::title(&dom).unwrap_or_default(),
        keywords: vec![],
        tree: PageTree::ParsedTree(dom),
    }
}

#[test]
fn parsed_html_renders_back() {
    let dom = parse_html(
        "<!DOCTYPE html><html><head><title>T</title></head>\
         <body><p class=\"intro\">Hello <a href=\"/x?a=1&amp;b=2\">world</a>!</p>\
         <!-- gone --><ul><li>one</li><li data-custom-xyz=\"v\">two</li></ul></body></html>",
    );
    let mut bufs = Buffers::new();
    let packed = encode(&dom, &mut bufs).unwrap();
    let doc = HtmlDocument::new(packed.pack, packed.text);

    assert_eq!(
        doc.to_html().unwrap(),
        "<html><head><title>T</title></head>\
         <body><p class=\"intro\">Hello <a href=\"/x?a=1&amp;b=2\">world</a>!</p>\
         <ul><li>one</li><li data-custom-xyz=\"v\">two</li></ul></body></html>"
    );
    assert_eq!(doc.text(), "THello world!onetwo");
}

#[test]
fn whitespace_collapsed_before_packing() {
    let page = parsed_page("https://example.com/", "<p>a\n\n   b</p>");
    let mut bufs = Buffers::new();
    let packed = page.tree.pack(&mut bufs).unwrap();

    assert_eq!(packed.text, b"a b");
}

#[test]
fn container_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.htpack");
    let attrs = MemAttrs::new();

    let source = vec![
        Ok(parsed_page("https://a/", "<title>A</title><p>first</p>")),
        Ok(Page {
            url: "https://b/".to_string(),
            title: "B".to_string(),
            keywords: vec!["x".to_string(), "y".to_string()],
            tree: PageTree::LiveTree(Node::document(vec![Node::element(
                "p",
                &[],
                vec![
                    Node::text("A"),
                    Node::element("b", &[], vec![Node::text("B")]),
                    Node::text("C"),
                ],
            )])),
        }),
    ];
    let summary = write_htpack(&path, source, &WriteOptions::default(), &attrs).unwrap();
    assert_eq!(summary.pages, 2);
    assert_eq!(
        hpack::verify_htpack(&path, "feep", &attrs).unwrap(),
        Verified::Match
    );

    // Streaming and random access agree
    let streamed: Vec<_> = read_stream(std::fs::File::open(&path).unwrap())
        .unwrap()
        .map(|p| p.unwrap())
        .collect();
    let mut file = HtpackFile::open(&path).unwrap();
    let mut position = file.start_position();
    let mut paged = Vec::new();
    while let Some(page) = file.read_document(position).unwrap() {
        position = page.next_position();
        paged.push(page);
    }

    assert_eq!(streamed.len(), 2);
    assert_eq!(paged.len(), 2);
    for (s, p) in streamed.iter().zip(&paged) {
        assert_eq!(s.position, p.position);
        assert_eq!(s.metadata, p.metadata);
        assert_eq!(s.data(), p.data());
    }

    assert_eq!(paged[0].metadata.title, "A");
    assert_eq!(paged[1].metadata.keywords, vec!["x", "y"]);
    assert_eq!(paged[1].document().to_html().unwrap(), "<p>A<b>B</b>C</p>");
}

#[test]
fn truncated_stream_is_an_error() {
    let mut builder = HtpackBuilder::new(Vec::new());
    builder.write_file_header(&Default::default()).unwrap();
    builder
        .append_pages(vec![Ok(parsed_page("https://a/", "<p>one</p>"))], false)
        .unwrap();
    let mut raw = builder.into_inner();
    raw.pop();

    let results: Vec<Result<_, HtpackError>> = read_stream(Cursor::new(raw)).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].as_ref().unwrap_err().is_short_read());
}
