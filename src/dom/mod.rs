//! Source markup: parsing into an arena and the selector adapter over it.

mod arena;
mod element_ref;
mod tree_sink;

pub use arena::{Attribute, Dom, DomNode, NodeData, NodeId};
pub use element_ref::{DomSelectors, ElementRef};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::DomSink;

/// Parse markup into a [`Dom`]. Never fails; malformed markup is repaired
/// the way browsers repair it.
pub fn parse_html(html: &str) -> Dom {
    parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Text of every `<style>` element, in document order.
pub fn style_blocks(dom: &Dom) -> Vec<String> {
    dom.descendants(dom.document())
        .filter(|&id| dom.tag_name(id) == Some("style"))
        .map(|id| dom.text_content(id))
        .filter(|css| !css.trim().is_empty())
        .collect()
}

/// The element the conversion starts from: `<body>`, else `<html>`, else
/// the document itself.
pub fn conversion_root(dom: &Dom) -> NodeId {
    dom.find_by_tag("body")
        .or_else(|| dom.find_by_tag("html"))
        .unwrap_or(dom.document())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");
        let p = dom.find_by_tag("p").expect("should find p");
        assert_eq!(dom.tag_name(p), Some("p"));
        assert_eq!(dom.text_content(p), "Hello");
    }

    #[test]
    fn test_fragment_gets_body() {
        let dom = parse_html("<div><p>Hello</p></div>");
        let root = conversion_root(&dom);
        assert_eq!(dom.tag_name(root), Some("body"));
        let div = dom.element_children(root).next().unwrap();
        assert_eq!(dom.tag_name(div), Some("div"));
    }

    #[test]
    fn test_style_blocks_in_order() {
        let dom = parse_html(
            "<html><head><style>p { color: red }</style></head>\
             <body><style>  </style><style>div { gap: 4px }</style></body></html>",
        );
        assert_eq!(
            style_blocks(&dom),
            vec!["p { color: red }".to_string(), "div { gap: 4px }".to_string()]
        );
    }

    #[test]
    fn test_inline_svg_keeps_camel_case_attributes() {
        let dom = parse_html(r#"<svg viewBox="0 0 10 10"><rect width="5"/></svg>"#);
        let svg = dom.find_by_tag("svg").unwrap();
        assert_eq!(dom.get_attr(svg, "viewBox"), Some("0 0 10 10"));
    }
}
