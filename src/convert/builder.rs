//! The recursive walk from source elements to design nodes.

use tracing::debug;

use super::color::parse_color;
use super::font::text_style;
use super::layout::{
    LayoutProps, apply_box_style, apply_opacity, classify, layout_props, text_align,
};
use super::vector::convert_svg;
use crate::config::ConverterConfig;
use crate::css::{EffectiveStyle, RuleSet, Viewport, resolve};
use crate::design::{DesignNode, NodeKind, Paint, Rgba};
use crate::dom::{Dom, ElementRef, NodeId, conversion_root};
use crate::resources::ResourceSnapshot;

/// Elements that never render. Their subtrees are skipped entirely.
pub const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "title", "head", "noscript", "template",
];

/// Longest name given to a synthesized text node.
const TEXT_NAME_LEN: usize = 32;

fn is_skipped(tag: &str) -> bool {
    SKIPPED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_hidden(style: &EffectiveStyle, config: &ConverterConfig) -> bool {
    config.skip_hidden && style.is("display", "none")
}

/// The conversion root and its style. The root inherits from `<html>`
/// when it is the body.
pub(crate) fn root_style(dom: &Dom, rules: &RuleSet) -> (NodeId, EffectiveStyle) {
    let root = conversion_root(dom);
    let html_style = dom
        .find_by_tag("html")
        .filter(|&html| html != root)
        .map(|html| resolve(ElementRef::new(dom, html), rules, None));
    let style = if dom.is_element(root) {
        resolve(ElementRef::new(dom, root), rules, html_style.as_ref())
    } else {
        html_style.unwrap_or_default()
    };
    (root, style)
}

/// Visit every rendered element under the conversion root, root included,
/// with its effective style. Skipped tags and hidden subtrees are not
/// visited.
pub fn walk_styled<F>(dom: &Dom, rules: &RuleSet, config: &ConverterConfig, mut visit: F)
where
    F: FnMut(&Dom, NodeId, &EffectiveStyle),
{
    fn walk<F>(dom: &Dom, rules: &RuleSet, config: &ConverterConfig, id: NodeId, style: &EffectiveStyle, visit: &mut F)
    where
        F: FnMut(&Dom, NodeId, &EffectiveStyle),
    {
        visit(dom, id, style);
        for child in dom.element_children(id) {
            if dom.tag_name(child).is_some_and(is_skipped) {
                continue;
            }
            let child_style = resolve(ElementRef::new(dom, child), rules, Some(style));
            if is_hidden(&child_style, config) {
                continue;
            }
            walk(dom, rules, config, child, &child_style, visit);
        }
    }

    let (root, style) = root_style(dom, rules);
    walk(dom, rules, config, root, &style, &mut visit);
}

/// Builds the design tree for one prepared page.
pub(crate) struct TreeBuilder<'a> {
    dom: &'a Dom,
    rules: &'a RuleSet,
    resources: &'a ResourceSnapshot,
    config: &'a ConverterConfig,
    viewport: Viewport,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        dom: &'a Dom,
        rules: &'a RuleSet,
        resources: &'a ResourceSnapshot,
        config: &'a ConverterConfig,
        viewport: Viewport,
    ) -> Self {
        Self {
            dom,
            rules,
            resources,
            config,
            viewport,
        }
    }

    /// The root Frame, sized to the viewport.
    pub fn build_root(&self, root: NodeId, style: &EffectiveStyle) -> DesignNode {
        let name = self.dom.tag_name(root).unwrap_or("body");
        let children = self.build_children(root, style);

        let mut node = DesignNode::new(NodeKind::Frame, name);
        layout_props(style, self.viewport, self.config).apply_to(&mut node);
        apply_box_style(&mut node, style, self.resources, self.config);
        node.set_size(f64::from(self.viewport.width), f64::from(self.viewport.height));
        node.x = None;
        node.y = None;
        node.children = children;
        node
    }

    fn build_element(&self, id: NodeId, parent_style: &EffectiveStyle) -> Option<DesignNode> {
        let tag = self.dom.tag_name(id)?.to_ascii_lowercase();
        if is_skipped(&tag) {
            return None;
        }

        let style = resolve(ElementRef::new(self.dom, id), self.rules, Some(parent_style));
        if is_hidden(&style, self.config) {
            debug!(tag = %tag, "skipping hidden element");
            return None;
        }

        let kind = match classify(&tag, &style) {
            NodeKind::Vector => return Some(self.build_svg(id, &style)),
            NodeKind::Image => match self.build_image(id, &style) {
                Some(node) => return Some(node),
                None => NodeKind::Frame,
            },
            kind => kind,
        };

        let children = self.build_children(id, &style);
        Some(self.assemble(id, &tag, kind, &style, children))
    }

    /// Children in document order. Text between elements becomes Text
    /// nodes; an element without element children gets its whole trimmed
    /// text as a single Text child.
    fn build_children(&self, id: NodeId, style: &EffectiveStyle) -> Vec<DesignNode> {
        if self.dom.element_children(id).next().is_none() {
            let text = collapse_whitespace(&self.dom.text_content(id));
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![self.text_node(&text, style)]
            };
        }

        let mut out = Vec::new();
        let mut run = String::new();
        for child in self.dom.children(id) {
            if let Some(text) = self.dom.text(child) {
                run.push_str(text);
            } else if self.dom.is_element(child) {
                self.flush_text(&mut run, style, &mut out);
                if let Some(node) = self.build_element(child, style) {
                    out.push(node);
                }
            }
        }
        self.flush_text(&mut run, style, &mut out);
        out
    }

    fn flush_text(&self, run: &mut String, style: &EffectiveStyle, out: &mut Vec<DesignNode>) {
        let text = collapse_whitespace(run);
        if !text.is_empty() {
            out.push(self.text_node(&text, style));
        }
        run.clear();
    }

    fn text_node(&self, text: &str, style: &EffectiveStyle) -> DesignNode {
        let name: String = text.chars().take(TEXT_NAME_LEN).collect();
        let mut node = DesignNode::new(NodeKind::Text, name);
        node.characters = Some(text.to_string());
        self.apply_text_style(&mut node, style);
        node
    }

    fn apply_text_style(&self, node: &mut DesignNode, style: &EffectiveStyle) {
        node.style = Some(text_style(style, self.config, self.resources));
        let color = style.get("color").map(parse_color).unwrap_or(Rgba::BLACK);
        node.fills = vec![Paint::solid(color)];
        node.text_align_horizontal = text_align(style);
    }

    /// Build the node for an element once its children are known.
    fn assemble(
        &self,
        id: NodeId,
        tag: &str,
        kind: NodeKind,
        style: &EffectiveStyle,
        children: Vec<DesignNode>,
    ) -> DesignNode {
        let props = layout_props(style, self.viewport, self.config);

        if kind == NodeKind::Text {
            if children.iter().all(|c| c.kind == NodeKind::Text) {
                return self.merge_text(id, tag, style, &props);
            }
            debug!(tag = %tag, "text element has non-text children, emitting frame");
        }

        let mut node = DesignNode::new(NodeKind::Frame, tag);
        props.apply_to(&mut node);
        apply_box_style(&mut node, style, self.resources, self.config);
        node.children = children;
        node
    }

    /// A Text node whose children were all text. The rendered text of the
    /// whole subtree is collapsed once, so inline markup inside a word
    /// adds no spaces.
    fn merge_text(
        &self,
        id: NodeId,
        tag: &str,
        style: &EffectiveStyle,
        props: &LayoutProps,
    ) -> DesignNode {
        let mut raw = String::new();
        self.rendered_text(id, style, &mut raw);

        let mut node = DesignNode::new(NodeKind::Text, tag);
        node.width = props.width;
        node.height = props.height;
        node.x = props.x;
        node.y = props.y;
        node.characters = Some(collapse_whitespace(&raw));
        self.apply_text_style(&mut node, style);
        apply_opacity(&mut node, style);
        node
    }

    /// Raw text under `id` in document order, leaving out skipped tags and
    /// hidden subtrees.
    fn rendered_text(&self, id: NodeId, style: &EffectiveStyle, out: &mut String) {
        for child in self.dom.children(id) {
            if let Some(text) = self.dom.text(child) {
                out.push_str(text);
                continue;
            }
            let Some(tag) = self.dom.tag_name(child) else {
                continue;
            };
            if is_skipped(tag) {
                continue;
            }
            let child_style = resolve(ElementRef::new(self.dom, child), self.rules, Some(style));
            if !is_hidden(&child_style, self.config) {
                self.rendered_text(child, &child_style, out);
            }
        }
    }

    fn build_svg(&self, id: NodeId, style: &EffectiveStyle) -> DesignNode {
        let mut node = convert_svg(self.dom, id, self.config);
        let props = layout_props(style, self.viewport, self.config);
        if node.width.is_none() {
            node.width = props.width;
        }
        if node.height.is_none() {
            node.height = props.height;
        }
        apply_opacity(&mut node, style);
        node
    }

    /// A RECTANGLE with an image fill, or `None` when the image is not in
    /// the snapshot.
    fn build_image(&self, id: NodeId, style: &EffectiveStyle) -> Option<DesignNode> {
        let src = self.dom.get_attr(id, "src").map(str::trim).unwrap_or("");
        let Some(image) = self.resources.image(src) else {
            debug!(src = %src, "image not available, emitting frame");
            return None;
        };

        let props = layout_props(style, self.viewport, self.config);
        let attr = |name: &str| {
            self.dom
                .get_attr(id, name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<f64>().ok())
        };
        let natural_w = image.width.map(f64::from);
        let natural_h = image.height.map(f64::from);

        let mut width = props.width.or_else(|| attr("width"));
        let mut height = props.height.or_else(|| attr("height"));
        // Keep the aspect ratio when only one side is given.
        if let (Some(nw), Some(nh)) = (natural_w, natural_h)
            && nw > 0.0
            && nh > 0.0
        {
            match (width, height) {
                (Some(w), None) => height = Some(w * nh / nw),
                (None, Some(h)) => width = Some(h * nw / nh),
                _ => {}
            }
        }

        let mut node = DesignNode::new(NodeKind::Image, "img");
        node.width = width.or(natural_w).map(|w| w.max(0.0));
        node.height = height.or(natural_h).map(|h| h.max(0.0));
        node.x = props.x;
        node.y = props.y;
        apply_box_style(&mut node, style, self.resources, self.config);
        node.fills.push(Paint::image(image.hash.clone()));
        Some(node)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{MediaContext, Stylesheet};
    use crate::dom::parse_html;
    use crate::resources::{Fetched, ImageResource};

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    fn build_with(html: &str, css: &str, resources: &ResourceSnapshot) -> DesignNode {
        let dom = parse_html(html);
        let viewport = Viewport::new(800, 600);
        let rules = RuleSet::new(&Stylesheet::parse(css), &MediaContext::new(viewport, None));
        let config = ConverterConfig::default();
        let (root, style) = root_style(&dom, &rules);
        TreeBuilder::new(&dom, &rules, resources, &config, viewport).build_root(root, &style)
    }

    fn build(html: &str, css: &str) -> DesignNode {
        build_with(html, css, &ResourceSnapshot::default())
    }

    #[test]
    fn test_div_with_paragraph() {
        let root = build("<div><p>Hello</p></div>", "");
        assert_eq!(root.name, "body");
        assert_eq!((root.width, root.height), (Some(800.0), Some(600.0)));

        let div = &root.children[0];
        assert_eq!(div.kind, NodeKind::Frame);
        assert_eq!(div.name, "div");
        assert_eq!(div.children.len(), 1);

        let p = &div.children[0];
        assert_eq!(p.kind, NodeKind::Text);
        assert_eq!(p.characters.as_deref(), Some("Hello"));
        assert!(p.children.is_empty());
        assert_eq!(p.style.as_ref().map(|s| s.font_family.as_str()), Some("Inter"));
    }

    #[test]
    fn test_non_rendering_tags_dropped() {
        let root = build(
            "<html><head><title>T</title><meta charset=utf-8><link rel=x href=y>\
             <style>p{}</style></head><body><script>x()</script>\
             <div><style>a{}</style><noscript>n</noscript><span>ok</span></div></body></html>",
            "",
        );
        for node in root.descendants() {
            assert!(!is_skipped(&node.name), "found {}", node.name);
        }
        assert!(root.find("span").is_some());
    }

    #[test]
    fn test_mixed_content() {
        let root = build("<div>Intro <em>bold</em> tail</div>", "");
        let div = &root.children[0];
        let names: Vec<_> = div.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Intro", "em", "tail"]);
        assert!(div.children.iter().all(|c| c.kind == NodeKind::Text));
    }

    #[test]
    fn test_inline_text_merged() {
        let root = build("<p>Hello <strong>big</strong>   world</p>", "");
        let p = &root.children[0];
        assert_eq!(p.kind, NodeKind::Text);
        assert_eq!(p.characters.as_deref(), Some("Hello big world"));
    }

    #[test]
    fn test_inline_markup_inside_word_adds_no_space() {
        let root = build("<p>Hello<strong>World</strong>!</p>", "");
        assert_eq!(root.children[0].characters.as_deref(), Some("HelloWorld!"));

        let root = build("<p>a<span style='display:none'>x</span>b<em> c</em></p>", "");
        assert_eq!(root.children[0].characters.as_deref(), Some("ab c"));
    }

    #[test]
    fn test_text_node_demoted() {
        let root = build("<p>See <button>Go</button></p>", "");
        let p = &root.children[0];
        assert_eq!(p.kind, NodeKind::Frame);
        assert_eq!(p.children[1].name, "button");
        assert_eq!(p.children[1].children[0].characters.as_deref(), Some("Go"));
    }

    #[test]
    fn test_hidden_subtree_skipped() {
        let root = build(r#"<div class="x">a</div><div style="display:none">b</div>"#, ".x { display: block }");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_text_styling() {
        let root = build(
            r#"<h1 class="t">Title</h1>"#,
            ".t { color: #ff0000; font-size: 2em; font-weight: 650; text-align: center }",
        );
        let h1 = &root.children[0];
        let style = h1.style.as_ref().unwrap();
        assert_eq!(style.font_size, 32.0);
        assert_eq!(style.font_weight, 700);
        assert_eq!(h1.fills, vec![Paint::solid(Rgba::new(1.0, 0.0, 0.0, 1.0))]);
        assert_eq!(h1.text_align_horizontal, Some(crate::design::TextAlign::Center));
    }

    #[test]
    fn test_flex_container() {
        let root = build(
            r#"<section class="row"><div>a</div><div>b</div></section>"#,
            ".row { display: flex; gap: 8px; padding: 4px 2px; background: #000 }",
        );
        let row = &root.children[0];
        assert_eq!(row.layout_mode, Some(crate::design::LayoutMode::Horizontal));
        assert_eq!(row.item_spacing, Some(8.0));
        assert_eq!(row.padding_left, Some(2.0));
        assert_eq!(row.fills, vec![Paint::solid(Rgba::BLACK)]);
        assert_eq!(row.children.len(), 2);
    }

    #[test]
    fn test_image_with_resource() {
        let mut resources = ResourceSnapshot::default();
        let image = ImageResource::from_base64("logo.png", PIXEL_PNG, None)
            .unwrap()
            .with_dimensions(Some(40), Some(20));
        let hash = image.hash.clone();
        resources.insert_image("logo.png", Fetched::Ready(image));

        let root = build_with(r#"<img src="logo.png" style="width: 80px">"#, "", &resources);
        let img = &root.children[0];
        assert_eq!(img.kind, NodeKind::Image);
        assert_eq!((img.width, img.height), (Some(80.0), Some(40.0)));
        assert_eq!(img.fills, vec![Paint::image(hash)]);
    }

    #[test]
    fn test_missing_image_falls_back_to_frame() {
        let root = build(r#"<img src="gone.png">"#, "");
        let img = &root.children[0];
        assert_eq!(img.kind, NodeKind::Frame);
        assert_eq!(img.name, "img");
    }

    #[test]
    fn test_svg_delegated() {
        let root = build(
            r#"<svg width="24" height="24"><path d="M0 0 L10 10"/></svg><svg><path d="M 0 0 Q"/></svg>"#,
            "",
        );
        assert_eq!(root.children[0].kind, NodeKind::Vector);
        assert_eq!(root.children[0].width, Some(24.0));
        let placeholder = &root.children[1];
        assert_eq!(placeholder.kind, NodeKind::Vector);
        assert_eq!((placeholder.width, placeholder.height), (Some(100.0), Some(100.0)));
        assert!(!placeholder.fills.is_empty());
    }

    #[test]
    fn test_walk_styled_visits_rendered_elements() {
        let dom = parse_html("<div><p>x</p><script></script><span hidden style='display:none'>y</span></div>");
        let rules = RuleSet::default();
        let mut seen = Vec::new();
        walk_styled(&dom, &rules, &ConverterConfig::default(), |dom, id, _| {
            seen.push(dom.tag_name(id).unwrap_or("").to_string());
        });
        assert_eq!(seen, vec!["body", "div", "p"]);
    }
}
