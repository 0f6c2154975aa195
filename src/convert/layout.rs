//! Node classification and the mapping of box styles onto node fields.

use cssparser::{ParseError, Parser, ParserInput, Token};

use super::color::{background_shorthand_color, try_parse_color};
use super::units::{Length, parse_length_list, parse_number_or_percent, resolve_offset, resolve_size};
use crate::config::ConverterConfig;
use crate::css::{EffectiveStyle, Viewport};
use crate::design::{
    AxisAlign, DesignNode, LayoutMode, NodeKind, Padding, Paint, Rgba, SizingMode, TextAlign,
};
use crate::resources::ResourceSnapshot;

/// Tags whose content renders as a single run of text.
const TEXT_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "a", "strong", "em", "b", "i", "u", "s",
    "small", "mark", "label", "code", "q", "cite", "abbr", "sub", "sup", "time", "figcaption",
];

/// Form controls, kept as frames so their box styling survives.
const FORM_TAGS: &[&str] = &["input", "button", "select", "textarea"];

/// Decide the node kind for an element from its tag. The style is not
/// consulted: every property flows down the tree, so its `display` may
/// belong to an ancestor.
pub fn classify(tag: &str, _style: &EffectiveStyle) -> NodeKind {
    let tag = tag.to_ascii_lowercase();
    match tag.as_str() {
        "svg" => NodeKind::Vector,
        "img" => NodeKind::Image,
        t if FORM_TAGS.contains(&t) => NodeKind::Frame,
        t if TEXT_TAGS.contains(&t) => NodeKind::Text,
        _ => NodeKind::Frame,
    }
}

fn is_flex(style: &EffectiveStyle) -> bool {
    style.is("display", "flex") || style.is("display", "inline-flex")
}

/// Geometry and auto-layout fields derived from one element's style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutProps {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub padding: Option<Padding>,
    pub layout_mode: Option<LayoutMode>,
    pub primary_axis_sizing_mode: Option<SizingMode>,
    pub counter_axis_sizing_mode: Option<SizingMode>,
    pub primary_axis_align_items: Option<AxisAlign>,
    pub counter_axis_align_items: Option<AxisAlign>,
    pub item_spacing: Option<f64>,
}

impl LayoutProps {
    pub fn apply_to(&self, node: &mut DesignNode) {
        node.width = self.width;
        node.height = self.height;
        node.x = self.x;
        node.y = self.y;
        if let Some(padding) = self.padding {
            node.set_padding(padding);
        }
        node.layout_mode = self.layout_mode;
        node.primary_axis_sizing_mode = self.primary_axis_sizing_mode;
        node.counter_axis_sizing_mode = self.counter_axis_sizing_mode;
        node.primary_axis_align_items = self.primary_axis_align_items;
        node.counter_axis_align_items = self.counter_axis_align_items;
        node.item_spacing = self.item_spacing;
    }
}

/// Map size, position, padding and flex properties. Margins are not
/// mapped; spacing between siblings comes from the parent's `gap`.
pub fn layout_props(style: &EffectiveStyle, viewport: Viewport, config: &ConverterConfig) -> LayoutProps {
    let root = config.root_font_size;
    let basis_w = (viewport.width > 0).then_some(f64::from(viewport.width));
    let basis_h = (viewport.height > 0).then_some(f64::from(viewport.height));

    let mut props = LayoutProps {
        width: resolve_size(style.get("width"), basis_w, root),
        height: resolve_size(style.get("height"), basis_h, root),
        ..LayoutProps::default()
    };

    let positioned = ["absolute", "fixed", "relative"]
        .iter()
        .any(|p| style.is("position", p));
    if positioned {
        props.x = resolve_offset(style.get("left"), basis_w, root);
        props.y = resolve_offset(style.get("top"), basis_h, root);
    }

    props.padding = padding(style, basis_w, root);

    if is_flex(style) {
        let vertical = style
            .get("flex-direction")
            .is_some_and(|d| d.trim().to_ascii_lowercase().starts_with("column"));
        props.layout_mode = Some(if vertical {
            LayoutMode::Vertical
        } else {
            LayoutMode::Horizontal
        });
        props.primary_axis_sizing_mode = Some(SizingMode::Auto);
        props.counter_axis_sizing_mode = Some(SizingMode::Auto);
        props.primary_axis_align_items = style.get("justify-content").and_then(axis_align);
        props.counter_axis_align_items = style.get("align-items").and_then(axis_align);
        props.item_spacing = item_spacing(style, vertical, basis_w, root);
    }

    props
}

/// Expand the `padding` shorthand: one value for all sides, two for
/// vertical and horizontal, four for top, right, bottom, left. Any other
/// count, or an unparseable component, gives zero padding.
pub fn expand_padding(value: &str, basis: Option<f64>, root_font_size: f64) -> Padding {
    let Some(lengths) = parse_length_list(value) else {
        return Padding::default();
    };
    let px = |l: &Length| l.to_px(basis, root_font_size).unwrap_or(0.0).max(0.0);
    match lengths.as_slice() {
        [all] => Padding::uniform(px(all)),
        [vertical, horizontal] => Padding {
            top: px(vertical),
            right: px(horizontal),
            bottom: px(vertical),
            left: px(horizontal),
        },
        [top, right, bottom, left] => Padding {
            top: px(top),
            right: px(right),
            bottom: px(bottom),
            left: px(left),
        },
        _ => Padding::default(),
    }
}

fn padding(style: &EffectiveStyle, basis: Option<f64>, root: f64) -> Option<Padding> {
    let shorthand = style.get("padding");
    let longhands = [
        style.get("padding-top"),
        style.get("padding-right"),
        style.get("padding-bottom"),
        style.get("padding-left"),
    ];
    if shorthand.is_none() && longhands.iter().all(Option::is_none) {
        return None;
    }

    let mut padding = shorthand
        .map(|v| expand_padding(v, basis, root))
        .unwrap_or_default();
    let side = |v: Option<&str>| resolve_size(v, basis, root);
    if let Some(top) = side(longhands[0]) {
        padding.top = top;
    }
    if let Some(right) = side(longhands[1]) {
        padding.right = right;
    }
    if let Some(bottom) = side(longhands[2]) {
        padding.bottom = bottom;
    }
    if let Some(left) = side(longhands[3]) {
        padding.left = left;
    }
    Some(padding)
}

/// Spacing between flex items along the main axis. `gap` lists the row
/// gap first, so a horizontal row uses the second value when present.
fn item_spacing(style: &EffectiveStyle, vertical: bool, basis: Option<f64>, root: f64) -> Option<f64> {
    let axis_specific = if vertical {
        style.get("row-gap")
    } else {
        style.get("column-gap")
    };
    if let Some(value) = axis_specific {
        return resolve_size(Some(value), basis, root);
    }

    let gap = style.get("gap")?;
    let lengths = parse_length_list(gap)?;
    let chosen = match lengths.as_slice() {
        [single] => single,
        [row, column] => {
            if vertical {
                row
            } else {
                column
            }
        }
        _ => return None,
    };
    chosen.to_px(basis, root).map(|v| v.max(0.0))
}

fn axis_align(value: &str) -> Option<AxisAlign> {
    let align = match value.trim().to_ascii_lowercase().as_str() {
        "flex-start" | "start" | "left" | "baseline" => AxisAlign::Min,
        "center" => AxisAlign::Center,
        "flex-end" | "end" | "right" => AxisAlign::Max,
        "space-between" | "space-around" | "space-evenly" => AxisAlign::SpaceBetween,
        _ => return None,
    };
    Some(align)
}

pub fn text_align(style: &EffectiveStyle) -> Option<TextAlign> {
    let align = match style.get("text-align")?.trim().to_ascii_lowercase().as_str() {
        "left" | "start" => TextAlign::Left,
        "center" => TextAlign::Center,
        "right" | "end" => TextAlign::Right,
        "justify" => TextAlign::Justified,
        _ => return None,
    };
    Some(align)
}

/// URL of a `background-image` (or of the `background` shorthand).
pub fn background_image_url(style: &EffectiveStyle) -> Option<String> {
    style
        .get("background-image")
        .and_then(first_url)
        .or_else(|| style.get("background").and_then(first_url))
}

fn first_url(value: &str) -> Option<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    loop {
        let token = parser.next().ok()?.clone();
        match token {
            Token::UnquotedUrl(url) => return Some(url.to_string()),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                return parser
                    .parse_nested_block(|i| {
                        i.expect_string()
                            .map(|s| s.to_string())
                            .map_err(Into::<ParseError<'_, ()>>::into)
                    })
                    .ok();
            }
            Token::Function(_) => {
                let _ = parser.parse_nested_block(|i| -> Result<(), ParseError<'_, ()>> {
                    while i.next().is_ok() {}
                    Ok(())
                });
            }
            _ => {}
        }
    }
}

/// Background colour from `background-color`, else from the `background`
/// shorthand. Fully transparent colours count as none.
pub fn background_color(style: &EffectiveStyle) -> Option<Rgba> {
    style
        .get("background-color")
        .and_then(try_parse_color)
        .or_else(|| style.get("background").and_then(background_shorthand_color))
        .filter(|c| !c.is_transparent())
}

/// Fills, strokes, radius and opacity of a box.
pub fn apply_box_style(
    node: &mut DesignNode,
    style: &EffectiveStyle,
    resources: &ResourceSnapshot,
    config: &ConverterConfig,
) {
    if let Some(color) = background_color(style) {
        node.fills.push(Paint::solid(color));
    }
    if let Some(url) = background_image_url(style) {
        match resources.image(&url) {
            Some(image) => node.fills.push(Paint::image(image.hash.clone())),
            None => tracing::debug!(url = %url, "background image not available"),
        }
    }

    if let Some((weight, color)) = border(style, config.root_font_size) {
        node.strokes.push(Paint::solid(color));
        node.stroke_weight = Some(weight);
    }

    if let Some(radius) = style
        .get("border-radius")
        .and_then(parse_length_list)
        .and_then(|lengths| lengths.first().copied())
        .and_then(|l| l.to_px(None, config.root_font_size))
    {
        node.corner_radius = Some(radius.max(0.0));
    }

    apply_opacity(node, style);
}

pub fn apply_opacity(node: &mut DesignNode, style: &EffectiveStyle) {
    if let Some(opacity) = style.get("opacity").and_then(parse_number_or_percent) {
        node.opacity = Some(opacity.clamp(0.0, 1.0));
    }
}

/// Stroke from `border` or `border-width`/`border-color`. A missing or
/// `none` style, or zero width, means no stroke.
fn border(style: &EffectiveStyle, root: f64) -> Option<(f64, Rgba)> {
    let mut width = None;
    let mut color = None;
    let mut line_style = None;

    if let Some(shorthand) = style.get("border") {
        if shorthand.trim().eq_ignore_ascii_case("none") {
            line_style = Some("none".to_string());
        }
        for part in shorthand.split_whitespace() {
            if let Some(length) = Length::parse(part) {
                width = length.to_px(None, root);
            } else if let Some(c) = try_parse_color(part) {
                color = Some(c);
            } else {
                line_style = Some(part.to_ascii_lowercase());
            }
        }
    }
    if let Some(w) = style.get("border-width").and_then(Length::parse) {
        width = w.to_px(None, root);
    }
    if let Some(c) = style.get("border-color").and_then(try_parse_color) {
        color = Some(c);
    }
    if let Some(s) = style.get("border-style") {
        line_style = Some(s.trim().to_ascii_lowercase());
    }

    if matches!(line_style.as_deref(), Some("none" | "hidden")) {
        return None;
    }
    // Longhands alone imply a visible border.
    if line_style.is_none() && style.get("border-width").is_none() {
        return None;
    }
    let width = width.unwrap_or(1.0);
    if width <= 0.0 {
        return None;
    }
    Some((width, color.unwrap_or(Rgba::BLACK)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(pairs: &[(&str, &str)]) -> EffectiveStyle {
        pairs.iter().copied().collect()
    }

    fn layout(pairs: &[(&str, &str)]) -> LayoutProps {
        layout_props(&style(pairs), Viewport::new(1000, 500), &ConverterConfig::default())
    }

    #[test]
    fn test_classify() {
        let none = EffectiveStyle::default();
        assert_eq!(classify("svg", &none), NodeKind::Vector);
        assert_eq!(classify("h1", &none), NodeKind::Text);
        assert_eq!(classify("P", &none), NodeKind::Text);
        assert_eq!(classify("img", &none), NodeKind::Image);
        assert_eq!(classify("button", &none), NodeKind::Frame);
        assert_eq!(classify("section", &none), NodeKind::Frame);
        assert_eq!(classify("span", &style(&[("display", "flex")])), NodeKind::Text);
    }

    #[test]
    fn test_padding_expansion() {
        let p = expand_padding("10px", None, 16.0);
        assert_eq!(p, Padding::uniform(10.0));
        let p = expand_padding("10px 20px", None, 16.0);
        assert_eq!(p, Padding { top: 10.0, right: 20.0, bottom: 10.0, left: 20.0 });
        let p = expand_padding("1 2 3 4", None, 16.0);
        assert_eq!(p, Padding { top: 1.0, right: 2.0, bottom: 3.0, left: 4.0 });
        assert_eq!(expand_padding("1px 2px 3px", None, 16.0), Padding::default());
        assert_eq!(expand_padding("1px 2px 3px 4px 5px", None, 16.0), Padding::default());
        assert_eq!(expand_padding("wide", None, 16.0), Padding::default());
    }

    #[test]
    fn test_padding_longhands_override() {
        let props = layout(&[("padding", "8px"), ("padding-left", "2em")]);
        assert_eq!(
            props.padding,
            Some(Padding { top: 8.0, right: 8.0, bottom: 8.0, left: 32.0 })
        );
        assert_eq!(layout(&[]).padding, None);
    }

    #[test]
    fn test_sizes() {
        let props = layout(&[("width", "50%"), ("height", "10rem")]);
        assert_eq!(props.width, Some(500.0));
        assert_eq!(props.height, Some(160.0));
        let props = layout(&[("width", "auto"), ("height", "bogus")]);
        assert_eq!(props.width, None);
        assert_eq!(props.height, Some(0.0));

        let zero = layout_props(
            &style(&[("width", "50%")]),
            Viewport::new(0, 0),
            &ConverterConfig::default(),
        );
        assert_eq!(zero.width, None);
    }

    #[test]
    fn test_flex_mapping() {
        let props = layout(&[
            ("display", "flex"),
            ("gap", "12px"),
            ("justify-content", "space-between"),
            ("align-items", "center"),
        ]);
        assert_eq!(props.layout_mode, Some(LayoutMode::Horizontal));
        assert_eq!(props.primary_axis_sizing_mode, Some(SizingMode::Auto));
        assert_eq!(props.counter_axis_sizing_mode, Some(SizingMode::Auto));
        assert_eq!(props.item_spacing, Some(12.0));
        assert_eq!(props.primary_axis_align_items, Some(AxisAlign::SpaceBetween));
        assert_eq!(props.counter_axis_align_items, Some(AxisAlign::Center));

        let column = layout(&[("display", "flex"), ("flex-direction", "column"), ("gap", "4px 9px")]);
        assert_eq!(column.layout_mode, Some(LayoutMode::Vertical));
        assert_eq!(column.item_spacing, Some(4.0));

        let row = layout(&[("display", "flex"), ("gap", "4px 9px")]);
        assert_eq!(row.item_spacing, Some(9.0));

        assert_eq!(layout(&[("display", "block"), ("gap", "4px")]).layout_mode, None);
    }

    #[test]
    fn test_position_offsets() {
        let props = layout(&[("position", "absolute"), ("left", "10px"), ("top", "-5px")]);
        assert_eq!((props.x, props.y), (Some(10.0), Some(0.0)));
        let props = layout(&[("position", "fixed"), ("left", "-20px"), ("top", "-5px")]);
        assert_eq!((props.x, props.y), (Some(0.0), Some(0.0)));
        let props = layout(&[("left", "10px")]);
        assert_eq!(props.x, None);
    }

    #[test]
    fn test_box_style() {
        let mut node = DesignNode::new(NodeKind::Frame, "div");
        apply_box_style(
            &mut node,
            &style(&[
                ("background-color", "#fff"),
                ("border", "2px solid red"),
                ("border-radius", "6px"),
                ("opacity", "1.7"),
            ]),
            &ResourceSnapshot::default(),
            &ConverterConfig::default(),
        );
        assert_eq!(node.fills, vec![Paint::solid(Rgba::WHITE)]);
        assert_eq!(node.strokes, vec![Paint::solid(Rgba::new(1.0, 0.0, 0.0, 1.0))]);
        assert_eq!(node.stroke_weight, Some(2.0));
        assert_eq!(node.corner_radius, Some(6.0));
        assert_eq!(node.opacity, Some(1.0));
    }

    #[test]
    fn test_border_variants() {
        assert_eq!(border(&style(&[("border", "none")]), 16.0), None);
        assert_eq!(border(&style(&[("border", "0 solid red")]), 16.0), None);
        assert_eq!(
            border(&style(&[("border-width", "3px"), ("border-color", "blue")]), 16.0),
            Some((3.0, Rgba::new(0.0, 0.0, 1.0, 1.0)))
        );
        assert_eq!(border(&style(&[("border-color", "blue")]), 16.0), None);
        assert_eq!(
            border(&style(&[("border", "1px solid #000"), ("border-style", "hidden")]), 16.0),
            None
        );
    }

    #[test]
    fn test_background_sources() {
        assert_eq!(background_color(&style(&[("background", "#000 url(x.png)")])), Some(Rgba::BLACK));
        assert_eq!(background_color(&style(&[("background-color", "transparent")])), None);
        assert_eq!(
            background_image_url(&style(&[("background-image", "url(\"a b.png\")")])),
            Some("a b.png".to_string())
        );
        assert_eq!(
            background_image_url(&style(&[("background", "linear-gradient(red, blue), url(hero.jpg)")])),
            Some("hero.jpg".to_string())
        );
        assert_eq!(background_image_url(&style(&[("background-image", "none")])), None);
    }

    #[test]
    fn test_text_align() {
        assert_eq!(text_align(&style(&[("text-align", "center")])), Some(TextAlign::Center));
        assert_eq!(text_align(&style(&[("text-align", "justify")])), Some(TextAlign::Justified));
        assert_eq!(text_align(&EffectiveStyle::default()), None);
    }
}
