//! Inline `<svg>` subtrees to Vector and Group nodes.
//!
//! A malformed subtree at any depth turns the whole `<svg>` into one grey
//! placeholder; it never fails the conversion.

use tracing::{debug, warn};

use super::color::parse_color;
use super::units::parse_number_or_percent;
use crate::config::ConverterConfig;
use crate::design::{DesignNode, NodeKind, Paint, Rgba, VectorPath, WindingRule};
use crate::dom::{Dom, NodeId};

#[derive(Debug, thiserror::Error)]
enum VectorError {
    #[error("invalid number in `{attribute}`: {value:?}")]
    InvalidNumber { attribute: String, value: String },

    #[error("malformed viewBox: {0:?}")]
    ViewBox(String),

    #[error("malformed path data at byte {offset}: {reason}")]
    PathData { offset: usize, reason: &'static str },

    #[error("malformed point list: {0:?}")]
    Points(String),
}

type Result<T> = std::result::Result<T, VectorError>;

/// Paint attributes, inherited down the SVG tree.
#[derive(Debug, Clone, Default)]
struct PaintContext {
    fill: Option<String>,
    stroke: Option<String>,
    stroke_width: Option<String>,
    fill_rule: Option<String>,
}

impl PaintContext {
    fn inherit(&self, dom: &Dom, id: NodeId) -> Self {
        let attr = |name: &str, parent: &Option<String>| {
            dom.get_attr(id, name)
                .map(|v| v.trim().to_string())
                .or_else(|| parent.clone())
        };
        Self {
            fill: attr("fill", &self.fill),
            stroke: attr("stroke", &self.stroke),
            stroke_width: attr("stroke-width", &self.stroke_width),
            fill_rule: attr("fill-rule", &self.fill_rule),
        }
    }
}

/// Root geometry used to resolve percentages.
#[derive(Debug, Clone, Copy)]
struct Frame {
    width: Option<f64>,
    height: Option<f64>,
}

/// Convert the `<svg>` element `svg` and everything under it.
pub fn convert_svg(dom: &Dom, svg: NodeId, config: &ConverterConfig) -> DesignNode {
    match try_convert_svg(dom, svg, config) {
        Ok(node) => node,
        Err(e) => {
            warn!(error = %e, "malformed svg, emitting placeholder");
            placeholder(config)
        }
    }
}

/// Fixed-size grey Vector standing in for unparseable markup.
pub fn placeholder(config: &ConverterConfig) -> DesignNode {
    let mut node = DesignNode::new(NodeKind::Vector, "svg");
    node.set_size(config.placeholder_size, config.placeholder_size);
    node.fills.push(Paint::solid(Rgba::PLACEHOLDER));
    node
}

fn try_convert_svg(dom: &Dom, svg: NodeId, config: &ConverterConfig) -> Result<DesignNode> {
    let mut node = DesignNode::new(NodeKind::Vector, "svg");

    let mut frame = Frame {
        width: optional_number(dom, svg, "width", None)?,
        height: optional_number(dom, svg, "height", None)?,
    };
    if let Some(view_box) = dom.get_attr(svg, "viewBox") {
        let [min_x, min_y, width, height] = parse_view_box(view_box)?;
        node.set_position(min_x, min_y);
        frame = Frame {
            width: Some(width),
            height: Some(height),
        };
    }
    node.width = frame.width.map(|w| w.max(0.0));
    node.height = frame.height.map(|h| h.max(0.0));
    if let Some(opacity) = opacity_attr(dom, svg) {
        node.opacity = Some(opacity);
    }

    let paint = PaintContext::default().inherit(dom, svg);
    node.children = convert_children(dom, svg, &paint, frame, config)?;
    Ok(node)
}

fn convert_children(
    dom: &Dom,
    parent: NodeId,
    paint: &PaintContext,
    frame: Frame,
    config: &ConverterConfig,
) -> Result<Vec<DesignNode>> {
    let mut out = Vec::new();
    for child in dom.element_children(parent) {
        if let Some(node) = convert_element(dom, child, paint, frame, config)? {
            out.push(node);
        }
    }
    Ok(out)
}

fn convert_element(
    dom: &Dom,
    id: NodeId,
    parent_paint: &PaintContext,
    frame: Frame,
    config: &ConverterConfig,
) -> Result<Option<DesignNode>> {
    let Some(tag) = dom.tag_name(id) else {
        return Ok(None);
    };
    let paint = parent_paint.inherit(dom, id);
    let num = |name: &str, basis: Option<f64>| number(dom, id, name, basis);

    let (name, path, bounds) = match tag {
        "g" | "svg" | "a" => {
            let mut group = DesignNode::new(NodeKind::Group, tag);
            group.opacity = opacity_attr(dom, id);
            group.children = convert_children(dom, id, &paint, frame, config)?;
            return Ok(Some(group));
        }
        "rect" => {
            let (x, y) = (num("x", frame.width)?, num("y", frame.height)?);
            let (w, h) = (num("width", frame.width)?, num("height", frame.height)?);
            let path = format!("M {x} {y} H {} V {} H {x} Z", x + w, y + h);
            ("rect", path, Some([x, y, w, h]))
        }
        "circle" => {
            let (cx, cy, r) = (num("cx", frame.width)?, num("cy", frame.height)?, num("r", None)?);
            (
                "circle",
                ellipse_path(cx, cy, r, r),
                Some([cx - r, cy - r, 2.0 * r, 2.0 * r]),
            )
        }
        "ellipse" => {
            let (cx, cy) = (num("cx", frame.width)?, num("cy", frame.height)?);
            let (rx, ry) = (num("rx", frame.width)?, num("ry", frame.height)?);
            (
                "ellipse",
                ellipse_path(cx, cy, rx, ry),
                Some([cx - rx, cy - ry, 2.0 * rx, 2.0 * ry]),
            )
        }
        "line" => {
            let (x1, y1) = (num("x1", frame.width)?, num("y1", frame.height)?);
            let (x2, y2) = (num("x2", frame.width)?, num("y2", frame.height)?);
            (
                "line",
                format!("M {x1} {y1} L {x2} {y2}"),
                Some(bounding_box(&[(x1, y1), (x2, y2)])),
            )
        }
        "polyline" | "polygon" => {
            let points = parse_points(dom.get_attr(id, "points").unwrap_or(""))?;
            let mut path = String::new();
            for (i, (x, y)) in points.iter().enumerate() {
                let cmd = if i == 0 { "M" } else { " L" };
                path.push_str(&format!("{cmd} {x} {y}"));
            }
            if tag == "polygon" && !points.is_empty() {
                path.push_str(" Z");
            }
            let bounds = (!points.is_empty()).then(|| bounding_box(&points));
            (tag, path, bounds)
        }
        "path" => {
            let d = dom.get_attr(id, "d").unwrap_or("").trim();
            validate_path_data(d)?;
            ("path", d.to_string(), None)
        }
        other => {
            debug!(tag = other, "skipping non-shape svg element");
            return Ok(None);
        }
    };

    let mut node = DesignNode::new(NodeKind::Vector, name);
    if let Some([x, y, w, h]) = bounds {
        node.set_position(x, y);
        node.set_size(w, h);
    }
    if tag == "rect"
        && let Some(rx) = optional_number(dom, id, "rx", frame.width)?
    {
        node.corner_radius = Some(rx.max(0.0));
    }
    node.opacity = opacity_attr(dom, id);
    apply_paint(&mut node, &paint, tag);
    if !path.is_empty() {
        node.vector_paths.push(VectorPath {
            path,
            winding_rule: winding_rule(&paint, config),
        });
    }
    Ok(Some(node))
}

fn apply_paint(node: &mut DesignNode, paint: &PaintContext, tag: &str) {
    // Lines and polylines have no interior unless a fill is asked for.
    let default_fill = if matches!(tag, "line" | "polyline") { "none" } else { "black" };
    let fill = paint.fill.as_deref().unwrap_or(default_fill);
    if !fill.eq_ignore_ascii_case("none") {
        node.fills.push(Paint::solid(parse_color(fill)));
    }

    if let Some(stroke) = paint.stroke.as_deref()
        && !stroke.eq_ignore_ascii_case("none")
    {
        node.strokes.push(Paint::solid(parse_color(stroke)));
        let weight = paint
            .stroke_width
            .as_deref()
            .and_then(|w| parse_svg_number(w, None))
            .unwrap_or(1.0);
        node.stroke_weight = Some(weight.max(0.0));
    }
}

fn winding_rule(paint: &PaintContext, config: &ConverterConfig) -> WindingRule {
    match paint.fill_rule.as_deref() {
        Some(rule) if rule.eq_ignore_ascii_case("evenodd") => WindingRule::EvenOdd,
        Some(rule) if rule.eq_ignore_ascii_case("nonzero") => WindingRule::NonZero,
        _ => config.winding_rule,
    }
}

fn opacity_attr(dom: &Dom, id: NodeId) -> Option<f64> {
    dom.get_attr(id, "opacity")
        .and_then(parse_number_or_percent)
        .map(|o| o.clamp(0.0, 1.0))
}

fn ellipse_path(cx: f64, cy: f64, rx: f64, ry: f64) -> String {
    format!(
        "M {} {cy} A {rx} {ry} 0 1 0 {} {cy} A {rx} {ry} 0 1 0 {} {cy} Z",
        cx - rx,
        cx + rx,
        cx - rx
    )
}

fn bounding_box(points: &[(f64, f64)]) -> [f64; 4] {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    [min_x, min_y, max_x - min_x, max_y - min_y]
}

/// An SVG length attribute: plain number, `px`, or a percentage of `basis`.
fn parse_svg_number(value: &str, basis: Option<f64>) -> Option<f64> {
    let value = value.trim();
    if let Some(pct) = value.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().ok()?;
        return basis.map(|b| b * pct / 100.0);
    }
    let value = value.strip_suffix("px").unwrap_or(value);
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Attribute defaulting to 0 when absent; present but malformed is an error.
fn number(dom: &Dom, id: NodeId, attribute: &str, basis: Option<f64>) -> Result<f64> {
    Ok(optional_number(dom, id, attribute, basis)?.unwrap_or(0.0))
}

fn optional_number(dom: &Dom, id: NodeId, attribute: &str, basis: Option<f64>) -> Result<Option<f64>> {
    match dom.get_attr(id, attribute) {
        None => Ok(None),
        Some(raw) => parse_svg_number(raw, basis)
            .map(Some)
            .ok_or_else(|| VectorError::InvalidNumber {
                attribute: attribute.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn parse_view_box(raw: &str) -> Result<[f64; 4]> {
    let values: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| VectorError::ViewBox(raw.to_string()))?;
    match values.as_slice() {
        [x, y, w, h] if *w >= 0.0 && *h >= 0.0 => Ok([*x, *y, *w, *h]),
        _ => Err(VectorError::ViewBox(raw.to_string())),
    }
}

fn parse_points(raw: &str) -> Result<Vec<(f64, f64)>> {
    let numbers: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| VectorError::Points(raw.to_string()))?;
    if numbers.len() % 2 != 0 {
        return Err(VectorError::Points(raw.to_string()));
    }
    Ok(numbers.chunks(2).map(|p| (p[0], p[1])).collect())
}

/// Number of arguments each path command takes per repetition.
fn command_arity(command: u8) -> Option<usize> {
    match command.to_ascii_uppercase() {
        b'M' | b'L' | b'T' => Some(2),
        b'H' | b'V' => Some(1),
        b'S' | b'Q' => Some(4),
        b'C' => Some(6),
        b'A' => Some(7),
        b'Z' => Some(0),
        _ => None,
    }
}

/// Check path data for known commands and complete argument groups. The
/// data itself is carried through unchanged.
fn validate_path_data(d: &str) -> Result<()> {
    let bytes = d.as_bytes();
    let err = |offset, reason| VectorError::PathData { offset, reason };
    let mut i = skip_separators(bytes, 0);
    if i >= bytes.len() {
        return Err(err(0, "empty path"));
    }
    if !matches!(bytes[i], b'M' | b'm') {
        return Err(err(i, "path must start with a moveto"));
    }

    while i < bytes.len() {
        let command = bytes[i];
        let arity = command_arity(command).ok_or(err(i, "unknown command"))?;
        i += 1;

        let mut args = 0;
        loop {
            i = skip_separators(bytes, i);
            if i >= bytes.len() || (bytes[i].is_ascii_alphabetic() && !matches!(bytes[i], b'e' | b'E')) {
                break;
            }
            // Arc flags may be written without separators, e.g. `0 01 5 5`.
            let is_flag = command.eq_ignore_ascii_case(&b'A') && matches!(args % 7, 3 | 4);
            i = if is_flag {
                match bytes[i] {
                    b'0' | b'1' => i + 1,
                    _ => return Err(err(i, "invalid arc flag")),
                }
            } else {
                scan_number(bytes, i).ok_or(err(i, "invalid number"))?
            };
            args += 1;
        }

        let complete = match arity {
            0 => args == 0,
            n => args > 0 && args % n == 0,
        };
        if !complete {
            return Err(err(i, "wrong number of arguments"));
        }
    }
    Ok(())
}

fn skip_separators(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
        i += 1;
    }
    i
}

/// Index just past a number starting at `start`.
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start || (i == digits_start + 1 && bytes[digits_start] == b'.') {
        return None;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == exp_start {
            return None;
        }
        i = j;
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn convert(markup: &str) -> DesignNode {
        let dom = parse_html(markup);
        let svg = dom.find_by_tag("svg").expect("svg present");
        convert_svg(&dom, svg, &ConverterConfig::default())
    }

    #[test]
    fn test_view_box_overrides_size() {
        let node = convert(r#"<svg width="50" height="50" viewBox="10 20 300 150"></svg>"#);
        assert_eq!(node.kind, NodeKind::Vector);
        assert_eq!((node.width, node.height), (Some(300.0), Some(150.0)));
        assert_eq!((node.x, node.y), (Some(10.0), Some(20.0)));
    }

    #[test]
    fn test_negative_origins_clamp_to_zero() {
        let node = convert(
            r#"<svg viewBox="-12 -4 24 24"><circle cx="2" cy="10" r="5"/><line x1="-3" y1="1" x2="4" y2="6"/></svg>"#,
        );
        assert_eq!((node.x, node.y), (Some(0.0), Some(0.0)));
        let circle = &node.children[0];
        assert_eq!((circle.x, circle.y), (Some(0.0), Some(5.0)));
        assert_eq!(circle.width, Some(10.0));
        let line = &node.children[1];
        assert_eq!((line.x, line.y), (Some(0.0), Some(1.0)));
        assert_eq!(line.width, Some(7.0));
    }

    #[test]
    fn test_literal_size_without_view_box() {
        let node = convert(r#"<svg width="24px" height="16"></svg>"#);
        assert_eq!((node.width, node.height), (Some(24.0), Some(16.0)));
        assert_eq!(node.x, None);
    }

    #[test]
    fn test_rect_and_circle_geometry() {
        let node = convert(
            r##"<svg viewBox="0 0 100 100">
                 <rect x="5" y="10" width="20" height="30" rx="4" fill="#ff0000"/>
                 <circle cx="50" cy="50" r="10" stroke="blue" stroke-width="2"/>
               </svg>"##,
        );
        let rect = &node.children[0];
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (Some(5.0), Some(10.0), Some(20.0), Some(30.0)));
        assert_eq!(rect.corner_radius, Some(4.0));
        assert_eq!(rect.fills, vec![Paint::solid(Rgba::new(1.0, 0.0, 0.0, 1.0))]);

        let circle = &node.children[1];
        assert_eq!(
            (circle.x, circle.y, circle.width, circle.height),
            (Some(40.0), Some(40.0), Some(20.0), Some(20.0))
        );
        assert_eq!(circle.fills, vec![Paint::solid(Rgba::BLACK)]);
        assert_eq!(circle.strokes, vec![Paint::solid(Rgba::new(0.0, 0.0, 1.0, 1.0))]);
        assert_eq!(circle.stroke_weight, Some(2.0));
    }

    #[test]
    fn test_path_carried_through_with_winding_rule() {
        let node = convert(
            r#"<svg><path d="M0 0L10 10Z" fill="none"/><path d="M0,0 h5 v5 z" fill-rule="evenodd"/></svg>"#,
        );
        let first = &node.children[0];
        assert_eq!(first.vector_paths[0].path, "M0 0L10 10Z");
        assert_eq!(first.vector_paths[0].winding_rule, WindingRule::NonZero);
        assert!(first.fills.is_empty());
        assert_eq!(node.children[1].vector_paths[0].winding_rule, WindingRule::EvenOdd);
    }

    #[test]
    fn test_configured_winding_rule() {
        let dom = parse_html(r#"<svg><path d="M0 0 L1 1"/></svg>"#);
        let config = ConverterConfig {
            winding_rule: WindingRule::EvenOdd,
            ..ConverterConfig::default()
        };
        let node = convert_svg(&dom, dom.find_by_tag("svg").unwrap(), &config);
        assert_eq!(node.children[0].vector_paths[0].winding_rule, WindingRule::EvenOdd);
    }

    #[test]
    fn test_groups_inherit_paint() {
        let node = convert(
            r#"<svg><g fill="red" opacity="0.5"><polygon points="0,0 10,0 5,8"/><line x1="0" y1="0" x2="4" y2="3" stroke="red"/></g></svg>"#,
        );
        let group = &node.children[0];
        assert_eq!(group.kind, NodeKind::Group);
        assert_eq!(group.opacity, Some(0.5));
        let polygon = &group.children[0];
        assert_eq!(polygon.vector_paths[0].path, "M 0 0 L 10 0 L 5 8 Z");
        assert_eq!(polygon.fills, vec![Paint::solid(Rgba::new(1.0, 0.0, 0.0, 1.0))]);
        assert_eq!((polygon.width, polygon.height), (Some(10.0), Some(8.0)));
        let line = &group.children[1];
        assert_eq!(line.vector_paths[0].path, "M 0 0 L 4 3");
        assert_eq!(line.stroke_weight, Some(1.0));
    }

    #[test]
    fn test_malformed_path_yields_placeholder() {
        let node = convert(r#"<svg viewBox="0 0 10 10"><g><path d="M 10 L oops"/></g></svg>"#);
        assert_eq!(node.kind, NodeKind::Vector);
        assert_eq!((node.width, node.height), (Some(100.0), Some(100.0)));
        assert_eq!(node.fills, vec![Paint::solid(Rgba::PLACEHOLDER)]);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_malformed_view_box_yields_placeholder() {
        let node = convert(r#"<svg viewBox="0 0 ten 10"></svg>"#);
        assert_eq!(node.width, Some(100.0));
        assert_eq!(node.fills, vec![Paint::solid(Rgba::PLACEHOLDER)]);
    }

    #[test]
    fn test_non_shape_elements_skipped() {
        let node = convert(r#"<svg><title>Logo</title><defs><linearGradient id="g"/></defs><rect width="1" height="1"/></svg>"#);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].name, "rect");
    }

    #[test]
    fn test_path_validation() {
        assert!(validate_path_data("M 10 10 L 20 20 30 30 Z").is_ok());
        assert!(validate_path_data("m1.5-2.5e1c1,2,3,4,5,6s1 2 3 4").is_ok());
        assert!(validate_path_data("M0 0 A 5 5 0 01 10 10").is_ok());
        assert!(validate_path_data("M0 0 a25,25 -30 0,1 50,-25").is_ok());
        assert!(validate_path_data("").is_err());
        assert!(validate_path_data("L 1 1").is_err());
        assert!(validate_path_data("M 1").is_err());
        assert!(validate_path_data("M 1 1 C 1 2 3").is_err());
        assert!(validate_path_data("M 1 1 X 3").is_err());
        assert!(validate_path_data("M 1 1 Z 4").is_err());
        assert!(validate_path_data("M 1 1 A 1 1 0 2 0 3 3").is_err());
    }
}
