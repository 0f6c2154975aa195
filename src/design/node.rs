use serde::{Deserialize, Serialize};

use super::paint::Paint;

/// Output node kind. Images are emitted as filled rectangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "FRAME")]
    Frame,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "VECTOR")]
    Vector,
    #[serde(rename = "RECTANGLE")]
    Image,
    #[serde(rename = "GROUP")]
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingMode {
    Auto,
    Fixed,
}

/// Child alignment along an auto-layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisAlign {
    Min,
    Center,
    Max,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindingRule {
    #[default]
    #[serde(rename = "NONZERO")]
    NonZero,
    #[serde(rename = "EVENODD")]
    EvenOdd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPath {
    /// Path data, carried through unchanged.
    pub path: String,
    pub winding_rule: WindingRule,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricUnit {
    Auto,
    Pixels,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineHeight {
    pub unit: MetricUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl LineHeight {
    pub const AUTO: LineHeight = LineHeight {
        unit: MetricUnit::Auto,
        value: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterSpacing {
    pub unit: MetricUnit,
    pub value: f64,
}

impl LetterSpacing {
    pub const ZERO: LetterSpacing = LetterSpacing {
        unit: MetricUnit::Pixels,
        value: 0.0,
    };
}

/// Typography of a Text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub line_height: LineHeight,
    pub letter_spacing: LetterSpacing,
}

/// Box padding in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// One node of the design tree. Owns its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fills: Vec<Paint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strokes: Vec<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_mode: Option<LayoutMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_axis_sizing_mode: Option<SizingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_axis_sizing_mode: Option<SizingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_axis_align_items: Option<AxisAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_axis_align_items: Option<AxisAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_right: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_left: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_horizontal: Option<TextAlign>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector_paths: Vec<VectorPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DesignNode>,
}

impl DesignNode {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Set width and height, clamping negatives to zero.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = Some(width.max(0.0));
        self.height = Some(height.max(0.0));
    }

    /// Set x and y, clamping negatives to zero.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = Some(x.max(0.0));
        self.y = Some(y.max(0.0));
    }

    pub fn set_padding(&mut self, padding: Padding) {
        self.padding_top = Some(padding.top);
        self.padding_right = Some(padding.right);
        self.padding_bottom = Some(padding.bottom);
        self.padding_left = Some(padding.left);
    }

    pub fn padding(&self) -> Padding {
        Padding {
            top: self.padding_top.unwrap_or(0.0),
            right: self.padding_right.unwrap_or(0.0),
            bottom: self.padding_bottom.unwrap_or(0.0),
            left: self.padding_left.unwrap_or(0.0),
        }
    }

    /// This node and all of its descendants, pre-order.
    pub fn descendants(&self) -> Vec<&DesignNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First node in this subtree with the given name.
    pub fn find(&self, name: &str) -> Option<&DesignNode> {
        self.descendants().into_iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Rgba;

    #[test]
    fn test_node_json_shape() {
        let mut node = DesignNode::new(NodeKind::Image, "img");
        node.set_size(10.0, -4.0);
        node.fills.push(Paint::solid(Rgba::WHITE));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "RECTANGLE");
        assert_eq!(json["width"], 10.0);
        assert_eq!(json["height"], 0.0);
        assert_eq!(json["fills"][0]["type"], "SOLID");
        assert!(json.get("children").is_none());
        assert!(json.get("x").is_none());
    }

    #[test]
    fn test_position_never_negative() {
        let mut node = DesignNode::new(NodeKind::Vector, "rect");
        node.set_position(-3.0, 7.5);
        assert_eq!((node.x, node.y), (Some(0.0), Some(7.5)));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(WindingRule::EvenOdd).unwrap(), "EVENODD");
        assert_eq!(serde_json::to_value(AxisAlign::SpaceBetween).unwrap(), "SPACE_BETWEEN");
        assert_eq!(serde_json::to_value(FontStyle::Italic).unwrap(), "italic");
        let lh = serde_json::to_value(LineHeight::AUTO).unwrap();
        assert_eq!(lh, serde_json::json!({ "unit": "AUTO" }));
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut root = DesignNode::new(NodeKind::Frame, "root");
        let mut a = DesignNode::new(NodeKind::Frame, "a");
        a.children.push(DesignNode::new(NodeKind::Text, "a1"));
        root.children.push(a);
        root.children.push(DesignNode::new(NodeKind::Text, "b"));
        let names: Vec<_> = root.descendants().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
        assert_eq!(root.find("a1").map(|n| n.kind), Some(NodeKind::Text));
    }
}
