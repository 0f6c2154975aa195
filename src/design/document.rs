use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::DesignNode;
use super::paint::{Paint, Rgba};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageKind {
    Document,
    Canvas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub background_color: Rgba,
    pub children: Vec<DesignNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRoot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub children: Vec<Canvas>,
}

/// A named paint shared across nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStyle {
    pub name: String,
    #[serde(flatten)]
    pub paint: Paint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styles {
    pub text_styles: BTreeMap<String, serde_json::Value>,
    pub color_styles: BTreeMap<String, ColorStyle>,
}

/// The complete conversion output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    pub document: DocumentRoot,
    pub components: BTreeMap<String, serde_json::Value>,
    pub component_sets: BTreeMap<String, serde_json::Value>,
    pub schema_version: u32,
    pub styles: Styles,
}

impl DesignDocument {
    /// A document holding a single canvas with `root` as its only child.
    pub fn new(
        name: impl Into<String>,
        canvas_name: impl Into<String>,
        background_color: Rgba,
        root: DesignNode,
        styles: Styles,
    ) -> Self {
        Self {
            document: DocumentRoot {
                name: name.into(),
                kind: PageKind::Document,
                children: vec![Canvas {
                    name: canvas_name.into(),
                    kind: PageKind::Canvas,
                    background_color,
                    children: vec![root],
                }],
            },
            components: BTreeMap::new(),
            component_sets: BTreeMap::new(),
            schema_version: 0,
            styles,
        }
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.document.children.first()
    }

    /// The converted root node.
    pub fn root(&self) -> Option<&DesignNode> {
        self.canvas().and_then(|c| c.children.first())
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::NodeKind;

    #[test]
    fn test_document_json_shape() {
        let mut styles = Styles::default();
        styles.color_styles.insert(
            ".brand".into(),
            ColorStyle {
                name: ".brand".into(),
                paint: Paint::solid(Rgba::BLACK),
            },
        );
        let doc = DesignDocument::new(
            "Home",
            "Page 1",
            Rgba::WHITE,
            DesignNode::new(NodeKind::Frame, "body"),
            styles,
        );
        let json: serde_json::Value = serde_json::from_str(&doc.to_json(false).unwrap()).unwrap();

        assert_eq!(json["document"]["type"], "DOCUMENT");
        assert_eq!(json["document"]["children"][0]["type"], "CANVAS");
        assert_eq!(json["document"]["children"][0]["backgroundColor"]["r"], 1.0);
        assert_eq!(json["document"]["children"][0]["children"][0]["name"], "body");
        assert_eq!(json["schemaVersion"], 0);
        assert_eq!(json["components"], serde_json::json!({}));
        assert_eq!(json["componentSets"], serde_json::json!({}));
        assert_eq!(json["styles"]["textStyles"], serde_json::json!({}));
        assert_eq!(json["styles"]["colorStyles"][".brand"]["type"], "SOLID");
        assert_eq!(json["styles"]["colorStyles"][".brand"]["name"], ".brand");
    }

    #[test]
    fn test_document_round_trips() {
        let doc = DesignDocument::new(
            "Doc",
            "Page 1",
            Rgba::WHITE,
            DesignNode::new(NodeKind::Frame, "body"),
            Styles::default(),
        );
        let back: DesignDocument = serde_json::from_str(&doc.to_json(true).unwrap()).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.root().map(|n| n.name.as_str()), Some("body"));
    }
}
