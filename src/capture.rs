//! Persisted capture bundles.
//!
//! A capture is what a browser session records for one page: the
//! rendered markup, its CSS, embedded resources, the viewport and some
//! page metadata. [`CaptureBundle::from_json`] checks the structure
//! before anything is deserialized, so a bad bundle is reported with the
//! path of the offending field instead of a generic serde message.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::css::Viewport;
use crate::error::{CaptureError, Error, Result};

/// Capture format major version this crate reads.
pub const SUPPORTED_MAJOR_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureBundle {
    pub version: String,
    pub html: String,
    pub css: String,
    pub resources: CaptureResources,
    pub viewport: Viewport,
    pub metadata: CaptureMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResources {
    pub images: Vec<CapturedImage>,
    pub fonts: Vec<CapturedFont>,
    #[serde(default)]
    pub stylesheets: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedImage {
    pub url: String,
    /// Base64 payload; absent when the browser could not read the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedFont {
    pub family: String,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Whether the browser reported the face as loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded: Option<bool>,
}

/// A `font-weight` as captured: `700` or `"bold"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Number(f64),
    Keyword(String),
}

impl Default for FontWeight {
    fn default() -> Self {
        FontWeight::Number(400.0)
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Number(n) => write!(f, "{n}"),
            FontWeight::Keyword(k) => f.write_str(k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO-8601 string or epoch milliseconds, kept as captured.
    pub timestamp: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub interactions: Vec<Value>,
    #[serde(default)]
    pub animations: Vec<Value>,
}

impl CaptureBundle {
    /// Parse and validate a bundle.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate an already parsed bundle.
    pub fn from_value(value: Value) -> Result<Self> {
        validate(&value)?;
        let bundle: CaptureBundle = serde_json::from_value(value)?;
        Ok(bundle)
    }

    /// Load a bundle from a file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Clone, Copy)]
enum Kind {
    String,
    Object,
    Array,
    Unsigned,
    StringOrNumber,
}

impl Kind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Object => value.is_object(),
            Kind::Array => value.is_array(),
            Kind::Unsigned => value.as_u64().is_some_and(|n| n <= u64::from(u32::MAX)),
            Kind::StringOrNumber => value.is_string() || value.is_number(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Kind::String => "a string",
            Kind::Object => "an object",
            Kind::Array => "an array",
            Kind::Unsigned => "a non-negative integer",
            Kind::StringOrNumber => "a string or a number",
        }
    }
}

/// Top-level fields every bundle must carry, with their JSON types.
const REQUIRED: &[(&str, Kind)] = &[
    ("version", Kind::String),
    ("html", Kind::String),
    ("css", Kind::String),
    ("resources", Kind::Object),
    ("resources.images", Kind::Array),
    ("resources.fonts", Kind::Array),
    ("viewport", Kind::Object),
    ("viewport.width", Kind::Unsigned),
    ("viewport.height", Kind::Unsigned),
    ("metadata", Kind::Object),
    ("metadata.url", Kind::String),
    ("metadata.timestamp", Kind::StringOrNumber),
];

fn validate(value: &Value) -> Result<()> {
    if !value.is_object() {
        return Err(CaptureError::NotAnObject.into());
    }
    for &(path, kind) in REQUIRED {
        require(value, path, kind)?;
    }

    if let Some(images) = value.pointer("/resources/images").and_then(Value::as_array) {
        for (i, image) in images.iter().enumerate() {
            check_entry(image, &format!("resources.images[{i}]"), "url")?;
        }
    }
    if let Some(fonts) = value.pointer("/resources/fonts").and_then(Value::as_array) {
        for (i, font) in fonts.iter().enumerate() {
            check_entry(font, &format!("resources.fonts[{i}]"), "family")?;
        }
    }

    let version = value["version"].as_str().unwrap_or_default();
    let major = version.trim().split('.').next().unwrap_or_default();
    if major != SUPPORTED_MAJOR_VERSION {
        return Err(Error::UnsupportedCaptureVersion(version.to_string()));
    }
    Ok(())
}

fn require(root: &Value, path: &str, kind: Kind) -> std::result::Result<(), CaptureError> {
    let pointer = format!("/{}", path.replace('.', "/"));
    match root.pointer(&pointer) {
        None | Some(Value::Null) => Err(CaptureError::MissingField(path.to_string())),
        Some(v) if !kind.accepts(v) => Err(CaptureError::WrongType {
            field: path.to_string(),
            expected: kind.describe(),
        }),
        Some(_) => Ok(()),
    }
}

/// An array entry must be an object with a string `key`.
fn check_entry(entry: &Value, path: &str, key: &str) -> std::result::Result<(), CaptureError> {
    if !entry.is_object() {
        return Err(CaptureError::WrongType {
            field: path.to_string(),
            expected: Kind::Object.describe(),
        });
    }
    require(entry, key, Kind::String).map_err(|e| match e {
        CaptureError::MissingField(field) => CaptureError::MissingField(format!("{path}.{field}")),
        CaptureError::WrongType { field, expected } => CaptureError::WrongType {
            field: format!("{path}.{field}"),
            expected,
        },
        other => other,
    })
}
