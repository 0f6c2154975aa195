//! Converter configuration.
//!
//! Settings are loaded from `designtree.toml` (or any TOML file) and passed
//! explicitly into every conversion through the conversion context.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::design::WindingRule;
use crate::error::{Error, Result};

/// Default configuration file looked up by [`ConverterConfig::load_or_default`].
pub const DEFAULT_CONFIG_FILE: &str = "designtree.toml";

/// Tunables for a conversion session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Assumed root font size in px; `em` and `rem` are multiplied by it.
    pub root_font_size: f64,
    /// Family used when no font mapping matches or the font fetch failed.
    pub default_font_family: String,
    /// Winding rule for vector paths without an explicit `fill-rule`.
    pub winding_rule: WindingRule,
    /// Edge length of the placeholder emitted for malformed vector markup.
    pub placeholder_size: f64,
    /// Name of the single canvas in the output document.
    pub canvas_name: String,
    /// Document name used when the capture carries no title.
    pub document_name: String,
    /// Drop `display: none` subtrees from the output.
    pub skip_hidden: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            root_font_size: 16.0,
            default_font_family: "Inter".to_string(),
            winding_rule: WindingRule::NonZero,
            placeholder_size: 100.0,
            canvas_name: "Page 1".to_string(),
            document_name: "Untitled".to_string(),
            skip_hidden: true,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `designtree.toml` from the current directory, or defaults when
    /// the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        match Self::load_from_file(DEFAULT_CONFIG_FILE) {
            Ok(config) => config,
            Err(Error::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring {DEFAULT_CONFIG_FILE}: {e}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.root_font_size, 16.0);
        assert_eq!(config.default_font_family, "Inter");
        assert_eq!(config.winding_rule, WindingRule::NonZero);
        assert!(config.skip_hidden);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConverterConfig::from_toml(
            r#"
            root_font_size = 10.0
            winding_rule = "EVENODD"
            "#,
        )
        .unwrap();
        assert_eq!(config.root_font_size, 10.0);
        assert_eq!(config.winding_rule, WindingRule::EvenOdd);
        assert_eq!(config.canvas_name, "Page 1");
    }

    #[test]
    fn test_invalid_toml() {
        let err = ConverterConfig::from_toml("root_font_size = \"big\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_font_family = \"Roboto\"").unwrap();

        let config = ConverterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.default_font_family, "Roboto");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConverterConfig::load_from_file("/nonexistent/designtree.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
