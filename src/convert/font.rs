//! Font family, weight and text style mapping.

use tracing::debug;

use super::units::Length;
use crate::config::ConverterConfig;
use crate::css::EffectiveStyle;
use crate::design::{FontStyle, LetterSpacing, LineHeight, MetricUnit, TextStyle};
use crate::resources::{FontKey, ResourceSnapshot};

/// Known web family names and the family they map to in the design tool.
/// Longer names come first so substring matching prefers them.
static FAMILY_TABLE: &[(&str, &str)] = &[
    ("helvetica neue", "Helvetica Neue"),
    ("times new roman", "Times New Roman"),
    ("blinkmacsystemfont", "Inter"),
    ("-apple-system", "Inter"),
    ("source sans pro", "Source Sans Pro"),
    ("courier new", "Courier New"),
    ("roboto mono", "Roboto Mono"),
    ("sans-serif", "Inter"),
    ("system-ui", "Inter"),
    ("segoe ui", "Inter"),
    ("monospace", "Roboto Mono"),
    ("montserrat", "Montserrat"),
    ("open sans", "Open Sans"),
    ("helvetica", "Helvetica"),
    ("georgia", "Georgia"),
    ("verdana", "Verdana"),
    ("courier", "Courier New"),
    ("poppins", "Poppins"),
    ("roboto", "Roboto"),
    ("arial", "Arial"),
    ("inter", "Inter"),
    ("serif", "Georgia"),
    ("times", "Times New Roman"),
    ("lato", "Lato"),
];

/// Families the design tool ships with.
static NATIVE_FAMILIES: &[&str] = &[
    "Inter",
    "Roboto",
    "Open Sans",
    "Lato",
    "Montserrat",
    "Poppins",
    "Source Sans Pro",
    "Roboto Mono",
];

/// Lower-case, unquoted first entry of a `font-family` list.
pub fn normalize_family(raw: &str) -> String {
    raw.split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_ascii_lowercase()
}

/// Map a `font-family` value to a design-tool family.
pub fn map_font_family(raw: &str, default_family: &str) -> String {
    let family = normalize_family(raw);
    if family.is_empty() {
        return default_family.to_string();
    }

    if let Some((_, mapped)) = FAMILY_TABLE.iter().find(|(name, _)| *name == family) {
        return (*mapped).to_string();
    }
    // Very short names would match nearly every entry in reverse.
    let reverse = family.len() >= 4;
    if let Some((_, mapped)) = FAMILY_TABLE
        .iter()
        .find(|(name, _)| family.contains(name) || (reverse && name.contains(family.as_str())))
    {
        return (*mapped).to_string();
    }
    if let Some(native) = NATIVE_FAMILIES.iter().find(|native| {
        let native = native.to_ascii_lowercase();
        family.contains(&native) || (reverse && native.contains(family.as_str()))
    }) {
        return (*native).to_string();
    }

    debug!(family, "unknown font family, using default");
    default_family.to_string()
}

/// Normalise `font-weight` to a multiple of 100 in `[100, 900]`.
pub fn normalize_font_weight(raw: &str) -> u16 {
    let raw = raw.trim().to_ascii_lowercase();
    let weight = match raw.as_str() {
        "normal" | "regular" | "" => 400.0,
        "bold" | "bolder" => 700.0,
        "lighter" | "light" => 300.0,
        "thin" | "hairline" => 100.0,
        "extralight" | "extra-light" | "ultralight" => 200.0,
        "medium" => 500.0,
        "semibold" | "semi-bold" | "demibold" => 600.0,
        "extrabold" | "extra-bold" | "ultrabold" => 800.0,
        "black" | "heavy" => 900.0,
        other => other.parse::<f64>().unwrap_or(400.0),
    };
    clamp_weight(weight)
}

pub(crate) fn clamp_weight(weight: f64) -> u16 {
    if !weight.is_finite() {
        return 400;
    }
    ((weight / 100.0).round() * 100.0).clamp(100.0, 900.0) as u16
}

/// `italic` (or `oblique`) versus everything else.
pub fn font_style(raw: Option<&str>) -> FontStyle {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s == "italic" || s.starts_with("oblique") => FontStyle::Italic,
        _ => FontStyle::Normal,
    }
}

/// Resolved `font-size` in pixels.
pub fn font_size(style: &EffectiveStyle, root_font_size: f64) -> f64 {
    let Some(raw) = style.get("font-size") else {
        return root_font_size;
    };
    let keyword = match raw.trim().to_ascii_lowercase().as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "xxx-large" => Some(48.0),
        _ => None,
    };
    keyword
        .or_else(|| Length::parse(raw)?.to_px(Some(root_font_size), root_font_size))
        .filter(|size| *size > 0.0)
        .unwrap_or(root_font_size)
}

pub fn line_height(raw: Option<&str>, root_font_size: f64) -> LineHeight {
    let Some(raw) = raw.map(str::trim) else {
        return LineHeight::AUTO;
    };
    if raw.eq_ignore_ascii_case("normal") {
        return LineHeight::AUTO;
    }
    let (unit, value) = match Length::parse(raw) {
        Some(Length::Number(v)) => (MetricUnit::Percent, v * 100.0),
        Some(Length::Px(v)) => (MetricUnit::Pixels, v),
        Some(Length::Percent(v)) => (MetricUnit::Percent, v),
        Some(Length::Em(v)) => (MetricUnit::Percent, v * 100.0),
        Some(Length::Rem(v)) => (MetricUnit::Pixels, v * root_font_size),
        Some(Length::Auto) | None => return LineHeight::AUTO,
    };
    LineHeight {
        unit,
        value: Some(value),
    }
}

pub fn letter_spacing(raw: Option<&str>, root_font_size: f64) -> LetterSpacing {
    let Some(raw) = raw.map(str::trim) else {
        return LetterSpacing::ZERO;
    };
    match Length::parse(raw) {
        Some(Length::Px(value)) => LetterSpacing {
            unit: MetricUnit::Pixels,
            value,
        },
        Some(Length::Em(v)) => LetterSpacing {
            unit: MetricUnit::Percent,
            value: v * 100.0,
        },
        Some(Length::Rem(v)) => LetterSpacing {
            unit: MetricUnit::Pixels,
            value: v * root_font_size,
        },
        _ => LetterSpacing::ZERO,
    }
}

/// The font key a text style requests, used for resource planning.
pub fn font_key(style: &EffectiveStyle, config: &ConverterConfig) -> FontKey {
    FontKey::new(
        map_font_family(style.get("font-family").unwrap_or(""), &config.default_font_family),
        normalize_font_weight(style.get("font-weight").unwrap_or("normal")),
        font_style(style.get("font-style")),
    )
}

/// Text style for a Text node. A font whose fetch failed falls back to
/// the default family.
pub fn text_style(
    style: &EffectiveStyle,
    config: &ConverterConfig,
    resources: &ResourceSnapshot,
) -> TextStyle {
    let key = font_key(style, config);
    let font_family = if resources.font_failed(&key) {
        debug!(font = %key, "font unavailable, using default family");
        config.default_font_family.clone()
    } else {
        resources
            .font(&key)
            .map(|record| record.family.clone())
            .unwrap_or(key.family)
    };

    TextStyle {
        font_family,
        font_size: font_size(style, config.root_font_size),
        font_weight: key.weight,
        font_style: key.style,
        line_height: line_height(style.get("line-height"), config.root_font_size),
        letter_spacing: letter_spacing(style.get("letter-spacing"), config.root_font_size),
    }
}
