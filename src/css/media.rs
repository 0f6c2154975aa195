//! Media query evaluation against the capture viewport.

use cssparser::{ParseError, Parser, ParserInput, Token};
use serde::{Deserialize, Serialize};

/// Page viewport in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Environment media queries are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContext {
    pub viewport: Viewport,
    /// `light` or `dark`; `None` behaves as light.
    pub theme: Option<String>,
}

impl MediaContext {
    pub fn new(viewport: Viewport, theme: Option<String>) -> Self {
        Self { viewport, theme }
    }
}

/// Evaluate a media query list. Comma-separated queries are alternatives.
/// Unknown features are assumed to match; `print` never does.
pub fn media_matches(query: &str, context: &MediaContext) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let mut input = ParserInput::new(query);
    let mut parser = Parser::new(&mut input);
    let results: Result<Vec<bool>, ParseError<'_, ()>> =
        parser.parse_comma_separated(|p| Ok(single_query_matches(p, context)));
    results.is_ok_and(|results| results.into_iter().any(|m| m))
}

/// One query of the list: an optional `not`/`only`, media types and
/// parenthesized features joined by `and`.
fn single_query_matches(parser: &mut Parser<'_, '_>, context: &MediaContext) -> bool {
    let mut negated = false;
    let mut matched = true;
    let mut first = true;

    while let Ok(token) = parser.next().cloned() {
        match token {
            Token::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "not" if first => negated = true,
                "only" | "and" | "all" | "screen" => {}
                _ => matched = false,
            },
            Token::ParenthesisBlock => {
                if let Ok(feature) = parser.parse_nested_block(parse_feature) {
                    matched &= feature_matches(&feature, context);
                }
            }
            _ => {}
        }
        first = false;
    }

    matched != negated
}

#[derive(Debug, Clone, PartialEq)]
enum FeatureValue {
    /// Lengths in CSS pixels: `px`, `em`/`rem` at 16px, or bare numbers.
    Length(f64),
    Keyword(String),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
struct Feature {
    name: String,
    value: Option<FeatureValue>,
}

fn parse_feature<'i>(parser: &mut Parser<'i, '_>) -> Result<Feature, ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    let value = if parser.try_parse(|p| p.expect_colon()).is_ok() {
        Some(match parser.next()?.clone() {
            Token::Dimension { value, unit, .. } => match unit.to_ascii_lowercase().as_str() {
                "px" => FeatureValue::Length(f64::from(value)),
                "em" | "rem" => FeatureValue::Length(f64::from(value) * 16.0),
                _ => FeatureValue::Other,
            },
            Token::Number { value, .. } => FeatureValue::Length(f64::from(value)),
            Token::Ident(keyword) => FeatureValue::Keyword(keyword.to_ascii_lowercase()),
            _ => FeatureValue::Other,
        })
    } else {
        None
    };
    while parser.next().is_ok() {}
    Ok(Feature { name, value })
}

fn feature_matches(feature: &Feature, context: &MediaContext) -> bool {
    let Some(value) = &feature.value else {
        return true;
    };
    let width = f64::from(context.viewport.width);
    let height = f64::from(context.viewport.height);
    let length = match value {
        FeatureValue::Length(v) => Some(*v),
        _ => None,
    };
    let keyword = match value {
        FeatureValue::Keyword(k) => Some(k.as_str()),
        _ => None,
    };

    match feature.name.as_str() {
        "min-width" => length.is_none_or(|v| width >= v),
        "max-width" => length.is_none_or(|v| width <= v),
        "min-height" => length.is_none_or(|v| height >= v),
        "max-height" => length.is_none_or(|v| height <= v),
        "orientation" => match keyword {
            Some("landscape") => width >= height,
            Some("portrait") => height > width,
            _ => true,
        },
        "prefers-color-scheme" => {
            let theme = context.theme.as_deref().unwrap_or("light");
            keyword.is_none_or(|k| theme.eq_ignore_ascii_case(k))
        }
        _ => true,
    }
}
