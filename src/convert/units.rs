//! CSS lengths and their resolution to pixels.

use cssparser::{Parser, ParserInput, Token};

/// A single CSS length value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    /// A unitless number.
    Number(f64),
    Em(f64),
    Rem(f64),
    Percent(f64),
    Auto,
}

impl Length {
    /// Parse one length.
    pub fn parse(text: &str) -> Option<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_entirely(|i| parse_length(i).ok_or_else(|| i.new_custom_error::<_, ()>(())))
            .ok()
    }

    /// Resolve to pixels. Unitless numbers count as pixels. Percentages
    /// need a non-zero `basis`; `em` and `rem` both scale the assumed root
    /// font size.
    pub fn to_px(self, basis: Option<f64>, root_font_size: f64) -> Option<f64> {
        match self {
            Length::Px(v) | Length::Number(v) => Some(v),
            Length::Em(v) | Length::Rem(v) => Some(v * root_font_size),
            Length::Percent(v) => basis.filter(|b| *b > 0.0).map(|b| b * v / 100.0),
            Length::Auto => None,
        }
    }
}

pub(crate) fn parse_length(input: &mut Parser<'_, '_>) -> Option<Length> {
    let length = match input.next().ok()? {
        Token::Dimension { value, unit, .. } => {
            let value = f64::from(*value);
            match unit.to_ascii_lowercase().as_str() {
                "px" => Length::Px(value),
                "em" => Length::Em(value),
                "rem" => Length::Rem(value),
                "%" => Length::Percent(value),
                "ex" | "ch" => Length::Em(value * 0.5),
                "pt" => Length::Px(value * 96.0 / 72.0),
                "pc" => Length::Px(value * 16.0),
                "in" => Length::Px(value * 96.0),
                "cm" => Length::Px(value * 96.0 / 2.54),
                "mm" => Length::Px(value * 96.0 / 25.4),
                _ => return None,
            }
        }
        Token::Percentage { unit_value, .. } => Length::Percent(f64::from(*unit_value) * 100.0),
        Token::Number { value, .. } => Length::Number(f64::from(*value)),
        Token::Ident(ident) if ident.eq_ignore_ascii_case("auto") => Length::Auto,
        _ => return None,
    };
    Some(length)
}

/// Whitespace-separated lengths, as in `padding: 10px 20px`. `None` if any
/// component is not a length.
pub fn parse_length_list(text: &str) -> Option<Vec<Length>> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut out = Vec::new();
    while !parser.is_exhausted() {
        out.push(parse_length(&mut parser)?);
    }
    Some(out)
}

/// Resolve a size property (`width`, `height`, `gap`, ...).
///
/// Absent or `auto` is unset; percentages without a usable basis are
/// unset; anything else that fails to parse is 0. Negative results clamp
/// to 0.
pub fn resolve_size(value: Option<&str>, basis: Option<f64>, root_font_size: f64) -> Option<f64> {
    let value = value?.trim();
    if value.eq_ignore_ascii_case("auto") {
        return None;
    }
    match Length::parse(value) {
        Some(length) => length.to_px(basis, root_font_size).map(|v| v.max(0.0)),
        None => Some(0.0),
    }
}

/// Resolve an offset (`left`, `top`). Negative values clamp to 0; anything
/// unparseable is unset.
pub fn resolve_offset(value: Option<&str>, basis: Option<f64>, root_font_size: f64) -> Option<f64> {
    Length::parse(value?.trim())?
        .to_px(basis, root_font_size)
        .map(|v| v.max(0.0))
}

/// Parse a plain or percentage number, e.g. `opacity: 0.5` or `50%`.
pub fn parse_number_or_percent(text: &str) -> Option<f64> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|i| {
            let location = i.current_source_location();
            match i.next()? {
                Token::Number { value, .. } => Ok(f64::from(*value)),
                Token::Percentage { unit_value, .. } => Ok(f64::from(*unit_value)),
                _ => Err(location.new_custom_error::<_, ()>(())),
            }
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(Length::parse("12px"), Some(Length::Px(12.0)));
        assert_eq!(Length::parse("1.5em"), Some(Length::Em(1.5)));
        assert_eq!(Length::parse("2rem"), Some(Length::Rem(2.0)));
        assert_eq!(Length::parse("50%"), Some(Length::Percent(50.0)));
        assert_eq!(Length::parse("12pt"), Some(Length::Px(16.0)));
        assert_eq!(Length::parse("12PT"), Some(Length::Px(16.0)));
        assert_eq!(Length::parse("7"), Some(Length::Number(7.0)));
        assert_eq!(Length::Number(7.0).to_px(None, 16.0), Some(7.0));
        assert_eq!(Length::parse("auto"), Some(Length::Auto));
        assert_eq!(Length::parse("calc(1px + 2px)"), None);
        assert_eq!(Length::parse("10px 20px"), None);
    }

    #[test]
    fn test_resolve_size_rules() {
        assert_eq!(resolve_size(Some("120px"), None, 16.0), Some(120.0));
        assert_eq!(resolve_size(Some("50%"), Some(800.0), 16.0), Some(400.0));
        assert_eq!(resolve_size(Some("50%"), None, 16.0), None);
        assert_eq!(resolve_size(Some("50%"), Some(0.0), 16.0), None);
        assert_eq!(resolve_size(Some("2em"), None, 16.0), Some(32.0));
        assert_eq!(resolve_size(Some("auto"), None, 16.0), None);
        assert_eq!(resolve_size(None, None, 16.0), None);
        assert_eq!(resolve_size(Some("fit-content"), None, 16.0), Some(0.0));
        assert_eq!(resolve_size(Some("-5px"), None, 16.0), Some(0.0));
    }

    #[test]
    fn test_resolve_offset_clamps_negative() {
        assert_eq!(resolve_offset(Some("-10px"), None, 16.0), Some(0.0));
        assert_eq!(resolve_offset(Some("25%"), Some(400.0), 16.0), Some(100.0));
        assert_eq!(resolve_offset(Some("auto"), None, 16.0), None);
        assert_eq!(resolve_offset(Some("junk"), None, 16.0), None);
    }

    #[test]
    fn test_length_list() {
        assert_eq!(
            parse_length_list("10px 2em"),
            Some(vec![Length::Px(10.0), Length::Em(2.0)])
        );
        assert_eq!(parse_length_list("10px solid"), None);
        assert_eq!(parse_length_list(""), Some(vec![]));
    }

    #[test]
    fn test_number_or_percent() {
        assert_eq!(parse_number_or_percent("0.5"), Some(0.5));
        assert_eq!(parse_number_or_percent("25%"), Some(0.25));
        assert_eq!(parse_number_or_percent("half"), None);
    }
}
