//! CSS colour values to normalised [`Rgba`].

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::design::Rgba;

/// Parse a colour, falling back to opaque black.
pub fn parse_color(text: &str) -> Rgba {
    try_parse_color(text).unwrap_or(Rgba::BLACK)
}

/// Parse a colour; `None` when the text is not a recognised colour.
pub fn try_parse_color(text: &str) -> Option<Rgba> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|i| parse_color_value(i).ok_or_else(|| i.new_custom_error::<_, ()>(())))
        .ok()
}

/// First colour found in a `background` shorthand such as
/// `#fff url(bg.png) no-repeat center`.
pub fn background_shorthand_color(text: &str) -> Option<Rgba> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    loop {
        if let Ok(color) =
            parser.try_parse(|i| parse_color_value(i).ok_or_else(|| i.new_custom_error::<_, ()>(())))
        {
            return Some(color);
        }
        // Skip one component (keyword, length, url, gradient function).
        let is_function = match parser.next() {
            Ok(token) => matches!(token, Token::Function(_)),
            Err(_) => return None,
        };
        if is_function {
            let _ = parser.parse_nested_block(|nested| -> Result<(), ParseError<'_, ()>> {
                while nested.next().is_ok() {}
                Ok(())
            });
        }
    }
}

pub(crate) fn parse_color_value(input: &mut Parser<'_, '_>) -> Option<Rgba> {
    if let Ok(ident) = input.try_parse(|i| i.expect_ident_cloned()) {
        return named_color(&ident.to_ascii_lowercase());
    }

    // cssparser yields IDHash for `#ffffff` and Hash for `#222299`.
    if let Ok(hash) = input.try_parse(|i| -> Result<_, ParseError<'_, ()>> {
        match i.next()? {
            Token::IDHash(h) | Token::Hash(h) => Ok(h.clone()),
            _ => Err(i.new_custom_error(())),
        }
    }) {
        return parse_hex_color(hash.as_ref());
    }

    input.try_parse(parse_rgb_function).ok()
}

fn named_color(name: &str) -> Option<Rgba> {
    let (r, g, b) = match name {
        "transparent" => return Some(Rgba::TRANSPARENT),
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "navy" => (0, 0, 128),
        "purple" => (128, 0, 128),
        "teal" => (0, 128, 128),
        "orange" => (255, 165, 0),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "gold" => (255, 215, 0),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "coral" => (255, 127, 80),
        "salmon" => (250, 128, 114),
        "tomato" => (255, 99, 71),
        "crimson" => (220, 20, 60),
        "khaki" => (240, 230, 140),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        "whitesmoke" => (245, 245, 245),
        "gainsboro" => (220, 220, 220),
        "slategray" | "slategrey" => (112, 128, 144),
        "steelblue" => (70, 130, 180),
        "skyblue" => (135, 206, 235),
        "royalblue" => (65, 105, 225),
        "dodgerblue" => (30, 144, 255),
        "forestgreen" => (34, 139, 34),
        "seagreen" => (46, 139, 87),
        "rebeccapurple" => (102, 51, 153),
        _ => return None,
    };
    Some(Rgba::from_u8(r, g, b, 1.0))
}

fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Rgba::from_u8(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 1.0)),
        4 => Some(Rgba::from_u8(
            digit(0)? * 17,
            digit(1)? * 17,
            digit(2)? * 17,
            f64::from(digit(3)? * 17) / 255.0,
        )),
        6 => Some(Rgba::from_u8(pair(0)?, pair(2)?, pair(4)?, 1.0)),
        8 => Some(Rgba::from_u8(
            pair(0)?,
            pair(2)?,
            pair(4)?,
            f64::from(pair(6)?) / 255.0,
        )),
        _ => None,
    }
}

/// `rgb()`/`rgba()` in either comma or space-separated syntax.
fn parse_rgb_function<'i>(input: &mut Parser<'i, '_>) -> Result<Rgba, ParseError<'i, ()>> {
    let location = input.current_source_location();
    let name = input.expect_function()?.clone();
    if !name.eq_ignore_ascii_case("rgb") && !name.eq_ignore_ascii_case("rgba") {
        return Err(location.new_custom_error(()));
    }

    input.parse_nested_block(|input| {
        let r = parse_color_component(input)?;
        let legacy = input.try_parse(|i| i.expect_comma()).is_ok();
        let g = parse_color_component(input)?;
        if legacy {
            input.expect_comma()?;
        }
        let b = parse_color_component(input)?;

        let has_alpha = if legacy {
            input.try_parse(|i| i.expect_comma()).is_ok()
        } else {
            input.try_parse(|i| i.expect_delim('/')).is_ok()
        };
        let a = if has_alpha { parse_alpha(input)? } else { 1.0 };

        Ok(Rgba::new(r / 255.0, g / 255.0, b / 255.0, a))
    })
}

/// A channel in `0..=255`.
fn parse_color_component<'i>(input: &mut Parser<'i, '_>) -> Result<f64, ParseError<'i, ()>> {
    let location = input.current_source_location();
    match input.next()? {
        Token::Number { value, .. } => Ok(f64::from(*value).clamp(0.0, 255.0)),
        Token::Percentage { unit_value, .. } => Ok((f64::from(*unit_value) * 255.0).clamp(0.0, 255.0)),
        _ => Err(location.new_custom_error(())),
    }
}

fn parse_alpha<'i>(input: &mut Parser<'i, '_>) -> Result<f64, ParseError<'i, ()>> {
    let location = input.current_source_location();
    match input.next()? {
        Token::Number { value, .. } => Ok(f64::from(*value).clamp(0.0, 1.0)),
        Token::Percentage { unit_value, .. } => Ok(f64::from(*unit_value).clamp(0.0, 1.0)),
        _ => Err(location.new_custom_error(())),
    }
}
