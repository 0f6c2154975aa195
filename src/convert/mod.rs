//! Source page to design tree.
//!
//! [`convert`] is the single conversion function. It reads a
//! [`ConversionContext`], which callers build either from a capture
//! bundle ([`ConversionContext::for_capture`]) or from markup and
//! stylesheet text ([`ConversionContext::for_source`]). Resources must be
//! fetched before the context is built; the walk itself is synchronous
//! and never fails.

mod builder;
mod color;
mod context;
mod font;
mod layout;
mod units;
mod vector;

pub use builder::{SKIPPED_TAGS, walk_styled};
pub use color::{background_shorthand_color, parse_color, try_parse_color};
pub use context::{ConversionContext, ConversionInput};
pub use font::{
    font_key, font_size, font_style, letter_spacing, line_height, map_font_family,
    normalize_family, normalize_font_weight, text_style,
};
pub use layout::{
    LayoutProps, apply_box_style, background_color, background_image_url, classify,
    expand_padding, layout_props, text_align,
};
pub use units::{Length, parse_length_list, parse_number_or_percent, resolve_offset, resolve_size};
pub use vector::{convert_svg, placeholder};

use tracing::info;

use crate::css::{MediaContext, Stylesheet};
use crate::design::{ColorStyle, DesignDocument, Paint, Rgba, Styles};
use builder::{TreeBuilder, root_style};

/// Convert the page held by `ctx` into a design document.
#[tracing::instrument(skip_all)]
pub fn convert(ctx: &ConversionContext) -> DesignDocument {
    let prepared = ctx.input.prepare();
    let (root, style) = root_style(&prepared.dom, &prepared.rules);

    let builder = TreeBuilder::new(
        &prepared.dom,
        &prepared.rules,
        &ctx.resources,
        &ctx.config,
        ctx.input.viewport,
    );
    let tree = builder.build_root(root, &style);

    // The root style already carries anything set on <html>.
    let background = background_color(&style).unwrap_or(Rgba::WHITE);
    let styles = color_styles(&prepared.stylesheet, &ctx.input.media());
    let name = ctx
        .input
        .title
        .clone()
        .unwrap_or_else(|| ctx.config.document_name.clone());

    info!(
        document = %name,
        nodes = tree.descendants().len(),
        rules = prepared.rules.len(),
        "converted page"
    );
    DesignDocument::new(name, ctx.config.canvas_name.clone(), background, tree, styles)
}

/// One SOLID colour style per selector declaring a usable `color`, or
/// failing that a `background-color`.
fn color_styles(stylesheet: &Stylesheet, media: &MediaContext) -> Styles {
    let mut styles = Styles::default();
    for rule in stylesheet.style_rules(media) {
        let color = rule
            .declarations
            .get("color")
            .and_then(try_parse_color)
            .or_else(|| rule.declarations.get("background-color").and_then(try_parse_color));
        if let Some(color) = color {
            styles.color_styles.insert(
                rule.selector.clone(),
                ColorStyle {
                    name: rule.selector.clone(),
                    paint: Paint::solid(color),
                },
            );
        }
    }
    styles
}
