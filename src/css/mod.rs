//! Stylesheet parsing, selector matching and cascade resolution.

mod cascade;
mod media;
mod selector;
mod stylesheet;

pub use cascade::{EffectiveStyle, RuleSet, parse_inline_style, resolve};
pub use media::{MediaContext, Viewport, media_matches};
pub use selector::{Specificity, find_all, matches, specificity};
pub use stylesheet::{
    CssRule, Declaration, Declarations, Keyframe, StyleRule, Stylesheet, parse_declaration_list,
};
