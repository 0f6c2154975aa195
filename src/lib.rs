//! # designtree
//!
//! Converts a rendered web page (markup plus CSS) into a design-tree
//! document: frames, text, vectors and image rectangles with auto-layout,
//! fills, strokes and typography, serialised as JSON a design tool can
//! import.
//!
//! ## Quick Start
//!
//! ```
//! use designtree::{Viewport, convert_html};
//!
//! let doc = convert_html(
//!     "<div><p>Hello</p></div>",
//!     "p { color: #ff0000 }",
//!     Viewport::new(1280, 800),
//! );
//! let root = doc.root().unwrap();
//! assert_eq!(root.children[0].name, "div");
//! println!("{}", doc.to_json(true).unwrap());
//! ```
//!
//! ## Pipeline
//!
//! 1. The markup is parsed into an arena DOM ([`dom`]) and the stylesheet
//!    into rules ([`css`]).
//! 2. Images and fonts the page needs are fetched up front
//!    ([`resources::prefetch`]) into a read-only [`ResourceSnapshot`].
//! 3. [`convert`] walks the DOM, resolving the cascade per element, and
//!    assembles the [`DesignDocument`].
//!
//! Captured pages arrive as a [`CaptureBundle`], which already embeds its
//! resources; see [`ConversionContext::for_capture`].

pub mod capture;
pub mod config;
pub mod convert;
pub mod css;
pub mod design;
pub mod dom;
pub mod error;
pub mod resources;
pub(crate) mod util;

pub use capture::CaptureBundle;
pub use config::ConverterConfig;
pub use convert::{ConversionContext, ConversionInput, convert};
pub use css::{EffectiveStyle, StyleRule, Stylesheet, Viewport};
pub use design::{DesignDocument, DesignNode, NodeKind, Paint, Rgba};
pub use error::{CaptureError, Error, Result};
pub use resources::{LocalFetcher, ResourceFetcher, ResourceSnapshot};
pub use util::decode_text;

/// Convert markup and stylesheet text with default settings and no
/// external resources.
pub fn convert_html(html: &str, css: &str, viewport: Viewport) -> DesignDocument {
    let ctx = ConversionContext::for_source(
        html,
        css,
        viewport,
        ResourceSnapshot::default(),
        ConverterConfig::default(),
    );
    convert(&ctx)
}
