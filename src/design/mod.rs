//! The design-tree output model and its JSON encoding.

mod document;
mod node;
mod paint;

pub use document::{Canvas, ColorStyle, DesignDocument, DocumentRoot, PageKind, Styles};
pub use node::{
    AxisAlign, DesignNode, FontStyle, LayoutMode, LetterSpacing, LineHeight, MetricUnit, NodeKind,
    Padding, SizingMode, TextAlign, TextStyle, VectorPath, WindingRule,
};
pub use paint::{Paint, Rgba, ScaleMode};
