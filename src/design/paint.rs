use serde::{Deserialize, Serialize};

/// Colour with channels normalised to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    /// Flat grey used for placeholders.
    pub const PLACEHOLDER: Rgba = Rgba::new(0.8, 0.8, 0.8, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// From 8-bit channels and a `[0, 1]` alpha.
    pub fn from_u8(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            a.clamp(0.0, 1.0),
        )
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    #[default]
    Fill,
    Fit,
    Tile,
}

/// A fill or stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Rgba,
    },
    Image {
        #[serde(rename = "imageHash")]
        image_hash: String,
        #[serde(rename = "scaleMode", default)]
        scale_mode: ScaleMode,
    },
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Paint::Solid { color }
    }

    pub fn image(image_hash: impl Into<String>) -> Self {
        Paint::Image {
            image_hash: image_hash.into(),
            scale_mode: ScaleMode::Fill,
        }
    }
}
