//! The one value the conversion consumes, and the two ways of building it.

use tracing::debug;

use super::font::{font_style, map_font_family, normalize_font_weight};
use crate::capture::CaptureBundle;
use crate::config::ConverterConfig;
use crate::css::{MediaContext, RuleSet, Stylesheet, Viewport};
use crate::dom::{Dom, parse_html, style_blocks};
use crate::resources::{Fetched, FontKey, FontRecord, ImageResource, ResourceSnapshot};

/// Markup, stylesheet text and the environment to render them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionInput {
    pub markup: String,
    pub stylesheet: String,
    pub viewport: Viewport,
    /// `light` or `dark`, for `prefers-color-scheme`.
    pub theme: Option<String>,
    pub title: Option<String>,
}

/// Parsed form of a [`ConversionInput`].
pub(crate) struct PreparedInput {
    pub dom: Dom,
    pub stylesheet: Stylesheet,
    pub rules: RuleSet,
}

impl ConversionInput {
    pub fn new(markup: impl Into<String>, stylesheet: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            markup: markup.into(),
            stylesheet: stylesheet.into(),
            viewport,
            theme: None,
            title: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn media(&self) -> MediaContext {
        MediaContext::new(self.viewport, self.theme.clone())
    }

    /// Parse the markup, append its `<style>` blocks to the stylesheet
    /// text and build the media-filtered rule set.
    pub(crate) fn prepare(&self) -> PreparedInput {
        let dom = parse_html(&self.markup);

        let mut css = self.stylesheet.clone();
        for block in style_blocks(&dom) {
            css.push('\n');
            css.push_str(&block);
        }
        let stylesheet = Stylesheet::parse(&css);
        let rules = RuleSet::new(&stylesheet, &self.media());
        debug!(rules = rules.len(), nodes = dom.len(), "prepared input");

        PreparedInput {
            dom,
            stylesheet,
            rules,
        }
    }
}

/// Everything a conversion reads: the input, the frozen resource
/// snapshot and the configuration.
#[derive(Debug, Clone, Default)]
pub struct ConversionContext {
    pub input: ConversionInput,
    pub resources: ResourceSnapshot,
    pub config: ConverterConfig,
}

impl ConversionContext {
    pub fn new(input: ConversionInput, resources: ResourceSnapshot, config: ConverterConfig) -> Self {
        Self {
            input,
            resources,
            config,
        }
    }

    /// Context for markup and stylesheets supplied directly.
    pub fn for_source(
        markup: impl Into<String>,
        stylesheet: impl Into<String>,
        viewport: Viewport,
        resources: ResourceSnapshot,
        config: ConverterConfig,
    ) -> Self {
        Self::new(ConversionInput::new(markup, stylesheet, viewport), resources, config)
    }

    /// Context for a captured page. Embedded images and font load states
    /// become the resource snapshot; captured stylesheets are appended to
    /// the page CSS.
    pub fn for_capture(bundle: &CaptureBundle, config: ConverterConfig) -> Self {
        let mut stylesheet = bundle.css.clone();
        for sheet in &bundle.resources.stylesheets {
            stylesheet.push('\n');
            stylesheet.push_str(sheet);
        }

        let mut input = ConversionInput::new(bundle.html.clone(), stylesheet, bundle.viewport);
        input.title = bundle
            .metadata
            .title
            .clone()
            .filter(|t| !t.trim().is_empty());
        input.theme = bundle.metadata.theme.clone();

        let mut resources = ResourceSnapshot::default();
        for image in &bundle.resources.images {
            let fetched: Fetched<ImageResource> = match &image.data {
                Some(data) => {
                    ImageResource::from_base64(image.url.clone(), data, image.mime_type.as_deref())
                        .map(|r| r.with_dimensions(image.width, image.height))
                        .into()
                }
                None => Fetched::Failed("no image data captured".to_string()),
            };
            resources.insert_image(image.url.clone(), fetched);
        }
        for font in &bundle.resources.fonts {
            let key = FontKey::new(
                map_font_family(&font.family, &config.default_font_family),
                normalize_font_weight(&font.weight.to_string()),
                font_style(font.style.as_deref()),
            );
            let fetched = if font.loaded == Some(false) {
                Fetched::Failed("font did not load".to_string())
            } else {
                Fetched::Ready(FontRecord::from(&key))
            };
            resources.insert_font(key, fetched);
        }
        debug!(
            images = resources.image_count(),
            fonts = resources.font_count(),
            failures = resources.failures(),
            "built resource snapshot from capture"
        );

        Self::new(input, resources, config)
    }
}
