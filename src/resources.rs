//! Image and font resources.
//!
//! Conversion runs in two phases. First every image and font the page
//! needs is collected into a [`ResourcePlan`] and fetched concurrently
//! through a [`ResourceFetcher`]; all fetches are awaited together and
//! their outcomes frozen into a [`ResourceSnapshot`]. The tree walk then
//! reads the snapshot without ever waiting on or mutating it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::config::ConverterConfig;
use crate::convert::{ConversionInput, background_image_url, font_key, walk_styled};
use crate::design::FontStyle;
use crate::util::{detect_mime_type, extract_image_dimensions};

/// Why a resource could not be fetched. Recorded in the snapshot; never
/// aborts a conversion.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("undecodable payload: {0}")]
    Decode(String),

    #[error("unsupported resource location: {0}")]
    Unsupported(String),

    #[error("resource not found: {0}")]
    NotFound(String),
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub url: String,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Hex SHA-1 of the bytes, used as the image paint hash.
    pub hash: String,
    pub data: Vec<u8>,
}

impl ImageResource {
    /// Build from raw bytes, sniffing the type and natural size when the
    /// caller does not know them.
    pub fn from_bytes(url: impl Into<String>, data: Vec<u8>, mime_type: Option<&str>) -> Self {
        let url = url.into();
        let mime_type = mime_type
            .map(str::to_string)
            .or_else(|| detect_mime_type(&url, &data).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let (width, height) = match extract_image_dimensions(&data) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        Self {
            hash: sha1_smol::Sha1::from(&data).hexdigest(),
            url,
            mime_type,
            width,
            height,
            data,
        }
    }

    /// Build from a base64 payload.
    pub fn from_base64(
        url: impl Into<String>,
        payload: &str,
        mime_type: Option<&str>,
    ) -> Result<Self, ResourceError> {
        let data = decode_base64(payload)?;
        Ok(Self::from_bytes(url, data, mime_type))
    }

    /// Override the natural size with caller-reported dimensions.
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        if width.is_some() {
            self.width = width;
        }
        if height.is_some() {
            self.height = height;
        }
        self
    }
}

/// A font the page requests, as the design tool will name it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
}

impl FontKey {
    pub fn new(family: impl Into<String>, weight: u16, style: FontStyle) -> Self {
        Self {
            family: family.into(),
            weight,
            style,
        }
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.style {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        };
        write!(f, "{}-{}-{}", self.family, self.weight, style)
    }
}

/// A font that is available to the design tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRecord {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
}

impl From<&FontKey> for FontRecord {
    fn from(key: &FontKey) -> Self {
        Self {
            family: key.family.clone(),
            weight: key.weight,
            style: key.style,
        }
    }
}

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Ready(T),
    Failed(String),
}

impl<T> Fetched<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Fetched::Ready(value) => Some(value),
            Fetched::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Fetched::Failed(_))
    }
}

impl<T> From<Result<T, ResourceError>> for Fetched<T> {
    fn from(result: Result<T, ResourceError>) -> Self {
        match result {
            Ok(value) => Fetched::Ready(value),
            Err(e) => Fetched::Failed(e.to_string()),
        }
    }
}

/// Frozen fetch results for one conversion.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    images: BTreeMap<String, Fetched<ImageResource>>,
    fonts: BTreeMap<FontKey, Fetched<FontRecord>>,
}

impl ResourceSnapshot {
    pub fn insert_image(&mut self, url: impl Into<String>, image: Fetched<ImageResource>) {
        self.images.insert(url.into(), image);
    }

    pub fn insert_font(&mut self, key: FontKey, font: Fetched<FontRecord>) {
        self.fonts.insert(key, font);
    }

    /// A successfully fetched image. Falls back to a path-suffix match so
    /// relative `src` values find images recorded under absolute URLs.
    pub fn image(&self, url: &str) -> Option<&ImageResource> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        if let Some(fetched) = self.images.get(url) {
            return fetched.ready();
        }
        let relative = url.trim_start_matches("./").trim_start_matches('/');
        if relative.is_empty() || url.starts_with("data:") {
            return None;
        }
        self.images
            .iter()
            .filter(|(key, _)| {
                key.strip_suffix(relative)
                    .is_some_and(|prefix| prefix.ends_with('/'))
            })
            .find_map(|(_, fetched)| fetched.ready())
    }

    pub fn font(&self, key: &FontKey) -> Option<&FontRecord> {
        self.fonts.get(key).and_then(Fetched::ready)
    }

    pub fn font_failed(&self, key: &FontKey) -> bool {
        self.fonts.get(key).is_some_and(Fetched::is_failed)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn failures(&self) -> usize {
        self.images.values().filter(|f| f.is_failed()).count()
            + self.fonts.values().filter(|f| f.is_failed()).count()
    }
}

/// Everything a page needs fetched before conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePlan {
    pub images: BTreeSet<String>,
    pub fonts: BTreeSet<FontKey>,
}

impl ResourcePlan {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.fonts.is_empty()
    }
}

/// Walk the styled page and gather every `<img src>`, every
/// `background-image` URL and every font key used by text.
pub fn collect_resource_plan(input: &ConversionInput, config: &ConverterConfig) -> ResourcePlan {
    let prepared = input.prepare();
    let mut plan = ResourcePlan::default();

    walk_styled(&prepared.dom, &prepared.rules, config, |dom, id, style| {
        if dom.tag_name(id) == Some("img")
            && let Some(src) = dom.get_attr(id, "src").map(str::trim)
            && !src.is_empty()
        {
            plan.images.insert(src.to_string());
        }
        if let Some(url) = background_image_url(style) {
            plan.images.insert(url);
        }
        let has_text = dom
            .children(id)
            .any(|child| dom.text(child).is_some_and(|t| !t.trim().is_empty()));
        if has_text {
            plan.fonts.insert(font_key(style, config));
        }
    });

    debug!(
        images = plan.images.len(),
        fonts = plan.fonts.len(),
        "collected resource plan"
    );
    plan
}

/// Source of image bytes and font availability.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<ImageResource, ResourceError>;

    async fn fetch_font(&self, key: &FontKey) -> Result<FontRecord, ResourceError>;
}

/// Fetch everything in `plan` concurrently and freeze the results. Every
/// fetch is awaited before this returns; failures are recorded, not
/// raised.
pub async fn prefetch<F>(fetcher: &F, plan: &ResourcePlan) -> ResourceSnapshot
where
    F: ResourceFetcher + ?Sized,
{
    let images = join_all(plan.images.iter().map(|url| async move {
        let result = fetcher.fetch_image(url).await;
        (url.clone(), result)
    }));
    let fonts = join_all(plan.fonts.iter().map(|key| async move {
        let result = fetcher.fetch_font(key).await;
        (key.clone(), result)
    }));
    let (images, fonts) = futures::join!(images, fonts);

    let mut snapshot = ResourceSnapshot::default();
    for (url, result) in images {
        if let Err(e) = &result {
            warn!(url = %url, error = %e, "image fetch failed");
        }
        snapshot.insert_image(url, result.into());
    }
    for (key, result) in fonts {
        if let Err(e) = &result {
            warn!(font = %key, error = %e, "font fetch failed");
        }
        snapshot.insert_font(key, result.into());
    }
    snapshot
}

/// Fetcher for local conversions: resolves `data:` URIs and paths relative
/// to a base directory. Remote URLs are reported as unsupported; every
/// mapped font family is treated as available.
#[derive(Debug, Clone, Default)]
pub struct LocalFetcher {
    base_dir: Option<PathBuf>,
}

impl LocalFetcher {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl ResourceFetcher for LocalFetcher {
    async fn fetch_image(&self, url: &str) -> Result<ImageResource, ResourceError> {
        if url.starts_with("data:") {
            let (mime, data) = decode_data_uri(url)?;
            return Ok(ImageResource::from_bytes(url, data, mime.as_deref()));
        }
        if url.contains("://") && !url.starts_with("file://") {
            return Err(ResourceError::Unsupported(url.to_string()));
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = percent_decode_str(path).decode_utf8_lossy().into_owned();
        let full = match &self.base_dir {
            Some(base) => base.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        };
        if !full.is_file() {
            return Err(ResourceError::NotFound(full.display().to_string()));
        }
        let data = std::fs::read(&full)?;
        Ok(ImageResource::from_bytes(url, data, None))
    }

    async fn fetch_font(&self, key: &FontKey) -> Result<FontRecord, ResourceError> {
        Ok(FontRecord::from(key))
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, ResourceError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ResourceError::Decode(e.to_string()))
}

/// Split a `data:` URI into its media type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(Option<String>, Vec<u8>), ResourceError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ResourceError::Unsupported(uri.chars().take(32).collect()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ResourceError::Decode("data URI without payload".to_string()))?;

    let mut params = header.split(';');
    let mime = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        decode_base64(&percent_decode_str(payload).decode_utf8_lossy())?
    } else {
        percent_decode_str(payload).collect()
    };
    Ok((mime, data))
}
