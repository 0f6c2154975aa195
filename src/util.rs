//! Byte-level helpers: text decoding, media sniffing and image headers.

use std::borrow::Cow;

/// Decode page bytes to text.
///
/// Valid UTF-8 (with or without BOM) is returned borrowed. Otherwise the
/// `hint` encoding label is tried, then a `<meta charset>` declaration in
/// the first kilobyte, then Windows-1252.
pub fn decode_text<'a>(bytes: &'a [u8], hint: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    let label = hint.or_else(|| extract_meta_charset(bytes));
    if let Some(encoding) = label.and_then(|name| encoding_rs::Encoding::for_label(name.as_bytes())) {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Charset named by `<meta charset="...">` or an `http-equiv` content type
/// near the start of a page.
pub fn extract_meta_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(1024)];
    let pos = prefix
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"charset="))?;
    let rest = &prefix[pos + 8..];
    let rest = match rest.first() {
        Some(b'"' | b'\'') => &rest[1..],
        _ => rest,
    };
    let end = rest
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b' ' | b';' | b'>' | b'/'))
        .unwrap_or(rest.len());
    let label = std::str::from_utf8(&rest[..end]).ok()?;
    (!label.is_empty()).then_some(label)
}

/// Natural `(width, height)` of PNG, JPEG or GIF data, read from the header.
pub fn extract_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 {
        return None;
    }

    match MediaFormat::sniff(data) {
        MediaFormat::Png if data.len() >= 24 => {
            let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
            let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
            Some((width, height))
        }
        MediaFormat::Jpeg => extract_jpeg_dimensions(data),
        MediaFormat::Gif => {
            let width = u16::from_le_bytes([data[6], data[7]]) as u32;
            let height = u16::from_le_bytes([data[8], data[9]]) as u32;
            Some((width, height))
        }
        _ => None,
    }
}

/// Walk JPEG segments up to the first start-of-frame marker.
fn extract_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof && i + 9 < data.len() {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

/// Image formats a page references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
    Binary,
}

impl MediaFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Binary => "application/octet-stream",
        }
    }

    /// Format implied by a URL or path extension. Query strings and
    /// fragments are ignored.
    pub fn from_extension(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        let format = match ext.as_str() {
            "jpg" | "jpeg" => MediaFormat::Jpeg,
            "png" => MediaFormat::Png,
            "gif" => MediaFormat::Gif,
            "svg" => MediaFormat::Svg,
            "webp" => MediaFormat::WebP,
            _ => return None,
        };
        Some(format)
    }

    /// Format identified by magic bytes.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0xFF, 0xD8, ..] => MediaFormat::Jpeg,
            [0x89, b'P', b'N', b'G', ..] => MediaFormat::Png,
            [b'G', b'I', b'F', ..] => MediaFormat::Gif,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => MediaFormat::WebP,
            _ if looks_like_svg(data) => MediaFormat::Svg,
            _ => MediaFormat::Binary,
        }
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let prefix = &data[..data.len().min(256)];
    prefix.windows(4).any(|w| w.eq_ignore_ascii_case(b"<svg"))
}

/// Format from extension, falling back to magic bytes.
pub fn detect_media_format(url: &str, data: &[u8]) -> MediaFormat {
    MediaFormat::from_extension(url).unwrap_or_else(|| MediaFormat::sniff(data))
}

/// MIME type for a resource, or `None` when the format is unknown.
pub fn detect_mime_type(url: &str, data: &[u8]) -> Option<&'static str> {
    match detect_media_format(url, data) {
        MediaFormat::Binary => None,
        other => Some(other.mime_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0, 0, 0, 13]);
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(extract_image_dimensions(&png_header(640, 480)), Some((640, 480)));
    }

    #[test]
    fn test_gif_dimensions() {
        let gif = [b'G', b'I', b'F', b'8', b'9', b'a', 0x20, 0x00, 0x10, 0x00, 0, 0];
        assert_eq!(extract_image_dimensions(&gif), Some((32, 16)));
    }

    #[test]
    fn test_jpeg_dimensions() {
        let jpeg = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, // APP0, length 4
            0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x30, 0x00, 0x40, 0x03, // SOF0 48x64
        ];
        assert_eq!(extract_image_dimensions(&jpeg), Some((64, 48)));
    }

    #[test]
    fn test_unknown_image_has_no_dimensions() {
        assert_eq!(extract_image_dimensions(b"not an image at all"), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MediaFormat::from_extension("a/b/logo.PNG"), Some(MediaFormat::Png));
        assert_eq!(
            MediaFormat::from_extension("https://x.test/hero.jpg?w=200#top"),
            Some(MediaFormat::Jpeg)
        );
        assert_eq!(MediaFormat::from_extension("font.woff2"), None);
        assert_eq!(MediaFormat::from_extension("noext"), None);
    }

    #[test]
    fn test_format_sniffing() {
        assert_eq!(MediaFormat::sniff(&png_header(1, 1)), MediaFormat::Png);
        assert_eq!(MediaFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), MediaFormat::Jpeg);
        assert_eq!(MediaFormat::sniff(b"<?xml version=\"1.0\"?><svg/>"), MediaFormat::Svg);
        assert_eq!(MediaFormat::sniff(b"wOF2...."), MediaFormat::Binary);
        assert_eq!(MediaFormat::sniff(b"\x00\x00"), MediaFormat::Binary);
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type("photo.webp", &[]), Some("image/webp"));
        assert_eq!(detect_mime_type("blob", &png_header(1, 1)), Some("image/png"));
        assert_eq!(detect_mime_type("blob", &[]), None);
    }

    #[test]
    fn test_decode_text_with_meta_charset() {
        let mut bytes = b"<meta charset=\"windows-1251\"><p>".to_vec();
        bytes.push(0xCF); // Cyrillic capital Pe in cp1251
        let text = decode_text(&bytes, None);
        assert!(text.ends_with('\u{041F}'));
    }

    #[test]
    fn test_decode_text_utf8_borrowed() {
        let text = decode_text("héllo".as_bytes(), Some("latin1"));
        assert!(matches!(text, Cow::Borrowed("héllo")));
    }

    #[test]
    fn test_extract_meta_charset() {
        assert_eq!(extract_meta_charset(b"<meta charset=utf-8>"), Some("utf-8"));
        assert_eq!(
            extract_meta_charset(b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">"),
            Some("iso-8859-1")
        );
        assert_eq!(extract_meta_charset(b"<p>nothing</p>"), None);
    }
}
