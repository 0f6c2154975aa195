//! Capture bundles: validation and conversion through the web-source adapter.

use designtree::{
    CaptureBundle, CaptureError, ConversionContext, ConverterConfig, Error, NodeKind, Paint, Rgba,
    convert,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{FIXTURES_DIR}/{name}")
}

fn load_landing() -> CaptureBundle {
    CaptureBundle::load(fixture_path("landing.capture.json")).expect("fixture should validate")
}

#[test]
fn test_load_fixture() {
    let bundle = load_landing();
    assert_eq!(bundle.version, "1.0.0");
    assert_eq!(bundle.viewport.width, 390);
    assert_eq!(bundle.resources.images.len(), 2);
    assert_eq!(bundle.resources.fonts[1].loaded, Some(false));
    assert_eq!(bundle.metadata.user_agent.as_deref(), Some("Mozilla/5.0"));
}

#[test]
fn test_convert_capture() {
    let bundle = load_landing();
    let ctx = ConversionContext::for_capture(&bundle, ConverterConfig::default());
    let doc = convert(&ctx);

    assert_eq!(doc.document.name, "Team | Acme");
    assert_eq!(
        doc.canvas().unwrap().background_color,
        Rgba::from_u8(0x11, 0x18, 0x27, 1.0)
    );

    let body = doc.root().unwrap();
    assert_eq!((body.width, body.height), (Some(390.0), Some(844.0)));

    let card = &body.children[0];
    assert_eq!(card.name, "div");
    assert_eq!(card.item_spacing, Some(12.0));
    assert_eq!(card.stroke_weight, Some(1.0));
    assert_eq!(card.corner_radius, Some(12.0));

    let avatar = &card.children[0];
    assert_eq!(avatar.kind, NodeKind::Image);
    assert_eq!((avatar.width, avatar.height), (Some(48.0), Some(48.0)));
    assert!(matches!(avatar.fills.last(), Some(Paint::Image { .. })));

    // Loaded 600 weight keeps its family; the failed 400 falls back.
    let name = &card.children[1];
    assert_eq!(name.characters.as_deref(), Some("Jane Doe"));
    assert_eq!(name.style.as_ref().unwrap().font_family, "Roboto");
    let role = &card.children[2];
    assert_eq!(role.characters.as_deref(), Some("Designer at Acme"));
    assert_eq!(role.style.as_ref().unwrap().font_family, "Inter");

    // The banner image was captured without data, so only colour fills remain.
    let banner = &body.children[1];
    assert_eq!(banner.height, Some(200.0));
    assert!(banner.fills.iter().all(|f| matches!(f, Paint::Solid { .. })));
}

#[test]
fn test_invalid_bundles_rejected() {
    let err = CaptureBundle::from_json(r#"{"version": "1.0", "html": "", "css": ""}"#).unwrap_err();
    assert!(matches!(err, Error::InvalidCapture(CaptureError::MissingField(f)) if f == "resources"));

    let err = CaptureBundle::from_json("null").unwrap_err();
    assert!(matches!(err, Error::InvalidCapture(CaptureError::NotAnObject)));

    let text = std::fs::read_to_string(fixture_path("landing.capture.json")).unwrap();
    let future = text.replacen("\"1.0.0\"", "\"3.1\"", 1);
    assert!(matches!(
        CaptureBundle::from_json(&future),
        Err(Error::UnsupportedCaptureVersion(_))
    ));
}

#[test]
fn test_bundle_round_trips_through_serde() {
    let bundle = load_landing();
    let json = serde_json::to_string(&bundle).unwrap();
    assert_eq!(CaptureBundle::from_json(&json).unwrap(), bundle);
}
