//! Effective style resolution for one element.
//!
//! Values flow down as a flat baseline: every property of the parent's
//! effective style is copied to the child, not only the properties CSS
//! treats as inherited. Matched rules are applied in specificity order
//! (source order breaking ties), `!important` rule declarations after the
//! normal ones, and the element's own `style` attribute last.

use std::collections::HashMap;

use selectors::context::SelectorCaches;

use super::media::MediaContext;
use super::selector::Specificity;
use super::stylesheet::{Declarations, StyleRule, Stylesheet, parse_declaration_list};
use crate::dom::ElementRef;

/// Property name to raw value for one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveStyle {
    props: HashMap<String, String>,
}

impl EffectiveStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.props.get(property).map(String::as_str)
    }

    /// Case-insensitive comparison of a keyword value.
    pub fn is(&self, property: &str, keyword: &str) -> bool {
        self.get(property)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(keyword))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn apply<'d>(&mut self, declarations: impl Iterator<Item = &'d super::Declaration>) {
        for decl in declarations {
            self.props.insert(decl.property.clone(), decl.value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EffectiveStyle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            props: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Style rules active for one conversion, flattened from a stylesheet
/// after media filtering.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<StyleRule>,
}

impl RuleSet {
    pub fn new(stylesheet: &Stylesheet, media: &MediaContext) -> Self {
        Self {
            rules: stylesheet.style_rules(media).into_iter().cloned().collect(),
        }
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<StyleRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = StyleRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Resolve the effective style of `element` given its parent's style.
pub fn resolve(element: ElementRef<'_>, rules: &RuleSet, parent: Option<&EffectiveStyle>) -> EffectiveStyle {
    let mut caches = SelectorCaches::default();
    let mut matched: Vec<(Specificity, &StyleRule)> = rules
        .rules
        .iter()
        .filter_map(|rule| Some((rule.matched_specificity(element, &mut caches)?, rule)))
        .collect();
    matched.sort_by_key(|(specificity, rule)| (*specificity, rule.source_order));

    let mut style = parent.cloned().unwrap_or_default();
    for (_, rule) in &matched {
        style.apply(rule.declarations.iter().filter(|d| !d.important));
    }
    for (_, rule) in &matched {
        style.apply(rule.declarations.iter().filter(|d| d.important));
    }

    if let Some(inline) = element.dom.get_attr(element.id, "style") {
        style.apply(parse_inline_style(inline).iter());
    }

    style
}

/// Parse a `style` attribute. `!important` markers are dropped since
/// inline declarations win regardless.
pub fn parse_inline_style(text: &str) -> Declarations {
    parse_declaration_list(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::media::Viewport;
    use crate::dom::{Dom, parse_html};

    fn resolve_tag(dom: &Dom, css: &str, tag: &str) -> EffectiveStyle {
        let sheet = Stylesheet::parse(css);
        let rules = RuleSet::new(&sheet, &MediaContext::new(Viewport::new(1024, 768), None));
        let id = dom.find_by_tag(tag).expect("element present");
        resolve(ElementRef::new(dom, id), &rules, None)
    }

    #[test]
    fn test_specificity_beats_source_order() {
        let dom = parse_html(r#"<p id="x" class="c">hi</p>"#);
        let style = resolve_tag(&dom, "#x { color: red } .c { color: blue } p { color: green }", "p");
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn test_later_rule_wins_on_equal_specificity() {
        let dom = parse_html(r#"<p class="a b">hi</p>"#);
        let style = resolve_tag(&dom, ".a { color: red } .b { color: blue }", "p");
        assert_eq!(style.get("color"), Some("blue"));
    }

    #[test]
    fn test_inline_always_wins() {
        let dom = parse_html(r#"<p id="x" style="color: purple">hi</p>"#);
        let style = resolve_tag(&dom, "#x { color: red !important }", "p");
        assert_eq!(style.get("color"), Some("purple"));
    }

    #[test]
    fn test_important_overrides_specificity() {
        let dom = parse_html(r#"<p id="x">hi</p>"#);
        let style = resolve_tag(&dom, "p { color: red !important } #x { color: blue }", "p");
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn test_parent_values_propagate_flatly() {
        let dom = parse_html(r#"<div><p>hi</p></div>"#);
        let parent: EffectiveStyle =
            [("color", "red"), ("width", "50px")].into_iter().collect();
        let p = dom.find_by_tag("p").unwrap();
        let style = resolve(ElementRef::new(&dom, p), &RuleSet::default(), Some(&parent));
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("width"), Some("50px"));
        assert_eq!(parent.len(), 2);
    }

    #[test]
    fn test_inline_important_marker_stripped() {
        let decls = parse_inline_style("Color: red !important; width: 4px");
        assert_eq!(decls.get("color"), Some("red"));
        assert_eq!(decls.get("width"), Some("4px"));
    }

    #[test]
    fn test_selector_list_weighs_matching_branch() {
        let dom = parse_html(r#"<h1 class="title">Hi</h1>"#);
        let style = resolve_tag(&dom, "h1, #hero { color: red } .title { color: blue }", "h1");
        assert_eq!(style.get("color"), Some("blue"));

        let dom = parse_html(r#"<h1 id="hero" class="title">Hi</h1>"#);
        let style = resolve_tag(&dom, "h1, #hero { color: red } .title { color: blue }", "h1");
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let dom = parse_html(r#"<p class="a" id="x" style="margin: 0">hi</p>"#);
        let css = ".a { color: red; padding: 4px } #x { color: blue } p { width: 10px !important }";
        assert_eq!(resolve_tag(&dom, css, "p"), resolve_tag(&dom, css, "p"));
    }

    #[test]
    fn test_unmatched_rules_ignored() {
        let dom = parse_html("<p>hi</p>");
        let style = resolve_tag(&dom, "div { color: red } p:hover { color: blue }", "p");
        assert!(style.get("color").is_none());
    }
}
