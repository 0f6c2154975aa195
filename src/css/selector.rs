//! Selector matching and specificity.
//!
//! Selectors go through the `selectors` engine. When it rejects a selector,
//! a restricted matcher handles the simple forms (`#id`, `.class`, `tag`,
//! `[attr]`, `[attr=value]`) and everything else matches nothing.

use cssparser::{ParseError, Parser, ParserInput};
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::parser::{Selector, SelectorList};
use tracing::debug;

use crate::dom::{Dom, DomSelectors, ElementRef, NodeId};

/// Compile selector text into engine selectors.
pub fn compile(selector: &str) -> Result<Vec<Selector<DomSelectors>>, ()> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|p| parse_selector_list(p))
        .map_err(|_| ())
}

fn parse_selector_list<'i>(
    parser: &mut Parser<'i, '_>,
) -> Result<Vec<Selector<DomSelectors>>, ParseError<'i, ()>> {
    let location = parser.current_source_location();
    let selectors =
        SelectorList::parse(&DomSelectors, parser, selectors::parser::ParseRelative::No)
            .map_err(|_| location.new_custom_error(()))?;

    Ok(selectors.slice().to_vec())
}

fn matches_compiled(
    element: ElementRef<'_>,
    selectors: &[Selector<DomSelectors>],
    caches: &mut SelectorCaches,
) -> bool {
    matching_specificity(element, selectors, caches).is_some()
}

/// Does `element` match `selector`? Unsupported selectors match nothing.
pub fn matches(element: ElementRef<'_>, selector: &str) -> bool {
    match compile(selector) {
        Ok(compiled) => {
            let mut caches = SelectorCaches::default();
            matches_compiled(element, &compiled, &mut caches)
        }
        Err(()) => fallback_matches(element, selector),
    }
}

/// Elements under `root` matching `selector`, in document order. `root`
/// itself is never included.
pub fn find_all(dom: &Dom, root: NodeId, selector: &str) -> Vec<NodeId> {
    let candidates = dom.descendants(root).filter(|&id| dom.is_element(id));
    match compile(selector) {
        Ok(compiled) => {
            let mut caches = SelectorCaches::default();
            candidates
                .filter(|&id| matches_compiled(ElementRef::new(dom, id), &compiled, &mut caches))
                .collect()
        }
        Err(()) => candidates
            .filter(|&id| fallback_matches(ElementRef::new(dom, id), selector))
            .collect(),
    }
}

/// The simple selector forms understood without the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Id(String),
    Class(String),
    Type(String),
    Attribute { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            return is_ident(id).then(|| Self::Id(id.to_string()));
        }
        if let Some(class) = selector.strip_prefix('.') {
            return is_ident(class).then(|| Self::Class(class.to_string()));
        }
        if let Some(inner) = selector
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            let (name, value) = match inner.split_once('=') {
                Some((name, value)) => (name.trim(), Some(unquote(value.trim()).to_string())),
                None => (inner.trim(), None),
            };
            return is_ident(name).then(|| Self::Attribute {
                name: name.to_string(),
                value,
            });
        }
        is_ident(selector).then(|| Self::Type(selector.to_ascii_lowercase()))
    }

    fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        match self {
            Self::Id(want) => dom.element_id(id) == Some(want.as_str()),
            Self::Class(want) => dom.element_classes(id).iter().any(|c| c == want),
            Self::Type(want) => dom
                .tag_name(id)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(want)),
            Self::Attribute { name, value } => match (dom.get_attr(id, name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(want)) => actual == want,
                (None, _) => false,
            },
        }
    }
}

pub(crate) fn fallback_matches(element: ElementRef<'_>, selector: &str) -> bool {
    match SimpleSelector::parse(selector) {
        Some(simple) => simple.matches(element.dom, element.id),
        None => {
            debug!(selector, "unsupported selector matches nothing");
            false
        }
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s)
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Selector specificity as (id, class, type) component counts, compared
/// lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity {
    pub ids: u16,
    pub classes: u16,
    pub elements: u16,
}

impl Specificity {
    pub fn from_selector(selector: &Selector<DomSelectors>) -> Self {
        let spec = selector.specificity();
        // selectors crate packs specificity as (id << 20) | (class << 10) | elements
        Self {
            ids: ((spec >> 20) & 0x3FF) as u16,
            classes: ((spec >> 10) & 0x3FF) as u16,
            elements: (spec & 0x3FF) as u16,
        }
    }

    /// Highest specificity among the branches of a selector list.
    pub fn of_list(selectors: &[Selector<DomSelectors>]) -> Self {
        selectors
            .iter()
            .map(Self::from_selector)
            .max()
            .unwrap_or_default()
    }

    /// Weight with 1000 per id, 100 per class, attribute or pseudo-class
    /// and 1 per type.
    pub fn weight(self) -> u32 {
        1000 * u32::from(self.ids) + 100 * u32::from(self.classes) + u32::from(self.elements)
    }
}

/// Specificity of the most specific branch of `selectors` that matches
/// `element`, or `None` when no branch matches.
pub(crate) fn matching_specificity(
    element: ElementRef<'_>,
    selectors: &[Selector<DomSelectors>],
    caches: &mut SelectorCaches,
) -> Option<Specificity> {
    let mut context = MatchingContext::new(
        selectors::matching::MatchingMode::Normal,
        None,
        caches,
        selectors::context::QuirksMode::NoQuirks,
        selectors::matching::NeedsSelectorFlags::No,
        selectors::matching::MatchingForInvalidation::No,
    );

    selectors
        .iter()
        .filter(|selector| {
            selectors::matching::matches_selector(selector, 0, None, &element, &mut context)
        })
        .map(Specificity::from_selector)
        .max()
}

/// Specificity of selector text that only the fallback matcher accepts.
pub(crate) fn fallback_specificity(selector: &str) -> Specificity {
    match SimpleSelector::parse(selector) {
        Some(SimpleSelector::Id(_)) => Specificity {
            ids: 1,
            ..Default::default()
        },
        Some(SimpleSelector::Class(_) | SimpleSelector::Attribute { .. }) => Specificity {
            classes: 1,
            ..Default::default()
        },
        Some(SimpleSelector::Type(_)) => Specificity {
            elements: 1,
            ..Default::default()
        },
        None => Specificity::default(),
    }
}

/// Specificity weight of `selector`: 1000 per id, 100 per class,
/// attribute or pseudo-class, 1 per type. A selector list weighs as its
/// most specific branch.
pub fn specificity(selector: &str) -> u32 {
    match compile(selector) {
        Ok(compiled) => Specificity::of_list(&compiled).weight(),
        Err(()) => fallback_specificity(selector).weight(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use proptest::prelude::*;

    fn first<'a>(dom: &'a Dom, tag: &str) -> ElementRef<'a> {
        ElementRef::new(dom, dom.find_by_tag(tag).expect("element present"))
    }

    #[test]
    fn test_specificity_values() {
        assert_eq!(specificity("p"), 1);
        assert_eq!(specificity(".a"), 100);
        assert_eq!(specificity("#x"), 1000);
        assert_eq!(specificity("div > p.lead"), 102);
        assert_eq!(specificity("#nav ul li.active a:hover"), 1000 + 200 + 3);
        assert_eq!(specificity("a[href^='http']"), 101);
        assert_eq!(specificity("*"), 0);
    }

    #[test]
    fn test_specificity_functional_pseudo_classes() {
        assert_eq!(specificity(":not(#a)"), 1000);
        assert_eq!(specificity("li:is(.a, .b)"), 101);
        assert_eq!(specificity("li:where(.a)"), 1);
        assert_eq!(specificity("li:nth-child(2n+1)"), 101);
    }

    #[test]
    fn test_selector_list_weighs_most_specific_branch() {
        assert_eq!(specificity("h1, #hero"), 1000);
        assert_eq!(specificity("p, .a, div span"), 100);
    }

    #[test]
    fn test_matching_specificity_uses_matching_branch() {
        let dom = parse_html(r#"<h1 class="title">Hi</h1>"#);
        let compiled = compile("h1, #hero").unwrap();
        let mut caches = SelectorCaches::default();
        let spec = matching_specificity(first(&dom, "h1"), &compiled, &mut caches);
        assert_eq!(spec.map(Specificity::weight), Some(1));
        assert!(matching_specificity(first(&dom, "h1"), &compile("#hero").unwrap(), &mut caches).is_none());
    }

    #[test]
    fn test_specificity_orders_ids_above_many_classes() {
        let many = Specificity {
            classes: 12,
            ..Default::default()
        };
        let one_id = Specificity {
            ids: 1,
            ..Default::default()
        };
        assert!(one_id > many);
    }

    #[test]
    fn test_fallback_specificity() {
        assert_eq!(fallback_specificity("#x").weight(), 1000);
        assert_eq!(fallback_specificity("[data-k]").weight(), 100);
        assert_eq!(fallback_specificity("p").weight(), 1);
        assert_eq!(fallback_specificity("p.a ~~ b").weight(), 0);
    }

    #[test]
    fn test_tag_selector() {
        let dom = parse_html("<div><p>Hello</p></div>");
        assert!(matches(first(&dom, "p"), "p"));
        assert!(!matches(first(&dom, "p"), "div"));
    }

    #[test]
    fn test_combinators() {
        let dom = parse_html(r#"<div class="card"><p id="t">Hi</p></div>"#);
        let p = first(&dom, "p");
        assert!(matches(p, ".card > p"));
        assert!(matches(p, "div #t"));
        assert!(!matches(p, "span > p"));
        assert!(matches(p, "h1, .card p"));
    }

    #[test]
    fn test_pseudo_classes() {
        let dom = parse_html(
            r#"<ul><li>a</li><li>b</li></ul><a href="/x">link</a><input checked>"#,
        );
        let items = find_all(&dom, dom.document(), "li:first-child");
        assert_eq!(items.len(), 1);
        assert!(matches(first(&dom, "a"), "a:link"));
        assert!(!matches(first(&dom, "a"), "a:hover"));
        assert!(matches(first(&dom, "input"), ":checked"));
    }

    #[test]
    fn test_unsupported_selector_matches_nothing() {
        let dom = parse_html("<p>x</p>");
        assert!(!matches(first(&dom, "p"), "p::-moz-selection-thing"));
        assert!(!matches(first(&dom, "p"), "p:unknown-state"));
    }

    #[test]
    fn test_fallback_forms() {
        let dom = parse_html(r#"<p id="x" class="a b" data-k="v">x</p>"#);
        let p = first(&dom, "p");
        assert!(fallback_matches(p, "#x"));
        assert!(fallback_matches(p, ".b"));
        assert!(fallback_matches(p, "P"));
        assert!(fallback_matches(p, "[data-k]"));
        assert!(fallback_matches(p, "[data-k=\"v\"]"));
        assert!(!fallback_matches(p, "[data-k=w]"));
        assert!(!fallback_matches(p, "p.a"));
    }

    #[test]
    fn test_find_all_excludes_root_and_keeps_order() {
        let dom = parse_html(
            r#"<div class="x"><span class="x">1</span><p><span class="x">2</span></p></div>"#,
        );
        let div = dom.find_by_tag("div").unwrap();
        let found = find_all(&dom, div, ".x");
        assert_eq!(found.len(), 2);
        assert!(!found.contains(&div));
        assert_eq!(dom.text_content(found[0]), "1");
        assert_eq!(dom.text_content(found[1]), "2");
    }

    proptest! {
        #[test]
        fn prop_adding_components_raises_specificity(
            tags in proptest::collection::vec("[a-z]{1,6}", 1..4),
            class in "[a-z]{1,6}",
            id in "[a-z]{1,6}",
        ) {
            let base = tags.join(" ");
            let with_class = format!("{base}.{class}");
            let with_id = format!("{with_class}#{id}");
            let deeper = format!("{base} {}", tags[0]);
            prop_assert!(specificity(&with_class) > specificity(&base));
            prop_assert!(specificity(&with_id) > specificity(&with_class));
            prop_assert!(specificity(&deeper) > specificity(&base));
        }
    }
}
