//! Stylesheet parsing into an ordered rule list.
//!
//! Values are kept as raw text; typing happens later, per property, in the
//! layout mapper. Parsing is lenient: a rule that fails to parse is dropped
//! and the rest of the sheet still loads.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};
use selectors::context::SelectorCaches;
use selectors::parser::Selector;
use tracing::debug;

use super::media::{MediaContext, media_matches};
use super::selector::{
    Specificity, compile, fallback_matches, fallback_specificity, matching_specificity,
};
use crate::dom::{DomSelectors, ElementRef};

/// One `property: value` pair as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    /// Build a declaration from raw text, splitting off `!important`.
    /// Returns `None` for an empty property or value.
    pub fn from_raw(property: &str, raw_value: &str) -> Option<Self> {
        let property = property.trim();
        if property.is_empty() {
            return None;
        }
        let property = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };

        let mut value = raw_value.trim();
        let mut important = false;
        if let Some(bang) = value.rfind('!')
            && value[bang + 1..].trim().eq_ignore_ascii_case("important")
        {
            important = true;
            value = value[..bang].trim_end();
        }
        if value.is_empty() {
            return None;
        }

        Some(Self {
            property,
            value: value.to_string(),
            important,
        })
    }
}

/// Declarations of one rule in source order. Duplicates are kept; lookups
/// return the last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations(Vec<Declaration>);

impl Declarations {
    pub fn push(&mut self, declaration: Declaration) {
        self.0.push(declaration);
    }

    /// Last value declared for `property`.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Declaration> for Declarations {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A selector with its declaration block.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// Normalised selector text (may be a comma-separated list).
    pub selector: String,
    /// Specificity of the most specific branch of the list.
    pub specificity: Specificity,
    pub declarations: Declarations,
    /// Position among all style rules of the sheet, nested ones included.
    pub source_order: usize,
    /// `None` when the selector engine rejected the text; matching then
    /// goes through the restricted fallback matcher.
    compiled: Option<Vec<Selector<DomSelectors>>>,
}

impl StyleRule {
    pub fn new(selector: impl Into<String>, declarations: Declarations) -> Self {
        let selector = selector.into();
        let compiled = compile(&selector).ok();
        Self {
            specificity: match &compiled {
                Some(selectors) => Specificity::of_list(selectors),
                None => fallback_specificity(&selector),
            },
            compiled,
            selector,
            declarations,
            source_order: 0,
        }
    }

    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        let mut caches = SelectorCaches::default();
        self.matches_with_caches(element, &mut caches)
    }

    /// Match with caller-owned caches, reused across the rules tested
    /// against one element.
    pub fn matches_with_caches(&self, element: ElementRef<'_>, caches: &mut SelectorCaches) -> bool {
        self.matched_specificity(element, caches).is_some()
    }

    /// Specificity of the most specific branch matching `element`, so
    /// `h1, #hero` weighs as a type selector on an `h1` without that id.
    pub fn matched_specificity(
        &self,
        element: ElementRef<'_>,
        caches: &mut SelectorCaches,
    ) -> Option<Specificity> {
        match &self.compiled {
            Some(selectors) => matching_specificity(element, selectors, caches),
            None => fallback_matches(element, &self.selector).then_some(self.specificity),
        }
    }
}

/// One `@keyframes` step such as `from` or `50%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyframe {
    pub offset: String,
    pub declarations: Declarations,
}

/// Every rule kind the parser distinguishes.
#[derive(Debug, Clone)]
pub enum CssRule {
    Style(StyleRule),
    Media { query: String, rules: Vec<CssRule> },
    Supports { condition: String, rules: Vec<CssRule> },
    FontFace(Declarations),
    Import(String),
    Keyframes { name: String, frames: Vec<Keyframe> },
    Unknown(String),
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Parse stylesheet text. Never fails: unparseable rules are skipped,
    /// and text with no valid rules yields an empty sheet.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = parse_rule_list(&mut parser);

        let mut order = 0;
        number_style_rules(&mut rules, &mut order);
        debug!(rules = rules.len(), style_rules = order, "parsed stylesheet");

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Style rules that apply under `media`, flattened in source order.
    pub fn style_rules(&self, media: &MediaContext) -> Vec<&StyleRule> {
        let mut out = Vec::new();
        collect_style_rules(&self.rules, media, &mut out);
        out
    }

    pub fn font_faces(&self) -> impl Iterator<Item = &Declarations> {
        self.rules.iter().filter_map(|rule| match rule {
            CssRule::FontFace(decls) => Some(decls),
            _ => None,
        })
    }

    pub fn keyframes(&self) -> impl Iterator<Item = (&str, &[Keyframe])> {
        self.rules.iter().filter_map(|rule| match rule {
            CssRule::Keyframes { name, frames } => Some((name.as_str(), frames.as_slice())),
            _ => None,
        })
    }
}

fn number_style_rules(rules: &mut [CssRule], order: &mut usize) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => {
                style.source_order = *order;
                *order += 1;
            }
            CssRule::Media { rules, .. } | CssRule::Supports { rules, .. } => {
                number_style_rules(rules, order);
            }
            CssRule::FontFace(_)
            | CssRule::Import(_)
            | CssRule::Keyframes { .. }
            | CssRule::Unknown(_) => {}
        }
    }
}

fn collect_style_rules<'a>(rules: &'a [CssRule], media: &MediaContext, out: &mut Vec<&'a StyleRule>) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => out.push(style),
            CssRule::Media { query, rules } => {
                if media_matches(query, media) {
                    collect_style_rules(rules, media, out);
                }
            }
            CssRule::Supports { rules, .. } => collect_style_rules(rules, media, out),
            CssRule::FontFace(_)
            | CssRule::Import(_)
            | CssRule::Keyframes { .. }
            | CssRule::Unknown(_) => {}
        }
    }
}

/// Parse a `;`-separated declaration list such as an inline `style`
/// attribute.
pub fn parse_declaration_list(text: &str) -> Declarations {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_declaration_block(&mut parser)
}

fn parse_rule_list<'i>(input: &mut Parser<'i, '_>) -> Vec<CssRule> {
    let mut rule_parser = RuleListParser;
    let mut rules = Vec::new();
    for result in StyleSheetParser::new(input, &mut rule_parser) {
        match result {
            Ok(rule) => rules.push(rule),
            Err((_, slice)) => debug!("skipping unparseable rule: {}", slice.trim()),
        }
    }
    rules
}

fn parse_declaration_block<'i>(input: &mut Parser<'i, '_>) -> Declarations {
    let mut declarations = Declarations::default();
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };
    for result in RuleBodyParser::new(input, &mut decl_parser) {
        if let Err((_, slice)) = result {
            debug!("skipping unparseable declaration: {}", slice.trim());
        }
    }
    declarations
}

fn consume_rest(input: &mut Parser<'_, '_>) {
    while input.next().is_ok() {}
}

/// Collapse whitespace and put a single space after each list comma.
fn normalize_selector(raw: &str) -> String {
    raw.split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parser for a list of rules (top level and inside conditional blocks).
struct RuleListParser;

/// What an at-rule prelude turned out to be.
enum AtRulePrelude {
    Media(String),
    Supports(String),
    FontFace,
    Import(String),
    Keyframes(String),
    Other(String),
}

impl<'i> AtRuleParser<'i> for RuleListParser {
    type Prelude = AtRulePrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        let prelude = match name.to_ascii_lowercase().as_str() {
            "media" => {
                consume_rest(input);
                AtRulePrelude::Media(input.slice_from(start).trim().to_string())
            }
            "supports" => {
                consume_rest(input);
                AtRulePrelude::Supports(input.slice_from(start).trim().to_string())
            }
            "font-face" => {
                consume_rest(input);
                AtRulePrelude::FontFace
            }
            "import" => {
                let url = input.expect_url_or_string()?.to_string();
                consume_rest(input);
                AtRulePrelude::Import(url)
            }
            "keyframes" | "-webkit-keyframes" | "-moz-keyframes" => {
                let location = input.current_source_location();
                let name = match input.next()? {
                    cssparser::Token::Ident(s) | cssparser::Token::QuotedString(s) => s.to_string(),
                    _ => return Err(location.new_custom_error(())),
                };
                consume_rest(input);
                AtRulePrelude::Keyframes(name)
            }
            other => {
                consume_rest(input);
                AtRulePrelude::Other(other.to_string())
            }
        };
        Ok(prelude)
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        match prelude {
            AtRulePrelude::Import(url) => Ok(CssRule::Import(url)),
            AtRulePrelude::Other(name) => Ok(CssRule::Unknown(name)),
            AtRulePrelude::Media(_)
            | AtRulePrelude::Supports(_)
            | AtRulePrelude::FontFace
            | AtRulePrelude::Keyframes(_) => Err(()),
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let rule = match prelude {
            AtRulePrelude::Media(query) => CssRule::Media {
                query,
                rules: parse_rule_list(input),
            },
            AtRulePrelude::Supports(condition) => CssRule::Supports {
                condition,
                rules: parse_rule_list(input),
            },
            AtRulePrelude::FontFace => CssRule::FontFace(parse_declaration_block(input)),
            AtRulePrelude::Keyframes(name) => {
                let frames = parse_rule_list(input)
                    .into_iter()
                    .filter_map(|rule| match rule {
                        CssRule::Style(step) => Some(Keyframe {
                            offset: step.selector,
                            declarations: step.declarations,
                        }),
                        _ => None,
                    })
                    .collect();
                CssRule::Keyframes { name, frames }
            }
            AtRulePrelude::Import(url) => {
                consume_rest(input);
                CssRule::Import(url)
            }
            AtRulePrelude::Other(name) => {
                consume_rest(input);
                CssRule::Unknown(name)
            }
        };
        Ok(rule)
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleListParser {
    type Prelude = String;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        consume_rest(input);
        let selector = normalize_selector(input.slice_from(start));
        if selector.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selector)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let declarations = parse_declaration_block(input);
        Ok(CssRule::Style(StyleRule::new(prelude, declarations)))
    }
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Declarations,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        consume_rest(input);
        if let Some(declaration) = Declaration::from_raw(&name, input.slice_from(start)) {
            self.declarations.push(declaration);
        }
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}
