//! Selector parsing and matching
//!
//! Supports the subset of CSS selectors widgets use to locate their parts:
//!
//! - Type and universal selectors: `ui-menu-item`, `*`
//! - `#id`, `.class`
//! - Attribute selectors: `[attr]`, `[attr=value]`, `[attr~=word]`,
//!   `[attr^=prefix]`, `[attr$=suffix]`, `[attr*=substring]`
//! - Negation of a compound: `:not([hidden])`
//! - Descendant (whitespace) and child (`>`) combinators
//! - Selector lists: `a, b`
//!
//! Matching never crosses a shadow boundary: a node's ancestors stop at the
//! shadow root (or document) that contains it.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, map, opt},
    error::{
        context, ContextError, ErrorKind, ParseError as NomParseError, VerboseError,
        VerboseErrorKind,
    },
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};

use crate::document::{Document, NodeId};
use crate::error::SelectorError;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum TypeSelector {
    Universal,
    Tag(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum SimpleSelector {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        test: Option<(AttrOp, String)>,
    },
    Not(Box<Compound>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    type_selector: Option<TypeSelector>,
    simple: Vec<SimpleSelector>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One compound plus the combinator linking it to the compound on its left
#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    combinator: Combinator,
    compound: Compound,
}

/// A parsed selector list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Vec<Step>>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        let result = selector_list(trimmed).finish();
        match result {
            Ok((rest, alternatives)) if rest.trim().is_empty() => Ok(Self {
                source: trimmed.to_string(),
                alternatives,
            }),
            Ok((rest, _)) => Err(SelectorError {
                selector: source.to_string(),
                offset: trimmed.len() - rest.len(),
                message: "unexpected input".to_string(),
            }),
            Err(e) => Err(selector_error(source, trimmed, e)),
        }
    }

    /// The selector text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches any selector in the list
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node)
            && self
                .alternatives
                .iter()
                .any(|steps| matches_step(doc, steps, steps.len() - 1, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn selector_error(source: &str, trimmed: &str, error: VerboseError<&str>) -> SelectorError {
    let offset = error
        .errors
        .first()
        .map(|(rest, _)| trimmed.len() - rest.len())
        .unwrap_or(0);
    let contexts: Vec<&str> = error
        .errors
        .iter()
        .filter_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some(*ctx),
            _ => None,
        })
        .collect();
    let message = if contexts.is_empty() {
        "unexpected input".to_string()
    } else {
        format!("expected {}", contexts.join(" in "))
    };
    tracing::debug!(selector = source, offset, %message, "selector parse failed");
    SelectorError {
        selector: source.to_string(),
        offset,
        message,
    }
}

// =============================================================================
// Matching
// =============================================================================

fn matches_step(doc: &Document, steps: &[Step], index: usize, node: NodeId) -> bool {
    let step = &steps[index];
    if !step.compound.matches(doc, node) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match step.combinator {
        Combinator::Child => {
            doc.parent_element(node).is_some_and(|p| matches_step(doc, steps, index - 1, p))
        }
        Combinator::Descendant => {
            std::iter::successors(doc.parent_element(node), |&n| doc.parent_element(n))
                .any(|a| matches_step(doc, steps, index - 1, a))
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(TypeSelector::Tag(tag)) = &self.type_selector {
            if doc.tag(node) != Some(tag.as_str()) {
                return false;
            }
        }
        self.simple.iter().all(|s| s.matches(doc, node))
    }
}

impl SimpleSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            SimpleSelector::Id(id) => doc.id(node) == Some(id.as_str()),
            SimpleSelector::Class(class) => doc.has_class(node, class),
            SimpleSelector::Attribute { name, test } => {
                let Some(actual) = doc.attribute(node, name) else {
                    return false;
                };
                match test {
                    None => true,
                    Some((AttrOp::Equals, v)) => actual == v,
                    Some((AttrOp::Includes, v)) => actual.split_ascii_whitespace().any(|w| w == v),
                    Some((AttrOp::Prefix, v)) => !v.is_empty() && actual.starts_with(v.as_str()),
                    Some((AttrOp::Suffix, v)) => !v.is_empty() && actual.ends_with(v.as_str()),
                    Some((AttrOp::Substring, v)) => !v.is_empty() && actual.contains(v.as_str()),
                }
            }
            SimpleSelector::Not(inner) => !inner.matches(doc, node),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn quoted(input: &str) -> ParseResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn attr_op(input: &str) -> ParseResult<AttrOp> {
    alt((
        map(tag("~="), |_| AttrOp::Includes),
        map(tag("^="), |_| AttrOp::Prefix),
        map(tag("$="), |_| AttrOp::Suffix),
        map(tag("*="), |_| AttrOp::Substring),
        map(tag("="), |_| AttrOp::Equals),
    ))(input)
}

fn attribute_test(input: &str) -> ParseResult<(AttrOp, String)> {
    let (input, op) = attr_op(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = context("attribute value", alt((quoted, identifier)))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (op, value.to_string())))
}

fn attribute_body(input: &str) -> ParseResult<SimpleSelector> {
    let (input, _) = multispace0(input)?;
    let (input, name) = context("attribute name", identifier)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, test) = opt(attribute_test)(input)?;
    let (input, _) = context("closing bracket", char(']'))(input)?;
    Ok((
        input,
        SimpleSelector::Attribute {
            name: name.to_ascii_lowercase(),
            test,
        },
    ))
}

/// `[name]` or `[name op value]`
fn attribute(input: &str) -> ParseResult<SimpleSelector> {
    preceded(char('['), cut(context("attribute selector", attribute_body)))(input)
}

fn not_pseudo(input: &str) -> ParseResult<SimpleSelector> {
    let (input, _) = tag(":not(")(input)?;
    let (input, inner) = cut(context(
        ":not argument",
        delimited(multispace0, compound, tuple((multispace0, char(')')))),
    ))(input)?;
    Ok((input, SimpleSelector::Not(Box::new(inner))))
}

fn simple(input: &str) -> ParseResult<SimpleSelector> {
    alt((
        map(
            preceded(char('#'), cut(context("id", identifier))),
            |id: &str| SimpleSelector::Id(id.to_string()),
        ),
        map(
            preceded(char('.'), cut(context("class name", identifier))),
            |class: &str| SimpleSelector::Class(class.to_string()),
        ),
        attribute,
        not_pseudo,
    ))(input)
}

fn compound(input: &str) -> ParseResult<Compound> {
    let (input, type_selector) = opt(alt((
        map(char('*'), |_| TypeSelector::Universal),
        map(identifier, |t: &str| TypeSelector::Tag(t.to_ascii_lowercase())),
    )))(input)?;
    let (input, simple) = many0(simple)(input)?;
    if type_selector.is_none() && simple.is_empty() {
        return Err(nom::Err::Error(VerboseError::add_context(
            input,
            "compound selector",
            VerboseError::from_error_kind(input, ErrorKind::Verify),
        )));
    }
    Ok((
        input,
        Compound {
            type_selector,
            simple,
        },
    ))
}

fn complex(input: &str) -> ParseResult<Vec<Step>> {
    let (mut input, first) = compound(input)?;
    let mut steps = vec![Step {
        combinator: Combinator::Descendant,
        compound: first,
    }];

    loop {
        let child: ParseResult<Compound> = preceded(
            tuple((multispace0, char('>'), multispace0)),
            cut(context("compound after `>`", compound)),
        )(input);
        match child {
            Ok((rest, compound)) => {
                steps.push(Step {
                    combinator: Combinator::Child,
                    compound,
                });
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        let descendant: ParseResult<Compound> = preceded(multispace1, compound)(input);
        match descendant {
            Ok((rest, compound)) => {
                steps.push(Step {
                    combinator: Combinator::Descendant,
                    compound,
                });
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((input, steps))
}

fn selector_list(input: &str) -> ParseResult<Vec<Vec<Step>>> {
    context(
        "selector",
        separated_list1(tuple((multispace0, char(','), multispace0)), complex),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let menu = doc.create_element("ui-menu");
        let item = doc.create_element("ui-menu-item");
        let nested = doc.create_element("ui-menu-item");
        doc.append_child(doc.root(), menu).unwrap();
        doc.append_child(menu, item).unwrap();
        let submenu = doc.create_element("ui-submenu");
        doc.append_child(item, submenu).unwrap();
        doc.append_child(submenu, nested).unwrap();
        doc.set_attribute(menu, "id", "main");
        doc.set_attribute(item, "class", "first primary");
        doc.set_attribute(nested, "data-value", "open-file");
        (doc, menu, item, nested)
    }

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn test_simple_selectors() {
        let (doc, menu, item, nested) = doc();
        assert!(sel("ui-menu").matches(&doc, menu));
        assert!(sel("UI-MENU").matches(&doc, menu));
        assert!(sel("#main").matches(&doc, menu));
        assert!(sel(".primary").matches(&doc, item));
        assert!(sel("*").matches(&doc, nested));
        assert!(sel("[data-value]").matches(&doc, nested));
        assert!(sel("[data-value=open-file]").matches(&doc, nested));
        assert!(sel("[data-value=\"open-file\"]").matches(&doc, nested));
        assert!(sel("[data-value^=open]").matches(&doc, nested));
        assert!(sel("[data-value$=file]").matches(&doc, nested));
        assert!(sel("[data-value*=n-f]").matches(&doc, nested));
        assert!(sel("[class~=first]").matches(&doc, item));
        assert!(!sel("[class~=fir]").matches(&doc, item));
    }

    #[test]
    fn test_not() {
        let (doc, _, item, nested) = doc();
        let s = sel("ui-menu-item:not(.primary)");
        assert!(!s.matches(&doc, item));
        assert!(s.matches(&doc, nested));
    }

    #[test]
    fn test_combinators() {
        let (doc, _, item, nested) = doc();
        assert!(sel("ui-menu > ui-menu-item").matches(&doc, item));
        assert!(!sel("ui-menu > ui-menu-item").matches(&doc, nested));
        assert!(sel("ui-menu ui-menu-item").matches(&doc, nested));
        assert!(sel("#main ui-submenu>ui-menu-item").matches(&doc, nested));
        assert!(!sel("ui-submenu ui-menu").matches(&doc, nested));
    }

    #[test]
    fn test_selector_list() {
        let (doc, menu, item, _) = doc();
        let s = sel("#main , .primary");
        assert!(s.matches(&doc, menu));
        assert!(s.matches(&doc, item));
        assert_eq!(s.to_string(), "#main , .primary");
    }

    #[test]
    fn test_does_not_cross_shadow_boundary() {
        let (mut doc, menu, _, _) = doc();
        let shadow = doc.attach_shadow(menu).unwrap();
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();
        assert!(!sel("ui-menu span").matches(&doc, inner));
        assert!(sel("span").matches(&doc, inner));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "[", "[a=", "a >", "#", ".", "a,", ":hover", "a ! b"] {
            let err = Selector::parse(bad).unwrap_err();
            assert_eq!(err.selector, bad, "{bad:?}");
        }
        let err = Selector::parse("ui-menu [oops").unwrap_err();
        assert!(err.offset >= 8, "{err}");
    }
}
