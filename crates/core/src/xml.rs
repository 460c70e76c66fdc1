//! Namespace-agnostic lookups over parsed XML.
//!
//! WebDAV servers disagree on namespace prefixes (`D:`, `d:`, `lp1:`, none), so every
//! lookup here compares element local names only.

use crate::GatewayResult;
use xmltree::{Element, XMLNode};

pub(crate) fn parse(body: &[u8]) -> GatewayResult<Element> {
    Ok(Element::parse(body)?)
}

/// Direct child elements named `local`.
pub(crate) fn children<'a>(
    element: &'a Element,
    local: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    element.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == local => Some(e),
        _ => None,
    })
}

pub(crate) fn child<'a>(element: &'a Element, local: &'a str) -> Option<&'a Element> {
    children(element, local).next()
}

/// Follows `steps` from `element`, one child level per step.
pub(crate) fn path<'a>(element: &'a Element, steps: &[&'a str]) -> Option<&'a Element> {
    steps
        .iter()
        .try_fold(element, |current, step| child(current, *step))
}

/// Every element named `local` at or below `element`, in document order.
pub(crate) fn descendants<'a>(element: &'a Element, local: &str) -> Vec<&'a Element> {
    fn walk<'a>(element: &'a Element, local: &str, found: &mut Vec<&'a Element>) {
        if element.name == local {
            found.push(element);
        }
        for node in &element.children {
            if let XMLNode::Element(e) = node {
                walk(e, local, found);
            }
        }
    }

    let mut found = Vec::new();
    walk(element, local, &mut found);
    found
}

/// Concatenated text of `element` and all of its descendants.
pub(crate) fn text(element: &Element) -> String {
    fn collect(element: &Element, out: &mut String) {
        for node in &element.children {
            match node {
                XMLNode::Text(t) | XMLNode::CData(t) => out.push_str(t),
                XMLNode::Element(e) => collect(e, out),
                _ => {}
            }
        }
    }

    let mut out = String::new();
    collect(element, &mut out);
    out
}
