//! XML formatting and lightweight DITA checks for the authoring editor.

use crate::constants::{DITA_NAMESPACE_URIS, DITA_ROOTS};
use crate::{xml, GatewayError, GatewayResult};
use serde::Serialize;
use xmltree::{EmitterConfig, Element, XMLNode};

/// Re-emits `body` indented, without insignificant whitespace.
///
/// # Errors
/// Returns [`GatewayError::Parse`] if `body` is not well-formed.
pub fn format_xml(body: &[u8]) -> GatewayResult<String> {
    let root = xml::parse(body)?;
    let mut out = Vec::new();
    root.write_with_config(
        &mut out,
        EmitterConfig::new()
            .perform_indent(true)
            .indent_string("  "),
    )
    .map_err(|e| GatewayError::Parse(e.to_string()))?;
    String::from_utf8(out).map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Outcome of [`validate_dita`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DitaReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
}

/// Checks that `body` is well-formed and looks like a DITA document.
///
/// Only well-formedness is an error. An unusual root element, an unknown namespace,
/// a root without `@id` and empty `@href` attributes are reported as warnings.
pub fn validate_dita(body: &[u8]) -> DitaReport {
    let root = match xml::parse(body) {
        Ok(root) => root,
        Err(e) => {
            return DitaReport {
                ok: false,
                errors: vec![e.to_string()],
                ..DitaReport::default()
            }
        }
    };

    let mut warnings = Vec::new();
    let ns = root.namespace.clone().unwrap_or_default();

    if !DITA_ROOTS.contains(&root.name.as_str()) {
        warnings.push(format!(
            "Root element '{}' is not a typical DITA root ({}).",
            root.name,
            DITA_ROOTS.join(", ")
        ));
    }

    if !ns.is_empty() && !DITA_NAMESPACE_URIS.contains(&ns.as_str()) {
        warnings.push(format!("Namespace '{ns}' is not a common DITA namespace."));
    }

    if root.attributes.get("id").map_or(true, |id| id.is_empty()) {
        warnings.push("Root element has no @id.".to_owned());
    }

    let empty_hrefs: usize = child_elements(&root).map(count_empty_hrefs).sum();
    for _ in 0..empty_hrefs {
        warnings.push("Empty @href attribute found.".to_owned());
    }

    DitaReport {
        ok: true,
        errors: Vec::new(),
        warnings,
        root: Some(root.name.clone()),
        ns: Some(ns),
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

fn count_empty_hrefs(element: &Element) -> usize {
    let own = usize::from(
        element
            .attributes
            .get("href")
            .is_some_and(|href| href.trim().is_empty()),
    );
    own + child_elements(element).map(count_empty_hrefs).sum::<usize>()
}
