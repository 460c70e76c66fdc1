//! Lock token parsing and formatting.
//!
//! Clients hand tokens over in whatever shape they received them: a bare UUID, the
//! `opaquelocktoken:` URI, a `token=` form field, with or without angle brackets. The
//! upstream server only accepts the canonical URI inside `Lock-Token` and `If` headers.

use crate::constants::OPAQUE_LOCK_TOKEN_PREFIX;
use crate::{xml, GatewayError, GatewayResult};
use serde::Serialize;

/// Extracts a lock token from the three places an unlock request may carry it.
///
/// Sources are consulted in order, query parameter, JSON body `token` field, then the
/// raw text body (`token=<value>` or a bare value). The first non-empty value wins.
///
/// # Errors
/// Returns [`GatewayError::MissingToken`] when no source yields a value.
pub fn parse_incoming_token(query: Option<&str>, body: &[u8]) -> GatewayResult<String> {
    let sources: [&dyn Fn() -> Option<String>; 3] = [
        &|| query.map(str::to_owned),
        &|| token_from_json(body),
        &|| token_from_text(body),
    ];

    sources
        .iter()
        .filter_map(|source| source())
        .map(|token| token.trim().to_owned())
        .find(|token| !token.is_empty())
        .ok_or(GatewayError::MissingToken)
}

fn token_from_json(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("token")?.as_str().map(str::to_owned)
}

fn token_from_text(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.strip_prefix("token=") {
        Some(value) => Some(value.trim().to_owned()),
        None => Some(text.to_owned()),
    }
}

/// Converts any reasonably shaped token into `opaquelocktoken:<id>` form.
///
/// Whitespace, surrounding angle brackets and embedded spaces are removed. Applying it
/// twice gives the same result as applying it once.
pub fn canonicalize(raw: &str) -> String {
    let compact = raw.replace(' ', "");
    let bare = compact.trim_matches(|c: char| c.is_whitespace() || c == '<' || c == '>');
    if bare.starts_with(OPAQUE_LOCK_TOKEN_PREFIX) {
        bare.to_owned()
    } else {
        format!("{OPAQUE_LOCK_TOKEN_PREFIX}{bare}")
    }
}

/// `If` header value for a conditional write: `(<token>)`.
pub fn to_if_header(token: &str) -> String {
    format!("(<{token}>)")
}

/// `Lock-Token` header value for UNLOCK: `<token>`.
pub fn to_lock_token_header(token: &str) -> String {
    format!("<{token}>")
}

/// Reads the token a LOCK response granted.
///
/// The body's `locktoken/href` element is preferred wherever it appears. When the body
/// is empty, malformed or carries no token, the `Lock-Token` header is used instead.
pub fn extract_from_lock_response(body: &[u8], fallback_header: Option<&str>) -> Option<String> {
    let from_body = xml::parse(body).ok().and_then(|root| {
        xml::descendants(&root, "locktoken")
            .into_iter()
            .filter_map(|lt| xml::child(lt, "href"))
            .map(|href| strip_brackets(&xml::text(href)))
            .find(|token| !token.is_empty())
    });

    from_body.or_else(|| {
        fallback_header
            .map(strip_brackets)
            .filter(|token| !token.is_empty())
    })
}

fn strip_brackets(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '<' || c == '>')
        .to_owned()
}

/// Active lock state of a single resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    pub locked: bool,
    pub owner: Option<String>,
    pub token: Option<String>,
}

/// Reads a Depth:0 `lockdiscovery` PROPFIND response.
///
/// No `activelock` element anywhere means the resource is unlocked. Otherwise the first
/// owner and token found under any active lock are reported.
///
/// # Errors
/// Returns [`GatewayError::Parse`] if `body` is not well-formed XML.
pub fn parse_lock_discovery(body: &[u8]) -> GatewayResult<LockInfo> {
    let root = xml::parse(body)?;
    let active = xml::descendants(&root, "activelock");
    if active.is_empty() {
        return Ok(LockInfo::default());
    }

    let owner = active
        .iter()
        .find_map(|lock| xml::child(lock, "owner"))
        .map(|owner| xml::text(owner).trim().to_owned());
    let token = active
        .iter()
        .find_map(|lock| xml::path(lock, &["locktoken", "href"]))
        .map(|href| strip_brackets(&xml::text(href)));

    Ok(LockInfo {
        locked: true,
        owner,
        token,
    })
}

/// Request body for an exclusive write LOCK naming `owner`.
pub fn lock_request_body(owner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner>{}</D:owner>
</D:lockinfo>"#,
        htmlescape::encode_minimal(owner)
    )
}

/// Request body for a Depth:0 PROPFIND asking only for lock discovery.
pub const LOCK_DISCOVERY_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:"><D:prop><D:lockdiscovery/></D:prop></D:propfind>"#;
