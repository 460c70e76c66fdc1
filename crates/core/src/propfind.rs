//! PROPFIND multi-status parsing.
//!
//! Turns the multi-status document a WebDAV server returns for a collection into the
//! de-duplicated, sorted listing the authoring frontend renders.

use crate::{paths, xml, GatewayResult};
use serde::Serialize;
use std::collections::HashSet;
use xmltree::Element;

/// One child of a listed collection.
///
/// Entries are snapshots regenerated on every listing; they are never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Repository-relative path without leading or trailing slash.
    pub path: String,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

/// The forms under which a server may report the queried collection itself.
struct SelfRow {
    url: String,
    url_path: Option<String>,
}

impl SelfRow {
    fn new(requested_url: &str) -> Self {
        let url = paths::decode(strip_one_slash(requested_url));
        let url_path = reqwest::Url::parse(requested_url)
            .ok()
            .map(|u| paths::decode(strip_one_slash(u.path())));
        Self { url, url_path }
    }

    fn matches(&self, href: &str) -> bool {
        href == self.url || self.url_path.as_deref() == Some(href)
    }
}

fn strip_one_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}

/// Parses a PROPFIND multi-status body returned for `requested_url`.
///
/// The queried collection itself, the collection root reported as its own child and
/// responses without a property block are skipped. Directories sort before files, then
/// names compare case-insensitively.
///
/// # Errors
/// Returns [`crate::GatewayError::Parse`] if `body` is not well-formed XML.
pub fn parse_propfind(body: &[u8], requested_url: &str) -> GatewayResult<Vec<DirectoryEntry>> {
    let root = xml::parse(body)?;
    let self_row = SelfRow::new(requested_url);

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for response in xml::children(&root, "response") {
        let Some(href_el) = xml::child(response, "href") else {
            continue;
        };
        let href = paths::decode(xml::text(href_el).trim());

        if self_row.matches(strip_one_slash(&href)) {
            continue;
        }

        let rel = paths::normalize_href(&href);
        if rel.is_empty() {
            continue;
        }

        let props: Vec<&Element> = xml::children(response, "propstat")
            .filter_map(|propstat| xml::child(propstat, "prop"))
            .collect();
        if props.is_empty() {
            tracing::debug!("skipping PROPFIND response without properties: {}", href);
            continue;
        }

        let is_dir = props
            .iter()
            .any(|prop| xml::path(prop, &["resourcetype", "collection"]).is_some());

        if !seen.insert((rel.clone(), is_dir)) {
            continue;
        }

        let name = props
            .iter()
            .filter_map(|prop| xml::child(prop, "displayname"))
            .map(|d| xml::text(d).trim().to_owned())
            .find(|n| !n.is_empty())
            .or_else(|| paths::file_name(&rel).map(str::to_owned))
            .unwrap_or_else(|| rel.clone());

        entries.push(DirectoryEntry {
            name,
            path: rel,
            is_dir,
        });
    }

    sort_entries(&mut entries);
    Ok(entries)
}

/// Directories first, then case-insensitive name ascending.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by_cached_key(|e| (!e.is_dir, e.name.to_lowercase()));
}
