//! # Gateway Core
//!
//! Core logic for the WebDAV authoring gateway.
//!
//! This crate talks to the upstream WebDAV repository and nothing else:
//! - Directory listings parsed from PROPFIND multistatus responses
//! - File reads and writes, with missing parent collections created on write
//! - Collection creation, deletion, move and copy
//! - Exclusive write locks and lock discovery
//! - Zip export of a subtree
//! - XML formatting and DITA checks for the editor
//!
//! **No API concerns**: HTTP routing, CORS and the OpenAPI surface belong in `api-rest`
//! and `api-shared`.

pub mod client;
pub mod config;
pub mod constants;
pub mod dita;
pub mod export;
pub mod lock_token;
pub mod paths;
pub mod propfind;

mod error;
pub(crate) mod xml;

#[cfg(feature = "test-support")]
pub mod fake_dav;

pub use client::{decode_text, Depth, FileContent, LockGrant, WebDavClient};
pub use config::{Credentials, GatewayConfig};
pub use dita::{format_xml, validate_dita, DitaReport};
pub use error::{GatewayError, GatewayResult};
pub use export::{archive_name, export_zip};
pub use lock_token::LockInfo;
pub use propfind::DirectoryEntry;
