//! Constants used throughout the gateway core crate.
//!
//! Header values, environment variable names and protocol literals live here so the
//! client, the parsers and the binaries agree on them.

/// Marker segment after which an upstream href becomes repository-relative.
pub const COLLECTION_ROOT_MARKER: &str = "/documentLibrary/";

/// Prefix every canonical lock token carries.
pub const OPAQUE_LOCK_TOKEN_PREFIX: &str = "opaquelocktoken:";

/// Returned by text reads when the file is not valid UTF-8.
pub const BINARY_CONTENT_SENTINEL: &str = "<<BINARY CONTENT (not UTF-8)>>";

/// Per-connection timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lock timeout requested when the caller does not name one.
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 1800;

/// Owner recorded on locks acquired without an explicit owner.
pub const DEFAULT_LOCK_OWNER: &str = "unknown";

/// Content type used for writes that do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Environment variable holding the WebDAV base URL.
pub const ENV_WEBDAV_BASE: &str = "ALFRESCO_WEBDAV_BASE";

/// Environment variable holding the shared service username.
pub const ENV_USERNAME: &str = "ALFRESCO_USERNAME";

/// Environment variable holding the shared service password.
pub const ENV_PASSWORD: &str = "ALFRESCO_PASSWORD";

/// Environment variable overriding the per-connection timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "WEBDAV_TIMEOUT_SECS";

/// Root element names accepted as DITA document types.
pub const DITA_ROOTS: &[&str] = &[
    "bookmap",
    "concept",
    "glossentry",
    "map",
    "reference",
    "task",
    "topic",
];

/// Namespace URIs accepted on a DITA root element.
pub const DITA_NAMESPACE_URIS: &[&str] = &[
    "http://dita.oasis-open.org/architecture/2005/",
    "http://dita.oasis-open.org/architecture/2005/dita",
    "urn:oasis:names:tc:dita:x:y",
];
