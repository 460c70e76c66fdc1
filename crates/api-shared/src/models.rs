//! JSON bodies of the REST API.
//!
//! Field names follow what the authoring frontend already consumes (`isDir`, `timeout`),
//! so renames here are breaking changes for the editor.

use gateway_core::{DirectoryEntry, DitaReport, LockGrant, LockInfo};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Acknowledgement returned by every successful mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OkRes {
    pub ok: bool,
}

impl OkRes {
    pub fn success() -> Self {
        Self { ok: true }
    }
}

/// The configured WebDAV base URL, so the frontend can show absolute links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BaseRes {
    pub base: String,
}

/// One row of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

impl From<DirectoryEntry> for TreeEntry {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            is_dir: entry.is_dir,
        }
    }
}

/// Source and destination of a move or copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferReq {
    pub src: String,
    pub dst: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LockRes {
    pub token: String,
    pub owner: String,
    /// Requested lock lifetime in seconds.
    pub timeout: u64,
}

impl From<LockGrant> for LockRes {
    fn from(grant: LockGrant) -> Self {
        Self {
            token: grant.token,
            owner: grant.owner,
            timeout: grant.timeout_seconds,
        }
    }
}

/// Active lock state. `owner` and `token` are `null` when unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LockInfoRes {
    pub locked: bool,
    pub owner: Option<String>,
    pub token: Option<String>,
}

impl From<LockInfo> for LockInfoRes {
    fn from(info: LockInfo) -> Self {
        Self {
            locked: info.locked,
            owner: info.owner,
            token: info.token,
        }
    }
}

/// Body accepted by the unlock endpoint when the token is not in the query string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnlockReq {
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DitaReportRes {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
}

impl From<DitaReport> for DitaReportRes {
    fn from(report: DitaReport) -> Self {
        Self {
            ok: report.ok,
            errors: report.errors,
            warnings: report.warnings,
            root: report.root,
            ns: report.ns,
        }
    }
}
