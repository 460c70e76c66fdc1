//! Authenticated WebDAV client.
//!
//! Every operation opens its own short-lived [`Session`], issues one or more WebDAV
//! verbs against the configured base URL and maps the upstream status onto a
//! [`GatewayResult`]. No connection outlives the operation that opened it; dropping the
//! session on any exit path releases it.
//!
//! Each operation declares the statuses it accepts ([`Accept`]). Statuses outside that
//! set become [`GatewayError::Upstream`] carrying the status and body verbatim, except
//! for the few codes an operation maps to a dedicated error (404 on read and delete,
//! 423 on lock).

use crate::config::GatewayConfig;
use crate::constants::{BINARY_CONTENT_SENTINEL, DEFAULT_CONTENT_TYPE};
use crate::lock_token::{self, LockInfo};
use crate::propfind::{parse_propfind, DirectoryEntry};
use crate::{paths, GatewayError, GatewayResult};
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use std::sync::Arc;

/// PROPFIND depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    /// Full recursive listing. Expensive on large trees; used by export only.
    Infinity,
}

impl Depth {
    pub fn as_header(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Upstream statuses an operation treats as success.
#[derive(Clone, Copy, Debug)]
enum Accept {
    Success,
    Below400,
    Only(&'static [u16]),
}

impl Accept {
    fn allows(self, status: StatusCode) -> bool {
        match self {
            Accept::Success => status.is_success(),
            Accept::Below400 => status.as_u16() < 400,
            Accept::Only(codes) => codes.contains(&status.as_u16()),
        }
    }
}

// 405 means the collection already exists; 301/302 are redirects to it.
const MKCOL_ACCEPT: Accept = Accept::Only(&[200, 201, 301, 302, 405]);
const DELETE_ACCEPT: Accept = Accept::Only(&[200, 204]);
const MOVE_COPY_ACCEPT: Accept = Accept::Only(&[201, 204]);
const LOCK_ACCEPT: Accept = Accept::Only(&[200, 201]);
const UNLOCK_ACCEPT: Accept = Accept::Only(&[200, 204]);

/// A fully buffered upstream response.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn accept(self, accept: Accept) -> GatewayResult<Self> {
        if accept.allows(self.status) {
            Ok(self)
        } else {
            Err(GatewayError::upstream(self.status.as_u16(), self.text()))
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// File bytes together with the content type the server reported.
#[derive(Clone, Debug)]
pub struct FileContent {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Result of a successful LOCK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    pub token: String,
    pub owner: String,
    #[serde(rename = "timeout")]
    pub timeout_seconds: u64,
}

/// Decodes file bytes as UTF-8, or returns [`BINARY_CONTENT_SENTINEL`].
pub fn decode_text(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .unwrap_or_else(|_| BINARY_CONTENT_SENTINEL.to_owned())
}

fn dav_method(name: &str) -> GatewayResult<Method> {
    Ok(Method::from_bytes(name.as_bytes())?)
}

/// Connection scope for one operation (or one export).
pub(crate) struct Session<'a> {
    http: reqwest::Client,
    config: &'a GatewayConfig,
}

impl Session<'_> {
    fn url(&self, path: &str) -> String {
        paths::join(self.config.base_url(), &paths::encode(path))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let credentials = self.config.credentials();
        self.http
            .request(method, self.url(path))
            .basic_auth(credentials.username(), Some(credentials.password()))
    }

    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Reply> {
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("upstream {} -> {}", response.url(), status);
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Reply {
            status,
            headers,
            body,
        })
    }

    pub(crate) async fn list(&self, path: &str, depth: Depth) -> GatewayResult<Vec<DirectoryEntry>> {
        let url = self.url(path);
        let reply = self
            .send(
                self.request(dav_method("PROPFIND")?, path)
                    .header("Depth", depth.as_header()),
            )
            .await?
            .accept(Accept::Below400)?;
        parse_propfind(&reply.body, &url)
    }

    pub(crate) async fn fetch(&self, path: &str) -> GatewayResult<FileContent> {
        let reply = self.send(self.request(Method::GET, path)).await?;
        if reply.status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(path.to_owned()));
        }
        // An unfollowed redirect or 304 carries no file body.
        let reply = reply.accept(Accept::Success)?;
        let content_type = reply.header(CONTENT_TYPE.as_str()).map(str::to_owned);
        Ok(FileContent {
            bytes: reply.body,
            content_type,
        })
    }

    async fn mkcol(&self, path: &str) -> GatewayResult<Reply> {
        self.send(self.request(dav_method("MKCOL")?, path)).await
    }

    async fn transfer(&self, verb: &str, src: &str, dst: &str) -> GatewayResult<()> {
        let destination = reqwest::Url::parse(&self.url(dst))
            .map_err(|e| GatewayError::InvalidInput(format!("invalid destination {dst:?}: {e}")))?;
        self.send(
            self.request(dav_method(verb)?, src)
                .header("Destination", destination.as_str())
                .header("Overwrite", "T"),
        )
        .await?
        .accept(MOVE_COPY_ACCEPT)?;
        Ok(())
    }
}

/// Stateless WebDAV gateway client sharing one read-only configuration.
#[derive(Clone, Debug)]
pub struct WebDavClient {
    config: Arc<GatewayConfig>,
}

impl WebDavClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub(crate) fn session(&self) -> GatewayResult<Session<'_>> {
        let http = reqwest::Client::builder()
            .timeout(self.config.request_timeout())
            .build()?;
        Ok(Session {
            http,
            config: &self.config,
        })
    }

    /// Lists `path` via PROPFIND.
    ///
    /// `path` may be empty to list the repository root.
    pub async fn list(&self, path: &str, depth: Depth) -> GatewayResult<Vec<DirectoryEntry>> {
        self.session()?.list(path, depth).await
    }

    /// Reads file bytes. A missing file is [`GatewayError::NotFound`].
    pub async fn read(&self, path: &str) -> GatewayResult<Bytes> {
        Ok(self.fetch(path).await?.bytes)
    }

    /// Reads file bytes together with the upstream content type.
    pub async fn fetch(&self, path: &str) -> GatewayResult<FileContent> {
        self.session()?.fetch(path).await
    }

    /// Reads a file as text, substituting [`BINARY_CONTENT_SENTINEL`] for non-UTF-8 content.
    pub async fn read_text(&self, path: &str) -> GatewayResult<String> {
        Ok(decode_text(&self.read(path).await?))
    }

    /// Writes `body` to `path`, creating missing ancestor collections first.
    ///
    /// Ancestors are created one MKCOL at a time, shortest first. A rejected MKCOL does
    /// not abort the write; the PUT reports whatever the server objects to. A supplied
    /// lock token is sent as an `If` header so the server refuses mismatched writes.
    pub async fn write(
        &self,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
        lock_token: Option<&str>,
    ) -> GatewayResult<()> {
        if paths::normalize(path).is_empty() {
            return Err(GatewayError::InvalidInput("path is required".into()));
        }

        let session = self.session()?;
        for ancestor in paths::ancestors(path) {
            let reply = session.mkcol(&ancestor).await?;
            if !MKCOL_ACCEPT.allows(reply.status) {
                tracing::debug!("MKCOL {} returned {}, continuing", ancestor, reply.status);
            }
        }

        let mut request = session
            .request(Method::PUT, path)
            .header(CONTENT_TYPE, content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .body(body);
        if let Some(token) = lock_token.map(str::trim).filter(|t| !t.is_empty()) {
            request = request.header(
                "If",
                lock_token::to_if_header(&lock_token::canonicalize(token)),
            );
        }

        session.send(request).await?.accept(Accept::Below400)?;
        Ok(())
    }

    /// Creates a collection. An existing collection counts as success.
    pub async fn mkdir(&self, path: &str) -> GatewayResult<()> {
        self.session()?.mkcol(path).await?.accept(MKCOL_ACCEPT)?;
        Ok(())
    }

    /// Deletes a resource. A missing resource is [`GatewayError::NotFound`].
    pub async fn remove(&self, path: &str) -> GatewayResult<()> {
        let session = self.session()?;
        let reply = session.send(session.request(Method::DELETE, path)).await?;
        if reply.status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(path.to_owned()));
        }
        reply.accept(DELETE_ACCEPT)?;
        Ok(())
    }

    /// Moves `src` to `dst`, overwriting the destination.
    pub async fn move_to(&self, src: &str, dst: &str) -> GatewayResult<()> {
        self.session()?.transfer("MOVE", src, dst).await
    }

    /// Copies `src` to `dst`, overwriting the destination.
    pub async fn copy_to(&self, src: &str, dst: &str) -> GatewayResult<()> {
        self.session()?.transfer("COPY", src, dst).await
    }

    /// Requests an exclusive write lock on `path` for `owner`.
    ///
    /// # Errors
    /// - [`GatewayError::LockConflict`] if the resource is already locked (423).
    /// - [`GatewayError::Parse`] if the server granted the lock without a token.
    pub async fn acquire_lock(
        &self,
        path: &str,
        owner: &str,
        timeout_seconds: u64,
    ) -> GatewayResult<LockGrant> {
        let session = self.session()?;
        let reply = session
            .send(
                session
                    .request(dav_method("LOCK")?, path)
                    .header("Timeout", format!("Second-{timeout_seconds}"))
                    .header(CONTENT_TYPE, "text/xml")
                    .body(lock_token::lock_request_body(owner)),
            )
            .await?;
        if reply.status == StatusCode::LOCKED {
            return Err(GatewayError::LockConflict(path.to_owned()));
        }
        let reply = reply.accept(LOCK_ACCEPT)?;

        let token = lock_token::extract_from_lock_response(&reply.body, reply.header("Lock-Token"))
            .ok_or_else(|| GatewayError::Parse("LOCK response carried no lock token".into()))?;
        tracing::info!("locked {} for {}", path, owner);

        Ok(LockGrant {
            token,
            owner: owner.to_owned(),
            timeout_seconds,
        })
    }

    /// Releases the lock identified by `token`, in any accepted client shape.
    pub async fn release_lock(&self, path: &str, token: &str) -> GatewayResult<()> {
        let token = lock_token::canonicalize(token);
        let session = self.session()?;
        session
            .send(
                session
                    .request(dav_method("UNLOCK")?, path)
                    .header("Lock-Token", lock_token::to_lock_token_header(&token)),
            )
            .await?
            .accept(UNLOCK_ACCEPT)?;
        tracing::info!("unlocked {}", path);
        Ok(())
    }

    /// Reports the active lock on `path`, if any.
    pub async fn lock_info(&self, path: &str) -> GatewayResult<LockInfo> {
        let session = self.session()?;
        let reply = session
            .send(
                session
                    .request(dav_method("PROPFIND")?, path)
                    .header("Depth", Depth::Zero.as_header())
                    .header(CONTENT_TYPE, "text/xml")
                    .body(lock_token::LOCK_DISCOVERY_BODY),
            )
            .await?
            .accept(Accept::Below400)?;
        lock_token::parse_lock_discovery(&reply.body)
    }
}
