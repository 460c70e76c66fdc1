#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource locked: {0}")]
    LockConflict(String),
    #[error("missing lock token")]
    MissingToken,
    #[error("failed to parse XML: {0}")]
    Parse(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid WebDAV method: {0}")]
    InvalidMethod(#[from] http::method::InvalidMethod),
    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to write archive entry: {0}")]
    ArchiveWrite(#[from] std::io::Error),
}

impl GatewayError {
    /// Builds an [`GatewayError::Upstream`] from a status code and response body.
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }
}

impl From<xmltree::ParseError> for GatewayError {
    fn from(err: xmltree::ParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
