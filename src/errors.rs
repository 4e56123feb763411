//! Error types you might see while pulling an image or running a container

use crate::image::Digest;
use std::path::PathBuf;
use thiserror::Error;

/// Errors during container image preparation
#[derive(Error, Debug)]
pub enum ImageError {
    /// invalid image reference format
    #[error("invalid image reference format: {0:?}")]
    InvalidReferenceFormat(String),

    /// storage io error
    #[error("storage io error: {0}")]
    Storage(#[from] std::io::Error),

    /// json error
    #[error("json error: {0}")]
    JSON(#[from] serde_json::Error),

    /// network request error
    #[error("network request error: {0}")]
    NetworkRequest(#[from] reqwest::Error),

    /// invalid url
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// token request to the registry's auth server failed
    #[error("registry authentication failed: {0}")]
    Auth(String),

    /// a registry request was attempted before authenticating
    #[error("no access token; authenticate before pulling")]
    NotAuthenticated,

    /// manifest has a schemaVersion we don't know how to read
    #[error("unsupported manifest schema version: {0}")]
    UnsupportedSchema(u64),

    /// image index has no entries to choose from
    #[error("image index lists no manifests")]
    EmptyManifestList,

    /// registry answered with a status we don't handle
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: url::Url,
    },

    /// redirect without a usable Location header
    #[error("redirect from {0} has no usable location")]
    MissingRedirectLocation(url::Url),

    /// too many redirects while downloading a blob
    #[error("gave up after {limit} redirects")]
    RedirectLoop { limit: usize },

    /// layer archive could not be unpacked
    #[error("failed to extract layer {digest}: {source}")]
    LayerExtraction {
        digest: Digest,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while preparing the sandbox or running the command inside it
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// sandbox directory setup failed
    #[error("sandbox setup failed at {path:?}: {source}")]
    SandboxSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// root change or namespace creation failed
    #[error("confinement failed: {0}")]
    Confinement(#[source] std::io::Error),

    /// the command could not be started
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// waiting for the command failed
    #[error("failed waiting for container process: {0}")]
    Wait(#[source] std::io::Error),

    /// container image error
    #[error("container image error: {0}")]
    Image(#[from] ImageError),
}

impl RuntimeError {
    pub(crate) fn setup<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RuntimeError::SandboxSetup { path, source }
    }
}
