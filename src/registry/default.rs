//! Where the registry and its token server live

use crate::errors::ImageError;
use std::env;
use url::Url;

/// Network endpoints for one registry server
///
/// The registry answers `/v2/...` requests; the auth server hands out bearer
/// tokens for a `service` name the registry trusts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultRegistry {
    /// Base URL for `/v2/` requests
    pub registry_url: Url,
    /// Token endpoint
    pub auth_url: Url,
    /// Value for the token request's `service` parameter
    pub service: String,
}

impl DefaultRegistry {
    pub const REGISTRY_URL: &'static str = "https://registry-1.docker.io";
    pub const AUTH_URL: &'static str = "https://auth.docker.io/token";
    pub const SERVICE: &'static str = "registry.docker.io";

    /// Return the built-in defaults, Docker Hub
    pub fn new() -> Self {
        DefaultRegistry {
            registry_url: Url::parse(Self::REGISTRY_URL).expect("constant url"),
            auth_url: Url::parse(Self::AUTH_URL).expect("constant url"),
            service: Self::SERVICE.to_owned(),
        }
    }

    /// Built-in defaults, overridden by `$BURROW_REGISTRY` and
    /// `$BURROW_AUTH_URL` when those are set
    pub fn from_env() -> Result<Self, ImageError> {
        let mut settings = DefaultRegistry::new();
        if let Ok(s) = env::var("BURROW_REGISTRY") {
            settings.registry_url = Url::parse(&s)?;
        }
        if let Ok(s) = env::var("BURROW_AUTH_URL") {
            settings.auth_url = Url::parse(&s)?;
        }
        Ok(settings)
    }

    /// Resolve a path like `v2/library/busybox/manifests/latest` against the
    /// registry base URL
    pub fn url_for(&self, path: &str) -> Result<Url, ImageError> {
        let mut base = self.registry_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

impl Default for DefaultRegistry {
    fn default() -> Self {
        DefaultRegistry::new()
    }
}
