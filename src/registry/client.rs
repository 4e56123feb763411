//! Support for downloading container images from a registry server

use crate::{
    errors::ImageError,
    filesystem::{tar, SandboxRoot},
    image::{Digest, ImageReference, Repository, Tag},
    manifest::{media_types, ImageManifest, LayerInfo, Manifest},
    registry::{
        auth::{get_access_token, AccessToken},
        blob::{fetch_blob, DEFAULT_MAX_REDIRECTS},
        DefaultRegistry,
    },
};
use reqwest::{header, header::HeaderValue, redirect::Policy, StatusCode};
use std::time::Duration;
use url::Url;

/// Builder for configuring custom [Client] instances
#[derive(Debug)]
pub struct ClientBuilder {
    req: reqwest::ClientBuilder,
    default_registry: Option<DefaultRegistry>,
    registry_url: Option<Url>,
    auth_url: Option<Url>,
    service: Option<String>,
    max_redirects: usize,
}

impl ClientBuilder {
    /// Start constructing a custom registry client
    pub fn new() -> Self {
        let req = reqwest::Client::builder()
            .user_agent(Client::default_user_agent())
            .redirect(Policy::none());
        ClientBuilder {
            req,
            default_registry: None,
            registry_url: None,
            auth_url: None,
            service: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Set a timeout for each network request
    ///
    /// This timeout applies from the beginning of a (GET) request until the
    /// last byte has been received. By default there is no timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.req = self.req.timeout(timeout);
        self
    }

    /// Set a timeout for only the initial connect phase of each network request
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.req = self.req.connect_timeout(timeout);
        self
    }

    /// Sets the `User-Agent` header used by this client
    ///
    /// By default, the value returned by [Client::default_user_agent()] is
    /// used, which identifies the version of `burrow` acting as a client.
    pub fn user_agent(mut self, value: HeaderValue) -> Self {
        self.req = self.req.user_agent(value);
        self
    }

    /// Replace all registry settings at once
    ///
    /// The default if unset is [Client::default_registry()].
    pub fn registry(mut self, default_registry: &DefaultRegistry) -> Self {
        self.default_registry = Some(default_registry.clone());
        self
    }

    /// Use a different registry server for `/v2/` requests
    pub fn registry_url(mut self, url: Url) -> Self {
        self.registry_url = Some(url);
        self
    }

    /// Use a different token server
    pub fn auth_url(mut self, url: Url) -> Self {
        self.auth_url = Some(url);
        self
    }

    /// Service name to request tokens for
    pub fn service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Limit how many redirects are followed for each blob
    pub fn max_redirects(mut self, limit: usize) -> Self {
        self.max_redirects = limit;
        self
    }

    /// Construct a Client using the parameters from this Builder
    pub fn build(self) -> Result<Client, ImageError> {
        let mut registry = match self.default_registry {
            Some(registry) => registry,
            None => Client::default_registry()?,
        };
        if let Some(url) = self.registry_url {
            registry.registry_url = url;
        }
        if let Some(url) = self.auth_url {
            registry.auth_url = url;
        }
        if let Some(service) = self.service {
            registry.service = service;
        }
        log::debug!(
            "using registry {} with token server {}",
            registry.registry_url,
            registry.auth_url
        );
        Ok(Client {
            req: self.req.build()?,
            registry,
            max_redirects: self.max_redirects,
            token: None,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder::new()
    }
}

/// Registry clients download images from one registry server
///
/// A client pulls one image at a time: [Client::authenticate()] fetches a
/// token for the image's repository, which the following
/// [Client::pull_image()] uses for every manifest and blob request.
pub struct Client {
    req: reqwest::Client,
    registry: DefaultRegistry,
    max_redirects: usize,
    token: Option<AccessToken>,
}

impl Client {
    /// Construct a new registry client with default options
    pub fn new() -> Result<Client, ImageError> {
        Client::builder().build()
    }

    /// Construct a registry client with custom options, via ClientBuilder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Return the default `User-Agent` that we use if no other is set
    pub fn default_user_agent() -> HeaderValue {
        static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        HeaderValue::from_static(USER_AGENT)
    }

    /// Return the default registry settings
    ///
    /// This is Docker Hub, unless `$BURROW_REGISTRY` or `$BURROW_AUTH_URL`
    /// say otherwise.
    pub fn default_registry() -> Result<DefaultRegistry, ImageError> {
        DefaultRegistry::from_env()
    }

    /// Registry settings this client was built with
    pub fn registry(&self) -> &DefaultRegistry {
        &self.registry
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch and keep a pull token for one repository
    ///
    /// Any token from an earlier call is replaced.
    pub async fn authenticate(&mut self, repository: &Repository) -> Result<(), ImageError> {
        self.token = None;
        let token = get_access_token(&self.req, &self.registry, repository).await?;
        self.token = Some(token);
        Ok(())
    }

    fn token(&self) -> Result<&AccessToken, ImageError> {
        self.token.as_ref().ok_or(ImageError::NotAuthenticated)
    }

    async fn get_document(&self, url: Url, accept: &str) -> Result<Vec<u8>, ImageError> {
        log::debug!("GET {} ({})", url, accept);
        let response = self
            .req
            .get(url.clone())
            .bearer_auth(self.token()?.as_str())
            .header(header::ACCEPT, accept)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ImageError::UnexpectedStatus { status, url });
        }
        let body = response.bytes().await?;
        log::trace!("raw json manifest, {}", String::from_utf8_lossy(&body));
        Ok(body.to_vec())
    }

    /// Fetch the top-level manifest for a tag
    pub async fn get_manifest(
        &self,
        repository: &Repository,
        tag: &Tag,
    ) -> Result<Manifest, ImageError> {
        let url = self
            .registry
            .url_for(&format!("v2/{}/manifests/{}", repository, tag))?;
        let body = self.get_document(url, media_types::TOP_LEVEL_ACCEPT).await?;
        Manifest::from_slice(&body)
    }

    /// Fetch the image manifest an index entry points to
    ///
    /// The request asks for exactly the media type the index advertised.
    pub async fn get_image_manifest(
        &self,
        repository: &Repository,
        entry: &LayerInfo,
    ) -> Result<ImageManifest, ImageError> {
        let url = self
            .registry
            .url_for(&format!("v2/{}/manifests/{}", repository, entry.digest))?;
        let accept = if entry.media_type.is_empty() {
            media_types::DOCKER_MANIFEST
        } else {
            entry.media_type.as_str()
        };
        let body = self.get_document(url, accept).await?;
        ImageManifest::from_slice(&body)
    }

    /// Turn a top-level manifest into the ordered list of layers to apply
    ///
    /// For an image index this fetches the image manifest of the first entry.
    /// No platform matching happens here.
    pub async fn layer_digests(
        &self,
        repository: &Repository,
        manifest: &Manifest,
    ) -> Result<Vec<Digest>, ImageError> {
        match manifest {
            Manifest::V1 { fs_layers } => {
                Ok(fs_layers.iter().map(|layer| layer.digest.clone()).collect())
            }
            Manifest::Index { manifest_list } => {
                let first = manifest_list.first().ok_or(ImageError::EmptyManifestList)?;
                if let Some(platform) = &first.platform {
                    log::debug!(
                        "using first index entry, {}/{}",
                        platform.os,
                        platform.architecture
                    );
                }
                let image = self.get_image_manifest(repository, first).await?;
                Ok(image.layers.into_iter().map(|layer| layer.digest).collect())
            }
            Manifest::Image(image) => Ok(image
                .layers
                .iter()
                .map(|layer| layer.digest.clone())
                .collect()),
        }
    }

    /// Download one layer blob and unpack it over the sandbox's filesystem
    pub async fn pull_layer(
        &self,
        repository: &Repository,
        digest: &Digest,
        root: &SandboxRoot,
    ) -> Result<(), ImageError> {
        let url = self
            .registry
            .url_for(&format!("v2/{}/blobs/{}", repository, digest))?;
        let request = self
            .req
            .get(url)
            .bearer_auth(self.token()?.as_str())
            .build()?;
        let artifact = root.downloads().join(format!("{}.tar.gz", digest));

        log::info!("{} downloading layer {}", repository, digest);
        let size = fetch_blob(&self.req, request, &artifact, self.max_redirects).await?;
        log::debug!("{} downloaded, {} bytes", digest, size);

        tar::extract(&artifact, root.rootfs())
            .await
            .map_err(|source| ImageError::LayerExtraction {
                digest: digest.clone(),
                source,
            })?;
        tokio::fs::remove_file(&artifact).await?;
        Ok(())
    }

    /// Pull every layer of an image into the sandbox, in manifest order
    ///
    /// Requires a token from [Client::authenticate()]. Stops at the first
    /// failing layer; whatever was already unpacked stays in the sandbox.
    pub async fn pull_image(
        &self,
        image: &ImageReference,
        root: &SandboxRoot,
    ) -> Result<(), ImageError> {
        self.token()?;
        let manifest = self.get_manifest(image.repository(), image.tag()).await?;
        log::info!(
            "{} resolved schema {} manifest",
            image,
            manifest.schema_version()
        );
        let layers = self.layer_digests(image.repository(), &manifest).await?;
        log::info!("{} has {} layers", image, layers.len());
        for digest in &layers {
            self.pull_layer(image.repository(), digest, root).await?;
        }
        Ok(())
    }
}
