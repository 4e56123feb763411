//! Fake registry and layer fixtures shared by the integration tests

#![allow(dead_code)]

use burrow::registry::Client;
use flate2::{write::GzEncoder, Compression};
use serde_json::json;
use url::Url;
use wiremock::{
    matchers::{header, header_exists, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "test-token";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A syntactically valid digest; nothing checks blob contents against it
pub fn digest(n: u8) -> String {
    format!("sha256:{}", format!("{:02x}", n).repeat(32))
}

/// Modification time stamped on every fixture entry
pub const LAYER_MTIME: u64 = 1_600_000_000;

/// Gzipped tar holding regular files with mode 0644
pub fn layer(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(LAYER_MTIME);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn schema_v1(digests: &[String]) -> serde_json::Value {
    json!({
        "schemaVersion": 1,
        "fsLayers": digests.iter().map(|d| json!({ "blobSum": d })).collect::<Vec<_>>(),
    })
}

pub fn image_manifest(digests: &[String]) -> serde_json::Value {
    json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": 100,
            "digest": digest(0xcc),
        },
        "layers": digests.iter().map(|d| json!({
            "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
            "size": 1,
            "digest": d,
        })).collect::<Vec<_>>(),
    })
}

pub struct FakeRegistry {
    pub server: MockServer,
}

impl FakeRegistry {
    /// Start a registry whose token server grants pulls on `repository`
    pub async fn start(repository: &str) -> Self {
        init_logging();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(query_param("service", "registry.docker.io"))
            .and(query_param("scope", format!("repository:{}:pull", repository)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": TOKEN })))
            .mount(&server)
            .await;
        FakeRegistry { server }
    }

    pub fn client(&self) -> Client {
        Client::builder()
            .registry_url(Url::parse(&self.server.uri()).unwrap())
            .auth_url(Url::parse(&format!("{}/token", self.server.uri())).unwrap())
            .build()
            .unwrap()
    }

    /// Serve a manifest document, expecting it to be fetched `times` times
    pub async fn manifest(&self, repository: &str, reference: &str, doc: serde_json::Value, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/{}/manifests/{}", repository, reference)))
            .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
            .and(header_exists("accept"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Serve a blob through a redirect to unauthenticated storage
    pub async fn blob(&self, repository: &str, digest: &str, body: Vec<u8>) {
        self.blob_times(repository, digest, body, 1).await
    }

    /// Like [FakeRegistry::blob], expecting `times` downloads
    pub async fn blob_times(&self, repository: &str, digest: &str, body: Vec<u8>, times: u64) {
        let storage = format!("/storage/{}", digest);
        Mock::given(method("GET"))
            .and(path(format!("/v2/{}/blobs/{}", repository, digest)))
            .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(
                ResponseTemplate::new(307)
                    .insert_header("Location", format!("{}{}?signature=x", self.server.uri(), storage)),
            )
            .expect(times)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(storage))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn missing_blob(&self, repository: &str, digest: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/{}/blobs/{}", repository, digest)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Every request that reached the storage host, in order
    pub async fn storage_requests(&self) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().starts_with("/storage/"))
            .collect()
    }
}
