//! Registry manifest documents
//!
//! A tag resolves to one of three document shapes. Schema 1 manifests list
//! their layers directly in `fsLayers`. Schema 2 documents are either an image
//! index (`manifests`, one entry per platform) which points at a second image
//! manifest, or that image manifest itself with its `layers`.
//!
//! Reference: <https://docs.docker.com/registry/spec/manifest-v2-2/>

use crate::{errors::ImageError, image::Digest};
use serde::Deserialize;
use serde_json::Value;

pub mod media_types {
    pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

    /// `Accept` value for the first manifest request: image indexes first,
    /// single-platform manifests at lower weight for registries that have
    /// nothing else.
    pub const TOP_LEVEL_ACCEPT: &str = concat!(
        "application/vnd.oci.image.index.v1+json, ",
        "application/vnd.docker.distribution.manifest.list.v2+json, ",
        "application/vnd.oci.image.manifest.v1+json;q=0.5, ",
        "application/vnd.docker.distribution.manifest.v2+json;q=0.5",
    );
}

/// A reference to a blob or manifest, as listed in schema 2 documents
#[derive(Clone, Debug, Deserialize)]
pub struct LayerInfo {
    pub digest: Digest,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Platform {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

/// One schema 1 layer entry
#[derive(Clone, Debug, Deserialize)]
pub struct FsLayer {
    #[serde(rename = "blobSum")]
    pub digest: Digest,
}

/// Second-stage schema 2 document listing the actual filesystem layers
#[derive(Clone, Debug, Deserialize)]
pub struct ImageManifest {
    pub config: LayerInfo,
    pub layers: Vec<LayerInfo>,
}

#[derive(Deserialize)]
struct SchemaV1 {
    #[serde(rename = "fsLayers")]
    fs_layers: Vec<FsLayer>,
}

#[derive(Deserialize)]
struct ImageIndex {
    manifests: Vec<LayerInfo>,
}

#[derive(Deserialize)]
struct Versioned {
    #[serde(rename = "schemaVersion", default)]
    schema_version: u64,
}

/// Top-level manifest for a tag, decoded by `schemaVersion`
#[derive(Clone, Debug)]
pub enum Manifest {
    /// schema 1, layers in registry order
    V1 { fs_layers: Vec<FsLayer> },
    /// schema 2 image index, one entry per platform
    Index { manifest_list: Vec<LayerInfo> },
    /// schema 2 single-platform image manifest
    Image(ImageManifest),
}

impl Manifest {
    /// Decode a manifest, reading the schema version before anything else
    pub fn from_slice(data: &[u8]) -> Result<Self, ImageError> {
        let value: Value = serde_json::from_slice(data)?;
        let Versioned { schema_version } = Versioned::deserialize(&value)?;
        match schema_version {
            1 => {
                let v1 = SchemaV1::deserialize(&value)?;
                Ok(Manifest::V1 {
                    fs_layers: v1.fs_layers,
                })
            }
            2 if value.get("manifests").is_some() => {
                let index = ImageIndex::deserialize(&value)?;
                Ok(Manifest::Index {
                    manifest_list: index.manifests,
                })
            }
            2 => Ok(Manifest::Image(ImageManifest::deserialize(&value)?)),
            other => Err(ImageError::UnsupportedSchema(other)),
        }
    }

    pub fn schema_version(&self) -> u64 {
        match self {
            Manifest::V1 { .. } => 1,
            Manifest::Index { .. } | Manifest::Image(_) => 2,
        }
    }
}

impl ImageManifest {
    pub fn from_slice(data: &[u8]) -> Result<Self, ImageError> {
        Ok(serde_json::from_slice(data)?)
    }
}
