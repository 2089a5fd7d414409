use std::io;
use std::path::{Path, PathBuf};

use crate::{PodManifest, validate::ValidationError, validate_manifest};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid manifest: {0}")]
    Invalid(#[from] ValidationError),
}

impl PodManifest {
    /// Parse and validate a manifest from YAML bytes.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: PodManifest = serde_yaml::from_slice(bytes)?;
        validate_manifest(&manifest)?;
        Ok(manifest)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        Self::from_yaml_slice(text.as_bytes())
    }

    pub fn to_yaml_string(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

pub fn load_manifest_from_path(path: impl AsRef<Path>) -> Result<PodManifest, ManifestError> {
    let path_ref = path.as_ref();
    let bytes = std::fs::read(path_ref).map_err(|source| ManifestError::Io {
        path: path_ref.to_path_buf(),
        source,
    })?;
    PodManifest::from_yaml_slice(&bytes)
}
