//! Pod manifest data model, structural validation, and canonical identity hashing.

pub mod canonical;
mod load;
mod model;
pub mod validate;

pub use canonical::{CanonicalManifest, HashError, manifest_hash};
pub use load::{ManifestError, load_manifest_from_path};
pub use model::*;
pub use validate::{ValidationError, validate_manifest};

#[cfg(test)]
mod tests;
