//! Canonical, formatting-independent view of a manifest and its identity hash.
//!
//! The view keeps declaration order everywhere. Ordered maps are flattened to
//! `(key, value)` pairs so the encoding never depends on map iteration order.

use std::time::Duration;

use chrono::SecondsFormat;
use indexmap::IndexMap;
use serde::Serialize;
use spice_cbor::Hash;

use crate::{ConnectorSpec, DataSourceGroup, ModelsSpec, PodManifest, TrainingSpec};

/// Version tag mixed into every digest; bump when the canonical layout changes.
pub const CANONICAL_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("canonical encoding failed: {0}")]
    Encode(#[from] serde_cbor::Error),
}

#[derive(Debug, Serialize)]
pub struct CanonicalManifest<'a> {
    version: u32,
    name: &'a str,
    training: Option<CanonicalTraining>,
    data_sources: Vec<CanonicalGroup<'a>>,
    fields: Vec<&'a str>,
    rewards: Vec<(&'a str, &'a str)>,
    actions: Vec<(&'a str, &'a str)>,
    models: Option<CanonicalModels<'a>>,
}

/// Durations are `(seconds, subsecond nanos)` so every `Duration` encodes.
#[derive(Debug, Serialize)]
struct CanonicalTraining {
    epoch: Option<String>,
    period: Option<(u64, u32)>,
    interval: Option<(u64, u32)>,
    granularity: Option<(u64, u32)>,
}

#[derive(Debug, Serialize)]
struct CanonicalGroup<'a> {
    from: &'a str,
    name: &'a str,
    fields: Vec<&'a str>,
    connector: Option<CanonicalConnector<'a>>,
}

#[derive(Debug, Serialize)]
struct CanonicalConnector<'a> {
    name: &'a str,
    connection: Option<&'a str>,
    params: Vec<(&'a str, &'a str)>,
}

#[derive(Debug, Serialize)]
struct CanonicalModels<'a> {
    downloader: Option<(&'a str, Option<&'a str>)>,
    keep: Option<u32>,
}

impl<'a> CanonicalManifest<'a> {
    /// Empty `training` and `models` sections encode the same as absent ones.
    pub fn new(manifest: &'a PodManifest) -> Self {
        Self {
            version: CANONICAL_VERSION,
            name: &manifest.name,
            training: manifest
                .training
                .as_ref()
                .filter(|t| **t != TrainingSpec::default())
                .map(canonical_training),
            data_sources: manifest.data_sources.iter().map(canonical_group).collect(),
            fields: manifest.fields.iter().map(|f| f.name.as_str()).collect(),
            rewards: pairs(&manifest.rewards),
            actions: pairs(&manifest.actions),
            models: manifest
                .models
                .as_ref()
                .filter(|m| **m != ModelsSpec::default())
                .map(canonical_models),
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, HashError> {
        Ok(spice_cbor::to_canonical_cbor(self)?)
    }
}

/// Content hash identifying a manifest; stable across processes and platforms.
pub fn manifest_hash(manifest: &PodManifest) -> Result<Hash, HashError> {
    let canonical = CanonicalManifest::new(manifest);
    Ok(Hash::of_bytes(&canonical.to_cbor()?))
}

fn pairs(map: &IndexMap<String, String>) -> Vec<(&str, &str)> {
    map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn canonical_training(training: &TrainingSpec) -> CanonicalTraining {
    CanonicalTraining {
        epoch: training
            .epoch
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        period: training.period.map(split),
        interval: training.interval.map(split),
        granularity: training.granularity.map(split),
    }
}

fn split(duration: Duration) -> (u64, u32) {
    (duration.as_secs(), duration.subsec_nanos())
}

fn canonical_group(group: &DataSourceGroup) -> CanonicalGroup<'_> {
    CanonicalGroup {
        from: &group.from,
        name: &group.name,
        fields: group.fields.iter().map(|f| f.name.as_str()).collect(),
        connector: group.connector.as_ref().map(canonical_connector),
    }
}

fn canonical_connector(connector: &ConnectorSpec) -> CanonicalConnector<'_> {
    CanonicalConnector {
        name: &connector.name,
        connection: connector.connection.as_deref(),
        params: pairs(&connector.params),
    }
}

fn canonical_models(models: &ModelsSpec) -> CanonicalModels<'_> {
    CanonicalModels {
        downloader: models
            .downloader
            .as_ref()
            .map(|d| (d.uses.as_str(), d.branch.as_deref())),
        keep: models.keep,
    }
}
