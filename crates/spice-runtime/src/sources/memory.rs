use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::traits::DataSource;
use crate::observation::{Observation, observations_from_json};

/// A data source that replays a fixed set of observations.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    observations: Vec<Observation>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self {
            name: name.into(),
            observations,
        }
    }

    /// Load a JSON array of observations from disk.
    pub fn from_json_file(name: impl Into<String>, path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read observations from {}", path.display()))?;
        let observations = observations_from_json(&bytes)
            .with_context(|| format!("decode observations in {}", path.display()))?;
        Ok(Self::new(name, observations))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>> {
        let start = match since {
            Some(mark) => self.observations.partition_point(|o| o.timestamp <= mark),
            None => 0,
        };
        Ok(self.observations[start..].to_vec())
    }
}
