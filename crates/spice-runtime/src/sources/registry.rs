use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};

use super::traits::DataSource;
use crate::error::{FailureReason, SourceFailure};
use crate::observation::Observation;
use crate::store::SourceBatch;

#[derive(Debug, Clone)]
pub struct DataSourceRegistryConfig {
    /// Deadline applied to each source independently.
    pub fetch_timeout: Duration,
}

impl Default for DataSourceRegistryConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Fan-in of one concurrent fetch, in registration order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub batches: Vec<SourceBatch>,
    pub failures: Vec<SourceFailure>,
}

/// Data sources keyed by the group prefix they serve.
pub struct DataSourceRegistry {
    sources: IndexMap<String, Arc<dyn DataSource>>,
    config: DataSourceRegistryConfig,
}

impl std::fmt::Debug for DataSourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceRegistry")
            .field("groups", &self.sources.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl DataSourceRegistry {
    pub fn new(config: DataSourceRegistryConfig) -> Self {
        Self {
            sources: IndexMap::new(),
            config,
        }
    }

    /// Register `source` for `group`, returning any source it replaced.
    pub fn register(
        &mut self,
        group: impl Into<String>,
        source: Arc<dyn DataSource>,
    ) -> Option<Arc<dyn DataSource>> {
        self.sources.insert(group.into(), source)
    }

    pub fn get(&self, group: &str) -> Option<&dyn DataSource> {
        self.sources.get(group).map(|s| s.as_ref())
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn config(&self) -> &DataSourceRegistryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DataSourceRegistryConfig) {
        self.config = config;
    }

    /// Fetch from every source concurrently. Each fetch runs under its own
    /// timeout; `deadline`, when set, cancels whatever is still in flight.
    pub async fn fetch_all<F>(&self, since: F, deadline: Option<Instant>) -> FetchReport
    where
        F: Fn(&str) -> Option<DateTime<Utc>>,
    {
        let per_source = self.config.fetch_timeout;
        let fetches = self.sources.iter().map(|(group, source)| {
            let since = since(group);
            let source = Arc::clone(source);
            let group = group.clone();
            async move {
                let outcome = fetch_one(source.as_ref(), since, per_source, deadline).await;
                (group, outcome)
            }
        });

        let mut report = FetchReport::default();
        for (group, outcome) in join_all(fetches).await {
            match outcome {
                Ok(observations) => {
                    debug!(source = %group, observations = observations.len(), "fetched");
                    let observations = observations
                        .into_iter()
                        .map(|o| o.qualified(&group))
                        .collect();
                    report.batches.push(SourceBatch {
                        source: group,
                        observations,
                    });
                }
                Err(reason) => {
                    warn!(source = %group, %reason, "data source fetch failed");
                    report.failures.push(SourceFailure {
                        source: group,
                        reason,
                    });
                }
            }
        }
        report
    }
}

async fn fetch_one(
    source: &dyn DataSource,
    since: Option<DateTime<Utc>>,
    per_source: Duration,
    deadline: Option<Instant>,
) -> Result<Vec<Observation>, FailureReason> {
    let bounded = async {
        match timeout(per_source, source.fetch_since(since)).await {
            Ok(Ok(observations)) => Ok(observations),
            Ok(Err(err)) => Err(FailureReason::Failed(err)),
            Err(_) => Err(FailureReason::TimedOut(per_source)),
        }
    };
    match deadline {
        Some(deadline) => timeout_at(deadline, bounded)
            .await
            .unwrap_or(Err(FailureReason::Cancelled)),
        None => bounded.await,
    }
}
