//! The pod façade: one manifest, its derived views, and its observation cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use spice_cbor::Hash;
use spice_manifest::{ModelsSpec, PodManifest, load_manifest_from_path, manifest_hash};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::{FetchError, PodError};
use crate::expressions::{ExpressionTable, ExpressionTables};
use crate::fields::FieldRegistry;
use crate::observation::{Observation, ObservationRow, Origin};
use crate::sources::{
    ConnectorCatalog, ConnectorContext, DataSource, DataSourceRegistry, DataSourceRegistryConfig,
};
use crate::store::{IngestSummary, ObservationStore};
use crate::window::TemporalWindow;

/// Result of one `fetch_new_data` call. Sources that succeeded are already
/// committed when `error` is set.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Newly committed observations, in source registration order.
    pub observations: Vec<Observation>,
    pub summary: IngestSummary,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Observation>, FetchError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.observations),
        }
    }
}

#[derive(Debug)]
pub struct Pod {
    manifest: Arc<PodManifest>,
    manifest_path: Option<PathBuf>,
    hash: Hash,
    window: TemporalWindow,
    fields: Arc<FieldRegistry>,
    expressions: ExpressionTables,
    store: ObservationStore,
    sources: DataSourceRegistry,
    /// Held from reading watermarks until the batch is committed, so
    /// overlapping fetches never pull the same range twice.
    fetch_lock: Mutex<()>,
}

impl Pod {
    /// Load a pod from a manifest file on disk.
    pub fn load(path: impl AsRef<Path>, now: DateTime<Utc>) -> Result<Self, PodError> {
        let path = path.as_ref();
        let manifest = load_manifest_from_path(path)?;
        Self::from_manifest(manifest, Some(path.to_path_buf()), now)
    }

    pub fn from_yaml(
        bytes: &[u8],
        manifest_path: Option<PathBuf>,
        now: DateTime<Utc>,
    ) -> Result<Self, PodError> {
        let manifest = PodManifest::from_yaml_slice(bytes)?;
        Self::from_manifest(manifest, manifest_path, now)
    }

    /// Derive every view of `manifest` once; only the store mutates afterwards.
    pub fn from_manifest(
        manifest: PodManifest,
        manifest_path: Option<PathBuf>,
        now: DateTime<Utc>,
    ) -> Result<Self, PodError> {
        let hash = manifest_hash(&manifest)?;
        let window = TemporalWindow::resolve(&manifest, now);
        let fields = Arc::new(FieldRegistry::from_manifest(&manifest));
        let expressions = ExpressionTables::from_manifest(&manifest);
        let store = ObservationStore::new(manifest.name.clone(), Arc::clone(&fields), window.granularity);

        info!(
            pod = %manifest.name,
            hash = %hash,
            fields = fields.len(),
            data_sources = manifest.data_sources.len(),
            "loaded pod"
        );

        Ok(Self {
            manifest: Arc::new(manifest),
            manifest_path,
            hash,
            window,
            fields,
            expressions,
            store,
            sources: DataSourceRegistry::new(DataSourceRegistryConfig::default()),
            fetch_lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn manifest(&self) -> &PodManifest {
        &self.manifest
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    pub fn window(&self) -> &TemporalWindow {
        &self.window
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.window.epoch
    }

    pub fn period(&self) -> Duration {
        self.window.period
    }

    pub fn interval(&self) -> Duration {
        self.window.interval
    }

    pub fn granularity(&self) -> Duration {
        self.window.granularity
    }

    /// Canonical field names in declaration order.
    pub fn field_names(&self) -> &[String] {
        self.fields.names()
    }

    pub fn rewards(&self) -> &ExpressionTable {
        &self.expressions.rewards
    }

    pub fn actions(&self) -> &ExpressionTable {
        &self.expressions.actions
    }

    pub fn expressions(&self) -> &ExpressionTables {
        &self.expressions
    }

    pub fn models(&self) -> Option<&ModelsSpec> {
        self.manifest.models.as_ref()
    }

    pub fn data_sources(&self) -> &DataSourceRegistry {
        &self.sources
    }

    /// Bind `source` to a declared data-source group, replacing any earlier binding.
    pub fn attach_source(
        &mut self,
        group: &str,
        source: Arc<dyn DataSource>,
    ) -> Result<(), PodError> {
        if self.manifest.data_source(group).is_none() {
            return Err(PodError::UnknownDataSource {
                pod: self.name().to_string(),
                group: group.to_string(),
            });
        }
        if self.sources.register(group, source).is_some() {
            debug!(pod = %self.name(), source = group, "replaced data source");
        }
        Ok(())
    }

    /// Build a source for every group that names a connector. Returns the
    /// number of groups bound.
    pub fn bind_connectors(
        &mut self,
        catalog: &ConnectorCatalog,
        config: &RuntimeConfig,
    ) -> Result<usize, PodError> {
        self.sources.set_config(DataSourceRegistryConfig {
            fetch_timeout: config.fetch_timeout,
        });

        let manifest = Arc::clone(&self.manifest);
        let manifest_dir = self.manifest_path.as_deref().and_then(Path::parent);
        let mut bound = 0;
        for group in &manifest.data_sources {
            let Some(connector) = &group.connector else {
                continue;
            };
            let prefix = group.prefix();
            let connector_error = |message: String| PodError::Connector {
                pod: manifest.name.clone(),
                group: prefix.clone(),
                message,
            };

            let connection = match &connector.connection {
                Some(key) => Some(
                    config
                        .resolve_connection(key, |var| std::env::var(var).ok())
                        .ok_or_else(|| connector_error(format!("unknown connection '{key}'")))?,
                ),
                None => None,
            };
            let ctx = ConnectorContext {
                pod: &manifest.name,
                group,
                connector,
                manifest_dir,
                connection,
            };
            let source = catalog
                .build(&ctx)
                .map_err(|err| connector_error(format!("{err:#}")))?;
            self.sources.register(prefix.clone(), source);
            debug!(pod = %manifest.name, source = %prefix, connector = %connector.name, "bound connector");
            bound += 1;
        }
        Ok(bound)
    }

    /// Fetch from every bound source and commit whatever arrived. Concurrent
    /// calls on one pod run one after another.
    pub async fn fetch_new_data(&self) -> FetchOutcome {
        self.fetch(None).await
    }

    /// Like [`Pod::fetch_new_data`], cancelling sources still in flight at `deadline`.
    pub async fn fetch_new_data_until(&self, deadline: Instant) -> FetchOutcome {
        self.fetch(Some(deadline)).await
    }

    async fn fetch(&self, deadline: Option<Instant>) -> FetchOutcome {
        if self.sources.is_empty() {
            debug!(pod = %self.name(), "no data sources bound");
            return FetchOutcome::default();
        }
        let guard = self.fetch_lock.lock().await;
        let report = self
            .sources
            .fetch_all(|group| self.store.watermark(group), deadline)
            .await;
        let summary = self.store.ingest_fetched(&report.batches);
        drop(guard);
        info!(
            pod = %self.name(),
            observations = summary.observations,
            buckets = summary.buckets_created,
            failed = report.failures.len(),
            "fetched new data"
        );

        let error = (!report.failures.is_empty()).then(|| FetchError {
            pod: self.name().to_string(),
            failures: report.failures,
        });
        FetchOutcome {
            observations: report
                .batches
                .into_iter()
                .flat_map(|batch| batch.observations)
                .collect(),
            summary,
            error,
        }
    }

    /// Validate and commit a local batch; nothing is written if any field is unknown.
    pub fn add_local_observations(
        &self,
        observations: &[Observation],
    ) -> Result<IngestSummary, PodError> {
        self.store
            .ingest(&Origin::Local, observations)
            .map_err(|err| {
                warn!(pod = %self.name(), field = %err.field, "rejected local observations");
                PodError::from(err)
            })
    }

    /// Every bucket in ascending timestamp order.
    pub fn cached_observations(&self) -> Vec<ObservationRow> {
        self.store.snapshot()
    }

    /// Build a fresh pod from the same manifest path. Sources are not carried
    /// over; the caller binds them again.
    pub fn reload(&self, now: DateTime<Utc>) -> Result<Pod, PodError> {
        let path = self.manifest_path.as_ref().ok_or_else(|| PodError::NoManifestPath {
            pod: self.name().to_string(),
        })?;
        let next = Pod::load(path, now)?;
        if next.hash == self.hash {
            debug!(pod = %self.name(), "manifest unchanged on reload");
        } else {
            info!(pod = %self.name(), old = %self.hash, new = %next.hash, "manifest changed");
        }
        Ok(next)
    }
}
