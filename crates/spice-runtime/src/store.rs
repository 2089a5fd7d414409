//! Time-bucketed observation cache.
//!
//! Writers are serialized through one `RwLock`; a local batch is validated in
//! full before the write lock is taken, so a rejected batch never touches the
//! rows. Readers always see fully merged buckets.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::InvalidFieldError;
use crate::fields::FieldRegistry;
use crate::observation::{Observation, ObservationRow, Origin};
use crate::window::floor_to;

/// Observations returned by one data source, keyed by its group prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub source: String,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub observations: usize,
    pub values: usize,
    pub buckets_created: usize,
}

impl IngestSummary {
    fn merge(&mut self, other: IngestSummary) {
        self.observations += other.observations;
        self.values += other.values;
        self.buckets_created += other.buckets_created;
    }
}

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<DateTime<Utc>, IndexMap<String, f64>>,
    /// Latest committed observation timestamp per data source.
    watermarks: HashMap<String, DateTime<Utc>>,
}

impl StoreState {
    fn apply(&mut self, observations: &[Observation], granularity: Duration) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for observation in observations {
            let bucket = floor_to(observation.timestamp, granularity);
            let row = self.rows.entry(bucket).or_insert_with(|| {
                summary.buckets_created += 1;
                IndexMap::new()
            });
            for (field, value) in &observation.values {
                row.insert(field.clone(), *value);
                summary.values += 1;
            }
            summary.observations += 1;
        }
        summary
    }

    fn advance_watermark(&mut self, source: &str, observations: &[Observation]) {
        let Some(latest) = observations.iter().map(|o| o.timestamp).max() else {
            return;
        };
        self.watermarks
            .entry(source.to_string())
            .and_modify(|mark| *mark = (*mark).max(latest))
            .or_insert(latest);
    }
}

#[derive(Debug)]
pub struct ObservationStore {
    pod: String,
    fields: Arc<FieldRegistry>,
    granularity: Duration,
    state: RwLock<StoreState>,
}

impl ObservationStore {
    pub fn new(pod: impl Into<String>, fields: Arc<FieldRegistry>, granularity: Duration) -> Self {
        Self {
            pod: pod.into(),
            fields,
            granularity,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    /// Reject the batch at its first field missing from the registry.
    pub fn validate(&self, observations: &[Observation]) -> Result<(), InvalidFieldError> {
        let unknown = observations
            .iter()
            .flat_map(|o| o.values.keys())
            .find(|field| !self.fields.contains(field));
        match unknown {
            Some(field) => Err(InvalidFieldError {
                field: field.clone(),
                pod: self.pod.clone(),
                valid_fields: self.fields.names().to_vec(),
            }),
            None => Ok(()),
        }
    }

    /// Merge a batch into its buckets. Local batches are validated first and
    /// commit all-or-nothing; fetched batches are written without validation.
    pub fn ingest(
        &self,
        origin: &Origin,
        observations: &[Observation],
    ) -> Result<IngestSummary, InvalidFieldError> {
        if *origin == Origin::Local {
            self.validate(observations)?;
        }
        let mut state = self.write();
        let summary = state.apply(observations, self.granularity);
        if let Origin::Fetched(source) = origin {
            state.advance_watermark(source, observations);
        }
        debug!(
            pod = %self.pod,
            origin = ?origin,
            observations = summary.observations,
            buckets_created = summary.buckets_created,
            "ingested observations"
        );
        Ok(summary)
    }

    /// Commit the fan-in of one fetch under a single write lock, in batch order.
    pub fn ingest_fetched(&self, batches: &[SourceBatch]) -> IngestSummary {
        let mut total = IngestSummary::default();
        let mut state = self.write();
        for batch in batches {
            total.merge(state.apply(&batch.observations, self.granularity));
            state.advance_watermark(&batch.source, &batch.observations);
        }
        debug!(
            pod = %self.pod,
            sources = batches.len(),
            observations = total.observations,
            buckets_created = total.buckets_created,
            "committed fetched observations"
        );
        total
    }

    /// All buckets in ascending timestamp order.
    pub fn snapshot(&self) -> Vec<ObservationRow> {
        self.read()
            .rows
            .iter()
            .map(|(timestamp, values)| ObservationRow {
                timestamp: *timestamp,
                values: values.clone(),
            })
            .collect()
    }

    pub fn watermark(&self, source: &str) -> Option<DateTime<Utc>> {
        self.read().watermarks.get(source).copied()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().rows.is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spice_manifest::PodManifest;

    const MANIFEST: &str = r#"
name: trader
training:
  granularity: 10s
data_sources:
  - from: coinbase
    name: btcusd
    fields:
      - name: price
fields:
  - name: portfolio.btc_balance
  - name: portfolio.usd_balance
"#;

    fn store() -> ObservationStore {
        let manifest = PodManifest::from_yaml_str(MANIFEST).unwrap();
        let fields = Arc::new(FieldRegistry::from_manifest(&manifest));
        ObservationStore::new("trader", fields, Duration::from_secs(10))
    }

    fn at(secs: i64) -> Observation {
        Observation::new(DateTime::from_timestamp(secs, 0).unwrap())
    }

    #[test]
    fn local_observations_merge_into_buckets() {
        let store = store();
        let summary = store
            .ingest(
                &Origin::Local,
                &[
                    at(1_000).with_value("coinbase.btcusd.price", 10.0),
                    at(1_004).with_value("local.portfolio.usd_balance", 50.0),
                    at(1_012).with_value("coinbase.btcusd.price", 11.0),
                ],
            )
            .unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                observations: 3,
                values: 3,
                buckets_created: 2
            }
        );

        let rows = store.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp.timestamp(), 1_000);
        assert_eq!(rows[0].values["coinbase.btcusd.price"], 10.0);
        assert_eq!(rows[0].values["local.portfolio.usd_balance"], 50.0);
        assert_eq!(rows[1].timestamp.timestamp(), 1_010);
        assert_eq!(rows[1].values.len(), 1);
    }

    #[test]
    fn later_writes_overwrite_only_touched_fields() {
        let store = store();
        store
            .ingest(
                &Origin::Local,
                &[at(1_000)
                    .with_value("coinbase.btcusd.price", 10.0)
                    .with_value("local.portfolio.btc_balance", 1.0)],
            )
            .unwrap();
        store
            .ingest(
                &Origin::Local,
                &[
                    at(1_003).with_value("coinbase.btcusd.price", 12.0),
                    at(1_009).with_value("coinbase.btcusd.price", 13.0),
                ],
            )
            .unwrap();
        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values["coinbase.btcusd.price"], 13.0);
        assert_eq!(rows[0].values["local.portfolio.btc_balance"], 1.0);
    }

    #[test]
    fn rejected_local_batch_leaves_store_unchanged() {
        let store = store();
        store
            .ingest(&Origin::Local, &[at(1_000).with_value("coinbase.btcusd.price", 10.0)])
            .unwrap();
        let before = store.snapshot();

        let err = store
            .ingest(
                &Origin::Local,
                &[
                    at(1_000).with_value("coinbase.btcusd.price", 99.0),
                    at(2_000).with_value("coinbase.btcusd.volume", 5.0),
                ],
            )
            .unwrap_err();
        assert_eq!(err.field, "coinbase.btcusd.volume");
        assert_eq!(
            err.valid_fields,
            [
                "coinbase.btcusd.price",
                "local.portfolio.btc_balance",
                "local.portfolio.usd_balance"
            ]
        );
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn fetched_batches_skip_validation_and_advance_watermarks() {
        let store = store();
        assert!(store.is_empty());
        let summary = store.ingest_fetched(&[
            SourceBatch {
                source: "coinbase.btcusd".into(),
                observations: vec![
                    at(1_020).with_value("coinbase.btcusd.volume", 3.0),
                    at(1_000).with_value("coinbase.btcusd.price", 10.0),
                ],
            },
            SourceBatch {
                source: "gym.CartPole-v1".into(),
                observations: vec![],
            },
        ]);
        assert_eq!(summary.observations, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.watermark("coinbase.btcusd").map(|ts| ts.timestamp()),
            Some(1_020)
        );
        assert_eq!(store.watermark("gym.CartPole-v1"), None);

        store
            .ingest(
                &Origin::Fetched("coinbase.btcusd".into()),
                &[at(1_010).with_value("coinbase.btcusd.price", 11.0)],
            )
            .unwrap();
        assert_eq!(
            store.watermark("coinbase.btcusd").map(|ts| ts.timestamp()),
            Some(1_020)
        );
    }

    #[test]
    fn snapshots_are_idempotent_and_ordered() {
        let store = store();
        store
            .ingest(
                &Origin::Local,
                &[
                    at(1_050).with_value("coinbase.btcusd.price", 3.0),
                    at(1_010).with_value("coinbase.btcusd.price", 1.0),
                    at(1_030).with_value("coinbase.btcusd.price", 2.0),
                ],
            )
            .unwrap();
        let first = store.snapshot();
        assert_eq!(first, store.snapshot());
        let stamps: Vec<_> = first.iter().map(|row| row.timestamp.timestamp()).collect();
        assert_eq!(stamps, [1_010, 1_030, 1_050]);
    }

    #[test]
    fn concurrent_writers_serialize() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let secs = 1_000 + (worker * 50 + i) * 10;
                        store
                            .ingest(
                                &Origin::Local,
                                &[at(secs).with_value("coinbase.btcusd.price", secs as f64)],
                            )
                            .unwrap();
                        assert!(store.snapshot().iter().all(|row| !row.values.is_empty()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
