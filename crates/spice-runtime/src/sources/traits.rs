use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::observation::Observation;

/// A producer of observations for one data-source group.
///
/// Returned field names may be bare (`price`) or already qualified with the
/// group prefix (`coinbase.btcusd.price`); the registry qualifies bare names.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Observations strictly newer than `since`, or everything when `None`.
    async fn fetch_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>>;
}
