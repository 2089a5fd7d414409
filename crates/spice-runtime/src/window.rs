//! Temporal window resolution and timestamp bucketing.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use spice_manifest::PodManifest;
use tracing::warn;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(72 * 60 * 60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_GRANULARITY: Duration = Duration::from_secs(10);

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// The four scheduling parameters of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemporalWindow {
    pub epoch: DateTime<Utc>,
    #[serde(serialize_with = "human_duration")]
    pub period: Duration,
    #[serde(serialize_with = "human_duration")]
    pub interval: Duration,
    #[serde(serialize_with = "human_duration")]
    pub granularity: Duration,
}

impl TemporalWindow {
    /// Explicit manifest values win; the rest fall back to platform defaults.
    /// An unset epoch floats to `now - period`.
    pub fn resolve(manifest: &PodManifest, now: DateTime<Utc>) -> Self {
        let training = manifest.training.clone().unwrap_or_default();
        let period = training.period.unwrap_or(DEFAULT_PERIOD);
        let interval = training.interval.unwrap_or(DEFAULT_INTERVAL);
        let granularity = training.granularity.unwrap_or(DEFAULT_GRANULARITY);
        let epoch = training
            .epoch
            .unwrap_or_else(|| sub_duration(now, period));

        let window = Self {
            epoch,
            period,
            interval,
            granularity,
        };
        if !window.is_ordered() {
            warn!(
                pod = %manifest.name,
                period = %humantime::format_duration(period),
                interval = %humantime::format_duration(interval),
                granularity = %humantime::format_duration(granularity),
                "window expects granularity <= interval <= period; bucketing may degenerate"
            );
        }
        window
    }

    /// `granularity <= interval <= period`.
    pub fn is_ordered(&self) -> bool {
        self.granularity <= self.interval && self.interval <= self.period
    }

    /// `epoch + period`, saturating at the latest representable instant.
    pub fn end(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.period)
            .ok()
            .and_then(|delta| self.epoch.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Floor a timestamp to a multiple of `width` measured from the Unix epoch.
/// A zero width leaves the timestamp unchanged.
pub fn floor_to(ts: DateTime<Utc>, width: Duration) -> DateTime<Utc> {
    let width_ns = width.as_nanos() as i128;
    if width_ns == 0 {
        return ts;
    }
    let ts_ns = ts.timestamp() as i128 * NANOS_PER_SEC + ts.timestamp_subsec_nanos() as i128;
    let floored = ts_ns - ts_ns.rem_euclid(width_ns);
    let secs = floored.div_euclid(NANOS_PER_SEC);
    let nanos = floored.rem_euclid(NANOS_PER_SEC);
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, nanos as u32))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn sub_duration(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(period)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn human_duration<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&humantime::format_duration(*d).to_string())
}
