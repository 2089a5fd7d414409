//! Shared helpers for the runtime integration tests.
//!
//! Each test binary compiles this module on its own, so not every helper is
//! used everywhere.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use spice_runtime::{DataSource, MemorySource, Observation, Pod};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn manifest_path(name: &str) -> PathBuf {
    fixtures_dir().join("manifests").join(format!("{name}.yaml"))
}

pub fn data_path(name: &str) -> PathBuf {
    fixtures_dir().join("data").join(name)
}

/// A fixed "now" so floating epochs are reproducible.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn load_pod(name: &str) -> Pod {
    Pod::load(manifest_path(name), now()).unwrap_or_else(|err| panic!("load {name}: {err}"))
}

pub fn local_input() -> Vec<Observation> {
    let bytes = std::fs::read(data_path("trader_input.json")).unwrap();
    spice_runtime::observations_from_json(&bytes).unwrap()
}

/// Returns the same observations on every call and records the `since` it was asked for.
pub struct StaticSource {
    name: String,
    observations: Vec<Observation>,
    pub requests: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl StaticSource {
    pub fn new(name: &str, observations: Vec<Observation>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            observations,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Option<DateTime<Utc>>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>> {
        self.requests.lock().unwrap().push(since);
        Ok(self.observations.clone())
    }
}

pub struct FailingSource(pub &'static str);

#[async_trait]
impl DataSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch_since(&self, _since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>> {
        anyhow::bail!("{}", self.0)
    }
}

/// Sleeps before answering; use with paused tokio time.
pub struct SlowSource {
    pub delay: Duration,
    pub observations: Vec<Observation>,
}

#[async_trait]
impl DataSource for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }

    async fn fetch_since(&self, _since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.observations.clone())
    }
}

/// A [`MemorySource`] that honours `since` but takes `delay` to answer.
pub struct DelayedSource {
    pub delay: Duration,
    pub inner: MemorySource,
}

#[async_trait]
impl DataSource for DelayedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<Vec<Observation>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_since(since).await
    }
}
