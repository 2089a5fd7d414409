//! `spice pod` commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::json;
use spice_cbor::Hash;
use spice_manifest::load_manifest_from_path;
use spice_runtime::{ConnectorCatalog, Pod, observations_from_json};
use tracing::info;

use crate::opts::GlobalOpts;
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Pod manifest (YAML)
    pub manifest: PathBuf,

    /// Resolve a floating epoch against this instant instead of the wall clock
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct HashArgs {
    /// Pod manifest (YAML)
    pub manifest: PathBuf,

    /// Fail unless the hash equals this 64-character hex digest
    #[arg(long)]
    pub expect: Option<String>,
}

#[derive(Args, Debug)]
pub struct ObserveArgs {
    /// Pod manifest (YAML)
    pub manifest: PathBuf,

    /// JSON array of local observations to add
    #[arg(long)]
    pub local: Option<PathBuf>,

    /// Fetch from the pod's connectors before adding local observations
    #[arg(long)]
    pub fetch: bool,

    /// Overall fetch deadline in milliseconds
    #[arg(long, requires = "fetch")]
    pub timeout_ms: Option<u64>,
}

pub fn cmd_inspect(opts: &GlobalOpts, args: &InspectArgs) -> Result<()> {
    let now = args.now.unwrap_or_else(Utc::now);
    let pod = Pod::load(&args.manifest, now)
        .with_context(|| format!("load pod {}", args.manifest.display()))?;

    let mut warnings = Vec::new();
    if !pod.window().is_ordered() {
        warnings.push("window expects granularity <= interval <= period".to_string());
    }
    let data = json!({
        "name": pod.name(),
        "hash": pod.hash().to_hex(),
        "window": pod.window(),
        "end": pod.window().end(),
        "fields": pod.field_names(),
        "rewards": pod.rewards(),
        "actions": pod.actions(),
        "models": pod.models(),
    });
    let meta = json!({
        "manifest": args.manifest,
        "now": now,
    });
    print_success(opts, data, Some(meta), warnings)
}

pub fn cmd_hash(opts: &GlobalOpts, args: &HashArgs) -> Result<()> {
    let manifest = load_manifest_from_path(&args.manifest)
        .with_context(|| format!("load manifest {}", args.manifest.display()))?;
    let hash = spice_manifest::manifest_hash(&manifest).context("hash manifest")?;

    if let Some(expect) = &args.expect {
        let expected = Hash::from_hex_str(expect).context("parse --expect")?;
        if expected != hash {
            bail!("hash mismatch for pod {}: expected {expected}, got {hash}", manifest.name);
        }
    }
    print_success(opts, json!(hash.to_hex()), None, vec![])
}

pub async fn cmd_observe(opts: &GlobalOpts, args: &ObserveArgs) -> Result<()> {
    let config = opts.runtime_config()?;
    let mut pod = Pod::load(&args.manifest, Utc::now())
        .with_context(|| format!("load pod {}", args.manifest.display()))?;
    let bound = pod.bind_connectors(&ConnectorCatalog::with_builtins(), &config)?;

    let mut warnings = Vec::new();
    let mut fetched = 0;
    if args.fetch {
        if bound == 0 {
            warnings.push(format!("pod {} has no connectors to fetch from", pod.name()));
        }
        let outcome = match args.timeout_ms {
            Some(ms) => {
                let deadline = tokio::time::Instant::now() + Duration::from_millis(ms);
                pod.fetch_new_data_until(deadline).await
            }
            None => pod.fetch_new_data().await,
        };
        fetched = outcome.observations.len();
        if let Some(err) = outcome.error {
            warnings.extend(err.failures.iter().map(ToString::to_string));
        }
    }

    let mut added = 0;
    if let Some(path) = &args.local {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let observations = observations_from_json(&bytes)
            .with_context(|| format!("decode observations in {}", path.display()))?;
        added = pod.add_local_observations(&observations)?.observations;
    }
    info!(pod = %pod.name(), fetched, added, "observe complete");

    let rows = pod.cached_observations();
    let buckets = rows.len();
    let data = json!({
        "pod": pod.name(),
        "hash": pod.hash().to_hex(),
        "observations": rows,
    });
    let meta = json!({
        "fetched": fetched,
        "added": added,
        "buckets": buckets,
    });
    print_success(opts, data, Some(meta), warnings)
}
