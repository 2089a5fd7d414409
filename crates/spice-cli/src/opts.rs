//! Global CLI options.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use spice_runtime::RuntimeConfig;

/// Options shared by every command; most can be set via env vars.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Runtime config file (env: SPICE_CONFIG)
    #[arg(short = 'c', long, global = true, env = "SPICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON output envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Suppress warnings in the output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Drop metadata in JSON output
    #[arg(long, global = true)]
    pub no_meta: bool,
}

impl GlobalOpts {
    /// Config file (if any) with `SPICE_*` environment overrides on top.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let base = match &self.config {
            Some(path) => RuntimeConfig::load(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => RuntimeConfig::default(),
        };
        base.with_env_overlay(|var| std::env::var(var).ok())
            .context("apply environment overrides")
    }
}
