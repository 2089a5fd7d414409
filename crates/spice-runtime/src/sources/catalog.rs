//! Connector factories that turn a manifest's data-source group into a
//! live [`DataSource`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use spice_manifest::{ConnectorSpec, DataSourceGroup};

use super::memory::MemorySource;
use super::traits::DataSource;
use crate::config::ResolvedConnection;

/// Name of the built-in connector that replays a JSON observation file.
pub const REPLAY_CONNECTOR: &str = "replay";

/// Everything a factory may need to build a source for one group.
#[derive(Debug)]
pub struct ConnectorContext<'a> {
    pub pod: &'a str,
    pub group: &'a DataSourceGroup,
    pub connector: &'a ConnectorSpec,
    /// Directory of the manifest, for resolving relative params.
    pub manifest_dir: Option<&'a Path>,
    pub connection: Option<ResolvedConnection>,
}

impl ConnectorContext<'_> {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.connector.params.get(key).map(String::as_str)
    }

    /// Resolve a path parameter relative to the manifest directory.
    pub fn path_param(&self, key: &str) -> Option<PathBuf> {
        let raw = Path::new(self.param(key)?);
        Some(match self.manifest_dir {
            Some(dir) if raw.is_relative() => dir.join(raw),
            _ => raw.to_path_buf(),
        })
    }
}

pub type ConnectorFactory =
    Box<dyn Fn(&ConnectorContext<'_>) -> anyhow::Result<Arc<dyn DataSource>> + Send + Sync>;

/// Connector name to factory.
pub struct ConnectorCatalog {
    factories: BTreeMap<String, ConnectorFactory>,
}

impl Default for ConnectorCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ConnectorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorCatalog")
            .field("connectors", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConnectorCatalog {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        catalog.register(REPLAY_CONNECTOR, Box::new(replay_connector));
        catalog
    }

    pub fn register(&mut self, name: impl Into<String>, factory: ConnectorFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, ctx: &ConnectorContext<'_>) -> anyhow::Result<Arc<dyn DataSource>> {
        let factory = self
            .factories
            .get(&ctx.connector.name)
            .ok_or_else(|| anyhow!("unknown connector '{}'", ctx.connector.name))?;
        factory(ctx)
    }
}

fn replay_connector(ctx: &ConnectorContext<'_>) -> anyhow::Result<Arc<dyn DataSource>> {
    let Some(path) = ctx.path_param("path") else {
        bail!("connector '{REPLAY_CONNECTOR}' requires a 'path' param");
    };
    let source = MemorySource::from_json_file(ctx.group.prefix(), &path)
        .with_context(|| format!("replay connector for {}", ctx.group.prefix()))?;
    Ok(Arc::new(source))
}
