//! Data-source contract, concurrent fetch registry, and connector catalog.

pub mod catalog;
pub mod memory;
pub mod registry;
pub mod traits;

pub use catalog::{ConnectorCatalog, ConnectorContext, ConnectorFactory};
pub use memory::MemorySource;
pub use registry::{DataSourceRegistry, DataSourceRegistryConfig, FetchReport};
pub use traits::DataSource;
