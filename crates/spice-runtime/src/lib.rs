//! Pod runtime: temporal windowing, field registry, expression tables, the
//! observation store, data-source fan-out, and the pod façade tying them
//! together.

pub mod config;
pub mod error;
pub mod expressions;
pub mod fields;
pub mod observation;
pub mod pod;
pub mod pod_set;
pub mod sources;
pub mod store;
pub mod window;

pub use config::{ConfigError, ConnectionSpec, PodSettings, ResolvedConnection, RuntimeConfig};
pub use error::{FailureReason, FetchError, InvalidFieldError, PodError, SourceFailure};
pub use expressions::{ExpressionTable, ExpressionTables};
pub use fields::FieldRegistry;
pub use observation::{Observation, ObservationRow, Origin, observations_from_json};
pub use pod::{FetchOutcome, Pod};
pub use pod_set::PodSet;
pub use sources::{
    ConnectorCatalog, ConnectorContext, ConnectorFactory, DataSource, DataSourceRegistry,
    DataSourceRegistryConfig, FetchReport, MemorySource,
};
pub use store::{IngestSummary, ObservationStore, SourceBatch};
pub use window::TemporalWindow;
