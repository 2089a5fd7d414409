use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

pub type Name = String;
pub type Expression = String;

/// Namespace under which root-declared fields are registered.
pub const LOCAL_NAMESPACE: &str = "local";

/// A pod manifest as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PodManifest {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<DataSourceGroup>,
    /// Root-declared fields, registered as `local.<name>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rewards: IndexMap<Name, Expression>,
    /// A missing body deserializes to the empty (no-op) expression.
    #[serde(
        default,
        deserialize_with = "nullable_expressions",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub actions: IndexMap<Name, Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsSpec>,
}

impl PodManifest {
    /// Fields declared at the root, qualified with the `local.` namespace.
    pub fn local_field_names(&self) -> impl Iterator<Item = String> + '_ {
        self.fields
            .iter()
            .map(|field| format!("{LOCAL_NAMESPACE}.{}", field.name))
    }

    pub fn data_source(&self, prefix: &str) -> Option<&DataSourceGroup> {
        self.data_sources.iter().find(|group| group.prefix() == prefix)
    }
}

/// Explicit windowing values. Any subset may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingSpec {
    #[serde(
        default,
        with = "epoch_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub epoch: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub period: Option<Duration>,
    #[serde(
        default,
        with = "duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,
    #[serde(
        default,
        with = "duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub granularity: Option<Duration>,
}

/// A group of fields produced by one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceGroup {
    pub from: Name,
    pub name: Name,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<ConnectorSpec>,
}

impl DataSourceGroup {
    /// Namespace prefix for this group's fields, e.g. `coinbase.btcusd`.
    pub fn prefix(&self) -> String {
        format!("{}.{}", self.from, self.name)
    }

    pub fn qualified_field_names(&self) -> impl Iterator<Item = String> + '_ {
        let prefix = self.prefix();
        self.fields
            .iter()
            .map(move |field| format!("{prefix}.{}", field.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: Name,
}

/// Binds a data-source group to a connector implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorSpec {
    pub name: Name,
    /// Key into the runtime configuration's connection table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Name>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloader: Option<DownloaderSpec>,
    /// Number of trained artifacts to retain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloaderSpec {
    pub uses: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

fn nullable_expressions<'de, D>(deserializer: D) -> Result<IndexMap<Name, Expression>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<Name, Option<Expression>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, body)| (name, body.unwrap_or_default()))
        .collect())
}

pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub(crate) mod epoch_serde {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawEpoch {
        Unix(i64),
        Text(String),
    }

    pub fn serialize<S>(epoch: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match epoch {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<RawEpoch> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(RawEpoch::Unix(secs)) => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("epoch {secs} is out of range"))),
            Some(RawEpoch::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(|err| serde::de::Error::custom(format!("invalid epoch '{text}': {err}"))),
        }
    }
}
