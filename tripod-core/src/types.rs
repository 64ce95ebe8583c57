//! Fundamental types for Tripod: raw cluster metadata in, transparency records out.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Sentinel meaning "declared absent". Distinct from an empty string.
pub const UNSPECIFIED: &str = "unspecified";

/// Unit annotation holding the JSON-encoded list of data categories.
pub const DATA_CATEGORIES_KEY: &str = "dataCategories";
/// Unit annotation holding the necessity / legal ground declaration.
pub const NECESSITY_KEY: &str = "necessity";
/// Unit annotation recording whether the unit was admitted automatically.
pub const AUTO_DECISION_KEY: &str = "autoDecision";
/// Host label carrying the cloud-provider region.
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";
/// Host annotation carrying the retention period.
pub const TTL_ANNOTATION: &str = "node.alpha.kubernetes.io/ttl";

/// A running unit of work (a pod), as listed by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadUnit {
    pub name: String,
    /// Name of the host the unit is scheduled on.
    pub host: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl WorkloadUnit {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            annotations: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Labels and annotations of a host (a node).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl HostInfo {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// The region label, or `""` when the host carries none.
    pub fn region(&self) -> &str {
        self.labels.get(REGION_LABEL).map(String::as_str).unwrap_or("")
    }

    /// The ttl annotation verbatim, or `""` when absent.
    pub fn ttl(&self) -> &str {
        self.annotations
            .get(TTL_ANNOTATION)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Resolves a host name to its metadata.
pub trait HostDirectory {
    fn host(&self, name: &str) -> Option<&HostInfo>;
}

impl HostDirectory for BTreeMap<String, HostInfo> {
    fn host(&self, name: &str) -> Option<&HostInfo> {
        self.get(name)
    }
}

impl HostDirectory for HashMap<String, HostInfo> {
    fn host(&self, name: &str) -> Option<&HostInfo> {
        self.get(name)
    }
}

/// A point-in-time view of the cluster: units in listing order plus their hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub units: Vec<WorkloadUnit>,
    #[serde(default)]
    pub hosts: BTreeMap<String, HostInfo>,
}

impl HostDirectory for ClusterSnapshot {
    fn host(&self, name: &str) -> Option<&HostInfo> {
        self.hosts.get(name)
    }
}

/// A declared category of personal data processed by a unit.
///
/// Optional fields are `None` when not declared; they are never defaulted
/// to [`UNSPECIFIED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCategory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl DataCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: None,
            legal_basis: None,
            storage: None,
            recipient: None,
        }
    }
}

/// Data categories of a record: either the sentinel or a declared list.
///
/// On the wire this is a single field holding the string `"unspecified"`
/// or an array of category objects. An empty declared list stays a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataCategories {
    Unspecified,
    Declared(Vec<DataCategory>),
}

impl DataCategories {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, DataCategories::Unspecified)
    }

    /// The declared list, if any.
    pub fn declared(&self) -> Option<&[DataCategory]> {
        match self {
            DataCategories::Unspecified => None,
            DataCategories::Declared(list) => Some(list),
        }
    }
}

impl Serialize for DataCategories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataCategories::Unspecified => serializer.serialize_str(UNSPECIFIED),
            DataCategories::Declared(list) => list.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DataCategories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Tag(String),
            List(Vec<DataCategory>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Tag(tag) if tag == UNSPECIFIED => Ok(DataCategories::Unspecified),
            Repr::Tag(other) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&other),
                &"\"unspecified\" or an array of data categories",
            )),
            Repr::List(list) => Ok(DataCategories::Declared(list)),
        }
    }
}

/// Normalized transparency information for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransparencyRecord {
    pub name: String,
    pub data_categories: DataCategories,
    /// Retention period copied verbatim from the host, possibly empty.
    pub ttl: String,
    /// Two-letter country code of the host region, or empty.
    pub node_location: String,
    pub necessity: String,
    pub auto_decision: String,
}

impl TransparencyRecord {
    /// The sentinel-eligible fields, each paired with whether it holds the sentinel.
    ///
    /// `ttl` and `nodeLocation` have no sentinel policy and are not listed.
    pub fn sentinel_fields(&self) -> [(&'static str, bool); 3] {
        [
            (DATA_CATEGORIES_KEY, self.data_categories.is_unspecified()),
            (NECESSITY_KEY, self.necessity == UNSPECIFIED),
            (AUTO_DECISION_KEY, self.auto_decision == UNSPECIFIED),
        ]
    }

    /// Names of the fields currently holding the sentinel.
    pub fn unspecified_fields(&self) -> Vec<&'static str> {
        self.sentinel_fields()
            .into_iter()
            .filter_map(|(field, sentinel)| sentinel.then_some(field))
            .collect()
    }
}
