//! # Tripod Core
//!
//! Core library for Tripod, a cluster transparency reporter.
//! Turns raw per-pod annotations and per-node labels into normalized
//! transparency records (data categories, retention, location, necessity,
//! automated decision) and scores how complete those declarations are.

pub mod aggregate;
pub mod categories;
pub mod config;
pub mod error;
pub mod gateway;
pub mod region;
pub mod report;
pub mod score;
pub mod source;
pub mod types;

// Re-export commonly used types at the crate root.
pub use aggregate::{Aggregator, aggregate};
pub use config::{TripodConfig, load_config, read_config};
pub use error::{
    AggregationError, AggregationFailure, ConfigError, DecodeError, FailureKind, Result,
    SourceError, TripodError,
};
pub use region::{RegionTable, resolve as resolve_region};
pub use report::{TransparencyReport, build_report};
pub use score::{Score, score};
pub use source::{FileSource, KubernetesSource, MetadataSource, StaticSource};
pub use types::{
    ClusterSnapshot, DataCategories, DataCategory, HostDirectory, HostInfo, TransparencyRecord,
    UNSPECIFIED, WorkloadUnit,
};
