//! # Metadata Sources
//!
//! A [`MetadataSource`] produces a fresh [`ClusterSnapshot`] on every call:
//! the units of one namespace in listing order plus the hosts they run on.
//! Nothing is cached between calls and failed requests are not retried.

mod file;
mod kubernetes;

pub use file::FileSource;
pub use kubernetes::{KubernetesSource, SERVICE_ACCOUNT_DIR, host_from_node, units_from_pod_list};

use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;
use crate::types::ClusterSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies point-in-time cluster metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the current snapshot.
    ///
    /// Hosts that no longer exist are left out of the snapshot rather than
    /// reported as an error; the aggregator decides what a missing host means.
    async fn snapshot(&self) -> Result<ClusterSnapshot, SourceError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// A source serving a fixed in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    snapshot: ClusterSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl MetadataSource for StaticSource {
    async fn snapshot(&self) -> Result<ClusterSnapshot, SourceError> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        format!("static snapshot ({} units)", self.snapshot.units.len())
    }
}

/// Build the source selected by configuration.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn MetadataSource>, SourceError> {
    match config.kind {
        SourceKind::Kubernetes => Ok(Arc::new(KubernetesSource::in_cluster(config)?)),
        SourceKind::File => {
            let path = config.fixture.as_ref().ok_or_else(|| SourceError::Config {
                message: "the file source needs `source.fixture`".into(),
            })?;
            Ok(Arc::new(FileSource::new(path)))
        }
    }
}
