//! Snapshot files on disk.

use super::MetadataSource;
use crate::error::SourceError;
use crate::types::ClusterSnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a [`ClusterSnapshot`] from a JSON or YAML file on every call.
///
/// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        )
    }

    /// Parse snapshot text in the format implied by the file extension.
    pub fn parse(&self, content: &str) -> Result<ClusterSnapshot, SourceError> {
        let parse_error = |message: String| SourceError::Parse {
            what: self.path.display().to_string(),
            message,
        };
        if self.is_yaml() {
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))
        } else {
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))
        }
    }
}

#[async_trait]
impl MetadataSource for FileSource {
    async fn snapshot(&self) -> Result<ClusterSnapshot, SourceError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SourceError::Io {
                    path: self.path.clone(),
                    source,
                })?;
        let snapshot = self.parse(&content)?;
        debug!(
            path = %self.path.display(),
            units = snapshot.units.len(),
            hosts = snapshot.hosts.len(),
            "Loaded snapshot file"
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }
}
