//! One aggregation and scoring pass over a cluster snapshot.

use crate::aggregate::Aggregator;
use crate::error::AggregationError;
use crate::region::RegionTable;
use crate::score::{Score, score};
use crate::types::{ClusterSnapshot, TransparencyRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Records of a snapshot together with their completeness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransparencyReport {
    pub records: Vec<TransparencyRecord>,
    pub score: Score,
    pub generated_at: DateTime<Utc>,
}

/// Aggregate and score `snapshot`.
pub fn build_report(
    snapshot: &ClusterSnapshot,
    regions: &RegionTable,
) -> Result<TransparencyReport, AggregationError> {
    let records = Aggregator::new(regions).aggregate(&snapshot.units, snapshot)?;
    let score = score(&records);

    info!(
        pods = score.num_pods,
        incomplete = score.incomplete_pods_count,
        "Built transparency report"
    );

    Ok(TransparencyReport {
        records,
        score,
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::types::{
        DATA_CATEGORIES_KEY, HostInfo, NECESSITY_KEY, REGION_LABEL, TTL_ANNOTATION, WorkloadUnit,
    };
    use pretty_assertions::assert_eq;

    fn snapshot() -> ClusterSnapshot {
        let mut snapshot = ClusterSnapshot::default();
        snapshot.units.push(
            WorkloadUnit::new("svc-a", "node-1")
                .with_annotation(DATA_CATEGORIES_KEY, r#"[{"name":"email"}]"#)
                .with_annotation(NECESSITY_KEY, "contract"),
        );
        snapshot.hosts.insert(
            "node-1".into(),
            HostInfo::default()
                .with_label(REGION_LABEL, "us-west1")
                .with_annotation(TTL_ANNOTATION, "30d"),
        );
        snapshot
    }

    #[test]
    fn test_build_report_scores_records() {
        let report = build_report(&snapshot(), RegionTable::builtin()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].node_location, "US");
        assert_eq!(
            report.score,
            Score {
                num_pods: 1,
                incomplete_pods_count: 1,
                incomplete_pods: vec!["svc-a".into()],
            }
        );
    }

    #[test]
    fn test_build_report_propagates_failure() {
        let mut snapshot = snapshot();
        snapshot.hosts.clear();
        let err = build_report(&snapshot, RegionTable::builtin()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::HostNotFound);
    }

    #[test]
    fn test_report_wire_names() {
        let report = build_report(&snapshot(), RegionTable::builtin()).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("generatedAt").is_some());
        assert_eq!(value["score"]["numPods"], 1);
        assert_eq!(value["records"][0]["ttl"], "30d");
    }
}
