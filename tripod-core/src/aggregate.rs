//! Transparency aggregation.
//!
//! Joins every unit's annotations with the labels and annotations of the host
//! it runs on and emits one [`TransparencyRecord`] per unit, in input order.
//! A unit whose host is missing or whose categories cannot be decoded aborts
//! the whole pass: a partial report is never returned.

use crate::categories;
use crate::error::AggregationError;
use crate::region::RegionTable;
use crate::types::{
    AUTO_DECISION_KEY, DATA_CATEGORIES_KEY, DataCategories, HostDirectory, NECESSITY_KEY,
    TransparencyRecord, UNSPECIFIED, WorkloadUnit,
};
use tracing::{debug, warn};

/// Builds transparency records against a region table.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    regions: &'a RegionTable,
}

impl Default for Aggregator<'static> {
    fn default() -> Self {
        Self::new(RegionTable::builtin())
    }
}

impl<'a> Aggregator<'a> {
    pub fn new(regions: &'a RegionTable) -> Self {
        Self { regions }
    }

    /// Aggregate `units` in order, resolving hosts through `hosts`.
    pub fn aggregate<H>(
        &self,
        units: &[WorkloadUnit],
        hosts: &H,
    ) -> Result<Vec<TransparencyRecord>, AggregationError>
    where
        H: HostDirectory + ?Sized,
    {
        units
            .iter()
            .map(|unit| self.record_for(unit, hosts))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| {
                warn!(unit = %e.unit, kind = %e.kind(), "Aggregation aborted: {}", e);
            })
    }

    /// Build the record for a single unit.
    pub fn record_for<H>(
        &self,
        unit: &WorkloadUnit,
        hosts: &H,
    ) -> Result<TransparencyRecord, AggregationError>
    where
        H: HostDirectory + ?Sized,
    {
        let host = hosts
            .host(&unit.host)
            .ok_or_else(|| AggregationError::host_not_found(&unit.name, &unit.host))?;

        let necessity = annotation_or_unspecified(unit, NECESSITY_KEY);
        let auto_decision = annotation_or_unspecified(unit, AUTO_DECISION_KEY);
        let node_location = self.regions.resolve(host.region());

        let data_categories = match unit.annotations.get(DATA_CATEGORIES_KEY) {
            None => DataCategories::Unspecified,
            Some(raw) if raw == UNSPECIFIED => DataCategories::Unspecified,
            Some(raw) => categories::decode(raw)
                .map(DataCategories::Declared)
                .map_err(|e| AggregationError::category_decode_failed(&unit.name, e))?,
        };

        debug!(
            unit = %unit.name,
            host = %unit.host,
            region = host.region(),
            node_location = %node_location,
            "Aggregated unit"
        );

        Ok(TransparencyRecord {
            name: unit.name.clone(),
            data_categories,
            ttl: host.ttl().to_string(),
            node_location,
            necessity,
            auto_decision,
        })
    }
}

/// Only a missing key falls back to the sentinel; an empty value is kept.
fn annotation_or_unspecified(unit: &WorkloadUnit, key: &str) -> String {
    unit.annotations
        .get(key)
        .cloned()
        .unwrap_or_else(|| UNSPECIFIED.to_string())
}

/// Aggregate against the builtin region table.
pub fn aggregate<H>(
    units: &[WorkloadUnit],
    hosts: &H,
) -> Result<Vec<TransparencyRecord>, AggregationError>
where
    H: HostDirectory + ?Sized,
{
    Aggregator::default().aggregate(units, hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregationFailure, FailureKind};
    use crate::types::{DataCategory, HostInfo, REGION_LABEL, TTL_ANNOTATION};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn hosts() -> BTreeMap<String, HostInfo> {
        let mut hosts = BTreeMap::new();
        hosts.insert(
            "node-1".to_string(),
            HostInfo::default()
                .with_label(REGION_LABEL, "us-west1")
                .with_annotation(TTL_ANNOTATION, "30d"),
        );
        hosts.insert("node-2".to_string(), HostInfo::default());
        hosts
    }

    #[test]
    fn test_end_to_end_record() {
        let unit = WorkloadUnit::new("svc-a", "node-1")
            .with_annotation(DATA_CATEGORIES_KEY, r#"[{"name":"email"}]"#)
            .with_annotation(NECESSITY_KEY, "contract");

        let records = aggregate(&[unit], &hosts()).unwrap();
        assert_eq!(
            records,
            vec![TransparencyRecord {
                name: "svc-a".into(),
                data_categories: DataCategories::Declared(vec![DataCategory::named("email")]),
                ttl: "30d".into(),
                node_location: "US".into(),
                necessity: "contract".into(),
                auto_decision: UNSPECIFIED.into(),
            }]
        );
    }

    #[test]
    fn test_missing_annotations_default_to_sentinel() {
        let records = aggregate(&[WorkloadUnit::new("bare", "node-2")], &hosts()).unwrap();
        let rec = &records[0];
        assert!(rec.data_categories.is_unspecified());
        assert_eq!(rec.necessity, UNSPECIFIED);
        assert_eq!(rec.auto_decision, UNSPECIFIED);
        // No sentinel policy for host-derived fields.
        assert_eq!(rec.ttl, "");
        assert_eq!(rec.node_location, "");
    }

    #[test]
    fn test_empty_annotation_value_is_not_defaulted() {
        let unit = WorkloadUnit::new("svc", "node-1")
            .with_annotation(NECESSITY_KEY, "")
            .with_annotation(AUTO_DECISION_KEY, "");
        let rec = &aggregate(&[unit], &hosts()).unwrap()[0];
        assert_eq!(rec.necessity, "");
        assert_eq!(rec.auto_decision, "");
    }

    #[test]
    fn test_explicit_unspecified_categories_skip_decoding() {
        let unit =
            WorkloadUnit::new("svc", "node-1").with_annotation(DATA_CATEGORIES_KEY, "unspecified");
        let rec = &aggregate(&[unit], &hosts()).unwrap()[0];
        assert!(rec.data_categories.is_unspecified());
    }

    #[test]
    fn test_empty_category_list_is_declared() {
        let unit = WorkloadUnit::new("svc", "node-1").with_annotation(DATA_CATEGORIES_KEY, "[]");
        let rec = &aggregate(&[unit], &hosts()).unwrap()[0];
        assert_eq!(rec.data_categories, DataCategories::Declared(vec![]));
    }

    #[test]
    fn test_missing_host_aborts_batch() {
        let units = vec![
            WorkloadUnit::new("ok", "node-1"),
            WorkloadUnit::new("orphan", "node-404"),
            WorkloadUnit::new("later", "node-1"),
        ];
        let err = aggregate(&units, &hosts()).unwrap_err();
        assert_eq!(err.unit, "orphan");
        assert_eq!(err.kind(), FailureKind::HostNotFound);
        match err.reason {
            AggregationFailure::HostNotFound { host } => assert_eq!(host, "node-404"),
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn test_bad_categories_abort_batch() {
        let units = vec![
            WorkloadUnit::new("ok", "node-1"),
            WorkloadUnit::new("broken", "node-1")
                .with_annotation(DATA_CATEGORIES_KEY, "{not valid json"),
        ];
        let err = aggregate(&units, &hosts()).unwrap_err();
        assert_eq!(err.unit, "broken");
        match err.reason {
            AggregationFailure::CategoryDecodeFailed(cause) => {
                assert_eq!(cause.raw, "{not valid json")
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let units: Vec<_> = ["c", "a", "b"]
            .iter()
            .map(|name| WorkloadUnit::new(*name, "node-1"))
            .collect();
        let names: Vec<_> = aggregate(&units, &hosts())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_custom_region_table() {
        let table = RegionTable::builtin().with_overrides([("us-west1", "ZZ")]);
        let records = Aggregator::new(&table)
            .aggregate(&[WorkloadUnit::new("svc", "node-1")], &hosts())
            .unwrap();
        assert_eq!(records[0].node_location, "ZZ");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], &hosts()).unwrap().is_empty());
    }
}
