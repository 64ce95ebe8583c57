//! Completeness scoring.
//!
//! A record is incomplete when any of its sentinel-eligible fields
//! (`dataCategories`, `necessity`, `autoDecision`) holds `"unspecified"`.

use crate::types::TransparencyRecord;
use serde::{Deserialize, Serialize};

/// Completeness summary over one set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub num_pods: usize,
    pub incomplete_pods_count: usize,
    /// Names of incomplete records, in record order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete_pods: Vec<String>,
}

impl Score {
    /// Fraction of complete records, `1.0` for an empty set.
    pub fn completeness_ratio(&self) -> f64 {
        if self.num_pods == 0 {
            return 1.0;
        }
        (self.num_pods - self.incomplete_pods_count) as f64 / self.num_pods as f64
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete_pods_count == 0
    }
}

impl TransparencyRecord {
    /// Whether any sentinel-eligible field holds the sentinel.
    pub fn is_incomplete(&self) -> bool {
        self.sentinel_fields()
            .iter()
            .any(|(_, sentinel)| *sentinel)
    }
}

/// Score a sequence of records.
pub fn score(records: &[TransparencyRecord]) -> Score {
    let incomplete_pods: Vec<String> = records
        .iter()
        .filter(|record| record.is_incomplete())
        .map(|record| record.name.clone())
        .collect();

    Score {
        num_pods: records.len(),
        incomplete_pods_count: incomplete_pods.len(),
        incomplete_pods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataCategories, DataCategory, UNSPECIFIED};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn complete(name: &str) -> TransparencyRecord {
        TransparencyRecord {
            name: name.into(),
            data_categories: DataCategories::Declared(vec![DataCategory::named("email")]),
            ttl: String::new(),
            node_location: String::new(),
            necessity: "contract".into(),
            auto_decision: "false".into(),
        }
    }

    #[test]
    fn test_all_complete() {
        let s = score(&[complete("a"), complete("b")]);
        assert_eq!(
            s,
            Score {
                num_pods: 2,
                incomplete_pods_count: 0,
                incomplete_pods: vec![],
            }
        );
        assert!(s.is_complete());
        assert_eq!(s.completeness_ratio(), 1.0);
    }

    #[test]
    fn test_each_sentinel_field_counts() {
        let mut categories = complete("categories");
        categories.data_categories = DataCategories::Unspecified;
        let mut necessity = complete("necessity");
        necessity.necessity = UNSPECIFIED.into();
        let mut auto = complete("auto");
        auto.auto_decision = UNSPECIFIED.into();

        let s = score(&[categories, complete("ok"), necessity, auto]);
        assert_eq!(s.num_pods, 4);
        assert_eq!(s.incomplete_pods_count, 3);
        assert_eq!(s.incomplete_pods, vec!["categories", "necessity", "auto"]);
        assert_eq!(s.completeness_ratio(), 0.25);
    }

    #[test]
    fn test_multiple_sentinels_count_once() {
        let mut rec = complete("twice");
        rec.data_categories = DataCategories::Unspecified;
        rec.necessity = UNSPECIFIED.into();
        rec.auto_decision = UNSPECIFIED.into();
        let s = score(&[rec]);
        assert_eq!(s.incomplete_pods_count, 1);
        assert_eq!(s.incomplete_pods, vec!["twice"]);
    }

    #[test]
    fn test_empty_location_and_ttl_are_not_flagged() {
        let rec = complete("hostless-metadata");
        assert!(rec.ttl.is_empty() && rec.node_location.is_empty());
        assert!(!rec.is_incomplete());
    }

    #[test]
    fn test_empty_declared_list_is_complete() {
        let mut rec = complete("none");
        rec.data_categories = DataCategories::Declared(vec![]);
        assert!(!rec.is_incomplete());
    }

    #[test]
    fn test_empty_input() {
        let s = score(&[]);
        assert_eq!(s, Score::default());
        assert_eq!(s.completeness_ratio(), 1.0);
    }

    #[test]
    fn test_incomplete_pods_omitted_when_empty() {
        let value = serde_json::to_value(score(&[complete("a")])).unwrap();
        assert_eq!(value, json!({ "numPods": 1, "incompletePodsCount": 0 }));

        let mut rec = complete("b");
        rec.necessity = UNSPECIFIED.into();
        let value = serde_json::to_value(score(&[rec])).unwrap();
        assert_eq!(
            value,
            json!({ "numPods": 1, "incompletePodsCount": 1, "incompletePods": ["b"] })
        );
    }

    #[test]
    fn test_score_is_idempotent() {
        let mut rec = complete("b");
        rec.auto_decision = UNSPECIFIED.into();
        let records = vec![complete("a"), rec];
        assert_eq!(score(&records), score(&records));
    }
}
