//! Cloud region to country resolution.
//!
//! Maps the `topology.kubernetes.io/region` label of a host to the ISO 3166-1
//! alpha-2 code of the country the region is located in. The builtin table is
//! plain data; deployments can extend or override it through the
//! `[regions.overrides]` configuration section without touching aggregation code.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Builtin `(region id, country code)` pairs for GCP, AWS and Azure.
const BUILTIN_REGIONS: &[(&str, &str)] = &[
    // Google Cloud
    ("africa-south1", "ZA"),
    ("asia-east1", "TW"),
    ("asia-east2", "HK"),
    ("asia-northeast1", "JP"),
    ("asia-northeast2", "JP"),
    ("asia-northeast3", "KR"),
    ("asia-south1", "IN"),
    ("asia-south2", "IN"),
    ("asia-southeast1", "SG"),
    ("asia-southeast2", "ID"),
    ("australia-southeast1", "AU"),
    ("australia-southeast2", "AU"),
    ("europe-central2", "PL"),
    ("europe-north1", "FI"),
    ("europe-north2", "SE"),
    ("europe-southwest1", "ES"),
    ("europe-west1", "BE"),
    ("europe-west2", "GB"),
    ("europe-west3", "DE"),
    ("europe-west4", "NL"),
    ("europe-west6", "CH"),
    ("europe-west8", "IT"),
    ("europe-west9", "FR"),
    ("europe-west10", "DE"),
    ("europe-west12", "IT"),
    ("me-central1", "QA"),
    ("me-central2", "SA"),
    ("me-west1", "IL"),
    ("northamerica-northeast1", "CA"),
    ("northamerica-northeast2", "CA"),
    ("northamerica-south1", "MX"),
    ("southamerica-east1", "BR"),
    ("southamerica-west1", "CL"),
    ("us-central1", "US"),
    ("us-east1", "US"),
    ("us-east4", "US"),
    ("us-east5", "US"),
    ("us-south1", "US"),
    ("us-west1", "US"),
    ("us-west2", "US"),
    ("us-west3", "US"),
    ("us-west4", "US"),
    // Amazon Web Services
    ("af-south-1", "ZA"),
    ("ap-east-1", "HK"),
    ("ap-northeast-1", "JP"),
    ("ap-northeast-2", "KR"),
    ("ap-northeast-3", "JP"),
    ("ap-south-1", "IN"),
    ("ap-south-2", "IN"),
    ("ap-southeast-1", "SG"),
    ("ap-southeast-2", "AU"),
    ("ap-southeast-3", "ID"),
    ("ap-southeast-4", "AU"),
    ("ap-southeast-5", "MY"),
    ("ca-central-1", "CA"),
    ("ca-west-1", "CA"),
    ("eu-central-1", "DE"),
    ("eu-central-2", "CH"),
    ("eu-north-1", "SE"),
    ("eu-south-1", "IT"),
    ("eu-south-2", "ES"),
    ("eu-west-1", "IE"),
    ("eu-west-2", "GB"),
    ("eu-west-3", "FR"),
    ("il-central-1", "IL"),
    ("me-central-1", "AE"),
    ("me-south-1", "BH"),
    ("mx-central-1", "MX"),
    ("sa-east-1", "BR"),
    ("us-east-1", "US"),
    ("us-east-2", "US"),
    ("us-west-1", "US"),
    ("us-west-2", "US"),
    // Microsoft Azure
    ("australiaeast", "AU"),
    ("australiasoutheast", "AU"),
    ("brazilsouth", "BR"),
    ("canadacentral", "CA"),
    ("canadaeast", "CA"),
    ("centralindia", "IN"),
    ("centralus", "US"),
    ("eastasia", "HK"),
    ("eastus", "US"),
    ("eastus2", "US"),
    ("francecentral", "FR"),
    ("germanywestcentral", "DE"),
    ("israelcentral", "IL"),
    ("italynorth", "IT"),
    ("japaneast", "JP"),
    ("japanwest", "JP"),
    ("koreacentral", "KR"),
    ("northcentralus", "US"),
    ("northeurope", "IE"),
    ("norwayeast", "NO"),
    ("polandcentral", "PL"),
    ("qatarcentral", "QA"),
    ("southafricanorth", "ZA"),
    ("southcentralus", "US"),
    ("southeastasia", "SG"),
    ("southindia", "IN"),
    ("spaincentral", "ES"),
    ("swedencentral", "SE"),
    ("switzerlandnorth", "CH"),
    ("uaenorth", "AE"),
    ("uksouth", "GB"),
    ("ukwest", "GB"),
    ("westcentralus", "US"),
    ("westeurope", "NL"),
    ("westindia", "IN"),
    ("westus", "US"),
    ("westus2", "US"),
    ("westus3", "US"),
];

static BUILTIN: LazyLock<RegionTable> = LazyLock::new(|| RegionTable {
    entries: BUILTIN_REGIONS
        .iter()
        .map(|(region, country)| (region.to_string(), country.to_string()))
        .collect(),
});

/// Immutable mapping from region id to country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    entries: BTreeMap<String, String>,
}

impl RegionTable {
    /// The process-wide builtin table, initialised on first use.
    pub fn builtin() -> &'static RegionTable {
        &BUILTIN
    }

    /// A copy of this table with `overrides` added or replacing existing entries.
    pub fn with_overrides<I, K, V>(&self, overrides: I) -> RegionTable
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = self.entries.clone();
        entries.extend(
            overrides
                .into_iter()
                .map(|(region, country)| (region.into(), country.into())),
        );
        RegionTable { entries }
    }

    /// Country code for `region_id`, or `""` when the region is unknown.
    pub fn resolve(&self, region_id: &str) -> String {
        self.entries.get(region_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in region id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(region, country)| (region.as_str(), country.as_str()))
    }
}

/// Resolve a region id against the builtin table.
pub fn resolve(region_id: &str) -> String {
    RegionTable::builtin().resolve(region_id)
}
