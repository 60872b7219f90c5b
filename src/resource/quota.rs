//! Quota metrics and the freed-quota ledger

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A provider quota metric.
///
/// Two metrics are equal iff service, limit and the complete dimension
/// mapping match. `BTreeMap` equality compares both directions, so a
/// partial dimension overlap never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Metric {
    pub service: String,
    pub limit: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
}

impl Metric {
    pub fn new(service: &str, limit: &str) -> Self {
        Self {
            service: service.to_string(),
            limit: limit.to_string(),
            dimensions: BTreeMap::new(),
        }
    }

    pub fn with_dimension(mut self, label: &str, value: &str) -> Self {
        self.dimensions.insert(label.to_string(), value.to_string());
        self
    }
}

/// An amount of one metric consumed by a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub metric: Metric,
    pub amount: i64,
}

impl QuotaUsage {
    pub fn new(metric: Metric, amount: i64) -> Self {
        Self { metric, amount }
    }
}

/// Merge `update` into `current`.
///
/// Each update entry is added to the first entry with an exactly-equal
/// metric, or appended unchanged. Totals do not depend on merge order.
pub fn merge_quota(current: &mut Vec<QuotaUsage>, update: &[QuotaUsage]) {
    for usage in update {
        match current.iter_mut().find(|c| c.metric == usage.metric) {
            Some(existing) => existing.amount += usage.amount,
            None => current.push(usage.clone()),
        }
    }
}

/// Collapse a ledger into metric -> total, for order-insensitive comparison.
pub fn totals(ledger: &[QuotaUsage]) -> BTreeMap<Metric, i64> {
    let mut out = BTreeMap::new();
    for usage in ledger {
        *out.entry(usage.metric.clone()).or_insert(0) += usage.amount;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpus(region: Option<&str>) -> Metric {
        let metric = Metric::new("compute.googleapis.com", "cpus");
        match region {
            Some(r) => metric.with_dimension("region", r),
            None => metric,
        }
    }

    #[test]
    fn test_merge_adds_equal_metrics_in_place() {
        let mut ledger = vec![QuotaUsage::new(cpus(Some("us-east1")), 4)];
        merge_quota(&mut ledger, &[QuotaUsage::new(cpus(Some("us-east1")), 2)]);
        assert_eq!(ledger, vec![QuotaUsage::new(cpus(Some("us-east1")), 6)]);
    }

    #[test]
    fn test_merge_keeps_different_dimension_values_apart() {
        let mut ledger = vec![QuotaUsage::new(cpus(Some("us-east1")), 4)];
        merge_quota(&mut ledger, &[QuotaUsage::new(cpus(Some("us-west1")), 2)]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_merge_keeps_presence_and_absence_of_dimensions_apart() {
        let mut ledger = vec![QuotaUsage::new(cpus(None), 1)];
        merge_quota(&mut ledger, &[QuotaUsage::new(cpus(Some("us-east1")), 1)]);
        assert_eq!(ledger.len(), 2);

        // superset of dimensions is not a match either
        let wider = cpus(Some("us-east1")).with_dimension("zone", "us-east1-b");
        merge_quota(&mut ledger, &[QuotaUsage::new(wider, 1)]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_merge_into_empty_appends() {
        let mut ledger = Vec::new();
        merge_quota(&mut ledger, &[QuotaUsage::new(cpus(None), 3)]);
        assert_eq!(totals(&ledger).get(&cpus(None)), Some(&3));
    }
}
