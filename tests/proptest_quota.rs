//! Property-based tests using proptest
//!
//! These tests verify the quota ledger merge rule, tracker removal
//! idempotency, list filter validation and step ordering using randomized
//! inputs.

use gcp_teardown::destroy::graph::{topological_order, StepId, STEPS};
use gcp_teardown::driver::ListFilter;
use gcp_teardown::resource::quota::totals;
use gcp_teardown::resource::{
    merge_quota, CloudResource, Metric, PendingItemTracker, QuotaUsage, ResourceType,
};
use proptest::prelude::*;

/// Generate a metric from a small space so that collisions are frequent
fn arb_metric() -> impl Strategy<Value = Metric> {
    (
        prop::sample::select(vec!["compute.googleapis.com", "dns.googleapis.com"]),
        prop::sample::select(vec!["cpus", "firewalls", "networks"]),
        prop::option::of(prop::sample::select(vec!["us-east1", "us-west1"])),
        prop::option::of(prop::sample::select(vec!["us-east1-b", "us-west1-a"])),
    )
        .prop_map(|(service, limit, region, zone)| {
            let mut metric = Metric::new(service, limit);
            if let Some(region) = region {
                metric = metric.with_dimension("region", region);
            }
            if let Some(zone) = zone {
                metric = metric.with_dimension("zone", zone);
            }
            metric
        })
}

fn arb_usage() -> impl Strategy<Value = QuotaUsage> {
    (arb_metric(), 1i64..100).prop_map(|(metric, amount)| QuotaUsage::new(metric, amount))
}

fn arb_usages() -> impl Strategy<Value = Vec<QuotaUsage>> {
    prop::collection::vec(arb_usage(), 0..40)
}

/// Merge every chunk into one ledger, in order
fn merge_chunks(chunks: &[&[QuotaUsage]]) -> Vec<QuotaUsage> {
    let mut ledger = Vec::new();
    for chunk in chunks {
        merge_quota(&mut ledger, chunk);
    }
    ledger
}

proptest! {
    /// Partitioning the input differently never changes the totals
    #[test]
    fn merge_is_partition_independent(usages in arb_usages(), split in 0usize..40) {
        let split = split.min(usages.len());
        let (left, right) = usages.split_at(split);

        let all_at_once = merge_chunks(&[usages.as_slice()]);
        let in_two = merge_chunks(&[left, right]);
        let reversed = merge_chunks(&[right, left]);

        prop_assert_eq!(totals(&all_at_once), totals(&in_two));
        prop_assert_eq!(totals(&all_at_once), totals(&reversed));
    }

    /// Merging sub-ledgers first (associativity) gives the same totals
    #[test]
    fn merge_is_associative(a in arb_usages(), b in arb_usages(), c in arb_usages()) {
        let mut ab = merge_chunks(&[a.as_slice(), b.as_slice()]);
        merge_quota(&mut ab, &c);

        let bc = merge_chunks(&[b.as_slice(), c.as_slice()]);
        let mut a_bc = merge_chunks(&[a.as_slice()]);
        merge_quota(&mut a_bc, &bc);

        prop_assert_eq!(totals(&ab), totals(&a_bc));
    }

    /// A merged ledger holds each exact metric at most once
    #[test]
    fn merged_ledger_has_unique_metrics(usages in arb_usages()) {
        let ledger = merge_chunks(&[usages.as_slice()]);
        prop_assert_eq!(totals(&ledger).len(), ledger.len());
    }

    /// The total amount is conserved
    #[test]
    fn merge_conserves_amounts(usages in arb_usages()) {
        let ledger = merge_chunks(&[usages.as_slice()]);
        let before: i64 = usages.iter().map(|u| u.amount).sum();
        let after: i64 = ledger.iter().map(|u| u.amount).sum();
        prop_assert_eq!(before, after);
    }

    /// Removing the same items any number of times credits quota once
    #[test]
    fn tracker_remove_is_idempotent(
        names in prop::collection::btree_set("[a-z][a-z0-9-]{0,20}", 1..20),
        repeats in 1usize..4
    ) {
        let mut tracker = PendingItemTracker::new();
        let metric = Metric::new("compute.googleapis.com", "firewalls");
        let items: Vec<CloudResource> = names
            .iter()
            .map(|n| {
                CloudResource::new(ResourceType::Firewall, n.as_str())
                    .with_quota(vec![QuotaUsage::new(metric.clone(), 1)])
            })
            .collect();
        tracker.insert(ResourceType::Firewall, items.clone());

        for _ in 0..repeats {
            for item in &items {
                tracker.remove(ResourceType::Firewall, item);
            }
        }

        prop_assert_eq!(tracker.total(), 0);
        prop_assert_eq!(
            totals(tracker.freed_quota()).get(&metric).copied(),
            Some(names.len() as i64)
        );
    }
}

/// Tests for list filter validation
mod filter_validation_tests {
    use super::*;

    proptest! {
        /// Valid resource-name prefixes are accepted and match their own names
        #[test]
        fn valid_prefix_matches_names(
            prefix in "[a-z][a-z0-9-]{0,20}",
            suffix in "[a-z0-9-]{0,20}"
        ) {
            let filter = ListFilter::name_prefix(&prefix).unwrap();
            let name = format!("{prefix}{suffix}");
            prop_assert!(filter.matches(&CloudResource::new(ResourceType::Firewall, name)));
        }

        /// Anything that could escape the filter expression is rejected
        #[test]
        fn unsafe_prefix_is_rejected(prefix in "[a-z]{0,5}[\" A-Z*()]{1,3}[a-z]{0,5}") {
            prop_assert!(ListFilter::name_prefix(&prefix).is_err());
        }
    }
}

/// Tests for step ordering
mod step_order_tests {
    use super::*;

    proptest! {
        /// Any declaration order yields an order respecting every edge
        #[test]
        fn shuffled_graph_respects_edges(order in Just(STEPS.to_vec()).prop_shuffle()) {
            let sorted = topological_order(&order).unwrap();
            let position = |id: StepId| sorted.iter().position(|n| n.id == id).unwrap();

            for node in STEPS {
                for dep in node.after {
                    prop_assert!(position(*dep) < position(node.id));
                }
            }
        }
    }
}
