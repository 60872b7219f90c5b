//! Pending Item Tracker
//!
//! Run-scoped record of the resources of each type still believed to exist,
//! plus the ledger of quota freed by confirmed deletions. Pure in-memory
//! bookkeeping: never calls the provider.

use super::quota::{merge_quota, QuotaUsage};
use super::{CloudResource, ResourceType};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct PendingItemTracker {
    pending: HashMap<ResourceType, BTreeMap<String, CloudResource>>,
    removed_quota: Vec<QuotaUsage>,
}

impl PendingItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert discovered items. Returns the ones that were not pending yet.
    ///
    /// A duplicate key replaces the previous entry (last write wins).
    pub fn insert(
        &mut self,
        resource_type: ResourceType,
        items: impl IntoIterator<Item = CloudResource>,
    ) -> Vec<CloudResource> {
        let set = self.pending.entry(resource_type).or_default();
        let mut added = Vec::new();
        for item in items {
            if set.insert(item.key.clone(), item.clone()).is_none() {
                added.push(item);
            }
        }
        added
    }

    /// Fold newly discovered items into the pending set and return all members.
    pub fn reconcile(
        &mut self,
        resource_type: ResourceType,
        discovered: impl IntoIterator<Item = CloudResource>,
    ) -> Vec<CloudResource> {
        self.insert(resource_type, discovered);
        self.list(resource_type)
    }

    /// Evict a deleted item and credit its quota to the ledger.
    ///
    /// Removing an absent key is a no-op and returns false.
    pub fn remove(&mut self, resource_type: ResourceType, item: &CloudResource) -> bool {
        let removed = self
            .pending
            .get_mut(&resource_type)
            .and_then(|set| set.remove(&item.key));

        match removed {
            Some(existing) => {
                merge_quota(&mut self.removed_quota, &existing.quota);
                true
            }
            None => false,
        }
    }

    /// Stop tracking a whole type without crediting quota.
    ///
    /// Used when a step is skipped: its items are never confirmed deleted.
    pub fn abandon(&mut self, resource_type: ResourceType) -> usize {
        self.pending
            .remove(&resource_type)
            .map_or(0, |set| set.len())
    }

    pub fn list(&self, resource_type: ResourceType) -> Vec<CloudResource> {
        self.pending
            .get(&resource_type)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, resource_type: ResourceType, key: &str) -> bool {
        self.pending
            .get(&resource_type)
            .is_some_and(|set| set.contains_key(key))
    }

    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.pending.get(&resource_type).map_or(0, BTreeMap::len)
    }

    pub fn total(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    /// Non-zero pending counts, in a stable type order.
    pub fn summary(&self) -> Vec<(ResourceType, usize)> {
        ResourceType::ALL
            .iter()
            .map(|t| (*t, self.count(*t)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    pub fn freed_quota(&self) -> &[QuotaUsage] {
        &self.removed_quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::quota::Metric;

    fn firewall(name: &str) -> CloudResource {
        CloudResource::new(ResourceType::Firewall, name).with_quota(vec![QuotaUsage::new(
            Metric::new("compute.googleapis.com", "firewalls"),
            1,
        )])
    }

    #[test]
    fn test_reconcile_unions_with_existing() {
        let mut tracker = PendingItemTracker::new();
        tracker.insert(ResourceType::Firewall, [firewall("abc123-a")]);
        let members = tracker.reconcile(ResourceType::Firewall, [firewall("abc123-b")]);
        assert_eq!(members.len(), 2);
        assert_eq!(tracker.count(ResourceType::Firewall), 2);
    }

    #[test]
    fn test_insert_reports_only_new_items() {
        let mut tracker = PendingItemTracker::new();
        assert_eq!(tracker.insert(ResourceType::Firewall, [firewall("a")]).len(), 1);
        assert!(tracker.insert(ResourceType::Firewall, [firewall("a")]).is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut tracker = PendingItemTracker::new();
        let item = firewall("abc123-a");
        tracker.insert(ResourceType::Firewall, [item.clone()]);

        assert!(tracker.remove(ResourceType::Firewall, &item));
        assert!(!tracker.remove(ResourceType::Firewall, &item));

        assert_eq!(tracker.freed_quota().len(), 1);
        assert_eq!(tracker.freed_quota()[0].amount, 1);
        assert_eq!(tracker.total(), 0);
    }

    #[test]
    fn test_remove_absent_type_is_noop() {
        let mut tracker = PendingItemTracker::new();
        assert!(!tracker.remove(ResourceType::Network, &firewall("x")));
        assert!(tracker.freed_quota().is_empty());
    }

    #[test]
    fn test_summary_skips_empty_types() {
        let mut tracker = PendingItemTracker::new();
        tracker.insert(ResourceType::Firewall, [firewall("a"), firewall("b")]);
        tracker.insert(ResourceType::Network, Vec::new());
        assert_eq!(tracker.summary(), vec![(ResourceType::Firewall, 2)]);
    }

    #[test]
    fn test_abandon_credits_no_quota() {
        let mut tracker = PendingItemTracker::new();
        tracker.insert(ResourceType::Firewall, [firewall("a"), firewall("b")]);
        assert_eq!(tracker.abandon(ResourceType::Firewall), 2);
        assert_eq!(tracker.total(), 0);
        assert!(tracker.freed_quota().is_empty());
    }
}
