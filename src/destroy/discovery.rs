//! Dependent-resource discovery
//!
//! Steps whose ownership cannot be read off a name prefix:
//!
//! - load balancers created by the in-cluster cloud controller, owned by
//!   structural reference to confirmed instances and instance groups, and
//!   the resources conventionally named after them
//! - the private DNS zone, whose records are mirrored into a public parent
//! - the project IAM policy, which keeps bindings for deleted accounts

use super::dns::{
    deletable_records, records_shared_with_child, select_parent_zone, DnsZone, Visibility,
};
use super::graph::StepId;
use super::iam::scrub_policy;
use super::reconciler::Reconciler;
use super::report::StepReport;
use crate::driver::{DnsRecordApi, ListFilter};
use crate::error::{ProviderError, TeardownError};
use crate::resource::{CloudResource, ResourceType};
use std::sync::Arc;
use tracing::{debug, info};

/// Resources the cloud controller names after a load-balancer anchor.
fn load_balancer_dependents(anchor: &str) -> Vec<(ResourceType, String)> {
    vec![
        (ResourceType::Address, anchor.to_string()),
        (ResourceType::Firewall, anchor.to_string()),
        (ResourceType::Firewall, format!("{anchor}-hc")),
        (ResourceType::Firewall, format!("{anchor}-http-hc")),
        (ResourceType::Firewall, format!("k8s-fw-{anchor}")),
        (ResourceType::ForwardingRule, anchor.to_string()),
        (ResourceType::HealthCheck, anchor.to_string()),
        (ResourceType::HttpHealthCheck, anchor.to_string()),
        (ResourceType::BackendService, anchor.to_string()),
    ]
}

impl Reconciler {
    /// Look up one resource by exact name and track it if it exists.
    async fn track_named(
        &mut self,
        resource_type: ResourceType,
        name: &str,
        report: &mut StepReport,
    ) -> Result<(), TeardownError> {
        let filter = ListFilter::name_equals(name)?;
        if let Some(found) = self.list_resources(resource_type, &filter, report).await? {
            self.track(resource_type, found);
        }
        Ok(())
    }

    /// Track everything conventionally associated with a load-balancer
    /// anchor so it is removed by its own step.
    pub(super) async fn discover_load_balancer_resources(
        &mut self,
        anchor: &str,
        report: &mut StepReport,
    ) -> Result<(), TeardownError> {
        for (resource_type, name) in load_balancer_dependents(anchor) {
            self.track_named(resource_type, &name, report).await?;
        }
        Ok(())
    }

    /// List every resource of a type and keep those referencing only
    /// confirmed-owned resources.
    async fn indirectly_owned(
        &mut self,
        resource_type: ResourceType,
        report: &mut StepReport,
    ) -> Result<Vec<CloudResource>, TeardownError> {
        let candidates = self
            .list_resources(resource_type, &ListFilter::All, report)
            .await?
            .unwrap_or_default();

        Ok(candidates
            .into_iter()
            .filter(|candidate| self.ownership.is_indirectly_owned(candidate))
            .collect())
    }

    /// Discover dependents of every anchor, then attempt the anchors.
    async fn destroy_anchors(
        &mut self,
        resource_type: ResourceType,
        anchors: Vec<CloudResource>,
        report: &mut StepReport,
    ) -> Result<(), TeardownError> {
        self.track(resource_type, anchors.clone());

        for anchor in &anchors {
            self.discover_load_balancer_resources(&anchor.name, report)
                .await?;
        }

        self.delete_items(resource_type, anchors.clone(), report)
            .await?;
        report.pending = anchors
            .iter()
            .filter(|a| self.tracker.contains(resource_type, &a.key))
            .count();
        Ok(())
    }

    /// Internal load balancers: backend services whose backends are all
    /// cluster instance groups.
    pub(super) async fn run_internal_lb_step(&mut self) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(StepId::InternalLoadBalancers);

        let group = self.ownership.controller_instance_group();
        self.track_named(ResourceType::InstanceGroup, &group, &mut report)
            .await?;

        let anchors = self
            .indirectly_owned(ResourceType::BackendService, &mut report)
            .await?;
        if !anchors.is_empty() {
            debug!("{} internal load balancer(s) owned by the cluster", anchors.len());
        }

        self.destroy_anchors(ResourceType::BackendService, anchors, &mut report)
            .await?;
        Ok(report)
    }

    /// External load balancers: target pools whose members are all cluster
    /// instances.
    pub(super) async fn run_external_lb_step(&mut self) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(StepId::ExternalLoadBalancers);

        let anchors = self
            .indirectly_owned(ResourceType::TargetPool, &mut report)
            .await?;

        if !anchors.is_empty() {
            debug!("{} external load balancer(s) owned by the cluster", anchors.len());

            // node health check shared by every external load balancer
            let health_check = self.ownership.controller_node_health_check();
            self.track_named(ResourceType::HttpHealthCheck, &health_check, &mut report)
                .await?;
            for suffix in ["hc", "http-hc"] {
                let firewall = format!("{health_check}-{suffix}");
                self.track_named(ResourceType::Firewall, &firewall, &mut report)
                    .await?;
            }
        }

        self.destroy_anchors(ResourceType::TargetPool, anchors, &mut report)
            .await?;
        Ok(report)
    }

    /// Private DNS zones: remove mirrored records from the public parent,
    /// empty the zone, then delete it.
    pub(super) async fn run_dns_step(&mut self) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(StepId::Dns);
        let filter = self.ownership.direct_filter()?;

        let listed = self
            .list_resources(ResourceType::DnsZone, &filter, &mut report)
            .await?
            .unwrap_or_default();
        let zones = self.track(ResourceType::DnsZone, listed);
        if zones.is_empty() {
            return Ok(report);
        }

        let dns = self.drivers.dns().clone();
        let public_zones = match self.call(dns.list_zones(Visibility::Public)).await {
            Ok(public_zones) => public_zones,
            Err(err) => {
                self.record_failure(&mut report, "listing public DNS zones".into(), err)?;
                report.pending = zones.len();
                return Ok(report);
            }
        };

        for zone in zones {
            if self.cancel.is_cancelled() {
                return Err(TeardownError::Cancelled);
            }

            let Some(domain) = zone.domain.clone() else {
                self.delete_items(ResourceType::DnsZone, vec![zone], &mut report)
                    .await?;
                continue;
            };
            let private = DnsZone::new(&zone.name, &domain, Visibility::Private);

            let purged = self.purge_zone(&dns, &private, &public_zones).await;
            match purged {
                Ok(()) => {
                    self.delete_items(ResourceType::DnsZone, vec![zone], &mut report)
                        .await?
                }
                Err(err) => {
                    self.record_failure(&mut report, format!("DNS zone {}", zone.name), err)?
                }
            }
        }

        report.pending = self.tracker.count(ResourceType::DnsZone);
        Ok(report)
    }

    /// Delete the zone's copies from its parent, then its own records.
    async fn purge_zone(
        &self,
        dns: &Arc<dyn DnsRecordApi>,
        zone: &DnsZone,
        public_zones: &[DnsZone],
    ) -> Result<(), ProviderError> {
        let child_records = match self.call(dns.list_records(zone)).await {
            Ok(records) => records,
            // zone already gone
            Err(ProviderError::NotFound) => return Ok(()),
            Err(err) => return Err(err),
        };

        match select_parent_zone(&zone.domain, public_zones) {
            Some(parent) => {
                let parent_records = self.call(dns.list_records(parent)).await?;
                for record in records_shared_with_child(&parent_records, &child_records) {
                    self.call(dns.delete_record(parent, record)).await?;
                    info!(
                        "Deleted record set {} {} from zone {}",
                        record.record_type, record.name, parent.name
                    );
                }
            }
            None => debug!("No public parent zone for {}", zone.domain),
        }

        for record in deletable_records(zone, &child_records) {
            self.call(dns.delete_record(zone, record)).await?;
            info!(
                "Deleted record set {} {} from zone {}",
                record.record_type, record.name, zone.name
            );
        }

        Ok(())
    }

    /// Remove bindings of every service account owned by the cluster.
    pub(super) async fn run_policy_step(&mut self) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(StepId::PolicyBindings);
        if self.owned_service_accounts.is_empty() {
            return Ok(report);
        }

        let policy_api = self.drivers.policy().clone();
        let mut policy = match self.call(policy_api.get_policy()).await {
            Ok(policy) => policy,
            Err(err) => {
                self.record_failure(&mut report, "reading project IAM policy".into(), err)?;
                return Ok(report);
            }
        };

        let removed = scrub_policy(&mut policy, &self.owned_service_accounts);
        if removed.is_empty() {
            return Ok(report);
        }

        match self.call(policy_api.set_policy(&policy)).await {
            Ok(()) => {
                for member in &removed {
                    info!("Removed {} from {}", member.member, member.role);
                }
                report.deleted += removed.len();
            }
            Err(err) => {
                self.record_failure(&mut report, "updating project IAM policy".into(), err)?
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balancer_dependents() {
        let names: Vec<String> = load_balancer_dependents("a1b2")
            .into_iter()
            .filter(|(t, _)| *t == ResourceType::Firewall)
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["a1b2", "a1b2-hc", "a1b2-http-hc", "k8s-fw-a1b2"]);
    }
}
