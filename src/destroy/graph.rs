//! Destroy step graph
//!
//! Each step declares only the steps it must run after. The execution order
//! is computed with Kahn's algorithm; among ready steps the one declared
//! first wins, so the order is deterministic.

use crate::error::TeardownError;
use crate::resource::ResourceType;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Instances,
    InstanceGroups,
    Disks,
    ServiceAccounts,
    PolicyBindings,
    Images,
    Dns,
    Buckets,
    Routes,
    Firewalls,
    Addresses,
    TargetPools,
    ForwardingRules,
    BackendServices,
    HealthChecks,
    HttpHealthChecks,
    InternalLoadBalancers,
    ExternalLoadBalancers,
    Routers,
    Subnetworks,
    Networks,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::InstanceGroups => "instance-groups",
            Self::Disks => "disks",
            Self::ServiceAccounts => "service-accounts",
            Self::PolicyBindings => "policy-bindings",
            Self::Images => "images",
            Self::Dns => "dns",
            Self::Buckets => "buckets",
            Self::Routes => "routes",
            Self::Firewalls => "firewalls",
            Self::Addresses => "addresses",
            Self::TargetPools => "target-pools",
            Self::ForwardingRules => "forwarding-rules",
            Self::BackendServices => "backend-services",
            Self::HealthChecks => "health-checks",
            Self::HttpHealthChecks => "http-health-checks",
            Self::InternalLoadBalancers => "internal-load-balancers",
            Self::ExternalLoadBalancers => "external-load-balancers",
            Self::Routers => "routers",
            Self::Subnetworks => "subnetworks",
            Self::Networks => "networks",
        }
    }

    /// Resource type whose pending set the step reports on.
    ///
    /// Load-balancer steps report on their anchors; the policy step has
    /// no resource type of its own.
    pub fn resource_type(&self) -> Option<ResourceType> {
        let resource_type = match self {
            Self::Instances => ResourceType::Instance,
            Self::InstanceGroups => ResourceType::InstanceGroup,
            Self::Disks => ResourceType::Disk,
            Self::ServiceAccounts => ResourceType::ServiceAccount,
            Self::PolicyBindings => return None,
            Self::Images => ResourceType::Image,
            Self::Dns => ResourceType::DnsZone,
            Self::Buckets => ResourceType::Bucket,
            Self::Routes => ResourceType::Route,
            Self::Firewalls => ResourceType::Firewall,
            Self::Addresses => ResourceType::Address,
            Self::TargetPools | Self::ExternalLoadBalancers => ResourceType::TargetPool,
            Self::ForwardingRules => ResourceType::ForwardingRule,
            Self::BackendServices | Self::InternalLoadBalancers => ResourceType::BackendService,
            Self::HealthChecks => ResourceType::HealthCheck,
            Self::HttpHealthChecks => ResourceType::HttpHealthCheck,
            Self::Routers => ResourceType::Router,
            Self::Subnetworks => ResourceType::Subnetwork,
            Self::Networks => ResourceType::Network,
        };
        Some(resource_type)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepNode {
    pub id: StepId,
    /// Steps that must complete earlier in every pass.
    pub after: &'static [StepId],
    /// Permission denied skips the step for the rest of the run.
    pub optional: bool,
}

const fn step(id: StepId, after: &'static [StepId]) -> StepNode {
    StepNode {
        id,
        after,
        optional: false,
    }
}

const fn optional(id: StepId, after: &'static [StepId]) -> StepNode {
    StepNode {
        id,
        after,
        optional: true,
    }
}

use StepId::*;

/// Every destroy step with its declared dependencies.
pub const STEPS: &[StepNode] = &[
    step(Instances, &[]),
    step(InstanceGroups, &[Instances]),
    step(Disks, &[Instances]),
    optional(ServiceAccounts, &[]),
    optional(PolicyBindings, &[ServiceAccounts]),
    step(Images, &[]),
    optional(Dns, &[]),
    optional(Buckets, &[]),
    step(Routes, &[Instances]),
    step(Firewalls, &[]),
    step(Addresses, &[]),
    step(TargetPools, &[Instances]),
    step(ForwardingRules, &[]),
    step(BackendServices, &[ForwardingRules, InstanceGroups]),
    step(HealthChecks, &[BackendServices]),
    step(HttpHealthChecks, &[TargetPools]),
    step(InternalLoadBalancers, &[InstanceGroups]),
    step(ExternalLoadBalancers, &[Instances]),
    step(Routers, &[]),
    step(
        Subnetworks,
        &[Instances, Routers, ForwardingRules, Addresses, InternalLoadBalancers],
    ),
    step(Networks, &[Subnetworks, Routes, Firewalls]),
];

/// Order `nodes` so every step follows the steps it declares in `after`.
///
/// Dependencies on steps absent from `nodes` are ignored, so a subset of
/// [`STEPS`] is a valid graph.
pub fn topological_order(nodes: &[StepNode]) -> Result<Vec<StepNode>, TeardownError> {
    let declared: HashSet<StepId> = nodes.iter().map(|n| n.id).collect();
    let mut placed: HashSet<StepId> = HashSet::new();
    let mut order = Vec::with_capacity(nodes.len());

    while order.len() < nodes.len() {
        let ready = nodes.iter().find(|node| {
            !placed.contains(&node.id)
                && node
                    .after
                    .iter()
                    .all(|dep| placed.contains(dep) || !declared.contains(dep))
        });

        match ready {
            Some(node) => {
                placed.insert(node.id);
                order.push(*node);
            }
            None => {
                let stuck: Vec<&str> = nodes
                    .iter()
                    .filter(|n| !placed.contains(&n.id))
                    .map(|n| n.id.as_str())
                    .collect();
                return Err(TeardownError::DependencyCycle(stuck.join(", ")));
            }
        }
    }

    Ok(order)
}

/// Steps in execution order.
#[derive(Debug, Clone)]
pub struct StepGraph {
    order: Vec<StepNode>,
}

impl StepGraph {
    pub fn new(nodes: &[StepNode]) -> Result<Self, TeardownError> {
        Ok(Self {
            order: topological_order(nodes)?,
        })
    }

    pub fn standard() -> Result<Self, TeardownError> {
        Self::new(STEPS)
    }

    pub fn order(&self) -> &[StepNode] {
        &self.order
    }

    pub fn ids(&self) -> Vec<StepId> {
        self.order.iter().map(|n| n.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[StepId], id: StepId) -> usize {
        order.iter().position(|s| *s == id).unwrap()
    }

    #[test]
    fn test_standard_order_is_declaration_order() {
        let graph = StepGraph::standard().unwrap();
        let declared: Vec<StepId> = STEPS.iter().map(|n| n.id).collect();
        assert_eq!(graph.ids(), declared);
    }

    #[test]
    fn test_every_edge_is_respected_regardless_of_declaration() {
        let mut reversed: Vec<StepNode> = STEPS.to_vec();
        reversed.reverse();

        let order: Vec<StepId> = topological_order(&reversed)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(order.len(), STEPS.len());

        for node in STEPS {
            for dep in node.after {
                assert!(
                    position(&order, *dep) < position(&order, node.id),
                    "{} must run after {}",
                    node.id,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_cycle_is_rejected() {
        let nodes = [
            step(Instances, &[Networks]),
            step(Subnetworks, &[Instances]),
            step(Networks, &[Subnetworks]),
            step(Images, &[]),
        ];
        match topological_order(&nodes) {
            Err(TeardownError::DependencyCycle(stuck)) => {
                assert!(stuck.contains("networks"));
                assert!(!stuck.contains("images"));
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_subset_ignores_missing_dependencies() {
        let nodes = [step(Networks, &[Subnetworks, Routes]), step(Instances, &[])];
        let order: Vec<StepId> = topological_order(&nodes)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(order, vec![Networks, Instances]);
    }

    #[test]
    fn test_optional_steps() {
        let optional: Vec<StepId> = STEPS.iter().filter(|n| n.optional).map(|n| n.id).collect();
        assert_eq!(optional, vec![ServiceAccounts, PolicyBindings, Dns, Buckets]);
    }
}
