//! Resource Registry - Compute Engine resource kinds
//!
//! Every Compute Engine type the teardown engine deletes is described by one
//! [`ComputeKind`]: where the collection lives, how items point at other
//! resources, and which quota metric an item consumes. Adding a compute type
//! means adding a row here.

use super::ResourceType;

/// Quota service for every Compute Engine kind.
pub const COMPUTE_SERVICE: &str = "compute.googleapis.com";

/// Where a collection lives in the Compute Engine API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Regional,
    Zonal,
}

/// Which field of an item lists the resources it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceField {
    None,
    /// `backends[].group` of a backend service
    BackendGroups,
    /// `instances[]` of a target pool
    PoolInstances,
}

/// Definition of one Compute Engine resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ComputeKind {
    pub resource_type: ResourceType,
    /// REST collection name, e.g. `forwardingRules`
    pub collection: &'static str,
    pub scope: Scope,
    pub references: ReferenceField,
    /// Quota limit consumed by one item
    pub quota_limit: &'static str,
}

const fn kind(
    resource_type: ResourceType,
    collection: &'static str,
    scope: Scope,
    quota_limit: &'static str,
) -> ComputeKind {
    ComputeKind {
        resource_type,
        collection,
        scope,
        references: ReferenceField::None,
        quota_limit,
    }
}

pub const COMPUTE_KINDS: &[ComputeKind] = &[
    kind(ResourceType::Instance, "instances", Scope::Zonal, "instances"),
    kind(ResourceType::Disk, "disks", Scope::Zonal, "disks"),
    kind(ResourceType::InstanceGroup, "instanceGroups", Scope::Zonal, "instance_groups"),
    kind(ResourceType::Image, "images", Scope::Global, "images"),
    kind(ResourceType::Route, "routes", Scope::Global, "routes"),
    kind(ResourceType::Firewall, "firewalls", Scope::Global, "firewalls"),
    kind(ResourceType::Address, "addresses", Scope::Regional, "static_addresses"),
    ComputeKind {
        references: ReferenceField::PoolInstances,
        ..kind(ResourceType::TargetPool, "targetPools", Scope::Regional, "target_pools")
    },
    kind(ResourceType::ForwardingRule, "forwardingRules", Scope::Regional, "forwarding_rules"),
    ComputeKind {
        references: ReferenceField::BackendGroups,
        ..kind(ResourceType::BackendService, "backendServices", Scope::Regional, "backend_services")
    },
    kind(ResourceType::HealthCheck, "healthChecks", Scope::Global, "health_checks"),
    kind(ResourceType::HttpHealthCheck, "httpHealthChecks", Scope::Global, "health_checks"),
    kind(ResourceType::Router, "routers", Scope::Regional, "routers"),
    kind(ResourceType::Subnetwork, "subnetworks", Scope::Regional, "subnetworks"),
    kind(ResourceType::Network, "networks", Scope::Global, "networks"),
];

/// Get the compute kind for a resource type
pub fn compute_kind(resource_type: ResourceType) -> Option<&'static ComputeKind> {
    COMPUTE_KINDS.iter().find(|k| k.resource_type == resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_kinds_are_unique() {
        let types: HashSet<_> = COMPUTE_KINDS.iter().map(|k| k.resource_type).collect();
        assert_eq!(types.len(), COMPUTE_KINDS.len());
    }

    #[test]
    fn test_non_compute_types_have_no_kind() {
        assert!(compute_kind(ResourceType::Bucket).is_none());
        assert!(compute_kind(ResourceType::ServiceAccount).is_none());
        assert!(compute_kind(ResourceType::DnsZone).is_none());
    }

    #[test]
    fn test_reference_fields() {
        let pool = compute_kind(ResourceType::TargetPool).unwrap();
        assert_eq!(pool.references, ReferenceField::PoolInstances);
        let backend = compute_kind(ResourceType::BackendService).unwrap();
        assert_eq!(backend.references, ReferenceField::BackendGroups);
        assert_eq!(backend.scope, Scope::Regional);
    }
}
