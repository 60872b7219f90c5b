//! Resource model
//!
//! This module holds the run-scoped bookkeeping the teardown engine works on.
//!
//! # Architecture
//!
//! - [`registry`] - Static table describing each Compute Engine resource kind
//! - [`fetcher`] - Paginated listing and JSON-to-[`CloudResource`] conversion
//! - [`quota`] - Quota metrics and the freed-quota ledger
//! - [`tracker`] - Pending items per resource type
//! - [`idempotency`] - Request IDs reused across retries of one delete

pub mod fetcher;
pub mod idempotency;
pub mod quota;
pub mod registry;
pub mod tracker;

pub use idempotency::{AttemptState, IdempotencyCache};
pub use quota::{merge_quota, Metric, QuotaUsage};
pub use tracker::PendingItemTracker;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every resource type the teardown engine knows how to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Instance,
    Disk,
    InstanceGroup,
    ServiceAccount,
    Image,
    DnsZone,
    Bucket,
    Route,
    Firewall,
    Address,
    TargetPool,
    ForwardingRule,
    BackendService,
    HealthCheck,
    HttpHealthCheck,
    Router,
    Subnetwork,
    Network,
}

impl ResourceType {
    pub const ALL: [ResourceType; 18] = [
        Self::Instance,
        Self::Disk,
        Self::InstanceGroup,
        Self::ServiceAccount,
        Self::Image,
        Self::DnsZone,
        Self::Bucket,
        Self::Route,
        Self::Firewall,
        Self::Address,
        Self::TargetPool,
        Self::ForwardingRule,
        Self::BackendService,
        Self::HealthCheck,
        Self::HttpHealthCheck,
        Self::Router,
        Self::Subnetwork,
        Self::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Disk => "disk",
            Self::InstanceGroup => "instance group",
            Self::ServiceAccount => "service account",
            Self::Image => "image",
            Self::DnsZone => "DNS zone",
            Self::Bucket => "bucket",
            Self::Route => "route",
            Self::Firewall => "firewall rule",
            Self::Address => "address",
            Self::TargetPool => "target pool",
            Self::ForwardingRule => "forwarding rule",
            Self::BackendService => "backend service",
            Self::HealthCheck => "health check",
            Self::HttpHealthCheck => "HTTP health check",
            Self::Router => "router",
            Self::Subnetwork => "subnetwork",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered cloud resource.
///
/// `key` is the dedup identity within one type's pending set and must be
/// stable across discovery passes for the same logical resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudResource {
    pub key: String,
    pub name: String,
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Region of a regional item listed under a zonal kind (regional disks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Self link, used to build filters for dependents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Network self link, for network-scoped resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// DNS name of a managed zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// URLs of resources this one points at (backends, pool members).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quota: Vec<QuotaUsage>,
}

impl CloudResource {
    /// A resource keyed by its name alone (global and regional resources).
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            resource_type,
            zone: None,
            region: None,
            project: None,
            url: None,
            status: None,
            network: None,
            domain: None,
            references: Vec::new(),
            quota: Vec::new(),
        }
    }

    /// A zonal resource, keyed by zone and name.
    pub fn zonal(resource_type: ResourceType, zone: &str, name: impl Into<String>) -> Self {
        let mut resource = Self::new(resource_type, name);
        resource.key = format!("{}/{}", zone, resource.name);
        resource.zone = Some(zone.to_string());
        resource
    }

    /// A regional resource returned by an aggregated listing, keyed by region and name.
    pub fn regional(resource_type: ResourceType, region: &str, name: impl Into<String>) -> Self {
        let mut resource = Self::new(resource_type, name);
        resource.key = format!("{}/{}", region, resource.name);
        resource.region = Some(region.to_string());
        resource
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn with_quota(mut self, quota: Vec<QuotaUsage>) -> Self {
        self.quota = quota;
        self
    }
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Normalize a resource URL to its `projects/...` suffix.
///
/// The API hands out both `www.googleapis.com` and `compute.googleapis.com`
/// self links for the same resource.
pub fn normalize_resource_url(url: &str) -> &str {
    match url.find("projects/") {
        Some(idx) => &url[idx..],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zonal_key_includes_zone() {
        let instance =
            CloudResource::zonal(ResourceType::Instance, "us-east1-b", "abc123-master-0");
        assert_eq!(instance.key, "us-east1-b/abc123-master-0");
        assert_eq!(instance.name, "abc123-master-0");
    }

    #[test]
    fn test_regional_key_does_not_collide_with_zonal() {
        let regional = CloudResource::regional(ResourceType::Disk, "us-east1", "abc123-pd");
        let zonal = CloudResource::zonal(ResourceType::Disk, "us-east1-b", "abc123-pd");
        assert_eq!(regional.key, "us-east1/abc123-pd");
        assert_eq!(regional.region.as_deref(), Some("us-east1"));
        assert_ne!(regional.key, zonal.key);
    }

    #[test]
    fn test_normalize_resource_url() {
        let a = "https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/i";
        let b = "https://compute.googleapis.com/compute/v1/projects/p/zones/z/instances/i";
        assert_eq!(normalize_resource_url(a), normalize_resource_url(b));
        assert_eq!(normalize_resource_url("no-projects-here"), "no-projects-here");
    }

    #[test]
    fn test_extract_short_name() {
        assert_eq!(
            extract_short_name("https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"),
            "us-central1-a"
        );
        assert_eq!(extract_short_name("plain"), "plain");
    }
}
