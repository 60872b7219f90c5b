//! Resource drivers
//!
//! Per-type adapters between the teardown engine and a provider API. Every
//! deletable type sits behind the one generic [`ResourceDriver`] trait, so
//! per-type code reduces to a listing call, a deletion call and the
//! ownership filter. DNS record sets and the project IAM policy have their
//! own narrow traits because they are not deleted as standalone resources.
//!
//! # Module Structure
//!
//! - [`filter`] - Ownership predicates passed to `list`
//! - [`compute`] - One generic driver covering every Compute Engine kind
//! - [`storage`] - Cloud Storage buckets (objects are emptied first)
//! - [`iam`] - Service accounts and the project IAM policy
//! - [`dns`] - Cloud DNS managed zones and record sets

pub mod compute;
pub mod dns;
pub mod filter;
pub mod iam;
pub mod storage;

pub use filter::ListFilter;

use crate::destroy::dns::{DnsZone, RecordSet, Visibility};
use crate::destroy::iam::Policy;
use crate::error::{ProviderError, TeardownError};
use crate::gcp::client::GcpClient;
use crate::resource::registry::COMPUTE_KINDS;
use crate::resource::{CloudResource, ResourceType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Provider answer to a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// The resource is gone.
    Done,
    /// The provider accepted the request; the operation is still running.
    Pending,
    /// The resource did not exist. Treated as success.
    NotFound,
}

/// List and delete one resource type.
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    /// List every resource of the type matching `filter` (paginated internally).
    async fn list(&self, filter: &ListFilter) -> Result<Vec<CloudResource>, ProviderError>;

    /// Delete one resource, passing `request_id` as the idempotency token.
    async fn delete(
        &self,
        item: &CloudResource,
        request_id: &str,
    ) -> Result<DeleteStatus, ProviderError>;
}

/// Record-level access to Cloud DNS.
#[async_trait]
pub trait DnsRecordApi: Send + Sync {
    async fn list_zones(&self, visibility: Visibility) -> Result<Vec<DnsZone>, ProviderError>;

    async fn list_records(&self, zone: &DnsZone) -> Result<Vec<RecordSet>, ProviderError>;

    async fn delete_record(&self, zone: &DnsZone, record: &RecordSet) -> Result<(), ProviderError>;
}

/// Read-modify-write access to the project IAM policy.
#[async_trait]
pub trait PolicyApi: Send + Sync {
    async fn get_policy(&self) -> Result<Policy, ProviderError>;

    async fn set_policy(&self, policy: &Policy) -> Result<(), ProviderError>;
}

/// Every driver a teardown run needs.
#[derive(Clone)]
pub struct DriverSet {
    resources: HashMap<ResourceType, Arc<dyn ResourceDriver>>,
    dns: Arc<dyn DnsRecordApi>,
    policy: Arc<dyn PolicyApi>,
}

impl DriverSet {
    pub fn new(dns: Arc<dyn DnsRecordApi>, policy: Arc<dyn PolicyApi>) -> Self {
        Self {
            resources: HashMap::new(),
            dns,
            policy,
        }
    }

    /// Register a driver, replacing any previous one for the same type.
    pub fn with(mut self, driver: Arc<dyn ResourceDriver>) -> Self {
        self.resources.insert(driver.resource_type(), driver);
        self
    }

    /// Drivers backed by the real GCP APIs.
    pub fn gcp(client: &GcpClient) -> Self {
        let dns = Arc::new(dns::DnsDriver::new(client.clone()));
        let iam = Arc::new(iam::IamPolicyDriver::new(client.clone()));

        let mut set = Self::new(dns.clone(), iam)
            .with(dns)
            .with(Arc::new(storage::BucketDriver::new(client.clone())))
            .with(Arc::new(iam::ServiceAccountDriver::new(client.clone())));

        for kind in COMPUTE_KINDS {
            set = set.with(Arc::new(compute::ComputeDriver::new(client.clone(), kind)));
        }
        set
    }

    pub fn get(
        &self,
        resource_type: ResourceType,
    ) -> Result<&Arc<dyn ResourceDriver>, TeardownError> {
        self.resources
            .get(&resource_type)
            .ok_or(TeardownError::MissingDriver(resource_type))
    }

    pub fn dns(&self) -> &Arc<dyn DnsRecordApi> {
        &self.dns
    }

    pub fn policy(&self) -> &Arc<dyn PolicyApi> {
        &self.policy
    }
}
