//! Ownership Classifier
//!
//! Installer-created resources carry the infra ID as a name prefix (direct
//! ownership). Resources created later by the in-cluster cloud controller
//! follow their own naming template and are owned only when everything they
//! reference is already confirmed owned (indirect ownership).

use crate::driver::ListFilter;
use crate::error::TeardownError;
use crate::resource::{normalize_resource_url, CloudResource};
use std::collections::HashSet;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// UID the cloud controller derives from the infra ID and embeds in the
/// names of the resources it creates.
pub fn cloud_controller_uid(infra_id: &str) -> String {
    format!("{:x}", fnv1a_32(infra_id.as_bytes()))
}

#[derive(Debug)]
pub struct OwnershipClassifier {
    prefix: String,
    controller_uid: String,
    /// Normalized URLs of every resource confirmed owned during the run.
    /// Kept after the resource is deleted.
    confirmed: HashSet<String>,
}

impl OwnershipClassifier {
    pub fn new(infra_id: &str) -> Result<Self, TeardownError> {
        let prefix = format!("{}-", infra_id);
        // reject anything that cannot be rendered into a provider filter
        ListFilter::name_prefix(&prefix)?;

        Ok(Self {
            prefix,
            controller_uid: cloud_controller_uid(infra_id),
            confirmed: HashSet::new(),
        })
    }

    pub fn controller_uid(&self) -> &str {
        &self.controller_uid
    }

    /// Filter selecting installer-named resources.
    pub fn direct_filter(&self) -> Result<ListFilter, TeardownError> {
        ListFilter::name_prefix(&self.prefix)
    }

    /// Name of the instance group the controller creates for internal load balancers.
    pub fn controller_instance_group(&self) -> String {
        format!("k8s-ig--{}", self.controller_uid)
    }

    /// Name of the node health check shared by external load balancers.
    pub fn controller_node_health_check(&self) -> String {
        format!("k8s-{}-node", self.controller_uid)
    }

    /// Record a resource as owned so others may reference it.
    pub fn confirm(&mut self, resource: &CloudResource) {
        if let Some(url) = &resource.url {
            self.confirmed.insert(normalize_resource_url(url).to_string());
        }
    }

    pub fn is_confirmed(&self, url: &str) -> bool {
        self.confirmed.contains(normalize_resource_url(url))
    }

    /// Indirect ownership: every reference points at a confirmed resource.
    ///
    /// An empty reference set is never evidence of ownership.
    pub fn is_indirectly_owned(&self, resource: &CloudResource) -> bool {
        !resource.references.is_empty()
            && resource.references.iter().all(|r| self.is_confirmed(r))
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }
}
