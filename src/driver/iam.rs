//! IAM drivers: service accounts and the project policy

use super::{DeleteStatus, ListFilter, PolicyApi, ResourceDriver};
use crate::destroy::iam::Policy;
use crate::error::ProviderError;
use crate::gcp::client::GcpClient;
use crate::resource::fetcher::{fetch_all, json_str};
use crate::resource::{CloudResource, Metric, QuotaUsage, ResourceType};
use async_trait::async_trait;
use serde_json::json;

/// Highest policy version; needed to read conditional bindings intact
const POLICY_VERSION: u32 = 3;

pub struct ServiceAccountDriver {
    client: GcpClient,
}

impl ServiceAccountDriver {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceDriver for ServiceAccountDriver {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServiceAccount
    }

    /// Service accounts are keyed and filtered by email.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<CloudResource>, ProviderError> {
        let items = fetch_all(
            &self.client,
            &self.client.iam_service_accounts_url(),
            "accounts",
            &[],
        )
        .await?;

        Ok(items
            .iter()
            .filter_map(|item| {
                let email = json_str(item, "email")?;
                let mut account = CloudResource::new(ResourceType::ServiceAccount, email);
                account.project = Some(self.client.project_id.clone());
                account.url = json_str(item, "name");
                account.quota = vec![QuotaUsage::new(
                    Metric::new("iam.googleapis.com", "service_accounts"),
                    1,
                )];
                Some(account)
            })
            .filter(|account| filter.matches(account))
            .collect())
    }

    async fn delete(
        &self,
        item: &CloudResource,
        _request_id: &str,
    ) -> Result<DeleteStatus, ProviderError> {
        let name = item.url.clone().unwrap_or_else(|| {
            format!(
                "projects/{}/serviceAccounts/{}",
                self.client.project_id, item.name
            )
        });

        match self.client.delete(&self.client.iam_url(&name)).await {
            Ok(_) => Ok(DeleteStatus::Done),
            Err(ProviderError::NotFound) => Ok(DeleteStatus::NotFound),
            Err(err) => Err(err),
        }
    }
}

pub struct IamPolicyDriver {
    client: GcpClient,
}

impl IamPolicyDriver {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyApi for IamPolicyDriver {
    async fn get_policy(&self) -> Result<Policy, ProviderError> {
        let body = json!({ "options": { "requestedPolicyVersion": POLICY_VERSION } });
        let response = self
            .client
            .post(&self.client.resourcemanager_project_url("getIamPolicy"), Some(&body))
            .await?;

        serde_json::from_value(response)
            .map_err(|e| ProviderError::Transient(format!("failed to parse IAM policy: {e}")))
    }

    async fn set_policy(&self, policy: &Policy) -> Result<(), ProviderError> {
        let mut policy = policy.clone();
        policy.version = Some(POLICY_VERSION);

        let body = json!({ "policy": policy });
        self.client
            .post(&self.client.resourcemanager_project_url("setIamPolicy"), Some(&body))
            .await?;
        Ok(())
    }
}
