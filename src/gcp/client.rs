//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::error::ProviderError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

/// Base URLs of the APIs the teardown engine talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compute: String,
    pub storage: String,
    pub dns: String,
    pub iam: String,
    pub resource_manager: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com/compute/v1".to_string(),
            storage: "https://storage.googleapis.com/storage/v1".to_string(),
            dns: "https://dns.googleapis.com/dns/v1".to_string(),
            iam: "https://iam.googleapis.com/v1".to_string(),
            resource_manager: "https://cloudresourcemanager.googleapis.com/v1".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every API at one host, keeping the real path prefixes
    /// (used against emulators and mock servers).
    pub fn with_base(base: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(base).with_context(|| format!("Invalid endpoint URL: {}", base))?;
        let base = parsed.as_str().trim_end_matches('/');

        Ok(Self {
            compute: format!("{}/compute/v1", base),
            storage: format!("{}/storage/v1", base),
            dns: format!("{}/dns/v1", base),
            iam: format!("{}/v1", base),
            resource_manager: format!("{}/v1", base),
        })
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub region: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client
    pub async fn new(project_id: &str, region: &str, timeout: Duration) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, project_id, region, timeout, Endpoints::default())
    }

    /// Create a client from explicit credentials and endpoints
    pub fn with_credentials(
        credentials: GcpCredentials,
        project_id: &str,
        region: &str,
        timeout: Duration,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let http = GcpHttpClient::new(timeout)?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            region: region.to_string(),
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String, ProviderError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ProviderError::Transient(format!("{e:#}")))
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value, ProviderError> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value, ProviderError> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value, ProviderError> {
        let token = self.get_token().await?;
        self.http.delete(url, &token).await
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.endpoints.compute, self.project_id, path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, zone: &str, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, resource: &str) -> String {
        self.compute_region_url(&self.region, resource)
    }

    /// Build a Compute Engine API URL for an explicit region
    pub fn compute_region_url(&self, region: &str, resource: &str) -> String {
        self.compute_url(&format!("regions/{}/{}", region, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, resource: &str) -> String {
        self.compute_url(&format!("aggregated/{}", resource))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", urlencoding::encode(bucket)))
    }

    /// Build Cloud Storage objects URL
    pub fn storage_objects_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}/o", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // Cloud DNS API helpers
    // =========================================================================

    /// Build Cloud DNS managed zones URL
    pub fn dns_zones_url(&self) -> String {
        format!(
            "{}/projects/{}/managedZones",
            self.endpoints.dns, self.project_id
        )
    }

    /// Build Cloud DNS URL below one managed zone
    pub fn dns_zone_url(&self, zone: &str, path: &str) -> String {
        let base = format!("{}/{}", self.dns_zones_url(), urlencoding::encode(zone));
        if path.is_empty() {
            base
        } else {
            format!("{}/{}", base, path)
        }
    }

    // =========================================================================
    // IAM / Resource Manager API helpers
    // =========================================================================

    /// Build IAM service accounts URL
    pub fn iam_service_accounts_url(&self) -> String {
        format!(
            "{}/projects/{}/serviceAccounts",
            self.endpoints.iam, self.project_id
        )
    }

    /// Build IAM URL for a fully qualified resource name
    pub fn iam_url(&self, name: &str) -> String {
        format!("{}/{}", self.endpoints.iam, name)
    }

    /// Build Resource Manager project method URL (e.g. `getIamPolicy`)
    pub fn resourcemanager_project_url(&self, method: &str) -> String {
        format!(
            "{}/projects/{}:{}",
            self.endpoints.resource_manager, self.project_id, method
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcpClient {
        GcpClient::with_credentials(
            GcpCredentials::from_static_token("t"),
            "my-project",
            "us-east1",
            Duration::from_secs(5),
            Endpoints::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_compute_urls() {
        let c = client();
        assert_eq!(
            c.compute_regional_url("addresses"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/regions/us-east1/addresses"
        );
        assert_eq!(
            c.compute_zonal_url("us-east1-b", "instances/foo"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/zones/us-east1-b/instances/foo"
        );
        assert_eq!(
            c.compute_global_url("networks"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/global/networks"
        );
    }

    #[test]
    fn test_with_base_keeps_path_prefixes() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:8080/").unwrap();
        assert_eq!(endpoints.compute, "http://127.0.0.1:8080/compute/v1");
        assert_eq!(endpoints.dns, "http://127.0.0.1:8080/dns/v1");
        assert!(Endpoints::with_base("not a url").is_err());
    }

    #[test]
    fn test_resourcemanager_project_url() {
        assert_eq!(
            client().resourcemanager_project_url("getIamPolicy"),
            "https://cloudresourcemanager.googleapis.com/v1/projects/my-project:getIamPolicy"
        );
    }
}
