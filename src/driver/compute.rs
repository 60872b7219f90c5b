//! Compute Engine driver
//!
//! One driver type serves every kind in the resource registry; the kind
//! decides URL scope, reference extraction and quota attribution.

use super::{DeleteStatus, ListFilter, ResourceDriver};
use crate::error::ProviderError;
use crate::gcp::client::GcpClient;
use crate::resource::fetcher::{add_query_params, compute_item_to_resource, fetch_all};
use crate::resource::registry::{ComputeKind, Scope};
use crate::resource::{CloudResource, ResourceType};
use async_trait::async_trait;
use serde_json::Value;

pub struct ComputeDriver {
    client: GcpClient,
    kind: &'static ComputeKind,
}

impl ComputeDriver {
    pub fn new(client: GcpClient, kind: &'static ComputeKind) -> Self {
        Self { client, kind }
    }

    fn list_url(&self) -> String {
        match self.kind.scope {
            Scope::Global => self.client.compute_global_url(self.kind.collection),
            Scope::Regional => self.client.compute_regional_url(self.kind.collection),
            Scope::Zonal => self.client.compute_aggregated_url(self.kind.collection),
        }
    }

    fn item_url(&self, item: &CloudResource) -> Result<String, ProviderError> {
        let path = format!("{}/{}", self.kind.collection, item.name);
        match self.kind.scope {
            Scope::Global => Ok(self.client.compute_global_url(&path)),
            Scope::Regional => Ok(self.client.compute_regional_url(&path)),
            Scope::Zonal => match (item.zone.as_deref(), item.region.as_deref()) {
                (Some(zone), _) => Ok(self.client.compute_zonal_url(zone, &path)),
                (None, Some(region)) => Ok(self.client.compute_region_url(region, &path)),
                (None, None) => Err(ProviderError::Invalid(format!(
                    "{} {} has no zone or region",
                    self.kind.resource_type, item.name
                ))),
            },
        }
    }
}

/// Interpret a Compute Engine operation returned by a delete call
pub fn parse_operation(operation: &Value) -> Result<DeleteStatus, ProviderError> {
    let status = operation.get("status").and_then(|v| v.as_str()).unwrap_or("");
    if status != "DONE" {
        return Ok(DeleteStatus::Pending);
    }

    let errors = operation
        .get("error")
        .and_then(|e| e.get("errors"))
        .and_then(|e| e.as_array())
        .filter(|e| !e.is_empty());

    let http_status = operation
        .get("httpErrorStatusCode")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    if let Some(errors) = errors {
        let message = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ProviderError::OperationFailed(message));
    }
    if http_status == 404 {
        return Ok(DeleteStatus::NotFound);
    }
    if http_status >= 400 {
        let message = operation
            .get("httpErrorMessage")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        return Err(ProviderError::OperationFailed(format!(
            "{}: {}",
            http_status, message
        )));
    }

    Ok(DeleteStatus::Done)
}

#[async_trait]
impl ResourceDriver for ComputeDriver {
    fn resource_type(&self) -> ResourceType {
        self.kind.resource_type
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<CloudResource>, ProviderError> {
        let mut params = Vec::new();
        if let Some(expression) = filter.compute_expression() {
            params.push(("filter", expression));
        }

        let items = fetch_all(&self.client, &self.list_url(), "items", &params).await?;

        Ok(items
            .iter()
            .filter_map(|item| {
                compute_item_to_resource(
                    self.kind,
                    item,
                    &self.client.project_id,
                    &self.client.region,
                )
            })
            .filter(|resource| filter.matches(resource))
            .collect())
    }

    async fn delete(
        &self,
        item: &CloudResource,
        request_id: &str,
    ) -> Result<DeleteStatus, ProviderError> {
        let url = add_query_params(&self.item_url(item)?, &[("requestId", request_id.to_string())]);

        match self.client.delete(&url).await {
            Ok(operation) => parse_operation(&operation),
            Err(ProviderError::NotFound) => Ok(DeleteStatus::NotFound),
            Err(err) => Err(err),
        }
    }
}
