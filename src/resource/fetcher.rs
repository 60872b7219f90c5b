//! Resource Fetcher
//!
//! Handles paginated listing from GCP APIs and turns raw JSON items into
//! [`CloudResource`]s.

use super::quota::{Metric, QuotaUsage};
use super::registry::{ComputeKind, ReferenceField, Scope, COMPUTE_SERVICE};
use super::{extract_short_name, CloudResource};
use crate::error::ProviderError;
use crate::gcp::client::GcpClient;
use serde_json::Value;

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch all items of a list endpoint (auto-paginate)
pub async fn fetch_all(
    client: &GcpClient,
    url: &str,
    items_path: &str,
    params: &[(&str, String)],
) -> Result<Vec<Value>, ProviderError> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let result = fetch_page(client, url, items_path, params, page_token.as_deref()).await?;
        all_items.extend(result.items);

        if result.next_token.is_none() {
            break;
        }
        page_token = result.next_token;
    }

    Ok(all_items)
}

/// Fetch one page of a list endpoint
pub async fn fetch_page(
    client: &GcpClient,
    url: &str,
    items_path: &str,
    params: &[(&str, String)],
    page_token: Option<&str>,
) -> Result<PaginatedResult, ProviderError> {
    let mut query: Vec<(&str, String)> = params.to_vec();
    if let Some(token) = page_token {
        query.push(("pageToken", token.to_string()));
    }

    let mut response = client.get(&add_query_params(url, &query)).await?;

    // Aggregated listings return items keyed by scope
    if response.get("items").is_some_and(Value::is_object) {
        response = flatten_aggregated_response(response);
    }

    let items = extract_items(&response, items_path);
    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(PaginatedResult { items, next_token })
}

/// Extract items from response using a dot-notation path
fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    let mut current = response;

    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current.get(part) {
            Some(v) => v,
            None => return vec![],
        };
    }

    current.as_array().cloned().unwrap_or_default()
}

/// Append query parameters, URL-encoding every value
pub fn add_query_params(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// Flatten an aggregated API response into a standard list response.
/// Aggregated responses have format: { "items": { "zones/us-central1-a": { "instances": [...] }, ... } }
/// We flatten to: { "items": [...all instances...], "nextPageToken": ... }
pub fn flatten_aggregated_response(response: Value) -> Value {
    let next_token = response.get("nextPageToken").cloned();

    let Some(items) = response.get("items").and_then(|v| v.as_object()) else {
        return serde_json::json!({ "items": [] });
    };

    let mut all_items: Vec<Value> = Vec::new();

    for scope_data in items.values() {
        if let Some(obj) = scope_data.as_object() {
            for (key, value) in obj {
                // Skip warning field and other metadata
                if key == "warning" {
                    continue;
                }
                if let Some(arr) = value.as_array() {
                    all_items.extend(arr.iter().cloned());
                }
            }
        }
    }

    let mut flattened = serde_json::json!({ "items": all_items });
    if let Some(token) = next_token {
        flattened["nextPageToken"] = token;
    }
    flattened
}

/// String field of a JSON item
pub fn json_str(item: &Value, field: &str) -> Option<String> {
    item.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

/// Region part of a zone name ("us-east1-b" -> "us-east1")
pub fn region_of_zone(zone: &str) -> &str {
    zone.rsplit_once('-').map_or(zone, |(region, _)| region)
}

/// Convert a Compute Engine list item into a [`CloudResource`]
pub fn compute_item_to_resource(
    kind: &ComputeKind,
    item: &Value,
    project: &str,
    region: &str,
) -> Option<CloudResource> {
    let name = json_str(item, "name")?;
    let zone = json_str(item, "zone").map(|z| extract_short_name(&z));
    let item_region = json_str(item, "region").map(|r| extract_short_name(&r));

    // aggregated listings of zonal kinds also carry regional items (regional disks)
    let mut resource = match (kind.scope, zone.as_deref(), item_region.as_deref()) {
        (Scope::Zonal, Some(zone), _) => CloudResource::zonal(kind.resource_type, zone, name),
        (Scope::Zonal, None, Some(item_region)) => {
            CloudResource::regional(kind.resource_type, item_region, name)
        }
        (Scope::Zonal, None, None) => return None,
        _ => CloudResource::new(kind.resource_type, name),
    };

    resource.project = Some(project.to_string());
    resource.url = json_str(item, "selfLink");
    resource.status = json_str(item, "status");
    resource.network = json_str(item, "network");
    resource.references = extract_references(kind.references, item);

    let mut metric = Metric::new(COMPUTE_SERVICE, kind.quota_limit);
    match kind.scope {
        Scope::Global => {}
        Scope::Regional => metric = metric.with_dimension("region", region),
        Scope::Zonal => {
            let item_region = match (zone.as_deref(), item_region.as_deref()) {
                (Some(zone), _) => region_of_zone(zone),
                (None, Some(item_region)) => item_region,
                (None, None) => region,
            };
            metric = metric.with_dimension("region", item_region);
        }
    }
    resource.quota = vec![QuotaUsage::new(metric, 1)];

    Some(resource)
}

fn extract_references(field: ReferenceField, item: &Value) -> Vec<String> {
    match field {
        ReferenceField::None => Vec::new(),
        ReferenceField::BackendGroups => item
            .get("backends")
            .and_then(|v| v.as_array())
            .map(|backends| {
                backends
                    .iter()
                    .filter_map(|b| json_str(b, "group"))
                    .collect()
            })
            .unwrap_or_default(),
        ReferenceField::PoolInstances => item
            .get("instances")
            .and_then(|v| v.as_array())
            .map(|instances| {
                instances
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
    }
}
