//! Cloud DNS driver
//!
//! Managed zones are deleted through [`ResourceDriver`]; record sets are
//! reached through [`DnsRecordApi`].

use super::{DeleteStatus, DnsRecordApi, ListFilter, ResourceDriver};
use crate::destroy::dns::{DnsZone, RecordSet, Visibility};
use crate::error::ProviderError;
use crate::gcp::client::GcpClient;
use crate::resource::fetcher::{fetch_all, json_str};
use crate::resource::{CloudResource, Metric, QuotaUsage, ResourceType};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

pub struct DnsDriver {
    client: GcpClient,
}

impl DnsDriver {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }

    async fn all_zones(&self) -> Result<Vec<DnsZone>, ProviderError> {
        let url = self.client.dns_zones_url();
        let items = fetch_all(&self.client, &url, "managedZones", &[]).await?;
        Ok(items.iter().filter_map(zone_from_json).collect())
    }
}

fn zone_from_json(item: &Value) -> Option<DnsZone> {
    let name = json_str(item, "name")?;
    let domain = json_str(item, "dnsName")?;
    let visibility = match json_str(item, "visibility").as_deref() {
        Some("private") => Visibility::Private,
        _ => Visibility::Public,
    };
    Some(DnsZone::new(&name, &domain, visibility))
}

#[async_trait]
impl ResourceDriver for DnsDriver {
    fn resource_type(&self) -> ResourceType {
        ResourceType::DnsZone
    }

    /// Lists private zones only; public zones are never owned by a cluster.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<CloudResource>, ProviderError> {
        let zones = self.all_zones().await?;

        Ok(zones
            .into_iter()
            .filter(|z| z.visibility == Visibility::Private)
            .map(|z| {
                let mut zone = CloudResource::new(ResourceType::DnsZone, z.name)
                    .with_domain(z.domain)
                    .with_quota(vec![QuotaUsage::new(
                        Metric::new("dns.googleapis.com", "managed_zones"),
                        1,
                    )]);
                zone.project = Some(self.client.project_id.clone());
                zone
            })
            .filter(|zone| filter.matches(zone))
            .collect())
    }

    async fn delete(
        &self,
        item: &CloudResource,
        _request_id: &str,
    ) -> Result<DeleteStatus, ProviderError> {
        match self.client.delete(&self.client.dns_zone_url(&item.name, "")).await {
            Ok(_) => Ok(DeleteStatus::Done),
            Err(ProviderError::NotFound) => Ok(DeleteStatus::NotFound),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl DnsRecordApi for DnsDriver {
    async fn list_zones(&self, visibility: Visibility) -> Result<Vec<DnsZone>, ProviderError> {
        let zones = self.all_zones().await?;
        Ok(zones.into_iter().filter(|z| z.visibility == visibility).collect())
    }

    async fn list_records(&self, zone: &DnsZone) -> Result<Vec<RecordSet>, ProviderError> {
        let items = fetch_all(
            &self.client,
            &self.client.dns_zone_url(&zone.name, "rrsets"),
            "rrsets",
            &[],
        )
        .await?;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<RecordSet>(item.clone()) {
                Ok(record) => records.push(record),
                Err(err) => debug!(
                    zone = %zone.name,
                    "Skipping unreadable record set {}: {}",
                    item,
                    err
                ),
            }
        }
        Ok(records)
    }

    async fn delete_record(&self, zone: &DnsZone, record: &RecordSet) -> Result<(), ProviderError> {
        let path = format!(
            "rrsets/{}/{}",
            urlencoding::encode(&record.name),
            urlencoding::encode(&record.record_type)
        );

        match self.client.delete(&self.client.dns_zone_url(&zone.name, &path)).await {
            Ok(_) | Err(ProviderError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zone_from_json() {
        let zone = zone_from_json(&json!({
            "name": "abc123-private-zone",
            "dnsName": "c.example.com.",
            "visibility": "private"
        }))
        .unwrap();
        assert_eq!(zone.visibility, Visibility::Private);

        let public = zone_from_json(&json!({"name": "base", "dnsName": "example.com."})).unwrap();
        assert_eq!(public.visibility, Visibility::Public);
    }
}
