//! Cloud Storage driver
//!
//! Buckets must be empty before they can be deleted, so `delete` removes
//! every object first. Storage deletes are synchronous and take no request
//! ID; the token is ignored.

use super::{DeleteStatus, ListFilter, ResourceDriver};
use crate::error::ProviderError;
use crate::gcp::client::GcpClient;
use crate::resource::fetcher::{fetch_all, json_str};
use crate::resource::{CloudResource, ResourceType};
use async_trait::async_trait;

pub struct BucketDriver {
    client: GcpClient,
}

impl BucketDriver {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize, ProviderError> {
        let objects = fetch_all(
            &self.client,
            &self.client.storage_objects_url(bucket),
            "items",
            &[("fields", "items(name),nextPageToken".to_string())],
        )
        .await?;

        let mut deleted = 0;
        for object in &objects {
            let Some(name) = json_str(object, "name") else {
                continue;
            };
            let url = format!(
                "{}/{}",
                self.client.storage_objects_url(bucket),
                urlencoding::encode(&name)
            );
            match self.client.delete(&url).await {
                Ok(_) | Err(ProviderError::NotFound) => deleted += 1,
                Err(err) => return Err(err),
            }
        }

        Ok(deleted)
    }
}

#[async_trait]
impl ResourceDriver for BucketDriver {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<CloudResource>, ProviderError> {
        let mut params = vec![("project", self.client.project_id.clone())];
        if let Some(prefix) = filter.prefix() {
            params.push(("prefix", prefix.to_string()));
        }

        let items = fetch_all(&self.client, &self.client.storage_url("b"), "items", &params).await?;

        Ok(items
            .iter()
            .filter_map(|item| {
                let name = json_str(item, "name")?;
                let mut bucket = CloudResource::new(ResourceType::Bucket, name);
                bucket.project = Some(self.client.project_id.clone());
                bucket.url = json_str(item, "selfLink");
                Some(bucket)
            })
            .filter(|bucket| filter.matches(bucket))
            .collect())
    }

    async fn delete(
        &self,
        item: &CloudResource,
        _request_id: &str,
    ) -> Result<DeleteStatus, ProviderError> {
        let removed = match self.empty_bucket(&item.name).await {
            Ok(n) => n,
            Err(ProviderError::NotFound) => return Ok(DeleteStatus::NotFound),
            Err(err) => return Err(err),
        };
        if removed > 0 {
            tracing::debug!("Deleted {} objects from bucket {}", removed, item.name);
        }

        match self.client.delete(&self.client.storage_bucket_url(&item.name)).await {
            Ok(_) => Ok(DeleteStatus::Done),
            Err(ProviderError::NotFound) => Ok(DeleteStatus::NotFound),
            Err(err) => Err(err),
        }
    }
}
