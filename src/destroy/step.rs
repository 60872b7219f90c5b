//! Step execution
//!
//! The discover → track → delete cycle shared by every step, and the
//! network step which purges foreign routes before each network.

use super::graph::StepId;
use super::report::StepReport;
use super::reconciler::Reconciler;
use crate::driver::{DeleteStatus, ListFilter};
use crate::error::{ProviderError, TeardownError};
use crate::resource::{AttemptState, CloudResource, ResourceType};
use tracing::{debug, info};

/// Routes the provider creates for every network and removes with it.
const DEFAULT_ROUTE_PREFIX: &str = "default-route-";

fn subject(resource_type: ResourceType, item: &CloudResource) -> String {
    format!("{} {}", resource_type, item.key)
}

impl Reconciler {
    /// List resources of one type. A failed listing is recorded and yields `None`.
    pub(super) async fn list_resources(
        &mut self,
        resource_type: ResourceType,
        filter: &ListFilter,
        report: &mut StepReport,
    ) -> Result<Option<Vec<CloudResource>>, TeardownError> {
        let driver = self.drivers.get(resource_type)?.clone();

        match self.call(driver.list(filter)).await {
            Ok(items) => Ok(Some(items)),
            Err(err) => {
                self.record_failure(report, format!("listing {}s", resource_type), err)?;
                Ok(None)
            }
        }
    }

    /// Confirm owned items, fold them into the pending set and return every
    /// pending item of the type.
    pub(super) fn track(
        &mut self,
        resource_type: ResourceType,
        owned: Vec<CloudResource>,
    ) -> Vec<CloudResource> {
        for item in &owned {
            self.ownership.confirm(item);
            if resource_type == ResourceType::ServiceAccount {
                self.owned_service_accounts.insert(item.name.clone());
            }
            if !self.tracker.contains(resource_type, &item.key) {
                info!("Found {} {}", resource_type, item.key);
            }
        }
        self.tracker.reconcile(resource_type, owned)
    }

    /// Attempt to delete each item, reusing in-flight request IDs.
    ///
    /// A failing item never stops the others. Only cancellation and fatal
    /// errors end the loop early.
    pub(super) async fn delete_items(
        &mut self,
        resource_type: ResourceType,
        items: Vec<CloudResource>,
        report: &mut StepReport,
    ) -> Result<(), TeardownError> {
        let driver = self.drivers.get(resource_type)?.clone();

        for item in items {
            if self.cancel.is_cancelled() {
                return Err(TeardownError::Cancelled);
            }

            let retrying = matches!(
                self.idempotency.state(resource_type, &item.key),
                AttemptState::InFlight(_)
            );
            let token = self.idempotency.token(resource_type, &item.key);

            let response = self.call(driver.delete(&item, &token)).await;
            if matches!(response, Err(ProviderError::Cancelled)) {
                return Err(TeardownError::Cancelled);
            }
            self.idempotency.observe(resource_type, &item.key, &response);

            match response {
                Ok(DeleteStatus::Done) => {
                    self.tracker.remove(resource_type, &item);
                    report.deleted += 1;
                    info!("Deleted {} {}", resource_type, item.key);
                }
                Ok(DeleteStatus::NotFound) | Err(ProviderError::NotFound) => {
                    if retrying {
                        debug!(
                            request_id = %token,
                            "{} {} not found while a delete request was in flight",
                            resource_type,
                            item.key
                        );
                    }
                    self.tracker.remove(resource_type, &item);
                    report.deleted += 1;
                    info!("Deleted {} {}", resource_type, item.key);
                }
                Ok(DeleteStatus::Pending) => {
                    debug!(
                        request_id = %token,
                        "Deletion of {} {} in progress",
                        resource_type,
                        item.key
                    );
                }
                Err(err) => self.record_failure(report, subject(resource_type, &item), err)?,
            }
        }

        Ok(())
    }

    /// List installer-named items of one type and delete everything pending.
    pub(super) async fn run_standard_step(
        &mut self,
        step: StepId,
        resource_type: ResourceType,
    ) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(step);
        let filter = self.ownership.direct_filter()?;

        let listed = self
            .list_resources(resource_type, &filter, &mut report)
            .await?
            .unwrap_or_default();
        let pending = self.track(resource_type, listed);

        self.delete_items(resource_type, pending, &mut report).await?;
        report.pending = self.tracker.count(resource_type);
        Ok(report)
    }

    /// Delete networks, removing each network's non-default routes first.
    pub(super) async fn run_networks_step(&mut self) -> Result<StepReport, TeardownError> {
        let mut report = StepReport::new(StepId::Networks);
        let filter = self.ownership.direct_filter()?;

        let listed = self
            .list_resources(ResourceType::Network, &filter, &mut report)
            .await?
            .unwrap_or_default();
        let networks = self.track(ResourceType::Network, listed);

        for network in networks {
            if self.cancel.is_cancelled() {
                return Err(TeardownError::Cancelled);
            }

            if let Some(url) = network.url.clone() {
                if !self.purge_network_routes(&url, &mut report).await? {
                    debug!("Network {} still has routes, retrying next pass", network.name);
                    continue;
                }
            }

            self.delete_items(ResourceType::Network, vec![network], &mut report)
                .await?;
        }

        report.pending = self.tracker.count(ResourceType::Network);
        Ok(report)
    }

    /// Delete routes attached to the network. Returns true once none remain.
    async fn purge_network_routes(
        &mut self,
        network_url: &str,
        report: &mut StepReport,
    ) -> Result<bool, TeardownError> {
        let filter = ListFilter::network(network_url)?;

        let Some(routes) = self
            .list_resources(ResourceType::Route, &filter, report)
            .await?
        else {
            return Ok(false);
        };

        let foreign: Vec<CloudResource> = routes
            .into_iter()
            .filter(|route| !route.name.starts_with(DEFAULT_ROUTE_PREFIX))
            .collect();
        self.track(ResourceType::Route, foreign);

        let attached: Vec<CloudResource> = self
            .tracker
            .list(ResourceType::Route)
            .into_iter()
            .filter(|route| filter.matches(route))
            .collect();
        self.delete_items(ResourceType::Route, attached.clone(), report)
            .await?;

        Ok(attached
            .iter()
            .all(|route| !self.tracker.contains(ResourceType::Route, &route.key)))
    }
}
