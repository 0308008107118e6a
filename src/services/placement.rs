//! Placement.

use super::Service;
use crate::{
    Error, Result,
    exporter::{Collect, CollectContext, MetricDef},
    resources::{Inventories, ResourceProviders, Usages},
    sample::Samples,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

const LABELS: &[&str] = &["hostname", "resourcetype"];

pub static PLACEMENT: Service = Service {
    service_type: "placement",
    name: "placement",
    all_projects: false,
    metrics: &[
        MetricDef::new("resource_total", "resource_total", LABELS).collect(&ProviderResources),
        MetricDef::new("resource_allocation_ratio", "resource_allocation_ratio", LABELS),
        MetricDef::new("resource_reserved", "resource_reserved", LABELS),
        MetricDef::new("resource_usage", "resource_usage", LABELS),
    ],
};

async fn fetch<T: DeserializeOwned>(
    ctx: &CollectContext<'_>,
    uuid: &str,
    what: &'static str,
) -> Result<T> {
    let path = format!("resource_providers/{uuid}/{what}");
    let body = ctx.get(PLACEMENT.service_type, path, &[]).await?;
    serde_json::from_value(body).map_err(|source| Error::Decode { what, source })
}

/// Inventory and usage of every resource class, per provider. Two extra
/// requests per provider.
struct ProviderResources;

#[async_trait]
impl Collect for ProviderResources {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let providers = ctx.list::<ResourceProviders>(ctx.list_options()).await?;

        for provider in &providers {
            let inventories: Inventories = fetch(ctx, &provider.uuid, "inventories").await?;
            let usages: Usages = fetch(ctx, &provider.uuid, "usages").await?;
            debug!(
                provider = %provider.name,
                classes = inventories.inventories.len(),
                "provider resources"
            );

            for (class, inventory) in &inventories.inventories {
                let labels = [provider.name.as_str(), class.as_str()];
                out.gauge("resource_total", inventory.total, &labels)?;
                let ratio = inventory.allocation_ratio;
                out.gauge("resource_allocation_ratio", ratio, &labels)?;
                out.gauge("resource_reserved", inventory.reserved, &labels)?;

                let used = usages.usages.get(class).copied().unwrap_or_default();
                out.gauge("resource_usage", used, &labels)?;
            }
        }

        Ok(())
    }
}
