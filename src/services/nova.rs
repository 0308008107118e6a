//! Compute (Nova).

use super::Service;
use crate::{
    Result,
    exporter::{Collect, CollectContext, MetricDef},
    resources::{Flavors, Servers, flag},
    sample::Samples,
    status::SERVER,
};
use async_trait::async_trait;

pub static NOVA: Service = Service {
    service_type: "compute",
    name: "nova",
    // compute takes `all_tenants` as a query parameter instead
    all_projects: false,
    metrics: &[
        MetricDef::new("flavors", "flavors", &[]).collect(&ListFlavors),
        MetricDef::new(
            "flavor",
            "flavor",
            &["id", "name", "vcpus", "ram", "disk", "is_public"],
        ),
        MetricDef::new("total_vms", "total_vms", &[]).collect(&ListServers),
        MetricDef::new(
            "server_status",
            "server_status",
            &[
                "id",
                "name",
                "status",
                "tenant_id",
                "user_id",
                "host_id",
                "availability_zone",
                "flavor_id",
            ],
        ),
    ],
};

struct ListFlavors;

#[async_trait]
impl Collect for ListFlavors {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let opts = ctx.list_options().filter("is_public", "None");
        let flavors = ctx.list::<Flavors>(opts).await?;
        out.gauge("flavors", flavors.len() as f64, &[])?;

        for flavor in &flavors {
            out.gauge(
                "flavor",
                1.0,
                &[
                    flavor.id.as_str(),
                    &flavor.name,
                    &flavor.vcpus.to_string(),
                    &flavor.ram.to_string(),
                    &flavor.disk.to_string(),
                    flag(flavor.is_public),
                ],
            )?;
        }

        Ok(())
    }
}

/// Servers of every project, with their status as the value.
struct ListServers;

#[async_trait]
impl Collect for ListServers {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let opts = ctx.list_options().filter("all_tenants", "true");
        let servers = ctx.list::<Servers>(opts).await?;
        out.gauge("total_vms", servers.len() as f64, &[])?;

        for server in &servers {
            out.gauge(
                "server_status",
                SERVER.ordinal(&server.status) as f64,
                &[
                    server.id.as_str(),
                    &server.name,
                    &server.status,
                    &server.tenant_id,
                    &server.user_id,
                    &server.host_id,
                    &server.availability_zone,
                    &server.flavor.id,
                ],
            )?;
        }

        Ok(())
    }
}
