//! Bare metal (Ironic).

use super::Service;
use crate::{
    Result,
    exporter::{Collect, CollectContext, MetricDef},
    resources::{Nodes, flag},
    sample::Samples,
};
use async_trait::async_trait;

pub static IRONIC: Service = Service {
    service_type: "baremetal",
    name: "ironic",
    all_projects: false,
    metrics: &[MetricDef::new(
        "node",
        "node",
        &[
            "id",
            "name",
            "provision_state",
            "power_state",
            "maintenance",
            "console_enabled",
            "resource_class",
            "retired",
            "retired_reason",
            "deploy_kernel",
            "deploy_ramdisk",
        ],
    )
    .collect(&ListNodes)],
};

/// One sample per node, value 1, with the node's state as labels.
struct ListNodes;

#[async_trait]
impl Collect for ListNodes {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let nodes = ctx.list::<Nodes>(ctx.list_options()).await?;

        for node in &nodes {
            out.gauge(
                "node",
                1.0,
                &[
                    node.id.as_str(),
                    node.name.as_deref().unwrap_or_default(),
                    node.provision_state.as_deref().unwrap_or_default(),
                    node.power_state.as_deref().unwrap_or_default(),
                    flag(node.maintenance),
                    flag(node.console_enabled),
                    node.resource_class.as_deref().unwrap_or_default(),
                    flag(node.retired),
                    node.retired_reason.as_deref().unwrap_or_default(),
                    node.driver_info("deploy_kernel"),
                    node.driver_info("deploy_ramdisk"),
                ],
            )?;
        }

        Ok(())
    }
}
