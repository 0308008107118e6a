//! Networking (Neutron).

use super::Service;
use crate::{
    Result,
    aggregate::{AggregateIndex, MissDefault},
    exporter::{Collect, CollectContext, MetricDef},
    resources::{Networks, Ports, Routers, Subnets, flag},
    sample::Samples,
    status::{NETWORK, PORT},
};
use async_trait::async_trait;

const LB_DEVICE_OWNER: &str = "neutron:LOADBALANCERV2";

pub static NEUTRON: Service = Service {
    service_type: "network",
    name: "neutron",
    all_projects: false,
    metrics: &[
        MetricDef::new("networks", "networks", &[]).collect(&ListNetworks),
        MetricDef::new(
            "network_status",
            "network_status",
            &["id", "name", "status", "tenant_id", "shared", "external"],
        ),
        MetricDef::new("subnets", "subnets", &[]).collect(&ListSubnets),
        MetricDef::new("ports", "ports", &[]).collect(&PortsAndNetworks),
        MetricDef::new(
            "port_status",
            "port_status",
            &[
                "id",
                "name",
                "status",
                "network_id",
                "device_owner",
                "mac_address",
                "admin_state_up",
            ],
        ),
        MetricDef::new("ports_no_ips", "ports_no_ips", &[]),
        MetricDef::new("ports_lb_not_active", "ports_lb_not_active", &[]).deprecated("0.2"),
        MetricDef::new("network_ports", "network_ports", &["network_id", "network_name"]).slow(),
        MetricDef::new("routers", "routers", &[]).collect(&ListRouters),
        MetricDef::new(
            "router",
            "router",
            &["id", "name", "status", "admin_state_up", "tenant_id", "external_network_id"],
        ),
        MetricDef::new("routers_not_active", "routers_not_active", &[]),
    ],
};

struct ListNetworks;

#[async_trait]
impl Collect for ListNetworks {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let networks = ctx.list::<Networks>(ctx.list_options()).await?;
        out.gauge("networks", networks.len() as f64, &[])?;

        for net in &networks {
            out.gauge(
                "network_status",
                NETWORK.ordinal(&net.status) as f64,
                &[
                    net.id.as_str(),
                    &net.name,
                    &net.status,
                    &net.project_id,
                    flag(net.shared),
                    flag(net.external),
                ],
            )?;
        }

        Ok(())
    }
}

struct ListSubnets;

#[async_trait]
impl Collect for ListSubnets {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let subnets = ctx.list::<Subnets>(ctx.list_options()).await?;
        out.gauge("subnets", subnets.len() as f64, &[])
    }
}

/// One sample per router, value 1, plus how many are not ACTIVE.
struct ListRouters;

#[async_trait]
impl Collect for ListRouters {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let routers = ctx.list::<Routers>(ctx.list_options()).await?;
        out.gauge("routers", routers.len() as f64, &[])?;

        let not_active = routers
            .iter()
            .filter(|router| !router.status.eq_ignore_ascii_case("active"))
            .count();
        out.gauge("routers_not_active", not_active as f64, &[])?;

        for router in &routers {
            out.gauge(
                "router",
                1.0,
                &[
                    router.id.as_str(),
                    &router.name,
                    &router.status,
                    flag(router.admin_state_up),
                    &router.project_id,
                    router.external_network_id(),
                ],
            )?;
        }

        Ok(())
    }
}

/// Ports, their statuses, and ports per network.
struct PortsAndNetworks;

#[async_trait]
impl Collect for PortsAndNetworks {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let ports = ctx.list::<Ports>(ctx.list_options()).await?;
        out.gauge("ports", ports.len() as f64, &[])?;

        let no_ips = ports.iter().filter(|port| port.fixed_ips.is_empty()).count();
        out.gauge("ports_no_ips", no_ips as f64, &[])?;

        let lb_not_active = ports
            .iter()
            .filter(|port| port.device_owner == LB_DEVICE_OWNER && PORT.ordinal(&port.status) != 0)
            .count();
        out.gauge("ports_lb_not_active", lb_not_active as f64, &[])?;

        for port in &ports {
            out.gauge(
                "port_status",
                PORT.ordinal(&port.status) as f64,
                &[
                    port.id.as_str(),
                    &port.name,
                    &port.status,
                    &port.network_id,
                    &port.device_owner,
                    &port.mac_address,
                    flag(port.admin_state_up),
                ],
            )?;
        }

        if !out.is_active("network_ports") {
            return Ok(());
        }

        let per_network = AggregateIndex::build(&ports, |port| port.network_id.as_str());
        let networks = ctx.list::<Networks>(ctx.list_options()).await?;
        for net in &networks {
            // networks without ports are already visible through network_status
            if let Some(count) = per_network.lookup(&net.id, MissDefault::Omit) {
                out.gauge("network_ports", count as f64, &[&net.id, &net.name])?;
            }
        }

        Ok(())
    }
}
