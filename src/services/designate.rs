//! DNS (Designate).

use super::Service;
use crate::{
    Result,
    aggregate::{AggregateIndex, MissDefault},
    exporter::{Collect, CollectContext, MetricDef},
    resources::{RecordSets, Zones},
    sample::Samples,
    status::{RECORDSET, ZONE},
};
use async_trait::async_trait;

/// Page size for the recordset listing.
const RECORDSET_PAGE: u32 = 1000;

pub static DESIGNATE: Service = Service {
    service_type: "dns",
    name: "designate",
    // zones of every project, not only the token's
    all_projects: true,
    metrics: &[
        MetricDef::new("zones", "zones", &[]).collect(&ZonesAndRecordsets),
        MetricDef::new(
            "zone_status",
            "zone_status",
            &["id", "name", "status", "tenant_id", "type"],
        ),
        MetricDef::new("recordsets", "recordsets", &["zone_id", "zone_name", "tenant_id"]),
        MetricDef::new(
            "recordsets_status",
            "recordsets_status",
            &["id", "name", "status", "zone_id", "zone_name", "type"],
        ),
    ],
};

/// Zones, their statuses, and recordsets per zone.
///
/// Recordsets are listed once across all zones and counted per zone name,
/// rather than listed zone by zone.
struct ZonesAndRecordsets;

#[async_trait]
impl Collect for ZonesAndRecordsets {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let zones = ctx.list::<Zones>(ctx.list_options()).await?;
        out.gauge("zones", zones.len() as f64, &[])?;

        let recordsets = if out.is_active("recordsets") || out.is_active("recordsets_status") {
            ctx.list::<RecordSets>(ctx.list_options().limit(RECORDSET_PAGE))
                .await?
        } else {
            Vec::new()
        };
        let per_zone = AggregateIndex::build(&recordsets, |rs| rs.zone_name.as_str());

        for rs in &recordsets {
            out.gauge(
                "recordsets_status",
                RECORDSET.ordinal(&rs.status) as f64,
                &[&rs.id, &rs.name, &rs.status, &rs.zone_id, &rs.zone_name, &rs.kind],
            )?;
        }

        for zone in &zones {
            // every zone gets a count, zones without recordsets report 0
            if let Some(count) = per_zone.lookup(&zone.name, MissDefault::Zero) {
                out.gauge(
                    "recordsets",
                    count as f64,
                    &[&zone.id, &zone.name, &zone.project_id],
                )?;
            }
            out.gauge(
                "zone_status",
                ZONE.ordinal(&zone.status) as f64,
                &[&zone.id, &zone.name, &zone.status, &zone.project_id, &zone.kind],
            )?;
        }

        Ok(())
    }
}
