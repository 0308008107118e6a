//! Images (Glance).

use super::Service;
use crate::{
    Result,
    exporter::{Collect, CollectContext, MetricDef},
    resources::Images,
    sample::Samples,
};
use async_trait::async_trait;

pub static GLANCE: Service = Service {
    service_type: "image",
    name: "glance",
    all_projects: false,
    metrics: &[
        MetricDef::new("images", "images", &[]).collect(&ListImages),
        MetricDef::new("image_bytes", "image_bytes", &["id", "name", "tenant_id"]),
        MetricDef::new(
            "image_created_at",
            "image_created_at",
            &["id", "name", "tenant_id", "visibility", "status"],
        ),
    ],
};

/// Image count, sizes, and creation times as unix seconds.
struct ListImages;

#[async_trait]
impl Collect for ListImages {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()> {
        let images = ctx.list::<Images>(ctx.list_options()).await?;
        out.gauge("images", images.len() as f64, &[])?;

        for image in &images {
            let name = image.name.as_deref().unwrap_or_default();
            out.gauge(
                "image_bytes",
                image.size.unwrap_or_default() as f64,
                &[image.id.as_str(), name, &image.owner],
            )?;
            out.gauge(
                "image_created_at",
                image.created_at.timestamp() as f64,
                &[
                    image.id.as_str(),
                    name,
                    &image.owner,
                    &image.visibility,
                    &image.status,
                ],
            )?;
        }

        Ok(())
    }
}
