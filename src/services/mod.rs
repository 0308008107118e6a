//! Metric tables for each supported cloud service.

mod designate;
mod glance;
mod ironic;
mod neutron;
mod nova;
mod placement;

use crate::{Error, Result, exporter::MetricDef};

/// A cloud service the exporter knows how to collect from.
#[derive(Debug)]
pub struct Service {
    /// Service type as used in endpoint configuration, e.g. `dns`.
    pub service_type: &'static str,
    /// Project name used in metric names, e.g. `designate`.
    pub name: &'static str,
    /// Whether listings should span every project.
    pub all_projects: bool,
    pub metrics: &'static [MetricDef],
}

pub use designate::DESIGNATE;
pub use glance::GLANCE;
pub use ironic::IRONIC;
pub use neutron::NEUTRON;
pub use nova::NOVA;
pub use placement::PLACEMENT;

/// Every supported service.
pub static SERVICES: &[&Service] = &[&DESIGNATE, &IRONIC, &NEUTRON, &NOVA, &GLANCE, &PLACEMENT];

/// Find a service by type (`dns`) or project name (`designate`).
pub fn lookup(name: &str) -> Result<&'static Service> {
    SERVICES
        .iter()
        .copied()
        .find(|service| service.service_type == name || service.name == name)
        .ok_or_else(|| Error::UnknownService(name.to_owned()))
}
