//! Remote resources and how to list them.
//!
//! Entities only keep the fields that end up as metric values or labels.

use crate::paginate::{Pagination, ResourceKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A DNS zone.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A DNS recordset. `zone_name` ties it to its [`Zone`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RecordSet {
    pub id: String,
    pub name: String,
    pub status: String,
    pub zone_id: String,
    pub zone_name: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A bare-metal node.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Node {
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: Option<String>,
    pub provision_state: Option<String>,
    pub power_state: Option<String>,
    #[serde(default)]
    pub maintenance: bool,
    #[serde(default)]
    pub console_enabled: bool,
    pub resource_class: Option<String>,
    #[serde(default)]
    pub retired: bool,
    pub retired_reason: Option<String>,
    #[serde(default)]
    pub driver_info: Value,
}

impl Node {
    /// A string entry of the node's driver info, or empty.
    pub fn driver_info(&self, key: &str) -> &str {
        self.driver_info
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// A Neutron network.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(rename = "router:external", default)]
    pub external: bool,
}

/// A Neutron subnet, owned by a [`Network`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub network_id: String,
    #[serde(default)]
    pub cidr: String,
}

/// A fixed IP assigned to a port.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FixedIp {
    pub subnet_id: String,
    pub ip_address: String,
}

/// A Neutron port, attached to a [`Network`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    pub network_id: String,
    #[serde(default)]
    pub device_owner: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

/// Where a router's gateway leads.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GatewayInfo {
    #[serde(default)]
    pub network_id: String,
}

/// A Neutron router.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Router {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub project_id: String,
    pub external_gateway_info: Option<GatewayInfo>,
}

impl Router {
    pub fn external_network_id(&self) -> &str {
        self.external_gateway_info
            .as_ref()
            .map_or("", |gateway| gateway.network_id.as_str())
    }
}

/// A compute flavor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub vcpus: u32,
    /// MiB.
    pub ram: u64,
    /// GiB.
    pub disk: u64,
    #[serde(rename = "os-flavor-access:is_public", default = "public")]
    pub is_public: bool,
}

fn public() -> bool {
    true
}

/// The flavor a server was booted from. Recent compute APIs embed the
/// flavor without its id.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ServerFlavor {
    #[serde(default)]
    pub id: String,
}

/// A compute instance.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "hostId", default)]
    pub host_id: String,
    #[serde(rename = "OS-EXT-AZ:availability_zone", default)]
    pub availability_zone: String,
    #[serde(default)]
    pub flavor: ServerFlavor,
}

/// A Glance image.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub owner: String,
    /// Bytes. Unset until data is uploaded.
    pub size: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// A placement resource provider, typically one hypervisor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResourceProvider {
    pub uuid: String,
    pub name: String,
}

/// Capacity of one resource class on a provider.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Inventory {
    pub total: f64,
    #[serde(default)]
    pub reserved: f64,
    #[serde(default = "unit_ratio")]
    pub allocation_ratio: f64,
}

fn unit_ratio() -> f64 {
    1.0
}

/// Body of `resource_providers/{uuid}/inventories`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Inventories {
    pub inventories: BTreeMap<String, Inventory>,
}

/// Body of `resource_providers/{uuid}/usages`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Usages {
    pub usages: BTreeMap<String, f64>,
}

/// Renders a bool the way label values expect it.
pub(crate) fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

pub struct Zones;

impl ResourceKind for Zones {
    type Entity = Zone;
    const SERVICE: &'static str = "dns";
    const PATH: &'static str = "v2/zones";
    const COLLECTION_KEY: &'static str = "zones";
    const PAGINATION: Pagination = Pagination::Linked;
}

/// Recordsets of every zone, in one listing.
pub struct RecordSets;

impl ResourceKind for RecordSets {
    type Entity = RecordSet;
    const SERVICE: &'static str = "dns";
    const PATH: &'static str = "v2/recordsets";
    const COLLECTION_KEY: &'static str = "recordsets";
    const PAGINATION: Pagination = Pagination::Linked;
}

pub struct Nodes;

impl ResourceKind for Nodes {
    type Entity = Node;
    const SERVICE: &'static str = "baremetal";
    const PATH: &'static str = "v1/nodes/detail";
    const COLLECTION_KEY: &'static str = "nodes";
    const PAGINATION: Pagination = Pagination::NextField;
    // retired/retired_reason need 1.61
    const HEADERS: &'static [(&'static str, &'static str)] =
        &[("x-openstack-ironic-api-version", "1.87")];
}

pub struct Networks;

impl ResourceKind for Networks {
    type Entity = Network;
    const SERVICE: &'static str = "network";
    const PATH: &'static str = "v2.0/networks";
    const COLLECTION_KEY: &'static str = "networks";
    const PAGINATION: Pagination = Pagination::RelLinks("networks_links");
}

pub struct Subnets;

impl ResourceKind for Subnets {
    type Entity = Subnet;
    const SERVICE: &'static str = "network";
    const PATH: &'static str = "v2.0/subnets";
    const COLLECTION_KEY: &'static str = "subnets";
    const PAGINATION: Pagination = Pagination::RelLinks("subnets_links");
}

pub struct Ports;

impl ResourceKind for Ports {
    type Entity = Port;
    const SERVICE: &'static str = "network";
    const PATH: &'static str = "v2.0/ports";
    const COLLECTION_KEY: &'static str = "ports";
    const PAGINATION: Pagination = Pagination::RelLinks("ports_links");
}

pub struct Routers;

impl ResourceKind for Routers {
    type Entity = Router;
    const SERVICE: &'static str = "network";
    const PATH: &'static str = "v2.0/routers";
    const COLLECTION_KEY: &'static str = "routers";
    const PAGINATION: Pagination = Pagination::RelLinks("routers_links");
}

pub struct Flavors;

impl ResourceKind for Flavors {
    type Entity = Flavor;
    const SERVICE: &'static str = "compute";
    const PATH: &'static str = "flavors/detail";
    const COLLECTION_KEY: &'static str = "flavors";
    const PAGINATION: Pagination = Pagination::RelLinks("flavors_links");
}

pub struct Servers;

impl ResourceKind for Servers {
    type Entity = Server;
    const SERVICE: &'static str = "compute";
    const PATH: &'static str = "servers/detail";
    const COLLECTION_KEY: &'static str = "servers";
    const PAGINATION: Pagination = Pagination::RelLinks("servers_links");
}

/// Glance hands out next links relative to the endpoint host.
pub struct Images;

impl ResourceKind for Images {
    type Entity = Image;
    const SERVICE: &'static str = "image";
    const PATH: &'static str = "v2/images";
    const COLLECTION_KEY: &'static str = "images";
    const PAGINATION: Pagination = Pagination::NextField;
}

pub struct ResourceProviders;

impl ResourceKind for ResourceProviders {
    type Entity = ResourceProvider;
    const SERVICE: &'static str = "placement";
    const PATH: &'static str = "resource_providers";
    const COLLECTION_KEY: &'static str = "resource_providers";
    const PAGINATION: Pagination = Pagination::Unpaged;
}
