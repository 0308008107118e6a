use cloud_exporter::{
    Policy, ServiceExporter,
    exporter::CycleReport,
    mock::MockCloud,
    resources::{Networks, Nodes, Ports, Routers, Subnets},
    services::{IRONIC, NEUTRON},
};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::Instant;

fn network(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "ACTIVE",
        "project_id": "p1",
        "shared": false,
        "router:external": true,
    })
}

fn port(id: &str, network_id: &str, owner: &str, status: &str, ips: usize) -> Value {
    let fixed_ips: Vec<_> = (0..ips)
        .map(|n| json!({ "subnet_id": "s1", "ip_address": format!("10.0.0.{n}") }))
        .collect();
    json!({
        "id": id,
        "name": "",
        "status": status,
        "network_id": network_id,
        "device_owner": owner,
        "mac_address": "fa:16:3e:00:00:01",
        "admin_state_up": true,
        "fixed_ips": fixed_ips,
    })
}

fn neutron() -> MockCloud {
    MockCloud::new()
        .with_listing::<Networks>(
            vec![network("n1", "public"), network("n2", "private"), network("n3", "empty")],
            2,
        )
        .with_listing::<Subnets>(
            vec![json!({ "id": "s1", "name": "sub", "network_id": "n1", "cidr": "10.0.0.0/24" })],
            10,
        )
        .with_listing::<Ports>(
            vec![
                port("p1", "n1", "compute:nova", "ACTIVE", 1),
                port("p2", "n1", "neutron:LOADBALANCERV2", "DOWN", 1),
                port("p3", "n2", "neutron:LOADBALANCERV2", "ACTIVE", 0),
            ],
            2,
        )
        .with_listing::<Routers>(
            vec![
                json!({
                    "id": "r1",
                    "name": "edge",
                    "status": "ACTIVE",
                    "admin_state_up": true,
                    "project_id": "p1",
                    "external_gateway_info": { "network_id": "n1", "enable_snat": true },
                }),
                json!({
                    "id": "r2",
                    "name": "",
                    "status": "ERROR",
                    "admin_state_up": false,
                    "project_id": "p2",
                    "external_gateway_info": null,
                }),
            ],
            1,
        )
}

async fn collect(cloud: &MockCloud, exporter: &ServiceExporter) -> CycleReport {
    exporter
        .collect(cloud, Instant::now() + Duration::from_secs(30))
        .await
}

fn value(report: &CycleReport, name: &str) -> Vec<(Vec<String>, f64)> {
    report
        .batches
        .iter()
        .flat_map(|batch| batch.iter())
        .filter(|s| s.name == name)
        .map(|s| (s.labels.clone(), s.value))
        .collect()
}

#[tokio::test]
async fn neutron_cycle() {
    let cloud = neutron();
    let exporter = ServiceExporter::new(&NEUTRON, "openstack", &Policy::default(), false).unwrap();
    let report = collect(&cloud, &exporter).await;
    assert!(report.is_healthy(), "{:?}", report.failures);

    assert_eq!(value(&report, "openstack_neutron_networks")[0].1, 3.0);
    assert_eq!(value(&report, "openstack_neutron_subnets")[0].1, 1.0);
    assert_eq!(value(&report, "openstack_neutron_ports")[0].1, 3.0);
    assert_eq!(value(&report, "openstack_neutron_ports_no_ips")[0].1, 1.0);
    assert_eq!(value(&report, "openstack_neutron_ports_lb_not_active")[0].1, 1.0);

    // ACTIVE 0, DOWN 2
    let statuses: Vec<_> = value(&report, "openstack_neutron_port_status")
        .into_iter()
        .map(|(labels, value)| (labels[0].clone(), value))
        .collect();
    assert_eq!(
        statuses,
        [
            ("p1".to_owned(), 0.0),
            ("p2".to_owned(), 2.0),
            ("p3".to_owned(), 0.0)
        ]
    );

    let external = &value(&report, "openstack_neutron_network_status")[0].0;
    assert_eq!(external[4..], ["false", "true"]);
}

#[tokio::test]
async fn routers_with_and_without_gateway() {
    let cloud = neutron();
    let exporter = ServiceExporter::new(&NEUTRON, "openstack", &Policy::default(), false).unwrap();
    let report = collect(&cloud, &exporter).await;
    assert!(report.is_healthy(), "{:?}", report.failures);

    assert_eq!(value(&report, "openstack_neutron_routers")[0].1, 2.0);
    assert_eq!(value(&report, "openstack_neutron_routers_not_active")[0].1, 1.0);
    let routers = value(&report, "openstack_neutron_router");
    assert_eq!(routers.len(), 2);
    assert_eq!(routers[0].0, ["r1", "edge", "ACTIVE", "true", "p1", "n1"]);
    assert_eq!(routers[1].0, ["r2", "", "ERROR", "false", "p2", ""]);
    assert!(routers.iter().all(|(_, value)| *value == 1.0));

    // one page per router
    let router_pages = cloud
        .requests()
        .iter()
        .filter(|r| format!("{:?}", r.target).contains("v2.0/routers"))
        .count();
    assert_eq!(router_pages, 2);
}

#[tokio::test]
async fn network_ports_omit_networks_without_ports() {
    let cloud = neutron();
    let exporter = ServiceExporter::new(&NEUTRON, "openstack", &Policy::default(), false).unwrap();
    let report = collect(&cloud, &exporter).await;

    let per_network = value(&report, "openstack_neutron_network_ports");
    assert_eq!(
        per_network,
        [
            (vec!["n1".to_owned(), "public".to_owned()], 2.0),
            (vec!["n2".to_owned(), "private".to_owned()], 1.0),
        ]
    );
}

#[tokio::test]
async fn slow_and_deprecated_metrics_can_be_disabled() {
    let cloud = neutron();
    let policy = Policy {
        disable_slow: true,
        disable_deprecated: true,
        ..Policy::default()
    };
    let exporter = ServiceExporter::new(&NEUTRON, "openstack", &policy, false).unwrap();
    let report = collect(&cloud, &exporter).await;

    assert!(report.is_healthy());
    assert!(value(&report, "openstack_neutron_network_ports").is_empty());
    assert!(value(&report, "openstack_neutron_ports_lb_not_active").is_empty());
    assert_eq!(value(&report, "openstack_neutron_ports")[0].1, 3.0);

    // only the networks group lists networks once network_ports is off
    let network_listings = cloud
        .requests()
        .iter()
        .filter(|r| format!("{:?}", r.target).contains("v2.0/networks"))
        .count();
    assert_eq!(network_listings, 2);
}

#[tokio::test]
async fn ironic_nodes() {
    let cloud = MockCloud::new().with_listing::<Nodes>(
        vec![
            json!({
                "uuid": "node-1",
                "name": "rack1-u01",
                "provision_state": "active",
                "power_state": "power on",
                "maintenance": false,
                "console_enabled": true,
                "resource_class": "baremetal",
                "retired": false,
                "retired_reason": null,
                "driver_info": { "deploy_kernel": "kernel", "deploy_ramdisk": "ramdisk" },
            }),
            json!({ "uuid": "node-2", "name": null, "provision_state": "enroll" }),
        ],
        1,
    );
    let exporter = ServiceExporter::new(&IRONIC, "openstack", &Policy::default(), false).unwrap();
    let report = collect(&cloud, &exporter).await;
    assert!(report.is_healthy());

    let nodes = value(&report, "openstack_ironic_node");
    assert_eq!(nodes.len(), 2);
    assert_eq!(
        nodes[0].0,
        [
            "node-1", "rack1-u01", "active", "power on", "false", "true", "baremetal", "false", "",
            "kernel", "ramdisk",
        ]
    );
    assert_eq!(nodes[1].0[1], "");
    assert!(nodes.iter().all(|(_, value)| *value == 1.0));

    let requests = cloud.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| !r.all_projects));
    assert!(
        requests[0]
            .headers
            .contains(&("x-openstack-ironic-api-version", "1.87"))
    );
}
