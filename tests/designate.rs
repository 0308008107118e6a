use cloud_exporter::{
    Batch, Error, Policy, ServiceExporter,
    client::ALL_PROJECTS_HEADER,
    exporter::CycleReport,
    mock::MockCloud,
    resources::{RecordSets, Zones},
    services::DESIGNATE,
};
use serde_json::{Value, json};
use std::{collections::HashSet, time::Duration};
use tokio::time::Instant;

fn zone(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "ACTIVE",
        "project_id": "p1",
        "type": "PRIMARY",
    })
}

fn recordset(n: usize, zone_name: &str) -> Value {
    json!({
        "id": format!("rs-{n}"),
        "name": format!("host{n}.{zone_name}"),
        "status": if n % 2 == 0 { "ACTIVE" } else { "PENDING" },
        "zone_id": format!("z-{zone_name}"),
        "zone_name": zone_name,
        "type": "A",
    })
}

async fn collect(cloud: &MockCloud, policy: &Policy) -> CycleReport {
    let exporter = ServiceExporter::new(&DESIGNATE, "openstack", policy, false).unwrap();
    exporter
        .collect(cloud, Instant::now() + Duration::from_secs(30))
        .await
}

fn group<'a>(report: &'a CycleReport, name: &str) -> Option<&'a Batch> {
    report.batches.iter().find(|batch| batch.group() == name)
}

fn up(report: &CycleReport) -> f64 {
    group(report, "up").unwrap()[0].value
}

#[tokio::test]
async fn recordsets_across_pages() {
    let recordsets: Vec<_> = (0..250).map(|n| recordset(n, "a.")).collect();
    let cloud = MockCloud::new()
        .with_listing::<Zones>(vec![zone("z-a.", "a.")], 50)
        .with_listing::<RecordSets>(recordsets, 100);

    let report = collect(&cloud, &Policy::default()).await;
    assert!(report.is_healthy());
    assert_eq!(up(&report), 1.0);

    let zones = group(&report, "zones").unwrap();
    let statuses: Vec<_> = zones
        .iter()
        .filter(|s| s.name == "openstack_designate_recordsets_status")
        .collect();
    assert_eq!(statuses.len(), 250);

    let ids: HashSet<_> = statuses.iter().map(|s| s.label("id").unwrap()).collect();
    assert_eq!(ids.len(), 250);

    // ACTIVE is 1, PENDING is 0
    let active = statuses.iter().filter(|s| s.value == 1.0).count();
    assert_eq!(active, 125);

    let count = zones
        .iter()
        .find(|s| s.name == "openstack_designate_recordsets")
        .unwrap();
    assert_eq!(count.value, 250.0);

    // 3 pages of recordsets, 1 of zones
    let requests = cloud.requests();
    assert_eq!(requests.len(), 4);
}

#[tokio::test]
async fn failed_page_drops_the_whole_group() {
    let recordsets: Vec<_> = (0..250).map(|n| recordset(n, "a.")).collect();
    let cloud = MockCloud::new()
        .with_listing::<Zones>(vec![zone("z-a.", "a.")], 50)
        .with_listing::<RecordSets>(recordsets, 100)
        .fail_on_page::<RecordSets>(1);

    let report = collect(&cloud, &Policy::default()).await;

    assert!(group(&report, "zones").unwrap().is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].group, "zones");
    assert_eq!(up(&report), 0.0);
    // only the up sample survives
    assert_eq!(report.sample_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_between_pages_drops_the_group() {
    let zones = vec![zone("z-a.", "a."), zone("z-b.", "b."), zone("z-c.", "c.")];
    let cloud = MockCloud::new()
        .with_listing::<Zones>(zones, 1)
        .with_listing::<RecordSets>(Vec::new(), 10)
        .with_delay(Duration::from_secs(10));
    let exporter =
        ServiceExporter::new(&DESIGNATE, "openstack", &Policy::default(), false).unwrap();

    // page 1 arrives at 10s, page 2 would arrive at 20s
    let report = exporter
        .collect(&cloud, Instant::now() + Duration::from_secs(15))
        .await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].group, "zones");
    assert!(matches!(report.failures[0].error, Error::Timeout(_)));
    assert!(group(&report, "zones").unwrap().is_empty());
    assert_eq!(report.sample_count(), 1);
    assert_eq!(up(&report), 0.0);

    // the second page was asked for, the third never was
    assert_eq!(cloud.requests().len(), 2);
}

#[tokio::test]
async fn recordsets_counted_per_zone() {
    let cloud = MockCloud::new()
        .with_listing::<Zones>(
            vec![zone("z-a.", "a."), zone("z-b.", "b."), zone("z-c.", "c.")],
            2,
        )
        .with_listing::<RecordSets>(
            vec![recordset(0, "a."), recordset(1, "a."), recordset(2, "b.")],
            2,
        );

    let report = collect(&cloud, &Policy::default()).await;
    let zones = group(&report, "zones").unwrap();

    let counts: Vec<_> = zones
        .iter()
        .filter(|s| s.name == "openstack_designate_recordsets")
        .map(|s| (s.label("zone_name").unwrap(), s.value))
        .collect();
    assert_eq!(counts, [("a.", 2.0), ("b.", 1.0), ("c.", 0.0)]);

    let total = zones
        .iter()
        .find(|s| s.name == "openstack_designate_zones")
        .unwrap();
    assert_eq!(total.value, 3.0);
}

#[tokio::test]
async fn lists_every_project() {
    let cloud = MockCloud::new()
        .with_listing::<Zones>(vec![zone("z-a.", "a.")], 10)
        .with_listing::<RecordSets>(Vec::new(), 10);

    collect(&cloud, &Policy::default()).await;

    let requests = cloud.requests();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| r.all_projects && r.service == "dns"));
    assert_eq!(ALL_PROJECTS_HEADER, "x-auth-all-projects");
}

#[tokio::test]
async fn disabled_recordset_metrics_skip_the_listing() {
    let policy = Policy {
        disabled_metrics: ["designate-recordsets", "designate-recordsets_status"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..Policy::default()
    };
    // no recordset listing registered: asking for it would fail the group
    let cloud = MockCloud::new().with_listing::<Zones>(vec![zone("z-a.", "a.")], 10);

    let report = collect(&cloud, &policy).await;
    assert!(report.is_healthy());

    let zones = group(&report, "zones").unwrap();
    assert!(zones.iter().all(|s| !s.name.contains("recordsets")));
    assert_eq!(cloud.requests().len(), 1);
}
