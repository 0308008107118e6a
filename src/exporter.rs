//! Service exporters: metric registration, filtering, and the collection
//! cycle.
//!
//! Each cloud service declares a static table of [`MetricDef`]s. A
//! definition that carries a [`Collect`] implementation starts a collection
//! group; the definitions after it without one are emitted by that same
//! function. [`ServiceExporter::new`] applies the [`Policy`] once, and
//! [`ServiceExporter::collect`] runs every active group with failures
//! isolated per group.

use crate::{
    CloudClient, Error, Result,
    paginate::{ListOptions, ResourceKind, get_document, list_all},
    sample::{Batch, MetricDesc, MetricSample, Samples},
    services::Service,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, error, info_span, instrument};

/// Per-exporter metric: 1 when the last cycle collected every group.
const UP: &str = "up";
/// Per-exporter metric: collection time per group, when enabled.
const COLLECT_DURATION: &str = "collect_duration_seconds";

/// A collection function. Lists what it needs through the context and emits
/// samples for its group.
#[async_trait]
pub trait Collect: Send + Sync {
    async fn collect(&self, ctx: &CollectContext<'_>, out: &mut Samples<'_>) -> Result<()>;
}

/// One entry of a service's metric table.
#[derive(Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub collect: Option<&'static dyn Collect>,
    pub deprecated_since: Option<&'static str>,
    /// Expensive to collect; dropped when slow metrics are disabled.
    pub slow: bool,
}

impl MetricDef {
    pub const fn new(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            collect: None,
            deprecated_since: None,
            slow: false,
        }
    }

    pub const fn collect(self, collect: &'static dyn Collect) -> Self {
        Self {
            collect: Some(collect),
            ..self
        }
    }

    pub const fn deprecated(self, since: &'static str) -> Self {
        Self {
            deprecated_since: Some(since),
            ..self
        }
    }

    pub const fn slow(self) -> Self {
        Self { slow: true, ..self }
    }
}

impl std::fmt::Debug for MetricDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricDef")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("collects", &self.collect.is_some())
            .field("deprecated_since", &self.deprecated_since)
            .field("slow", &self.slow)
            .finish()
    }
}

/// Registration decision for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Eligible,
    Disabled,
    Deprecated,
    Slow,
}

/// Which metrics to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Names in `<service>-<metric>` form, e.g. `designate-recordsets`.
    pub disabled_metrics: HashSet<String>,
    pub disable_slow: bool,
    pub disable_deprecated: bool,
}

impl Policy {
    pub fn decide(&self, service: &str, def: &MetricDef) -> Filter {
        if self
            .disabled_metrics
            .contains(&format!("{service}-{}", def.name))
        {
            Filter::Disabled
        } else if self.disable_deprecated && def.deprecated_since.is_some() {
            Filter::Deprecated
        } else if self.disable_slow && def.slow {
            Filter::Slow
        } else {
            Filter::Eligible
        }
    }
}

/// What collection functions get to work with.
pub struct CollectContext<'a> {
    client: &'a dyn CloudClient,
    all_projects: bool,
}

impl<'a> CollectContext<'a> {
    pub fn new(client: &'a dyn CloudClient, all_projects: bool) -> Self {
        Self {
            client,
            all_projects,
        }
    }

    /// Default list options for this exporter. Carries the all-projects
    /// capability when the service needs it.
    pub fn list_options(&self) -> ListOptions {
        ListOptions::default().all_projects(self.all_projects)
    }

    /// Fetch the complete listing of `K`.
    pub async fn list<K: ResourceKind>(&self, opts: ListOptions) -> Result<Vec<K::Entity>> {
        list_all::<K>(self.client, &opts).await
    }

    /// Fetch a single document from `service`, relative to its endpoint.
    pub async fn get(
        &self,
        service: &'static str,
        path: String,
        headers: &'static [(&'static str, &'static str)],
    ) -> Result<Value> {
        get_document(self.client, service, path, headers).await
    }
}

#[derive(Debug)]
struct Group {
    owner: &'static str,
    collect: &'static dyn Collect,
    active: bool,
}

impl std::fmt::Debug for dyn Collect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Collect")
    }
}

/// A group that failed during a cycle.
#[derive(Debug)]
pub struct GroupFailure {
    pub group: &'static str,
    pub error: Error,
}

/// Outcome of one collection cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// One batch per active group, plus the exporter's own batch. A failed
    /// group's batch is empty, which withdraws whatever it exported before.
    pub batches: Vec<Batch>,
    pub failures: Vec<GroupFailure>,
}

impl CycleReport {
    pub fn is_healthy(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.len()).sum()
    }
}

/// The exporter for one cloud service.
#[derive(Debug)]
pub struct ServiceExporter {
    service: &'static Service,
    metrics: HashMap<&'static str, MetricDesc>,
    groups: Vec<Group>,
    collect_time: bool,
}

impl ServiceExporter {
    /// Register `service`'s metrics under `prefix`, filtered by `policy`.
    ///
    /// Fails when the table declares a metric twice, or starts with a
    /// metric that has no collection function to emit it.
    pub fn new(
        service: &'static Service,
        prefix: &str,
        policy: &Policy,
        collect_time: bool,
    ) -> Result<Self> {
        let qualify = |metric: &str| format!("{prefix}_{}_{metric}", service.name);

        let mut metrics = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        for def in service.metrics {
            let filter = policy.decide(service.name, def);
            if filter != Filter::Eligible {
                debug!(service = service.name, metric = def.name, ?filter, "metric filtered");
            }

            let help = match def.deprecated_since {
                Some(since) => format!("{} (deprecated since {since})", def.help),
                None => def.help.to_owned(),
            };
            let desc = MetricDesc {
                short_name: def.name,
                name: qualify(def.name),
                help,
                labels: def.labels,
                filter,
            };
            if metrics.insert(def.name, desc).is_some() || def.name == UP {
                return Err(Error::DuplicateMetric(qualify(def.name)));
            }

            match def.collect {
                Some(collect) => groups.push(Group {
                    owner: def.name,
                    collect,
                    active: filter == Filter::Eligible,
                }),
                None => {
                    let Some(group) = groups.last_mut() else {
                        return Err(Error::Config(format!(
                            "metric {} has no collection function",
                            qualify(def.name)
                        )));
                    };
                    group.active |= filter == Filter::Eligible;
                }
            }
        }

        metrics.insert(
            UP,
            MetricDesc {
                short_name: UP,
                name: qualify(UP),
                help: UP.to_owned(),
                labels: &[],
                filter: Filter::Eligible,
            },
        );
        metrics.insert(
            COLLECT_DURATION,
            MetricDesc {
                short_name: COLLECT_DURATION,
                name: qualify(COLLECT_DURATION),
                help: "Time spent collecting each metric group".to_owned(),
                labels: &["group"],
                filter: if collect_time {
                    Filter::Eligible
                } else {
                    Filter::Disabled
                },
            },
        );

        Ok(Self {
            service,
            metrics,
            groups,
            collect_time,
        })
    }

    /// Build exporters for the named service types.
    pub fn for_services(
        names: &[String],
        prefix: &str,
        policy: &Policy,
        collect_time: bool,
    ) -> Result<Vec<Self>> {
        names
            .iter()
            .map(|name| {
                let service = crate::services::lookup(name)?;
                Self::new(service, prefix, policy, collect_time)
            })
            .collect()
    }

    pub fn service(&self) -> &'static Service {
        self.service
    }

    /// The registered descriptor for a metric of this exporter.
    pub fn metric(&self, short_name: &str) -> Option<&MetricDesc> {
        self.metrics.get(short_name)
    }

    /// Descriptors that will be emitted.
    pub fn active_metrics(&self) -> impl Iterator<Item = &MetricDesc> {
        self.metrics.values().filter(|desc| desc.is_active())
    }

    /// Owners of the groups that will run each cycle.
    pub fn active_groups(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups
            .iter()
            .filter(|group| group.active)
            .map(|group| group.owner)
    }

    /// Run one collection cycle.
    ///
    /// Groups run one after the other. A group that fails or runs past
    /// `deadline` contributes an empty batch; the others are unaffected.
    /// Once the deadline has passed, every remaining group is reported as
    /// timed out.
    #[instrument(skip_all, fields(service = self.service.name))]
    pub async fn collect(&self, client: &dyn CloudClient, deadline: Instant) -> CycleReport {
        let service = self.service.name;
        let ctx = CollectContext::new(client, self.service.all_projects);
        let started = Instant::now();

        let mut report = CycleReport::default();
        let mut own: Vec<MetricSample> = Vec::new();

        for group in self.groups.iter().filter(|group| group.active) {
            let group_started = Instant::now();
            let span = info_span!("collect_group", service, group = group.owner);

            let mut buffer: Vec<MetricSample> = Vec::new();
            let outcome = if group_started >= deadline {
                Err(Error::Timeout(started.elapsed()))
            } else {
                let mut samples = Samples::new(&self.metrics, &mut buffer);
                let collecting = group.collect.collect(&ctx, &mut samples);
                match timeout_at(deadline, collecting.instrument(span.clone())).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout(started.elapsed())),
                }
            };

            match outcome {
                Ok(()) => {
                    span.in_scope(|| debug!(samples = buffer.len(), "group collected"));
                    report
                        .batches
                        .push(Batch::new(service, group.owner, buffer, span));
                }
                Err(err) => {
                    span.in_scope(|| error!(error = %err, "metric collection failed"));
                    crate::metrics::record_failure(service, group.owner);
                    report
                        .batches
                        .push(Batch::new(service, group.owner, Vec::new(), span));
                    report.failures.push(GroupFailure {
                        group: group.owner,
                        error: err,
                    });
                }
            }

            if self.collect_time {
                let elapsed = group_started.elapsed().as_secs_f64();
                let mut samples = Samples::new(&self.metrics, &mut own);
                if let Err(err) = samples.gauge(COLLECT_DURATION, elapsed, &[group.owner]) {
                    debug!(%err, group = group.owner, "collect duration not recorded");
                }
            }
        }

        let up = if report.is_healthy() { 1.0 } else { 0.0 };
        if let Err(err) = Samples::new(&self.metrics, &mut own).gauge(UP, up, &[]) {
            debug!(%err, "up not recorded");
        }
        report
            .batches
            .push(Batch::new(service, UP, own, tracing::Span::current()));

        report
    }
}
