//! Samples, and the [`Batch`] that carries them to the recorder.

use crate::{Error, Filter, Result};
use std::{collections::HashMap, ops::Deref};

/// A metric as registered with an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    /// Name inside the service's table, e.g. `zones`.
    pub short_name: &'static str,
    /// Fully qualified name, e.g. `openstack_designate_zones`.
    pub name: String,
    pub help: String,
    /// Label schema. Samples carry values in this order.
    pub labels: &'static [&'static str],
    /// Registration decision. Only [`Filter::Eligible`] metrics are emitted.
    pub filter: Filter,
}

impl MetricDesc {
    pub fn is_active(&self) -> bool {
        self.filter == Filter::Eligible
    }
}

/// One gauge observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    /// Label names, from the metric's schema.
    pub schema: &'static [&'static str],
    /// Label values, in schema order.
    pub labels: Vec<String>,
}

impl MetricSample {
    /// Label value for `name`, if the schema has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.schema
            .iter()
            .position(|label| *label == name)
            .map(|idx| self.labels[idx].as_str())
    }
}

/// Somewhere samples can be emitted to.
pub trait Emit {
    fn emit(&mut self, sample: MetricSample);
}

impl Emit for Vec<MetricSample> {
    fn emit(&mut self, sample: MetricSample) {
        self.push(sample);
    }
}

/// The handle collection functions emit through.
///
/// Checks each emission against the exporter's registered metrics: the
/// metric must be declared and the label count must match its schema.
/// Emissions for metrics filtered out at registration are dropped.
pub struct Samples<'a> {
    metrics: &'a HashMap<&'static str, MetricDesc>,
    sink: &'a mut (dyn Emit + Send),
    emitted: usize,
}

impl<'a> Samples<'a> {
    pub fn new(
        metrics: &'a HashMap<&'static str, MetricDesc>,
        sink: &'a mut (dyn Emit + Send),
    ) -> Self {
        Self {
            metrics,
            sink,
            emitted: 0,
        }
    }

    /// Whether `metric` will actually be emitted. Lets collection functions
    /// skip listings nobody is going to see.
    pub fn is_active(&self, metric: &str) -> bool {
        self.metrics.get(metric).is_some_and(MetricDesc::is_active)
    }

    /// Emit a gauge value for `metric` with label values in schema order.
    pub fn gauge(&mut self, metric: &str, value: f64, labels: &[&str]) -> Result<()> {
        let desc = self
            .metrics
            .get(metric)
            .ok_or_else(|| Error::UnknownMetric(metric.to_owned()))?;

        if labels.len() != desc.labels.len() {
            return Err(Error::LabelMismatch {
                metric: desc.name.clone(),
                expected: desc.labels.len(),
                got: labels.len(),
            });
        }

        if !desc.is_active() {
            return Ok(());
        }

        self.sink.emit(MetricSample {
            name: desc.name.clone(),
            value,
            schema: desc.labels,
            labels: labels.iter().map(|label| (*label).to_owned()).collect(),
        });
        self.emitted += 1;
        Ok(())
    }

    /// Number of samples emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// The samples of one collection group from one cycle, with the span the
/// group was collected in.
///
/// A batch holds a group's complete output or nothing at all, so the
/// recorder never sees part of a group's output. Publishing a batch replaces
/// the group's previous samples, and an empty one withdraws them. Processing
/// a batch should happen inside its span; see [`Batch::in_scope`].
#[derive(Debug)]
pub struct Batch {
    service: &'static str,
    group: &'static str,
    samples: Vec<MetricSample>,
    span: tracing::Span,
}

impl Deref for Batch {
    type Target = Vec<MetricSample>;

    fn deref(&self) -> &Self::Target {
        &self.samples
    }
}

impl Batch {
    pub fn new(
        service: &'static str,
        group: &'static str,
        samples: Vec<MetricSample>,
        span: tracing::Span,
    ) -> Self {
        crate::metrics::record_batch(service, samples.len());
        Self {
            service,
            group,
            samples,
            span,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// The metric that owns the collection function that produced this
    /// batch.
    pub fn group(&self) -> &'static str {
        self.group
    }

    /// Run a function within the scope of this batch's span.
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[MetricSample]) -> R,
    {
        self.span.in_scope(|| f(&self.samples))
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}
