//! The exported series, as of each group's latest cycle.

use crate::{Batch, MetricDesc, MetricSample};
use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// `(service, group)`
type GroupKey = (&'static str, &'static str);

#[derive(Debug, Default)]
struct Series {
    help: BTreeMap<String, String>,
    groups: BTreeMap<GroupKey, Vec<MetricSample>>,
}

/// Latest samples of every collection group, rendered in the Prometheus
/// text format.
///
/// A published batch replaces everything its group published before, so a
/// series the latest cycle did not emit is gone from the next scrape. An
/// empty batch withdraws the group entirely; that is how a failed group
/// drops out of the output.
///
/// Cloning is cheap and clones share the same series.
#[derive(Debug, Clone, Default)]
pub struct Exposition {
    inner: Arc<RwLock<Series>>,
}

impl Exposition {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Series> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Series> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register help text for `metrics`.
    pub fn describe<'a>(&self, metrics: impl IntoIterator<Item = &'a MetricDesc>) {
        let mut series = self.write();
        for desc in metrics {
            series.help.insert(desc.name.clone(), desc.help.clone());
        }
    }

    /// Replace the batch's group with the batch's samples.
    pub fn publish(&self, batch: &Batch) {
        let key = (batch.service(), batch.group());
        let mut series = self.write();
        if batch.is_empty() {
            series.groups.remove(&key);
        } else {
            series.groups.insert(key, batch.to_vec());
        }
    }

    /// Number of samples currently exported.
    pub fn len(&self) -> usize {
        self.read().groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every exported sample, one `HELP`/`TYPE` block per metric.
    pub fn render(&self) -> String {
        let series = self.read();

        let mut by_name: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
        for sample in series.groups.values().flatten() {
            by_name.entry(sample.name.as_str()).or_default().push(sample);
        }

        let mut out = String::new();
        for (name, samples) in by_name {
            if let Some(help) = series.help.get(name) {
                let _ = writeln!(out, "# HELP {name} {}", escape(help, false));
            }
            let _ = writeln!(out, "# TYPE {name} gauge");

            for sample in samples {
                out.push_str(name);
                if !sample.labels.is_empty() {
                    out.push('{');
                    let pairs = sample.schema.iter().zip(&sample.labels);
                    for (idx, (label, value)) in pairs.enumerate() {
                        if idx > 0 {
                            out.push(',');
                        }
                        let _ = write!(out, "{label}=\"{}\"", escape(value, true));
                    }
                    out.push('}');
                }
                let _ = writeln!(out, " {}", format_value(sample.value));
            }
        }
        out
    }
}

fn escape(raw: &str, quotes: bool) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '"' if quotes => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        value.to_string()
    }
}
