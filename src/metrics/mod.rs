//! Metric Primitives
//!
//! Thin adapter over the `prometheus` runtime: descriptor construction,
//! const-metric emission, and the multi-producer sink the aggregating
//! collector drains on every scrape. Sub-collectors never touch the proto
//! model directly; they emit samples through a [`MetricSink`].

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;

use prometheus::core::Desc;
use prometheus::proto;

use crate::error::{Error, Result};

/// Namespace prepended to every host metric family.
pub const NAMESPACE: &str = "machine";

/// Sample kind for const metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    fn proto_type(self) -> proto::MetricType {
        match self {
            MetricKind::Counter => proto::MetricType::COUNTER,
            MetricKind::Gauge => proto::MetricType::GAUGE,
        }
    }
}

/// Build a fully qualified metric name from its parts, skipping empty ones.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Construct a descriptor under the host namespace.
///
/// Descriptors are immutable and meant to be created once per process, then
/// reused across scrapes.
pub fn new_desc(
    subsystem: &str,
    name: &str,
    help: &str,
    variable_labels: &[&str],
) -> Result<Desc> {
    let desc = Desc::new(
        build_fq_name(NAMESPACE, subsystem, name),
        help.to_string(),
        variable_labels.iter().map(|l| l.to_string()).collect(),
        HashMap::new(),
    )?;
    Ok(desc)
}

/// Build a single-sample metric family from a descriptor.
///
/// `label_values` must match the descriptor's variable labels in number and
/// order. Each call produces a fresh, ephemeral family; the aggregator merges
/// families with the same name before they reach the encoder.
pub fn const_metric(
    desc: &Desc,
    kind: MetricKind,
    value: f64,
    label_values: &[&str],
) -> Result<proto::MetricFamily> {
    if label_values.len() != desc.variable_labels.len() {
        return Err(Error::LabelArity {
            desc: desc.fq_name.clone(),
            expected: desc.variable_labels.len(),
            got: label_values.len(),
        });
    }

    let mut metric = proto::Metric::default();
    for pair in &desc.const_label_pairs {
        metric.mut_label().push(pair.clone());
    }
    for (name, value) in desc.variable_labels.iter().zip(label_values) {
        let mut pair = proto::LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value((*value).to_string());
        metric.mut_label().push(pair);
    }

    match kind {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value);
            metric.set_gauge(gauge);
        }
    }

    let mut family = proto::MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(kind.proto_type());
    family.mut_metric().push(metric);
    Ok(family)
}

/// Merge families with the same name into one, concatenating their samples.
///
/// The text format allows each family name exactly once per exposition, so
/// the per-sample output of concurrent emitters must be coalesced before
/// encoding. Output is ordered by family name.
pub fn merge_families(families: impl IntoIterator<Item = proto::MetricFamily>) -> Vec<proto::MetricFamily> {
    let mut merged: BTreeMap<String, proto::MetricFamily> = BTreeMap::new();
    for mut family in families {
        match merged.get_mut(family.get_name()) {
            Some(existing) => {
                for metric in family.take_metric().into_iter() {
                    existing.mut_metric().push(metric);
                }
            }
            None => {
                merged.insert(family.get_name().to_string(), family);
            }
        }
    }
    merged.into_values().collect()
}

// =============================================================================
// Metric Sink
// =============================================================================

/// Multi-producer conduit for one scrape.
///
/// Each fan-out task owns a clone; the consumer drains the channel only after
/// every producer has completed (and dropped its clone), so no sample can be
/// lost or observed mid-write.
#[derive(Debug, Clone)]
pub struct MetricSink {
    tx: mpsc::Sender<proto::MetricFamily>,
}

impl MetricSink {
    /// Create a sink and the receiving end the consumer drains.
    pub fn channel() -> (Self, mpsc::Receiver<proto::MetricFamily>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// Emit a pre-built family.
    pub fn send(&self, family: proto::MetricFamily) {
        // The receiver outlives every producer within one scrape; a send
        // failure means the scrape was abandoned and the sample is moot.
        let _ = self.tx.send(family);
    }

    /// Emit one gauge sample.
    pub fn const_gauge(&self, desc: &Desc, value: f64, label_values: &[&str]) -> Result<()> {
        self.send(const_metric(desc, MetricKind::Gauge, value, label_values)?);
        Ok(())
    }

    /// Emit one counter sample.
    pub fn const_counter(&self, desc: &Desc, value: f64, label_values: &[&str]) -> Result<()> {
        self.send(const_metric(desc, MetricKind::Counter, value, label_values)?);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
