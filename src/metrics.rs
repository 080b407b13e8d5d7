//! Prometheus gauges for Paperless statistics.
//!
//! The registry is owned by [`PaperlessMetrics`] rather than being the global
//! default registry; one instance is built at startup and shared between the
//! poller (writer) and the `/metrics` endpoint (reader).

use std::collections::BTreeSet;
use std::str::FromStr;

use prometheus::core::Collector;
use prometheus::{
    register_gauge_vec_with_registry, register_gauge_with_registry, Encoder, Gauge, GaugeVec,
    Registry, TextEncoder,
};

use crate::paperless::Snapshot;

/// What to do with label values that were published earlier but are missing
/// from the current snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Keep them with their last value.
    #[default]
    Merge,
    /// Drop them; only the current snapshot's label values are exported.
    Replace,
}

impl FromStr for LabelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(LabelPolicy::Merge),
            "replace" => Ok(LabelPolicy::Replace),
            other => Err(format!("unknown label policy '{}'", other)),
        }
    }
}

impl std::fmt::Display for LabelPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelPolicy::Merge => write!(f, "merge"),
            LabelPolicy::Replace => write!(f, "replace"),
        }
    }
}

/// Gauges exported for a Paperless instance.
#[derive(Clone)]
pub struct PaperlessMetrics {
    documents_total: Gauge,
    documents_inbox: Gauge,
    character_count: Gauge,
    mime_type_count: GaugeVec,
    file_tasks: GaugeVec,
    label_policy: LabelPolicy,
    registry: Registry,
}

impl PaperlessMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Self::with_policy(LabelPolicy::default())
    }

    pub fn with_policy(label_policy: LabelPolicy) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let documents_total = register_gauge_with_registry!(
            "documents_total",
            "The total number of documents in Paperless",
            registry
        )?;

        let documents_inbox = register_gauge_with_registry!(
            "documents_inbox",
            "The number of documents in the Paperless inbox",
            registry
        )?;

        let character_count = register_gauge_with_registry!(
            "character_count",
            "The total number of characters across all Paperless documents",
            registry
        )?;

        let mime_type_count = register_gauge_vec_with_registry!(
            "mime_type_count",
            "The number of documents with a given mime type",
            &["mime_type"],
            registry
        )?;

        let file_tasks = register_gauge_vec_with_registry!(
            "file_tasks",
            "The number of file tasks by status",
            &["status"],
            registry
        )?;

        Ok(Self {
            documents_total,
            documents_inbox,
            character_count,
            mime_type_count,
            file_tasks,
            label_policy,
            registry,
        })
    }

    pub fn label_policy(&self) -> LabelPolicy {
        self.label_policy
    }

    /// Write a snapshot into the gauges. Publishing the same snapshot twice
    /// leaves the registry unchanged.
    pub fn publish(&self, snapshot: &Snapshot) {
        let summary = &snapshot.summary;
        self.documents_total.set(summary.documents_total as f64);
        self.documents_inbox.set(summary.documents_inbox as f64);
        self.character_count.set(summary.character_count as f64);

        for file_type in &summary.file_type_counts {
            self.mime_type_count
                .with_label_values(&[file_type.mime_type.as_str()])
                .set(file_type.count as f64);
        }

        let histogram = snapshot.status_histogram();
        for (status, count) in &histogram {
            self.file_tasks
                .with_label_values(&[status.as_str()])
                .set(*count as f64);
        }

        // Stale values go only after the current ones are written, so a scrape
        // never sees an empty vector.
        if self.label_policy == LabelPolicy::Replace {
            let mime_types = summary
                .file_type_counts
                .iter()
                .map(|file_type| file_type.mime_type.as_str())
                .collect();
            remove_stale_labels(&self.mime_type_count, &mime_types);

            let statuses = histogram.keys().map(String::as_str).collect();
            remove_stale_labels(&self.file_tasks, &statuses);
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Drop every label value of a single-label vector that is not in `keep`.
fn remove_stale_labels(vec: &GaugeVec, keep: &BTreeSet<&str>) {
    let mut stale = Vec::new();
    for family in vec.collect() {
        for metric in family.get_metric() {
            if let Some(label) = metric.get_label().first() {
                if !keep.contains(label.get_value()) {
                    stale.push(label.get_value().to_string());
                }
            }
        }
    }

    for value in stale {
        if let Err(e) = vec.remove_label_values(&[value.as_str()]) {
            tracing::debug!("Failed to remove label value {:?}: {}", value, e);
        }
    }
}
