use std::fmt;

use crate::config::MetricDefinition;
use crate::data::model::{Dataset, Row};

// ---------------------------------------------------------------------------
// Measure – anything that reads a number out of a row
// ---------------------------------------------------------------------------

/// Reads one numeric observation from a response. Aggregations are generic
/// over this so they work on raw column names and on registered metrics.
pub trait Measure {
    fn measure(&self, row: &Row) -> Option<f64>;
}

/// A bare column name: any numeric value counts.
impl Measure for str {
    fn measure(&self, row: &Row) -> Option<f64> {
        row.number(self)
    }
}

impl Measure for String {
    fn measure(&self, row: &Row) -> Option<f64> {
        row.number(self)
    }
}

// ---------------------------------------------------------------------------
// Metric – a definition bound to a column that exists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub def: MetricDefinition,
}

impl Metric {
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn label(&self) -> &str {
        &self.def.label
    }
}

/// Numbers outside the metric's scale are treated as missing answers.
impl Measure for Metric {
    fn measure(&self, row: &Row) -> Option<f64> {
        row.number(&self.def.field)
            .filter(|v| self.def.scale.contains(*v))
    }
}

/// Why a configured metric is unavailable for the loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaIssue {
    MissingField { metric: String, field: String },
    NoNumericValues { metric: String, field: String },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingField { metric, field } => {
                write!(f, "metric '{metric}' skipped: column '{field}' not found")
            }
            SchemaIssue::NoNumericValues { metric, field } => {
                write!(f, "metric '{metric}' skipped: column '{field}' has no numeric answers")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MetricRegistry
// ---------------------------------------------------------------------------

/// The metrics of a dashboard that can actually be computed on a dataset,
/// looked up by their stable id.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
}

impl MetricRegistry {
    /// Bind each definition to the dataset schema. Definitions whose column
    /// is absent (or never numeric) are left out and reported; the rest of
    /// the dashboard keeps working without them.
    pub fn resolve(defs: &[MetricDefinition], dataset: &Dataset) -> (Self, Vec<SchemaIssue>) {
        let mut metrics = Vec::with_capacity(defs.len());
        let mut issues = Vec::new();

        for def in defs {
            let (metric, field) = (def.id.clone(), def.field.clone());
            if !dataset.has_column(&def.field) {
                issues.push(SchemaIssue::MissingField { metric, field });
            } else if !dataset.is_empty()
                && dataset.rows.iter().all(|r| r.number(&def.field).is_none())
            {
                issues.push(SchemaIssue::NoNumericValues { metric, field });
            } else {
                metrics.push(Metric { def: def.clone() });
            }
        }

        for issue in &issues {
            log::warn!("{issue}");
        }
        (MetricRegistry { metrics }, issues)
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id() == id)
    }

    /// Look up several ids, silently skipping unavailable ones.
    pub fn select<'a, S: AsRef<str>>(&'a self, ids: &[S]) -> Vec<&'a Metric> {
        ids.iter().filter_map(|id| self.get(id.as_ref())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
