//! KPI threshold evaluation and the per-run KPI book.

use crate::graph::{KpiDefinition, KpiPoint, ThresholdConfig, ThresholdDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// An alert signal raised by a kpi-update node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiAlert {
    pub kpi_id: String,
    pub node_id: String,
    pub level: AlertLevel,
    pub value: f64,
    pub raised_at: DateTime<Utc>,
}

/// Decides whether `value` crosses the configured thresholds.
///
/// The critical level is checked first, so a value past both levels reports `Critical`.
pub fn evaluate_threshold(value: f64, threshold: &ThresholdConfig) -> Option<AlertLevel> {
    let crosses = |level: f64| match threshold.direction {
        ThresholdDirection::AboveTriggers => value >= level,
        ThresholdDirection::BelowTriggers => value <= level,
    };
    if crosses(threshold.critical) {
        Some(AlertLevel::Critical)
    } else if crosses(threshold.warning) {
        Some(AlertLevel::Warning)
    } else {
        None
    }
}

/// The outcome of applying a new value to a KPI.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiChange {
    pub kpi_id: String,
    pub previous_value: f64,
    pub new_value: f64,
    pub alert: Option<AlertLevel>,
    pub recorded_at: DateTime<Utc>,
    pub keep_history: bool,
}

impl KpiChange {
    /// Computes the change for `kpi` without mutating it.
    pub fn compute(
        kpi: &KpiDefinition,
        value: f64,
        threshold: Option<&ThresholdConfig>,
        keep_history: bool,
        at: DateTime<Utc>,
    ) -> Self {
        let threshold = threshold.unwrap_or(&kpi.threshold);
        Self {
            kpi_id: kpi.id.clone(),
            previous_value: kpi.current,
            new_value: value,
            alert: evaluate_threshold(value, threshold),
            recorded_at: at,
            keep_history,
        }
    }

    /// Writes the change into the KPI. History is append-only.
    pub fn apply(&self, kpi: &mut KpiDefinition) {
        kpi.current = self.new_value;
        if self.keep_history {
            kpi.history.push(KpiPoint {
                timestamp: self.recorded_at,
                value: self.new_value,
            });
        }
    }
}

/// The run's working copy of the graph's KPI definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiBook {
    kpis: Vec<KpiDefinition>,
}

impl KpiBook {
    pub fn new(kpis: Vec<KpiDefinition>) -> Self {
        Self { kpis }
    }

    pub fn get(&self, id: &str) -> Option<&KpiDefinition> {
        self.kpis.iter().find(|k| k.id == id)
    }

    /// Applies a change; returns `false` if the KPI is unknown.
    pub fn apply(&mut self, change: &KpiChange) -> bool {
        match self.kpis.iter_mut().find(|k| k.id == change.kpi_id) {
            Some(kpi) => {
                change.apply(kpi);
                true
            }
            None => false,
        }
    }

    pub fn into_inner(self) -> Vec<KpiDefinition> {
        self.kpis
    }

    pub fn as_slice(&self) -> &[KpiDefinition] {
        &self.kpis
    }
}
