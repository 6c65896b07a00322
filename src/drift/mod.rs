//! Drift detection
//!
//! Compares incoming batches against the frozen reference profile:
//! per-feature distribution tests (feature drift) and performance
//! degradation against the reference baseline (concept drift).

pub mod concept;
pub mod stats;

use crate::config::MonitorConfig;
use crate::profile::{FeatureStat, ReferenceProfile};
use crate::stream::{Batch, FeatureData};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of one feature's distribution test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDriftResult {
    pub p_value: f64,
    pub statistic: f64,
    pub drifted: bool,
}

impl FeatureDriftResult {
    /// A column with no usable values deviates from any nonempty reference
    /// distribution.
    fn maximal() -> Self {
        Self {
            p_value: 0.0,
            statistic: 1.0,
            drifted: true,
        }
    }

    fn none() -> Self {
        Self {
            p_value: 1.0,
            statistic: 0.0,
            drifted: false,
        }
    }
}

/// Reference-versus-current comparison for one performance metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftFlag {
    pub reference: f64,
    pub current: f64,
    pub drifted: bool,
}

/// Concept drift verdict for a labeled batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDrift {
    pub accuracy_drift: DriftFlag,
    /// Absent when batch AUC is undefined (single-class batch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auc_drift: Option<DriftFlag>,
}

/// Prediction-distribution divergence proxy for label-less batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionDrift {
    pub kl_divergence: f64,
    pub threshold: f64,
    pub drifted: bool,
}

/// Complete drift verdict for one batch; written exactly once to the
/// events log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub batch_id: String,
    pub timestamp: String,
    pub feature_drift: BTreeMap<String, FeatureDriftResult>,
    /// Informational per-feature mean shift versus the reference means
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mean_shift: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_drift: Option<ConceptDrift>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_drift: Option<PredictionDrift>,
    pub detected: bool,
}

impl DriftReport {
    /// Names of features whose test crossed the significance threshold.
    pub fn drifted_features(&self) -> Vec<&str> {
        self.feature_drift
            .iter()
            .filter(|(_, r)| r.drifted)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of drifted performance metrics.
    pub fn drifted_concept_metrics(&self) -> Vec<&'static str> {
        let mut metrics = Vec::new();
        if let Some(concept) = &self.concept_drift {
            if concept.accuracy_drift.drifted {
                metrics.push("accuracy");
            }
            if concept.auc_drift.as_ref().is_some_and(|f| f.drifted) {
                metrics.push("auc");
            }
        }
        if self.prediction_drift.as_ref().is_some_and(|p| p.drifted) {
            metrics.push("prediction_distribution");
        }
        metrics
    }
}

/// Evaluates batches against the reference profile.
pub struct DriftDetector {
    profile: Arc<ReferenceProfile>,
    p_threshold: f64,
    accuracy_drop_threshold: f64,
    auc_drop_threshold: f64,
    pred_kl_threshold: f64,
}

impl DriftDetector {
    pub fn new(profile: Arc<ReferenceProfile>, config: &MonitorConfig) -> Self {
        Self {
            profile,
            p_threshold: config.p_threshold,
            accuracy_drop_threshold: config.accuracy_drop_threshold,
            auc_drop_threshold: config.auc_drop_threshold,
            pred_kl_threshold: config.pred_kl_threshold,
        }
    }

    /// Full drift evaluation for one batch.
    ///
    /// Concept drift needs both batch labels and a reference performance
    /// baseline; otherwise the prediction-distribution proxy is evaluated
    /// instead.
    pub fn evaluate(&self, batch: &Batch, predictions: &[f64]) -> DriftReport {
        let feature_drift = self.feature_drift(batch);
        let mean_shift = self.mean_shift(batch);

        let concept_drift = match (&batch.labels, self.profile.reference_accuracy()) {
            (Some(labels), Some(reference_accuracy)) => Some(self.concept_drift(
                labels,
                predictions,
                reference_accuracy,
                self.profile.reference_auc(),
            )),
            _ => None,
        };

        let prediction_drift = if concept_drift.is_none() {
            self.prediction_drift(predictions)
        } else {
            None
        };

        let detected = feature_drift.values().any(|r| r.drifted)
            || concept_drift.as_ref().is_some_and(|c| {
                c.accuracy_drift.drifted || c.auc_drift.as_ref().is_some_and(|f| f.drifted)
            })
            || prediction_drift.as_ref().is_some_and(|p| p.drifted);

        DriftReport {
            batch_id: batch.batch_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            feature_drift,
            mean_shift,
            concept_drift,
            prediction_drift,
            detected,
        }
    }

    /// Per-feature distribution tests for every feature present in both the
    /// reference profile and the batch. Batch columns the profile does not
    /// know are ignored; profiled features missing from the batch are
    /// skipped, not errored.
    pub fn feature_drift(&self, batch: &Batch) -> BTreeMap<String, FeatureDriftResult> {
        batch
            .features
            .par_iter()
            .filter_map(|column| {
                let stat = self.profile.feature_stats().get(&column.name)?;
                Some((column.name.clone(), self.test_feature(stat, &column.data)))
            })
            .collect()
    }

    /// Concept drift: absolute accuracy/AUC change against the reference
    /// scalars. Symmetric on purpose; sudden improvement is flagged too.
    pub fn concept_drift(
        &self,
        y_true: &[f64],
        y_pred: &[f64],
        reference_accuracy: f64,
        reference_auc: Option<f64>,
    ) -> ConceptDrift {
        let batch_accuracy = concept::accuracy(y_true, y_pred);
        let accuracy_drift = DriftFlag {
            reference: reference_accuracy,
            current: batch_accuracy,
            drifted: (reference_accuracy - batch_accuracy).abs() > self.accuracy_drop_threshold,
        };

        let auc_drift = reference_auc.and_then(|reference| {
            concept::roc_auc(y_true, y_pred).map(|current| DriftFlag {
                reference,
                current,
                drifted: (reference - current).abs() > self.auc_drop_threshold,
            })
        });

        ConceptDrift {
            accuracy_drift,
            auc_drift,
        }
    }

    /// Symmetric KL divergence between the reference and current
    /// predicted-label distributions. None when no reference distribution
    /// was captured.
    pub fn prediction_drift(&self, predictions: &[f64]) -> Option<PredictionDrift> {
        let reference = self.profile.pred_label_distribution();
        if reference.is_empty() || predictions.is_empty() {
            return None;
        }
        let current = concept::label_distribution(predictions);
        let kl_divergence = concept::symmetric_kl(reference, &current);
        Some(PredictionDrift {
            kl_divergence,
            threshold: self.pred_kl_threshold,
            drifted: kl_divergence > self.pred_kl_threshold,
        })
    }

    fn mean_shift(&self, batch: &Batch) -> BTreeMap<String, f64> {
        let mut shifts = BTreeMap::new();
        for column in &batch.features {
            let Some(&reference_mean) = self.profile.feature_means().get(&column.name) else {
                continue;
            };
            if let FeatureData::Numeric(values) = &column.data {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                if !finite.is_empty() {
                    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
                    shifts.insert(column.name.clone(), (mean - reference_mean).abs());
                }
            }
        }
        shifts
    }

    fn test_feature(&self, stat: &FeatureStat, data: &FeatureData) -> FeatureDriftResult {
        match stat {
            FeatureStat::Numeric { values: reference } => {
                let sample = numeric_sample(data);
                if sample.is_empty() {
                    return FeatureDriftResult::maximal();
                }
                if reference.is_empty() {
                    return FeatureDriftResult::none();
                }
                let reference = Array1::from(reference.clone());
                let sample = Array1::from(sample);
                let (statistic, p_value) = stats::ks_two_sample(&reference, &sample);
                FeatureDriftResult {
                    p_value,
                    statistic,
                    drifted: p_value < self.p_threshold,
                }
            }
            FeatureStat::Categorical { frequencies } => {
                let counts = category_counts(data);
                let total: f64 = counts.values().map(|&c| c as f64).sum();
                if total == 0.0 {
                    return FeatureDriftResult::maximal();
                }

                let mut categories: Vec<&String> =
                    frequencies.keys().chain(counts.keys()).collect();
                categories.sort();
                categories.dedup();
                if categories.len() < 2 {
                    return FeatureDriftResult::none();
                }

                // Expected counts at batch scale, smoothed so an unseen
                // reference category never divides by zero
                let observed: Vec<f64> = categories
                    .iter()
                    .map(|c| counts.get(*c).map(|&n| n as f64).unwrap_or(0.0))
                    .collect();
                let expected: Vec<f64> = categories
                    .iter()
                    .map(|c| frequencies.get(*c).copied().unwrap_or(0.0) * total + 1e-9)
                    .collect();

                let (statistic, p_value) = stats::chi_square_gof(&observed, &expected);
                FeatureDriftResult {
                    p_value,
                    statistic,
                    drifted: p_value < self.p_threshold,
                }
            }
        }
    }
}

/// Numeric values of a batch column, coercing text where it parses.
fn numeric_sample(data: &FeatureData) -> Vec<f64> {
    match data {
        FeatureData::Numeric(values) => {
            values.iter().copied().filter(|v| v.is_finite()).collect()
        }
        FeatureData::Text(values) => values
            .iter()
            .filter_map(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .collect(),
    }
}

/// Category counts of a batch column, formatting numeric values the same
/// way label distributions are keyed.
fn category_counts(data: &FeatureData) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    match data {
        FeatureData::Text(values) => {
            for v in values.iter().filter(|v| !v.is_empty()) {
                *counts.entry(v.clone()).or_insert(0) += 1;
            }
        }
        FeatureData::Numeric(values) => {
            for &v in values.iter().filter(|v| v.is_finite()) {
                *counts.entry(concept::format_label(v)).or_insert(0) += 1;
            }
        }
    }
    counts
}
