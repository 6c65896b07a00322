//! Reference baseline profile
//!
//! A frozen snapshot of per-feature statistics and reference performance
//! metrics, captured once per monitoring session and shared read-only by
//! every drift evaluation. Numeric features keep their raw reference sample
//! (the KS test needs both distributions, not summaries); categorical
//! features keep normalized frequency tables.

use crate::client::Predictor;
use crate::drift::concept::{accuracy, label_distribution, roc_auc};
use crate::error::{DriftwatchError, Result};
use crate::stream::{series_to_feature, BatchStream, FeatureData};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Reference statistics for a single monitored feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureStat {
    /// Raw reference samples for two-sample testing
    Numeric { values: Vec<f64> },
    /// Normalized category proportions
    Categorical { frequencies: BTreeMap<String, f64> },
}

/// Frozen comparison baseline for a monitoring session.
///
/// Immutable after construction; serialized as the on-disk baseline
/// snapshot (`feature_distributions` / `feature_means` /
/// `pred_label_distribution` keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceProfile {
    #[serde(rename = "feature_distributions")]
    feature_stats: BTreeMap<String, FeatureStat>,
    feature_means: BTreeMap<String, f64>,
    #[serde(default)]
    pred_label_distribution: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_auc: Option<f64>,
}

impl ReferenceProfile {
    /// Build a profile from a reference dataset on disk.
    ///
    /// Columns that parse as numeric keep their raw values; everything else
    /// is profiled as categorical frequencies. Performance metrics stay
    /// unset until a production replay fills them in.
    pub fn from_csv(path: &Path, target_column: &str) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| DriftwatchError::DataError(format!("{}: {}", path.display(), e)))?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()?;
        Self::from_frame(df, target_column)
    }

    /// Build a profile from an in-memory reference frame.
    pub fn from_frame(df: DataFrame, target_column: &str) -> Result<Self> {
        let has_target = df.get_columns().iter().any(|s| s.name() == target_column);
        let features = if has_target {
            df.drop(target_column)?
        } else {
            df
        };

        let mut feature_stats = BTreeMap::new();
        let mut feature_means = BTreeMap::new();

        for series in features.get_columns() {
            let name = series.name().to_string();
            match series_to_feature(series)? {
                FeatureData::Numeric(raw) => {
                    let values: Vec<f64> = raw.into_iter().filter(|v| v.is_finite()).collect();
                    if !values.is_empty() {
                        let mean = values.iter().sum::<f64>() / values.len() as f64;
                        feature_means.insert(name.clone(), mean);
                    }
                    feature_stats.insert(name, FeatureStat::Numeric { values });
                }
                FeatureData::Text(raw) => {
                    let frequencies = normalized_frequencies(&raw);
                    feature_stats.insert(name, FeatureStat::Categorical { frequencies });
                }
            }
        }

        debug!(features = feature_stats.len(), "Reference profile captured");
        Ok(Self {
            feature_stats,
            feature_means,
            pred_label_distribution: BTreeMap::new(),
            reference_accuracy: None,
            reference_auc: None,
        })
    }

    /// Replay the reference dataset through the deployed model once to fix
    /// the performance baseline (accuracy, AUC, predicted-label
    /// distribution).
    pub async fn with_production_metrics<P: Predictor>(
        mut self,
        client: &P,
        dataset_path: &Path,
        target_column: &str,
        batch_size: usize,
    ) -> Result<Self> {
        let mut stream = BatchStream::from_csv(dataset_path, target_column, batch_size)?;
        let mut y_true: Vec<f64> = Vec::with_capacity(stream.n_rows());
        let mut y_pred: Vec<f64> = Vec::with_capacity(stream.n_rows());

        while stream.has_next() {
            let batch = stream.next_batch()?;
            let labels = batch.labels.clone().ok_or_else(|| {
                DriftwatchError::DataError(format!(
                    "reference dataset has no '{}' column; cannot compute baseline metrics",
                    target_column
                ))
            })?;
            let predictions = client.predict(&batch).await?;
            y_true.extend(labels);
            y_pred.extend(predictions);
        }

        self.reference_accuracy = Some(accuracy(&y_true, &y_pred));
        self.reference_auc = roc_auc(&y_true, &y_pred);
        self.pred_label_distribution = label_distribution(&y_pred);

        info!(
            accuracy = self.reference_accuracy.unwrap_or(f64::NAN),
            auc = self.reference_auc.unwrap_or(f64::NAN),
            "Reference performance baseline computed"
        );
        Ok(self)
    }

    /// Load a previously persisted baseline snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| DriftwatchError::ConfigError(format!("{}: {}", path.display(), e)))?;
        let profile = serde_json::from_reader(file)?;
        Ok(profile)
    }

    /// Persist the profile as a JSON snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;
        info!(path = %path.display(), "Baseline snapshot saved");
        Ok(())
    }

    pub fn feature_stats(&self) -> &BTreeMap<String, FeatureStat> {
        &self.feature_stats
    }

    pub fn feature_means(&self) -> &BTreeMap<String, f64> {
        &self.feature_means
    }

    pub fn pred_label_distribution(&self) -> &BTreeMap<String, f64> {
        &self.pred_label_distribution
    }

    pub fn reference_accuracy(&self) -> Option<f64> {
        self.reference_accuracy
    }

    pub fn reference_auc(&self) -> Option<f64> {
        self.reference_auc
    }
}

/// Normalized category proportions over the non-missing values.
pub(crate) fn normalized_frequencies(values: &[String]) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for v in values.iter().filter(|v| !v.is_empty()) {
        *counts.entry(v.clone()).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .into_iter()
        .map(|(k, c)| (k, c as f64 / total as f64))
        .collect()
}
