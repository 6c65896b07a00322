//! Monitoring session configuration

use crate::error::{DriftwatchError, Result};
use std::path::PathBuf;

/// Configuration for a monitoring session.
///
/// Constructed once at process start and passed to each component; never
/// mutated after validation.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Rows per streamed batch
    pub batch_size: usize,
    /// Significance threshold for the per-feature statistical tests
    pub p_threshold: f64,
    /// Absolute accuracy change that counts as concept drift
    pub accuracy_drop_threshold: f64,
    /// Absolute AUC change that counts as concept drift
    pub auc_drop_threshold: f64,
    /// Symmetric KL threshold for the label-less prediction-drift proxy
    pub pred_kl_threshold: f64,
    /// Deployed model prediction endpoint
    pub model_endpoint_url: String,
    /// Reference dataset (CSV with the target column)
    pub reference_dataset_path: PathBuf,
    /// Name of the ground-truth column in the dataset
    pub target_column: String,
    /// Append-only drift events log
    pub event_log_path: PathBuf,
    /// Append-only remediation log
    pub remediation_log_path: PathBuf,
    /// Port for the read-only status dashboard
    pub dashboard_port: u16,
    /// Seconds to pause between batches (0 = no pacing)
    pub batch_interval_secs: u64,
    /// Per-request timeout for the prediction endpoint
    pub request_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let evidence_dir = std::env::var("EVIDENCE_DIR")
            .unwrap_or_else(|_| "./monitoring_evidence".to_string());
        Self {
            batch_size: 16,
            p_threshold: 0.01,
            accuracy_drop_threshold: 0.10,
            auc_drop_threshold: 0.10,
            pred_kl_threshold: 0.10,
            model_endpoint_url: std::env::var("MODEL_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:6001/invocations".to_string()),
            reference_dataset_path: PathBuf::new(),
            target_column: "target".to_string(),
            event_log_path: PathBuf::from(&evidence_dir).join("drift_events_log.jsonl"),
            remediation_log_path: PathBuf::from(&evidence_dir).join("remediation_log.jsonl"),
            dashboard_port: 8099,
            batch_interval_secs: 0,
            request_timeout_secs: 15,
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration before any batch is processed.
    ///
    /// Failures here are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.model_endpoint_url.is_empty() {
            return Err(DriftwatchError::ConfigError(
                "model endpoint URL is not set".to_string(),
            ));
        }
        if self.reference_dataset_path.as_os_str().is_empty() {
            return Err(DriftwatchError::ConfigError(
                "reference dataset path is not set".to_string(),
            ));
        }
        if !self.reference_dataset_path.exists() {
            return Err(DriftwatchError::ConfigError(format!(
                "reference dataset not found at {}",
                self.reference_dataset_path.display()
            )));
        }
        if self.batch_size == 0 {
            return Err(DriftwatchError::ConfigError(
                "batch size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.p_threshold) {
            return Err(DriftwatchError::ConfigError(format!(
                "p threshold must lie in [0, 1], got {}",
                self.p_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.batch_size, 16);
        assert!((config.p_threshold - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.target_column, "target");
    }

    #[test]
    fn test_validate_missing_dataset() {
        let config = MonitorConfig {
            reference_dataset_path: PathBuf::from("/nonexistent/ref.csv"),
            ..MonitorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DriftwatchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let config = MonitorConfig {
            model_endpoint_url: String::new(),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "a,target\n1,0").unwrap();

        let config = MonitorConfig {
            reference_dataset_path: path,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
