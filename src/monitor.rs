//! Monitoring session orchestration
//!
//! Drives one full pass over the batch source: fetch, infer, detect, log.
//! A failed prediction call records an `inference_error` event and the loop
//! moves on; it never aborts the session on a single endpoint failure. A
//! cooperative stop flag is checked between batches so an operator can halt
//! cleanly without truncating an in-flight log write.

use crate::alert::{AlertLog, MonitorEvent, RemediationEvidence};
use crate::client::Predictor;
use crate::drift::DriftDetector;
use crate::error::Result;
use crate::stream::BatchStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Advice attached to every remediation entry.
pub const SUGGESTED_ACTION: &str =
    "Data or model drift detected. Investigate the input feature distributions \
     or retrain the deployed model.";

/// Terminal summary of a completed monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorSummary {
    pub session_id: String,
    pub batches_processed: usize,
    pub drift_reports: usize,
    pub drift_detections: usize,
    pub inference_errors: usize,
    pub remediations: usize,
    pub events_path: PathBuf,
    pub remediation_path: PathBuf,
}

/// Sequential per-batch monitoring pipeline.
pub struct MonitorLoop<P: Predictor> {
    stream: BatchStream,
    client: P,
    detector: DriftDetector,
    log: Arc<AlertLog>,
    stop: Arc<AtomicBool>,
    batch_interval: Duration,
    session_id: String,
}

impl<P: Predictor> MonitorLoop<P> {
    pub fn new(
        stream: BatchStream,
        client: P,
        detector: DriftDetector,
        log: Arc<AlertLog>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string()[..8].to_string();
        Self {
            stream,
            client,
            detector,
            log,
            stop,
            batch_interval: Duration::ZERO,
            session_id,
        }
    }

    /// Pause between batches, pacing the simulated stream.
    pub fn with_batch_interval(mut self, secs: u64) -> Self {
        self.batch_interval = Duration::from_secs(secs);
        self
    }

    /// Run until the source is exhausted or the stop flag is raised.
    pub async fn run(mut self) -> Result<MonitorSummary> {
        info!(
            session_id = %self.session_id,
            total_batches = self.stream.n_batches(),
            "Monitoring session starting"
        );

        let mut batches_processed = 0usize;
        let mut drift_reports = 0usize;
        let mut drift_detections = 0usize;
        let mut inference_errors = 0usize;
        let mut remediations = 0usize;

        while self.stream.has_next() {
            if self.stop.load(Ordering::Relaxed) {
                info!(session_id = %self.session_id, "Stop requested; halting between batches");
                break;
            }

            let batch = self.stream.next_batch()?;
            let batch_id = batch.batch_id();

            let predictions = match self.client.predict(&batch).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "Inference failed; skipping drift evaluation");
                    self.log.record_event(&MonitorEvent::InferenceError {
                        batch_id,
                        error: e.to_string(),
                        timestamp: chrono::Utc::now().to_rfc3339(),
                    })?;
                    inference_errors += 1;
                    batches_processed += 1;
                    continue;
                }
            };

            let report = self.detector.evaluate(&batch, &predictions);
            let detected = report.detected;
            let feature_drifted: Vec<String> = report
                .drifted_features()
                .iter()
                .map(|s| s.to_string())
                .collect();
            let concept_drifted: Vec<String> = report
                .drifted_concept_metrics()
                .iter()
                .map(|s| s.to_string())
                .collect();

            self.log.record_event(&MonitorEvent::Drift(report.clone()))?;
            drift_reports += 1;

            if detected {
                drift_detections += 1;
                info!(
                    batch_id = %report.batch_id,
                    features = ?feature_drifted,
                    metrics = ?concept_drifted,
                    "Drift detected"
                );
                let evidence = RemediationEvidence {
                    batch_id: report.batch_id.clone(),
                    feature_drifted,
                    concept_drifted,
                    report,
                };
                self.log.trigger_remediation(evidence, SUGGESTED_ACTION)?;
                remediations += 1;
            }

            batches_processed += 1;
            if !self.batch_interval.is_zero() {
                tokio::time::sleep(self.batch_interval).await;
            }
        }

        let (events_path, remediation_path) = self.log.summarize();
        info!(
            session_id = %self.session_id,
            batches = batches_processed,
            detections = drift_detections,
            inference_errors = inference_errors,
            "Monitoring session finished"
        );

        Ok(MonitorSummary {
            session_id: self.session_id,
            batches_processed,
            drift_reports,
            drift_detections,
            inference_errors,
            remediations,
            events_path,
            remediation_path,
        })
    }
}
