//! Append-only evidence logs
//!
//! The system of record for audit: every drift-check outcome and every
//! triggered remediation is appended as one JSON line and never edited.
//! The monitoring loop is the single writer; appends are serialized behind
//! a mutex and write failures propagate rather than dropping an event.

use crate::drift::DriftReport;
use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One line in the events log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A completed drift evaluation
    Drift(DriftReport),
    /// A batch skipped because the prediction endpoint failed
    InferenceError {
        batch_id: String,
        error: String,
        timestamp: String,
    },
}

/// What a remediation entry points back at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationEvidence {
    pub batch_id: String,
    pub feature_drifted: Vec<String>,
    pub concept_drifted: Vec<String>,
    pub report: DriftReport,
}

/// One line in the remediation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationEvent {
    pub detected_at: String,
    pub evidence: RemediationEvidence,
    pub suggested_action: String,
}

/// Owner of the two on-disk evidence files.
pub struct AlertLog {
    events_path: PathBuf,
    remediation_path: PathBuf,
    events_file: Mutex<File>,
    remediation_file: Mutex<File>,
}

impl AlertLog {
    /// Open (creating if needed) both logs in append mode.
    pub fn new(events_path: &Path, remediation_path: &Path) -> Result<Self> {
        let events_file = open_append(events_path)?;
        let remediation_file = open_append(remediation_path)?;
        Ok(Self {
            events_path: events_path.to_path_buf(),
            remediation_path: remediation_path.to_path_buf(),
            events_file: Mutex::new(events_file),
            remediation_file: Mutex::new(remediation_file),
        })
    }

    /// Append one event line. Never overwrites.
    pub fn record_event(&self, event: &MonitorEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut file = self.events_file.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Append one remediation line, stamped with wall-clock time.
    pub fn trigger_remediation(
        &self,
        evidence: RemediationEvidence,
        suggested_action: &str,
    ) -> Result<()> {
        let entry = RemediationEvent {
            detected_at: chrono::Utc::now().to_rfc3339(),
            evidence,
            suggested_action: suggested_action.to_string(),
        };
        let line = serde_json::to_string(&entry)?;
        let mut file = self.remediation_file.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        warn!(
            batch_id = %entry.evidence.batch_id,
            action = suggested_action,
            "Remediation triggered"
        );
        Ok(())
    }

    /// File locations for external consumption; the logs themselves are not
    /// loaded into memory.
    pub fn summarize(&self) -> (PathBuf, PathBuf) {
        (self.events_path.clone(), self.remediation_path.clone())
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn empty_report(detected: bool) -> DriftReport {
        DriftReport {
            batch_id: "batch_0002".to_string(),
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            feature_drift: BTreeMap::new(),
            mean_shift: BTreeMap::new(),
            concept_drift: None,
            prediction_drift: None,
            detected,
        }
    }

    #[test]
    fn test_record_event_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("evidence/drift_events_log.jsonl");
        let remediation = dir.path().join("evidence/remediation_log.jsonl");
        let log = AlertLog::new(&events, &remediation).unwrap();

        log.record_event(&MonitorEvent::Drift(empty_report(false)))
            .unwrap();
        log.record_event(&MonitorEvent::InferenceError {
            batch_id: "batch_0003".to_string(),
            error: "endpoint returned HTTP 500".to_string(),
            timestamp: "2025-01-01T00:00:01Z".to_string(),
        })
        .unwrap();

        let content = std::fs::read_to_string(&events).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: MonitorEvent = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, MonitorEvent::Drift(_)));
        assert!(lines[1].contains("inference_error"));
    }

    #[test]
    fn test_trigger_remediation_stamps_time() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.jsonl");
        let remediation = dir.path().join("remediation.jsonl");
        let log = AlertLog::new(&events, &remediation).unwrap();

        let evidence = RemediationEvidence {
            batch_id: "batch_0002".to_string(),
            feature_drifted: vec!["age".to_string()],
            concept_drifted: vec![],
            report: empty_report(true),
        };
        log.trigger_remediation(evidence, "Investigate input distribution")
            .unwrap();

        let content = std::fs::read_to_string(&remediation).unwrap();
        let entry: RemediationEvent = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert!(!entry.detected_at.is_empty());
        assert_eq!(entry.evidence.feature_drifted, vec!["age"]);
        assert_eq!(entry.suggested_action, "Investigate input distribution");
    }

    #[test]
    fn test_appends_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.jsonl");
        let remediation = dir.path().join("remediation.jsonl");

        {
            let log = AlertLog::new(&events, &remediation).unwrap();
            log.record_event(&MonitorEvent::Drift(empty_report(false)))
                .unwrap();
        }
        {
            let log = AlertLog::new(&events, &remediation).unwrap();
            log.record_event(&MonitorEvent::Drift(empty_report(true)))
                .unwrap();
        }

        let content = std::fs::read_to_string(&events).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_summarize_returns_paths() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.jsonl");
        let remediation = dir.path().join("remediation.jsonl");
        let log = AlertLog::new(&events, &remediation).unwrap();

        let (e, r) = log.summarize();
        assert_eq!(e, events);
        assert_eq!(r, remediation);
    }
}
