//! Integration test: end-to-end monitoring loop against a mock endpoint

use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use driftwatch::alert::AlertLog;
use driftwatch::client::ModelClient;
use driftwatch::config::MonitorConfig;
use driftwatch::drift::DriftDetector;
use driftwatch::monitor::MonitorLoop;
use driftwatch::profile::ReferenceProfile;
use driftwatch::stream::BatchStream;

/// 24 rows with alternating target parity so batch-size-8 predictions of
/// `row % 2` are always correct.
fn write_dataset(dir: &tempfile::TempDir, name: &str, age_offset: i64) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "age,bp,sex,target").unwrap();
    for i in 0..24i64 {
        writeln!(
            f,
            "{},{},{},{}",
            40 + (i % 10) + age_offset,
            110 + (i % 8) * 4,
            if i % 2 == 0 { "M" } else { "F" },
            i % 2
        )
        .unwrap();
    }
    path
}

async fn parity_handler(Json(body): Json<Value>) -> Json<Value> {
    let n = body["instances"].as_array().map(|a| a.len()).unwrap_or(0);
    let predictions: Vec<u64> = (0..n).map(|i| (i % 2) as u64).collect();
    Json(json!({ "predictions": predictions }))
}

async fn failing_handler() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_endpoint(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/invocations", addr)
}

fn evidence_log(dir: &tempfile::TempDir) -> (Arc<AlertLog>, PathBuf, PathBuf) {
    let events = dir.path().join("drift_events_log.jsonl");
    let remediation = dir.path().join("remediation_log.jsonl");
    let log = Arc::new(AlertLog::new(&events, &remediation).unwrap());
    (log, events, remediation)
}

#[tokio::test]
async fn test_healthy_endpoint_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(&dir, "reference.csv", 0);
    let endpoint = spawn_endpoint(Router::new().route("/invocations", post(parity_handler))).await;

    let config = MonitorConfig {
        batch_size: 8,
        reference_dataset_path: dataset.clone(),
        ..MonitorConfig::default()
    };
    let client = ModelClient::new(&endpoint, 5).unwrap();

    // Replay fixes a perfect performance baseline against this endpoint
    let profile = ReferenceProfile::from_csv(&dataset, "target")
        .unwrap()
        .with_production_metrics(&client, &dataset, "target", 8)
        .await
        .unwrap();
    assert_eq!(profile.reference_accuracy(), Some(1.0));
    assert_eq!(profile.reference_auc(), Some(1.0));

    let detector = DriftDetector::new(Arc::new(profile), &config);
    let stream = BatchStream::from_csv(&dataset, "target", 8).unwrap();
    let (log, events_path, remediation_path) = evidence_log(&dir);
    let stop = Arc::new(AtomicBool::new(false));

    let summary = MonitorLoop::new(stream, client, detector, log, stop)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.batches_processed, 3);
    assert_eq!(summary.drift_reports, 3);
    assert_eq!(summary.inference_errors, 0);
    assert_eq!(summary.remediations, 0);

    // The dataset streamed against its own profile never drifts
    let content = std::fs::read_to_string(&events_path).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line["type"], json!("drift"));
        assert_eq!(line["detected"], json!(false));
        assert_eq!(line["concept_drift"]["accuracy_drift"]["drifted"], json!(false));
    }
    assert_eq!(std::fs::read_to_string(&remediation_path).unwrap(), "");
}

#[tokio::test]
async fn test_failing_endpoint_records_one_error_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(&dir, "reference.csv", 0);
    let endpoint = spawn_endpoint(Router::new().route("/invocations", post(failing_handler))).await;

    let config = MonitorConfig {
        batch_size: 8,
        reference_dataset_path: dataset.clone(),
        ..MonitorConfig::default()
    };
    let client = ModelClient::new(&endpoint, 5).unwrap();
    let profile = ReferenceProfile::from_csv(&dataset, "target").unwrap();
    let detector = DriftDetector::new(Arc::new(profile), &config);
    let stream = BatchStream::from_csv(&dataset, "target", 8).unwrap();
    let (log, events_path, remediation_path) = evidence_log(&dir);
    let stop = Arc::new(AtomicBool::new(false));

    let summary = MonitorLoop::new(stream, client, detector, log, stop)
        .run()
        .await
        .unwrap();

    // Every batch is attempted; none is evaluated; the loop never aborts
    assert_eq!(summary.batches_processed, 3);
    assert_eq!(summary.inference_errors, 3);
    assert_eq!(summary.drift_reports, 0);

    let content = std::fs::read_to_string(&events_path).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["type"], json!("inference_error"));
        assert_eq!(line["batch_id"], json!(format!("batch_{:04}", i)));
    }
    assert_eq!(std::fs::read_to_string(&remediation_path).unwrap(), "");
}

#[tokio::test]
async fn test_shifted_stream_triggers_remediation() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_dataset(&dir, "reference.csv", 0);
    let shifted = write_dataset(&dir, "shifted.csv", 500);
    let endpoint = spawn_endpoint(Router::new().route("/invocations", post(parity_handler))).await;

    let config = MonitorConfig {
        batch_size: 8,
        reference_dataset_path: reference.clone(),
        ..MonitorConfig::default()
    };
    let client = ModelClient::new(&endpoint, 5).unwrap();
    let profile = ReferenceProfile::from_csv(&reference, "target").unwrap();
    let detector = DriftDetector::new(Arc::new(profile), &config);
    let stream = BatchStream::from_csv(&shifted, "target", 8).unwrap();
    let (log, events_path, remediation_path) = evidence_log(&dir);
    let stop = Arc::new(AtomicBool::new(false));

    let summary = MonitorLoop::new(stream, client, detector, log, stop)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.drift_reports, 3);
    assert_eq!(summary.drift_detections, 3);
    assert_eq!(summary.remediations, 3);

    let events = std::fs::read_to_string(&events_path).unwrap();
    for line in events.lines() {
        let v: Value = serde_json::from_str(line).unwrap();
        assert_eq!(v["detected"], json!(true));
        assert_eq!(v["feature_drift"]["age"]["drifted"], json!(true));
    }

    let remediation = std::fs::read_to_string(&remediation_path).unwrap();
    let entries: Vec<Value> = remediation
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.len(), 3);
    assert!(entries[0]["evidence"]["feature_drifted"]
        .as_array()
        .unwrap()
        .contains(&json!("age")));
    assert!(entries[0]["suggested_action"]
        .as_str()
        .unwrap()
        .contains("drift"));
}

#[tokio::test]
async fn test_baseline_snapshot_round_trip_session() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(&dir, "reference.csv", 0);
    let endpoint = spawn_endpoint(Router::new().route("/invocations", post(parity_handler))).await;

    let client = ModelClient::new(&endpoint, 5).unwrap();
    let snapshot = dir.path().join("baseline_profile.json");
    ReferenceProfile::from_csv(&dataset, "target")
        .unwrap()
        .with_production_metrics(&client, &dataset, "target", 8)
        .await
        .unwrap()
        .save(&snapshot)
        .unwrap();

    // A session built from the persisted snapshot behaves like the original
    let config = MonitorConfig {
        batch_size: 8,
        reference_dataset_path: dataset.clone(),
        ..MonitorConfig::default()
    };
    let profile = ReferenceProfile::load(&snapshot).unwrap();
    assert_eq!(profile.reference_accuracy(), Some(1.0));

    let detector = DriftDetector::new(Arc::new(profile), &config);
    let stream = BatchStream::from_csv(&dataset, "target", 8).unwrap();
    let (log, _events_path, _remediation_path) = evidence_log(&dir);
    let stop = Arc::new(AtomicBool::new(false));

    let summary = MonitorLoop::new(stream, client, detector, log, stop)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.drift_detections, 0);
}
