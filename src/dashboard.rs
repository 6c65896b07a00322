//! Read-only status dashboard
//!
//! Serves the accumulated drift events and remediation history over a
//! minimal HTTP surface. Runs concurrently with the monitoring loop but
//! shares nothing with it in memory: it opens the evidence files
//! independently, read-only, on every request. No write endpoints.

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Locations of the evidence files the dashboard reads.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub events_path: PathBuf,
    pub remediation_path: PathBuf,
}

/// Build the dashboard router.
pub fn create_router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/alerts", get(alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard until the process shuts down.
pub async fn run_dashboard(port: u16, state: Arc<DashboardState>) -> crate::error::Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Status dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Full parsed event and remediation history. An empty or not-yet-created
/// log file yields empty arrays, never an error.
async fn alerts(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let drift_events = read_jsonl(&state.events_path);
    let remediations = read_jsonl(&state.remediation_path);
    Json(json!({
        "drift_events": drift_events,
        "remediations": remediations,
    }))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn read_jsonl(path: &Path) -> Vec<Value> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    BufReader::new(file)
        .lines()
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match serde_json::from_str(&l) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed log line");
                None
            }
        })
        .collect()
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>Model Drift Monitoring</title></head>
<body>
    <h1>Model Drift Monitoring Dashboard</h1>
    <div id="alerts"></div>
    <script>
    async function refresh() {
        let resp = await fetch('/alerts');
        let data = await resp.json();
        let content = '<h2>Drift Events</h2><pre>'
            + JSON.stringify(data.drift_events, null, 2) + '</pre>';
        content += '<h2>Remediation Log</h2><pre>'
            + JSON.stringify(data.remediations, null, 2) + '</pre>';
        document.getElementById('alerts').innerHTML = content;
    }
    setInterval(refresh, 4000);
    window.onload = refresh;
    </script>
</body>
</html>
"#;
