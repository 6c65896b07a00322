//! HTTP client for the deployed prediction endpoint
//!
//! Isolates all transport concerns. The monitored model is reached as a
//! request/response endpoint taking `{"instances": [{col: val, ...}, ...]}`
//! and returning `{"predictions": [...]}` in row order.

use crate::error::{DriftwatchError, Result};
use crate::stream::{Batch, FeatureData};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Anything that can turn a batch into row-ordered predictions.
///
/// The monitor loop is generic over this seam so tests can run without a
/// live endpoint.
#[allow(async_fn_in_trait)]
pub trait Predictor {
    async fn predict(&self, batch: &Batch) -> Result<Vec<f64>>;
}

/// Client for the deployed model's prediction endpoint.
#[derive(Debug, Clone)]
pub struct ModelClient {
    endpoint_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Value>,
}

impl ModelClient {
    /// Build a client with a mandatory per-request timeout so an
    /// unreachable endpoint cannot stall the monitor indefinitely.
    pub fn new(endpoint_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            endpoint_url: endpoint_url.to_string(),
            http,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl Predictor for ModelClient {
    async fn predict(&self, batch: &Batch) -> Result<Vec<f64>> {
        let instances = batch_to_instances(batch);
        let payload = serde_json::json!({ "instances": instances });

        let response = self
            .http
            .post(&self.endpoint_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriftwatchError::InferenceUnavailable(format!(
                "endpoint returned HTTP {}",
                status
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| DriftwatchError::InferenceUnavailable(format!("malformed response: {}", e)))?;

        let predictions = parse_predictions(&body.predictions)?;
        if predictions.len() != batch.n_rows() {
            return Err(DriftwatchError::InferenceUnavailable(format!(
                "expected {} predictions, got {}",
                batch.n_rows(),
                predictions.len()
            )));
        }
        Ok(predictions)
    }
}

/// Serialize batch rows to the endpoint's record-oriented wire format.
/// NaN values are sent as JSON null.
pub(crate) fn batch_to_instances(batch: &Batch) -> Vec<Map<String, Value>> {
    let n = batch.n_rows();
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Map::new();
        for col in &batch.features {
            let value = match &col.data {
                FeatureData::Numeric(values) => serde_json::Number::from_f64(values[i])
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                FeatureData::Text(values) => Value::String(values[i].clone()),
            };
            row.insert(col.name.clone(), value);
        }
        rows.push(row);
    }
    rows
}

pub(crate) fn parse_predictions(raw: &[Value]) -> Result<Vec<f64>> {
    raw.iter()
        .map(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| {
                    DriftwatchError::InferenceUnavailable(format!(
                        "non-numeric prediction value: {}",
                        v
                    ))
                })
        })
        .collect()
}
