//! Batch streaming over a fixed dataset
//!
//! Replays a dataset in fixed-size batches toward the monitored endpoint,
//! separating feature columns from the ground-truth target column. Iteration
//! follows the dataset's natural row order so runs are reproducible.

use crate::error::{DriftwatchError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Values of a single feature column within one batch.
#[derive(Debug, Clone)]
pub enum FeatureData {
    /// Numeric column; missing values are NaN
    Numeric(Vec<f64>),
    /// String-valued column; missing values are empty strings
    Text(Vec<String>),
}

impl FeatureData {
    pub fn len(&self) -> usize {
        match self {
            FeatureData::Numeric(v) => v.len(),
            FeatureData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named feature column slice.
#[derive(Debug, Clone)]
pub struct FeatureColumn {
    pub name: String,
    pub data: FeatureData,
}

/// One streamed batch: feature columns plus optional aligned labels.
///
/// Transient; constructed per iteration and consumed immediately.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based position of this batch in the stream
    pub index: usize,
    pub features: Vec<FeatureColumn>,
    /// Ground-truth values, 1:1 with rows; None when the dataset carries no
    /// target column (online serving scenario)
    pub labels: Option<Vec<f64>>,
}

impl Batch {
    pub fn n_rows(&self) -> usize {
        self.features.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn batch_id(&self) -> String {
        format!("batch_{:04}", self.index)
    }
}

/// Streams a dataset in fixed-size contiguous batches.
pub struct BatchStream {
    features: DataFrame,
    labels: Option<Vec<f64>>,
    batch_size: usize,
    cursor: usize,
    batch_index: usize,
}

impl BatchStream {
    /// Open a CSV dataset and prepare it for batch iteration.
    ///
    /// If `target_column` is absent the stream produces label-less batches.
    pub fn from_csv(path: &Path, target_column: &str, batch_size: usize) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| DriftwatchError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()?;

        Self::from_frame(df, target_column, batch_size)
    }

    /// Build a stream from an in-memory frame.
    pub fn from_frame(df: DataFrame, target_column: &str, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(DriftwatchError::DataError(
                "batch size must be at least 1".to_string(),
            ));
        }

        let has_target = df.get_columns().iter().any(|s| s.name() == target_column);
        let (features, labels) = if has_target {
            let target = df.column(target_column)?;
            let cast = target.cast(&DataType::Float64)?;
            let values: Vec<f64> = cast
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            (df.drop(target_column)?, Some(values))
        } else {
            (df, None)
        };

        Ok(Self {
            features,
            labels,
            batch_size,
            cursor: 0,
            batch_index: 0,
        })
    }

    /// Total rows in the underlying dataset.
    pub fn n_rows(&self) -> usize {
        self.features.height()
    }

    /// Number of batches this stream will yield.
    pub fn n_batches(&self) -> usize {
        self.n_rows().div_ceil(self.batch_size)
    }

    /// Whether unconsumed rows remain.
    pub fn has_next(&self) -> bool {
        self.cursor < self.n_rows()
    }

    /// Produce the next contiguous batch and advance the cursor.
    ///
    /// The final batch may be smaller than the configured batch size.
    pub fn next_batch(&mut self) -> Result<Batch> {
        if !self.has_next() {
            return Err(DriftwatchError::ExhaustedSource);
        }

        let start = self.cursor;
        let len = self.batch_size.min(self.n_rows() - start);
        let slice = self.features.slice(start as i64, len);

        let mut features = Vec::with_capacity(slice.width());
        for series in slice.get_columns() {
            features.push(FeatureColumn {
                name: series.name().to_string(),
                data: series_to_feature(series)?,
            });
        }

        let labels = self
            .labels
            .as_ref()
            .map(|all| all[start..start + len].to_vec());

        let batch = Batch {
            index: self.batch_index,
            features,
            labels,
        };

        self.cursor += len;
        self.batch_index += 1;
        Ok(batch)
    }
}

/// Convert a polars series into batch feature data.
///
/// Numeric dtypes become f64 with nulls as NaN; everything else is carried
/// as strings.
pub(crate) fn series_to_feature(series: &Series) -> Result<FeatureData> {
    if series.dtype().is_numeric() {
        let cast = series.cast(&DataType::Float64)?;
        let values: Vec<f64> = cast
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(FeatureData::Numeric(values))
    } else {
        let cast = series.cast(&DataType::String)?;
        let values: Vec<String> = cast
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or("").to_string())
            .collect();
        Ok(FeatureData::Text(values))
    }
}
