use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::timestamp;

/// One row of the sensor log, as recorded by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub soil_moisture: f64,
    pub water_level: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub light_intensity: f64,
}

/// Column order of a dataset file, written even when it has no rows.
pub trait CsvRecord {
    const COLUMNS: &'static [&'static str];
}

/// Per-reading deltas against the previous reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub soil_moisture: f64,
    pub time_diff: f64,
    pub moisture_diff: f64,
    pub moisture_rate: f64,
}

/// A moisture drop-and-recovery interval; `duration` is the training target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureCycle {
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    pub duration: f64,
    pub start_temp: f64,
    pub start_humidity: f64,
    pub avg_light: f64,
}

impl CsvRecord for FeatureRow {
    const COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "soil_moisture",
        "time_diff",
        "moisture_diff",
        "moisture_rate",
    ];
}

impl CsvRecord for MoistureCycle {
    const COLUMNS: &'static [&'static str] = &[
        "start_time",
        "end_time",
        "duration",
        "start_temp",
        "start_humidity",
        "avg_light",
    ];
}

impl MoistureCycle {
    pub const FEATURES: [&'static str; 3] = ["start_temp", "start_humidity", "avg_light"];

    pub fn features(&self) -> Vec<f64> {
        vec![self.start_temp, self.start_humidity, self.avg_light]
    }
}

/// A run of low-reservoir readings; `duration` is the training target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterCycle {
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    pub start_level: f64,
    pub end_level: f64,
    pub avg_temp: f64,
    pub avg_humidity: f64,
    pub avg_light: f64,
    pub duration: f64,
}

impl CsvRecord for WaterCycle {
    const COLUMNS: &'static [&'static str] = &[
        "start_time",
        "end_time",
        "start_level",
        "end_level",
        "avg_temp",
        "avg_humidity",
        "avg_light",
        "duration",
    ];
}

impl WaterCycle {
    pub const FEATURES: [&'static str; 4] =
        ["start_level", "avg_temp", "avg_humidity", "avg_light"];

    pub fn features(&self) -> Vec<f64> {
        vec![self.start_level, self.avg_temp, self.avg_humidity, self.avg_light]
    }
}

/// Standardized ridge regression, small enough to ship as firmware constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub name: String,
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub ridge_lambda: f64,
    pub min_prediction_seconds: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub mae_seconds: Option<f64>,
    pub trained_at: String,
}

impl RegressionModel {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub reading_count: usize,
    pub features: Vec<FeatureRow>,
    pub moisture_cycles: Vec<MoistureCycle>,
    pub water_cycles: Vec<WaterCycle>,
    pub moisture_model: Option<RegressionModel>,
    pub water_model: Option<RegressionModel>,
}

impl TransformResult {
    pub fn models(&self) -> impl Iterator<Item = &RegressionModel> {
        self.moisture_model.iter().chain(self.water_model.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Moisture below this opens a cycle.
    pub moisture_start_below: f64,
    /// Moisture at or above this closes an open cycle.
    pub moisture_end_at_or_above: f64,
    pub low_water_level: f64,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            moisture_start_below: 70.0,
            moisture_end_at_or_above: 40.0,
            low_water_level: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    pub test_fraction: f64,
    pub seed: u64,
    pub ridge_lambda: f64,
    pub min_prediction_seconds: f64,
    pub fallback_prediction_seconds: f64,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            ridge_lambda: 1e-3,
            min_prediction_seconds: 60.0,
            fallback_prediction_seconds: 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `.h` declarations plus `.cpp` definitions of `std::array` tables.
    Tables,
    /// A single header holding the packed model as a byte array.
    Blob,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tables" => Ok(Self::Tables),
            "blob" => Ok(Self::Blob),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub moisture_name: String,
    pub water_name: String,
    pub bundle: bool,
    pub bundle_filename: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Tables,
            moisture_name: "moisture".to_string(),
            water_name: "water_level".to_string(),
            bundle: false,
            bundle_filename: "firmware_bundle.zip".to_string(),
        }
    }
}

/// A generated firmware source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub contents: String,
}
