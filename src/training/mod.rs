pub mod regression;
pub mod split;

use crate::domain::model::{MoistureCycle, RegressionModel, TrainSettings, WaterCycle};
use crate::utils::error::Result;
use statrs::statistics::Statistics;

pub use regression::{fit_ridge, predict_raw};
pub use split::{train_test_split, Split};

pub fn model_filename(name: &str) -> String {
    format!("{}_model.json", name)
}

/// Feature matrix and target column for one model.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    pub fn from_moisture_cycles(cycles: &[MoistureCycle]) -> Self {
        Self {
            feature_names: MoistureCycle::FEATURES.iter().map(|s| s.to_string()).collect(),
            x: cycles.iter().map(MoistureCycle::features).collect(),
            y: cycles.iter().map(|c| c.duration).collect(),
        }
    }

    pub fn from_water_cycles(cycles: &[WaterCycle]) -> Self {
        Self {
            feature_names: WaterCycle::FEATURES.iter().map(|s| s.to_string()).collect(),
            x: cycles.iter().map(WaterCycle::features).collect(),
            y: cycles.iter().map(|c| c.duration).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    fn select(&self, rows: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            rows.iter().map(|&i| self.x[i].clone()).collect(),
            rows.iter().map(|&i| self.y[i]).collect(),
        )
    }
}

/// Fits, evaluates and returns a model, or `None` when there is nothing to
/// learn from.
pub fn train_model(
    name: &str,
    dataset: &Dataset,
    test_fraction: f64,
    settings: &TrainSettings,
) -> Result<Option<RegressionModel>> {
    if dataset.is_empty() {
        tracing::warn!("No data available for training {} model", name);
        return Ok(None);
    }
    if dataset.len() == 1 {
        tracing::warn!(
            "Only 1 sample available for {} model - using entire dataset for training",
            name
        );
    }

    let split = train_test_split(dataset.len(), test_fraction, settings.seed);
    let (train_x, train_y) = dataset.select(&split.train);

    tracing::info!(
        "Training {} model on {} samples ({} held out)",
        name,
        split.train.len(),
        split.test.len()
    );
    let fit = fit_ridge(&train_x, &train_y, settings.ridge_lambda)?;

    let mut model = RegressionModel {
        name: name.to_string(),
        feature_names: dataset.feature_names.clone(),
        means: fit.means,
        scales: fit.scales,
        coefficients: fit.coefficients,
        intercept: fit.intercept,
        ridge_lambda: settings.ridge_lambda,
        min_prediction_seconds: settings.min_prediction_seconds,
        train_samples: split.train.len(),
        test_samples: split.test.len(),
        mae_seconds: None,
        trained_at: chrono::Utc::now().to_rfc3339(),
    };

    let (test_x, test_y) = dataset.select(&split.test);
    if test_x.is_empty() {
        tracing::warn!("Insufficient data for proper evaluation of {} model", name);
    } else {
        let mae = mean_absolute_error(&model, &test_x, &test_y)?;
        tracing::info!("{} model MAE: {:.1} seconds", name, mae);
        model.mae_seconds = Some(mae);
    }

    Ok(Some(model))
}

/// Moisture cycles are rare, so at most one cycle is held out.
pub fn train_moisture_model(
    name: &str,
    cycles: &[MoistureCycle],
    settings: &TrainSettings,
) -> Result<Option<RegressionModel>> {
    let dataset = Dataset::from_moisture_cycles(cycles);
    let test_fraction = if dataset.is_empty() {
        settings.test_fraction
    } else {
        settings.test_fraction.min(1.0 / dataset.len() as f64)
    };
    train_model(name, &dataset, test_fraction, settings)
}

pub fn train_water_level_model(
    name: &str,
    cycles: &[WaterCycle],
    settings: &TrainSettings,
) -> Result<Option<RegressionModel>> {
    let dataset = Dataset::from_water_cycles(cycles);
    train_model(name, &dataset, settings.test_fraction, settings)
}

pub fn mean_absolute_error(model: &RegressionModel, x: &[Vec<f64>], y: &[f64]) -> Result<f64> {
    let mut errors = Vec::with_capacity(y.len());
    for (features, target) in x.iter().zip(y) {
        errors.push((predict_raw(model, features)? - target).abs());
    }
    Ok(errors.mean())
}

/// Model output in seconds, never below the model's floor.
pub fn predict_seconds(model: &RegressionModel, features: &[f64]) -> Result<f64> {
    Ok(predict_raw(model, features)?.max(model.min_prediction_seconds))
}

/// Seconds until the soil needs watering. Any failure, including a model
/// that could not be loaded, yields `fallback_seconds`.
pub fn predict_time_to_water(
    model: Result<RegressionModel>,
    temperature: f64,
    humidity: f64,
    light_intensity: f64,
    fallback_seconds: f64,
) -> f64 {
    match model.and_then(|m| predict_seconds(&m, &[temperature, humidity, light_intensity])) {
        Ok(seconds) => seconds,
        Err(e) => {
            tracing::error!("Error making prediction: {}", e);
            fallback_seconds
        }
    }
}

/// Seconds until the reservoir runs dry.
pub fn predict_time_to_empty(
    model: &RegressionModel,
    current_level: f64,
    temperature: f64,
    humidity: f64,
    light_intensity: f64,
) -> Result<f64> {
    predict_seconds(
        model,
        &[current_level, temperature, humidity, light_intensity],
    )
}
