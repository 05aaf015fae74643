pub mod blob;
pub mod bundle;
pub mod tables;

use crate::domain::model::{Artifact, ExportFormat, RegressionModel};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_identifier;

pub use blob::{encode_model, render_blob};
pub use bundle::bundle_artifacts;
pub use tables::render_tables;

/// Firmware sources for one model, named after `name`.
pub fn render_model(
    model: &RegressionModel,
    name: &str,
    format: ExportFormat,
) -> Result<Vec<Artifact>> {
    validate_identifier("export model name", name)?;

    let n = model.n_features();
    if model.means.len() != n || model.scales.len() != n {
        return Err(EtlError::ModelError {
            message: format!("model '{}' has inconsistent table lengths", model.name),
        });
    }
    let all_values = model
        .means
        .iter()
        .chain(&model.scales)
        .chain(&model.coefficients)
        .chain([&model.intercept, &model.min_prediction_seconds]);
    for value in all_values {
        if !value.is_finite() || value.abs() > f32::MAX as f64 {
            return Err(EtlError::ModelError {
                message: format!("model '{}' has a value that does not fit in f32", model.name),
            });
        }
    }

    let artifacts = match format {
        ExportFormat::Tables => render_tables(model, name),
        ExportFormat::Blob => vec![render_blob(model, name)],
    };
    for artifact in &artifacts {
        tracing::debug!(
            "Rendered {} ({} bytes)",
            artifact.filename,
            artifact.contents.len()
        );
    }
    Ok(artifacts)
}

#[cfg(test)]
pub(crate) fn test_model() -> RegressionModel {
    RegressionModel {
        name: "moisture".to_string(),
        feature_names: vec![
            "start_temp".to_string(),
            "start_humidity".to_string(),
            "avg_light".to_string(),
        ],
        means: vec![25.0, 60.0, 1500.0],
        scales: vec![2.0, 5.0, 1.0],
        coefficients: vec![-120.5, 30.25, 0.0],
        intercept: 5400.0,
        ridge_lambda: 1e-3,
        min_prediction_seconds: 60.0,
        train_samples: 9,
        test_samples: 1,
        mae_seconds: Some(12.5),
        trained_at: "2025-04-01T00:00:00+00:00".to_string(),
    }
}
