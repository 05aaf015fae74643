//! Ridge regression on standardized features.
//!
//! Columns are centred and scaled here, the target is centred on `ȳ`, and
//! smartcore solves the penalised normal equations with a Cholesky
//! factorisation. The fitted model is a handful of floats.

use crate::domain::model::RegressionModel;
use crate::utils::error::{EtlError, Result};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

pub fn fit_ridge(x: &[Vec<f64>], y: &[f64], lambda: f64) -> Result<RidgeFit> {
    let n = x.len();
    if n == 0 {
        return Err(model_error("cannot fit a model without samples"));
    }
    if y.len() != n {
        return Err(model_error(format!(
            "{} feature rows but {} targets",
            n,
            y.len()
        )));
    }
    let p = x[0].len();
    if p == 0 || x.iter().any(|row| row.len() != p) {
        return Err(model_error("feature rows have different lengths"));
    }
    if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
        return Err(model_error("training data contains NaN or infinite values"));
    }
    if !(lambda >= 0.0 && lambda.is_finite()) {
        return Err(model_error("ridge penalty must be a finite non-negative number"));
    }

    let mut means = Vec::with_capacity(p);
    let mut scales = Vec::with_capacity(p);
    for j in 0..p {
        let column: Vec<f64> = x.iter().map(|row| row[j]).collect();
        means.push((&column).mean());
        let std = (&column).population_std_dev();
        scales.push(if std.is_finite() && std > 0.0 { std } else { 1.0 });
    }

    let mut standardized: Vec<Vec<f64>> = x
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, v)| (v - means[j]) / scales[j])
                .collect()
        })
        .collect();
    let y_mean = y.mean();
    let mut centred: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

    // smartcore refuses fits with no more rows than columns. Zero rows leave
    // XᵀX and Xᵀy unchanged.
    while standardized.len() <= p {
        standardized.push(vec![0.0; p]);
        centred.push(0.0);
    }

    // 特徵已標準化，所以關閉 smartcore 自己的 normalize
    let params = RidgeRegressionParameters::default()
        .with_alpha(lambda)
        .with_solver(RidgeRegressionSolverName::Cholesky)
        .with_normalize(false);
    let matrix = DenseMatrix::from_2d_vec(&standardized);
    let fit = RidgeRegression::<f64, f64, DenseMatrix<f64>, Vec<f64>>::fit(
        &matrix, &centred, params,
    )
    .map_err(|e| {
        model_error(format!(
            "normal equations could not be solved ({}); add samples or raise ridge_lambda",
            e
        ))
    })?;

    let weights = fit.coefficients();
    let coefficients: Vec<f64> = (0..p).map(|j| *weights.get((j, 0))).collect();
    let intercept = y_mean + fit.intercept().clone();
    if coefficients.iter().any(|c| !c.is_finite()) || !intercept.is_finite() {
        return Err(model_error(
            "normal equations are singular; add samples or raise ridge_lambda",
        ));
    }

    Ok(RidgeFit {
        means,
        scales,
        coefficients,
        intercept,
    })
}

/// Raw model output, before the minimum-prediction floor.
pub fn predict_raw(model: &RegressionModel, features: &[f64]) -> Result<f64> {
    let n = model.n_features();
    if features.len() != n || model.means.len() != n || model.scales.len() != n {
        return Err(model_error(format!(
            "model '{}' expects {} features, got {}",
            model.name,
            n,
            features.len()
        )));
    }

    let value = features
        .iter()
        .enumerate()
        .map(|(j, v)| model.coefficients[j] * (v - model.means[j]) / model.scales[j])
        .sum::<f64>()
        + model.intercept;

    if !value.is_finite() {
        return Err(model_error(format!(
            "model '{}' produced a non-finite prediction",
            model.name
        )));
    }
    Ok(value)
}

fn model_error(message: impl Into<String>) -> EtlError {
    EtlError::ModelError {
        message: message.into(),
    }
}
