//! One-shot solver entry points and input conversion helpers.

use anyhow::{Context, Result};
use lyap_core::matrix::from_row_major;
use lyap_core::stability;
use lyap_core::{LyapunovIteration, LyapunovProblem, LyapunovSettings};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Builds a stepped iteration from row-major JS arrays.
pub(crate) fn build_iteration(
    transition: &[f64],
    dimension: usize,
    shocks: &[f64],
    shock_count: usize,
    initial: Option<Vec<f64>>,
    tolerance: f64,
    max_iterations: usize,
) -> Result<LyapunovIteration> {
    let a = from_row_major(transition, dimension, dimension).context("transition matrix")?;
    let sigma = from_row_major(shocks, dimension, shock_count).context("shock matrix")?;
    let seed = initial
        .map(|values| from_row_major(&values, dimension, dimension))
        .transpose()
        .context("initial covariance")?;

    let settings = LyapunovSettings {
        tolerance,
        max_iterations,
    };
    let problem = LyapunovProblem::new(a, &sigma)?;
    Ok(LyapunovIteration::new(problem, seed, settings)?)
}

#[wasm_bindgen]
pub fn solve_discrete_lyapunov(
    transition: Vec<f64>,
    dimension: u32,
    shocks: Vec<f64>,
    shock_count: u32,
    initial: Option<Vec<f64>>,
    tolerance: f64,
    max_iterations: u32,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let solution = build_iteration(
        &transition,
        dimension as usize,
        &shocks,
        shock_count as usize,
        initial,
        tolerance,
        max_iterations as usize,
    )
    .and_then(|iteration| iteration.run().map_err(Into::into))
    .map_err(|e| JsValue::from_str(&format!("Lyapunov solve failed: {:#}", e)))?;

    to_value(&solution.report())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn spectral_radius(transition: Vec<f64>, dimension: u32) -> Result<f64, JsValue> {
    let dim = dimension as usize;
    from_row_major(&transition, dim, dim)
        .map_err(anyhow::Error::from)
        .and_then(|a| stability::spectral_radius(&a))
        .map_err(|e| JsValue::from_str(&format!("Spectral radius failed: {}", e)))
}
