//! Stepped Lyapunov runner so callers can report progress between batches.

use crate::solve::build_iteration;
use js_sys::Float64Array;
use lyap_core::matrix::to_row_major;
use lyap_core::{LyapunovIteration, LyapunovSolution, Termination};
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Progress payload for the stepped Lyapunov solver.
#[derive(Debug, Serialize)]
pub(crate) struct LyapunovProgress {
    done: bool,
    converged: bool,
    iterations: usize,
    max_iterations: usize,
    residual: f64,
}

impl LyapunovProgress {
    fn of(iteration: &LyapunovIteration) -> Self {
        Self {
            done: iteration.is_done(),
            converged: iteration.termination() == Some(Termination::Converged),
            iterations: iteration.iterations(),
            max_iterations: iteration.settings().max_iterations,
            residual: iteration.residual(),
        }
    }
}

#[wasm_bindgen]
pub struct WasmLyapunovRunner {
    iteration: Option<LyapunovIteration>,
}

#[wasm_bindgen]
impl WasmLyapunovRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        transition: Vec<f64>,
        dimension: u32,
        shocks: Vec<f64>,
        shock_count: u32,
        initial: Option<Vec<f64>>,
        tolerance: f64,
        max_iterations: u32,
    ) -> Result<WasmLyapunovRunner, JsValue> {
        console_error_panic_hook::set_once();

        let iteration = build_iteration(
            &transition,
            dimension as usize,
            &shocks,
            shock_count as usize,
            initial,
            tolerance,
            max_iterations as usize,
        )
        .map_err(|e| JsValue::from_str(&format!("Lyapunov solve failed: {:#}", e)))?;

        Ok(WasmLyapunovRunner {
            iteration: Some(iteration),
        })
    }

    pub fn is_done(&self) -> bool {
        self.iteration.as_ref().map_or(true, LyapunovIteration::is_done)
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let iteration = self
            .iteration
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        for _ in 0..batch_size {
            match iteration.step() {
                Ok(Some(_)) => break,
                Ok(None) => {}
                Err(e) => {
                    // A diverged runner cannot be stepped again.
                    self.iteration = None;
                    return Err(JsValue::from_str(&format!("Lyapunov solve failed: {}", e)));
                }
            }
        }

        to_value(&LyapunovProgress::of(iteration))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let iteration = self
            .iteration
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&LyapunovProgress::of(iteration))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let iteration = self
            .iteration
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let termination = iteration
            .termination()
            .ok_or_else(|| JsValue::from_str("Lyapunov solver has not finished yet."))?;

        let solution = LyapunovSolution {
            covariance: iteration.covariance().clone(),
            iterations: iteration.iterations(),
            residual: iteration.residual(),
            termination,
        };

        to_value(&solution.report())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Current iterate, row-major, whether or not the runner has finished.
    pub fn get_covariance(&self) -> Result<Float64Array, JsValue> {
        let iteration = self
            .iteration
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        Ok(Float64Array::from(to_row_major(iteration.covariance()).as_slice()))
    }
}
