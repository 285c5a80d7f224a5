//! wasm-bindgen bridge for `lyap_core`.

mod runner;
mod solve;

pub use runner::WasmLyapunovRunner;
pub use solve::{solve_discrete_lyapunov, spectral_radius};
