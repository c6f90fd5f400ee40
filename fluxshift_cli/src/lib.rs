//! Command line front end of fluxshift
//!
//! - `fluxshift-sample` perturbs a model and samples its flux space
//! - `fluxshift-rank` ranks the flux shifts between two sampled conditions

pub mod rank;
pub mod sample;

/// Initialise logging at `info`, overridable through `RUST_LOG`
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
