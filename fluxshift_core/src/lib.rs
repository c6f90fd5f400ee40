//! Core implementation of fluxshift: gene perturbation of genome scale metabolic models, flux
//! sampling, and ranking of the flux shifts between sampled conditions.

pub mod configuration;
pub mod flux_analysis;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
pub mod perturbation;
pub mod pipeline;
pub mod ranking;
