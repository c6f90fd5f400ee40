//! Gene level perturbations of a model, expressed as reaction bound changes
//!
//! Activation of genes pins their irreversible reactions close to their maximal feasible flux
//! ([`activation::resolve_activation_bounds`]), knockouts go through
//! [`Model::knock_out_genes`](crate::metabolic_model::model::Model::knock_out_genes), and once
//! every gene level change is in place the biomass reaction is held near its new optimum
//! ([`biomass::finalize_biomass_bound`]).
use crate::flux_analysis::variability::FluxRange;
use crate::flux_analysis::FluxAnalysisError;
use crate::metabolic_model::model::{BoundsMap, ModelError};
use indexmap::IndexMap;
use thiserror::Error;

pub mod activation;
pub mod biomass;

/// Bounds `(maximum * lb_fraction, maximum * ub_fraction)` for each reaction
///
/// Only the maximum of each range is used. `lower <= upper` holds whenever
/// `lb_fraction <= ub_fraction` and the maximum is non negative, and is not enforced otherwise.
pub fn optimum_fractional_bounds(
    ranges: &IndexMap<String, FluxRange>,
    lb_fraction: f64,
    ub_fraction: f64,
) -> BoundsMap {
    ranges
        .iter()
        .map(|(id, range)| {
            (
                id.clone(),
                (range.maximum * lb_fraction, range.maximum * ub_fraction),
            )
        })
        .collect()
}

/// Errors raised while resolving perturbation bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerturbationError {
    /// A gene or reaction is missing from the model, or bounds are invalid
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The flux variability oracle failed
    #[error(transparent)]
    FluxAnalysis(#[from] FluxAnalysisError),
    /// No target genes were given
    #[error("No target genes were given")]
    EmptyGeneSet,
}
