//! Bounds forcing flux through the reactions of activated genes
use crate::flux_analysis::variability::FluxVariabilityOracle;
use crate::metabolic_model::model::BoundsMap;
use crate::metabolic_model::query::ModelQuery;
use crate::perturbation::{optimum_fractional_bounds, PerturbationError};
use indexmap::IndexSet;
use log::{debug, warn};

/// Bounds resolved for a set of activated genes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationBounds {
    /// New bounds of the irreversible reactions of the genes, in discovery order
    pub bounds: BoundsMap,
    /// Reversible reactions of the genes, left untouched
    pub skipped_reversible: Vec<String>,
}

/// Resolve the bounds of the reactions associated with `gene_ids`
///
/// Every gene is looked up before anything else, so an unknown gene fails the call without any
/// oracle request. Reversible reactions are reported as skipped. The irreversible ones are passed
/// to the oracle at the model's current bounds and bounded to
/// `(max * lb_fraction, max)`. The model is not modified, the caller applies the bounds.
pub fn resolve_activation_bounds<M, O>(
    model: &M,
    oracle: &O,
    gene_ids: &[String],
    lb_fraction: f64,
) -> Result<ActivationBounds, PerturbationError>
where
    M: ModelQuery + ?Sized,
    O: FluxVariabilityOracle<M> + ?Sized,
{
    if gene_ids.is_empty() {
        return Err(PerturbationError::EmptyGeneSet);
    }
    for gene_id in gene_ids {
        model.get_gene(gene_id)?;
    }

    let mut irreversible: IndexSet<String> = IndexSet::new();
    let mut skipped_reversible: IndexSet<String> = IndexSet::new();
    for gene_id in gene_ids {
        for reaction in model.reactions_of(gene_id)? {
            if reaction.is_reversible() {
                skipped_reversible.insert(reaction.id.clone());
            } else {
                irreversible.insert(reaction.id.clone());
            }
        }
    }
    let skipped_reversible: Vec<String> = skipped_reversible.into_iter().collect();
    if !skipped_reversible.is_empty() {
        warn!("Ignoring reversible reactions: {:?}", skipped_reversible);
    }
    if irreversible.is_empty() {
        warn!("No irreversible reactions are associated with genes {:?}", gene_ids);
        return Ok(ActivationBounds {
            bounds: BoundsMap::new(),
            skipped_reversible,
        });
    }

    let reaction_ids: Vec<String> = irreversible.into_iter().collect();
    debug!("Resolving activation bounds for {:?}", reaction_ids);
    let ranges = oracle.flux_variability(model, &reaction_ids)?;
    Ok(ActivationBounds {
        bounds: optimum_fractional_bounds(&ranges, lb_fraction, 1.),
        skipped_reversible,
    })
}
