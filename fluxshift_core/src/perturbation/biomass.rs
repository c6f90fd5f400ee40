//! Final adjustment of the biomass reaction once gene level perturbations are in place
use crate::flux_analysis::variability::FluxVariabilityOracle;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::query::ModelQuery;
use crate::perturbation::{optimum_fractional_bounds, PerturbationError};
use log::info;

/// Hold the biomass reaction between `max * lb_fraction` and its maximum
///
/// The maximum is taken from the oracle at the model's current, already perturbed, bounds. The
/// new bounds are applied to the model and returned.
pub fn finalize_biomass_bound<O>(
    model: &mut Model,
    oracle: &O,
    biomass_id: &str,
    lb_fraction: f64,
) -> Result<(f64, f64), PerturbationError>
where
    O: FluxVariabilityOracle<Model> + ?Sized,
{
    model.get_reaction(biomass_id)?;
    let ranges = oracle.flux_variability(model, &[biomass_id.to_string()])?;
    let bounds = optimum_fractional_bounds(&ranges, lb_fraction, 1.);
    let (lower, upper) = bounds
        .get(biomass_id)
        .copied()
        .unwrap_or((0., 0.));
    model.set_reaction_bounds(biomass_id, lower, upper)?;
    info!("Set biomass reaction {biomass_id} bounds to ({lower:.2}, {upper:.2})");
    Ok((lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::variability::ClarabelFva;
    use crate::metabolic_model::model::ModelError;
    use crate::perturbation::test_oracles::{FailingOracle, RecordingOracle};

    fn toy_model() -> Model {
        let path = format!(
            "{}/test_data/test_models/toy_model.json",
            env!("CARGO_MANIFEST_DIR")
        );
        Model::read_json(path).unwrap()
    }

    #[test]
    fn applies_fraction_of_maximum() {
        let mut model = toy_model();
        let oracle = RecordingOracle::new(&[("BIOMASS", 8.)]);
        let bounds = finalize_biomass_bound(&mut model, &oracle, "BIOMASS", 0.9).unwrap();
        assert!((bounds.0 - 7.2).abs() < 1e-12);
        assert!((bounds.1 - 8.).abs() < 1e-12);
        assert_eq!(model.reactions["BIOMASS"].bounds(), bounds);
        assert_eq!(oracle.calls.borrow()[0], vec!["BIOMASS".to_string()]);
    }

    #[test]
    fn toy_model_biomass() {
        let mut model = toy_model();
        let (lower, upper) =
            finalize_biomass_bound(&mut model, &ClarabelFva::new(), "BIOMASS", 0.9).unwrap();
        assert!((lower - 5.4).abs() < 1e-3);
        assert!((upper - 6.).abs() < 1e-3);
    }

    #[test]
    fn follows_knockouts() {
        let mut model = toy_model();
        model.knock_out_genes(&["g3".to_string()]).unwrap();
        let (lower, upper) =
            finalize_biomass_bound(&mut model, &ClarabelFva::new(), "BIOMASS", 0.9).unwrap();
        assert_eq!((lower, upper), (0., 0.));
        assert_eq!(model.reactions["BIOMASS"].bounds(), (0., 0.));
    }

    #[test]
    fn unknown_biomass_reaction() {
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        let oracle = RecordingOracle::new(&[]);
        assert_eq!(
            finalize_biomass_bound(&mut model, &oracle, "GROWTH", 0.9),
            Err(PerturbationError::Model(ModelError::ReactionNotFound(
                "GROWTH".to_string()
            )))
        );
        assert!(oracle.calls.borrow().is_empty());
        assert_eq!(model.bounds_snapshot(), before);
    }

    #[test]
    fn oracle_failure_leaves_bounds() {
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        assert!(finalize_biomass_bound(&mut model, &FailingOracle, "BIOMASS", 0.9).is_err());
        assert_eq!(model.bounds_snapshot(), before);
    }
}
