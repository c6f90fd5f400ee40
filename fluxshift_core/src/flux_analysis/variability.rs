//! Flux variability analysis
//!
//! For each requested reaction, find the minimum and maximum flux compatible with the current
//! bounds while the model objective stays within `fraction_of_optimum` of its optimum.
use crate::configuration::Configuration;
use crate::flux_analysis::fba::solve_problem;
use crate::flux_analysis::{build_problem, FluxAnalysisError};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::clarabel::ClarabelSolver;
use indexmap::IndexMap;
use log::debug;

/// Feasible flux range of a reaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxRange {
    pub minimum: f64,
    pub maximum: f64,
}

/// Anything able to report the feasible flux range of reactions of a model `M`
pub trait FluxVariabilityOracle<M: ?Sized> {
    /// Feasible flux range of each requested reaction at the model's current bounds, keyed and
    /// ordered like `reaction_ids`
    fn flux_variability(
        &self,
        model: &M,
        reaction_ids: &[String],
    ) -> Result<IndexMap<String, FluxRange>, FluxAnalysisError>;
}

/// Flux variability analysis backed by the Clarabel solver
#[derive(Debug, Clone)]
pub struct ClarabelFva {
    /// Fraction of the optimal objective value that must be kept while varying fluxes
    pub fraction_of_optimum: f64,
    /// Absolute slack subtracted from the objective constraint
    pub tolerance: f64,
    solver: ClarabelSolver,
}

impl Default for ClarabelFva {
    fn default() -> Self {
        let configuration = Configuration::current();
        Self {
            fraction_of_optimum: configuration.fraction_of_optimum,
            tolerance: configuration.tolerance,
            solver: ClarabelSolver::new(),
        }
    }
}

impl ClarabelFva {
    pub fn new() -> Self {
        Self::default()
    }

    /// FVA keeping the objective above the given fraction of its optimum
    pub fn with_fraction_of_optimum(fraction_of_optimum: f64) -> Self {
        Self {
            fraction_of_optimum,
            ..Self::default()
        }
    }

    /// Build the model problem with the objective held near its optimum
    fn constrained_problem(&self, model: &Model) -> Result<Problem, FluxAnalysisError> {
        let mut problem = build_problem(model)?;
        if problem.objective().terms().is_empty() || self.fraction_of_optimum <= 0. {
            return Ok(problem);
        }
        let optimum = solve_problem(&problem, &self.solver, "optimizing the model objective")?
            .objective_value;
        let (indices, coefficients): (Vec<usize>, Vec<f64>) = problem
            .objective()
            .terms()
            .iter()
            .map(|t| (t.variable, t.coefficient))
            .unzip();
        let slack = self.tolerance * optimum.abs().max(1.);
        let lower = self.fraction_of_optimum * optimum - slack;
        debug!("Constraining objective to at least {lower} (optimum {optimum})");
        problem.add_constraint(
            "fva_objective",
            Constraint::new_inequality(&indices, &coefficients, lower, f64::INFINITY),
        )?;
        Ok(problem)
    }

    /// Optimize a single reaction flux in the given direction
    fn extreme_flux(
        &self,
        problem: &mut Problem,
        reaction_id: &str,
        sense: ObjectiveSense,
    ) -> Result<f64, FluxAnalysisError> {
        problem.set_linear_objective(&[reaction_id], &[1.])?;
        problem.update_objective_sense(sense);
        let direction = match sense {
            ObjectiveSense::Minimize => "minimizing",
            ObjectiveSense::Maximize => "maximizing",
        };
        let context = format!("{direction} flux through reaction {reaction_id}");
        Ok(solve_problem(problem, &self.solver, &context)?.objective_value)
    }

    /// Remove interior point noise from an extreme flux
    ///
    /// The value is clamped into the reaction bounds, and values within `tolerance` of zero
    /// become exactly zero, so a blocked reaction reports a range of `[0, 0]`.
    fn snap_extreme(&self, value: f64, (lower, upper): (f64, f64)) -> f64 {
        let value = value.max(lower).min(upper);
        if value.abs() <= self.tolerance {
            0.
        } else {
            value
        }
    }
}

impl FluxVariabilityOracle<Model> for ClarabelFva {
    fn flux_variability(
        &self,
        model: &Model,
        reaction_ids: &[String],
    ) -> Result<IndexMap<String, FluxRange>, FluxAnalysisError> {
        if reaction_ids.is_empty() {
            return Err(FluxAnalysisError::EmptyReactionSet);
        }
        if let Some(missing) = reaction_ids
            .iter()
            .find(|id| !model.reactions.contains_key(id.as_str()))
        {
            return Err(ModelError::ReactionNotFound(missing.clone()).into());
        }

        let mut problem = self.constrained_problem(model)?;
        let mut ranges = IndexMap::with_capacity(reaction_ids.len());
        for id in reaction_ids {
            let bounds = model.reactions[id.as_str()].bounds();
            let minimum = self.extreme_flux(&mut problem, id, ObjectiveSense::Minimize)?;
            let maximum = self.extreme_flux(&mut problem, id, ObjectiveSense::Maximize)?;
            let minimum = self.snap_extreme(minimum, bounds);
            let maximum = self.snap_extreme(maximum, bounds);
            debug!("FVA range of {id}: [{minimum}, {maximum}]");
            ranges.insert(id.clone(), FluxRange { minimum, maximum });
        }
        Ok(ranges)
    }
}

/// Flux variability over every reaction of a model
pub fn flux_variability_analysis<O: FluxVariabilityOracle<Model> + ?Sized>(
    model: &Model,
    oracle: &O,
) -> Result<IndexMap<String, FluxRange>, FluxAnalysisError> {
    let ids: Vec<String> = model.reactions.keys().cloned().collect();
    oracle.flux_variability(model, &ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_models::toy_model;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranges_at_optimum() {
        let model = toy_model();
        let fva = ClarabelFva::new();
        let ranges = fva
            .flux_variability(&model, &ids(&["BIOMASS", "R4", "R1"]))
            .unwrap();
        let keys: Vec<&String> = ranges.keys().collect();
        assert_eq!(keys, vec!["BIOMASS", "R4", "R1"]);
        assert!((ranges["BIOMASS"].maximum - 6.).abs() < 1e-3);
        assert!((ranges["BIOMASS"].minimum - 6.).abs() < 1e-3);
        assert!(ranges["R4"].minimum.abs() < 1e-3);
        assert!((ranges["R4"].maximum - 4.).abs() < 1e-3);
        assert!((ranges["R1"].maximum - 10.).abs() < 1e-3);
    }

    #[test]
    fn ranges_without_optimum_constraint() {
        let model = toy_model();
        let fva = ClarabelFva::with_fraction_of_optimum(0.);
        let ranges = fva.flux_variability(&model, &ids(&["BIOMASS"])).unwrap();
        assert!(ranges["BIOMASS"].minimum.abs() < 1e-3);
        assert!((ranges["BIOMASS"].maximum - 6.).abs() < 1e-3);
    }

    #[test]
    fn blocked_reactions_report_exact_zero() {
        let mut model = toy_model();
        model.knock_out_genes(&ids(&["g3"])).unwrap();
        let ranges = ClarabelFva::new()
            .flux_variability(&model, &ids(&["BIOMASS", "R3", "R1"]))
            .unwrap();
        assert_eq!(ranges["BIOMASS"], FluxRange { minimum: 0., maximum: 0. });
        assert_eq!(ranges["R3"], FluxRange { minimum: 0., maximum: 0. });
        assert!((ranges["R1"].maximum - 10.).abs() < 1e-3);
    }

    #[test]
    fn extremes_are_snapped_into_bounds() {
        let fva = ClarabelFva::new();
        assert_eq!(fva.snap_extreme(-1.3e-11, (0., 1000.)), 0.);
        assert_eq!(fva.snap_extreme(4e-9, (-1000., 1000.)), 0.);
        assert_eq!(fva.snap_extreme(6.000001, (0., 6.)), 6.);
        assert_eq!(fva.snap_extreme(-2.5, (-1000., 1000.)), -2.5);
    }

    #[test]
    fn whole_model() {
        let model = toy_model();
        let ranges = flux_variability_analysis(&model, &ClarabelFva::new()).unwrap();
        assert_eq!(ranges.len(), model.reactions.len());
    }

    #[test]
    fn invalid_requests() {
        let model = toy_model();
        let fva = ClarabelFva::new();
        assert_eq!(
            fva.flux_variability(&model, &[]).unwrap_err(),
            FluxAnalysisError::EmptyReactionSet
        );
        assert_eq!(
            fva.flux_variability(&model, &ids(&["R1", "nope"])).unwrap_err(),
            FluxAnalysisError::Model(ModelError::ReactionNotFound("nope".to_string()))
        );
    }
}
