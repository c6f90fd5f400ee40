//! Constraint based analyses of a [`Model`]: flux balance analysis, flux variability analysis
//! and flux sampling.
//!
//! Every analysis starts from [`build_problem`], which turns the current state of the model
//! (bounds, knockouts, objective) into a linear program with one variable per reaction and one
//! steady state mass balance per metabolite.
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::constraint::Constraint;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::SolverError;
use crate::optimize::OptimizationStatus;
use indexmap::IndexMap;
use thiserror::Error;

pub mod fba;
pub mod sampling;
pub mod variability;

/// Build the steady state linear program of a model
///
/// Variables are the reaction fluxes (in model order) bounded by the reaction bounds, the
/// constraints are `S v = 0`, and the objective maximizes the model objective coefficients.
pub fn build_problem(model: &Model) -> Result<Problem, FluxAnalysisError> {
    let mut problem = Problem::new_maximization();
    let mut balances: IndexMap<&str, (Vec<usize>, Vec<f64>)> = IndexMap::new();

    for reaction in model.reactions.values() {
        let index = problem.add_new_variable(
            &reaction.id,
            reaction.lower_bound,
            reaction.upper_bound,
        )?;
        for (metabolite, coefficient) in &reaction.metabolites {
            let entry = balances.entry(metabolite.as_str()).or_default();
            entry.0.push(index);
            entry.1.push(*coefficient);
        }
    }

    for (metabolite, (indices, coefficients)) in balances {
        problem.add_constraint(
            metabolite,
            Constraint::new_equality(&indices, &coefficients, 0.),
        )?;
    }

    let (ids, coefficients): (Vec<&str>, Vec<f64>) = model
        .objective
        .iter()
        .filter(|(_, c)| **c != 0.)
        .map(|(id, c)| (id.as_str(), *c))
        .unzip();
    for id in &ids {
        if !model.reactions.contains_key(*id) {
            return Err(ModelError::ReactionNotFound(id.to_string()).into());
        }
    }
    problem.set_linear_objective(&ids, &coefficients)?;
    Ok(problem)
}

/// Errors raised by the flux analyses
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxAnalysisError {
    /// An id passed to the analysis does not exist in the model
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The linear program could not be constructed
    #[error("Unable to construct the linear program: {0}")]
    Problem(#[from] ProblemError),
    /// The solver failed outright
    #[error("Solver failed while {context}: {source}")]
    Solver {
        context: String,
        source: SolverError,
    },
    /// The solver could not find an optimal solution
    #[error("No optimal solution while {context}, solver status {status:?}")]
    Infeasible {
        context: String,
        status: OptimizationStatus,
    },
    /// An analysis was requested over no reactions
    #[error("No reactions were given for the analysis")]
    EmptyReactionSet,
    /// A sampler was asked for an invalid number of samples
    #[error("Invalid number of samples requested: {0}")]
    InvalidSampleCount(usize),
    /// Sampled points could not be collected into a table
    #[error("Unable to collect samples: {0}")]
    Sampling(String),
    /// The worker pool for parallel sampling could not be started
    #[error("Unable to start sampling workers: {0}")]
    WorkerPool(String),
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_models::toy_model;

    #[test]
    fn problem_from_model() {
        let model = toy_model();
        let problem = build_problem(&model).unwrap();
        assert_eq!(problem.num_variables(), model.reactions.len());
        assert_eq!(problem.constraints().len(), model.metabolites.len());
        assert_eq!(problem.objective().terms().len(), 1);
        let r3 = &problem.variables()["R3"];
        assert!((r3.upper_bound - 6.).abs() < 1e-25);
    }

    #[test]
    fn unknown_objective_reaction() {
        let mut model = toy_model();
        model.objective.insert("missing".to_string(), 1.);
        assert_eq!(
            build_problem(&model).unwrap_err(),
            FluxAnalysisError::Model(ModelError::ReactionNotFound("missing".to_string()))
        );
    }
}
