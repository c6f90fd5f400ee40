//! Flux balance analysis
use crate::flux_analysis::{build_problem, FluxAnalysisError};
use crate::metabolic_model::model::Model;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::clarabel::ClarabelSolver;
use crate::optimize::solvers::LinearSolver;
use indexmap::IndexMap;

/// Optimal flux distribution of a model
#[derive(Debug, Clone)]
pub struct FluxSolution {
    /// Value of the model objective at the optimum
    pub objective_value: f64,
    /// Flux through each reaction, in model order
    pub fluxes: IndexMap<String, f64>,
}

/// Maximize the objective of a model with the default solver
pub fn optimize(model: &Model) -> Result<FluxSolution, FluxAnalysisError> {
    optimize_with(model, &ClarabelSolver::new())
}

/// Maximize the objective of a model with the given solver
pub fn optimize_with<S: LinearSolver + ?Sized>(
    model: &Model,
    solver: &S,
) -> Result<FluxSolution, FluxAnalysisError> {
    let problem = build_problem(model)?;
    solve_problem(&problem, solver, "optimizing the model objective")
}

/// Solve an already constructed problem, requiring an optimal solution
pub(crate) fn solve_problem<S: LinearSolver + ?Sized>(
    problem: &Problem,
    solver: &S,
    context: &str,
) -> Result<FluxSolution, FluxAnalysisError> {
    let solution = problem
        .solve_with(solver)
        .map_err(|source| FluxAnalysisError::Solver {
            context: context.to_string(),
            source,
        })?;
    match (solution.is_optimal(), solution.objective_value, solution.variable_values) {
        (true, Some(objective_value), Some(fluxes)) => Ok(FluxSolution {
            objective_value,
            fluxes,
        }),
        _ => Err(FluxAnalysisError::Infeasible {
            context: context.to_string(),
            status: solution.status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_models::toy_model;
    use crate::optimize::OptimizationStatus;

    #[test]
    fn toy_model_optimum() {
        let model = toy_model();
        let solution = optimize(&model).unwrap();
        assert!((solution.objective_value - 6.).abs() < 1e-4);
        assert!((solution.fluxes["R3"] - 6.).abs() < 1e-4);
        assert!((solution.fluxes["BIOMASS"] - 6.).abs() < 1e-4);
    }

    #[test]
    fn knocked_out_objective() {
        let mut model = toy_model();
        model.knock_out_gene("g3").unwrap();
        let solution = optimize(&model).unwrap();
        assert!(solution.objective_value.abs() < 1e-4);
    }

    #[test]
    fn infeasible_model() {
        let mut model = toy_model();
        // Demand biomass without allowing the needed uptake
        model.set_reaction_bounds("BIOMASS", 1., 1000.).unwrap();
        model.set_reaction_bounds("EX_a", 0., 0.).unwrap();
        match optimize(&model) {
            Err(FluxAnalysisError::Infeasible { status, .. }) => {
                assert_eq!(status, OptimizationStatus::Infeasible)
            }
            other => panic!("Expected infeasible model, got {:?}", other),
        }
    }
}
