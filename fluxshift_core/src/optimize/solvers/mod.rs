//! Interfaces to the solvers used for optimizing problems
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;
use thiserror::Error;

pub mod clarabel;

/// A solver able to optimize linear programs with continuous variables
pub trait LinearSolver {
    /// Solve the problem, returning the solution (which may carry a non-optimal status)
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Errors raised while handing a problem to a solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The constraint matrix could not be assembled
    #[error("Unable to assemble constraint matrix: {0}")]
    MatrixAssembly(String),
    /// The solver returned a solution vector of the wrong size
    #[error("Solver returned {found} values for a problem with {expected} variables")]
    MalformedSolution { expected: usize, found: usize },
}
