//! Implements a solver interface for Clarabel
//!
//! Clarabel solves problems of the form
//! `min 1/2 x'Px + q'x` subject to `Ax + s = b`, `s ∈ K`. Equalities (mass balances and fixed
//! variables) go into a zero cone, and the remaining bounds are written as `Ax <= b` rows of a
//! nonnegative cone.
use crate::configuration::Configuration;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{LinearSolver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};
use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix as SparseCsc};

/// Clarabel interior point solver
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    /// Print solver progress
    pub verbose: bool,
    /// Feasibility and gap tolerance handed to Clarabel
    pub tolerance: f64,
    /// Maximum number of interior point iterations
    pub max_iter: u32,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self {
            verbose: false,
            tolerance: Configuration::current().tolerance.min(1e-8),
            max_iter: 200,
        }
    }
}

/// Rows of the constraint matrix, split by cone
#[derive(Default)]
struct RowSet {
    rows: Vec<Vec<(usize, f64)>>,
    rhs: Vec<f64>,
}

impl RowSet {
    fn push(&mut self, row: Vec<(usize, f64)>, rhs: f64) {
        self.rows.push(row);
        self.rhs.push(rhs);
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

impl ClarabelSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the problem into zero cone rows and nonnegative cone rows
    fn collect_rows(problem: &Problem) -> (RowSet, RowSet) {
        let mut equalities = RowSet::default();
        let mut inequalities = RowSet::default();

        for constraint in problem.constraints().values() {
            let row: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .map(|t| (t.variable, t.coefficient))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => equalities.push(row, *equals),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        equalities.push(row, *lower_bound);
                        continue;
                    }
                    if upper_bound.is_finite() {
                        inequalities.push(row.clone(), *upper_bound);
                    }
                    if lower_bound.is_finite() {
                        let negated = row.iter().map(|&(i, c)| (i, -c)).collect();
                        inequalities.push(negated, -lower_bound);
                    }
                }
            }
        }

        for variable in problem.variables().values() {
            let i = variable.index();
            if variable.is_fixed() {
                equalities.push(vec![(i, 1.)], variable.lower_bound);
                continue;
            }
            if variable.upper_bound.is_finite() {
                inequalities.push(vec![(i, 1.)], variable.upper_bound);
            }
            if variable.lower_bound.is_finite() {
                inequalities.push(vec![(i, -1.)], -variable.lower_bound);
            }
        }
        (equalities, inequalities)
    }

    /// Assemble the stacked rows into a Clarabel CSC matrix
    fn assemble(
        rows: &[Vec<(usize, f64)>],
        num_variables: usize,
    ) -> Result<CscMatrix<f64>, SolverError> {
        let mut coo = CooMatrix::<f64>::new(rows.len(), num_variables);
        for (r, row) in rows.iter().enumerate() {
            for &(c, value) in row {
                if c >= num_variables {
                    return Err(SolverError::MatrixAssembly(format!(
                        "row {r} references variable {c}, problem has {num_variables}"
                    )));
                }
                if value != 0. {
                    coo.push(r, c, value);
                }
            }
        }
        let csc = SparseCsc::from(&coo);
        Ok(CscMatrix::new(
            rows.len(),
            num_variables,
            csc.col_offsets().to_vec(),
            csc.row_indices().to_vec(),
            csc.values().to_vec(),
        ))
    }

    fn map_status(status: SolverStatus) -> OptimizationStatus {
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::MaxIterations
            | SolverStatus::MaxTime
            | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
            SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
            _ => OptimizationStatus::NumericalError,
        }
    }
}

impl LinearSolver for ClarabelSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let n = problem.num_variables();
        let (equalities, inequalities) = Self::collect_rows(problem);
        let num_eq = equalities.len();
        let num_ineq = inequalities.len();

        let rows: Vec<Vec<(usize, f64)>> = equalities
            .rows
            .into_iter()
            .chain(inequalities.rows)
            .collect();
        let b: Vec<f64> = equalities
            .rhs
            .into_iter()
            .chain(inequalities.rhs)
            .collect();
        let a = Self::assemble(&rows, n)?;
        let p = CscMatrix::<f64>::zeros((n, n));

        // Clarabel always minimizes
        let mut q = problem.objective().coefficients(n);
        if problem.objective().sense() == ObjectiveSense::Maximize {
            q.iter_mut().for_each(|c| *c = -*c);
        }

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if num_eq > 0 {
            cones.push(ZeroConeT(num_eq));
        }
        if num_ineq > 0 {
            cones.push(NonnegativeConeT(num_ineq));
        }

        let settings = DefaultSettings::<f64> {
            verbose: self.verbose,
            max_iter: self.max_iter,
            tol_feas: self.tolerance,
            tol_gap_abs: self.tolerance,
            tol_gap_rel: self.tolerance,
            ..DefaultSettings::default()
        };

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = Self::map_status(solver.solution.status);
        if !matches!(
            status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) {
            return Ok(ProblemSolution::unsolved(status));
        }
        let x = &solver.solution.x;
        if x.len() != n {
            return Err(SolverError::MalformedSolution {
                expected: n,
                found: x.len(),
            });
        }
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .keys()
            .cloned()
            .zip(x.iter().copied())
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(problem.objective().evaluate(x)),
            variable_values: Some(variable_values),
        })
    }
}
