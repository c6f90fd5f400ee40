//! Flux sampling by artificial centering hit-and-run
//!
//! Two flavours are provided, selected with [`SamplingMethod`]:
//! - `Achr` runs a single chain whose centre is the running mean of every point seen so far
//! - `OptGp` runs `processes` chains in parallel, all moving around the fixed mean of the warm-up
//!   points
//!
//! Warm-up points are the flux distributions minimizing and maximizing every reaction that is not
//! fixed. Each step moves the current point along the direction from the centre to a random
//! warm-up point, by a distance drawn uniformly within the reaction bounds. Stored points are
//! projected back onto the steady state subspace to stop numerical drift from accumulating.
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use derive_builder::Builder;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::configuration::Configuration;
use crate::flux_analysis::fba::solve_problem;
use crate::flux_analysis::{build_problem, FluxAnalysisError};
use crate::io::table::SampleTable;
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::clarabel::ClarabelSolver;

/// Directions with a smaller norm than this are not followed
const DIRECTION_EPSILON: f64 = 1e-12;
/// Relative size below which a singular value counts as zero
const NULL_SPACE_TOLERANCE: f64 = 1e-9;

/// Anything able to draw flux samples from a model `M`
pub trait FluxSampler<M: ?Sized> {
    /// Draw `n_samples` flux distributions, one row per sample labelled `0..n_samples` and one
    /// column per reaction
    fn sample(&self, model: &M, n_samples: usize) -> Result<SampleTable, FluxAnalysisError>;
}

/// Hit-and-run variant used by [`HitAndRunSampler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMethod {
    /// Artificial centering hit-and-run, single chain
    Achr,
    /// Parallel chains around a fixed centre
    OptGp,
}

impl Display for SamplingMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingMethod::Achr => write!(f, "achr"),
            SamplingMethod::OptGp => write!(f, "optgp"),
        }
    }
}

impl FromStr for SamplingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "achr" => Ok(SamplingMethod::Achr),
            "optgp" => Ok(SamplingMethod::OptGp),
            other => Err(format!("Unknown sampling method {other}, expected achr or optgp")),
        }
    }
}

/// Hit-and-run flux sampler
///
/// # Examples
/// ```rust
/// use fluxshift_core::flux_analysis::sampling::{HitAndRunSamplerBuilder, SamplingMethod};
/// let sampler = HitAndRunSamplerBuilder::default()
///     .method(SamplingMethod::Achr)
///     .thinning(10usize)
///     .seed(Some(42))
///     .build()
///     .unwrap();
/// assert_eq!(sampler.processes, 1);
/// ```
#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct HitAndRunSampler {
    /// Hit-and-run variant
    #[builder(default = "SamplingMethod::OptGp")]
    pub method: SamplingMethod,
    /// Number of steps taken between two stored samples
    #[builder(default = "Configuration::current().thinning")]
    pub thinning: usize,
    /// Number of parallel chains, only used by `OptGp`
    #[builder(default = "Configuration::current().processes")]
    pub processes: usize,
    /// Seed of the random number generators, drawn from entropy when None
    #[builder(default = "Configuration::current().seed")]
    pub seed: Option<u64>,
}

impl Default for HitAndRunSampler {
    fn default() -> Self {
        let configuration = Configuration::current();
        Self {
            method: SamplingMethod::OptGp,
            thinning: configuration.thinning,
            processes: configuration.processes,
            seed: configuration.seed,
        }
    }
}

impl FluxSampler<Model> for HitAndRunSampler {
    fn sample(&self, model: &Model, n_samples: usize) -> Result<SampleTable, FluxAnalysisError> {
        if n_samples == 0 {
            return Err(FluxAnalysisError::InvalidSampleCount(n_samples));
        }
        let columns: Vec<String> = model.reactions.keys().cloned().collect();
        let polytope = Polytope::from_model(model);
        let warmup = warmup_points(model, &polytope)?;
        info!(
            "Sampling {} points with {} from {} warm-up points",
            n_samples,
            self.method,
            warmup.len()
        );

        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        let chains = match self.method {
            SamplingMethod::Achr => vec![Chain::new(&warmup, n_samples, seed, true)],
            SamplingMethod::OptGp => {
                let count = self.processes.max(1).min(n_samples);
                chain_lengths(n_samples, count)
                    .into_iter()
                    .enumerate()
                    .map(|(k, length)| {
                        Chain::new(&warmup, length, seed.wrapping_add(k as u64), false)
                    })
                    .collect()
            }
        };

        let thinning = self.thinning.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(chains.len())
            .build()
            .map_err(|e| FluxAnalysisError::WorkerPool(e.to_string()))?;
        let points: Vec<Vec<DVector<f64>>> = pool.install(|| {
            chains
                .into_par_iter()
                .map(|chain| chain.run(&polytope, &warmup, thinning))
                .collect()
        });

        let rows: Vec<Vec<f64>> = points
            .into_iter()
            .flatten()
            .map(|p| p.iter().copied().collect())
            .collect();
        SampleTable::from_rows(columns, &rows)
            .map_err(|e| FluxAnalysisError::Sampling(e.to_string()))
    }
}

/// Split `n` samples over `chains` chains as evenly as possible
fn chain_lengths(n: usize, chains: usize) -> Vec<usize> {
    (0..chains)
        .map(|k| n / chains + usize::from(k < n % chains))
        .collect()
}

// region Polytope
/// Flux bounds and the projector onto the steady state subspace
struct Polytope {
    lower: DVector<f64>,
    upper: DVector<f64>,
    /// Projector onto the null space of the mass balances and fixed reactions
    projection: DMatrix<f64>,
}

impl Polytope {
    fn from_model(model: &Model) -> Self {
        let n = model.reactions.len();
        let lower = DVector::from_iterator(n, model.reactions.values().map(|r| r.lower_bound));
        let upper = DVector::from_iterator(n, model.reactions.values().map(|r| r.upper_bound));

        // One row per metabolite, then one row per fixed reaction
        let mut rows: Vec<Vec<(usize, f64)>> = model
            .metabolites
            .keys()
            .map(|_| Vec::new())
            .collect();
        for (j, reaction) in model.reactions.values().enumerate() {
            for (metabolite, coefficient) in &reaction.metabolites {
                if let Some(i) = model.metabolites.get_index_of(metabolite) {
                    rows[i].push((j, *coefficient));
                }
            }
            if reaction.lower_bound == reaction.upper_bound {
                rows.push(vec![(j, 1.)]);
            }
        }

        Self {
            projection: null_space_projection(&rows, n),
            lower,
            upper,
        }
    }

    fn dimension(&self) -> usize {
        self.lower.len()
    }

    fn is_fixed(&self, i: usize) -> bool {
        self.lower[i] == self.upper[i]
    }

    /// Interval of step lengths keeping `point + alpha * direction` within the bounds
    ///
    /// Coordinates already outside their bounds may stay where they are, so the interval always
    /// contains 0.
    fn step_interval(&self, point: &DVector<f64>, direction: &DVector<f64>) -> (f64, f64) {
        let mut alpha_low = f64::NEG_INFINITY;
        let mut alpha_high = f64::INFINITY;
        for i in 0..self.dimension() {
            let d = direction[i];
            if d.abs() < DIRECTION_EPSILON {
                continue;
            }
            let to_lower = (self.lower[i] - point[i]).min(0.);
            let to_upper = (self.upper[i] - point[i]).max(0.);
            let (low, high) = if d > 0. {
                (to_lower / d, to_upper / d)
            } else {
                (to_upper / d, to_lower / d)
            };
            alpha_low = alpha_low.max(low);
            alpha_high = alpha_high.min(high);
        }
        (alpha_low, alpha_high)
    }

    /// Project `point` back onto the steady state subspace through `anchor`
    fn reproject(&self, point: &DVector<f64>, anchor: &DVector<f64>) -> DVector<f64> {
        anchor + &self.projection * (point - anchor)
    }
}

/// Projector onto the null space of the sparse rows, through a singular value decomposition
fn null_space_projection(rows: &[Vec<(usize, f64)>], n: usize) -> DMatrix<f64> {
    // Pad to at least n rows so that all n right singular vectors are computed
    let mut matrix = DMatrix::<f64>::zeros(rows.len().max(n), n);
    for (i, row) in rows.iter().enumerate() {
        for &(j, value) in row {
            matrix[(i, j)] += value;
        }
    }
    let svd = matrix.svd(false, true);
    let largest = svd.singular_values.iter().copied().fold(1., f64::max);
    let mut projection = DMatrix::<f64>::zeros(n, n);
    if let Some(v_t) = svd.v_t {
        for (k, sigma) in svd.singular_values.iter().enumerate() {
            if *sigma <= NULL_SPACE_TOLERANCE * largest {
                let v = v_t.row(k).transpose();
                projection += &v * v.transpose();
            }
        }
    }
    projection
}
// endregion Polytope

// region Warm-up
/// Flux distributions at the minimum and maximum of every reaction that is not fixed
fn warmup_points(
    model: &Model,
    polytope: &Polytope,
) -> Result<Vec<DVector<f64>>, FluxAnalysisError> {
    let solver = ClarabelSolver::new();
    let mut problem = build_problem(model)?;
    let n = polytope.dimension();
    let mut points = Vec::new();
    for (i, reaction_id) in model.reactions.keys().enumerate() {
        if polytope.is_fixed(i) {
            continue;
        }
        problem.set_linear_objective(&[reaction_id.as_str()], &[1.])?;
        for sense in [ObjectiveSense::Minimize, ObjectiveSense::Maximize] {
            problem.update_objective_sense(sense);
            let context = format!("generating warm-up points for reaction {reaction_id}");
            let solution = solve_problem(&problem, &solver, &context)?;
            points.push(DVector::from_iterator(n, solution.fluxes.values().copied()));
        }
    }
    if points.is_empty() {
        // Every reaction is fixed, the only feasible point is the one the bounds describe
        debug!("All reactions are fixed, sampling a single point");
        points.push(polytope.lower.clone());
    }
    Ok(points)
}
// endregion Warm-up

// region Chains
/// A single hit-and-run chain
struct Chain {
    length: usize,
    rng: StdRng,
    /// Update the centre with every new point (ACHR) instead of keeping the warm-up mean
    running_center: bool,
    center: DVector<f64>,
    points_seen: f64,
}

impl Chain {
    fn new(warmup: &[DVector<f64>], length: usize, seed: u64, running_center: bool) -> Self {
        Self {
            length,
            rng: StdRng::seed_from_u64(seed),
            running_center,
            center: mean(warmup),
            points_seen: warmup.len() as f64,
        }
    }

    fn run(
        mut self,
        polytope: &Polytope,
        warmup: &[DVector<f64>],
        thinning: usize,
    ) -> Vec<DVector<f64>> {
        let anchor = self.center.clone();
        let mut point = self.center.clone();
        let mut samples = Vec::with_capacity(self.length);
        for _ in 0..self.length {
            for _ in 0..thinning {
                let target = &warmup[self.rng.gen_range(0..warmup.len())];
                let direction = target - &self.center;
                self.step(polytope, &mut point, direction);
            }
            point = polytope.reproject(&point, &anchor);
            samples.push(point.clone());
        }
        samples
    }

    fn step(&mut self, polytope: &Polytope, point: &mut DVector<f64>, direction: DVector<f64>) {
        let norm = direction.norm();
        if norm < DIRECTION_EPSILON {
            return;
        }
        let direction = direction / norm;
        let (low, high) = polytope.step_interval(point, &direction);
        if low.is_finite() && high.is_finite() && high > low {
            let alpha = self.rng.gen_range(low..=high);
            point.axpy(alpha, &direction, 1.);
        }
        if self.running_center {
            self.points_seen += 1.;
            self.center = (&self.center * (self.points_seen - 1.) + &*point) / self.points_seen;
        }
    }
}

fn mean(points: &[DVector<f64>]) -> DVector<f64> {
    let n = points.first().map_or(0, |p| p.len());
    let sum = points
        .iter()
        .fold(DVector::zeros(n), |acc: DVector<f64>, p| acc + p);
    sum / points.len().max(1) as f64
}
// endregion Chains

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_models::toy_model;

    fn sampler(method: SamplingMethod, processes: usize) -> HitAndRunSampler {
        HitAndRunSamplerBuilder::default()
            .method(method)
            .thinning(20usize)
            .processes(processes)
            .seed(Some(7))
            .build()
            .unwrap()
    }

    /// Check mass balances and bounds of every sample
    fn assert_feasible(model: &Model, table: &SampleTable) {
        let tolerance = 1e-4;
        for i in 0..table.nrows() {
            let row = table.values().row(i);
            for metabolite in model.metabolites.keys() {
                let balance: f64 = model
                    .reactions
                    .values()
                    .enumerate()
                    .map(|(j, r)| r.metabolites.get(metabolite).copied().unwrap_or(0.) * row[j])
                    .sum();
                assert!(balance.abs() < tolerance, "{metabolite} unbalanced: {balance}");
            }
            for (j, reaction) in model.reactions.values().enumerate() {
                assert!(row[j] >= reaction.lower_bound - tolerance);
                assert!(row[j] <= reaction.upper_bound + tolerance);
            }
        }
    }

    #[test]
    fn method_names() {
        assert_eq!("optgp".parse::<SamplingMethod>(), Ok(SamplingMethod::OptGp));
        assert_eq!("ACHR".parse::<SamplingMethod>(), Ok(SamplingMethod::Achr));
        assert!("gibbs".parse::<SamplingMethod>().is_err());
        assert_eq!(SamplingMethod::OptGp.to_string(), "optgp");
    }

    #[test]
    fn split_samples() {
        assert_eq!(chain_lengths(10, 3), vec![4, 3, 3]);
        assert_eq!(chain_lengths(4, 4), vec![1, 1, 1, 1]);
    }

    #[test]
    fn achr_samples_are_feasible() {
        let model = toy_model();
        let table = sampler(SamplingMethod::Achr, 1).sample(&model, 25).unwrap();
        assert_eq!(table.nrows(), 25);
        assert_eq!(table.columns(), model.reactions.keys().cloned().collect::<Vec<_>>());
        assert_eq!(table.index()[0], "0");
        assert_eq!(table.index()[24], "24");
        assert_feasible(&model, &table);
    }

    #[test]
    fn optgp_samples_are_feasible() {
        let model = toy_model();
        let table = sampler(SamplingMethod::OptGp, 3).sample(&model, 10).unwrap();
        assert_eq!(table.nrows(), 10);
        assert_feasible(&model, &table);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let model = toy_model();
        let first = sampler(SamplingMethod::OptGp, 2).sample(&model, 8).unwrap();
        let second = sampler(SamplingMethod::OptGp, 2).sample(&model, 8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn knocked_out_reactions_carry_no_flux() {
        let mut model = toy_model();
        model.knock_out_gene("g3").unwrap();
        let table = sampler(SamplingMethod::Achr, 1).sample(&model, 10).unwrap();
        let r3 = table.column_position("R3").unwrap();
        let biomass = table.column_position("BIOMASS").unwrap();
        for i in 0..table.nrows() {
            assert!(table.values()[(i, r3)].abs() < 1e-4);
            assert!(table.values()[(i, biomass)].abs() < 1e-4);
        }
        assert_feasible(&model, &table);
    }

    #[test]
    fn no_samples_requested() {
        let model = toy_model();
        assert_eq!(
            sampler(SamplingMethod::Achr, 1).sample(&model, 0).unwrap_err(),
            FluxAnalysisError::InvalidSampleCount(0)
        );
    }

    #[test]
    fn projection_keeps_steady_state() {
        // Two reactions in series through one metabolite: v1 - v2 = 0
        let rows = vec![vec![(0, 1.), (1, -1.)]];
        let projection = null_space_projection(&rows, 2);
        let projected = &projection * DVector::from_vec(vec![3., 1.]);
        assert!((projected[0] - 2.).abs() < 1e-9);
        assert!((projected[1] - 2.).abs() < 1e-9);
    }
}
