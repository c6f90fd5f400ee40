//! Process wide defaults used when building reactions, solving problems, and sampling
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Default lower bound for new reactions
    pub lower_bound: f64,
    /// Default upper bound for new reactions
    pub upper_bound: f64,
    /// Feasibility tolerance used by the solver and the flux analysis methods
    pub tolerance: f64,
    /// Fraction of the objective optimum that FVA has to maintain
    pub fraction_of_optimum: f64,
    /// Number of sampling chains run in parallel
    pub processes: usize,
    /// Number of hit-and-run steps between two stored samples
    pub thinning: usize,
    /// Seed for the samplers, drawn from entropy when None
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            fraction_of_optimum: 1.0,
            processes: 1,
            thinning: 100,
            seed: None,
        }
    }
}

impl Configuration {
    /// Snapshot of the current global configuration
    ///
    /// A poisoned lock still holds a valid configuration, so its value is used
    pub fn current() -> Configuration {
        match CONFIGURATION.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `update` to the global configuration
    pub fn update<F: FnOnce(&mut Configuration)>(update: F) {
        match CONFIGURATION.write() {
            Ok(mut config) => update(&mut config),
            Err(poisoned) => update(&mut poisoned.into_inner()),
        }
    }
}
