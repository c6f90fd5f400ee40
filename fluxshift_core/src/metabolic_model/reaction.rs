//! This module provides a struct for representing reactions
use super::gene::{Annotation, GeneActivity};
use super::model::Gpr;
use crate::configuration::Configuration;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "Configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "Configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "Annotation::new()")]
    pub annotation: Annotation,
    /// Reaction Activity
    #[builder(default = "ReactionActivity::Active")]
    pub activity: ReactionActivity,
}

impl Reaction {
    /// A reaction is reversible when its bounds allow flux in both directions
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }

    /// Current (lower, upper) flux bounds
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower_bound, self.upper_bound)
    }

    /// Name of the reaction, or an empty string when it has none
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Ids of the genes in the reaction's GPR, in order of first appearance
    pub fn gene_ids(&self) -> Vec<String> {
        match &self.gpr {
            Some(gpr) => gpr.gene_ids(),
            None => Vec::new(),
        }
    }

    /// Check whether the reaction is exchanging a single metabolite with the environment
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }
}

/// Whether a Reaction is active or inactive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionActivity {
    /// The Reaction is active and can carry flux
    Active,
    /// The Reaction is inactive and can't carry flux
    Inactive,
}

impl From<GeneActivity> for ReactionActivity {
    fn from(value: GeneActivity) -> Self {
        match value {
            GeneActivity::Active => ReactionActivity::Active,
            GeneActivity::Inactive => ReactionActivity::Inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversibility() {
        let reversible = ReactionBuilder::default()
            .id("R_rev".to_string())
            .lower_bound(-1000.)
            .upper_bound(1000.)
            .build()
            .unwrap();
        assert!(reversible.is_reversible());

        let forward = ReactionBuilder::default()
            .id("R_fwd".to_string())
            .lower_bound(0.)
            .upper_bound(1000.)
            .build()
            .unwrap();
        assert!(!forward.is_reversible());

        // Reactions running only backwards are not reversible either
        let backward = ReactionBuilder::default()
            .id("R_bwd".to_string())
            .lower_bound(-1000.)
            .upper_bound(0.)
            .build()
            .unwrap();
        assert!(!backward.is_reversible());
    }

    #[test]
    fn default_bounds_come_from_configuration() {
        let rxn = ReactionBuilder::default()
            .id("R".to_string())
            .build()
            .unwrap();
        let config = Configuration::current();
        assert_eq!(rxn.bounds(), (config.lower_bound, config.upper_bound));
        assert_eq!(rxn.activity, ReactionActivity::Active);
        assert_eq!(rxn.display_name(), "");
        assert!(rxn.gene_ids().is_empty());
    }
}
