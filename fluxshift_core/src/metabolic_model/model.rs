//! This module provides the Model struct for representing an entire metabolic model
use std::fmt::{Display, Formatter};

use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::query::ModelQuery;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity};

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

/// Snapshot of reaction bounds, keyed by reaction id
pub type BoundsMap = IndexMap<String, (f64, f64)>;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// Metabolites in the reaction's stoichiometry which are not yet part of the model are
    /// added as bare metabolites, and so are genes referenced by its GPR.
    ///
    /// # Examples
    /// ```rust
    /// use fluxshift_core::metabolic_model::model::Model;
    /// use fluxshift_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction);
    /// assert!(model.reactions.contains_key("new_reaction"));
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met_id in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met_id) {
                self.metabolites
                    .insert(met_id.clone(), Metabolite::new(met_id));
            }
        }
        for gene_id in reaction.gene_ids() {
            if !self.genes.contains_key(&gene_id) {
                self.genes.insert(gene_id.clone(), Gene::new(&gene_id));
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Examples
    /// ```rust
    /// use fluxshift_core::metabolic_model::gene::GeneBuilder;
    /// use fluxshift_core::metabolic_model::model::Model;
    /// let mut model=Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene".to_string()).build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Set the objective coefficient of a reaction
    pub fn set_objective_coefficient(
        &mut self,
        reaction_id: &str,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::ReactionNotFound(reaction_id.to_string()));
        }
        self.objective.insert(reaction_id.to_string(), coefficient);
        Ok(())
    }

    /// Exchange reactions currently allowing uptake, with their maximal uptake rate
    pub fn medium(&self) -> IndexMap<String, f64> {
        self.reactions
            .values()
            .filter(|r| r.is_boundary() && r.lower_bound < 0.)
            .map(|r| (r.id.clone(), -r.lower_bound))
            .collect()
    }

    // region Bounds
    /// Set the bounds of a single reaction, returning the previous bounds
    pub fn set_reaction_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(f64, f64), ModelError> {
        if lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                reaction: reaction_id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        let rxn = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::ReactionNotFound(reaction_id.to_string()))?;
        let previous = rxn.bounds();
        rxn.lower_bound = lower_bound;
        rxn.upper_bound = upper_bound;
        Ok(previous)
    }

    /// Apply a set of reaction bounds to the model
    ///
    /// Every reaction id and bound pair is checked before the model is touched, so either all
    /// bounds are applied or none are.
    ///
    /// # Returns
    /// The bounds the reactions had before the update, which can be passed back to this
    /// function to revert it.
    pub fn apply_bounds(&mut self, bounds: &BoundsMap) -> Result<BoundsMap, ModelError> {
        for (rxn_id, &(lower_bound, upper_bound)) in bounds {
            if !self.reactions.contains_key(rxn_id) {
                return Err(ModelError::ReactionNotFound(rxn_id.clone()));
            }
            if lower_bound > upper_bound {
                return Err(ModelError::InvalidBounds {
                    reaction: rxn_id.clone(),
                    lower_bound,
                    upper_bound,
                });
            }
        }
        let mut previous = BoundsMap::with_capacity(bounds.len());
        for (rxn_id, &(lower_bound, upper_bound)) in bounds {
            previous.insert(
                rxn_id.clone(),
                self.set_reaction_bounds(rxn_id, lower_bound, upper_bound)?,
            );
        }
        Ok(previous)
    }

    /// Current bounds of every reaction in the model
    pub fn bounds_snapshot(&self) -> BoundsMap {
        self.reactions
            .iter()
            .map(|(id, r)| (id.clone(), r.bounds()))
            .collect()
    }
    // endregion Bounds

    // region Knockouts
    /// Knock out a series of genes, in the order given
    ///
    /// All gene ids are validated before any gene is knocked out. A reaction whose GPR no longer
    /// evaluates to active is deactivated and its bounds set to (0, 0).
    ///
    /// # Returns
    /// The reactions disabled by each gene's knockout
    pub fn knock_out_genes(
        &mut self,
        gene_ids: &[String],
    ) -> Result<IndexMap<String, Vec<String>>, ModelError> {
        for gene_id in gene_ids {
            self.get_gene(gene_id)?;
        }
        let mut disabled = IndexMap::new();
        for gene_id in gene_ids {
            disabled.insert(gene_id.clone(), self.knock_out_gene(gene_id)?);
        }
        Ok(disabled)
    }

    /// Knock out a single gene, returning the reactions it disabled
    pub fn knock_out_gene(&mut self, gene_id: &str) -> Result<Vec<String>, ModelError> {
        let gene = self
            .genes
            .get_mut(gene_id)
            .ok_or_else(|| ModelError::GeneNotFound(gene_id.to_string()))?;
        gene.activity = GeneActivity::Inactive;

        let candidates: Vec<String> = self
            .reactions_of(gene_id)?
            .into_iter()
            .filter(|r| r.activity == ReactionActivity::Active)
            .map(|r| r.id.clone())
            .collect();

        let mut disabled = Vec::new();
        for rxn_id in candidates {
            let activity = match self.reactions[&rxn_id].gpr {
                Some(ref gpr) => self.eval_gpr(gpr)?,
                None => GeneActivity::Active,
            };
            if activity == GeneActivity::Inactive {
                let rxn = &mut self.reactions[&rxn_id];
                rxn.activity = ReactionActivity::Inactive;
                rxn.lower_bound = 0.;
                rxn.upper_bound = 0.;
                debug!("Knockout of {} disabled reaction {}", gene_id, rxn_id);
                disabled.push(rxn_id);
            }
        }
        Ok(disabled)
    }
    // endregion Knockouts
}

/// Errors raised when querying or updating a Model
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Gene {0} is not present in the model")]
    GeneNotFound(String),
    #[error("Reaction {0} is not present in the model")]
    ReactionNotFound(String),
    #[error("Invalid bounds ({lower_bound}, {upper_bound}) for reaction {reaction}, lower bound exceeds upper bound")]
    InvalidBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    #[error("Unable to evaluate GPR: {0}")]
    Gpr(#[from] GprError),
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on two genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node, holding the gene id
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("({} or {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::And { left, right } => {
                    format!("({} and {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::Not { val } => {
                    format!("(not {})", val)
                }
            },
            Gpr::GeneNode(gene_ref) => gene_ref.to_string(),
        }
    }

    /// Ids of all genes in the rule, in order of first appearance, without duplicates
    pub fn gene_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_gene_ids(&mut ids);
        ids
    }

    fn collect_gene_ids(&self, ids: &mut Vec<String>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_gene_ids(ids);
                right.collect_gene_ids(ids);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_gene_ids(ids),
            Gpr::GeneNode(id) => {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
    }

    /// Check whether the gene appears anywhere in the rule
    pub fn contains_gene(&self, gene_id: &str) -> bool {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.contains_gene(gene_id) || right.contains_gene(gene_id)
            }
            Gpr::Operation(GprOperation::Not { val }) => val.contains_gene(gene_id),
            Gpr::GeneNode(id) => id == gene_id,
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
    #[error("Gene {0} in GPR is not present in the model")]
    GeneNotFound(String),
}

// Model associated functions for working with GPRs
impl Model {
    /// Evaluate whether a GPR evaluates to Active or Inactive
    pub fn eval_gpr(&self, gpr: &Gpr) -> Result<GeneActivity, GprError> {
        match gpr {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    let l = self.eval_gpr(left)?;
                    let r = self.eval_gpr(right)?;
                    if l == GeneActivity::Active || r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::And { left, right } => {
                    let l = self.eval_gpr(left)?;
                    let r = self.eval_gpr(right)?;
                    if l == GeneActivity::Active && r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::Not { val } => match self.eval_gpr(val)? {
                    GeneActivity::Active => Ok(GeneActivity::Inactive),
                    GeneActivity::Inactive => Ok(GeneActivity::Active),
                },
            },
            Gpr::GeneNode(gene) => match self.genes.get(gene) {
                Some(g) => Ok(g.activity),
                None => Err(GprError::GeneNotFound(gene.clone())),
            },
        }
    }
}

// endregion GPR Functionality
