//! Read-only query interface over a metabolic model
//!
//! The perturbation and ranking logic only ever looks at a model through this trait, so it never
//! depends on how genes, reactions, and GPR rules are stored.
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;

pub trait ModelQuery {
    /// Look up a gene by id
    fn get_gene(&self, id: &str) -> Result<&Gene, ModelError>;

    /// Look up a reaction by id
    fn get_reaction(&self, id: &str) -> Result<&Reaction, ModelError>;

    /// Genes associated with a reaction through its GPR, in order of first appearance in the rule
    fn genes_of(&self, reaction_id: &str) -> Result<Vec<&Gene>, ModelError>;

    /// Reactions whose GPR references the gene, in model order
    fn reactions_of(&self, gene_id: &str) -> Result<Vec<&Reaction>, ModelError>;
}

impl ModelQuery for Model {
    fn get_gene(&self, id: &str) -> Result<&Gene, ModelError> {
        self.genes
            .get(id)
            .ok_or_else(|| ModelError::GeneNotFound(id.to_string()))
    }

    fn get_reaction(&self, id: &str) -> Result<&Reaction, ModelError> {
        self.reactions
            .get(id)
            .ok_or_else(|| ModelError::ReactionNotFound(id.to_string()))
    }

    fn genes_of(&self, reaction_id: &str) -> Result<Vec<&Gene>, ModelError> {
        self.get_reaction(reaction_id)?
            .gene_ids()
            .iter()
            .map(|gene_id| self.get_gene(gene_id))
            .collect()
    }

    fn reactions_of(&self, gene_id: &str) -> Result<Vec<&Reaction>, ModelError> {
        self.get_gene(gene_id)?;
        Ok(self
            .reactions
            .values()
            .filter(|r| matches!(r.gpr, Some(ref gpr) if gpr.contains_gene(gene_id)))
            .collect())
    }
}
