//! Ranking of flux distribution shifts between two sampled conditions
//!
//! [`shift::compute_shift_scores`] turns a baseline and a perturbed [`SampleTable`] into a
//! [`RankedTable`] of per reaction z-scores, and [`annotate::annotate_and_filter`] enriches that
//! table with reaction names and gene annotations from a model.
//!
//! [`SampleTable`]: crate::io::table::SampleTable
use crate::metabolic_model::model::ModelError;
use indexmap::IndexMap;
use thiserror::Error;

pub mod annotate;
pub mod shift;

/// Column names of a ranked table that always precede the annotation columns
pub const FIXED_COLUMNS: [&str; 5] = ["rxn_id", "z-score", "rank", "rxn_name", "gene_id"];

/// A reaction whose flux shifted between conditions
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rxn_id: String,
    /// Signed shift statistic, mean over standard deviation of the flux difference
    pub z_score: f64,
    /// Dense rank of `|z_score|`, 1 being the largest shift
    pub rank: usize,
    pub rxn_name: String,
    /// Semicolon joined ids of the genes of the reaction
    pub gene_id: String,
    /// Semicolon joined per gene values, keyed by annotation key
    pub annotations: IndexMap<String, String>,
}

impl RankedEntry {
    /// Entry carrying only a score, before any model information is merged in
    pub fn new(rxn_id: &str, z_score: f64) -> Self {
        Self {
            rxn_id: rxn_id.to_string(),
            z_score,
            rank: 0,
            rxn_name: String::new(),
            gene_id: String::new(),
            annotations: IndexMap::new(),
        }
    }
}

/// Reactions ordered by descending `|z_score|`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedTable {
    /// Annotation columns carried by every entry, in output order
    pub annotation_keys: Vec<String>,
    pub entries: Vec<RankedEntry>,
}

impl RankedTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header of the table when written out
    pub fn columns(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.annotation_keys.iter().cloned())
            .collect()
    }

    pub fn get(&self, rxn_id: &str) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.rxn_id == rxn_id)
    }

    /// Assign dense ranks over `|z_score|` to entries already sorted by descending `|z_score|`
    pub(crate) fn assign_dense_ranks(&mut self) {
        let mut rank = 0;
        let mut previous: Option<f64> = None;
        for entry in &mut self.entries {
            let magnitude = entry.z_score.abs();
            if previous != Some(magnitude) {
                rank += 1;
                previous = Some(magnitude);
            }
            entry.rank = rank;
        }
    }
}

/// Errors raised while scoring or annotating flux shifts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankingError {
    /// Baseline and perturbed samples do not cover the same reactions
    #[error("Sample tables have different reactions (missing from perturbed: {missing:?}, only in perturbed: {extra:?})")]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    /// Baseline and perturbed samples share no sample id
    #[error("Sample tables share no sample ids")]
    NoSharedSamples,
    /// Too few shared samples to estimate a standard deviation
    #[error("At least two shared samples are needed to compute a shift, found {0}")]
    InsufficientSamples(usize),
    /// A ranked reaction is missing from the model
    #[error(transparent)]
    Model(#[from] ModelError),
}
