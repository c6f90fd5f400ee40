//! This module provides the Gene struct, representing a gene and its annotations
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;
use indexmap::IndexMap;

/// Annotations of a model object, mapping a database key (e.g. `ncbigene`) to its values
pub type Annotation = IndexMap<String, Vec<String>>;

/// Structure Representing a Gene
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    pub id: String,
    /// Human Readable Gene Name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Whether this gene is currently active (see [`GeneActivity`])
    #[builder(default = "GeneActivity::Active")]
    pub activity: GeneActivity,
    /// Notes about the gene
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations, keyed by database
    #[builder(default = "Annotation::new()")]
    pub annotation: Annotation,
}

impl Gene {
    /// Create a new active gene without name, notes, or annotations
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            activity: GeneActivity::Active,
            notes: None,
            annotation: Annotation::new(),
        }
    }

    /// Render the annotation values stored under `key` as a single field
    ///
    /// Multiple values are joined with `,`, a missing key gives an empty string.
    ///
    /// # Examples
    /// ```rust
    /// use fluxshift_core::metabolic_model::gene::Gene;
    /// let mut gene = Gene::new("b1241");
    /// gene.annotation.insert("uniprot".to_string(), vec!["P0A9Q7".to_string()]);
    /// assert_eq!(gene.annotation_value("uniprot"), "P0A9Q7");
    /// assert_eq!(gene.annotation_value("kegg"), "");
    /// ```
    pub fn annotation_value(&self, key: &str) -> String {
        self.annotation
            .get(key)
            .map(|values| values.join(","))
            .unwrap_or_default()
    }

    /// Check whether the gene is currently active
    pub fn is_active(&self) -> bool {
        self.activity == GeneActivity::Active
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Hash for Gene {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.activity.hash(state);
    }
}

/// Whether a gene is active or not
#[derive(Clone, Debug, Hash, Eq, PartialEq, Copy)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive (knocked out)
    Inactive,
}
