//! Merge reaction names and gene annotations from a model into a ranked table
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::query::ModelQuery;
use crate::ranking::{RankedTable, RankingError, FIXED_COLUMNS};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

/// Enrich a ranked table with model information and drop reactions without genes
///
/// Each entry gets its reaction name, its gene ids joined by `;`, and for each annotation key the
/// per gene values joined by `;` in the same gene order (an empty string stands in for a gene
/// lacking the key). Annotation columns already present on `table` are kept and refreshed, so
/// merging twice with the same keys gives the same columns. Ranks are recomputed over the
/// surviving reactions.
pub fn annotate_and_filter<M: ModelQuery + ?Sized>(
    table: &RankedTable,
    model: &M,
    annotation_keys: &[String],
) -> Result<RankedTable, RankingError> {
    let keys = merged_keys(&table.annotation_keys, annotation_keys);
    let mut entries = Vec::with_capacity(table.len());
    for entry in &table.entries {
        let reaction = model.get_reaction(&entry.rxn_id)?;
        let genes = model.genes_of(&entry.rxn_id)?;
        if genes.is_empty() {
            debug!("Dropping {}, it has no associated genes", entry.rxn_id);
            continue;
        }
        let mut merged = entry.clone();
        merged.rxn_name = reaction.display_name().to_string();
        merged.gene_id = join_genes(&genes, |g| g.id.clone());
        merged.annotations = keys
            .iter()
            .map(|key| (key.clone(), join_genes(&genes, |g| g.annotation_value(key))))
            .collect::<IndexMap<String, String>>();
        entries.push(merged);
    }

    let mut merged = RankedTable {
        annotation_keys: keys,
        entries,
    };
    merged.assign_dense_ranks();
    Ok(merged)
}

/// Fold the per gene values of a field into a `;` separated string
fn join_genes<F: Fn(&Gene) -> String>(genes: &[&Gene], field: F) -> String {
    genes
        .iter()
        .map(|g| field(g))
        .collect::<Vec<String>>()
        .join(";")
}

/// Existing annotation columns followed by newly requested ones, without duplicates or
/// collisions with the fixed columns
fn merged_keys(existing: &[String], requested: &[String]) -> Vec<String> {
    let mut keys: IndexSet<String> = IndexSet::new();
    for key in existing.iter().chain(requested) {
        if FIXED_COLUMNS.contains(&key.as_str()) {
            warn!("Ignoring annotation key {key}, it collides with a ranked table column");
            continue;
        }
        keys.insert(key.clone());
    }
    keys.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::model::{Model, ModelError};
    use crate::ranking::RankedEntry;

    fn toy_model() -> Model {
        let path = format!(
            "{}/test_data/test_models/toy_model.json",
            env!("CARGO_MANIFEST_DIR")
        );
        Model::read_json(path).unwrap()
    }

    fn scores(scores: &[(&str, f64)]) -> RankedTable {
        let mut table = RankedTable {
            annotation_keys: vec![],
            entries: scores
                .iter()
                .map(|(id, z)| RankedEntry::new(id, *z))
                .collect(),
        };
        table.assign_dense_ranks();
        table
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merges_names_and_annotations() {
        let model = toy_model();
        let table = scores(&[("R3", 5.), ("R2", -2.), ("R1", 1.)]);
        let merged = annotate_and_filter(&table, &model, &keys(&["uniprot", "ncbigene"])).unwrap();

        assert_eq!(merged.annotation_keys, keys(&["uniprot", "ncbigene"]));
        let r3 = merged.get("R3").unwrap();
        assert_eq!(r3.rxn_name, "B to C");
        assert_eq!(r3.gene_id, "g3;g4");
        assert_eq!(r3.annotations["uniprot"], "P00003;");
        assert_eq!(r3.annotations["ncbigene"], ";1004");
        let r2 = merged.get("R2").unwrap();
        assert_eq!(r2.annotations["ncbigene"], "1002,1012");
    }

    #[test]
    fn gene_less_reactions_are_removed() {
        let model = toy_model();
        let table = scores(&[("EX_a", 9.), ("R1", 4.), ("BIOMASS", -3.), ("R4", 2.)]);
        let merged = annotate_and_filter(&table, &model, &[]).unwrap();

        let ids: Vec<&str> = merged.entries.iter().map(|e| e.rxn_id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R4"]);
        let ranks: Vec<usize> = merged.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert!(merged.entries.iter().all(|e| !e.gene_id.is_empty()));
    }

    #[test]
    fn merging_twice_keeps_columns() {
        let model = toy_model();
        let table = scores(&[("R1", 4.), ("R3", 2.)]);
        let requested = keys(&["uniprot", "uniprot", "rank"]);
        let once = annotate_and_filter(&table, &model, &requested).unwrap();
        assert_eq!(once.annotation_keys, keys(&["uniprot"]));

        let twice = annotate_and_filter(&once, &model, &requested).unwrap();
        assert_eq!(twice, once);
        assert_eq!(twice.columns().len(), 6);

        let extended = annotate_and_filter(&once, &model, &keys(&["ncbigene"])).unwrap();
        assert_eq!(extended.annotation_keys, keys(&["uniprot", "ncbigene"]));
    }

    #[test]
    fn unknown_reaction() {
        let model = toy_model();
        let table = scores(&[("R1", 4.), ("R99", 2.)]);
        assert_eq!(
            annotate_and_filter(&table, &model, &[]),
            Err(RankingError::Model(ModelError::ReactionNotFound(
                "R99".to_string()
            )))
        );
    }
}
