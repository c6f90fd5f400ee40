//! End to end stages run by the command line tools
//!
//! [`perturb`] prepares a model for sampling a perturbed condition, [`rank_shifts`] compares the
//! samples of two conditions.
use derive_builder::Builder;
use indexmap::IndexMap;
use log::info;

use crate::flux_analysis::variability::FluxVariabilityOracle;
use crate::io::table::SampleTable;
use crate::metabolic_model::model::{BoundsMap, Model};
use crate::metabolic_model::query::ModelQuery;
use crate::perturbation::activation::resolve_activation_bounds;
use crate::perturbation::biomass::finalize_biomass_bound;
use crate::perturbation::PerturbationError;
use crate::ranking::annotate::annotate_and_filter;
use crate::ranking::shift::compute_shift_scores;
use crate::ranking::{RankedTable, RankingError};

/// Gene perturbation applied before sampling
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct PerturbationSettings {
    /// Id of the biomass reaction
    pub biomass_id: String,
    /// Fraction of the biomass optimum kept as its lower bound
    #[builder(default = "0.9")]
    pub lb_biomass: f64,
    /// Genes to activate, or to knock out
    #[builder(default)]
    pub target_genes: Vec<String>,
    /// Fraction of their maximal flux kept as lower bound of the target reactions
    #[builder(default = "0.05")]
    pub lb_target_rxns: f64,
    /// Knock the target genes out instead of activating them
    #[builder(default = "false")]
    pub knockout: bool,
}

/// Everything [`perturb`] changed in the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerturbationReport {
    /// Reactions disabled by each knocked out gene
    pub knocked_out: IndexMap<String, Vec<String>>,
    /// Reversible reactions of activated genes, left untouched
    pub skipped_reversible: Vec<String>,
    /// Bounds set on the reactions of activated genes
    pub applied_bounds: BoundsMap,
    /// Bounds of those reactions before the update
    pub previous_bounds: BoundsMap,
    /// Final bounds of the biomass reaction
    pub biomass_bounds: (f64, f64),
}

/// Apply the gene perturbation, then hold the biomass reaction near its new optimum
///
/// The biomass reaction and every target gene are looked up before the model is modified.
pub fn perturb<O>(
    model: &mut Model,
    oracle: &O,
    settings: &PerturbationSettings,
) -> Result<PerturbationReport, PerturbationError>
where
    O: FluxVariabilityOracle<Model> + ?Sized,
{
    model.get_reaction(&settings.biomass_id)?;
    for gene_id in &settings.target_genes {
        model.get_gene(gene_id)?;
    }

    let mut report = PerturbationReport::default();
    if settings.target_genes.is_empty() {
        info!("No target genes given, only the biomass reaction is adjusted");
    } else if settings.knockout {
        report.knocked_out = model.knock_out_genes(&settings.target_genes)?;
        for (gene_id, reactions) in &report.knocked_out {
            info!("Knocked out {gene_id}, disabling reactions {reactions:?}");
        }
    } else {
        let resolved = resolve_activation_bounds(
            model,
            oracle,
            &settings.target_genes,
            settings.lb_target_rxns,
        )?;
        report.previous_bounds = model.apply_bounds(&resolved.bounds)?;
        for (rxn_id, (lower, upper)) in &resolved.bounds {
            info!("Set {rxn_id:5} reaction bounds to ({lower:.2}, {upper:.2})");
        }
        report.applied_bounds = resolved.bounds;
        report.skipped_reversible = resolved.skipped_reversible;
    }

    // Last, so that it sees every gene level change
    report.biomass_bounds =
        finalize_biomass_bound(model, oracle, &settings.biomass_id, settings.lb_biomass)?;
    Ok(report)
}

/// Score, annotate and rank the flux shifts from `baseline` to `perturbed`
pub fn rank_shifts<M: ModelQuery + ?Sized>(
    baseline: &SampleTable,
    perturbed: &SampleTable,
    model: &M,
    annotation_keys: &[String],
) -> Result<RankedTable, RankingError> {
    let scores = compute_shift_scores(baseline, perturbed)?;
    info!("{} reactions shifted between conditions", scores.len());
    let ranked = annotate_and_filter(&scores, model, annotation_keys)?;
    info!("{} shifted reactions are associated with genes", ranked.len());
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::variability::ClarabelFva;
    use crate::metabolic_model::model::ModelError;
    use crate::metabolic_model::reaction::ReactionActivity;
    use nalgebra::DMatrix;

    fn toy_model() -> Model {
        let path = format!(
            "{}/test_data/test_models/toy_model.json",
            env!("CARGO_MANIFEST_DIR")
        );
        Model::read_json(path).unwrap()
    }

    fn settings(genes: &[&str], knockout: bool) -> PerturbationSettings {
        PerturbationSettingsBuilder::default()
            .biomass_id("BIOMASS")
            .target_genes(genes.iter().map(|g| g.to_string()).collect::<Vec<_>>())
            .knockout(knockout)
            .build()
            .unwrap()
    }

    #[test]
    fn activation() {
        let mut model = toy_model();
        let report = perturb(&mut model, &ClarabelFva::new(), &settings(&["g1", "g5"], false))
            .unwrap();

        assert_eq!(report.skipped_reversible, vec!["R4".to_string()]);
        assert_eq!(report.previous_bounds["R1"], (0., 1000.));
        let (lower, upper) = model.reactions["R1"].bounds();
        assert!((lower - 0.5).abs() < 1e-3);
        assert!((upper - 10.).abs() < 1e-3);
        assert_eq!(model.reactions["R4"].bounds(), (-1000., 1000.));
        // R1 can still feed R3 at full capacity
        assert!((report.biomass_bounds.1 - 6.).abs() < 1e-3);
        assert!((report.biomass_bounds.0 - 5.4).abs() < 1e-3);
    }

    #[test]
    fn knockout() {
        let mut model = toy_model();
        let report = perturb(&mut model, &ClarabelFva::new(), &settings(&["g4", "g1"], true))
            .unwrap();

        assert_eq!(report.knocked_out["g4"], vec!["R3".to_string()]);
        assert!(report.knocked_out["g1"].contains(&"R1".to_string()));
        assert_eq!(model.reactions["R3"].activity, ReactionActivity::Inactive);
        assert!(report.applied_bounds.is_empty());
        assert!(report.biomass_bounds.1.abs() < 1e-3);
    }

    #[test]
    fn knockout_stopping_growth() {
        for genes in [&["g3"][..], &["g4"], &["g1", "g2"], &["g3", "g4"]] {
            let mut model = toy_model();
            let report = perturb(&mut model, &ClarabelFva::new(), &settings(genes, true)).unwrap();
            assert_eq!(report.biomass_bounds, (0., 0.));
            assert_eq!(model.reactions["BIOMASS"].bounds(), (0., 0.));
        }
    }

    #[test]
    fn unknown_ids_leave_model_untouched() {
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        assert_eq!(
            perturb(&mut model, &ClarabelFva::new(), &settings(&["g1", "g42"], true)),
            Err(PerturbationError::Model(ModelError::GeneNotFound(
                "g42".to_string()
            )))
        );
        let mut bad_biomass = settings(&["g1"], false);
        bad_biomass.biomass_id = "GROWTH".to_string();
        assert!(perturb(&mut model, &ClarabelFva::new(), &bad_biomass).is_err());
        assert_eq!(model.bounds_snapshot(), before);
        assert!(model.genes["g1"].is_active());
    }

    #[test]
    fn ranking_end_to_end() {
        let model = toy_model();
        let columns: Vec<String> = ["R1", "EX_a", "R3"].iter().map(|s| s.to_string()).collect();
        let index: Vec<String> = ["0", "1", "2"].iter().map(|s| s.to_string()).collect();
        let baseline = SampleTable::new(
            index.clone(),
            columns.clone(),
            DMatrix::from_row_slice(3, 3, &[1., -1., 2., 2., -2., 2., 3., -3., 2.]),
        )
        .unwrap();
        // R3 is identical in both conditions
        let perturbed = SampleTable::new(
            index,
            columns,
            DMatrix::from_row_slice(3, 3, &[2., -3., 2., 4., -3., 2., 5., -5., 2.]),
        )
        .unwrap();

        let ranked = rank_shifts(&baseline, &perturbed, &model, &["uniprot".to_string()]).unwrap();
        // EX_a shifts but has no genes, R3 does not shift
        assert_eq!(ranked.len(), 1);
        let r1 = &ranked.entries[0];
        assert_eq!(r1.rxn_id, "R1");
        assert_eq!(r1.rank, 1);
        assert_eq!(r1.gene_id, "g1");
        assert_eq!(r1.annotations["uniprot"], "P00001");
        assert!(ranked.get("R3").is_none());
    }
}
