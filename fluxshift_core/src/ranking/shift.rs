//! Per reaction shift statistic between a baseline and a perturbed set of flux samples
use crate::io::table::SampleTable;
use crate::ranking::{RankedEntry, RankedTable, RankingError};
use log::{debug, warn};

/// Shift statistic of a set of paired differences
///
/// Returns `mean / std` with the sample standard deviation, or exactly `0.0` when every
/// difference is zero. A constant non zero difference gives an infinite score.
pub fn shift_statistic(differences: &[f64]) -> f64 {
    if differences.iter().all(|d| *d == 0.) {
        return 0.;
    }
    let n = differences.len() as f64;
    let mean = differences.iter().sum::<f64>() / n;
    let variance = differences
        .iter()
        .map(|d| (d - mean).powi(2))
        .sum::<f64>()
        / (n - 1.);
    mean / variance.sqrt()
}

/// Score the flux shift of every reaction from `baseline` to `perturbed`
///
/// Samples are paired by sample id; ids present in only one table are dropped. The returned
/// table holds the non zero scores in descending `|z_score|` order (ties keep the baseline column
/// order) with dense ranks, and no model information yet.
pub fn compute_shift_scores(
    baseline: &SampleTable,
    perturbed: &SampleTable,
) -> Result<RankedTable, RankingError> {
    let column_pairs = align_columns(baseline, perturbed)?;
    let row_pairs = align_rows(baseline, perturbed)?;
    debug!(
        "Scoring {} reactions over {} paired samples",
        column_pairs.len(),
        row_pairs.len()
    );

    let base_values = baseline.values();
    let pert_values = perturbed.values();
    let mut entries = Vec::with_capacity(column_pairs.len());
    for (base_col, pert_col) in column_pairs {
        let differences: Vec<f64> = row_pairs
            .iter()
            .map(|&(b, p)| pert_values[(p, pert_col)] - base_values[(b, base_col)])
            .collect();
        let z_score = shift_statistic(&differences);
        let rxn_id = &baseline.columns()[base_col];
        if z_score == 0. {
            continue;
        }
        if z_score.is_nan() {
            warn!("Dropping reaction {rxn_id}, its flux differences are not numbers");
            continue;
        }
        entries.push(RankedEntry::new(rxn_id, z_score));
    }
    // sort_by is stable, ties keep column order
    entries.sort_by(|a, b| b.z_score.abs().total_cmp(&a.z_score.abs()));

    let mut table = RankedTable {
        annotation_keys: Vec::new(),
        entries,
    };
    table.assign_dense_ranks();
    Ok(table)
}

/// Pair every baseline column with the perturbed column of the same reaction
fn align_columns(
    baseline: &SampleTable,
    perturbed: &SampleTable,
) -> Result<Vec<(usize, usize)>, RankingError> {
    let missing: Vec<String> = baseline
        .columns()
        .iter()
        .filter(|c| perturbed.column_position(c).is_none())
        .cloned()
        .collect();
    let extra: Vec<String> = perturbed
        .columns()
        .iter()
        .filter(|c| baseline.column_position(c).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        return Err(RankingError::SchemaMismatch { missing, extra });
    }
    Ok(baseline
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(i, c)| perturbed.column_position(c).map(|j| (i, j)))
        .collect())
}

/// Pair rows sharing a sample id, in baseline order
fn align_rows(
    baseline: &SampleTable,
    perturbed: &SampleTable,
) -> Result<Vec<(usize, usize)>, RankingError> {
    let pairs: Vec<(usize, usize)> = baseline
        .index()
        .iter()
        .enumerate()
        .filter_map(|(i, s)| perturbed.row_position(s).map(|j| (i, j)))
        .collect();
    let dropped = baseline.nrows() + perturbed.nrows() - 2 * pairs.len();
    if dropped > 0 {
        warn!(
            "{dropped} samples are present in only one of the tables and are ignored ({} shared)",
            pairs.len()
        );
    }
    match pairs.len() {
        0 => Err(RankingError::NoSharedSamples),
        1 => Err(RankingError::InsufficientSamples(1)),
        _ => Ok(pairs),
    }
}
