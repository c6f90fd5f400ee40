//! Rank flux distribution shifts between a default and a perturbed condition
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::{debug, info, warn};

use fluxshift_core::io::table::{histogram_to_writer, z_score_histogram, SampleTable};
use fluxshift_core::metabolic_model::model::Model;
use fluxshift_core::pipeline::rank_shifts;
use fluxshift_core::ranking::RankedTable;

/// Number of bins of the z-score distribution written next to the ranking
const HISTOGRAM_BINS: usize = 20;

/// Rank flux distribution shifts
#[derive(Parser, Debug)]
#[command(name = "fluxshift-rank")]
#[command(about = "Rank flux distribution shifts", long_about = None)]
pub struct RankArgs {
    /// Model in COBRA JSON format
    pub model_path: PathBuf,
    /// Samples of the default condition
    #[arg(long)]
    pub cond1: PathBuf,
    /// Samples of the perturbed condition
    #[arg(long)]
    pub cond2: PathBuf,
    /// Additional gene annotation field(s)
    #[arg(long, num_args = 0..)]
    pub gene_annotation: Vec<String>,
    /// Output CSV file of the ranking
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

/// Path of the z-score distribution, next to the ranking
pub fn distribution_path(output: &Path) -> PathBuf {
    output
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("distribution.csv")
}

/// Run the whole ranking stage and write the ranking and its z-score distribution
pub fn run(args: &RankArgs) -> anyhow::Result<RankedTable> {
    debug!("arguments: {:#?}", args);
    let baseline = SampleTable::read_csv(&args.cond1)
        .with_context(|| format!("Unable to read samples {}", args.cond1.display()))?;
    let perturbed = SampleTable::read_csv(&args.cond2)
        .with_context(|| format!("Unable to read samples {}", args.cond2.display()))?;
    let model = Model::read_json(&args.model_path)
        .with_context(|| format!("Unable to load model {}", args.model_path.display()))?;

    let ranked = rank_shifts(&baseline, &perturbed, &model, &args.gene_annotation)
        .context("Unable to rank flux shifts")?;

    // Both outputs are rendered before either file is touched
    let mut ranking_csv = Vec::new();
    ranked.to_writer(&mut ranking_csv)?;
    let mut distribution_csv = Vec::new();
    histogram_to_writer(
        &mut distribution_csv,
        &z_score_histogram(&ranked, HISTOGRAM_BINS),
    )?;

    fs::write(&args.output, ranking_csv)
        .with_context(|| format!("Unable to write ranking to {}", args.output.display()))?;
    let distribution = distribution_path(&args.output);
    if let Err(err) = fs::write(&distribution, distribution_csv) {
        if let Err(cleanup) = fs::remove_file(&args.output) {
            warn!("Unable to remove {}: {cleanup}", args.output.display());
        }
        return Err(err).with_context(|| format!("Unable to write {}", distribution.display()));
    }
    info!(
        "Ranking of {} reactions written into {}",
        ranked.len(),
        args.output.display()
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_next_to_output() {
        assert_eq!(
            distribution_path(Path::new("results/ranked.csv")),
            PathBuf::from("results/distribution.csv")
        );
        assert_eq!(
            distribution_path(Path::new("ranked.csv")),
            PathBuf::from("distribution.csv")
        );
    }

    #[test]
    fn parse_arguments() {
        let args = RankArgs::parse_from([
            "fluxshift-rank",
            "model.json",
            "--cond1",
            "wt.csv",
            "--cond2",
            "ko.csv",
            "--gene-annotation",
            "uniprot",
            "ncbigene",
            "-o",
            "out.csv",
        ]);
        assert_eq!(args.gene_annotation, vec!["uniprot", "ncbigene"]);
        assert_eq!(args.output, PathBuf::from("out.csv"));
    }
}
