//! Gene effect by sampling: perturb a model by activating or knocking out genes, then sample
//! its flux space
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info};

use fluxshift_core::flux_analysis::sampling::{
    FluxSampler, HitAndRunSamplerBuilder, SamplingMethod,
};
use fluxshift_core::flux_analysis::variability::ClarabelFva;
use fluxshift_core::io::table::SampleTable;
use fluxshift_core::metabolic_model::model::Model;
use fluxshift_core::pipeline::{perturb, PerturbationReport, PerturbationSettingsBuilder};

/// Perform flux sampling on a GEM after activation or knockout of a set of genes
#[derive(Parser, Debug)]
#[command(name = "fluxshift-sample")]
#[command(about = "Perform flux sampling on a GEM by activation or knockout of a set of genes", long_about = None)]
pub struct SampleArgs {
    /// Model in COBRA JSON format
    pub model_path: PathBuf,
    /// Biomass reaction by ID
    #[arg(short = 'b', long)]
    pub id_biomass: String,
    /// Lower bound of biomass by fraction of its optimum
    #[arg(long, default_value_t = 0.9)]
    pub lb_biomass: f64,
    /// IDs of target genes to activate (or to knock out)
    #[arg(long, num_args = 1..)]
    pub target_genes: Vec<String>,
    /// Lower bound of target reactions by fraction of their optimum
    #[arg(long, default_value_t = 0.05)]
    pub lb_target_rxns: f64,
    /// Knock out target genes
    #[arg(long)]
    pub knockout: bool,
    /// Number of samples
    #[arg(short = 'n', long)]
    pub samples: usize,
    /// Hit-and-run steps between stored samples
    #[arg(short = 't', long, default_value_t = 100)]
    pub thinning: usize,
    #[arg(long, value_enum, default_value_t = Method::Optgp)]
    pub method: Method,
    /// Parallel sampling chains, samples are split evenly between them
    #[arg(short = 'p', long, default_value_t = 1)]
    pub processes: usize,
    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output CSV file of the samples
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Optgp,
    Achr,
}

impl From<Method> for SamplingMethod {
    fn from(value: Method) -> Self {
        match value {
            Method::Optgp => SamplingMethod::OptGp,
            Method::Achr => SamplingMethod::Achr,
        }
    }
}

/// Load and perturb the model, returning it with the report of what changed
pub fn load_and_adjust_model(args: &SampleArgs) -> anyhow::Result<(Model, PerturbationReport)> {
    let mut model = Model::read_json(&args.model_path)
        .with_context(|| format!("Unable to load model {}", args.model_path.display()))?;
    info!("Loaded model {}", model.id.as_deref().unwrap_or("(unnamed)"));
    info!(
        "{} reactions, {} metabolites, {} genes",
        model.reactions.len(),
        model.metabolites.len(),
        model.genes.len()
    );
    info!("Model medium: {}", serde_json::to_string_pretty(&model.medium())?);

    let settings = PerturbationSettingsBuilder::default()
        .biomass_id(args.id_biomass.clone())
        .lb_biomass(args.lb_biomass)
        .target_genes(args.target_genes.clone())
        .lb_target_rxns(args.lb_target_rxns)
        .knockout(args.knockout)
        .build()?;
    let report = perturb(&mut model, &ClarabelFva::new(), &settings)
        .context("Unable to adjust the model bounds")?;
    info!("Biomass reaction ID: {}", args.id_biomass);
    Ok((model, report))
}

/// Run the whole sampling stage and write the samples
pub fn run(args: &SampleArgs) -> anyhow::Result<SampleTable> {
    debug!("arguments: {:#?}", args);
    let (model, _report) = load_and_adjust_model(args)?;
    let sampler = HitAndRunSamplerBuilder::default()
        .method(SamplingMethod::from(args.method))
        .thinning(args.thinning)
        .processes(args.processes)
        .seed(args.seed)
        .build()?;

    let start = Instant::now();
    info!("Sampling starting");
    let samples = sampler
        .sample(&model, args.samples)
        .context("Flux sampling failed")?;
    info!("Sampling ended, elapsed time {:.2?}", start.elapsed());

    samples
        .write_csv(&args.output)
        .with_context(|| format!("Unable to write samples to {}", args.output.display()))?;
    info!("Sampling results are written into {}", args.output.display());
    Ok(samples)
}
