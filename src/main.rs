// ==============================================================================
// main.rs - SNP Phenotype Plotter Entry Point
// ==============================================================================
// Description: CLI for single-request plots and batch ZIP bundles
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snp_pheno_plot::models::{ClassificationPolicy, DuplicatePolicy};
use snp_pheno_plot::plot::ImageFormat;
use snp_pheno_plot::{
    BatchRunner, PipelineConfig, PlotPipeline, PlotRequest, RequestOutcome, RequestWorkspace,
    UploadedTable,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; missing keys take their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for per-request output
    #[arg(
        short,
        long,
        env = "SNP_PLOT_WORK_DIR",
        default_value = "./snp-plot-work",
        global = true
    )]
    work_dir: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the violin figure for one phenotype/allele pair
    Plot {
        /// Phenotype table (tab-delimited)
        #[arg(long)]
        phenotype: Option<PathBuf>,

        /// Allele table (comma-delimited)
        #[arg(long)]
        allele: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Render both figure families for every allele table into one ZIP
    Batch {
        /// Phenotype table (tab-delimited)
        #[arg(long)]
        phenotype: Option<PathBuf>,

        /// Allele tables, processed in the order given
        #[arg(long = "allele", num_args = 1..)]
        alleles: Vec<PathBuf>,

        /// Also write the batch report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args, Debug)]
struct Overrides {
    /// Allele value classified as minor
    #[arg(long, conflicts_with = "frequency_baseline")]
    minor_allele: Option<String>,

    /// Treat the most frequent allele as major, everything else as minor
    #[arg(long)]
    frequency_baseline: bool,

    /// Fail on duplicate accessions in an allele table
    #[arg(long)]
    strict_duplicates: bool,

    /// Phenotype column plotted on the value axis
    #[arg(long)]
    trait_column: Option<String>,

    /// Output image format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// TrueType font used for chart text
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl Overrides {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(minor_allele) = &self.minor_allele {
            config.classification = ClassificationPolicy::FixedBaseline {
                minor_allele: minor_allele.clone(),
            };
        }
        if self.frequency_baseline {
            config.classification = ClassificationPolicy::FrequencyBaseline;
        }
        if self.strict_duplicates {
            config.duplicate_policy = DuplicatePolicy::Strict;
        }
        if let Some(column) = &self.trait_column {
            config.trait_column = column.clone();
        }
        if let Some(format) = self.format {
            config.style.format = match format {
                FormatArg::Png => ImageFormat::Png,
                FormatArg::Jpeg => ImageFormat::Jpeg,
            };
        }
        if let Some(font) = &self.font {
            config.style.font_path = Some(font.clone());
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize tracing (stdout is reserved for the JSON result)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "snp_pheno_plot=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    info!("SNP phenotype plotter starting...");

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Command::Plot {
            phenotype,
            allele,
            overrides,
        } => {
            overrides.apply(&mut config);
            run_plot(config, &args.work_dir, phenotype, allele)
        }
        Command::Batch {
            phenotype,
            alleles,
            report,
            overrides,
        } => {
            overrides.apply(&mut config);
            run_batch(config, &args.work_dir, phenotype, &alleles, report.as_deref())
        }
    }
}

fn run_plot(
    config: PipelineConfig,
    work_dir: &Path,
    phenotype: Option<PathBuf>,
    allele: Option<PathBuf>,
) -> Result<ExitCode> {
    let pipeline = PlotPipeline::new(config).context("Invalid configuration")?;
    let workspace =
        RequestWorkspace::create(work_dir).context("Failed to create request workspace")?;

    let result = read_optional(phenotype.as_deref())
        .and_then(|phenotype| Ok(PlotRequest::new(phenotype, read_optional(allele.as_deref())?)))
        .and_then(|request| pipeline.run(&request, &workspace));
    let outcome = RequestOutcome::from_result(result);

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_batch(
    config: PipelineConfig,
    work_dir: &Path,
    phenotype: Option<PathBuf>,
    alleles: &[PathBuf],
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let pipeline = PlotPipeline::new(config).context("Invalid configuration")?;
    let workspace =
        RequestWorkspace::create(work_dir).context("Failed to create request workspace")?;

    let phenotype = read_optional(phenotype.as_deref())?;
    let uploads = alleles
        .iter()
        .map(|path| {
            UploadedTable::from_path(path)
                .with_context(|| format!("Failed to read allele table {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = BatchRunner::new(&pipeline)
        .run(phenotype.as_ref(), &uploads, &workspace)
        .context("Batch run failed")?;

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = report_path {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    println!("{}", json);

    Ok(ExitCode::SUCCESS)
}

fn read_optional(path: Option<&Path>) -> snp_pheno_plot::Result<Option<UploadedTable>> {
    path.map(UploadedTable::from_path).transpose()
}
