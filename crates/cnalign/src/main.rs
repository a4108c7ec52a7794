use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

use cnalign::{
    Config, ResultTable, RunSummary, SolverSession, read_observations, solve_pool,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find purity and ploidy of multi-region tumor samples by optimal segment alignment",
    long_about = None
)]
struct Args {
    /// Input table (tab-delimited: sample, segment, logR, BAF, GC, mb)
    input: PathBuf,
    /// Output table (tab-delimited: Variable, Solution_1 .. Solution_N)
    output: PathBuf,
    /// Solver license file
    license: PathBuf,

    /// TOML file with model settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Minimum sample ploidy [1.6]
    #[arg(long = "min_ploidy")]
    min_ploidy: Option<f64>,
    /// Maximum sample ploidy [6.0]
    #[arg(long = "max_ploidy")]
    max_ploidy: Option<f64>,
    /// Minimum sample purity [0.05]
    #[arg(long = "min_purity")]
    min_purity: Option<f64>,
    /// Maximum sample purity [0.95]
    #[arg(long = "max_purity")]
    max_purity: Option<f64>,
    /// Minimum length (Mb) for a segment to count in the alignment [5.0]
    #[arg(long = "min_aligned_seg_mb")]
    min_aligned_seg_mb: Option<f64>,
    /// Maximum combined length (Mb) of homozygously deleted segments per sample [100.0]
    #[arg(long = "max_homdel_mb")]
    max_homdel_mb: Option<f64>,
    /// Max distance of a sample's TCN to its nearest integer [0.2]
    #[arg(long = "delta_tcn_to_int")]
    delta_tcn_to_int: Option<f64>,
    /// Max distance of a sample's TCN to the segment average [0.1]
    #[arg(long = "delta_tcn_to_avg")]
    delta_tcn_to_avg: Option<f64>,
    /// Max distance of the segment TCN average to its nearest integer [0.1]
    #[arg(long = "delta_tcnavg_to_int")]
    delta_tcnavg_to_int: Option<f64>,
    /// Max distance of a sample's MCN to its nearest integer [0.2]
    #[arg(long = "delta_mcn_to_int")]
    delta_mcn_to_int: Option<f64>,
    /// Max distance of a sample's MCN to the segment average [0.1]
    #[arg(long = "delta_mcn_to_avg")]
    delta_mcn_to_avg: Option<f64>,
    /// Max distance of the segment MCN average to its nearest integer [0.1]
    #[arg(long = "delta_mcnavg_to_int")]
    delta_mcnavg_to_int: Option<f64>,
    /// Weight of MCN in objective 2; TCN gets 1 - mcn_weight [0.5]
    #[arg(long = "mcn_weight")]
    mcn_weight: Option<f64>,
    /// Minimum fraction of aligned samples for a segment to be aligned [1.0]
    #[arg(long = "rho")]
    rho: Option<f64>,
    /// Solver time budget (s) for the whole run, shared by all stages [180]
    #[arg(long = "timeout")]
    timeout: Option<u64>,
    /// Minimum number of CNA segments per sample [5]
    #[arg(long = "min_cna_segments_per_sample")]
    min_cna_segments_per_sample: Option<usize>,
    /// Optimize objective 2 only over clonal (aligned) segments [false]
    #[arg(long = "obj2_clonalonly", num_args = 0..=1, default_missing_value = "true")]
    obj2_clonalonly: Option<bool>,
    /// Number of solutions to return [10]
    #[arg(long = "sol_count")]
    sol_count: Option<usize>,
    /// logR compression factor [1.0]
    #[arg(long = "logr_gamma")]
    logr_gamma: Option<f64>,
}

impl Args {
    /// Defaults, then the TOML file, then flags
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        apply!(
            min_ploidy,
            max_ploidy,
            min_purity,
            max_purity,
            min_aligned_seg_mb,
            max_homdel_mb,
            delta_tcn_to_int,
            delta_tcn_to_avg,
            delta_tcnavg_to_int,
            delta_mcn_to_int,
            delta_mcn_to_avg,
            delta_mcnavg_to_int,
            mcn_weight,
            rho,
            timeout,
            min_cna_segments_per_sample,
            obj2_clonalonly,
            sol_count,
            logr_gamma,
        );

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = args.resolve_config()?;
    info!("cnalign command-line mode");
    info!("- input: {}", args.input.display());
    info!("- output: {}", args.output.display());
    log::debug!("effective configuration: {:#?}", config);

    let table = read_observations(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let session = SolverSession::acquire(&args.license)?;

    let pool = match solve_pool(&table, &config, &session) {
        Ok(pool) => pool,
        Err(e) if e.is_no_solution() => {
            error!("{e}");
            error!(
                "Hint: widen the purity/ploidy bounds or lower min_cna_segments_per_sample; no output was written."
            );
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if pool.is_suboptimal() {
        warn!("time budget ran out; solutions may not be optimal");
    }

    ResultTable::from_pool(&table, &pool).write_tsv(&args.output)?;

    if let Some(path) = &args.summary {
        RunSummary::new(&args.input, &table, &pool, &config).write_json(path)?;
    }

    info!("Done. Have a nice day!");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["cnalign", "in.tsv", "out.tsv", "solver.lic"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_positional_arguments() {
        let args = parse(&[]);
        assert_eq!(args.input, PathBuf::from("in.tsv"));
        assert_eq!(args.output, PathBuf::from("out.tsv"));
        assert_eq!(args.license, PathBuf::from("solver.lic"));
        assert_eq!(args.resolve_config().unwrap(), Config::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&["--max_ploidy", "4.5", "--rho", "0.5", "--obj2_clonalonly", "--sol_count", "3"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.max_ploidy, 4.5);
        assert_eq!(config.rho, 0.5);
        assert!(config.obj2_clonalonly);
        assert_eq!(config.sol_count, 3);
        assert_eq!(config.min_ploidy, 1.6);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = parse(&["--mcn_weight", "1.5"]);
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_missing_positional_rejected() {
        assert!(Args::try_parse_from(["cnalign", "in.tsv"]).is_err());
    }
}
