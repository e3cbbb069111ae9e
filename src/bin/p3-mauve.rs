//! p3-mauve CLI
//!
//! Runs Mauve on a set of genomes and converts XMFA alignments to JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mauve_rs::config::{Config, JobParams, ServerConfig};
use mauve_rs::output::{write_json, write_json_file};
use mauve_rs::xmfa::read_xmfa_file;
use mauve_rs::{HeaderPolicy, MauveRunner, PostProcessOptions, TrailingGaps, XmfaParser};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "p3-mauve")]
#[command(author, version, about = "Run Mauve genome alignments and export XMFA as JSON")]
#[command(long_about = "Run Mauve genome alignments and export XMFA as JSON.

Examples:
  p3-mauve align -g 204722.5,224914.11 -o results/
  p3-mauve align --jfile job.json
  p3-mauve parse -i results/alignment.xmfa --gaps -o alignment.json")]
struct Cli {
    /// Log filter (e.g. info, debug, mauve_rs=trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an XMFA file to JSON
    Parse {
        /// Input XMFA file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Align genome FASTA files with Mauve and write alignment.json
    Align(AlignArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Keep full names and aligned sequences
    #[arg(long)]
    include_seqs: bool,

    /// Annotate each region with its gap runs
    #[arg(long)]
    gaps: bool,

    /// Also report gap runs that reach the end of a sequence
    #[arg(long, requires = "gaps")]
    strict_gaps: bool,

    /// Keep a final block that has no terminator line
    #[arg(long)]
    flush: bool,

    /// Fail on malformed headers instead of skipping their regions
    #[arg(long)]
    strict_headers: bool,
}

impl ExportArgs {
    fn post_process(&self) -> PostProcessOptions {
        let options = if self.include_seqs {
            PostProcessOptions::full()
        } else {
            PostProcessOptions::summary()
        };
        if !self.gaps {
            return options;
        }
        let trailing = if self.strict_gaps {
            TrailingGaps::Strict
        } else {
            TrailingGaps::Legacy
        };
        options.with_gaps(trailing)
    }

    fn header_policy(&self) -> HeaderPolicy {
        if self.strict_headers {
            HeaderPolicy::Strict
        } else {
            HeaderPolicy::Lenient
        }
    }
}

#[derive(Args)]
struct AlignArgs {
    /// Genome IDs, comma delimited
    #[arg(short, long, value_delimiter = ',')]
    genome_ids: Vec<String>,

    /// Genome FASTA files (instead of <output>/<id>[.<suffix>].fasta)
    #[arg(long, num_args = 1..)]
    fasta: Vec<PathBuf>,

    /// Job parameters as a JSON string
    #[arg(long, conflicts_with = "jfile")]
    jstring: Option<String>,

    /// Job parameters as a JSON file
    #[arg(long)]
    jfile: Option<PathBuf>,

    /// Server config as a JSON string
    #[arg(long)]
    sstring: Option<String>,

    /// Where to save files and results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suffix appended to genome FASTA names
    #[arg(short, long)]
    suffix: Option<String>,

    /// progressiveMauve or mauveAligner
    #[arg(long)]
    recipe: Option<String>,

    /// Aligner executable (defaults to the recipe's command on PATH)
    #[arg(long)]
    mauve_bin: Option<PathBuf>,

    /// Only resolve inputs; do not run the aligner
    #[arg(short = 'n', long)]
    no_mauve: bool,

    /// Seed weight for calculating initial anchors
    #[arg(long)]
    seed_weight: Option<u32>,

    /// Maximum number of base pairs to attempt aligning with the gapped aligner
    #[arg(long)]
    max_gapped_aligner_length: Option<u64>,

    /// Maximum weight scaling by breakpoint distance, in [0, 1]
    #[arg(long)]
    max_breakpoint_distance_scale: Option<f64>,

    /// Scale conservation distances by this amount, in [0, 1]
    #[arg(long)]
    conservation_distance_scale: Option<f64>,

    /// Minimum pairwise LCB score
    #[arg(long)]
    weight: Option<f64>,

    /// Minimum breakpoint penalty after scaling by expected divergence
    #[arg(long)]
    min_scaled_penalty: Option<f64>,

    /// Probability of transitioning from the unrelated to the homologous state
    #[arg(long)]
    hmm_p_go_homologous: Option<f64>,

    /// Probability of transitioning from the homologous to the unrelated state
    #[arg(long)]
    hmm_p_go_unrelated: Option<f64>,

    #[command(flatten)]
    export: ExportArgs,
}

impl AlignArgs {
    /// Job parameters from `--jfile`, `--jstring`, or the flags themselves.
    ///
    /// `--output` and `--suffix` always override the job description.
    fn job_params(&self) -> Result<JobParams> {
        let loaded = if let Some(path) = &self.jfile {
            Some(
                JobParams::from_json_file(path)
                    .with_context(|| format!("reading job file {}", path.display()))?,
            )
        } else if let Some(json) = &self.jstring {
            Some(JobParams::from_json_str(json).context("parsing --jstring")?)
        } else {
            None
        };
        if let Some(mut params) = loaded {
            params.output = self.output.clone().or(params.output);
            params.suffix = self.suffix.clone().or(params.suffix);
            return Ok(params);
        }
        Ok(JobParams {
            genome_ids: self.genome_ids.clone(),
            recipe: self.recipe.clone(),
            output: self.output.clone(),
            suffix: self.suffix.clone(),
            seed_weight: self.seed_weight,
            max_gapped_aligner_length: self.max_gapped_aligner_length,
            max_breakpoint_distance_scale: self.max_breakpoint_distance_scale,
            conservation_distance_scale: self.conservation_distance_scale,
            weight: self.weight,
            min_scaled_penalty: self.min_scaled_penalty,
            hmm_p_go_homologous: self.hmm_p_go_homologous,
            hmm_p_go_unrelated: self.hmm_p_go_unrelated,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Parse {
            input,
            output,
            export,
        } => run_parse(input, output, &export),
        Commands::Align(args) => run_align(&args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{level}'"))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

fn run_parse(input: PathBuf, output: Option<PathBuf>, export: &ExportArgs) -> Result<()> {
    let parser = read_xmfa_file(&input, XmfaParser::with_policy(export.header_policy()))
        .with_context(|| format!("parsing {}", input.display()))?;
    if !parser.diagnostics().is_empty() {
        info!(count = parser.diagnostics().len(), "XMFA parsed with warnings");
    }

    let mut lcbs = if export.flush {
        parser.finish()
    } else {
        parser.into_lcbs()
    };
    mauve_rs::process(&mut lcbs, &export.post_process());

    match output {
        Some(path) => write_json_file(&path, &lcbs)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_json(&mut handle, &lcbs)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

fn run_align(args: &AlignArgs) -> Result<()> {
    let params = args.job_params()?;

    if let Some(sstring) = &args.sstring {
        let server = ServerConfig::from_json_str(sstring)?;
        debug!(data_api = ?server.data_api, "server config");
    }

    let config = Config::from_job(&params)?;
    if params.genome_ids.is_empty() && args.fasta.is_empty() {
        bail!("No genomes given; use --genome-ids, --fasta or a job description");
    }
    if !params.genome_ids.is_empty() && config.output_dir.as_os_str().is_empty() {
        bail!("Must specify output directory path.");
    }

    let fastas: Vec<PathBuf> = if args.fasta.is_empty() {
        params
            .genome_ids
            .iter()
            .map(|id| config.genome_fasta_path(id))
            .collect()
    } else {
        args.fasta.clone()
    };
    info!(genomes = fastas.len(), recipe = %config.recipe, "resolved inputs");

    if args.no_mauve {
        for path in &fastas {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let mut runner = MauveRunner::new(config)
        .with_post_process(args.export.post_process())
        .with_header_policy(args.export.header_policy())
        .flush_at_eof(args.export.flush);
    if let Some(bin) = &args.mauve_bin {
        runner = runner.with_binary(bin);
    }

    let result = runner.run(&fastas).context("Error running Mauve")?;
    info!(
        lcbs = result.lcb_count,
        json = %result.json_path.display(),
        "Done."
    );
    Ok(())
}
