//! Command-line surface for unikmer
//!
//! `find-unique-kmers` is the real work; `demo-echo` and `demo-log` are small
//! scaffolding commands.

use crate::collection::SequenceCollection;
use crate::config::UnikmerConfig;
use crate::error::{Result, UnikmerError};
use crate::kmer::{KmerUniquenessIndex, MIN_K};
use crate::logging::{self, LogLevel};
use crate::output::{self, OutputFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// File name of the run log written by `demo-log`
pub const RUN_LOG_FILE: &str = "unikmer.log";

#[derive(Parser, Debug)]
#[command(
    name = "unikmer",
    author,
    version,
    about = "Find k-mers unique to each sequence of a collection",
    long_about = None
)]
pub struct Cli {
    /// Log level (overrides config and UNIKMER_LOG_LEVEL)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Identify unique k-mers from sequences
    #[command(arg_required_else_help = true)]
    FindUniqueKmers(FindArgs),

    /// Print a message once per -v
    #[command(arg_required_else_help = true)]
    DemoEcho(EchoArgs),

    /// Record arguments, version and input file details to a run log
    #[command(arg_required_else_help = true)]
    DemoLog(DemoLogArgs),
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Path to the input file containing sequences
    #[arg(short, long)]
    pub infile: PathBuf,

    /// Length of the k-mers
    #[arg(short = 'k', long = "kmer-length", alias = "kmer_length")]
    pub kmer_length: Option<usize>,

    /// Path to the output file
    #[arg(short, long)]
    pub outfile: PathBuf,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Extract k-mers in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for --parallel (0 = all cores)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Configuration file (.toml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Message to print
    pub message: String,

    /// Test run
    #[arg(short, long)]
    pub test: bool,

    /// Number of times to print the message
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Choice {
    #[default]
    Choice1,
    Choice2,
}

#[derive(Args, Debug)]
pub struct DemoLogArgs {
    /// Input file, must exist
    #[arg(short, long)]
    pub infile: PathBuf,

    /// Directory for the run log (console when omitted)
    #[arg(short, long)]
    pub outpath: Option<PathBuf>,

    /// Make a choice
    #[arg(long, value_enum, default_value_t = Choice::Choice1)]
    pub achoice: Choice,

    /// Comma separated names
    #[arg(long, value_delimiter = ',')]
    pub names: Vec<String>,

    /// Overwrite an existing run log
    #[arg(short = 'O', long)]
    pub overwrite: bool,

    /// MySQL account details, e.g. 'myhost.com jill jills_pass'
    #[arg(
        long = "ensembl-account",
        alias = "ensembl_account",
        env = "ENSEMBL_ACCOUNT",
        hide_env_values = true
    )]
    pub ensembl_account: Option<String>,

    /// Verbosity, counted
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve configuration: defaults, config file, environment, then flags
    pub fn load_config(&self) -> Result<UnikmerConfig> {
        self.load_config_with(|key| std::env::var(key).ok())
    }

    /// `load_config` with an explicit environment lookup
    pub fn load_config_with<F>(&self, lookup: F) -> Result<UnikmerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.command {
            Commands::FindUniqueKmers(FindArgs {
                config: Some(path), ..
            }) => UnikmerConfig::load_from_file(path)?,
            _ => UnikmerConfig::default(),
        };
        config.apply_overrides(lookup)?;

        if self.quiet {
            config.logging.level = LogLevel::Warn;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        if let Commands::FindUniqueKmers(args) = &self.command {
            if let Some(k) = args.kmer_length {
                if k < MIN_K {
                    return Err(UnikmerError::invalid_kmer_length(k, MIN_K));
                }
                config.index.k = Some(k);
            }
            if let Some(format) = args.format {
                config.output.format = format;
            }
            if let Some(threads) = args.threads {
                config.index.threads = threads;
            }
            if args.parallel {
                config.index.parallel = true;
            }
        }

        // Flags go through the same range checks as the file and environment
        config.check()?;
        Ok(config)
    }
}

/// Execute a parsed command line, writing user-facing messages to `out`
pub fn run<W: Write>(cli: &Cli, config: &UnikmerConfig, out: &mut W) -> Result<()> {
    match &cli.command {
        Commands::FindUniqueKmers(args) => find_unique_kmers(args, config, out),
        Commands::DemoEcho(args) => demo_echo(args, out),
        Commands::DemoLog(args) => demo_log(args, out),
    }
}

fn find_unique_kmers<W: Write>(
    args: &FindArgs,
    config: &UnikmerConfig,
    out: &mut W,
) -> Result<()> {
    // k is validated before any input is read
    let k = config.index.k.ok_or_else(|| {
        UnikmerError::config("K-mer length is required (-k or index.k in the config file)")
    })?;
    let index = KmerUniquenessIndex::new(k)?;

    let start = Instant::now();
    let collection = SequenceCollection::from_fasta(&args.infile)?;
    info!(
        input = %args.infile.display(),
        sequences = collection.len(),
        residues = collection.total_residues(),
        "Loaded sequences"
    );

    let unique = if config.index.parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.index.threads)
            .build()?;
        pool.install(|| index.compute_parallel(&collection))
    } else {
        index.compute(&collection)
    };

    output::write_to_path(&unique, config.output.format, &args.outfile)?;
    info!(
        output = %args.outfile.display(),
        elapsed = ?start.elapsed(),
        "Finished"
    );

    writeln!(out, "Unique k-mers written to {}", args.outfile.display())?;
    Ok(())
}

fn demo_echo<W: Write>(args: &EchoArgs, out: &mut W) -> Result<()> {
    for _ in 0..args.verbose {
        writeln!(out, "{}", args.message)?;
    }
    Ok(())
}

fn demo_log<W: Write>(args: &DemoLogArgs, out: &mut W) -> Result<()> {
    if !args.infile.exists() {
        return Err(UnikmerError::InputNotFound(args.infile.clone()));
    }
    let input_bytes = fs::metadata(&args.infile)?.len();

    match &args.outpath {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let log_path = dir.join(RUN_LOG_FILE);
            if log_path.exists() {
                if !args.overwrite {
                    return Err(UnikmerError::config(format!(
                        "{} already exists, use --overwrite to replace it",
                        log_path.display()
                    )));
                }
                fs::remove_file(&log_path)?;
            }
            logging::with_run_log(&log_path, || record_run(args, input_bytes))?;
            writeln!(out, "Run log written to {}", log_path.display())?;
        }
        None => record_run(args, input_bytes),
    }
    Ok(())
}

fn record_run(args: &DemoLogArgs, input_bytes: u64) {
    info!(
        achoice = ?args.achoice,
        names = ?args.names,
        overwrite = args.overwrite,
        verbose = args.verbose,
        ensembl_account_set = args.ensembl_account.is_some(),
        "Arguments"
    );
    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Versions"
    );
    info!(path = %display_path(&args.infile), bytes = input_bytes, "Input file");
}

fn display_path(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
