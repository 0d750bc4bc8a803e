//! getseq CLI entry point
//!
//! Parse genomic regions from a BED-like file and retrieve their DNA
//! sequences from Ensembl.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use getseq::core::io::{create_output, is_stdio, open_input, TeeWriter};
use getseq::core::{
    run_sequences, BatchLimits, ClientConfig, EnsemblClient, GenomeRef, RunStatus, SequenceConfig,
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_TOTAL_SPAN, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_SERVER,
    DEFAULT_TIMEOUT_SECS,
};
use getseq::formats::{format_assemblies, format_species_table, read_region_rows, FastaWriter, FieldDelimiter};
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "getseq")]
#[command(about = "Parse genomic regions from a bed file and retrieve their DNA sequences")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection settings shared by all commands
#[derive(Args, Clone)]
struct ServerArgs {
    /// Ensembl REST server
    #[arg(long, default_value = DEFAULT_SERVER)]
    server: String,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    /// Maximum requests per second (0 disables throttling)
    #[arg(long = "rate-limit", default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    requests_per_second: u32,
}

impl From<&ServerArgs> for ClientConfig {
    fn from(args: &ServerArgs) -> Self {
        ClientConfig {
            server: args.server.clone(),
            timeout: Duration::from_secs(args.timeout),
            requests_per_second: args.requests_per_second,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve DNA sequences for the regions of a bed file
    Sequences {
        /// The species, e.g. human
        species: String,
        /// The genome assembly, e.g. GRCh37
        assembly: String,
        /// Source bed file (stdin if omitted or '-')
        #[arg(short = 'b', long)]
        bed: Option<PathBuf>,
        /// Output file (stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Log file, also echoed to stderr ('-' for stderr only)
        #[arg(short = 'l', long, default_value = "getseq.log")]
        log: PathBuf,
        /// The number of bp to extend upstream
        #[arg(short = 'u', long, default_value_t = 0)]
        upstream: u64,
        /// The number of bp to extend downstream
        #[arg(short = 'd', long, default_value_t = 0)]
        downstream: u64,
        /// Maximum number of regions per request
        #[arg(long = "max-batch-size", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
        max_batch_size: usize,
        /// Maximum total bp per request
        #[arg(long = "max-span", default_value_t = DEFAULT_MAX_TOTAL_SPAN)]
        max_total_span: u64,
        /// Wrap sequences at this width (0 = one line per sequence)
        #[arg(short = 'w', long = "line-width", default_value_t = 0)]
        line_width: usize,
        #[command(flatten)]
        server: ServerArgs,
    },
    /// List available genomes
    Genomes {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// List available assemblies of a species
    Assemblies {
        /// The species, e.g. human
        species: String,
        #[command(flatten)]
        server: ServerArgs,
    },
}

fn init_logger(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp(None).format_target(false);

    if let Some(path) = log_file.filter(|p| !is_stdio(Some(*p))) {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;
        // same stream to the file and the console
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter::new(
            file,
            std::io::stderr(),
        ))));
    }
    builder.init();
    Ok(())
}

fn connect(server: &ServerArgs) -> anyhow::Result<EnsemblClient> {
    EnsemblClient::new(&server.into())
        .with_context(|| format!("Failed to set up HTTP client for {}", server.server))
}

#[allow(clippy::too_many_arguments)]
fn retrieve_sequences(
    species: String,
    assembly: String,
    bed: Option<PathBuf>,
    output: Option<PathBuf>,
    upstream: u64,
    downstream: u64,
    limits: BatchLimits,
    line_width: usize,
    server: &ServerArgs,
) -> anyhow::Result<()> {
    let start = Instant::now();

    // files are tab separated, piped input may be space aligned
    let delimiter = if is_stdio(bed.as_deref()) {
        FieldDelimiter::Whitespace
    } else {
        FieldDelimiter::Tab
    };
    let reader = open_input(bed.as_deref())
        .with_context(|| format!("Failed to open region input {:?}", bed))?;
    let rows = read_region_rows(reader, delimiter).context("Failed to read region input")?;

    let config = SequenceConfig {
        upstream_bp: upstream,
        downstream_bp: downstream,
        limits,
    };
    let genome = GenomeRef::new(species, assembly);
    let mut client = connect(server)?;
    // no signal handler is installed; the flag is the hook for embedders
    let cancel = AtomicBool::new(false);

    let report = run_sequences(rows, &genome, &config, &mut client, &cancel)?;

    if !report.records.is_empty() {
        let sink = create_output(output.as_deref())
            .with_context(|| format!("Failed to create output {:?}", output))?;
        let mut writer = FastaWriter::new(sink, line_width);
        writer
            .write_records(&report.records)
            .context("Failed to write sequences")?;
    }

    let stats = &report.stats;
    eprintln!("\n=== Retrieval Statistics ===");
    eprintln!("Total rows:      {}", stats.total_rows);
    eprintln!("Parsed regions:  {}", stats.parsed);
    eprintln!("Skipped rows:    {}", stats.skipped);
    eprintln!("Batches:         {} ({} sent)", stats.batches, stats.batches_sent);
    eprintln!("Retrieved:       {}", stats.retrieved);
    eprintln!("Failed:          {}", stats.failed);
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());

    info!("Done");
    match report.status {
        RunStatus::Failed if stats.parsed == 0 => bail!("No valid regions found in input"),
        RunStatus::Failed => bail!("No sequences could be retrieved ({} regions failed)", stats.failed),
        RunStatus::Partial => {
            eprintln!("Some regions failed, see the log for details");
            Ok(())
        }
        RunStatus::Complete => Ok(()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sequences {
            species,
            assembly,
            bed,
            output,
            log,
            upstream,
            downstream,
            max_batch_size,
            max_total_span,
            line_width,
            server,
        } => {
            init_logger(Some(&log))?;
            let limits = BatchLimits {
                max_batch_size,
                max_total_span,
            };
            retrieve_sequences(
                species, assembly, bed, output, upstream, downstream, limits, line_width, &server,
            )?;
        }

        Commands::Genomes { server } => {
            init_logger(None)?;
            eprintln!("\n Retrieving a list of available genomes ... \n");
            let species = connect(&server)?
                .species()
                .context("Failed to list genomes")?;
            print!("{}", format_species_table(&species));
        }

        Commands::Assemblies { species, server } => {
            init_logger(None)?;
            eprintln!("\n Retrieving a list of available assemblies for {} \n", species);
            let assemblies = connect(&server)?
                .assemblies(&species)
                .with_context(|| format!("Failed to list assemblies for {}", species))?;
            print!("{}", format_assemblies(&assemblies));
        }
    }

    Ok(())
}
