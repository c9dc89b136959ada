use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use gfa2gbwt::convert::{self, GfaParsingParameters};
use gfa2gbwt::{emit, serialize};

/// gfa2gbwt: translate GFA files into a compact path index and back
#[derive(Parser)]
#[command(
    name = "gfa2gbwt",
    about = "Translate GFA files into a compact path index and back"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a GFA file and build the index
    Ingest {
        /// Path to the input GFA file
        #[arg(short, long)]
        input: PathBuf,
        /// Path to the output index file
        #[arg(short, long)]
        output: PathBuf,
        /// Maximum node length in bases (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_node_length: usize,
        /// Insertion batch size in nodes (0 = automatic)
        #[arg(long, default_value_t = 0)]
        batch_size: usize,
        /// Regular expression applied to path names
        #[arg(long, default_value = gfa2gbwt::metadata::DEFAULT_REGEX)]
        path_regex: String,
        /// Field assignment for the capture groups (S, C, H, F, X = skip)
        #[arg(long, default_value = gfa2gbwt::metadata::DEFAULT_FIELDS)]
        path_fields: String,
        /// Print progress information to stderr
        #[arg(long)]
        progress: bool,
    },
    /// Write an index back out as GFA
    Emit {
        /// Path to the input index file
        #[arg(short, long)]
        input: PathBuf,
        /// Path to the output GFA file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print progress information to stderr
        #[arg(long)]
        progress: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Ingest {
            input,
            output,
            max_node_length,
            batch_size,
            path_regex,
            path_fields,
            progress,
        } => run_ingest(
            input,
            output,
            max_node_length,
            batch_size,
            path_regex,
            path_fields,
            progress,
        ),
        Commands::Emit {
            input,
            output,
            progress,
        } => run_emit(input, output, progress),
    };
    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run_ingest(
    input: PathBuf,
    output: PathBuf,
    max_node_length: usize,
    batch_size: usize,
    path_regex: String,
    path_fields: String,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut parameters = GfaParsingParameters {
        max_node_length,
        path_name_regex: path_regex,
        path_name_fields: path_fields,
        show_progress: progress,
        ..Default::default()
    };
    if batch_size > 0 {
        parameters.batch_size = batch_size;
        parameters.automatic_batch_size = false;
    }

    let (store, index) = convert::gfa_to_gbwt(&input, &parameters)?;
    serialize::save(&output, &store, &index)?;
    if progress {
        eprintln!(
            "Serialized {} nodes and {} paths to {}",
            store.node_count(),
            index.paths(),
            output.display()
        );
    }
    Ok(())
}

fn run_emit(
    input: PathBuf,
    output: Option<PathBuf>,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, index) = serialize::load(&input)?;
    match output {
        Some(path) => {
            let out = BufWriter::new(File::create(&path)?);
            emit::gbwt_to_gfa(&store, &index, out, progress)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            emit::gbwt_to_gfa(&store, &index, &mut lock, progress)?;
            lock.flush()?;
        }
    }
    Ok(())
}
