//! CLI front end for the fingerprint pipeline: hash a file to a binary
//! fingerprint, or compare two fingerprints with a chosen distance metric.
//!
//! File I/O and command dispatch live here, outside the library crate;
//! its public surface (`extract`, `serialize`/`deserialize`, the
//! distance metrics) does all of the actual work.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use mbhash::fingerprint;

#[derive(Parser)]
#[command(name = "mbhash", about = "Perceptual H.264-decision image fingerprinting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a fingerprint from an Annex-B H.264 byte stream.
    Hash {
        /// Path to an Annex-B H.264 file (SPS + PPS + at least one slice).
        input: PathBuf,
        /// Where to write the serialized fingerprint (stdout-adjacent `.bin` by default).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare two serialized fingerprints.
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[arg(long, value_enum, default_value_t = Metric::Fast)]
        metric: Metric,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Fast,
    Pyramid,
    Full,
    Cosine,
    Hamming,
    Similarity,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Hash { input, output } => run_hash(&input, output.as_deref()),
        Command::Compare { a, b, metric } => run_compare(&a, &b, metric),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_hash(input: &std::path::Path, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let bytes = fs::read(input)?;
    let fp = mbhash::extract(&bytes)?;
    tracing::info!(
        width = fp.width,
        height = fp.height,
        num_mbs = fp.num_mbs(),
        qp_avg = fp.qp_avg,
        skip_ratio = fp.skip_ratio,
        intra_ratio = fp.intra_ratio,
        "extracted fingerprint"
    );

    let serialized = mbhash::serialize(&fp);
    let out_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension("mbhash"));
    fs::write(&out_path, &serialized)?;
    println!("wrote {} bytes to {}", serialized.len(), out_path.display());
    Ok(())
}

fn run_compare(a_path: &std::path::Path, b_path: &std::path::Path, metric: Metric) -> anyhow::Result<()> {
    let a = fingerprint::deserialize(&fs::read(a_path)?)?;
    let b = fingerprint::deserialize(&fs::read(b_path)?)?;

    match metric {
        Metric::Fast => println!("distance_fast = {}", fingerprint::distance_fast(&a, &b)),
        Metric::Pyramid => println!("distance_pyramid = {}", fingerprint::distance_pyramid(&a, &b)),
        Metric::Full => println!("distance_full = {}", fingerprint::distance_full(&a, &b)),
        Metric::Cosine => println!("cosine_similarity = {}", fingerprint::cosine_similarity(&a, &b)),
        Metric::Hamming => println!("hamming_distance = {}", fingerprint::hamming_distance(&a, &b)),
        Metric::Similarity => println!("similarity = {}", fingerprint::similarity(&a, &b)),
    }
    Ok(())
}
