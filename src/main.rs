//! iterscheme CLI - expand a sweep file into records
//!
//! Reads a TOML sweep file (see `iterscheme::config`), builds the scheme
//! and prints one JSON object per record on stdout:
//!
//! 1. Load: parse constants, levels and the optional split
//! 2. Build: chain the levels into an iteration scheme
//! 3. Select: the whole scheme, or one split part with `--part`
//! 4. Emit: JSON lines via the mapping adapter, or just a count
//!
//! Logs go to stderr so stdout stays pipeable.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use iterscheme::{map_adapter, NestedIterationScheme, SweepConfig};

/// Expand declarative parameter sweeps
///
/// Every record is printed as one JSON object, keys in declaration order.
///
/// Examples:
///   iterscheme sweep.toml                 # All records
///   iterscheme sweep.toml --part 0        # First split part only
///   iterscheme sweep.toml --count         # Number of records
#[derive(Parser, Debug)]
#[command(name = "iterscheme")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Sweep file describing constants, levels and split
    #[arg(value_name = "SWEEP_FILE")]
    pub sweep: PathBuf,

    /// Only emit this split part (0-based)
    ///
    /// Each part of a `[split]` sweep is an independent chunk of the first
    /// loop level, suitable for handing to one worker. Without a split the
    /// whole sweep is the only part, `--part 0`.
    #[arg(short, long)]
    pub part: Option<usize>,

    /// Print the number of records instead of the records
    #[arg(short, long)]
    pub count: bool,

    /// Verbose output
    ///
    /// Shows the parsed sweep and scheme diagnostics on stderr.
    /// RUST_LOG overrides the level when set.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = SweepConfig::load(&cli.sweep)
        .with_context(|| format!("Failed to load sweep '{}'", cli.sweep.display()))?;
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }

    let scheme = select(&cli, &config)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if cli.count {
        let total = scheme.count();
        info!(total, "counted records");
        writeln!(out, "{}", total)?;
        return Ok(());
    }

    let mut emitted = 0usize;
    for record in map_adapter(scheme)? {
        let record = record?;
        serde_json::to_writer(&mut out, &record).context("Failed to encode record")?;
        out.write_all(b"\n")?;
        emitted += 1;
    }
    out.flush()?;

    debug!(emitted, "records written");
    Ok(())
}

/// Resolve the whole scheme or the requested split part.
fn select(cli: &Cli, config: &SweepConfig) -> Result<NestedIterationScheme> {
    let scheme = config.to_scheme().context("Invalid sweep")?;

    match cli.part {
        None => Ok(scheme.into()),
        Some(index) => {
            let mut parts = scheme.into_parts();
            let available = parts.len();
            if index >= available {
                anyhow::bail!(
                    "Part {} out of range: sweep has {} part(s)",
                    index,
                    available
                );
            }
            Ok(parts.swap_remove(index))
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
