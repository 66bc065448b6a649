// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `snipstream`: mines persistent activity snippets from an edge stream file.
//!
//! Runs the online miner by default; `--offline` recomputes scores from full
//! occurrence history and `--data-stream` runs the binned baseline. Ranked
//! scores and occurrence counts are written under `--output-dir`.
#![allow(clippy::print_stdout)]

mod output;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use snipstream_core::report::{rank_by_frequency, rank_by_score};
use snipstream_core::{
    MinerConfig, OfflineMiner, SnippetMiner, Timestamp, Update, UpdateError, UpdateReader, View,
    DEFAULT_DELIMITER, DEFAULT_MEASUREMENT_PERIODS,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::output::{top_table, Mode, OutputPaths};

const PROGRESS_EVERY: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Persistent activity snippet miner")]
struct Args {
    /// Edge stream, one `op,u,v,w,label_u,label_v,edge_label[,timestamp]` record per line
    #[arg(long)]
    stream: PathBuf,
    /// Field delimiter
    #[arg(long, default_value_t = DEFAULT_DELIMITER)]
    delimiter: char,
    /// Maximum time distance between combinable updates
    #[arg(long)]
    window_size: Option<Timestamp>,
    /// Maximum updates per snippet (enumerated up to 3)
    #[arg(long)]
    max_size: Option<usize>,
    /// Snippet key view: id, label or order
    #[arg(long)]
    view: Option<View>,
    /// Coverage exponent
    #[arg(long)]
    alpha: Option<f64>,
    /// Frequency exponent
    #[arg(long)]
    beta: Option<f64>,
    /// Regularity exponent
    #[arg(long)]
    gamma: Option<f64>,
    /// JSON miner configuration; flags above override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Score from full occurrence history after the stream ends
    #[arg(long, conflicts_with = "data_stream")]
    offline: bool,
    /// Score by distinct measurement periods (binned baseline)
    #[arg(long)]
    data_stream: bool,
    /// Also write every occurrence time per snippet (offline only)
    #[arg(long)]
    save_occs: bool,
    /// Skip writing output files
    #[arg(long)]
    no_save: bool,
    /// Root directory for output files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
    /// Number of top snippets to print
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Only log warnings and skip the summary table
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    config.validate().context("invalid miner configuration")?;
    info!(
        view = %config.view,
        window_size = config.window_size,
        max_size = config.max_snippet_size,
        "mining {}",
        args.stream.display()
    );
    if args.save_occs && !args.offline {
        warn!("--save-occs only applies to --offline runs; occurrences will not be saved");
    }

    if args.data_stream {
        run_data_stream(&args, &config)
    } else if args.offline {
        run_offline(&args, &config)
    } else {
        run_online(&args, config)
    }
}

/// Defaults, then the JSON file, then explicit flags.
fn load_config(args: &Args) -> Result<MinerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => MinerConfig::default(),
    };
    if let Some(window_size) = args.window_size {
        config.window_size = window_size;
    }
    if let Some(max_size) = args.max_size {
        config.max_snippet_size = max_size;
    }
    if let Some(view) = args.view {
        config.view = view;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    if let Some(gamma) = args.gamma {
        config.gamma = gamma;
    }
    Ok(config)
}

/// Feeds every record of the stream to `step`, logging progress and
/// throughput. Stops at the first malformed record.
fn mine<F>(args: &Args, mut step: F) -> Result<u64>
where
    F: FnMut(Result<Update, UpdateError>) -> Result<(), UpdateError>,
{
    let file = File::open(&args.stream)
        .with_context(|| format!("open stream {}", args.stream.display()))?;
    let reader = UpdateReader::with_delimiter(BufReader::new(file), args.delimiter);
    let started = Instant::now();
    let mut processed = 0_u64;
    for record in reader {
        step(record).with_context(|| format!("read stream {}", args.stream.display()))?;
        processed += 1;
        if processed % PROGRESS_EVERY == 0 {
            info!(updates = processed, "edge updates processed");
        }
    }
    let seconds = started.elapsed().as_secs_f64();
    info!(
        updates = processed,
        seconds,
        updates_per_sec = processed as f64 / seconds.max(f64::EPSILON),
        "stream mined"
    );
    Ok(processed)
}

fn run_online(args: &Args, config: MinerConfig) -> Result<()> {
    let paths = OutputPaths::new(args, &config, Mode::Online);
    let mut miner = SnippetMiner::new(config).context("invalid miner configuration")?;
    mine(args, |record| miner.process_record(record).map(|_| ()))?;

    let stats = miner.engine().stats();
    info!(
        snippets = miner.engine().len(),
        recomputes = stats.recomputes,
        fast_path = stats.fast_path,
        degeneracies = stats.degeneracies,
        "scoring finished"
    );
    let scores = rank_by_score(miner.scores());
    let counts = rank_by_frequency(miner.frequencies());
    if !args.quiet {
        println!("{}", top_table(&scores, args.top, "persistence"));
    }
    if !args.no_save {
        paths.write_ranked("out", &scores)?;
        paths.write_ranked("freq_out", &counts)?;
    }
    Ok(())
}

fn run_offline(args: &Args, config: &MinerConfig) -> Result<()> {
    let paths = OutputPaths::new(args, config, Mode::Offline);
    let mut miner = OfflineMiner::new(config).context("invalid miner configuration")?;
    mine(args, |record| miner.process_record(record))?;

    info!("computing persistence");
    let oracle = miner.into_oracle();
    let scores = rank_by_score(oracle.persistence_all());
    let counts = rank_by_frequency(oracle.iter().map(|(key, times)| (key, times.len() as u64)));
    if !args.quiet {
        println!("{}", top_table(&scores, args.top, "persistence"));
    }
    if !args.no_save {
        paths.write_ranked("out", &scores)?;
        paths.write_ranked("freq_out", &counts)?;
        if args.save_occs {
            paths.write_occurrences(oracle.iter())?;
        }
    }
    Ok(())
}

fn run_data_stream(args: &Args, config: &MinerConfig) -> Result<()> {
    let paths = OutputPaths::new(args, config, Mode::DataStream);
    let mut miner = OfflineMiner::new(config).context("invalid miner configuration")?;
    mine(args, |record| miner.process_record(record))?;

    info!(periods = DEFAULT_MEASUREMENT_PERIODS, "computing binned persistence");
    let periods = rank_by_frequency(miner.oracle().binned_persistence(DEFAULT_MEASUREMENT_PERIODS));
    if !args.quiet {
        println!("{}", top_table(&periods, args.top, "periods"));
    }
    if !args.no_save {
        paths.write_ranked("data_stream_out", &periods)?;
    }
    Ok(())
}
