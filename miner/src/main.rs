use std::{path::PathBuf, time::Duration};

use cfg_if::cfg_if;
use clap::Parser;
use colored::Colorize;
use shared::{
    difficulty::Difficulty,
    digest::Algorithm,
    log::init_log,
    partition::DOMAIN_MAX,
    puzzle::Puzzle,
    types::GlobalReport,
};
use tokio::signal;
use tracing::*;

use crate::{
    config::{load_config_file, MinerConfig},
    search::DEFAULT_POLL_INTERVAL,
    thread::{RankGroup, RunOptions},
};

mod config;
mod container;
mod search;
mod termination;
mod thread;


cfg_if! {
    if #[cfg(feature = "build-version")] {
        include!(concat!(env!("OUT_DIR"), "/version.rs"));
    } else {
        pub const VERSION: &str = "unknown";
    }
}

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    #[arg(value_name = "DIFFICULTY", help = "Number of leading zero bits the digest needs (1-32)")]
    difficulty: u32,

    #[arg(value_name = "BLOCK", help = "Block data (string) the nonce is appended to")]
    block: String,

    #[arg(
        long,
        value_name = "WORKERS_COUNT",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "The number of ranks searching in parallel. Defaults to the CPU count"
    )]
    workers: Option<u32>,

    #[arg(long, value_name = "HASHES", help = "Hashes between two checks for a peer's win")]
    poll_interval: Option<u64>,

    #[arg(long, value_name = "NONCES", help = "Only search nonces below this bound")]
    domain: Option<u64>,

    #[arg(long, value_name = "ALGORITHM", help = "Digest algorithm: md5 or sha256")]
    algorithm: Option<Algorithm>,

    #[arg(long, help = "Pin every rank thread to its own CPU core")]
    pin_cores: bool,

    #[arg(
        long,
        value_name = "MILLIS",
        help = "Stop waiting for missing ranks after this long and report partial results"
    )]
    ack_timeout: Option<u64>,

    #[arg(long, value_name = "CONFIG_FILE", help = "JSON file with default options")]
    config: Option<PathBuf>,
}

impl Args {
    fn options(&self, cfg: &MinerConfig) -> RunOptions {
        RunOptions {
            workers: self
                .workers
                .or(cfg.workers)
                .unwrap_or_else(|| num_cpus::get() as u32)
                .max(1),
            poll_interval: self.poll_interval.or(cfg.poll_interval).unwrap_or(DEFAULT_POLL_INTERVAL),
            ack_timeout: self.ack_timeout.or(cfg.ack_timeout_ms).map(Duration::from_millis),
            pin_cores: self.pin_cores || cfg.pin_cores.unwrap_or(false),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log();

    let args = Args::parse();

    info!("VERSION:{}", VERSION);

    let cfg = match &args.config {
        Some(path) => load_config_file(path)?,
        None => MinerConfig::default(),
    };
    debug!("config: {cfg:?}");

    let difficulty = Difficulty::from_leading_zeros(args.difficulty)?;
    let algorithm = args.algorithm.or(cfg.algorithm).unwrap_or_default();
    let domain = args.domain.or(cfg.domain).unwrap_or(DOMAIN_MAX);
    let options = args.options(&cfg);

    println!("Difficulty Mask: {difficulty}");
    println!("Number of processes: {}", options.workers);

    info!(
        "mining `{}` with {} ranks, algorithm: {algorithm}, poll interval: {}",
        args.block, options.workers, options.poll_interval
    );

    let puzzle = Puzzle::new(args.block, difficulty, algorithm).with_domain(domain);
    let group = RankGroup::spawn(puzzle, options)?;

    let launcher = group.launcher();
    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {err}");
            return;
        }
        info!("ctrl+c received. ask every rank to stop and wait for their reports");
        match launcher.abort() {
            Ok(reached) => debug!("abort delivered to {reached}/{} ranks", launcher.size()),
            Err(err) => error!("fail to send abort: {err}"),
        }
    });

    let report = tokio::task::spawn_blocking(move || group.join()).await??;
    print_report(&report);

    Ok(())
}

fn print_report(report: &GlobalReport) {
    match &report.solution {
        Some(solution) => {
            println!("{}", format!("Solution found by {}:", solution.found_by).green());
            println!("Nonce: {}", solution.nonce);
            println!("Hash: {}", solution.digest_hex());
        }
        None => println!("{}", "No solution found".yellow()),
    }

    if !report.missing.is_empty() {
        let ranks: Vec<_> = report.missing.iter().map(|rank| rank.0).collect();
        println!("{}", format!("Ranks that never reported: {ranks:?}").red());
    }

    println!(
        "{} hashes by {} ranks in {:.2}s ({:.2} hashes/sec)",
        report.total_hashes,
        report.workers,
        report.elapsed.as_secs_f64(),
        report.hashes_per_sec()
    );
}
