//! winstair: adaptive word-in-noise staircase sessions.
//!
//! Runs a full baseline + main session against a simulated participant and
//! writes one JSON line per trial plus a session summary.

mod participant;
mod sink;
mod words;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use participant::SimulatedParticipant;
use sink::JsonLinesSink;
use winstair_core::StaircasePhase;
use winstair_experiment::{ExperimentConfig, ExperimentSession, SessionSummary, StimulusPool, TrialSession};
use winstair_timing::{HighPrecisionTimer, Timer, VirtualTimer};

#[derive(Parser)]
#[command(name = "winstair")]
#[command(about = "Adaptive staircase sessions for word identification in noise")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session against the simulated participant.
    Run {
        /// Experiment config (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Word list (TOML); a synthetic list is generated when absent
        #[arg(short, long)]
        words: Option<PathBuf>,
        /// Overrides the config seed
        #[arg(long)]
        seed: Option<u64>,
        /// Directory for trial rows and the summary
        #[arg(short, long, default_value = "results")]
        out_dir: PathBuf,
        /// Sleep in real time instead of on a virtual clock
        #[arg(long)]
        realtime: bool,
    },

    /// Validate a config and word list and print the planned block orders.
    Check {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        words: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Serialize)]
struct RunReport<'a> {
    seed: u64,
    config: &'a Path,
    words: Option<&'a Path>,
    realtime: bool,
    summary: &'a SessionSummary,
}

fn load(config_path: &Path, words: Option<&Path>) -> Result<(ExperimentConfig, StimulusPool)> {
    let config = ExperimentConfig::from_toml_path(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let pool = match words {
        Some(path) => {
            StimulusPool::from_toml_path(path).with_context(|| format!("loading word list {}", path.display()))?
        }
        None => {
            info!("no word list given, generating a synthetic one");
            words::synthetic_pool(&config)
        }
    };
    Ok((config, pool))
}

fn resolve_seed(cli_seed: Option<u64>, config: &ExperimentConfig) -> u64 {
    cli_seed.or(config.seed).unwrap_or_else(|| rand::rng().random())
}

fn run_with<T: Timer>(
    session: ExperimentSession,
    timer: T,
    rng: ChaCha8Rng,
    participant: &mut SimulatedParticipant,
    sink: &mut JsonLinesSink,
) -> Result<SessionSummary> {
    let mut trials = TrialSession::new(session, timer, rng);
    let summary = trials.run(participant, sink)?;
    Ok(summary)
}

fn run(config_path: &Path, words: Option<&Path>, seed: Option<u64>, out_dir: &Path, realtime: bool) -> Result<()> {
    let (config, pool) = load(config_path, words)?;
    let seed = resolve_seed(seed, &config);
    info!(seed, "session seed");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let session = ExperimentSession::new(config, pool, &mut rng).context("preparing session")?;
    let mut participant = SimulatedParticipant::new(ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)));

    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let rows_path = out_dir.join(format!("trials-{seed}.jsonl"));
    let mut sink = JsonLinesSink::create(&rows_path)?;

    let result = if realtime {
        run_with(session, HighPrecisionTimer::new(), rng, &mut participant, &mut sink)
    } else {
        run_with(session, VirtualTimer::new(), rng, &mut participant, &mut sink)
    };
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            warn!(rows = sink.rows, path = %rows_path.display(), "completed trials were kept");
            return Err(e);
        }
    };

    let summary_path = out_dir.join(format!("summary-{seed}.json"));
    let report = RunReport {
        seed,
        config: config_path,
        words,
        realtime,
        summary: &summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&summary_path, json).with_context(|| format!("writing {}", summary_path.display()))?;

    println!("Session {:?}: {} trials", summary.outcome, summary.trials_recorded);
    for k in summary.per_key.iter().filter(|k| k.key.phase == StaircasePhase::Main) {
        println!(
            "  {:<28} trials {:>3}  accuracy {:>6}  final intensity {:>8}",
            k.key.to_string(),
            k.trials,
            k.accuracy.map_or("-".into(), |a| format!("{a:.3}")),
            k.final_intensity.map_or("-".into(), |i| format!("{i:.4}")),
        );
    }
    if summary.degraded_selections > 0 {
        println!("  degraded selections: {}", summary.degraded_selections);
    }
    println!("Trials:  {}", rows_path.display());
    println!("Summary: {}", summary_path.display());
    Ok(())
}

fn check(config_path: &Path, words: Option<&Path>, seed: Option<u64>) -> Result<()> {
    let (config, pool) = load(config_path, words)?;
    let seed = resolve_seed(seed, &config);
    let shortfalls = pool.shortfalls(&config);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let session = ExperimentSession::new(config, pool, &mut rng).context("validating session")?;

    println!("Config and word list are valid (seed {seed}).");
    for s in &shortfalls {
        println!(
            "  warning: {} has {} items but may need {}",
            s.partition, s.available, s.required
        );
    }
    for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
        println!("{phase} blocks:");
        for block in session.blocks(phase) {
            println!(
                "  {:>2}. {:<13} {} trials{}",
                block.number,
                block.condition.to_string(),
                block.trials,
                if block.rest_after { "  [rest]" } else { "" }
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            config,
            words,
            seed,
            out_dir,
            realtime,
        } => run(&config, words.as_deref(), seed, &out_dir, realtime),
        Commands::Check { config, words, seed } => check(&config, words.as_deref(), seed),
    }
}
