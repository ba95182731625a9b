use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use flappy_neat::champion::{self, Champion};
use flappy_neat::controller::FeedForwardController;
use flappy_neat::{evaluate_populations, playback, Preset, SimConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a preset configuration as RON
    Init {
        /// Preset to write: forgiving, strict, playback
        #[arg(long, default_value = "forgiving")]
        preset: Preset,

        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score random feed-forward populations and keep the best controller
    Evaluate {
        /// Base rules: forgiving, strict, playback
        #[arg(long, default_value = "forgiving")]
        preset: Preset,

        /// RON file layered over the preset
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of rounds
        #[arg(long, default_value = "20")]
        rounds: usize,

        /// Populations evaluated in parallel per round
        #[arg(long, default_value = "8")]
        batch: usize,

        /// Controllers per population
        #[arg(long, default_value = "50")]
        population: usize,

        /// Hidden layer size of each controller
        #[arg(long, default_value = "6")]
        hidden: usize,

        #[arg(long, default_value = "0")]
        seed: u64,

        /// Where to save the best controller
        #[arg(long, default_value = "champion.bin")]
        output: PathBuf,
    },

    /// Replay a saved champion
    Play {
        /// Champion file written by `evaluate`
        champion: PathBuf,

        /// Base rules: forgiving, strict, playback
        #[arg(long, default_value = "playback")]
        preset: Preset,

        /// RON file layered over the preset
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Init { preset, output } => init(preset, output),
        Command::Evaluate {
            preset,
            config,
            rounds,
            batch,
            population,
            hidden,
            seed,
            output,
        } => {
            let config = SimConfig::load(preset, config.as_deref())?;
            evaluate(
                &config,
                EvaluateArgs {
                    rounds,
                    batch,
                    population,
                    hidden,
                    seed,
                },
                &output,
            )
        }
        Command::Play {
            champion,
            preset,
            config,
            seed,
        } => {
            let config = SimConfig::load(preset, config.as_deref())?;
            play(&config, &champion, seed)
        }
    }
}

fn init(preset: Preset, output: Option<PathBuf>) -> Result<()> {
    let text = preset.config().to_ron()?;
    match output {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write configuration to {:?}", path))?;
            log::info!("Wrote {:?} preset to {:?}", preset, path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

struct EvaluateArgs {
    rounds: usize,
    batch: usize,
    population: usize,
    hidden: usize,
    seed: u64,
}

/// First episode seed of a round, so every population in a run gets its own seed
fn round_seed(seed: u64, round: usize, batch: usize) -> u64 {
    seed.wrapping_add((round as u64).wrapping_mul(batch as u64))
}

/// Create a progress bar style
fn progress_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .context("Invalid progress bar template")?
        .progress_chars("█▓░"))
}

fn evaluate(config: &SimConfig, args: EvaluateArgs, output: &Path) -> Result<()> {
    let pb = ProgressBar::new(args.rounds as u64);
    pb.set_style(progress_style()?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    pb.println(format!(
        "Evaluating {} rounds of {} populations x {} controllers ({} rules)",
        args.rounds, args.batch, args.population, config.collision.policy
    ));

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(args.seed);
    let mut best: Option<Champion> = None;

    for round in 0..args.rounds {
        let populations: Vec<Vec<FeedForwardController>> = (0..args.batch)
            .map(|_| {
                (0..args.population)
                    .map(|_| FeedForwardController::random(args.hidden, &mut rng))
                    .collect()
            })
            .collect();

        let base_seed = round_seed(args.seed, round, args.batch);
        let reports = evaluate_populations(config, populations.clone(), base_seed)
            .context("Failed to evaluate populations")?;

        for (index, (report, population)) in reports.iter().zip(populations).enumerate() {
            let Some(agent) = report.stats.best_agent else {
                continue;
            };
            let fitness = report.stats.best_fitness;
            if best.as_ref().map_or(true, |b| fitness > b.fitness) {
                let controller = population
                    .into_iter()
                    .nth(agent.raw())
                    .context("Best agent missing from its population")?;
                best = Some(Champion::new(
                    controller,
                    fitness,
                    base_seed.wrapping_add(index as u64),
                ));
            }
        }

        let top_score = reports.iter().map(|r| r.stats.score).max().unwrap_or(0);
        pb.println(format!(
            "Round {}: best={:.2}, top score={}",
            round,
            best.as_ref().map_or(0.0, |b| b.fitness),
            top_score
        ));
        pb.inc(1);
    }

    match best {
        Some(champion) => {
            champion::save(output, &champion)?;
            pb.finish_with_message(format!("Best fitness {:.2}", champion.fitness));
        }
        None => pb.finish_with_message("No controllers evaluated"),
    }
    Ok(())
}

fn play(config: &SimConfig, path: &Path, seed: u64) -> Result<()> {
    let champion = champion::load(path)?;
    log::info!(
        "Replaying champion (fitness {:.2}, trained on seed {})",
        champion.fitness,
        champion.seed
    );

    let report = playback(config, champion.controller, seed).context("Invalid configuration")?;

    println!(
        "Score: {}  Frames: {}  Fitness: {:.2}",
        report.score, report.frames, report.outcome.fitness
    );
    match report.outcome.elimination {
        Some(cause) => println!("Eliminated: {:?}", cause),
        None => println!("Survived to the frame cap"),
    }
    Ok(())
}
