//! Optimizer-facing entry points
//!
//! Runs whole episodes and condenses them into per-generation statistics.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SimConfig};
use crate::controller::Controller;
use crate::entity::AgentId;
use crate::episode::{AgentOutcome, Episode, EpisodeReport, TerminationReason};

/// Summary of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Best fitness this generation
    pub best_fitness: f32,
    /// Average fitness this generation
    pub avg_fitness: f32,
    /// Agent that reached `best_fitness`
    pub best_agent: Option<AgentId>,
    /// Birds still flying when the episode ended
    pub survivors: usize,
    /// Pipes cleared
    pub score: u32,
    /// Ticks simulated
    pub frames: u32,
}

impl GenerationStats {
    pub fn from_report(report: &EpisodeReport) -> Self {
        let best = report
            .outcomes
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness));

        let total: f32 = report.outcomes.iter().map(|o| o.fitness).sum();

        Self {
            best_fitness: best.map_or(0.0, |o| o.fitness),
            avg_fitness: if report.outcomes.is_empty() {
                0.0
            } else {
                total / report.outcomes.len() as f32
            },
            best_agent: best.map(|o| o.id),
            survivors: report.outcomes.iter().filter(|o| o.survived()).count(),
            score: report.score,
            frames: report.frames,
        }
    }
}

/// Result of evaluating one population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// One entry per controller, in the order they were supplied
    pub outcomes: Vec<AgentOutcome>,
    pub stats: GenerationStats,
    pub termination: TerminationReason,
}

impl GenerationReport {
    /// Fitness values in controller order
    pub fn fitnesses(&self) -> Vec<f32> {
        self.outcomes.iter().map(|o| o.fitness).collect()
    }
}

impl From<EpisodeReport> for GenerationReport {
    fn from(report: EpisodeReport) -> Self {
        let stats = GenerationStats::from_report(&report);
        Self {
            outcomes: report.outcomes,
            stats,
            termination: report.termination,
        }
    }
}

/// Fly every controller through one shared episode
pub fn run_generation<C, I>(
    config: &SimConfig,
    controllers: I,
    seed: u64,
) -> Result<GenerationReport, ConfigError>
where
    C: Controller,
    I: IntoIterator<Item = C>,
{
    let episode = Episode::new(config.clone(), controllers, seed)?;
    let report = GenerationReport::from(episode.run());

    log::info!(
        "Generation done: best={:.2}, avg={:.2}, score={}, frames={}, survivors={}",
        report.stats.best_fitness,
        report.stats.avg_fitness,
        report.stats.score,
        report.stats.frames,
        report.stats.survivors
    );

    Ok(report)
}

/// Evaluate independent populations in parallel.
///
/// Population `i` is seeded with `base_seed + i`, so the results do not
/// depend on how the work is scheduled.
pub fn evaluate_populations<C>(
    config: &SimConfig,
    populations: Vec<Vec<C>>,
    base_seed: u64,
) -> Result<Vec<GenerationReport>, ConfigError>
where
    C: Controller + Send,
{
    config.validate()?;

    populations
        .into_par_iter()
        .enumerate()
        .map(|(index, population)| {
            let seed = base_seed.wrapping_add(index as u64);
            let episode = Episode::new(config.clone(), population, seed)?;
            Ok(GenerationReport::from(episode.run()))
        })
        .collect()
}

/// Outcome of replaying a single controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackReport {
    pub outcome: AgentOutcome,
    pub score: u32,
    pub frames: u32,
}

/// Replay one controller until it is eliminated or the frame cap is hit
pub fn playback<C: Controller>(
    config: &SimConfig,
    controller: C,
    seed: u64,
) -> Result<PlaybackReport, ConfigError> {
    let report = Episode::new(config.clone(), std::iter::once(controller), seed)?.run();

    let EpisodeReport {
        outcomes,
        score,
        frames,
        ..
    } = report;

    // Exactly one agent was spawned
    let outcome = outcomes.into_iter().next().unwrap_or(AgentOutcome {
        id: AgentId::from_raw(0),
        fitness: 0.0,
        ticks_survived: 0,
        pipes_passed: 0,
        elimination: None,
    });

    log::info!(
        "Playback finished: score={}, frames={}, cause={:?}",
        score,
        frames,
        outcome.elimination
    );

    Ok(PlaybackReport {
        outcome,
        score,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Action, ConstantController};
    use crate::episode::EliminationCause;

    fn hover_config(max_frames: u32) -> SimConfig {
        let mut config = SimConfig::forgiving();
        config.physics.gravity = 0.0;
        config.pipes.gap_top_min = 200;
        config.pipes.gap_top_max = 200;
        config.episode.max_frames = max_frames;
        config
    }

    #[test]
    fn test_stats_from_outcomes() {
        let mut config = hover_config(50);
        config.bounds.ceiling_y = 250.0;
        // Idle birds hover, jumpers hit the ceiling at tick 6
        let controllers = vec![
            ConstantController(Action::IDLE),
            ConstantController(Action::JUMP),
            ConstantController(Action::IDLE),
        ];
        let report = run_generation(&config, controllers, 7).unwrap();

        assert_eq!(report.stats.survivors, 2);
        assert_eq!(report.stats.frames, 50);
        assert_eq!(report.termination, TerminationReason::FrameCap);
        assert_eq!(
            report.outcomes[1].elimination,
            Some(EliminationCause::Ceiling)
        );

        let fitnesses = report.fitnesses();
        assert_eq!(fitnesses[0], fitnesses[2]);
        assert!(fitnesses[1] < fitnesses[0]);
        assert_eq!(report.stats.best_fitness, fitnesses[0]);
        assert_eq!(report.stats.best_agent, Some(AgentId::from_raw(0)));
        let avg = fitnesses.iter().sum::<f32>() / 3.0;
        assert!((report.stats.avg_fitness - avg).abs() < 1e-4);
    }

    #[test]
    fn test_empty_generation_stats() {
        let report = run_generation(&SimConfig::default(), Vec::<ConstantController>::new(), 1)
            .unwrap();
        assert_eq!(report.stats.best_fitness, 0.0);
        assert_eq!(report.stats.avg_fitness, 0.0);
        assert_eq!(report.stats.best_agent, None);
        assert_eq!(report.stats.frames, 0);
        assert_eq!(report.termination, TerminationReason::AllEliminated);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = SimConfig::default();
        let populations: Vec<Vec<ConstantController>> = (0..4)
            .map(|_| vec![ConstantController(Action::IDLE); 3])
            .collect();

        let parallel = evaluate_populations(&config, populations.clone(), 100).unwrap();
        assert_eq!(parallel.len(), 4);

        for (index, population) in populations.into_iter().enumerate() {
            let sequential = run_generation(&config, population, 100 + index as u64).unwrap();
            assert_eq!(parallel[index], sequential);
        }
    }

    #[test]
    fn test_evaluate_rejects_bad_config() {
        let mut config = SimConfig::default();
        config.episode.max_frames = 0;
        let result = evaluate_populations(&config, vec![vec![ConstantController(Action::IDLE)]], 0);
        assert_eq!(result, Err(ConfigError::ZeroFrameCap));
    }

    #[test]
    fn test_playback_free_fall() {
        let report = playback(
            &SimConfig::playback(),
            ConstantController(Action::IDLE),
            3,
        )
        .unwrap();
        assert_eq!(report.outcome.elimination, Some(EliminationCause::Floor));
        assert_eq!(report.frames, 23);
        assert_eq!(report.score, 0);
    }
}
