//! Lock-step simulation of one generation
//!
//! Every agent flies its own bird through one shared pipe sequence. Each
//! tick runs in a fixed order: birds move and consult their controllers,
//! pipes scroll and are tested against every bird, the score and pipe list
//! are updated, out-of-bounds birds are flagged, and finally every bird
//! flagged during the tick is removed at once.

use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SimConfig};
use crate::controller::{Action, Controller, ControllerError, Observation};
use crate::entity::{AgentId, Bird, Floor, Pipe};
use crate::fitness::{FitnessShaper, TickContext};

/// Why a bird left the episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EliminationCause {
    PipeCollision,
    Floor,
    Ceiling,
    ControllerFault(String),
}

/// Why an episode stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    AllEliminated,
    FrameCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeState {
    Running,
    Terminated(TerminationReason),
}

/// Final tally for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub id: AgentId,
    pub fitness: f32,
    /// Ticks in which the bird was simulated, including the one it died in
    pub ticks_survived: u32,
    pub pipes_passed: u32,
    /// None if the bird was still flying when the episode ended
    pub elimination: Option<EliminationCause>,
}

impl AgentOutcome {
    pub fn survived(&self) -> bool {
        self.elimination.is_none()
    }
}

/// Everything the optimizer needs back from one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// One entry per controller, in the order they were supplied
    pub outcomes: Vec<AgentOutcome>,
    pub score: u32,
    pub frames: u32,
    pub termination: TerminationReason,
}

/// Read-only view of a bird for renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BirdView {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: f32,
}

/// Read-only view of a pipe for renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeView {
    pub x: f32,
    pub width: f32,
    pub gap_top: f32,
    pub gap_bottom: f32,
    pub passed: bool,
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub frame: u32,
    pub score: u32,
    pub birds: Vec<BirdView>,
    pub pipes: Vec<PipeView>,
    pub floor_y: f32,
    pub floor_offsets: [f32; 2],
}

struct Agent<C> {
    id: AgentId,
    bird: Bird,
    controller: C,
    fitness: f32,
    ticks_survived: u32,
    pipes_passed: u32,
    /// Flagged during the current tick, applied at the end of it
    pending: Option<EliminationCause>,
    elimination: Option<EliminationCause>,
}

/// One generation's simulation
pub struct Episode<C> {
    config: SimConfig,
    shaper: FitnessShaper,
    rng: Xoshiro256PlusPlus,
    agents: Vec<Agent<C>>,
    /// Indices into `agents` of birds still flying, in spawn order
    alive: Vec<usize>,
    pipes: Vec<Pipe>,
    floor: Floor,
    score: u32,
    frame: u32,
    state: EpisodeState,
}

impl<C: Controller> Episode<C> {
    /// Validate the configuration and spawn one bird per controller
    pub fn new<I>(config: SimConfig, controllers: I, seed: u64) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = C>,
    {
        config.validate()?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let first_pipe = Pipe::spawn(config.pipes.first_spawn_x, &config.pipes, &mut rng);

        let agents: Vec<Agent<C>> = controllers
            .into_iter()
            .enumerate()
            .map(|(index, controller)| Agent {
                id: AgentId::from_raw(index),
                bird: Bird::spawn(&config.physics),
                controller,
                fitness: 0.0,
                ticks_survived: 0,
                pipes_passed: 0,
                pending: None,
                elimination: None,
            })
            .collect();

        let floor = Floor::new(
            config.bounds.floor_y,
            config.bounds.floor_tile_width,
            config.pipes.speed,
        );

        log::debug!(
            "Episode with {} agents, {} rules, seed {}",
            agents.len(),
            config.collision.policy,
            seed
        );

        Ok(Self {
            shaper: FitnessShaper::from_config(&config.fitness),
            alive: (0..agents.len()).collect(),
            agents,
            pipes: vec![first_pipe],
            floor,
            score: 0,
            frame: 0,
            state: EpisodeState::Running,
            rng,
            config,
        })
    }

    /// Replace the default reward terms
    pub fn with_shaper(mut self, shaper: FitnessShaper) -> Self {
        self.shaper = shaper;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EpisodeState::Running
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn floor(&self) -> &Floor {
        &self.floor
    }

    /// Birds still flying, in spawn order
    pub fn birds(&self) -> impl Iterator<Item = (AgentId, &Bird)> + '_ {
        self.alive.iter().map(|&i| (self.agents[i].id, &self.agents[i].bird))
    }

    /// Fitness accumulated so far by an agent
    pub fn fitness(&self, id: AgentId) -> Option<f32> {
        self.agents.get(id.raw()).map(|agent| agent.fitness)
    }

    /// Horizontal position of the foremost surviving bird
    fn front_x(&self) -> Option<f32> {
        self.alive
            .iter()
            .map(|&i| self.agents[i].bird.x)
            .reduce(f32::max)
    }

    fn lead_pipe_index(&self) -> usize {
        let Some(front_x) = self.front_x() else {
            return 0;
        };
        self.pipes
            .iter()
            .position(|pipe| front_x <= pipe.trailing_edge())
            .unwrap_or(self.pipes.len().saturating_sub(1))
    }

    /// The first pipe the foremost bird has not yet cleared
    pub fn lead_pipe(&self) -> Option<&Pipe> {
        self.pipes.get(self.lead_pipe_index())
    }

    fn check_termination(&mut self) -> EpisodeState {
        if self.state == EpisodeState::Running {
            if self.alive.is_empty() {
                self.state = EpisodeState::Terminated(TerminationReason::AllEliminated);
            } else if self.frame >= self.config.episode.max_frames {
                self.state = EpisodeState::Terminated(TerminationReason::FrameCap);
            }
        }
        self.state
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) -> EpisodeState {
        if self.check_termination() != EpisodeState::Running {
            return self.state;
        }

        self.frame += 1;

        // A bird placed past every pipe's reach can leave the list empty
        if self.pipes.is_empty() {
            let pipe = Pipe::spawn(self.config.pipes.spawn_x, &self.config.pipes, &mut self.rng);
            self.pipes.push(pipe);
        }

        self.update_birds();
        let pipe_passed = self.update_pipes();

        if pipe_passed {
            self.score += 1;
            let pipe = Pipe::spawn(self.config.pipes.spawn_x, &self.config.pipes, &mut self.rng);
            self.pipes.push(pipe);
            log::debug!("Frame {}: score {}", self.frame, self.score);
        }

        self.pipes.retain(|pipe| !pipe.is_off_screen());
        self.check_bounds();
        self.floor.advance_tick();
        self.apply_eliminations();

        self.check_termination()
    }

    /// Move every bird, reward it, and let its controller decide whether to jump
    fn update_birds(&mut self) {
        let lead = self.lead_pipe_index();
        let pipe = &self.pipes[lead];
        let physics = &self.config.physics;
        let control = &self.config.control;

        for &i in &self.alive {
            let agent = &mut self.agents[i];
            agent.bird.advance_tick(physics);
            agent.ticks_survived += 1;
            agent.fitness += self.shaper.tick_reward(&TickContext {
                bird: &agent.bird,
                lead_pipe: pipe,
            });

            let observation = Observation::new(&agent.bird, pipe, control);
            let decision = match agent.controller.decide(&observation) {
                Ok(Action(value)) if !value.is_finite() => Err(ControllerError::NonFinite(value)),
                other => other,
            };

            match decision {
                Ok(action) => {
                    if action.is_jump(control.jump_threshold) {
                        agent.bird.jump(physics);
                    }
                }
                Err(err) => {
                    log::warn!("{} eliminated at frame {}: {}", agent.id, self.frame, err);
                    agent.pending = Some(EliminationCause::ControllerFault(err.to_string()));
                }
            }
        }
    }

    /// Scroll pipes, flag collisions and credit passes.
    ///
    /// Returns true if any pipe was passed this tick.
    fn update_pipes(&mut self) -> bool {
        let physics = &self.config.physics;
        let collision = &self.config.collision;
        let pass_bonus = self.shaper.pass_bonus;
        let mut any_passed = false;

        for pipe in &mut self.pipes {
            pipe.advance_tick();

            for &i in &self.alive {
                let agent = &mut self.agents[i];
                if agent.pending.is_none() && pipe.collides_with(&agent.bird, physics, collision)
                {
                    agent.pending = Some(EliminationCause::PipeCollision);
                }
            }

            let front_x = self
                .alive
                .iter()
                .map(|&i| &self.agents[i])
                .filter(|agent| agent.pending.is_none())
                .map(|agent| agent.bird.x)
                .reduce(f32::max);

            let Some(front_x) = front_x else {
                continue;
            };

            if pipe.has_passed(front_x) {
                any_passed = true;
                let threshold = pipe.trailing_edge() - pipe.pass_margin;
                for &i in &self.alive {
                    let agent = &mut self.agents[i];
                    if agent.pending.is_none() && agent.bird.x >= threshold {
                        agent.fitness += pass_bonus;
                        agent.pipes_passed += 1;
                    }
                }
                log::debug!("Frame {}: pipe at x={} passed", self.frame, pipe.x);
            }
        }

        any_passed
    }

    /// Flag birds that left the legal vertical band
    fn check_bounds(&mut self) {
        let bounds = &self.config.bounds;
        for &i in &self.alive {
            let agent = &mut self.agents[i];
            if agent.pending.is_some() {
                continue;
            }
            if agent.bird.y + bounds.floor_clearance >= bounds.floor_y {
                agent.pending = Some(EliminationCause::Floor);
            } else if agent.bird.y < bounds.ceiling_y {
                agent.pending = Some(EliminationCause::Ceiling);
            }
        }
    }

    /// Remove every bird flagged this tick
    fn apply_eliminations(&mut self) {
        let penalty = self.shaper.elimination_penalty;
        let frame = self.frame;
        let agents = &mut self.agents;

        self.alive.retain(|&i| {
            let agent = &mut agents[i];
            match agent.pending.take() {
                Some(cause) => {
                    agent.fitness += penalty;
                    log::debug!(
                        "{} eliminated at frame {} ({:?}), fitness {:.2}",
                        agent.id,
                        frame,
                        cause,
                        agent.fitness
                    );
                    agent.elimination = Some(cause);
                    false
                }
                None => true,
            }
        });
    }

    /// Step until terminated and return the report
    pub fn run(mut self) -> EpisodeReport {
        while self.step() == EpisodeState::Running {}
        self.finish()
    }

    /// Current state of every entity
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            score: self.score,
            birds: self
                .alive
                .iter()
                .map(|&i| {
                    let agent = &self.agents[i];
                    BirdView {
                        id: agent.id,
                        position: Vec2::new(agent.bird.x, agent.bird.y),
                        velocity: agent.bird.velocity,
                    }
                })
                .collect(),
            pipes: self
                .pipes
                .iter()
                .map(|pipe| PipeView {
                    x: pipe.x,
                    width: pipe.width,
                    gap_top: pipe.gap_top,
                    gap_bottom: pipe.gap_bottom(),
                    passed: pipe.passed(),
                })
                .collect(),
            floor_y: self.floor.y,
            floor_offsets: [self.floor.x1, self.floor.x2],
        }
    }

    /// Consume the episode and report every agent, in controller order.
    ///
    /// A still-running episode is reported as if it had hit the frame cap.
    pub fn finish(self) -> EpisodeReport {
        let termination = match self.state {
            EpisodeState::Terminated(reason) => reason,
            EpisodeState::Running if self.alive.is_empty() => TerminationReason::AllEliminated,
            EpisodeState::Running => TerminationReason::FrameCap,
        };

        let outcomes = self
            .agents
            .into_iter()
            .map(|agent| AgentOutcome {
                id: agent.id,
                fitness: agent.fitness,
                ticks_survived: agent.ticks_survived,
                pipes_passed: agent.pipes_passed,
                elimination: agent.elimination,
            })
            .collect();

        EpisodeReport {
            outcomes,
            score: self.score,
            frames: self.frame,
            termination,
        }
    }
}
