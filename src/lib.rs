//! # Flappy NEAT - Flappy Bird fitness environment
//!
//! A deterministic, headless Flappy Bird simulation used to score
//! populations of evolved controllers. Every controller flies its own bird
//! through one shared, seeded pipe sequence and gets back a shaped fitness.

pub mod champion;
pub mod collision;
pub mod config;
pub mod controller;
pub mod entity;
pub mod episode;
pub mod fitness;
pub mod runner;

pub use config::{CollisionPolicy, ConfigError, Preset, SimConfig};
pub use controller::{Action, Controller, ControllerError, Observation};
pub use episode::{Episode, EpisodeReport, EpisodeState, Snapshot};
pub use runner::{evaluate_populations, playback, run_generation, GenerationReport, GenerationStats};

/// Common imports for internal use
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::controller::{Action, Controller, FeedForwardController, Observation};
    pub use crate::entity::{AgentId, Bird, Floor, Pipe};
    pub use crate::episode::{AgentOutcome, EliminationCause, Episode, EpisodeState};
    pub use glam::Vec2;
}
