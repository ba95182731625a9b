//! Simulation configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. A compiled preset (`forgiving`, `strict` or `playback`)
//! 2. A RON file (if given and present)
//! 3. Environment variables prefixed with `FLAPPY_`
//!
//! Example environment variable: `FLAPPY_PHYSICS__GRAVITY=0.2`

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration rejected before an episode is built
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("gap top range is empty: min {min} > max {max}")]
    EmptyGapRange { min: u32, max: u32 },

    #[error("frame cap must be at least one frame")]
    ZeroFrameCap,

    #[error("floor ({floor_y}) must lie below the ceiling ({ceiling_y})")]
    InvertedBounds { floor_y: f32, ceiling_y: f32 },

    #[error("unknown collision policy '{0}' (expected 'forgiving' or 'strict')")]
    UnknownPolicy(String),

    #[error("unknown preset '{0}' (expected 'forgiving', 'strict' or 'playback')")]
    UnknownPreset(String),
}

/// Complete set of simulation constants for one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,

    #[serde(default)]
    pub pipes: PipeConfig,

    #[serde(default)]
    pub bounds: BoundsConfig,

    #[serde(default)]
    pub fitness: FitnessConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub collision: CollisionConfig,

    #[serde(default)]
    pub episode: EpisodeConfig,
}

/// Bird kinematics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Downward acceleration in pixels/tick^2
    pub gravity: f32,
    /// Velocity set by a jump (negative is up)
    pub jump_velocity: f32,
    /// Largest downward displacement allowed in one tick
    pub max_fall_per_tick: f32,
    /// Extra upward displacement added whenever the bird is rising
    pub upward_bias: f32,
    /// Fixed horizontal position of every bird
    pub spawn_x: f32,
    /// Starting height of every bird
    pub spawn_y: f32,
    /// Bird sprite width, used for hitboxes
    pub sprite_width: f32,
    /// Bird sprite height, used for hitboxes
    pub sprite_height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.17,
            jump_velocity: -10.5,
            max_fall_per_tick: 16.0,
            upward_bias: 2.0,
            spawn_x: 67.0,
            spawn_y: 300.0,
            sprite_width: 34.0,
            sprite_height: 24.0,
        }
    }
}

/// Pipe geometry, scrolling and spawning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Vertical size of the passable opening
    pub gap_height: f32,
    /// Horizontal size of a pipe
    pub width: f32,
    /// Scroll speed in pixels/tick
    pub speed: f32,
    /// Smallest gap top edge (inclusive)
    pub gap_top_min: u32,
    /// Largest gap top edge (inclusive)
    pub gap_top_max: u32,
    /// Where the first pipe of an episode appears
    pub first_spawn_x: f32,
    /// Where every following pipe appears
    pub spawn_x: f32,
    /// How far before the trailing edge a pipe counts as passed
    pub pass_margin: f32,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            gap_height: 200.0,
            width: 52.0,
            speed: 5.0,
            gap_top_min: 50,
            gap_top_max: 399,
            first_spawn_x: 700.0,
            spawn_x: 700.0,
            pass_margin: 10.0,
        }
    }
}

/// Legal vertical band and floor scrolling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    /// Height of the floor surface
    pub floor_y: f32,
    /// Distance below the bird's y that must stay above the floor
    pub floor_clearance: f32,
    /// Birds with y below this are out of bounds
    pub ceiling_y: f32,
    /// Width of one floor tile
    pub floor_tile_width: f32,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            floor_y: 550.0,
            floor_clearance: 30.0,
            ceiling_y: -5.0,
            floor_tile_width: 336.0,
        }
    }
}

/// Reward shaping constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Reward per tick alive
    pub survival_bonus: f32,
    /// Horizontal distance beyond which approach shaping is zero
    pub proximity_range: f32,
    /// Divisor applied to the approach shaping term
    pub proximity_scale: f32,
    /// Vertical distance from gap center within which alignment is rewarded
    pub alignment_radius: f32,
    /// Divisor applied to the alignment shaping term
    pub alignment_scale: f32,
    /// One-time reward for passing a pipe
    pub pass_bonus: f32,
    /// Added once when a bird is eliminated (zero or negative)
    pub elimination_penalty: f32,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            survival_bonus: 0.1,
            proximity_range: 500.0,
            proximity_scale: 100.0,
            alignment_radius: 100.0,
            alignment_scale: 20.0,
            pass_bonus: 5000.0,
            elimination_penalty: 0.0,
        }
    }
}

/// Observation normalization and action threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Actions strictly above this trigger a jump
    pub jump_threshold: f32,
    /// Divisor for the vertical offset from the gap center
    pub vertical_scale: f32,
    /// Divisor for the horizontal distance to the lead pipe
    pub horizontal_scale: f32,
    /// Divisor for the bird velocity
    pub velocity_scale: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            jump_threshold: 0.3,
            vertical_scale: 100.0,
            horizontal_scale: 400.0,
            velocity_scale: 10.0,
        }
    }
}

/// Which bird/pipe overlap test an episode uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CollisionPolicy {
    /// Shrunken hitbox around the bird center with margins around the gap
    Forgiving,
    /// Full sprite rectangle overlap against the pipe bodies
    Strict,
}

impl CollisionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionPolicy::Forgiving => "forgiving",
            CollisionPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollisionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forgiving" => Ok(CollisionPolicy::Forgiving),
            "strict" => Ok(CollisionPolicy::Strict),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl TryFrom<String> for CollisionPolicy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CollisionPolicy> for String {
    fn from(policy: CollisionPolicy) -> Self {
        policy.as_str().to_string()
    }
}

/// Collision policy and the margins the forgiving test uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    pub policy: CollisionPolicy,
    /// Footprint extension in front of the pipe's leading edge
    pub lead_margin: f32,
    /// Footprint extension behind the pipe's trailing edge
    pub trail_margin: f32,
    /// How far the bird center may reach into a pipe before colliding
    pub vertical_margin: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            policy: CollisionPolicy::Forgiving,
            lead_margin: 10.0,
            trail_margin: 8.0,
            vertical_margin: 10.0,
        }
    }
}

/// Episode limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Hard cap on ticks per episode
    pub max_frames: u32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self { max_frames: 2000 }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::forgiving()
    }
}

/// Named starting points for [`SimConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Forgiving,
    Strict,
    Playback,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forgiving" => Ok(Preset::Forgiving),
            "strict" => Ok(Preset::Strict),
            "playback" => Ok(Preset::Playback),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl Preset {
    pub fn config(self) -> SimConfig {
        match self {
            Preset::Forgiving => SimConfig::forgiving(),
            Preset::Strict => SimConfig::strict(),
            Preset::Playback => SimConfig::playback(),
        }
    }
}

impl SimConfig {
    /// Generous training rules: shrunken hitbox, no death penalty, low jump threshold
    pub fn forgiving() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            pipes: PipeConfig::default(),
            bounds: BoundsConfig::default(),
            fitness: FitnessConfig::default(),
            control: ControlConfig::default(),
            collision: CollisionConfig::default(),
            episode: EpisodeConfig::default(),
        }
    }

    /// Exact-overlap rules with a fixed penalty on elimination
    pub fn strict() -> Self {
        let mut config = Self::forgiving();
        config.collision.policy = CollisionPolicy::Strict;
        config.fitness.elimination_penalty = -1.0;
        config.control.jump_threshold = 0.5;
        config.pipes.pass_margin = 0.0;
        config.bounds.floor_clearance = config.physics.sprite_height;
        config.bounds.ceiling_y = 0.0;
        config
    }

    /// Strict rules with closer pipes and a long frame cap, for watching a champion
    pub fn playback() -> Self {
        let mut config = Self::strict();
        config.pipes.first_spawn_x = 450.0;
        config.pipes.spawn_x = 450.0;
        config.episode.max_frames = 100_000;
        config
    }

    /// Check every constant an episode depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("physics.gravity", self.physics.gravity),
            ("physics.jump_velocity", self.physics.jump_velocity),
            ("physics.upward_bias", self.physics.upward_bias),
            ("physics.spawn_x", self.physics.spawn_x),
            ("physics.spawn_y", self.physics.spawn_y),
            ("pipes.first_spawn_x", self.pipes.first_spawn_x),
            ("pipes.spawn_x", self.pipes.spawn_x),
            ("pipes.pass_margin", self.pipes.pass_margin),
            ("bounds.floor_y", self.bounds.floor_y),
            ("bounds.floor_clearance", self.bounds.floor_clearance),
            ("bounds.ceiling_y", self.bounds.ceiling_y),
            ("fitness.survival_bonus", self.fitness.survival_bonus),
            ("fitness.pass_bonus", self.fitness.pass_bonus),
            ("fitness.elimination_penalty", self.fitness.elimination_penalty),
            ("control.jump_threshold", self.control.jump_threshold),
            ("collision.lead_margin", self.collision.lead_margin),
            ("collision.trail_margin", self.collision.trail_margin),
            ("collision.vertical_margin", self.collision.vertical_margin),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        let positive = [
            ("physics.max_fall_per_tick", self.physics.max_fall_per_tick),
            ("physics.sprite_width", self.physics.sprite_width),
            ("physics.sprite_height", self.physics.sprite_height),
            ("pipes.gap_height", self.pipes.gap_height),
            ("pipes.width", self.pipes.width),
            ("pipes.speed", self.pipes.speed),
            ("bounds.floor_tile_width", self.bounds.floor_tile_width),
            ("fitness.proximity_range", self.fitness.proximity_range),
            ("fitness.proximity_scale", self.fitness.proximity_scale),
            ("fitness.alignment_radius", self.fitness.alignment_radius),
            ("fitness.alignment_scale", self.fitness.alignment_scale),
            ("control.vertical_scale", self.control.vertical_scale),
            ("control.horizontal_scale", self.control.horizontal_scale),
            ("control.velocity_scale", self.control.velocity_scale),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.physics.gravity < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "physics.gravity",
                value: self.physics.gravity,
            });
        }

        if self.pipes.gap_top_min > self.pipes.gap_top_max {
            return Err(ConfigError::EmptyGapRange {
                min: self.pipes.gap_top_min,
                max: self.pipes.gap_top_max,
            });
        }

        if self.episode.max_frames == 0 {
            return Err(ConfigError::ZeroFrameCap);
        }

        if self.bounds.floor_y <= self.bounds.ceiling_y {
            return Err(ConfigError::InvertedBounds {
                floor_y: self.bounds.floor_y,
                ceiling_y: self.bounds.ceiling_y,
            });
        }

        Ok(())
    }

    /// Load configuration with layered priority:
    /// 1. The preset (lowest priority)
    /// 2. `path` as a RON file (optional, missing file is not an error)
    /// 3. Environment variables prefixed with `FLAPPY_` (highest priority)
    ///
    /// The result is validated before it is returned.
    pub fn load(preset: Preset, path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&preset.config())
            .context("Failed to serialize preset configuration")?;

        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Ron)
                    .required(false),
            );
        }

        let builder = builder.add_source(
            ::config::Environment::with_prefix("FLAPPY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SimConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().context("Invalid configuration")?;
        log::debug!(
            "Loaded {} configuration (frame cap {})",
            config.collision.policy,
            config.episode.max_frames
        );
        Ok(config)
    }

    /// Pretty RON text for this configuration
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration")
    }
}
