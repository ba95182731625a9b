//! Fitness shaping for evolving controllers
//!
//! Each surviving bird earns the sum of several independent reward terms
//! every tick, plus one-time bonuses and penalties for terminal events.

use crate::config::FitnessConfig;
use crate::entity::{Bird, Pipe};

/// What a reward term can see on a given tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub bird: &'a Bird,
    pub lead_pipe: &'a Pipe,
}

/// One additive component of the per-tick reward
pub trait RewardTerm: Send + Sync {
    /// Reward earned this tick
    fn reward(&self, ctx: &TickContext<'_>) -> f32;

    /// Get the name of this term
    fn name(&self) -> &str;

    /// Get a description of what this term encourages
    fn description(&self) -> &str;
}

/// Flat reward for every tick alive
pub struct SurvivalBonus {
    pub per_tick: f32,
}

impl RewardTerm for SurvivalBonus {
    fn reward(&self, _ctx: &TickContext<'_>) -> f32 {
        self.per_tick
    }

    fn name(&self) -> &str {
        "Survival"
    }

    fn description(&self) -> &str {
        "Constant reward per tick alive"
    }
}

/// Grows as the lead pipe approaches, zero beyond `range` or once reached
pub struct ProximityShaping {
    pub range: f32,
    pub scale: f32,
}

impl RewardTerm for ProximityShaping {
    fn reward(&self, ctx: &TickContext<'_>) -> f32 {
        let distance = ctx.lead_pipe.x - ctx.bird.x;
        if distance > 0.0 {
            ((self.range - distance) / self.scale).max(0.0)
        } else {
            0.0
        }
    }

    fn name(&self) -> &str {
        "Proximity"
    }

    fn description(&self) -> &str {
        "Rewards closing the horizontal distance to the next pipe"
    }
}

/// Grows as the bird nears the gap center, zero outside `radius`
pub struct AlignmentShaping {
    pub radius: f32,
    pub scale: f32,
}

impl RewardTerm for AlignmentShaping {
    fn reward(&self, ctx: &TickContext<'_>) -> f32 {
        let offset = (ctx.bird.y - ctx.lead_pipe.gap_center()).abs();
        if offset < self.radius {
            (self.radius - offset) / self.scale
        } else {
            0.0
        }
    }

    fn name(&self) -> &str {
        "Alignment"
    }

    fn description(&self) -> &str {
        "Rewards holding the height of the next gap's center"
    }
}

/// Sum of reward terms plus terminal bonuses
pub struct FitnessShaper {
    pub terms: Vec<Box<dyn RewardTerm>>,
    pub pass_bonus: f32,
    pub elimination_penalty: f32,
}

impl FitnessShaper {
    pub fn new(
        terms: Vec<Box<dyn RewardTerm>>,
        pass_bonus: f32,
        elimination_penalty: f32,
    ) -> Self {
        Self {
            terms,
            pass_bonus,
            elimination_penalty,
        }
    }

    /// Survival, proximity and alignment terms from the configured constants
    pub fn from_config(config: &FitnessConfig) -> Self {
        Self::new(
            vec![
                Box::new(SurvivalBonus {
                    per_tick: config.survival_bonus,
                }),
                Box::new(ProximityShaping {
                    range: config.proximity_range,
                    scale: config.proximity_scale,
                }),
                Box::new(AlignmentShaping {
                    radius: config.alignment_radius,
                    scale: config.alignment_scale,
                }),
            ],
            config.pass_bonus,
            config.elimination_penalty,
        )
    }

    pub fn tick_reward(&self, ctx: &TickContext<'_>) -> f32 {
        self.terms.iter().map(|term| term.reward(ctx)).sum()
    }

    /// Per-term rewards, for logging and tuning
    pub fn breakdown(&self, ctx: &TickContext<'_>) -> Vec<(&str, f32)> {
        self.terms
            .iter()
            .map(|term| (term.name(), term.reward(ctx)))
            .collect()
    }
}
