//! Pipe pairs scrolling toward the birds

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{CollisionConfig, PhysicsConfig, PipeConfig};
use crate::entity::Bird;

/// A top and bottom pipe separated by a vertical gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Leading (left) edge
    pub x: f32,
    /// Bottom edge of the top pipe
    pub gap_top: f32,
    pub gap_height: f32,
    pub width: f32,
    pub speed: f32,
    pub pass_margin: f32,
    /// Set once the lead bird clears the trailing edge, never cleared
    passed: bool,
}

impl Pipe {
    /// Create a pipe with a known gap position
    pub fn new(x: f32, gap_top: f32, config: &PipeConfig) -> Self {
        Self {
            x,
            gap_top,
            gap_height: config.gap_height,
            width: config.width,
            speed: config.speed,
            pass_margin: config.pass_margin,
            passed: false,
        }
    }

    /// Create a pipe with its gap top sampled uniformly from the configured range
    pub fn spawn<R: Rng>(x: f32, config: &PipeConfig, rng: &mut R) -> Self {
        let gap_top = rng.random_range(config.gap_top_min..=config.gap_top_max);
        Self::new(x, gap_top as f32, config)
    }

    /// Scroll left by one tick
    pub fn advance_tick(&mut self) {
        self.x -= self.speed;
    }

    /// Top edge of the bottom pipe
    pub fn gap_bottom(&self) -> f32 {
        self.gap_top + self.gap_height
    }

    pub fn gap_center(&self) -> f32 {
        self.gap_top + self.gap_height / 2.0
    }

    pub fn trailing_edge(&self) -> f32 {
        self.x + self.width
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Latch the passed flag if `bird_x` has reached the trailing edge.
    ///
    /// Returns true only on the tick the flag flips.
    pub fn has_passed(&mut self, bird_x: f32) -> bool {
        if self.passed {
            return false;
        }
        if bird_x >= self.trailing_edge() - self.pass_margin {
            self.passed = true;
            return true;
        }
        false
    }

    /// Fully scrolled past the left edge of the screen
    pub fn is_off_screen(&self) -> bool {
        self.trailing_edge() < 0.0
    }

    pub fn collides_with(
        &self,
        bird: &Bird,
        physics: &PhysicsConfig,
        collision: &CollisionConfig,
    ) -> bool {
        crate::collision::collides(bird, self, physics, collision)
    }
}
