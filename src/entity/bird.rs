//! Bird kinematics
//!
//! A bird only moves vertically. Its displacement each tick is a quadratic in
//! the number of ticks since the last jump, so a jump replaces the whole
//! trajectory rather than adding an impulse to it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;

/// Physics state of one bird
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bird {
    /// Horizontal position, fixed for the whole episode
    pub x: f32,
    /// Vertical position of the sprite's top edge (down is positive)
    pub y: f32,
    /// Initial velocity of the current trajectory (0 until the first jump)
    pub velocity: f32,
    /// Ticks elapsed since the last jump (or since spawn)
    pub ticks_since_jump: u32,
}

impl Bird {
    /// Create a bird at rest at the given position
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            velocity: 0.0,
            ticks_since_jump: 0,
        }
    }

    /// Create a bird at the configured spawn point
    pub fn spawn(physics: &PhysicsConfig) -> Self {
        Self::new(physics.spawn_x, physics.spawn_y)
    }

    /// Start a new upward trajectory
    pub fn jump(&mut self, physics: &PhysicsConfig) {
        self.velocity = physics.jump_velocity;
        self.ticks_since_jump = 0;
    }

    /// Displacement the next tick would apply, without mutating the bird
    pub fn next_displacement(&self, physics: &PhysicsConfig) -> f32 {
        let t = (self.ticks_since_jump + 1) as f32;
        let mut displacement = self.velocity * t + 0.5 * physics.gravity * t * t;

        if displacement >= physics.max_fall_per_tick {
            displacement = physics.max_fall_per_tick;
        }

        if displacement < 0.0 {
            displacement -= physics.upward_bias;
        }

        displacement
    }

    /// Advance one tick and return the displacement that was applied
    pub fn advance_tick(&mut self, physics: &PhysicsConfig) -> f32 {
        let displacement = self.next_displacement(physics);
        self.ticks_since_jump += 1;
        self.y += displacement;
        displacement
    }

    /// Center of the bird's sprite
    pub fn center(&self, physics: &PhysicsConfig) -> Vec2 {
        Vec2::new(
            self.x + physics.sprite_width / 2.0,
            self.y + physics.sprite_height / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physics() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    #[test]
    fn test_spawn_at_rest() {
        let bird = Bird::spawn(&physics());
        assert_eq!(bird.x, 67.0);
        assert_eq!(bird.y, 300.0);
        assert_eq!(bird.velocity, 0.0);
        assert_eq!(bird.ticks_since_jump, 0);
    }

    #[test]
    fn test_jump_resets_trajectory() {
        let physics = physics();
        let mut bird = Bird::spawn(&physics);
        for _ in 0..37 {
            bird.advance_tick(&physics);
        }
        assert_eq!(bird.ticks_since_jump, 37);

        bird.jump(&physics);
        assert_eq!(bird.velocity, -10.5);
        assert_eq!(bird.ticks_since_jump, 0);

        // Jumping twice in a row is the same as jumping once
        let snapshot = bird.clone();
        bird.jump(&physics);
        assert_eq!(bird, snapshot);
    }

    #[test]
    fn test_advance_is_repeatable() {
        let physics = physics();
        let mut a = Bird::new(67.0, 123.25);
        a.velocity = -10.5;
        a.ticks_since_jump = 17;
        let mut b = a.clone();

        for _ in 0..200 {
            a.advance_tick(&physics);
            b.advance_tick(&physics);
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn test_free_fall_displacements() {
        let physics = physics();
        let mut bird = Bird::spawn(&physics);

        let first = bird.advance_tick(&physics);
        assert!((first - 0.085).abs() < 1e-6);

        for _ in 1..13 {
            bird.advance_tick(&physics);
        }
        // 0.085 * (1^2 + ... + 13^2) = 0.085 * 819
        assert!((bird.y - (300.0 + 69.615)).abs() < 1e-3);

        // Tick 14 would be 16.66, clamped to the fall limit
        assert_eq!(bird.advance_tick(&physics), 16.0);
        assert_eq!(bird.advance_tick(&physics), 16.0);
    }

    #[test]
    fn test_upward_bias_only_when_rising() {
        let physics = physics();
        let mut bird = Bird::spawn(&physics);
        bird.jump(&physics);

        // -10.5 + 0.085 - 2
        let d = bird.advance_tick(&physics);
        assert!((d - (-12.415)).abs() < 1e-4);

        let mut falling = Bird::spawn(&physics);
        assert!(falling.advance_tick(&physics) > 0.0);
    }

    #[test]
    fn test_jump_trajectory_peaks() {
        let physics = physics();
        let mut bird = Bird::spawn(&physics);
        bird.jump(&physics);

        let mut displacements = Vec::new();
        let mut peak_tick = 0;
        let mut peak_y = bird.y;
        for tick in 1..=200u32 {
            let d = bird.advance_tick(&physics);
            displacements.push(d);
            if bird.y < peak_y {
                peak_y = bird.y;
                peak_tick = tick;
            }
        }

        // Rising while -10.5 t + 0.085 t^2 < 0, i.e. up to t = 123
        assert_eq!(peak_tick, 123);
        assert!(displacements[..123].iter().all(|&d| d < 0.0));
        assert!(displacements[123..].iter().all(|&d| d > 0.0));

        // Rise slows over the second half of the ascent...
        for t in 62..122 {
            assert!(displacements[t + 1] > displacements[t]);
        }
        // ...then the fall speeds up until the clamp
        assert!(displacements[124] > displacements[123]);
        assert_eq!(*displacements.last().unwrap(), 16.0);

        let expected_peak: f64 = (1..=123)
            .map(|t| {
                let t = t as f64;
                -10.5 * t + 0.085 * t * t - 2.0
            })
            .sum::<f64>()
            + 300.0;
        assert!((peak_y as f64 - expected_peak).abs() < 1.0);
    }

    #[test]
    fn test_center_uses_sprite_size() {
        let physics = physics();
        let bird = Bird::new(67.0, 300.0);
        assert_eq!(bird.center(&physics), Vec2::new(84.0, 312.0));
    }
}
