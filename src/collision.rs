//! Bird/pipe overlap tests
//!
//! Two policies are supported:
//! - **Forgiving**: only the bird's center point is tested, against a gap
//!   shrunk by a vertical margin, and only while the center is within the
//!   pipe's footprint widened by lead/trail margins.
//! - **Strict**: the whole sprite rectangle (top edge rounded to a pixel row)
//!   must stay clear of both pipe bodies. With opaque sprites this is the
//!   same answer a pixel-mask overlap gives.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{CollisionConfig, CollisionPolicy, PhysicsConfig};
use crate::entity::{Bird, Pipe};

/// Axis-aligned rectangle, half-open on its max edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_size(min: Vec2, size: Vec2) -> Self {
        Self::new(min, min + size)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Sprite rectangle of a bird, snapped to a whole pixel row
pub fn bird_rect(bird: &Bird, physics: &PhysicsConfig) -> Rect {
    Rect::from_size(
        Vec2::new(bird.x, bird.y.round()),
        Vec2::new(physics.sprite_width, physics.sprite_height),
    )
}

/// Body of the top pipe, extending upward without limit
pub fn top_pipe_rect(pipe: &Pipe) -> Rect {
    Rect::new(
        Vec2::new(pipe.x, f32::NEG_INFINITY),
        Vec2::new(pipe.trailing_edge(), pipe.gap_top),
    )
}

/// Body of the bottom pipe, extending downward without limit
pub fn bottom_pipe_rect(pipe: &Pipe) -> Rect {
    Rect::new(
        Vec2::new(pipe.x, pipe.gap_bottom()),
        Vec2::new(pipe.trailing_edge(), f32::INFINITY),
    )
}

/// Dispatch on the configured policy
pub fn collides(
    bird: &Bird,
    pipe: &Pipe,
    physics: &PhysicsConfig,
    collision: &CollisionConfig,
) -> bool {
    match collision.policy {
        CollisionPolicy::Forgiving => collides_forgiving(bird, pipe, physics, collision),
        CollisionPolicy::Strict => collides_strict(bird, pipe, physics),
    }
}

pub fn collides_forgiving(
    bird: &Bird,
    pipe: &Pipe,
    physics: &PhysicsConfig,
    collision: &CollisionConfig,
) -> bool {
    let center = bird.center(physics);

    let in_footprint = center.x > pipe.x - collision.lead_margin
        && center.x < pipe.trailing_edge() + collision.trail_margin;
    if !in_footprint {
        return false;
    }

    center.y < pipe.gap_top + collision.vertical_margin
        || center.y > pipe.gap_bottom() - collision.vertical_margin
}

pub fn collides_strict(bird: &Bird, pipe: &Pipe, physics: &PhysicsConfig) -> bool {
    let rect = bird_rect(bird, physics);
    rect.overlaps(&top_pipe_rect(pipe)) || rect.overlaps(&bottom_pipe_rect(pipe))
}
