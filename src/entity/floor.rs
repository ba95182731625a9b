use serde::{Deserialize, Serialize};

/// Two floor tiles leapfrogging each other to scroll seamlessly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub y: f32,
    pub x1: f32,
    pub x2: f32,
    pub tile_width: f32,
    pub speed: f32,
}

impl Floor {
    pub fn new(y: f32, tile_width: f32, speed: f32) -> Self {
        Self {
            y,
            x1: 0.0,
            x2: tile_width,
            tile_width,
            speed,
        }
    }

    /// Scroll both tiles, wrapping whichever left the screen behind the other
    pub fn advance_tick(&mut self) {
        self.x1 -= self.speed;
        self.x2 -= self.speed;

        if self.x1 + self.tile_width < 0.0 {
            self.x1 = self.x2 + self.tile_width;
        }
        if self.x2 + self.tile_width < 0.0 {
            self.x2 = self.x1 + self.tile_width;
        }
    }
}
