//! Controller boundary
//!
//! The simulation hands every surviving bird an [`Observation`] each tick and
//! asks its controller for an [`Action`]. Anything implementing [`Controller`]
//! can fly a bird: an evolved network, a closure, or a scripted policy.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ControlConfig;
use crate::entity::{Bird, Pipe};

/// Why a controller could not produce an action
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    #[error("controller failed: {0}")]
    Failed(String),

    #[error("controller produced a non-finite action ({0})")]
    NonFinite(f32),
}

/// Normalized view of a bird relative to the lead pipe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Signed offset of the bird below (+) or above (-) the gap center
    pub gap_offset: f32,
    /// Horizontal distance to the lead pipe, zero once it is reached
    pub pipe_distance: f32,
    /// Bird velocity
    pub velocity: f32,
}

impl Observation {
    pub const LEN: usize = 3;

    pub fn new(bird: &Bird, lead_pipe: &Pipe, control: &ControlConfig) -> Self {
        Self {
            gap_offset: (bird.y - lead_pipe.gap_center()) / control.vertical_scale,
            pipe_distance: (lead_pipe.x - bird.x).max(0.0) / control.horizontal_scale,
            velocity: bird.velocity / control.velocity_scale,
        }
    }

    pub fn to_array(&self) -> [f32; Self::LEN] {
        [self.gap_offset, self.pipe_distance, self.velocity]
    }
}

/// Jump intent, nominally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Action(pub f32);

impl Action {
    pub const JUMP: Action = Action(1.0);
    pub const IDLE: Action = Action(0.0);

    /// Strictly above the threshold means jump
    pub fn is_jump(self, threshold: f32) -> bool {
        self.0 > threshold
    }
}

/// Anything that maps observations to actions
pub trait Controller {
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError>;
}

impl<C: Controller + ?Sized> Controller for &mut C {
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError> {
        (**self).decide(observation)
    }
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError> {
        (**self).decide(observation)
    }
}

/// Adapts a closure into a controller
pub struct FnController<F>(pub F);

impl<F> Controller for FnController<F>
where
    F: FnMut(&Observation) -> Result<Action, ControllerError>,
{
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError> {
        (self.0)(observation)
    }
}

/// Constant output, useful as a baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantController(pub Action);

impl Controller for ConstantController {
    fn decide(&mut self, _observation: &Observation) -> Result<Action, ControllerError> {
        Ok(self.0)
    }
}

/// Jumps whenever the bird is further below the gap center than `trigger`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapFollower {
    /// In normalized gap-offset units
    pub trigger: f32,
}

impl Default for GapFollower {
    fn default() -> Self {
        Self { trigger: 0.5 }
    }
}

impl Controller for GapFollower {
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError> {
        if observation.gap_offset > self.trigger {
            Ok(Action::JUMP)
        } else {
            Ok(Action::IDLE)
        }
    }
}

/// Fixed-topology network: 3 inputs -> hidden (tanh) -> 1 output (sigmoid)
///
/// Weights are laid out as input->hidden, hidden biases, hidden->output,
/// output bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardController {
    weights: Vec<f32>,
    hidden_dim: usize,
}

impl FeedForwardController {
    /// Number of weights needed for a given hidden layer size
    pub fn weight_count(hidden_dim: usize) -> usize {
        Observation::LEN * hidden_dim + hidden_dim + hidden_dim + 1
    }

    /// Build from a flat weight vector, padding or truncating to fit
    pub fn from_weights(mut weights: Vec<f32>, hidden_dim: usize) -> Self {
        weights.resize(Self::weight_count(hidden_dim), 0.0);
        Self {
            weights,
            hidden_dim,
        }
    }

    /// Uniform random weights in [-1, 1)
    pub fn random<R: Rng>(hidden_dim: usize, rng: &mut R) -> Self {
        let weights = (0..Self::weight_count(hidden_dim))
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        Self {
            weights,
            hidden_dim,
        }
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Forward pass, output in (0, 1)
    pub fn forward(&self, input: &[f32; Observation::LEN]) -> f32 {
        let n_in = Observation::LEN;
        let h = self.hidden_dim;
        let (input_weights, rest) = self.weights.split_at(n_in * h);
        let (hidden_bias, rest) = rest.split_at(h);
        let (output_weights, output_bias) = rest.split_at(h);

        let mut sum = output_bias[0];
        for j in 0..h {
            let mut activation = hidden_bias[j];
            for (i, x) in input.iter().enumerate() {
                activation += x * input_weights[j * n_in + i];
            }
            sum += activation.tanh() * output_weights[j];
        }

        1.0 / (1.0 + (-sum).exp())
    }
}

impl Controller for FeedForwardController {
    fn decide(&mut self, observation: &Observation) -> Result<Action, ControllerError> {
        let expected = Self::weight_count(self.hidden_dim);
        if self.weights.len() != expected {
            return Err(ControllerError::Failed(format!(
                "network has {} weights, expected {}",
                self.weights.len(),
                expected
            )));
        }
        Ok(Action(self.forward(&observation.to_array())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipeConfig, SimConfig};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_observation_normalization() {
        let config = SimConfig::default();
        let mut bird = Bird::new(67.0, 350.0);
        bird.jump(&config.physics);
        let pipe = Pipe::new(467.0, 100.0, &PipeConfig::default());

        let obs = Observation::new(&bird, &pipe, &config.control);
        // Gap center 200, bird 150 below it
        assert!((obs.gap_offset - 1.5).abs() < 1e-6);
        assert!((obs.pipe_distance - 1.0).abs() < 1e-6);
        assert!((obs.velocity - -1.05).abs() < 1e-6);
    }

    #[test]
    fn test_observation_distance_clamps_at_zero() {
        let config = SimConfig::default();
        let bird = Bird::new(67.0, 300.0);
        let pipe = Pipe::new(40.0, 100.0, &PipeConfig::default());
        let obs = Observation::new(&bird, &pipe, &config.control);
        assert_eq!(obs.pipe_distance, 0.0);
    }

    #[test]
    fn test_action_threshold_is_strict() {
        assert!(!Action(0.3).is_jump(0.3));
        assert!(Action(0.31).is_jump(0.3));
        assert!(!Action(0.5).is_jump(0.5));
        assert!(!Action(f32::NAN).is_jump(0.5));
    }

    #[test]
    fn test_gap_follower() {
        let mut follower = GapFollower::default();
        let below = Observation {
            gap_offset: 0.8,
            pipe_distance: 0.5,
            velocity: 0.0,
        };
        let above = Observation {
            gap_offset: -0.2,
            ..below
        };
        assert_eq!(follower.decide(&below), Ok(Action::JUMP));
        assert_eq!(follower.decide(&above), Ok(Action::IDLE));
    }

    #[test]
    fn test_fn_controller_and_boxing() {
        let mut calls = 0;
        {
            let mut controller = FnController(|_: &Observation| {
                calls += 1;
                Ok::<_, ControllerError>(Action(0.7))
            });
            let obs = Observation {
                gap_offset: 0.0,
                pipe_distance: 0.0,
                velocity: 0.0,
            };
            assert_eq!(controller.decide(&obs), Ok(Action(0.7)));
            let by_ref: &mut dyn Controller = &mut controller;
            assert_eq!(by_ref.decide(&obs), Ok(Action(0.7)));
        }
        assert_eq!(calls, 2);

        let mut boxed: Box<dyn Controller> = Box::new(ConstantController(Action::JUMP));
        let obs = Observation {
            gap_offset: 0.0,
            pipe_distance: 0.0,
            velocity: 0.0,
        };
        assert_eq!(boxed.decide(&obs), Ok(Action::JUMP));
    }

    #[test]
    fn test_feed_forward_zero_weights_outputs_half() {
        let net = FeedForwardController::from_weights(Vec::new(), 4);
        assert_eq!(net.weights().len(), FeedForwardController::weight_count(4));
        assert_eq!(net.forward(&[1.0, -2.0, 3.0]), 0.5);
    }

    #[test]
    fn test_feed_forward_output_bias() {
        let mut weights = vec![0.0; FeedForwardController::weight_count(2)];
        *weights.last_mut().unwrap() = 10.0;
        let net = FeedForwardController::from_weights(weights, 2);
        assert!(net.forward(&[0.0, 0.0, 0.0]) > 0.99);
    }

    #[test]
    fn test_feed_forward_random_is_bounded() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut net = FeedForwardController::random(6, &mut rng);
        assert!(net.weights().iter().all(|w| (-1.0..1.0).contains(w)));

        let obs = Observation {
            gap_offset: 2.0,
            pipe_distance: 0.3,
            velocity: -1.0,
        };
        let Action(out) = net.decide(&obs).unwrap();
        assert!(out > 0.0 && out < 1.0);
    }

    #[test]
    fn test_feed_forward_wrong_layout_is_an_error() {
        let mut net = FeedForwardController {
            weights: vec![0.1; 3],
            hidden_dim: 6,
        };
        let obs = Observation {
            gap_offset: 0.0,
            pipe_distance: 0.0,
            velocity: 0.0,
        };
        assert!(matches!(net.decide(&obs), Err(ControllerError::Failed(_))));
    }
}
