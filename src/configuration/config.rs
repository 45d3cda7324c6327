//! Configuration types for loading three-body scenarios from YAML.
//!
//! A thin, `serde`-deserializable representation of a run:
//!
//! - [`ParametersConfig`] – time sampling and solver settings
//! - [`PlaybackConfig`]   – playback speed
//! - [`BodyConfig`]       – initial state for each body
//! - [`ScenarioConfig`]   – top-level wrapper
//!
//! # YAML format
//!
//! ```yaml
//! parameters:
//!   t_start: 0.0            # optional, defaults to 0
//!   t_end: 100.0            # end of the integration span
//!   samples: 10000          # uniformly spaced evaluation times, endpoints included
//!   rtol: 1.0e-9            # optional relative error tolerance
//!   atol: 1.0e-12           # optional absolute error tolerance
//!   h0: 0.001               # optional initial step, automatic when omitted
//!   h_min: 0.0              # optional minimum step
//!   max_steps: 5000000      # optional step budget
//!   collision_eps: 1.0e-9   # optional collision distance
//!
//! playback:
//!   speed: 100              # frames per second
//!
//! bodies:                   # exactly three
//!   - x: [ -1.0, 0.0 ]
//!     v: [  0.0, 1.0 ]
//!     m: 1.0
//!   - x: [  1.0, 0.0 ]
//!     v: [  0.0, -1.0 ]
//!     m: 1.0
//!   - x: [  0.0, 1.0 ]
//!     v: [  1.0, 0.0 ]
//!     m: 1.0
//! ```
//!
//! [`Scenario::build_scenario`](crate::Scenario::build_scenario) validates this
//! and maps it into the immutable runtime scenario.

use serde::{Deserialize, Serialize};

use crate::simulation::forces::DEFAULT_COLLISION_EPS;
use crate::simulation::params::{DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_RTOL};
use crate::simulation::playback::DEFAULT_SPEED;

fn default_rtol() -> f64 {
    DEFAULT_RTOL
}

fn default_atol() -> f64 {
    DEFAULT_ATOL
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_collision_eps() -> f64 {
    DEFAULT_COLLISION_EPS
}

fn default_speed() -> u32 {
    DEFAULT_SPEED
}

/// Time sampling and numerical parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParametersConfig {
    #[serde(default)]
    pub t_start: f64, // start of the span
    pub t_end: f64, // end of the span
    pub samples: usize, // number of evaluation times
    #[serde(default = "default_rtol")]
    pub rtol: f64, // relative error tolerance
    #[serde(default = "default_atol")]
    pub atol: f64, // absolute error tolerance
    #[serde(default)]
    pub h0: Option<f64>, // initial step size
    #[serde(default)]
    pub h_min: f64, // minimum step size
    #[serde(default = "default_max_steps")]
    pub max_steps: usize, // step attempts before stopping
    #[serde(default = "default_collision_eps")]
    pub collision_eps: f64, // separation treated as a collision
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    #[serde(default = "default_speed")]
    pub speed: u32, // frames per second
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
        }
    }
}

/// Initial state of one body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub x: [f64; 2], // initial position
    pub v: [f64; 2], // initial velocity
    pub m: f64, // mass
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    pub bodies: Vec<BodyConfig>, // checked to hold exactly three bodies
}
