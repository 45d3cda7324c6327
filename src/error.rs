//! Error types for the simulator.
//!
//! [`ConfigError`] rejects a run before any stepping happens. [`DomainError`] is
//! raised by the physics while a run is in progress; the integrator turns it
//! into early termination.

use thiserror::Error;

/// Invalid simulation setup, detected eagerly before integration starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("mass of body {body} must be positive and finite, got {mass}")]
    NonPositiveMass { body: usize, mass: f64 },

    #[error("initial state component {index} is not finite ({value})")]
    NonFiniteInitialState { index: usize, value: f64 },

    #[error("time span must satisfy t_start < t_end with finite bounds, got ({t_start}, {t_end})")]
    InvalidTimeSpan { t_start: f64, t_end: f64 },

    #[error("evaluation times are empty")]
    EmptyEvaluationTimes,

    #[error("evaluation times must be strictly increasing (index {index}: {previous} then {next})")]
    NonIncreasingEvaluationTimes { index: usize, previous: f64, next: f64 },

    #[error("evaluation time {time} lies outside the span ({t_start}, {t_end})")]
    EvaluationTimeOutOfSpan { time: f64, t_start: f64, t_end: f64 },

    #[error("sample count must be at least 1")]
    ZeroSamples,

    #[error("invalid solver parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("playback speed must be at least 1 frame per second")]
    ZeroPlaybackSpeed,

    #[error("a scenario needs exactly 3 bodies, got {0}")]
    WrongBodyCount(usize),
}

/// Failure of the equations of motion at a particular state.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DomainError {
    #[error("bodies {first} and {second} collided (separation {distance:e})")]
    CollisionSingularity {
        first: usize,
        second: usize,
        distance: f64,
    },
}
