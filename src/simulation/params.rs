//! Numerical parameters and time sampling for a simulation run
//!
//! - `Parameters` holds the solver settings (tolerances, step bounds, collision threshold)
//! - `TimeSpan` is the integration interval
//! - `EvaluationTimes` is the strictly increasing list of times reported in the trajectory
//!
//! Everything here is validated eagerly so the integrator never starts on a bad setup.

use crate::error::ConfigError;
use crate::simulation::forces::DEFAULT_COLLISION_EPS;

pub const DEFAULT_RTOL: f64 = 1.0e-9;
pub const DEFAULT_ATOL: f64 = 1.0e-12;
pub const DEFAULT_MAX_STEPS: usize = 5_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub h0: Option<f64>, // initial step size, automatic when None
    pub h_min: f64, // lower bound on the step size (on top of the round-off floor)
    pub h_max: f64, // upper bound on the step size
    pub atol: f64, // absolute error tolerance
    pub rtol: f64, // relative error tolerance
    pub max_steps: usize, // step attempts before giving up
    pub collision_eps: f64, // separation treated as a collision
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            h0: None,
            h_min: 0.0,
            h_max: f64::INFINITY,
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
            max_steps: DEFAULT_MAX_STEPS,
            collision_eps: DEFAULT_COLLISION_EPS,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &'static str, value: f64| {
            if value > 0.0 && !value.is_nan() {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter { name, value })
            }
        };

        positive("rtol", self.rtol)?;
        // error scale divides by atol where a component is zero
        positive("atol", self.atol)?;
        positive("h_max", self.h_max)?;
        if !(self.h_min >= 0.0 && self.h_min < self.h_max) {
            return Err(ConfigError::InvalidParameter { name: "h_min", value: self.h_min });
        }
        if !(self.collision_eps >= 0.0 && self.collision_eps.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "collision_eps",
                value: self.collision_eps,
            });
        }
        if let Some(h0) = self.h0 {
            if !(h0 > 0.0 && h0.is_finite()) {
                return Err(ConfigError::InvalidParameter { name: "h0", value: h0 });
            }
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidParameter { name: "max_steps", value: 0.0 });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub t_start: f64,
    pub t_end: f64,
}

impl TimeSpan {
    pub fn new(t_start: f64, t_end: f64) -> Result<Self, ConfigError> {
        if t_start.is_finite() && t_end.is_finite() && t_start < t_end {
            Ok(Self { t_start, t_end })
        } else {
            Err(ConfigError::InvalidTimeSpan { t_start, t_end })
        }
    }

    pub fn length(&self) -> f64 {
        self.t_end - self.t_start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_start && t <= self.t_end
    }
}

/// Strictly increasing, non-empty sample times
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationTimes(Vec<f64>);

impl EvaluationTimes {
    pub fn new(times: Vec<f64>) -> Result<Self, ConfigError> {
        if times.is_empty() {
            return Err(ConfigError::EmptyEvaluationTimes);
        }
        for (index, pair) in times.windows(2).enumerate() {
            // also rejects NaN
            if !(pair[1] > pair[0]) {
                return Err(ConfigError::NonIncreasingEvaluationTimes {
                    index: index + 1,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self(times))
    }

    /// `count` equally spaced times from `start` to `end`, both included
    pub fn uniform(start: f64, end: f64, count: usize) -> Result<Self, ConfigError> {
        match count {
            0 => Err(ConfigError::ZeroSamples),
            1 => Self::new(vec![start]),
            _ => {
                let step = (end - start) / (count - 1) as f64;
                let mut times: Vec<f64> = (0..count).map(|k| start + k as f64 * step).collect();
                // pin the endpoint against round-off
                times[count - 1] = end;
                Self::new(times)
            }
        }
    }

    /// Fail unless every time lies inside `span`
    pub fn check_within(&self, span: &TimeSpan) -> Result<(), ConfigError> {
        match self.0.iter().find(|t| !span.contains(**t)) {
            Some(&time) => Err(ConfigError::EvaluationTimeOutOfSpan {
                time,
                t_start: span.t_start,
                t_end: span.t_end,
            }),
            None => Ok(()),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
