//! Build fully-validated simulation scenarios
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a `Scenario`: the
//! immutable bundle of masses, initial state, time sampling, solver
//! parameters and playback speed that one run needs. Presets cover the
//! reference configuration and two classic periodic orbits.

use log::info;

use crate::configuration::config::ScenarioConfig;
use crate::error::ConfigError;
use crate::simulation::integrator::{integrate, validate_masses, validate_state};
use crate::simulation::params::{EvaluationTimes, Parameters, TimeSpan};
use crate::simulation::playback::DEFAULT_SPEED;
use crate::simulation::states::{pack, Body, Masses, NState, BODY_COUNT};
use crate::simulation::trajectory::Trajectory;

/// Everything one integration run needs; passed by value, never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub masses: Masses,
    pub initial_state: NState,
    pub span: TimeSpan,
    pub evaluation_times: EvaluationTimes,
    pub parameters: Parameters,
    pub speed: u32, // playback frames per second
}

impl Scenario {
    /// Assemble a scenario from bodies and a uniform sampling grid over `(t_start, t_end)`
    pub fn from_bodies(
        bodies: [Body; BODY_COUNT],
        t_start: f64,
        t_end: f64,
        samples: usize,
        parameters: Parameters,
    ) -> Result<Self, ConfigError> {
        let (initial_state, masses) = pack(&bodies);
        let span = TimeSpan::new(t_start, t_end)?;
        let evaluation_times = EvaluationTimes::uniform(t_start, t_end, samples)?;

        let scenario = Self {
            masses,
            initial_state,
            span,
            evaluation_times,
            parameters,
            speed: DEFAULT_SPEED,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, ConfigError> {
        // Bodies: exactly three, mapped onto nalgebra vectors
        let bodies: [Body; BODY_COUNT] = cfg
            .bodies
            .iter()
            .map(|bc| Body::new(bc.x, bc.v, bc.m))
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|v: Vec<Body>| ConfigError::WrongBodyCount(v.len()))?;

        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            h0: p_cfg.h0,
            h_min: p_cfg.h_min,
            atol: p_cfg.atol,
            rtol: p_cfg.rtol,
            max_steps: p_cfg.max_steps,
            collision_eps: p_cfg.collision_eps,
            ..Parameters::default()
        };

        let mut scenario = Self::from_bodies(bodies, p_cfg.t_start, p_cfg.t_end, p_cfg.samples, parameters)?;
        scenario.speed = cfg.playback.speed;
        scenario.validate()?;

        info!(
            "scenario: masses {:?}, span ({}, {}), {} samples",
            scenario.masses.as_slice(),
            scenario.span.t_start,
            scenario.span.t_end,
            scenario.evaluation_times.len(),
        );
        Ok(scenario)
    }

    /// Reject anything the integrator would refuse, plus a zero playback speed
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_masses(&self.masses)?;
        validate_state(&self.initial_state)?;
        self.evaluation_times.check_within(&self.span)?;
        self.parameters.validate()?;
        if self.speed == 0 {
            return Err(ConfigError::ZeroPlaybackSpeed);
        }
        Ok(())
    }

    /// Integrate the scenario
    pub fn run(&self) -> Result<Trajectory, ConfigError> {
        integrate(
            &self.masses,
            &self.initial_state,
            self.span,
            &self.evaluation_times,
            &self.parameters,
        )
    }

    /// Unit masses at (-1, 0), (1, 0), (0, 1) over (0, 100) with 10,000 samples
    pub fn reference() -> Result<Self, ConfigError> {
        let bodies = [
            Body::new([-1.0, 0.0], [0.0, 1.0], 1.0),
            Body::new([1.0, 0.0], [0.0, -1.0], 1.0),
            Body::new([0.0, 1.0], [1.0, 0.0], 1.0),
        ];
        Self::from_bodies(bodies, 0.0, 100.0, 10_000, Parameters::default())
    }

    /// Equal unit masses on an equilateral triangle of circumradius `radius`,
    /// moving on the circumscribed circle (rigid rotation)
    pub fn lagrange_triangle(radius: f64, samples: usize, t_end: f64) -> Result<Self, ConfigError> {
        // centripetal balance: v^2 / R = 1 / (sqrt(3) R^2)
        let speed = (1.0 / (3.0_f64.sqrt() * radius)).sqrt();
        let bodies = std::array::from_fn(|k| {
            let angle = std::f64::consts::FRAC_PI_2 + k as f64 * 2.0 * std::f64::consts::FRAC_PI_3;
            let (s, c) = angle.sin_cos();
            Body::new([radius * c, radius * s], [-speed * s, speed * c], 1.0)
        });
        Self::from_bodies(bodies, 0.0, t_end, samples, Parameters::default())
    }

    /// Chenciner–Montgomery figure-eight choreography with unit masses
    pub fn figure_eight(samples: usize, t_end: f64) -> Result<Self, ConfigError> {
        let x1 = [0.97000436, -0.24308753];
        let v3 = [-0.93240737, -0.86473146];
        let v1 = [-0.5 * v3[0], -0.5 * v3[1]];
        let bodies = [
            Body::new(x1, v1, 1.0),
            Body::new([-x1[0], -x1[1]], v1, 1.0),
            Body::new([0.0, 0.0], v3, 1.0),
        ];
        Self::from_bodies(bodies, 0.0, t_end, samples, Parameters::default())
    }
}

/// Period of the figure-eight orbit in [`Scenario::figure_eight`]
pub const FIGURE_EIGHT_PERIOD: f64 = 6.32591398;

