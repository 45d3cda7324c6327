//! Adaptive time integrator for the three-body system
//!
//! Explicit Dormand–Prince 5(4) with first-same-as-last stages, local error
//! control and the 4th-order continuous extension for dense output. The
//! solver's internal steps are independent of the requested evaluation times:
//! every requested time is reported from the interpolant of the step covering it.
//!
//! The run never panics or hangs on a bad trajectory. A collision, a step size
//! that underflows, or an exhausted step budget ends the run early and the
//! trajectory holds the prefix that was reliably reached.

use log::{debug, info, warn};

use super::forces::{Derivative, NewtonianGravity};
use super::params::{EvaluationTimes, Parameters, TimeSpan};
use super::states::{Masses, NState, BODY_COUNT, STATE_LEN};
use super::trajectory::{SolverStats, Termination, Trajectory};
use crate::error::{ConfigError, DomainError};

const STAGES: usize = 6;

// Dormand–Prince tableau
const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
];

pub(crate) const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

// Difference between the 5th and embedded 4th order weights (7th entry is the FSAL stage)
const E: [f64; STAGES + 1] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

// Continuous extension: y(t + x h) = y + h * sum_j k_j * (P[j][0] x + P[j][1] x^2 + P[j][2] x^3 + P[j][3] x^4)
pub(crate) const P: [[f64; 4]; STAGES + 1] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const ERROR_EXPONENT: f64 = -1.0 / 5.0; // -1 / (embedded order + 1)

/// Steps shorter than this many ulps of `t` cannot move time forward reliably
const ROUNDOFF_ULPS: f64 = 10.0;

/// One attempted step
struct Step {
    h: f64,
    y_new: NState,
    f_new: NState,
    k: [NState; STAGES + 1],
    error_norm: f64,
}

impl Step {
    /// Evaluate the step's continuous extension at `t`, with `t_old <= t <= t_old + h`
    fn dense(&self, t_old: f64, y_old: &NState, t: f64) -> NState {
        let x = (t - t_old) / self.h;
        let powers = [x, x * x, x * x * x, x * x * x * x];

        let mut acc = NState::zeros();
        for (kj, p) in self.k.iter().zip(P.iter()) {
            let w: f64 = p.iter().zip(powers.iter()).map(|(c, xp)| c * xp).sum();
            acc.axpy(w, kj, 1.0);
        }
        y_old + acc * self.h
    }
}

/// Root-mean-square of `v / scale`
fn rms_norm(v: &NState, scale: &NState) -> f64 {
    (v.component_div(scale).norm_squared() / STATE_LEN as f64).sqrt()
}

struct Dopri5<'a, F: Derivative> {
    system: &'a F,
    params: &'a Parameters,
    stats: SolverStats,
}

impl<'a, F: Derivative> Dopri5<'a, F> {
    fn eval(&mut self, t: f64, y: &NState) -> Result<NState, DomainError> {
        self.stats.evaluations += 1;
        self.system.derivative(t, y)
    }

    /// Starting step size: the configured `h0`, otherwise Hairer's estimate
    fn initial_step(&mut self, t0: f64, y0: &NState, f0: &NState, span: f64) -> Result<f64, DomainError> {
        let p = self.params;
        if let Some(h0) = p.h0 {
            return Ok(h0.min(span).min(p.h_max));
        }

        let scale = (y0.abs() * p.rtol).add_scalar(p.atol);
        let d0 = rms_norm(y0, &scale);
        let d1 = rms_norm(f0, &scale);

        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        // probe a forward-Euler step to estimate the second derivative
        let y1 = y0 + f0 * h0;
        let f1 = self.eval(t0 + h0, &y1)?;
        let d2 = rms_norm(&(f1 - f0), &scale) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(-ERROR_EXPONENT)
        };

        Ok((100.0 * h0).min(h1).min(span).min(p.h_max))
    }

    /// Attempt one step of size `h` from `(t, y)` with `f = y'(t)`
    fn step(&mut self, t: f64, y: &NState, f: &NState, h: f64) -> Result<Step, DomainError> {
        let mut k = [NState::zeros(); STAGES + 1];
        k[0] = *f;

        for s in 1..STAGES {
            let mut dy = NState::zeros();
            for (a, kj) in A[s][..s].iter().zip(k.iter()) {
                dy.axpy(*a, kj, 1.0);
            }
            k[s] = self.eval(t + C[s] * h, &(y + dy * h))?;
        }

        let mut dy = NState::zeros();
        for (b, kj) in B.iter().zip(k.iter()) {
            dy.axpy(*b, kj, 1.0);
        }
        let y_new = y + dy * h;
        let f_new = self.eval(t + h, &y_new)?;
        k[STAGES] = f_new;

        let mut err = NState::zeros();
        for (e, kj) in E.iter().zip(k.iter()) {
            err.axpy(*e, kj, 1.0);
        }
        err *= h;

        let scale = (y.abs().sup(&y_new.abs()) * self.params.rtol).add_scalar(self.params.atol);
        let finite = y_new.iter().chain(f_new.iter()).all(|v| v.is_finite());
        let error_norm = if finite { rms_norm(&err, &scale) } else { f64::INFINITY };

        Ok(Step {
            h,
            y_new,
            f_new,
            k,
            error_norm,
        })
    }
}

fn collided(t: f64, err: DomainError) -> Termination {
    match err {
        DomainError::CollisionSingularity {
            first,
            second,
            distance,
        } => Termination::CollisionSingularity {
            t,
            first,
            second,
            distance,
        },
    }
}

/// Integrate `system` from `y0` over `span`, reporting the state at every evaluation time
///
/// Inputs are assumed valid; [`integrate`] is the checked entry point for three-body runs.
pub fn solve_dopri5<F: Derivative>(
    system: &F,
    y0: NState,
    span: TimeSpan,
    evaluation_times: &EvaluationTimes,
    params: &Parameters,
) -> Trajectory {
    let times = evaluation_times.as_slice();
    let mut out_t = Vec::with_capacity(times.len());
    let mut out_y = Vec::with_capacity(times.len());
    let mut next = 0; // index of the first evaluation time not yet reported

    let mut solver = Dopri5 {
        system,
        params,
        stats: SolverStats::default(),
    };

    let mut t = span.t_start;
    let mut y = y0;

    // t_start is reported as the initial state itself
    if times.first() == Some(&t) {
        out_t.push(t);
        out_y.push(y);
        next = 1;
    }

    let termination = 'integrate: {
        if next == times.len() {
            break 'integrate Termination::Completed;
        }

        let mut f = match solver.eval(t, &y) {
            Ok(f) => f,
            Err(e) => break 'integrate collided(t, e),
        };
        let mut h_abs = match solver.initial_step(t, &y, &f, span.length()) {
            Ok(h) => h,
            Err(e) => break 'integrate collided(t, e),
        };
        debug!("dopri5: initial step {h_abs:e}");

        let mut attempts = 0usize;
        while next < times.len() {
            let ulp = f64::EPSILON * t.abs();
            let min_step = params.h_min.max(ROUNDOFF_ULPS * ulp.max(f64::MIN_POSITIVE));
            h_abs = h_abs.min(params.h_max).max(min_step);

            let mut rejected = false;
            let (t_new, step) = loop {
                attempts += 1;
                if attempts > params.max_steps {
                    break 'integrate Termination::StepLimitReached {
                        t,
                        steps: params.max_steps,
                    };
                }

                // never step past the end of the span
                let t_new = (t + h_abs).min(span.t_end);
                let h = t_new - t;

                let step = match solver.step(t, &y, &f, h) {
                    Ok(step) => step,
                    Err(e) => break 'integrate collided(t, e),
                };

                if step.error_norm < 1.0 {
                    let factor = if step.error_norm == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * step.error_norm.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
                    };
                    h_abs = h * if rejected { factor.min(1.0) } else { factor };
                    solver.stats.accepted_steps += 1;
                    break (t_new, step);
                }

                // NaN/inf error norms shrink as hard as allowed
                let factor = if step.error_norm.is_finite() {
                    (SAFETY * step.error_norm.powf(ERROR_EXPONENT)).max(MIN_FACTOR)
                } else {
                    MIN_FACTOR
                };
                h_abs = h * factor;
                rejected = true;
                solver.stats.rejected_steps += 1;

                if h_abs < min_step {
                    break 'integrate Termination::StepSizeUnderflow { t, h: h_abs };
                }
            };

            while next < times.len() && times[next] <= t_new {
                let te = times[next];
                let ye = if te == t_new { step.y_new } else { step.dense(t, &y, te) };
                out_t.push(te);
                out_y.push(ye);
                next += 1;
            }

            t = t_new;
            y = step.y_new;
            f = step.f_new;
        }

        Termination::Completed
    };

    let stats = solver.stats;
    match termination {
        Termination::Completed => info!(
            "dopri5: reached t = {} with {} samples ({} accepted, {} rejected, {} evaluations)",
            out_t.last().copied().unwrap_or(span.t_start),
            out_t.len(),
            stats.accepted_steps,
            stats.rejected_steps,
            stats.evaluations,
        ),
        other => warn!(
            "dopri5: stopped early ({other:?}); {} of {} samples available",
            out_t.len(),
            times.len(),
        ),
    }

    Trajectory::new(out_t, out_y, times.len(), termination, stats)
}

/// Check that all masses are positive and finite
pub fn validate_masses(masses: &Masses) -> Result<(), ConfigError> {
    match masses.iter().enumerate().find(|(_, m)| !(**m > 0.0 && m.is_finite())) {
        Some((body, &mass)) => Err(ConfigError::NonPositiveMass { body, mass }),
        None => Ok(()),
    }
}

/// Check that every component of a state vector is finite
pub fn validate_state(state: &NState) -> Result<(), ConfigError> {
    match state.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(ConfigError::NonFiniteInitialState { index, value }),
        None => Ok(()),
    }
}

/// Compute the three-body trajectory for the given setup
///
/// Configuration problems are rejected before any stepping. Physical failures
/// (collision, stiffness) do not produce an error; they end the trajectory early
/// and are recorded in [`Trajectory::termination`].
pub fn integrate(
    masses: &Masses,
    initial_state: &NState,
    span: TimeSpan,
    evaluation_times: &EvaluationTimes,
    params: &Parameters,
) -> Result<Trajectory, ConfigError> {
    validate_masses(masses)?;
    validate_state(initial_state)?;
    let span = TimeSpan::new(span.t_start, span.t_end)?;
    evaluation_times.check_within(&span)?;
    params.validate()?;

    debug!(
        "integrate: {BODY_COUNT} bodies, span ({}, {}), {} samples, rtol {:e}, atol {:e}",
        span.t_start,
        span.t_end,
        evaluation_times.len(),
        params.rtol,
        params.atol,
    );

    let gravity = NewtonianGravity::new(*masses).with_collision_eps(params.collision_eps);
    Ok(solve_dopri5(&gravity, *initial_state, span, evaluation_times, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_output_ends_on_fifth_order_weights() {
        // at x = 1 the interpolant must reproduce the step result
        for (j, row) in P.iter().enumerate() {
            let at_one: f64 = row.iter().sum();
            let b = B.get(j).copied().unwrap_or(0.0);
            assert!((at_one - b).abs() < 1e-12, "row {j}: {at_one} vs {b}");
        }
    }

    #[test]
    fn tableau_rows_sum_to_nodes() {
        for (s, row) in A.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            assert!((sum - C[s]).abs() < 1e-12, "stage {s}");
        }
        assert!((B.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(E.iter().sum::<f64>().abs() < 1e-12);
    }
}
