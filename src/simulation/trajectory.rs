//! Precomputed trajectory and random-access playback sampling
//!
//! A `Trajectory` is produced once by the integrator and never mutated. Playback
//! reads it by frame index; frame indices are unbounded and wrap modulo the
//! trajectory length so a cursor can loop forever without recomputation.

use crate::simulation::states::{position, velocity, NState, NVec2};

/// Why the integrator stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Every requested evaluation time was reached
    Completed,
    /// Two bodies came closer than the collision threshold
    CollisionSingularity { t: f64, first: usize, second: usize, distance: f64 },
    /// Error control asked for a step below the minimum step size
    StepSizeUnderflow { t: f64, h: f64 },
    /// The step budget ran out
    StepLimitReached { t: f64, steps: usize },
}

/// Work counters reported by the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<NState>,
    requested: usize,
    termination: Termination,
    stats: SolverStats,
}

impl Trajectory {
    pub(crate) fn new(
        times: Vec<f64>,
        states: Vec<NState>,
        requested: usize,
        termination: Termination,
        stats: SolverStats,
    ) -> Self {
        debug_assert_eq!(times.len(), states.len());
        Self {
            times,
            states,
            requested,
            termination,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of evaluation times that were asked for
    pub fn requested_len(&self) -> usize {
        self.requested
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::Completed)
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[NState] {
        &self.states
    }

    pub fn last(&self) -> Option<(f64, &NState)> {
        self.times.last().copied().zip(self.states.last())
    }

    /// Map an unbounded frame index onto a stored sample
    #[inline]
    pub fn wrap(&self, frame: usize) -> Option<usize> {
        (!self.is_empty()).then(|| frame % self.len())
    }

    /// State shown at `frame`, looping over the trajectory
    pub fn sample(&self, frame: usize) -> Option<&NState> {
        self.wrap(frame).map(|idx| &self.states[idx])
    }

    pub fn time_at(&self, frame: usize) -> Option<f64> {
        self.wrap(frame).map(|idx| self.times[idx])
    }

    pub fn position(&self, frame: usize, body: usize) -> Option<NVec2> {
        self.sample(frame).map(|s| position(s, body))
    }

    pub fn velocity(&self, frame: usize, body: usize) -> Option<NVec2> {
        self.sample(frame).map(|s| velocity(s, body))
    }

    /// Path of `body` from the first sample up to `frame` (wrapped), inclusive
    pub fn trail(&self, body: usize, frame: usize) -> impl Iterator<Item = NVec2> + '_ {
        let end = self.wrap(frame).map_or(0, |idx| idx + 1);
        self.states[..end].iter().map(move |s| position(s, body))
    }
}
