//! Conserved quantities and geometry of a three-body state
//!
//! Used to check a trajectory: with no external forces, total momentum,
//! angular momentum and energy stay constant up to solver tolerance.

use crate::simulation::states::{position, velocity, Masses, NState, NVec2, BODY_COUNT};
use crate::simulation::trajectory::Trajectory;

/// Index pairs in the order used by [`pairwise_distances`]
pub const PAIRS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Total linear momentum, sum of m_i v_i
pub fn total_momentum(state: &NState, masses: &Masses) -> NVec2 {
    (0..BODY_COUNT).fold(NVec2::zeros(), |p, i| p + masses[i] * velocity(state, i))
}

/// z-component of the total angular momentum about the origin
pub fn angular_momentum(state: &NState, masses: &Masses) -> f64 {
    (0..BODY_COUNT)
        .map(|i| {
            let x = position(state, i);
            let v = velocity(state, i);
            masses[i] * x.perp(&v)
        })
        .sum()
}

pub fn kinetic_energy(state: &NState, masses: &Masses) -> f64 {
    (0..BODY_COUNT)
        .map(|i| 0.5 * masses[i] * velocity(state, i).norm_squared())
        .sum()
}

/// Gravitational potential energy, -sum m_i m_j / r_ij (negative infinity at a collision)
pub fn potential_energy(state: &NState, masses: &Masses) -> f64 {
    let d = pairwise_distances(state);
    PAIRS
        .iter()
        .zip(d.iter())
        .map(|(&(i, j), r)| -masses[i] * masses[j] / r)
        .sum()
}

pub fn total_energy(state: &NState, masses: &Masses) -> f64 {
    kinetic_energy(state, masses) + potential_energy(state, masses)
}

pub fn center_of_mass(state: &NState, masses: &Masses) -> NVec2 {
    let weighted = (0..BODY_COUNT).fold(NVec2::zeros(), |c, i| c + masses[i] * position(state, i));
    weighted / masses.sum()
}

/// Distances |r_01|, |r_02|, |r_12|
pub fn pairwise_distances(state: &NState) -> [f64; 3] {
    PAIRS.map(|(i, j)| (position(state, j) - position(state, i)).norm())
}

/// Worst deviation of the conserved quantities from their values at the first sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConservationReport {
    pub momentum_drift: f64, // absolute, |p(t) - p(0)|
    pub angular_momentum_drift: f64, // absolute
    pub energy_drift: f64, // relative to |E(0)|, absolute when E(0) == 0
    pub min_separation: f64,
}

impl ConservationReport {
    pub fn from_trajectory(trajectory: &Trajectory, masses: &Masses) -> Self {
        let Some(first) = trajectory.states().first() else {
            return Self::default();
        };

        let p0 = total_momentum(first, masses);
        let l0 = angular_momentum(first, masses);
        let e0 = total_energy(first, masses);
        let e_scale = if e0 == 0.0 { 1.0 } else { e0.abs() };

        trajectory.states().iter().fold(
            Self {
                min_separation: f64::INFINITY,
                ..Self::default()
            },
            |mut r, s| {
                r.momentum_drift = r.momentum_drift.max((total_momentum(s, masses) - p0).norm());
                r.angular_momentum_drift = r
                    .angular_momentum_drift
                    .max((angular_momentum(s, masses) - l0).abs());
                r.energy_drift = r
                    .energy_drift
                    .max((total_energy(s, masses) - e0).abs() / e_scale);
                let closest = pairwise_distances(s).into_iter().fold(f64::INFINITY, f64::min);
                r.min_separation = r.min_separation.min(closest);
                r
            },
        )
    }
}
