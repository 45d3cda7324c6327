//! Equations of motion for the three-body system
//!
//! Newtonian point-mass gravity with G = 1 (dimensionless units), no softening.
//! Coincident bodies are reported as [`DomainError::CollisionSingularity`]
//! instead of producing infinite accelerations.

use crate::error::DomainError;
use crate::simulation::states::{position, velocity, Masses, NState, NVec2, BODY_COUNT, VELOCITY_OFFSET};

/// Separation below which two bodies count as collided
pub const DEFAULT_COLLISION_EPS: f64 = 1.0e-9;

/// First-order ODE right-hand side driven by the integrator
///
/// Implementations must be pure: the result depends only on `t` and `state`.
pub trait Derivative {
    fn derivative(&self, t: f64, state: &NState) -> Result<NState, DomainError>;
}

/// Pairwise Newtonian gravity between exactly three point masses
#[derive(Debug, Clone, Copy)]
pub struct NewtonianGravity {
    pub masses: Masses,
    pub collision_eps: f64, // minimum allowed separation
}

impl NewtonianGravity {
    pub fn new(masses: Masses) -> Self {
        Self {
            masses,
            collision_eps: DEFAULT_COLLISION_EPS,
        }
    }

    pub fn with_collision_eps(mut self, eps: f64) -> Self {
        self.collision_eps = eps;
        self
    }

    /// Accelerations of all three bodies at the positions stored in `state`
    pub fn accelerations(&self, state: &NState) -> Result<[NVec2; BODY_COUNT], DomainError> {
        let mut out = [NVec2::zeros(); BODY_COUNT];

        // Each unordered pair once; i is pulled along +r, j along -r
        for i in 0..BODY_COUNT {
            let xi = position(state, i);
            for j in (i + 1)..BODY_COUNT {
                let r = position(state, j) - xi;
                let dist = r.norm();
                if dist < self.collision_eps {
                    return Err(DomainError::CollisionSingularity {
                        first: i,
                        second: j,
                        distance: dist,
                    });
                }

                // r / |r|^3
                let coef = (dist * dist * dist).recip();
                out[i] += coef * self.masses[j] * r;
                out[j] -= coef * self.masses[i] * r;
            }
        }

        Ok(out)
    }
}

impl Derivative for NewtonianGravity {
    fn derivative(&self, _t: f64, state: &NState) -> Result<NState, DomainError> {
        let acc = self.accelerations(state)?;

        let mut dy = NState::zeros();
        for i in 0..BODY_COUNT {
            // d(r_i)/dt = v_i
            dy.fixed_rows_mut::<2>(2 * i).copy_from(&velocity(state, i));
            // d(v_i)/dt = a_i
            dy.fixed_rows_mut::<2>(VELOCITY_OFFSET + 2 * i).copy_from(&acc[i]);
        }
        Ok(dy)
    }
}

/// Time derivative of `state` for the given masses, using the default collision threshold
pub fn derivative(t: f64, state: &NState, masses: &Masses) -> Result<NState, DomainError> {
    NewtonianGravity::new(*masses).derivative(t, state)
}
