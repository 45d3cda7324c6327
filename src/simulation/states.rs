//! Core state types for the three-body simulation.
//!
//! The integrator advances a flat 12-component state vector:
//!
//! ```text
//! [x1, y1, x2, y2, x3, y3, vx1, vy1, vx2, vy2, vx3, vy3]
//! ```
//!
//! Positions occupy the first six slots and velocities the last six, always in
//! body order 0, 1, 2. The derivative has the same layout, with velocities in
//! the position slots and accelerations in the velocity slots.

use nalgebra::{SVector, Vector2, Vector3};

pub type NVec2 = Vector2<f64>;
pub type NState = SVector<f64, STATE_LEN>;
pub type Masses = Vector3<f64>;

/// Number of bodies in every simulation
pub const BODY_COUNT: usize = 3;

/// Scalars per state vector (2D position + 2D velocity per body)
pub const STATE_LEN: usize = 4 * BODY_COUNT;

/// Offset of the first velocity slot
pub const VELOCITY_OFFSET: usize = 2 * BODY_COUNT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: NVec2, // position
    pub v: NVec2, // velocity
    pub m: f64, // mass
}

impl Body {
    pub fn new(x: [f64; 2], v: [f64; 2], m: f64) -> Self {
        Self {
            x: NVec2::new(x[0], x[1]),
            v: NVec2::new(v[0], v[1]),
            m,
        }
    }
}

/// Position of body `i` in `state`
#[inline]
pub fn position(state: &NState, i: usize) -> NVec2 {
    state.fixed_rows::<2>(2 * i).into_owned()
}

/// Velocity of body `i` in `state`
#[inline]
pub fn velocity(state: &NState, i: usize) -> NVec2 {
    state.fixed_rows::<2>(VELOCITY_OFFSET + 2 * i).into_owned()
}

pub fn set_position(state: &mut NState, i: usize, x: &NVec2) {
    state.fixed_rows_mut::<2>(2 * i).copy_from(x);
}

pub fn set_velocity(state: &mut NState, i: usize, v: &NVec2) {
    state.fixed_rows_mut::<2>(VELOCITY_OFFSET + 2 * i).copy_from(v);
}

/// Pack three bodies into a state vector and a mass vector
pub fn pack(bodies: &[Body; BODY_COUNT]) -> (NState, Masses) {
    let mut state = NState::zeros();
    for (i, b) in bodies.iter().enumerate() {
        set_position(&mut state, i, &b.x);
        set_velocity(&mut state, i, &b.v);
    }
    let masses = Masses::new(bodies[0].m, bodies[1].m, bodies[2].m);
    (state, masses)
}

/// Inverse of [`pack`]
pub fn unpack(state: &NState, masses: &Masses) -> [Body; BODY_COUNT] {
    std::array::from_fn(|i| Body {
        x: position(state, i),
        v: velocity(state, i),
        m: masses[i],
    })
}
