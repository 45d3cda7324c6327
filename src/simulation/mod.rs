pub mod states;
pub mod params;
pub mod forces;
pub mod integrator;
pub mod trajectory;
pub mod playback;
pub mod diagnostics;
pub mod scenario;
