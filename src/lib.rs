pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::{ConfigError, DomainError};

pub use simulation::states::{Body, NVec2, NState, Masses, BODY_COUNT, STATE_LEN};
pub use simulation::forces::{derivative, Derivative, NewtonianGravity};
pub use simulation::params::{Parameters, TimeSpan, EvaluationTimes};
pub use simulation::integrator::{integrate, solve_dopri5};
pub use simulation::trajectory::{Trajectory, Termination, SolverStats};
pub use simulation::playback::Playback;
pub use simulation::diagnostics::ConservationReport;
pub use simulation::scenario::Scenario;

pub use configuration::config::{ScenarioConfig, ParametersConfig, PlaybackConfig, BodyConfig};

pub use benchmark::benchmark::{bench_integrate, bench_tolerances};
