use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tbsim::simulation::diagnostics::{angular_momentum, pairwise_distances, total_energy, total_momentum};
use tbsim::simulation::scenario::FIGURE_EIGHT_PERIOD;
use tbsim::simulation::states::{pack, position, velocity};
use tbsim::{
    derivative, integrate, Body, ConfigError, ConservationReport, Derivative, DomainError, EvaluationTimes,
    Masses, NState, NewtonianGravity, Parameters, Playback, Scenario, ScenarioConfig, Termination, TimeSpan,
    Trajectory,
};

/// Three bodies on the x-axis; the third one light and far away
pub fn pair_system(dist: f64, m1: f64, m2: f64) -> (NState, Masses) {
    pack(&[
        Body::new([-dist / 2.0, 0.0], [0.0, 0.0], m1),
        Body::new([dist / 2.0, 0.0], [0.0, 0.0], m2),
        Body::new([0.0, 1.0e6], [0.0, 0.0], 1.0e-12),
    ])
}

/// Generic non-symmetric configuration
pub fn scalene_system() -> (NState, Masses) {
    pack(&[
        Body::new([-1.0, 0.2], [0.1, 0.8], 1.0),
        Body::new([1.3, -0.1], [-0.2, -0.5], 2.0),
        Body::new([0.1, 1.1], [0.7, 0.05], 0.5),
    ])
}

/// Run a configuration over (0, t_end) sampled uniformly
pub fn run(state: &NState, masses: &Masses, t_end: f64, samples: usize, params: &Parameters) -> Trajectory {
    let span = TimeSpan::new(0.0, t_end).unwrap();
    let times = EvaluationTimes::uniform(0.0, t_end, samples).unwrap();
    integrate(masses, state, span, &times, params).unwrap()
}

pub fn all_finite(traj: &Trajectory) -> bool {
    traj.states().iter().all(|s| s.iter().all(|v| v.is_finite()))
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn gravity_newton_third_law() {
    let (state, masses) = scalene_system();
    let dy = derivative(0.0, &state, &masses).unwrap();

    // sum m_i a_i = d/dt of total momentum
    let net: f64 = (0..3)
        .map(|i| masses[i] * velocity(&dy, i))
        .fold(tbsim::NVec2::zeros(), |a, b| a + b)
        .norm();

    assert!(net < 1e-12, "Net force not zero: {net}");
}

#[test]
fn gravity_points_toward_other_body() {
    let (state, masses) = pair_system(2.0, 1.0, 1.0);
    let dy = derivative(0.0, &state, &masses).unwrap();

    let dx = position(&state, 1) - position(&state, 0);
    let a0 = velocity(&dy, 0);
    let a1 = velocity(&dy, 1);

    assert!(a0.dot(&dx) > 0.0, "Acceleration of body 0 is not toward body 1");
    assert!(a1.dot(&dx) < 0.0, "Acceleration of body 1 is not toward body 0");
}

#[test]
fn gravity_inverse_square_law() {
    let (state_r, masses) = pair_system(1.0, 1.0, 1.0);
    let (state_2r, _) = pair_system(2.0, 1.0, 1.0);

    let a_r = velocity(&derivative(0.0, &state_r, &masses).unwrap(), 0).norm();
    let a_2r = velocity(&derivative(0.0, &state_2r, &masses).unwrap(), 0).norm();

    let ratio = a_r / a_2r;
    assert!((ratio - 4.0).abs() < 1e-6, "Expected ~4x, got {ratio}");
}

#[test]
fn gravity_scales_with_source_mass() {
    let (state, masses) = pair_system(1.0, 1.0, 3.0);
    let dy = derivative(0.0, &state, &masses).unwrap();

    // body 0 feels m_1 / r^2 = 3, body 1 feels m_0 / r^2 = 1
    assert!((velocity(&dy, 0).x - 3.0).abs() < 1e-9);
    assert!((velocity(&dy, 1).x + 1.0).abs() < 1e-9);
}

#[test]
fn derivative_passes_velocities_through() {
    let (state, masses) = scalene_system();
    let dy = derivative(0.0, &state, &masses).unwrap();

    for i in 0..3 {
        assert_eq!(position(&dy, i), velocity(&state, i));
    }
}

#[test]
fn derivative_is_autonomous_and_matches_trait() {
    let (state, masses) = scalene_system();
    let gravity = NewtonianGravity::new(masses);

    let a = derivative(0.0, &state, &masses).unwrap();
    let b = gravity.derivative(42.0, &state).unwrap();
    assert_eq!(a, b);
}

#[test]
fn coincident_bodies_are_a_collision() {
    let (mut state, masses) = scalene_system();
    let x0 = position(&state, 0);
    tbsim::simulation::states::set_position(&mut state, 2, &x0);

    match derivative(0.0, &state, &masses) {
        Err(DomainError::CollisionSingularity { first, second, distance }) => {
            assert_eq!((first, second), (0, 2));
            assert_eq!(distance, 0.0);
        }
        other => panic!("expected a collision, got {other:?}"),
    }
}

#[test]
fn collision_threshold_is_configurable() {
    let (state, masses) = pair_system(1.0e-3, 1.0, 1.0);

    assert!(NewtonianGravity::new(masses).derivative(0.0, &state).is_ok());
    assert!(NewtonianGravity::new(masses)
        .with_collision_eps(1.0e-2)
        .derivative(0.0, &state)
        .is_err());
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn reference_scenario_completes() {
    let scenario = Scenario::reference().unwrap();
    let traj = scenario.run().unwrap();

    assert_eq!(traj.termination(), Termination::Completed);
    assert_eq!(traj.len(), 10_000);
    assert_eq!(traj.requested_len(), 10_000);
    assert_eq!(traj.times(), scenario.evaluation_times.as_slice());
    assert_eq!(traj.states()[0], scenario.initial_state);
    assert!(all_finite(&traj));

    // characteristic momentum scale is |p0| = 1
    let p0 = total_momentum(&scenario.initial_state, &scenario.masses);
    let (_, last) = traj.last().unwrap();
    let drift = (total_momentum(last, &scenario.masses) - p0).norm();
    assert!(drift < 1e-6 * p0.norm(), "momentum drift {drift}");
}

#[test]
fn reference_scenario_conserves_energy() {
    let scenario = Scenario::reference().unwrap();
    let traj = scenario.run().unwrap();

    let report = ConservationReport::from_trajectory(&traj, &scenario.masses);
    assert!(report.momentum_drift < 1e-9, "momentum drift {}", report.momentum_drift);
    assert!(report.energy_drift < 1e-6, "energy drift {}", report.energy_drift);
    assert!(
        report.angular_momentum_drift < 1e-6,
        "angular momentum drift {}",
        report.angular_momentum_drift
    );
}

#[test]
fn integration_is_deterministic() {
    let (state, masses) = scalene_system();
    let params = Parameters::default();

    let a = run(&state, &masses, 20.0, 200, &params);
    let b = run(&state, &masses, 20.0, 200, &params);

    assert_eq!(a.times(), b.times());
    assert_eq!(a.states(), b.states());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn first_sample_is_initial_state() {
    let (state, masses) = scalene_system();
    let params = Parameters {
        rtol: 1e-6,
        atol: 1e-9,
        ..Parameters::default()
    };

    let traj = run(&state, &masses, 5.0, 50, &params);
    assert_eq!(traj.sample(0), Some(&state));
    assert_eq!(traj.time_at(0), Some(0.0));
}

#[test]
fn lagrange_triangle_stays_equilateral() {
    let scenario = Scenario::lagrange_triangle(1.0, 1000, 10.0).unwrap();
    let traj = scenario.run().unwrap();
    assert!(traj.is_complete());

    let e0 = total_energy(&scenario.initial_state, &scenario.masses);
    for s in traj.states() {
        let d = pairwise_distances(s);
        let spread = d.iter().cloned().fold(f64::MIN, f64::max) - d.iter().cloned().fold(f64::MAX, f64::min);
        assert!(spread < 1e-6, "triangle deformed: {d:?}");
        assert!((d[0] - 3.0_f64.sqrt()).abs() < 1e-6, "triangle size changed: {d:?}");

        let e = total_energy(s, &scenario.masses);
        assert!(((e - e0) / e0).abs() < 1e-7);
    }
}

#[test]
fn figure_eight_returns_after_one_period() {
    let scenario = Scenario::figure_eight(500, FIGURE_EIGHT_PERIOD).unwrap();
    let traj = scenario.run().unwrap();
    assert!(traj.is_complete());

    let (t, last) = traj.last().unwrap();
    assert_eq!(t, FIGURE_EIGHT_PERIOD);
    let err = (last - scenario.initial_state).amax();
    assert!(err < 1e-5, "orbit did not close: {err}");

    // zero total angular momentum throughout
    for s in traj.states() {
        assert!(angular_momentum(s, &scenario.masses).abs() < 1e-8);
    }
}

#[test]
fn dense_output_matches_tight_solution() {
    let (state, masses) = scalene_system();

    // coarse internal steps, reported on a fine grid
    let loose = run(&state, &masses, 5.0, 401, &Parameters::default());
    let tight = run(
        &state,
        &masses,
        5.0,
        401,
        &Parameters {
            rtol: 1e-12,
            atol: 1e-14,
            ..Parameters::default()
        },
    );

    assert!(loose.stats().accepted_steps < 400, "steps {}", loose.stats().accepted_steps);
    for (a, b) in loose.states().iter().zip(tight.states()) {
        assert!((a - b).amax() < 1e-6);
    }
}

#[test]
fn arbitrary_evaluation_times_are_reported_exactly() {
    let (state, masses) = scalene_system();
    let span = TimeSpan::new(0.0, 10.0).unwrap();
    let times = EvaluationTimes::new(vec![0.5, 1.0, 7.25]).unwrap();
    let params = Parameters {
        h0: Some(1e-3),
        ..Parameters::default()
    };

    let traj = integrate(&masses, &state, span, &times, &params).unwrap();
    assert!(traj.is_complete());
    assert_eq!(traj.times(), &[0.5, 1.0, 7.25]);
}

#[test]
fn head_on_collision_terminates_early() {
    let (state, masses) = pack(&[
        Body::new([-1.0e-3, 0.0], [1.0, 0.0], 1.0),
        Body::new([1.0e-3, 0.0], [-1.0, 0.0], 1.0),
        Body::new([0.0, 10.0], [0.0, 0.0], 1.0),
    ]);

    let traj = run(&state, &masses, 1.0, 100, &Parameters::default());

    assert!(!traj.is_complete());
    assert!(traj.len() < 100);
    assert!(!traj.is_empty());
    assert!(all_finite(&traj));
    assert!(matches!(
        traj.termination(),
        Termination::CollisionSingularity { first: 0, second: 1, .. }
    ));
}

#[test]
fn radial_infall_terminates_early() {
    let (state, masses) = pack(&[
        Body::new([-0.5, 0.0], [0.0, 0.0], 1.0),
        Body::new([0.5, 0.0], [0.0, 0.0], 1.0),
        Body::new([0.0, 10.0], [0.0, 0.0], 1.0),
    ]);

    let traj = run(&state, &masses, 10.0, 1000, &Parameters::default());

    assert!(traj.len() < 1000);
    assert!(traj.len() > 1);
    assert!(all_finite(&traj));
    assert!(matches!(
        traj.termination(),
        Termination::CollisionSingularity { .. } | Termination::StepSizeUnderflow { .. }
    ));
}

#[test]
fn coincident_start_returns_initial_sample_only() {
    let (state, masses) = pack(&[
        Body::new([0.0, 0.0], [0.0, 0.0], 1.0),
        Body::new([0.0, 0.0], [0.0, 0.0], 1.0),
        Body::new([1.0, 0.0], [0.0, 0.0], 1.0),
    ]);

    let traj = run(&state, &masses, 10.0, 10, &Parameters::default());

    assert_eq!(traj.len(), 1);
    assert_eq!(traj.states()[0], state);
    assert!(matches!(traj.termination(), Termination::CollisionSingularity { t, .. } if t == 0.0));
}

#[test]
fn step_budget_terminates_early() {
    let scenario = Scenario::reference().unwrap();
    let params = Parameters {
        max_steps: 50,
        ..Parameters::default()
    };

    let traj = integrate(
        &scenario.masses,
        &scenario.initial_state,
        scenario.span,
        &scenario.evaluation_times,
        &params,
    )
    .unwrap();

    assert!(matches!(traj.termination(), Termination::StepLimitReached { steps: 50, .. }));
    assert!(traj.len() < traj.requested_len());
    assert_eq!(traj.states()[0], scenario.initial_state);
    assert_eq!(traj.times(), &scenario.evaluation_times.as_slice()[..traj.len()]);
}

// ==================================================================================
// Configuration error tests
// ==================================================================================

#[test]
fn rejects_non_positive_mass() {
    let (state, _) = scalene_system();
    let masses = Masses::new(1.0, 0.0, 1.0);
    let span = TimeSpan::new(0.0, 1.0).unwrap();
    let times = EvaluationTimes::uniform(0.0, 1.0, 10).unwrap();

    let err = integrate(&masses, &state, span, &times, &Parameters::default()).unwrap_err();
    assert_eq!(err, ConfigError::NonPositiveMass { body: 1, mass: 0.0 });
}

#[test]
fn rejects_bad_time_span() {
    assert!(matches!(TimeSpan::new(1.0, 1.0), Err(ConfigError::InvalidTimeSpan { .. })));
    assert!(matches!(TimeSpan::new(2.0, 1.0), Err(ConfigError::InvalidTimeSpan { .. })));
    assert!(matches!(TimeSpan::new(0.0, f64::NAN), Err(ConfigError::InvalidTimeSpan { .. })));

    // a span built by hand is checked again by integrate
    let (state, masses) = scalene_system();
    let span = TimeSpan { t_start: 1.0, t_end: 0.0 };
    let times = EvaluationTimes::new(vec![0.5]).unwrap();
    assert!(matches!(
        integrate(&masses, &state, span, &times, &Parameters::default()),
        Err(ConfigError::InvalidTimeSpan { .. })
    ));
}

#[test]
fn rejects_bad_evaluation_times() {
    assert_eq!(EvaluationTimes::new(vec![]), Err(ConfigError::EmptyEvaluationTimes));
    assert!(matches!(
        EvaluationTimes::new(vec![0.0, 1.0, 1.0]),
        Err(ConfigError::NonIncreasingEvaluationTimes { index: 2, .. })
    ));
    assert!(matches!(
        EvaluationTimes::new(vec![0.0, f64::NAN]),
        Err(ConfigError::NonIncreasingEvaluationTimes { .. })
    ));
    assert_eq!(EvaluationTimes::uniform(0.0, 1.0, 0), Err(ConfigError::ZeroSamples));

    let (state, masses) = scalene_system();
    let span = TimeSpan::new(0.0, 1.0).unwrap();
    let times = EvaluationTimes::new(vec![0.5, 1.5]).unwrap();
    assert!(matches!(
        integrate(&masses, &state, span, &times, &Parameters::default()),
        Err(ConfigError::EvaluationTimeOutOfSpan { time, .. }) if time == 1.5
    ));
}

#[test]
fn rejects_non_finite_state_and_bad_parameters() {
    let (mut state, masses) = scalene_system();
    let span = TimeSpan::new(0.0, 1.0).unwrap();
    let times = EvaluationTimes::uniform(0.0, 1.0, 10).unwrap();

    let bad = Parameters {
        rtol: 0.0,
        ..Parameters::default()
    };
    assert_eq!(
        integrate(&masses, &state, span, &times, &bad).unwrap_err(),
        ConfigError::InvalidParameter { name: "rtol", value: 0.0 }
    );

    let bad = Parameters {
        max_steps: 0,
        ..Parameters::default()
    };
    assert!(integrate(&masses, &state, span, &times, &bad).is_err());

    state[7] = f64::INFINITY;
    assert!(matches!(
        integrate(&masses, &state, span, &times, &Parameters::default()),
        Err(ConfigError::NonFiniteInitialState { index: 7, .. })
    ));
}

#[test]
fn uniform_grid_includes_both_endpoints() {
    let times = EvaluationTimes::uniform(0.0, 100.0, 10_000).unwrap();
    let t = times.as_slice();

    assert_eq!(t.len(), 10_000);
    assert_eq!(t[0], 0.0);
    assert_eq!(t[9_999], 100.0);
    assert!(t.windows(2).all(|w| w[1] > w[0]));

    assert_eq!(EvaluationTimes::uniform(3.0, 4.0, 1).unwrap().as_slice(), &[3.0]);
}

// ==================================================================================
// Playback tests
// ==================================================================================

#[test]
fn sampling_loops_over_trajectory() {
    let (state, masses) = scalene_system();
    let traj = run(&state, &masses, 2.0, 37, &Parameters::default());
    let n = traj.len();

    for frame in [0, 1, 5, 36, 37, 100, 12_345] {
        assert_eq!(traj.sample(frame), traj.sample(frame + n));
        assert_eq!(traj.sample(frame), Some(&traj.states()[frame % n]));
    }
}

#[test]
fn trail_is_prefix_of_position_history() {
    let (state, masses) = scalene_system();
    let traj = run(&state, &masses, 2.0, 20, &Parameters::default());

    let trail: Vec<_> = traj.trail(1, 7).collect();
    assert_eq!(trail.len(), 8);
    assert_eq!(trail[0], position(&state, 1));
    assert_eq!(trail[7], traj.position(7, 1).unwrap());

    // frame 25 wraps to index 5
    assert_eq!(traj.trail(2, 25).count(), 6);
    assert_eq!(traj.trail(0, 19).count(), 20);
}

#[test]
fn empty_trajectory_has_no_frames() {
    let (state, masses) = pack(&[
        Body::new([0.0, 0.0], [0.0, 0.0], 1.0),
        Body::new([0.0, 0.0], [0.0, 0.0], 1.0),
        Body::new([1.0, 0.0], [0.0, 0.0], 1.0),
    ]);
    let span = TimeSpan::new(0.0, 10.0).unwrap();
    let times = EvaluationTimes::new(vec![5.0]).unwrap();

    let traj = integrate(&masses, &state, span, &times, &Parameters::default()).unwrap();

    assert!(traj.is_empty());
    assert_eq!(traj.sample(3), None);
    assert_eq!(traj.trail(0, 3).count(), 0);
}

#[test]
fn playback_cursor_pauses_and_resets() {
    let (state, masses) = scalene_system();
    let traj = Arc::new(run(&state, &masses, 1.0, 5, &Parameters::default()));
    let mut playback = Playback::new(Arc::clone(&traj), 100).unwrap();

    assert_eq!(playback.frame_interval(), Duration::from_millis(10));
    assert_eq!(playback.current(), Some(&state));

    for _ in 0..7 {
        playback.advance();
    }
    assert_eq!(playback.frame(), 7);
    assert_eq!(playback.current(), traj.sample(2));
    assert_eq!(playback.current_trail(0).len(), 3);

    playback.pause();
    playback.advance();
    assert_eq!(playback.frame(), 7);

    playback.resume();
    playback.advance();
    assert_eq!(playback.frame(), 8);

    playback.pause();
    playback.reset();
    assert_eq!(playback.frame(), 0);
    assert!(!playback.is_paused());
    assert_eq!(playback.current_time(), Some(0.0));

    assert!(matches!(Playback::new(traj, 0), Err(ConfigError::ZeroPlaybackSpeed)));
}

#[test]
fn trajectory_is_shared_across_readers() {
    let (state, masses) = scalene_system();
    let traj = Arc::new(run(&state, &masses, 1.0, 50, &Parameters::default()));

    let handles: Vec<_> = (0..4)
        .map(|k| {
            let traj = Arc::clone(&traj);
            thread::spawn(move || {
                let mut playback = Playback::new(traj, 60).unwrap();
                for _ in 0..k * 13 {
                    playback.advance();
                }
                *playback.current().unwrap()
            })
        })
        .collect();

    for (k, h) in handles.into_iter().enumerate() {
        assert_eq!(&h.join().unwrap(), traj.sample(k * 13).unwrap());
    }
}

// ==================================================================================
// Scenario tests
// ==================================================================================

const MINIMAL_YAML: &str = r#"
parameters:
  t_end: 5.0
  samples: 11
bodies:
  - { x: [-1.0, 0.0], v: [0.0, 0.5], m: 1.0 }
  - { x: [1.0, 0.0], v: [0.0, -0.5], m: 1.0 }
  - { x: [0.0, 2.0], v: [0.0, 0.0], m: 0.5 }
"#;

#[test]
fn yaml_defaults_are_filled_in() {
    let cfg: ScenarioConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.span, TimeSpan { t_start: 0.0, t_end: 5.0 });
    assert_eq!(scenario.evaluation_times.len(), 11);
    assert_eq!(scenario.parameters, Parameters::default());
    assert_eq!(scenario.speed, 100);
    assert_eq!(scenario.masses, Masses::new(1.0, 1.0, 0.5));

    let traj = scenario.run().unwrap();
    assert!(traj.is_complete());
    assert_eq!(traj.len(), 11);
}

#[test]
fn yaml_needs_three_bodies() {
    let mut cfg: ScenarioConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
    cfg.bodies.pop();
    assert_eq!(Scenario::build_scenario(cfg).unwrap_err(), ConfigError::WrongBodyCount(2));
}

#[test]
fn yaml_rejects_invalid_values() {
    let mut cfg: ScenarioConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
    cfg.bodies[2].m = -1.0;
    assert!(matches!(
        Scenario::build_scenario(cfg),
        Err(ConfigError::NonPositiveMass { body: 2, .. })
    ));

    let mut cfg: ScenarioConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
    cfg.playback.speed = 0;
    assert_eq!(Scenario::build_scenario(cfg).unwrap_err(), ConfigError::ZeroPlaybackSpeed);
}

#[test]
fn bundled_scenario_matches_reference_preset() {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join("three_body.yaml");
    let file = std::fs::File::open(path).unwrap();
    let cfg: ScenarioConfig = serde_yaml::from_reader(file).unwrap();

    assert_eq!(Scenario::build_scenario(cfg).unwrap(), Scenario::reference().unwrap());
}
