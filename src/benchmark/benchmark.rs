use std::time::Instant;

use crate::simulation::diagnostics::ConservationReport;
use crate::simulation::params::{EvaluationTimes, Parameters};
use crate::simulation::scenario::Scenario;

/// Time the reference scenario for growing sample counts.
/// The solver's step count does not depend on the sampling grid, so this
/// mostly measures the dense-output cost.
pub fn bench_integrate() {
    let counts = [100, 1_000, 10_000, 100_000];

    for n in counts {
        let mut scenario = match Scenario::reference() {
            Ok(s) => s,
            Err(e) => {
                println!("reference scenario rejected: {e}");
                return;
            }
        };
        scenario.evaluation_times = match EvaluationTimes::uniform(scenario.span.t_start, scenario.span.t_end, n) {
            Ok(t) => t,
            Err(e) => {
                println!("N = {n}: {e}");
                continue;
            }
        };

        // Warm up
        let _ = scenario.run();

        let t0 = Instant::now();
        let result = scenario.run();
        let dt = t0.elapsed().as_secs_f64();

        match result {
            Ok(traj) => {
                let stats = traj.stats();
                println!(
                    "N = {n:6}, time = {dt:8.6} s, steps = {:7}, rejected = {:5}, evals = {:8}",
                    stats.accepted_steps, stats.rejected_steps, stats.evaluations
                );
            }
            Err(e) => println!("N = {n:6}: {e}"),
        }
    }
}

/// Cost and accuracy of the reference scenario across tolerance settings
pub fn bench_tolerances() {
    let rtols = [1.0e-3, 1.0e-6, 1.0e-9, 1.0e-12];

    for rtol in rtols {
        let mut scenario = match Scenario::reference() {
            Ok(s) => s,
            Err(e) => {
                println!("reference scenario rejected: {e}");
                return;
            }
        };
        scenario.parameters = Parameters {
            rtol,
            atol: rtol * 1.0e-3,
            ..Parameters::default()
        };

        let t0 = Instant::now();
        let result = scenario.run();
        let dt = t0.elapsed().as_secs_f64();

        match result {
            Ok(traj) => {
                let report = ConservationReport::from_trajectory(&traj, &scenario.masses);
                println!(
                    "rtol = {rtol:8.1e}, time = {dt:8.6} s, steps = {:7}, samples = {:6}, dE/E = {:9.3e}, dp = {:9.3e}",
                    traj.stats().accepted_steps,
                    traj.len(),
                    report.energy_drift,
                    report.momentum_drift
                );
            }
            Err(e) => println!("rtol = {rtol:8.1e}: {e}"),
        }
    }
}
