use tbsim::{Scenario, ScenarioConfig, Playback, ConservationReport, Termination, BODY_COUNT};
use tbsim::{bench_integrate, bench_tolerances};
use tbsim::simulation::scenario::FIGURE_EIGHT_PERIOD;
use tbsim::simulation::states::position;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Preset {
    Reference,
    Lagrange,
    FigureEight,
}

#[derive(Parser, Debug)]
#[command(about = "Three-body gravitational simulator")]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "three_body.yaml")]
    file_name: String,

    /// Use a built-in scenario instead of a file
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Number of playback frames to print
    #[arg(long, default_value_t = 0)]
    frames: usize,

    /// Run the integrator benchmarks and exit
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("opening scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("parsing scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn build(args: &Args) -> Result<Scenario> {
    let scenario = match args.preset {
        Some(Preset::Reference) => Scenario::reference()?,
        Some(Preset::Lagrange) => Scenario::lagrange_triangle(1.0, 2_000, 20.0)?,
        Some(Preset::FigureEight) => Scenario::figure_eight(2_000, 4.0 * FIGURE_EIGHT_PERIOD)?,
        None => Scenario::build_scenario(load_scenario_from_yaml(&args.file_name)?)?,
    };
    Ok(scenario)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.bench {
        bench_integrate();
        bench_tolerances();
        return Ok(());
    }

    let scenario = build(&args)?;
    let trajectory = Arc::new(scenario.run()?);

    match trajectory.termination() {
        Termination::Completed => info!("trajectory complete: {} samples", trajectory.len()),
        other => warn!(
            "trajectory ended early after {} of {} samples: {:?}",
            trajectory.len(),
            trajectory.requested_len(),
            other
        ),
    }

    let report = ConservationReport::from_trajectory(&trajectory, &scenario.masses);
    info!(
        "momentum drift {:.3e}, angular momentum drift {:.3e}, relative energy drift {:.3e}, closest approach {:.4}",
        report.momentum_drift, report.angular_momentum_drift, report.energy_drift, report.min_separation
    );

    let mut playback = Playback::new(Arc::clone(&trajectory), scenario.speed)?;
    for _ in 0..args.frames {
        if let (Some(t), Some(state)) = (playback.current_time(), playback.current()) {
            let positions: Vec<String> = (0..BODY_COUNT)
                .map(|i| {
                    let x = position(state, i);
                    format!("({:+.6}, {:+.6})", x.x, x.y)
                })
                .collect();
            println!("frame {:6}  t = {:9.4}  {}", playback.frame(), t, positions.join("  "));
        }
        playback.advance();
    }

    Ok(())
}
