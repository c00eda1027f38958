//! beamsim command-line runner
//!
//! Runs a single reported shot or a batch of shots through the two-beam
//! simulator and prints the estimator accuracy.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use beamsim::config::build_default_beams;
use beamsim::estimator::friend::{build_ratio_mapping, parse_coefficients};
use beamsim::{run_batch, run_single, write_results_csv, RunConfig, RunMode};

/// Break-beam speed sensor simulator
#[derive(Parser, Debug)]
#[command(name = "beamsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON run config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one reported shot or a batch
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Number of shots in batch mode
    #[arg(short, long)]
    n_shots: Option<usize>,

    /// RNG seed (drawn and logged when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Distance between the two beams, in metres
    #[arg(long)]
    beam_spacing: Option<f64>,

    /// Goal mouth width, in metres
    #[arg(long)]
    goal_width: Option<f64>,

    /// Goal depth, in metres
    #[arg(long)]
    goal_depth: Option<f64>,

    /// Ball radius, in metres
    #[arg(long)]
    ball_radius: Option<f64>,

    /// Minimum shot speed, in m/s
    #[arg(long)]
    speed_min: Option<f64>,

    /// Maximum shot speed, in m/s
    #[arg(long)]
    speed_max: Option<f64>,

    /// Std of the normal heading distribution, in degrees
    #[arg(long)]
    angle_sigma: Option<f64>,

    /// Lower bound of a uniform heading range, in degrees
    #[arg(long, requires = "angle_max", allow_hyphen_values = true)]
    angle_min: Option<f64>,

    /// Upper bound of a uniform heading range, in degrees
    #[arg(long, requires = "angle_min", allow_hyphen_values = true)]
    angle_max: Option<f64>,

    /// Mean receiver latency on both edges, in milliseconds
    #[arg(long)]
    sensor_latency_ms: Option<f64>,

    /// Receiver jitter std on both edges, in milliseconds
    #[arg(long)]
    sensor_jitter_ms: Option<f64>,

    /// Poll the receivers at this rate instead of timestamping edges
    #[arg(long)]
    poll_rate_hz: Option<f64>,

    /// Probability that a whole pulse is lost
    #[arg(long)]
    miss_probability: Option<f64>,

    /// Pulses shorter than this are dropped, in milliseconds
    #[arg(long)]
    min_pulse_ms: Option<f64>,

    /// Ratio-to-angle mapping of the friend estimator (default, zero, poly)
    #[arg(long)]
    ratio_mapping: Option<String>,

    /// Polynomial coefficients for `--ratio-mapping poly`, lowest order first
    #[arg(long, allow_hyphen_values = true)]
    poly_coeffs: Option<String>,

    /// Write per-shot batch results to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Single,
    Batch,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => Self::Single,
            ModeArg::Batch => Self::Batch,
        }
    }
}

fn ms(value: f64) -> f64 {
    value / 1000.0
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(cli: &Cli, run: &mut RunConfig) -> anyhow::Result<()> {
    let sim = &mut run.simulation;
    let experiment = &mut run.experiment;

    if let Some(mode) = cli.mode {
        experiment.mode = mode.into();
    }
    if let Some(n_shots) = cli.n_shots {
        experiment.n_shots = n_shots;
    }
    if cli.seed.is_some() {
        experiment.seed = cli.seed;
    }

    let relayout = cli.goal_width.is_some() || cli.beam_spacing.is_some();
    if let Some(width) = cli.goal_width {
        sim.goal_width = width;
    }
    if let Some(spacing) = cli.beam_spacing {
        sim.beam_spacing = spacing;
        sim.beam_x2 = sim.beam_x1 + spacing;
    }
    if relayout {
        debug!(
            goal_width = sim.goal_width,
            beam_x1 = sim.beam_x1,
            beam_x2 = sim.beam_x2,
            "rebuilding beam layout"
        );
        sim.beams = build_default_beams(sim.goal_width, sim.beam_x1, sim.beam_x2);
    }
    if let Some(depth) = cli.goal_depth {
        sim.goal_depth = depth;
    }
    if let Some(radius) = cli.ball_radius {
        sim.ball_radius = radius;
    }

    if let Some(latency) = cli.sensor_latency_ms {
        sim.sensor.fall_latency_mean = ms(latency);
        sim.sensor.rise_latency_mean = ms(latency);
    }
    if let Some(jitter) = cli.sensor_jitter_ms {
        sim.sensor.fall_jitter_std = ms(jitter);
        sim.sensor.rise_jitter_std = ms(jitter);
    }
    if let Some(p) = cli.miss_probability {
        sim.sensor.miss_probability = p;
    }
    if let Some(width) = cli.min_pulse_ms {
        sim.sensor.min_pulse_width = ms(width);
    }

    let shots = &mut experiment.shots;
    if let Some(min) = cli.speed_min {
        shots.speed_min = min;
    }
    if let Some(max) = cli.speed_max {
        shots.speed_max = max;
    }
    if let Some(sigma) = cli.angle_sigma {
        shots.angle_sigma = Some(sigma.to_radians());
    }
    if let (Some(min), Some(max)) = (cli.angle_min, cli.angle_max) {
        shots.angle_min = Some(min.to_radians());
        shots.angle_max = Some(max.to_radians());
    }

    if let Some(rate) = cli.poll_rate_hz {
        experiment.poll_rate_hz = rate;
    }
    if let Some(mode) = &cli.ratio_mapping {
        let coefficients = cli.poly_coeffs.as_deref().map(parse_coefficients).transpose()?;
        experiment.ratio_mapping = build_ratio_mapping(mode, coefficients)?;
    }
    if cli.export_csv.is_some() {
        experiment.export_csv.clone_from(&cli.export_csv);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut run = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    apply_overrides(&cli, &mut run)?;
    run.validate()?;

    match run.experiment.mode {
        RunMode::Single => {
            let report = run_single(&run.simulation, &run.experiment)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report.result)?);
            } else {
                print!("{report}");
            }
        }
        RunMode::Batch => {
            let report = run_batch(&run.simulation, &run.experiment)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
            if let Some(path) = &run.experiment.export_csv {
                write_results_csv(path, &report.rows)
                    .with_context(|| format!("exporting {} shots", report.rows.len()))?;
                info!(path = %path.display(), rows = report.rows.len(), "wrote results CSV");
            }
        }
    }

    Ok(())
}
