//! # beamsim - break-beam speed sensor simulator
//!
//! Simulates a ball shot into a foosball goal past two infrared break-beams,
//! and evaluates speed estimators against the known true speed.
//!
//! ## Core Concepts
//!
//! - **Interval**: Closed time windows, possibly unbounded, and the solvers
//!   that produce them
//! - **Beam**: A line segment the ball (a disc) occludes over a time window
//! - **SensorModel**: Latency, jitter, dropped pulses and polling between the
//!   ideal occlusion and the edges a microcontroller would see
//! - **Estimator**: Reconstructs speed from the measured edges; `tof` uses beam
//!   timing only, `friend` also uses the ratio of blocked durations
//!
//! ## Usage
//!
//! ```rust
//! use beamsim::{simulate_shot, seeded_rng, Estimator, Shot, SimulationConfig, TofEstimator};
//! use beamsim::{BeamId, SensorModel};
//!
//! let mut config = SimulationConfig::default();
//! config.sensor = SensorModel::ideal();
//! let (mut rng, _seed) = seeded_rng(Some(7));
//!
//! let shot = Shot::new(config.spawn_x(), 0.0, 12.0, 0.0);
//! let result = simulate_shot(shot, &config, &mut rng, 0.0);
//!
//! let tof = TofEstimator::new(BeamId::new(1), BeamId::new(2));
//! let estimate = tof.estimate(&result.events, &config);
//! assert!((estimate.v_est - 12.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core math
pub mod geometry;
pub mod interval;

// Sensor and shots
pub mod random;
pub mod sensor;
pub mod shot;
pub mod simulation;

// Estimation and runs
pub mod config;
pub mod error;
pub mod estimator;
pub mod experiment;
pub mod export;

// Re-export primary types at crate root for convenience
pub use config::{ExperimentConfig, RunConfig, RunMode, ShotDistribution, SimulationConfig};
pub use error::{ConfigError, ExportError, SimError, SimResult};
pub use estimator::{
    EstimateResult, Estimator, FailureReason, FriendEstimator, RatioMapping, TofEstimator,
};
pub use experiment::{run_batch, run_single, BatchReport, ErrorStats, SingleShotReport};
pub use export::{write_results_csv, ShotRow};
pub use geometry::{occlusion_interval, Beam, BeamId, Vec2};
pub use interval::Interval;
pub use random::seeded_rng;
pub use sensor::{BeamInterval, EdgeKind, EdgeTimes, EdgeWindow, Event, SensorModel};
pub use shot::{sample_shot, Shot};
pub use simulation::{simulate_shot, ShotResult};
