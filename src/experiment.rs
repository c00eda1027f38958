//! Experiment runners: one reported shot, or a batch with error statistics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ExperimentConfig, SimulationConfig, TIMING_BEAM_1, TIMING_BEAM_2};
use crate::error::ConfigError;
use crate::estimator::{
    detail, EstimateResult, Estimator, FailureReason, FriendEstimator, TofEstimator,
};
use crate::export::ShotRow;
use crate::random::seeded_rng;
use crate::shot::sample_shot;
use crate::simulation::{simulate_shot, ShotResult};

/// Signed percent error of an estimate; NaN if either side is unusable.
#[must_use]
pub fn percent_error(v_est: f64, v_true: f64) -> f64 {
    if v_est.is_nan() || v_true == 0.0 {
        return f64::NAN;
    }
    (v_est - v_true) / v_true * 100.0
}

/// Linear-interpolated percentile of an ascending, non-empty slice.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Summary of absolute percent errors over the shots that produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Mean absolute percent error.
    pub mean_abs: f64,
    /// Median absolute percent error.
    pub median_abs: f64,
    /// 90th percentile of absolute percent error.
    pub p90: f64,
    /// 95th percentile of absolute percent error.
    pub p95: f64,
    /// Largest absolute percent error.
    pub worst: f64,
    /// Number of non-NaN errors the statistics were computed from.
    pub samples: usize,
}

impl ErrorStats {
    /// Computes statistics over the non-NaN entries of `errors`.
    ///
    /// All statistics are NaN when there is no usable entry.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_errors(errors: &[f64]) -> Self {
        let mut abs: Vec<f64> = errors
            .iter()
            .filter(|e| !e.is_nan())
            .map(|e| e.abs())
            .collect();
        if abs.is_empty() {
            return Self {
                mean_abs: f64::NAN,
                median_abs: f64::NAN,
                p90: f64::NAN,
                p95: f64::NAN,
                worst: f64::NAN,
                samples: 0,
            };
        }
        abs.sort_by(f64::total_cmp);
        Self {
            mean_abs: abs.iter().sum::<f64>() / abs.len() as f64,
            median_abs: percentile(&abs, 50.0),
            p90: percentile(&abs, 90.0),
            p95: percentile(&abs, 95.0),
            worst: abs[abs.len() - 1],
            samples: abs.len(),
        }
    }
}

/// Batch outcome of one estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSummary {
    /// Estimator name.
    pub name: String,
    /// Signed percent error per shot, NaN where the estimate failed.
    pub errors: Vec<f64>,
    /// Statistics over `errors`.
    pub stats: ErrorStats,
    /// How many shots failed, by reason.
    pub failures: BTreeMap<FailureReason, usize>,
}

/// Result of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Seed the run used; replaying it reproduces the batch.
    pub seed: u64,
    /// Number of shots simulated.
    pub n_shots: usize,
    /// True heading per shot.
    pub angles: Vec<f64>,
    /// Lateral position at beam 1 per shot (NaN if it never gets there).
    pub lateral: Vec<f64>,
    /// Friend estimator block ratio per shot.
    pub ratios: Vec<f64>,
    /// One summary per estimator, TOF first.
    pub summaries: Vec<EstimatorSummary>,
    /// Per-shot CSV rows.
    pub rows: Vec<ShotRow>,
}

impl BatchReport {
    /// Summary of the estimator called `name`.
    #[must_use]
    pub fn summary(&self, name: &str) -> Option<&EstimatorSummary> {
        self.summaries.iter().find(|s| s.name == name)
    }
}

/// Result of a single reported shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleShotReport {
    /// Seed the run used.
    pub seed: u64,
    /// The simulated shot and its edges.
    pub result: ShotResult,
    /// Time-of-flight estimate.
    pub tof: EstimateResult,
    /// Block-ratio estimate.
    pub friend: EstimateResult,
}

fn build_estimators(experiment: &ExperimentConfig) -> (TofEstimator, FriendEstimator) {
    (
        TofEstimator::new(TIMING_BEAM_1, TIMING_BEAM_2),
        FriendEstimator::new(TIMING_BEAM_1, TIMING_BEAM_2, experiment.ratio_mapping.clone()),
    )
}

/// Samples, simulates and estimates one shot.
///
/// # Errors
///
/// Returns the first validation error of either configuration.
pub fn run_single(
    config: &SimulationConfig,
    experiment: &ExperimentConfig,
) -> Result<SingleShotReport, ConfigError> {
    config.validate()?;
    experiment.validate()?;

    let (mut rng, seed) = seeded_rng(experiment.seed);
    info!(seed, mode = "single", "starting run");

    let shot = sample_shot(&mut rng, config, &experiment.shots);
    let result = simulate_shot(shot, config, &mut rng, experiment.poll_rate_hz);

    let (tof, friend) = build_estimators(experiment);
    let tof = tof.estimate(&result.events, config);
    let friend = friend.estimate(&result.events, config);

    Ok(SingleShotReport {
        seed,
        result,
        tof,
        friend,
    })
}

/// Runs `experiment.n_shots` independent shots off one seeded generator.
///
/// # Errors
///
/// Returns the first validation error of either configuration.
pub fn run_batch(
    config: &SimulationConfig,
    experiment: &ExperimentConfig,
) -> Result<BatchReport, ConfigError> {
    config.validate()?;
    experiment.validate()?;

    let (mut rng, seed) = seeded_rng(experiment.seed);
    info!(
        seed,
        n_shots = experiment.n_shots,
        poll_rate_hz = experiment.poll_rate_hz,
        mapping = experiment.ratio_mapping.name(),
        "starting batch"
    );

    let (tof, friend) = build_estimators(experiment);
    let estimators: [&dyn Estimator; 2] = [&tof, &friend];

    let n = experiment.n_shots;
    let mut angles = Vec::with_capacity(n);
    let mut lateral = Vec::with_capacity(n);
    let mut ratios = Vec::with_capacity(n);
    let mut rows = Vec::with_capacity(n);
    let mut summaries: Vec<EstimatorSummary> = estimators
        .iter()
        .map(|e| EstimatorSummary {
            name: e.name().to_string(),
            errors: Vec::with_capacity(n),
            stats: ErrorStats::from_errors(&[]),
            failures: BTreeMap::new(),
        })
        .collect();

    for index in 0..n {
        let shot = sample_shot(&mut rng, config, &experiment.shots);
        let result = simulate_shot(shot, config, &mut rng, experiment.poll_rate_hz);
        let v_true = shot.speed();

        let estimates: Vec<EstimateResult> = estimators
            .iter()
            .map(|e| e.estimate(&result.events, config))
            .collect();

        debug!(
            shot = index,
            v_true,
            theta = shot.theta(),
            events = result.events.len(),
            "shot simulated"
        );

        for (summary, estimate) in summaries.iter_mut().zip(&estimates) {
            summary.errors.push(percent_error(estimate.v_est, v_true));
            if let Some(reason) = estimate.reason {
                debug!(shot = index, estimator = %summary.name, %reason, "estimate failed");
                *summary.failures.entry(reason).or_insert(0) += 1;
            }
        }

        let ratio = estimates[1].detail(detail::RATIO).unwrap_or(f64::NAN);
        angles.push(shot.theta());
        lateral.push(shot.y_at_beam(config.beam_x1).unwrap_or(f64::NAN));
        ratios.push(ratio);
        rows.push(ShotRow {
            x0: shot.x0,
            y0: shot.y0,
            vx: shot.vx,
            vy: shot.vy,
            v_true,
            theta_true: shot.theta(),
            tof_v_est: estimates[0].v_est,
            friend_v_est: estimates[1].v_est,
            ratio,
        });
    }

    for summary in &mut summaries {
        summary.stats = ErrorStats::from_errors(&summary.errors);
        if n > 0 && summary.stats.samples == 0 {
            warn!(estimator = %summary.name, "no shot produced a usable estimate");
        }
    }
    info!(n_shots = n, "batch complete");

    Ok(BatchReport {
        seed,
        n_shots: n,
        angles,
        lateral,
        ratios,
        summaries,
        rows,
    })
}

fn fmt_estimate(f: &mut fmt::Formatter<'_>, label: &str, estimate: &EstimateResult) -> fmt::Result {
    let status = estimate.reason.map_or("ok", FailureReason::as_str);
    write!(f, "    {label} v_est={:.3} m/s", estimate.v_est)?;
    if let Some(theta) = estimate.detail(detail::THETA_EST) {
        write!(f, " theta_est={theta:.3}")?;
    }
    writeln!(f, " ({status})")
}

impl fmt::Display for SingleShotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shot = &self.result.shot;
        writeln!(f, "Single-shot report (seed {})", self.seed)?;
        writeln!(f, "  true speed: {:.3} m/s", shot.speed())?;
        writeln!(f, "  true angle: {:.3} rad", shot.theta())?;
        writeln!(f, "  intervals (ideal):")?;
        for interval in &self.result.intervals {
            writeln!(
                f,
                "    beam {}: enter={:.6} exit={:.6}",
                interval.beam_id, interval.t_enter, interval.t_exit
            )?;
        }
        writeln!(f, "  measured edges:")?;
        for event in &self.result.events {
            writeln!(f, "    beam {} {} @ {:.6}", event.beam_id, event.edge, event.time)?;
        }
        writeln!(f, "  estimates:")?;
        fmt_estimate(f, "TOF", &self.tof)?;
        fmt_estimate(f, "Friend", &self.friend)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch summary ({} shots, seed {})", self.n_shots, self.seed)?;
        for summary in &self.summaries {
            let stats = &summary.stats;
            writeln!(f, "{}:", summary.name)?;
            writeln!(f, "  mean abs % error: {:.2}", stats.mean_abs)?;
            writeln!(f, "  median abs % error: {:.2}", stats.median_abs)?;
            writeln!(f, "  90th pct abs % error: {:.2}", stats.p90)?;
            writeln!(f, "  95th pct abs % error: {:.2}", stats.p95)?;
            writeln!(f, "  worst abs % error: {:.2}", stats.worst)?;
            for (reason, count) in &summary.failures {
                writeln!(f, "  failed ({reason}): {count}")?;
            }
        }
        Ok(())
    }
}
