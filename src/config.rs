//! Run configuration: goal and beam layout, sensor, and experiment settings.
//!
//! All lengths are meters, times seconds and angles radians. The CLI accepts
//! milliseconds and degrees and converts on the way in.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::estimator::RatioMapping;
use crate::geometry::{Beam, BeamId, Vec2};
use crate::sensor::SensorModel;

/// Goal mouth width.
pub const DEFAULT_GOAL_WIDTH: f64 = 0.20;
/// Goal depth.
pub const DEFAULT_GOAL_DEPTH: f64 = 0.10;
/// Foosball radius.
pub const DEFAULT_BALL_RADIUS: f64 = 0.017;
/// x of the first beam, measured into the goal from the mouth.
pub const DEFAULT_BEAM_X1: f64 = 0.02;
/// Distance from the first beam to the second.
pub const DEFAULT_BEAM_SPACING: f64 = 0.20;

/// Mean receiver latency on both edges.
pub const DEFAULT_SENSOR_LATENCY: f64 = 0.002;
/// Receiver jitter std on both edges.
pub const DEFAULT_SENSOR_JITTER: f64 = 0.0002;

/// Slowest sampled shot, m/s.
pub const DEFAULT_SPEED_MIN: f64 = 8.0;
/// Fastest sampled shot, m/s.
pub const DEFAULT_SPEED_MAX: f64 = 25.0;
/// Heading spread, in degrees.
pub const DEFAULT_ANGLE_SIGMA_DEG: f64 = 15.0;
/// Shots per batch.
pub const DEFAULT_N_SHOTS: usize = 500;

/// Beam the estimators take as the first crossing.
pub const TIMING_BEAM_1: BeamId = BeamId::new(1);
/// Beam the estimators take as the second crossing.
pub const TIMING_BEAM_2: BeamId = BeamId::new(2);

/// Allowed gap between `beam_spacing` and the measured timing-beam distance.
pub const SPACING_TOLERANCE: f64 = 1e-9;

/// Shots spawn this far before the nearer beam.
pub const SPAWN_OFFSET: f64 = 0.05;

/// Lateral spawn margin, as a multiple of the ball radius.
pub const LATERAL_MARGIN_FACTOR: f64 = 1.1;

/// Two vertical beams spanning the goal mouth at `x1` and `x2`, ids 1 and 2.
#[must_use]
pub fn build_default_beams(goal_width: f64, x1: f64, x2: f64) -> Vec<Beam> {
    let half_w = goal_width / 2.0;
    vec![
        Beam::new(TIMING_BEAM_1, Vec2::new(x1, -half_w), Vec2::new(x1, half_w)),
        Beam::new(TIMING_BEAM_2, Vec2::new(x2, -half_w), Vec2::new(x2, half_w)),
    ]
}

/// Physical layout of the goal, ball, beams and receivers.
///
/// Fields missing from a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Goal mouth width; beams span it.
    pub goal_width: f64,
    /// Goal depth.
    pub goal_depth: f64,
    /// Ball radius.
    pub ball_radius: f64,
    /// Distance between the two timing beams, used by the estimators.
    pub beam_spacing: f64,
    /// x of beam 1, used for spawning and lateral reporting.
    pub beam_x1: f64,
    /// x of beam 2.
    pub beam_x2: f64,
    /// All beams; must include the two timing beams.
    pub beams: Vec<Beam>,
    /// Receiver behaviour.
    pub sensor: SensorModel,
}

impl SimulationConfig {
    /// Default goal with two vertical beams `beam_spacing` apart.
    #[must_use]
    pub fn with_beam_spacing(beam_spacing: f64) -> Self {
        Self::new(
            DEFAULT_GOAL_WIDTH,
            DEFAULT_GOAL_DEPTH,
            DEFAULT_BALL_RADIUS,
            beam_spacing,
            SensorModel::default(),
        )
    }

    /// Builds the standard two-beam layout: beam 1 at `DEFAULT_BEAM_X1`,
    /// beam 2 `beam_spacing` further in.
    #[must_use]
    pub fn new(
        goal_width: f64,
        goal_depth: f64,
        ball_radius: f64,
        beam_spacing: f64,
        sensor: SensorModel,
    ) -> Self {
        let beam_x1 = DEFAULT_BEAM_X1;
        let beam_x2 = beam_x1 + beam_spacing;
        Self {
            goal_width,
            goal_depth,
            ball_radius,
            beam_spacing,
            beam_x1,
            beam_x2,
            beams: build_default_beams(goal_width, beam_x1, beam_x2),
            sensor,
        }
    }

    /// Half the goal width less the lateral spawn margin.
    #[must_use]
    pub fn lateral_limit(&self) -> f64 {
        self.goal_width / 2.0 - self.ball_radius * LATERAL_MARGIN_FACTOR
    }

    /// x of the spawn point, just before the nearer beam.
    #[must_use]
    pub fn spawn_x(&self) -> f64 {
        self.beam_x1.min(self.beam_x2) - SPAWN_OFFSET
    }

    /// Beam with the given id, if configured.
    #[must_use]
    pub fn beam(&self, id: BeamId) -> Option<&Beam> {
        self.beams.iter().find(|beam| beam.id == id)
    }

    /// Validate the layout.
    ///
    /// This must be called before simulating any shot. Beams 1 and 2 must
    /// both exist, and `beam_spacing` must match the distance between their
    /// midpoints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("goal_width", self.goal_width),
            ("goal_depth", self.goal_depth),
            ("ball_radius", self.ball_radius),
            ("beam_spacing", self.beam_spacing),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::non_positive(field, value));
            }
        }

        if self.lateral_limit() < 0.0 {
            return Err(ConfigError::LateralMarginExceedsGoal {
                half_width: self.goal_width / 2.0,
                margin: self.ball_radius * LATERAL_MARGIN_FACTOR,
            });
        }

        if self.beams.is_empty() {
            return Err(ConfigError::NoBeams);
        }
        let mut seen: HashSet<BeamId> = HashSet::with_capacity(self.beams.len());
        for beam in &self.beams {
            if !seen.insert(beam.id) {
                return Err(ConfigError::DuplicateBeamId { id: beam.id });
            }
            if beam.length_squared() == 0.0 {
                return Err(ConfigError::DegenerateBeam { id: beam.id });
            }
        }

        let first = self
            .beam(TIMING_BEAM_1)
            .ok_or(ConfigError::MissingTimingBeam { id: TIMING_BEAM_1 })?;
        let second = self
            .beam(TIMING_BEAM_2)
            .ok_or(ConfigError::MissingTimingBeam { id: TIMING_BEAM_2 })?;
        let measured = (second.midpoint() - first.midpoint()).norm_squared().sqrt();
        if (measured - self.beam_spacing).abs() > SPACING_TOLERANCE {
            return Err(ConfigError::SpacingMismatch {
                configured: self.beam_spacing,
                measured,
            });
        }

        self.sensor.validate()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::with_beam_spacing(DEFAULT_BEAM_SPACING)
    }
}

/// How shot speed and heading are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotDistribution {
    /// Lower speed bound, m/s.
    pub speed_min: f64,
    /// Upper speed bound, m/s.
    pub speed_max: f64,
    /// Uniform heading range; used only when both bounds are set.
    #[serde(default)]
    pub angle_min: Option<f64>,
    /// Upper end of the uniform heading range.
    #[serde(default)]
    pub angle_max: Option<f64>,
    /// Std of a zero-mean normal heading, used when no range is set.
    #[serde(default)]
    pub angle_sigma: Option<f64>,
}

impl ShotDistribution {
    /// Fixed heading along +x.
    #[must_use]
    pub const fn straight(speed_min: f64, speed_max: f64) -> Self {
        Self {
            speed_min,
            speed_max,
            angle_min: None,
            angle_max: None,
            angle_sigma: None,
        }
    }

    /// Validate the distribution.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed_min >= 0.0) {
            return Err(ConfigError::negative("speed_min", self.speed_min));
        }
        if !(self.speed_min <= self.speed_max) || !self.speed_max.is_finite() {
            return Err(ConfigError::invalid_range("speed", self.speed_min, self.speed_max));
        }
        if let (Some(min), Some(max)) = (self.angle_min, self.angle_max) {
            if !(min <= max) || !min.is_finite() || !max.is_finite() {
                return Err(ConfigError::invalid_range("angle", min, max));
            }
        }
        if let Some(sigma) = self.angle_sigma {
            if !(sigma >= 0.0) {
                return Err(ConfigError::negative("angle_sigma", sigma));
            }
        }
        Ok(())
    }
}

impl Default for ShotDistribution {
    fn default() -> Self {
        Self {
            speed_min: DEFAULT_SPEED_MIN,
            speed_max: DEFAULT_SPEED_MAX,
            angle_min: None,
            angle_max: None,
            angle_sigma: Some(DEFAULT_ANGLE_SIGMA_DEG.to_radians()),
        }
    }
}

/// Whether to run one reported shot or a batch of statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One shot with a detailed report.
    Single,
    /// Many shots with error statistics.
    #[default]
    Batch,
}

/// Settings of one experiment run.
///
/// Fields missing from a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Shots per batch.
    pub n_shots: usize,
    /// RNG seed; drawn from OS entropy (and logged) when absent.
    pub seed: Option<u64>,
    /// Speed and heading distribution.
    pub shots: ShotDistribution,
    /// Digital polling rate; 0 means continuous edge timestamps.
    pub poll_rate_hz: f64,
    /// Single shot or batch.
    pub mode: RunMode,
    /// Ratio-to-angle mapping of the friend estimator.
    pub ratio_mapping: RatioMapping,
    /// Write per-shot rows here after a batch run.
    pub export_csv: Option<PathBuf>,
}

impl ExperimentConfig {
    /// Validate the experiment settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shots.validate()?;
        if !(self.poll_rate_hz >= 0.0) || !self.poll_rate_hz.is_finite() {
            return Err(ConfigError::negative("poll_rate_hz", self.poll_rate_hz));
        }
        self.ratio_mapping.validate()
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_shots: DEFAULT_N_SHOTS,
            seed: None,
            shots: ShotDistribution::default(),
            poll_rate_hz: 0.0,
            mode: RunMode::default(),
            ratio_mapping: RatioMapping::default(),
            export_csv: None,
        }
    }
}

/// A complete run description, as stored in a JSON config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Goal, beams and sensor.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Shot distribution and run settings.
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

impl RunConfig {
    /// Loads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigFile` if the file cannot be read or parsed,
    /// or the first validation error of its contents.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate both sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.experiment.validate()
    }
}
