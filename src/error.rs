//! Error types for beamsim.
//!
//! Only setup and I/O can fail. Geometry and the sensor model are total, and
//! estimator failures are reported as values on `EstimateResult` rather than
//! as errors, so a batch never aborts on a single bad shot.

use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::BeamId;

/// Configuration errors, raised before any simulation runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A dimension or rate that must be strictly positive.
    #[error("'{field}' must be positive, got {value}")]
    NonPositive {
        /// Name of the offending setting.
        field: String,
        /// Value that was rejected.
        value: f64,
    },

    /// A parameter that must be zero or more.
    #[error("'{field}' must not be negative, got {value}")]
    Negative {
        /// Name of the offending setting.
        field: String,
        /// Value that was rejected.
        value: f64,
    },

    /// A `[min, max]` pair with `min > max` or a non-finite bound.
    #[error("Invalid range for '{field}': min ({min}) must not exceed max ({max})")]
    InvalidRange {
        /// Name of the range.
        field: String,
        /// Configured lower bound.
        min: f64,
        /// Configured upper bound.
        max: f64,
    },

    /// A probability outside `[0, 1]`.
    #[error("Probability {value} is out of range [0.0, 1.0]")]
    ProbabilityOutOfRange {
        /// Value that was rejected.
        value: f64,
    },

    /// The beam list is empty.
    #[error("At least one beam must be configured")]
    NoBeams,

    /// Two beams share an id.
    #[error("Beam id {id} is used more than once")]
    DuplicateBeamId {
        /// The repeated id.
        id: BeamId,
    },

    /// A beam whose endpoints coincide.
    #[error("Beam {id} has coincident endpoints")]
    DegenerateBeam {
        /// Id of the zero-length beam.
        id: BeamId,
    },

    /// One of the two beams the estimators time is not configured.
    #[error("Timing beam {id} is not configured")]
    MissingTimingBeam {
        /// Id the estimators expect.
        id: BeamId,
    },

    /// `beam_spacing` disagrees with the distance between the timing beams.
    #[error("beam_spacing {configured} does not match the {measured} m between timing beams")]
    SpacingMismatch {
        /// The `beam_spacing` setting.
        configured: f64,
        /// Distance between the midpoints of beams 1 and 2.
        measured: f64,
    },

    /// The spawn margin is wider than half the goal.
    #[error("Ball margin {margin} leaves no room inside a goal of half-width {half_width}")]
    LateralMarginExceedsGoal {
        /// Half the goal width.
        half_width: f64,
        /// Lateral margin required by the ball radius.
        margin: f64,
    },

    /// A polynomial ratio mapping with no coefficients.
    #[error("Polynomial ratio mapping requires at least one coefficient")]
    MissingPolynomialCoefficients,

    /// A coefficient that does not parse as a number.
    #[error("Invalid polynomial coefficient '{raw}'")]
    InvalidCoefficient {
        /// The unparsable text.
        raw: String,
    },

    /// A ratio mapping name other than default, zero or poly.
    #[error("Unknown ratio mapping '{name}' (expected default, zero or poly)")]
    UnknownRatioMapping {
        /// The name given.
        name: String,
    },

    /// A config file that cannot be read or parsed.
    #[error("Failed to load config file {path:?}: {message}")]
    ConfigFile {
        /// Path of the file.
        path: PathBuf,
        /// Read or parse error text.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn non_positive(field: &str, value: f64) -> Self {
        Self::NonPositive {
            field: field.to_string(),
            value,
        }
    }

    pub(crate) fn negative(field: &str, value: f64) -> Self {
        Self::Negative {
            field: field.to_string(),
            value,
        }
    }

    pub(crate) fn invalid_range(field: &str, min: f64, max: f64) -> Self {
        Self::InvalidRange {
            field: field.to_string(),
            min,
            max,
        }
    }
}

/// Errors writing simulation results to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Creating or writing the output file failed.
    #[error("Failed to write {path:?}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for beamsim.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing results failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl SimError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an export error.
    #[must_use]
    pub const fn is_export(&self) -> bool {
        matches!(self, Self::Export(_))
    }
}

/// Result type alias for beamsim operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_message() {
        let err = ConfigError::non_positive("ball_radius", -0.5);
        let msg = format!("{err}");
        assert!(msg.contains("ball_radius"));
        assert!(msg.contains("-0.5"));
    }

    #[test]
    fn test_invalid_range_message() {
        let err = ConfigError::invalid_range("speed", 25.0, 8.0);
        let msg = format!("{err}");
        assert!(msg.contains("speed"));
        assert!(msg.contains("25"));
        assert!(msg.contains('8'));
    }

    #[test]
    fn test_duplicate_beam_message() {
        let err = ConfigError::DuplicateBeamId { id: BeamId::new(2) };
        assert!(format!("{err}").contains("Beam id 2"));
    }

    #[test]
    fn test_spacing_mismatch_message() {
        let err = ConfigError::SpacingMismatch {
            configured: 0.05,
            measured: 0.2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("0.05"));
        assert!(msg.contains("0.2"));
    }

    #[test]
    fn test_sim_error_from_config() {
        let err: SimError = ConfigError::MissingPolynomialCoefficients.into();
        assert!(err.is_config());
        assert!(!err.is_export());
        assert!(format!("{err}").contains("coefficient"));
    }

    #[test]
    fn test_sim_error_from_export() {
        let err: SimError = ExportError::Io {
            path: PathBuf::from("/nonexistent/out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(err.is_export());
        assert!(format!("{err}").contains("out.csv"));
    }
}
