//! Duration-ratio ("friend") estimator.
//!
//! An angled ball crosses the two beams at different lateral positions, and
//! near the goal posts the time it spends blocking each beam differs. The
//! ratio of the two block durations is mapped to an approach angle `θ`, and
//! the time-of-flight speed is corrected by `1 / cos θ` for the longer
//! diagonal path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{detail, details, EstimateResult, Estimator, FailureReason};
use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::geometry::BeamId;
use crate::sensor::{find_edge_time, EdgeKind, Event};

/// Maps a block-duration ratio `r = t_block1 / t_block2` to an angle in radians.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RatioMapping {
    /// Always `θ = 0`; the estimator then reduces to time-of-flight.
    #[default]
    Zero,

    /// `θ = Σ coefficients[i] · rⁱ`.
    ///
    /// Validation rules:
    /// - At least one coefficient is required.
    Polynomial {
        /// Coefficients, constant term first.
        coefficients: Vec<f64>,
    },
}

impl RatioMapping {
    /// Create a validated `Polynomial` mapping.
    pub fn polynomial(coefficients: Vec<f64>) -> Result<Self, ConfigError> {
        if coefficients.is_empty() {
            return Err(ConfigError::MissingPolynomialCoefficients);
        }
        Ok(Self::Polynomial { coefficients })
    }

    /// Validate a mapping built without `polynomial` (e.g. deserialized).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Polynomial { coefficients } if coefficients.is_empty() => {
                Err(ConfigError::MissingPolynomialCoefficients)
            }
            _ => Ok(()),
        }
    }

    /// Estimated approach angle for ratio `r`.
    ///
    /// Terms are summed constant term first, each power taken with `powf`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn theta(&self, r: f64) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Polynomial { coefficients } => coefficients
                .iter()
                .enumerate()
                .map(|(power, coef)| coef * r.powf(power as f64))
                .fold(0.0, |acc, term| acc + term),
        }
    }

    /// Returns a short stable identifier suitable for logging/debugging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Polynomial { .. } => "poly",
        }
    }
}

/// Resolves a mapping selection by name.
///
/// `default` and `zero` select [`RatioMapping::Zero`]; `poly` requires
/// `coefficients`.
pub fn build_ratio_mapping(
    mode: &str,
    coefficients: Option<Vec<f64>>,
) -> Result<RatioMapping, ConfigError> {
    match mode {
        "default" | "zero" => Ok(RatioMapping::Zero),
        "poly" => RatioMapping::polynomial(coefficients.unwrap_or_default()),
        other => Err(ConfigError::UnknownRatioMapping {
            name: other.to_string(),
        }),
    }
}

/// Parses a comma separated coefficient list such as `"0.1,-0.2,0.05"`.
pub fn parse_coefficients(raw: &str) -> Result<Vec<f64>, ConfigError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidCoefficient {
                    raw: part.to_string(),
                })
        })
        .collect()
}

/// Block-duration ratio estimator with a pluggable ratio-to-angle mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendEstimator {
    /// Beam crossed first.
    pub beam1: BeamId,
    /// Beam crossed second.
    pub beam2: BeamId,
    /// Ratio-to-angle mapping.
    pub mapping: RatioMapping,
}

impl FriendEstimator {
    /// Name reported on results.
    pub const NAME: &'static str = "friend";

    /// Estimator over `beam1` then `beam2`.
    #[must_use]
    pub const fn new(beam1: BeamId, beam2: BeamId, mapping: RatioMapping) -> Self {
        Self {
            beam1,
            beam2,
            mapping,
        }
    }
}

impl Estimator for FriendEstimator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn estimate(&self, events: &[Event], config: &SimulationConfig) -> EstimateResult {
        let edges = (
            find_edge_time(events, self.beam1, EdgeKind::Fall),
            find_edge_time(events, self.beam1, EdgeKind::Rise),
            find_edge_time(events, self.beam2, EdgeKind::Fall),
            find_edge_time(events, self.beam2, EdgeKind::Rise),
        );
        let (Some(t_fall1), Some(t_rise1), Some(t_fall2), Some(t_rise2)) = edges else {
            return EstimateResult::failure(Self::NAME, FailureReason::MissingEdge, BTreeMap::new());
        };

        let t_block1 = t_rise1 - t_fall1;
        let t_block2 = t_rise2 - t_fall2;
        let delta_t = t_fall2 - t_fall1;
        if delta_t <= 0.0 {
            return EstimateResult::failure(
                Self::NAME,
                FailureReason::NonPositiveDeltaT,
                details([(detail::DELTA_T, delta_t)]),
            );
        }
        if t_block2 == 0.0 {
            return EstimateResult::failure(
                Self::NAME,
                FailureReason::ZeroBlockTime,
                details([(detail::T_BLOCK2, t_block2)]),
            );
        }

        let ratio = t_block1 / t_block2;
        let theta_est = self.mapping.theta(ratio);
        let v_est = (config.beam_spacing / delta_t) / theta_est.cos();

        EstimateResult::success(
            Self::NAME,
            v_est,
            details([
                (detail::T_BLOCK1, t_block1),
                (detail::T_BLOCK2, t_block2),
                (detail::DELTA_T, delta_t),
                (detail::RATIO, ratio),
                (detail::THETA_EST, theta_est),
            ]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::TofEstimator;

    fn events(fall1: f64, rise1: f64, fall2: f64, rise2: f64) -> Vec<Event> {
        let mut events = vec![
            Event::new(BeamId::new(1), EdgeKind::Fall, fall1),
            Event::new(BeamId::new(1), EdgeKind::Rise, rise1),
            Event::new(BeamId::new(2), EdgeKind::Fall, fall2),
            Event::new(BeamId::new(2), EdgeKind::Rise, rise2),
        ];
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        events
    }

    fn estimator(mapping: RatioMapping) -> FriendEstimator {
        FriendEstimator::new(BeamId::new(1), BeamId::new(2), mapping)
    }

    #[test]
    fn test_equal_blocks_zero_mapping_matches_tof() {
        let config = SimulationConfig::with_beam_spacing(0.25);
        let events = events(0.25, 0.265625, 0.3125, 0.328125);

        let friend = estimator(RatioMapping::Zero).estimate(&events, &config);
        let tof = TofEstimator::new(BeamId::new(1), BeamId::new(2)).estimate(&events, &config);

        assert!(friend.is_ok());
        assert_eq!(friend.detail(detail::RATIO), Some(1.0));
        assert_eq!(friend.detail(detail::THETA_EST), Some(0.0));
        assert_eq!(friend.v_est, 4.0);
        assert_eq!(friend.v_est, tof.v_est);
    }

    #[test]
    fn test_exposes_all_intermediates() {
        let config = SimulationConfig::with_beam_spacing(0.2);
        let events = events(0.100, 0.104, 0.150, 0.152);
        let result = estimator(RatioMapping::Zero).estimate(&events, &config);
        for key in [
            detail::T_BLOCK1,
            detail::T_BLOCK2,
            detail::DELTA_T,
            detail::RATIO,
            detail::THETA_EST,
        ] {
            assert!(result.detail(key).is_some(), "missing detail {key}");
        }
        assert!((result.detail(detail::RATIO).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_polynomial_mapping_corrects_speed() {
        let config = SimulationConfig::with_beam_spacing(0.25);
        let events = events(0.25, 0.265625, 0.3125, 0.328125);
        // theta = 0.5 regardless of r
        let mapping = RatioMapping::polynomial(vec![0.5]).unwrap();
        let result = estimator(mapping).estimate(&events, &config);
        assert!((result.v_est - 4.0 / 0.5_f64.cos()).abs() < 1e-12);
        assert_eq!(result.detail(detail::THETA_EST), Some(0.5));
    }

    #[test]
    fn test_missing_any_edge() {
        let config = SimulationConfig::default();
        let mut partial = events(0.1, 0.11, 0.15, 0.16);
        partial.retain(|e| !(e.beam_id == BeamId::new(2) && e.edge == EdgeKind::Rise));
        let result = estimator(RatioMapping::Zero).estimate(&partial, &config);
        assert_eq!(result.reason, Some(FailureReason::MissingEdge));
        assert!(result.v_est.is_nan());
    }

    #[test]
    fn test_reversed_falls() {
        let config = SimulationConfig::default();
        let events = events(0.15, 0.16, 0.10, 0.11);
        let result = estimator(RatioMapping::Zero).estimate(&events, &config);
        assert_eq!(result.reason, Some(FailureReason::NonPositiveDeltaT));
    }

    #[test]
    fn test_zero_block_time_on_beam2() {
        let config = SimulationConfig::default();
        let events = events(0.10, 0.11, 0.15, 0.15);
        let result = estimator(RatioMapping::Zero).estimate(&events, &config);
        assert_eq!(result.reason, Some(FailureReason::ZeroBlockTime));
        assert_eq!(result.detail(detail::T_BLOCK2), Some(0.0));
        assert!(result.v_est.is_nan());
    }

    #[test]
    fn test_polynomial_theta_evaluation() {
        let mapping = RatioMapping::polynomial(vec![1.0, 2.0, 3.0]).unwrap();
        // 1 + 2*2 + 3*4
        assert_eq!(mapping.theta(2.0), 17.0);
        assert_eq!(mapping.theta(0.0), 1.0);
        assert_eq!(RatioMapping::Zero.theta(123.0), 0.0);
    }

    #[test]
    fn test_polynomial_theta_sums_powers_in_order() {
        let coefficients = vec![0.1, -0.3, 0.07];
        let r = 1.37_f64;
        let expected = 0.0 + 0.1 * r.powf(0.0) + -0.3 * r.powf(1.0) + 0.07 * r.powf(2.0);
        let mapping = RatioMapping::polynomial(coefficients).unwrap();
        assert_eq!(mapping.theta(r).to_bits(), expected.to_bits());
    }

    #[test]
    fn test_build_ratio_mapping() {
        assert_eq!(build_ratio_mapping("default", None).unwrap(), RatioMapping::Zero);
        assert_eq!(build_ratio_mapping("zero", Some(vec![1.0])).unwrap(), RatioMapping::Zero);
        assert_eq!(
            build_ratio_mapping("poly", Some(vec![0.0, 0.1])).unwrap(),
            RatioMapping::Polynomial {
                coefficients: vec![0.0, 0.1]
            }
        );
        assert!(matches!(
            build_ratio_mapping("poly", None),
            Err(ConfigError::MissingPolynomialCoefficients)
        ));
        assert!(matches!(
            build_ratio_mapping("spline", None),
            Err(ConfigError::UnknownRatioMapping { .. })
        ));
    }

    #[test]
    fn test_parse_coefficients() {
        assert_eq!(parse_coefficients("0.1, -0.2,3").unwrap(), vec![0.1, -0.2, 3.0]);
        assert!(matches!(
            parse_coefficients("0.1,abc"),
            Err(ConfigError::InvalidCoefficient { .. })
        ));
    }

    #[test]
    fn test_mapping_serde_tagged() {
        let mapping = RatioMapping::polynomial(vec![0.0, 0.25]).unwrap();
        let json = serde_json::to_string(&mapping).unwrap();
        assert!(json.contains("\"type\":\"polynomial\""));
        let back: RatioMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);

        let empty: RatioMapping =
            serde_json::from_str(r#"{"type":"polynomial","coefficients":[]}"#).unwrap();
        assert!(empty.validate().is_err());
    }
}
