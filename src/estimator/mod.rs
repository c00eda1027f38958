//! Speed estimators.
//!
//! An estimator reads the ordered edge events of one shot and reconstructs
//! the ball speed. Failure is a normal outcome (a beam was missed, or the
//! edges are out of order) and is reported on the result as a NaN speed plus
//! a reason, never as an error: a batch keeps going regardless.

pub mod friend;
pub mod tof;

pub use friend::{FriendEstimator, RatioMapping};
pub use tof::TofEstimator;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::sensor::Event;

/// Names of the diagnostic values estimators attach to their results.
pub mod detail {
    /// Time between the beam-1 and beam-2 edges.
    pub const DELTA_T: &str = "delta_t";
    /// Blocked duration of beam 1.
    pub const T_BLOCK1: &str = "t_block1";
    /// Blocked duration of beam 2.
    pub const T_BLOCK2: &str = "t_block2";
    /// `t_block1 / t_block2`.
    pub const RATIO: &str = "ratio";
    /// Approach angle inferred from the ratio, in radians.
    pub const THETA_EST: &str = "theta_est";
}

/// Why an estimate could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A required edge was never reported.
    MissingEdge,
    /// Beam 2 fired at or before beam 1.
    NonPositiveDeltaT,
    /// Beam 2 was blocked for zero time; the duration ratio is undefined.
    ZeroBlockTime,
}

impl FailureReason {
    /// Stable tag used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingEdge => "missing_edge",
            Self::NonPositiveDeltaT => "non_positive_delta_t",
            Self::ZeroBlockTime => "zero_block_time",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one estimator on one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    /// Name of the estimator that produced this result.
    pub name: String,
    /// Estimated speed in m/s; NaN when `reason` is set.
    pub v_est: f64,
    /// Named intermediate values, for analysis.
    pub details: BTreeMap<String, f64>,
    /// Set when no estimate could be made.
    pub reason: Option<FailureReason>,
}

impl EstimateResult {
    /// A successful estimate.
    #[must_use]
    pub fn success(name: &str, v_est: f64, details: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            v_est,
            details,
            reason: None,
        }
    }

    /// A failed estimate: NaN speed tagged with `reason`.
    #[must_use]
    pub fn failure(name: &str, reason: FailureReason, details: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            v_est: f64::NAN,
            details,
            reason: Some(reason),
        }
    }

    /// True when a speed was estimated.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.reason.is_none()
    }

    /// Looks up a diagnostic value by name.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<f64> {
        self.details.get(key).copied()
    }
}

/// Builds a details map from `(name, value)` pairs.
pub(crate) fn details<const N: usize>(pairs: [(&str, f64); N]) -> BTreeMap<String, f64> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// A speed estimator over one shot's ordered edge events.
pub trait Estimator {
    /// Short stable name, used in reports and CSV columns.
    fn name(&self) -> &str;

    /// Estimates the ball speed from `events`.
    ///
    /// Never panics; failures are reported through `EstimateResult::reason`.
    fn estimate(&self, events: &[Event], config: &SimulationConfig) -> EstimateResult;
}
