//! Two-beam time-of-flight estimator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{detail, details, EstimateResult, Estimator, FailureReason};
use crate::config::SimulationConfig;
use crate::geometry::BeamId;
use crate::sensor::{find_edge_time, EdgeKind, Event};

/// `v = beam_spacing / Δt`, with `Δt` between the same edge on both beams.
///
/// Assumes a perpendicular shot: an angled ball travels further than the beam
/// spacing between the two edges, so this under-reads off-axis shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TofEstimator {
    /// Beam crossed first.
    pub beam1: BeamId,
    /// Beam crossed second.
    pub beam2: BeamId,
    /// Which edge to time; falling edges by default.
    pub edge: EdgeKind,
}

impl TofEstimator {
    /// Name reported on results.
    pub const NAME: &'static str = "tof";

    /// Estimator timing falling edges on `beam1` then `beam2`.
    #[must_use]
    pub const fn new(beam1: BeamId, beam2: BeamId) -> Self {
        Self {
            beam1,
            beam2,
            edge: EdgeKind::Fall,
        }
    }

    /// Same beams, timing `edge` instead.
    #[must_use]
    pub const fn with_edge(mut self, edge: EdgeKind) -> Self {
        self.edge = edge;
        self
    }
}

impl Estimator for TofEstimator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn estimate(&self, events: &[Event], config: &SimulationConfig) -> EstimateResult {
        let (Some(t1), Some(t2)) = (
            find_edge_time(events, self.beam1, self.edge),
            find_edge_time(events, self.beam2, self.edge),
        ) else {
            return EstimateResult::failure(Self::NAME, FailureReason::MissingEdge, BTreeMap::new());
        };

        let delta_t = t2 - t1;
        if delta_t <= 0.0 {
            return EstimateResult::failure(
                Self::NAME,
                FailureReason::NonPositiveDeltaT,
                details([(detail::DELTA_T, delta_t)]),
            );
        }

        EstimateResult::success(
            Self::NAME,
            config.beam_spacing / delta_t,
            details([(detail::DELTA_T, delta_t)]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(spacing: f64) -> SimulationConfig {
        SimulationConfig::with_beam_spacing(spacing)
    }

    fn fall(id: u32, t: f64) -> Event {
        Event::new(BeamId::new(id), EdgeKind::Fall, t)
    }

    fn rise(id: u32, t: f64) -> Event {
        Event::new(BeamId::new(id), EdgeKind::Rise, t)
    }

    fn estimator() -> TofEstimator {
        TofEstimator::new(BeamId::new(1), BeamId::new(2))
    }

    #[test]
    fn test_four_meters_per_second() {
        let events = [fall(1, 0.100), fall(2, 0.150)];
        let result = estimator().estimate(&events, &config(0.20));
        assert!(result.is_ok());
        assert!((result.v_est - 4.0).abs() < 1e-12);
        assert!((result.detail(detail::DELTA_T).unwrap() - 0.05).abs() < 1e-15);
    }

    #[test]
    fn test_exact_with_dyadic_times() {
        let events = [fall(1, 0.25), fall(2, 0.3125)];
        let result = estimator().estimate(&events, &config(0.25));
        assert_eq!(result.v_est, 4.0);
    }

    #[test]
    fn test_missing_edge() {
        let events = [fall(1, 0.100)];
        let result = estimator().estimate(&events, &config(0.20));
        assert_eq!(result.reason, Some(FailureReason::MissingEdge));
        assert!(result.v_est.is_nan());
        assert!(result.details.is_empty());
    }

    #[test]
    fn test_non_positive_delta_t() {
        let events = [fall(2, 0.100), fall(1, 0.150)];
        let result = estimator().estimate(&events, &config(0.20));
        assert_eq!(result.reason, Some(FailureReason::NonPositiveDeltaT));
        assert!(result.v_est.is_nan());
        assert!(result.detail(detail::DELTA_T).unwrap() < 0.0);

        let simultaneous = [fall(1, 0.1), fall(2, 0.1)];
        let result = estimator().estimate(&simultaneous, &config(0.20));
        assert_eq!(result.reason, Some(FailureReason::NonPositiveDeltaT));
    }

    #[test]
    fn test_uses_first_matching_edge() {
        let events = [
            fall(1, 0.100),
            rise(1, 0.110),
            fall(1, 0.120),
            fall(2, 0.150),
            fall(2, 0.170),
        ];
        let result = estimator().estimate(&events, &config(0.20));
        assert!((result.v_est - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rise_edge_variant() {
        let events = [fall(1, 0.0), rise(1, 0.25), fall(2, 0.0625), rise(2, 0.3125)];
        let result = estimator()
            .with_edge(EdgeKind::Rise)
            .estimate(&events, &config(0.25));
        assert_eq!(result.v_est, 4.0);
        assert_eq!(result.name, "tof");
    }

    #[test]
    fn test_edge_variant_leaves_source_untouched() {
        let fall_timer = estimator();
        let rise_timer = fall_timer.with_edge(EdgeKind::Rise);
        assert_eq!(fall_timer.edge, EdgeKind::Fall);
        assert_eq!(rise_timer.edge, EdgeKind::Rise);

        let events = [fall(1, 0.0), rise(1, 0.25), fall(2, 0.0625), rise(2, 0.3125)];
        let spacing = config(0.25);
        assert_eq!(fall_timer.estimate(&events, &spacing).v_est, 4.0);
        assert_eq!(rise_timer.estimate(&events, &spacing).v_est, 4.0);
    }
}
