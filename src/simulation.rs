//! One shot through the full pipeline: geometry, sensor, optional polling.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SimulationConfig;
use crate::geometry::Beam;
use crate::sensor::{apply_sensor_model, polling_events, BeamInterval, EdgeTimes, Event};
use crate::shot::Shot;

/// Everything one simulated shot produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotResult {
    /// The simulated shot.
    pub shot: Shot,
    /// Ideal occlusion windows, in beam configuration order.
    pub intervals: Vec<BeamInterval>,
    /// Measured edges fed to the estimators, in time order.
    pub events: Vec<Event>,
    /// Measured `[fall, rise]` per beam, before any polling.
    pub edge_times: EdgeTimes,
}

/// Ideal occlusion window of every beam the shot actually crosses.
#[must_use]
pub fn compute_beam_intervals(shot: &Shot, beams: &[Beam], radius: f64) -> Vec<BeamInterval> {
    beams
        .iter()
        .filter_map(|beam| {
            beam.occlusion_interval(shot.position(), shot.velocity(), radius)
                .map(|interval| BeamInterval {
                    beam_id: beam.id,
                    t_enter: interval.start,
                    t_exit: interval.end,
                })
        })
        .collect()
}

/// Simulates one shot.
///
/// With `poll_rate_hz > 0` the jittered edges are replaced by edges from
/// polling every beam until one poll period after the last measured rise.
/// A shot that never crosses a beam yields empty intervals and events.
pub fn simulate_shot<R: Rng + ?Sized>(
    shot: Shot,
    config: &SimulationConfig,
    rng: &mut R,
    poll_rate_hz: f64,
) -> ShotResult {
    let intervals = compute_beam_intervals(&shot, &config.beams, config.ball_radius);
    let (mut events, edge_times) = apply_sensor_model(&intervals, &config.sensor, rng);

    if poll_rate_hz > 0.0 {
        let last_rise = edge_times
            .values()
            .fold(0.0_f64, |acc, window| acc.max(window.rise));
        let t_end = last_rise + 1.0 / poll_rate_hz;
        events = polling_events(&config.beams, &edge_times, poll_rate_hz, t_end);
    }

    trace!(
        intervals = intervals.len(),
        events = events.len(),
        "simulated shot"
    );

    ShotResult {
        shot,
        intervals,
        events,
        edge_times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BeamId;
    use crate::random::seeded_rng;
    use crate::sensor::{EdgeKind, SensorModel};

    fn ideal_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.sensor = SensorModel::ideal();
        config
    }

    #[test]
    fn test_straight_shot_crosses_both_beams() {
        let config = ideal_config();
        let shot = Shot::new(config.spawn_x(), 0.0, 10.0, 0.0);
        let intervals = compute_beam_intervals(&shot, &config.beams, config.ball_radius);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].beam_id, BeamId::new(1));
        // Beam 1 at x = 0.02, ball starts at x = -0.03.
        assert!((intervals[0].t_enter - (0.05 - 0.017) / 10.0).abs() < 1e-12);
        assert!((intervals[0].width() - 2.0 * 0.017 / 10.0).abs() < 1e-12);
        assert!((intervals[1].t_enter - intervals[0].t_enter - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_ideal_pipeline_events() {
        let config = ideal_config();
        let (mut rng, _) = seeded_rng(Some(1));
        let shot = Shot::new(config.spawn_x(), 0.0, 10.0, 0.0);
        let result = simulate_shot(shot, &config, &mut rng, 0.0);

        assert_eq!(result.events.len(), 4);
        let kinds: Vec<(u32, EdgeKind)> = result
            .events
            .iter()
            .map(|e| (e.beam_id.get(), e.edge))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (1, EdgeKind::Fall),
                (1, EdgeKind::Rise),
                (2, EdgeKind::Fall),
                (2, EdgeKind::Rise),
            ]
        );
        assert_eq!(result.edge_times.len(), 2);
    }

    #[test]
    fn test_shot_away_from_goal_has_no_events() {
        let config = ideal_config();
        let (mut rng, _) = seeded_rng(Some(1));
        let shot = Shot::new(config.spawn_x(), 0.0, -10.0, 0.0);
        let result = simulate_shot(shot, &config, &mut rng, 0.0);
        assert!(result.intervals.is_empty());
        assert!(result.events.is_empty());
        assert!(result.edge_times.is_empty());
    }

    #[test]
    fn test_polling_replaces_events_but_keeps_edge_times() {
        let config = ideal_config();
        let (mut rng, _) = seeded_rng(Some(1));
        let shot = Shot::new(config.spawn_x(), 0.0, 2.0, 0.0);
        let result = simulate_shot(shot, &config, &mut rng, 1000.0);

        assert_eq!(result.events.len(), 4);
        for event in &result.events {
            let ticks = event.time * 1000.0;
            assert!((ticks - ticks.round()).abs() < 1e-6, "not on a poll tick: {}", event.time);
        }
        let window = result.edge_times[&BeamId::new(1)];
        assert_eq!(window.fall, result.intervals[0].t_enter);
    }

    #[test]
    fn test_polling_too_slow_sees_nothing() {
        let config = ideal_config();
        let (mut rng, _) = seeded_rng(Some(1));
        // 3.8 ms pulses against a 100 Hz poll that samples at 0, 10 ms, ...
        // Beam 1 is blocked over [3.7, 7.4] ms, beam 2 over [25.9, 29.7] ms.
        let shot = Shot::new(config.spawn_x(), 0.0, 9.0, 0.0);
        let result = simulate_shot(shot, &config, &mut rng, 100.0);
        assert_eq!(result.intervals.len(), 2);
        assert!(result.events.is_empty());
    }
}
