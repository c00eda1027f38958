//! Sensor model: ideal occlusion windows to measured edge events.
//!
//! A real break-beam receiver reports a falling edge when light is blocked
//! and a rising edge when it returns. Both edges arrive late and jittered,
//! short pulses can be filtered out by the receiver, and a pulse can be lost
//! outright. A polled digital input adds sample-rate quantization on top.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_SENSOR_JITTER, DEFAULT_SENSOR_LATENCY};
use crate::error::ConfigError;
use crate::geometry::{Beam, BeamId};
use crate::random::gaussian;

/// Latency, jitter and loss parameters of the receivers, in seconds.
///
/// Fields missing from a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorModel {
    /// Mean delay of the falling (blocked) edge.
    pub fall_latency_mean: f64,
    /// Mean delay of the rising (restored) edge.
    pub rise_latency_mean: f64,
    /// Standard deviation of the falling-edge jitter.
    pub fall_jitter_std: f64,
    /// Standard deviation of the rising-edge jitter.
    pub rise_jitter_std: f64,
    /// Probability that a whole pulse is lost.
    pub miss_probability: f64,
    /// Pulses shorter than this are never reported.
    pub min_pulse_width: f64,
}

impl SensorModel {
    /// Same latency and jitter on both edges, no losses.
    #[must_use]
    pub const fn symmetric(latency: f64, jitter: f64) -> Self {
        Self {
            fall_latency_mean: latency,
            rise_latency_mean: latency,
            fall_jitter_std: jitter,
            rise_jitter_std: jitter,
            miss_probability: 0.0,
            min_pulse_width: 0.0,
        }
    }

    /// A perfect receiver: no delay, no noise, nothing dropped.
    #[must_use]
    pub const fn ideal() -> Self {
        Self::symmetric(0.0, 0.0)
    }

    /// Validate the model.
    ///
    /// Jitter and pulse width must be non-negative and the miss probability
    /// must lie in `[0, 1]`. Latencies may be negative (a receiver that
    /// fires early relative to the geometric edge).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("fall_jitter_std", self.fall_jitter_std),
            ("rise_jitter_std", self.rise_jitter_std),
            ("min_pulse_width", self.min_pulse_width),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::negative(field, value));
            }
        }
        if !(0.0..=1.0).contains(&self.miss_probability) {
            return Err(ConfigError::ProbabilityOutOfRange {
                value: self.miss_probability,
            });
        }
        Ok(())
    }
}

impl Default for SensorModel {
    fn default() -> Self {
        Self::symmetric(DEFAULT_SENSOR_LATENCY, DEFAULT_SENSOR_JITTER)
    }
}

/// Noise-free occlusion window of one beam for one shot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamInterval {
    /// Occluded beam.
    pub beam_id: BeamId,
    /// Time the ball starts blocking the beam.
    pub t_enter: f64,
    /// Time the beam is clear again; may be infinite.
    pub t_exit: f64,
}

impl BeamInterval {
    /// Blocked duration.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.t_exit - self.t_enter
    }
}

/// Direction of a receiver output transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Light blocked; occlusion begins.
    Fall,
    /// Light restored; occlusion ends.
    Rise,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fall => write!(f, "fall"),
            Self::Rise => write!(f, "rise"),
        }
    }
}

/// One measured edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Beam that changed state.
    pub beam_id: BeamId,
    /// Direction of the change.
    pub edge: EdgeKind,
    /// Measured time, seconds after spawn.
    pub time: f64,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub const fn new(beam_id: BeamId, edge: EdgeKind, time: f64) -> Self {
        Self {
            beam_id,
            edge,
            time,
        }
    }
}

/// Measured `[fall, rise]` window of one beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWindow {
    /// Measured falling edge.
    pub fall: f64,
    /// Measured rising edge.
    pub rise: f64,
}

impl EdgeWindow {
    /// Whether the receiver reads blocked at time `t`.
    #[must_use]
    pub fn is_blocked_at(&self, t: f64) -> bool {
        self.fall <= t && t <= self.rise
    }
}

/// Measured edge windows keyed by beam.
pub type EdgeTimes = BTreeMap<BeamId, EdgeWindow>;

fn sort_by_time(events: &mut [Event]) {
    // Stable: simultaneous events keep insertion order.
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}

/// Turns ideal occlusion windows into measured edge events.
///
/// For each window, in order: drop it if narrower than `min_pulse_width`;
/// otherwise draw once for a miss; otherwise draw fall jitter then rise
/// jitter. A rise that would precede its fall is clamped onto it.
///
/// Returns the events of all beams sorted by time, and the measured window
/// per beam.
pub fn apply_sensor_model<R: Rng + ?Sized>(
    intervals: &[BeamInterval],
    sensor: &SensorModel,
    rng: &mut R,
) -> (Vec<Event>, EdgeTimes) {
    let mut events = Vec::with_capacity(intervals.len() * 2);
    let mut edge_times = EdgeTimes::new();

    for interval in intervals {
        if interval.width() < sensor.min_pulse_width {
            continue;
        }
        if rng.gen::<f64>() < sensor.miss_probability {
            continue;
        }

        let t_fall =
            interval.t_enter + sensor.fall_latency_mean + gaussian(rng, sensor.fall_jitter_std);
        let mut t_rise =
            interval.t_exit + sensor.rise_latency_mean + gaussian(rng, sensor.rise_jitter_std);
        if t_rise < t_fall {
            t_rise = t_fall;
        }

        events.push(Event::new(interval.beam_id, EdgeKind::Fall, t_fall));
        events.push(Event::new(interval.beam_id, EdgeKind::Rise, t_rise));
        edge_times.insert(
            interval.beam_id,
            EdgeWindow {
                fall: t_fall,
                rise: t_rise,
            },
        );
    }

    sort_by_time(&mut events);
    (events, edge_times)
}

/// Re-derives edge events by polling each beam's output at `poll_rate_hz`.
///
/// Samples are taken at `k / poll_rate_hz` from 0 up to and including
/// `t_end`. An event is emitted only when a beam's polled state differs from
/// its previous polled state (initially unblocked), so a pulse that falls
/// between two samples is never seen.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn polling_events(
    beams: &[Beam],
    edge_times: &EdgeTimes,
    poll_rate_hz: f64,
    t_end: f64,
) -> Vec<Event> {
    if !(poll_rate_hz > 0.0 && poll_rate_hz.is_finite() && t_end.is_finite()) {
        return Vec::new();
    }
    let dt = 1.0 / poll_rate_hz;
    let samples = ((t_end + dt) / dt).ceil().max(0.0) as usize;

    let mut events = Vec::new();
    for beam in beams {
        let window = edge_times.get(&beam.id);
        let mut prev_blocked = false;
        for k in 0..samples {
            let t = k as f64 * dt;
            let blocked = window.is_some_and(|w| w.is_blocked_at(t));
            if blocked != prev_blocked {
                let edge = if blocked { EdgeKind::Fall } else { EdgeKind::Rise };
                events.push(Event::new(beam.id, edge, t));
                prev_blocked = blocked;
            }
        }
    }

    sort_by_time(&mut events);
    events
}

/// Time of the first event matching `beam_id` and `edge`.
///
/// The earliest match wins; polling can produce repeated edges of the same
/// kind on one beam.
#[must_use]
pub fn find_edge_time(events: &[Event], beam_id: BeamId, edge: EdgeKind) -> Option<f64> {
    events
        .iter()
        .find(|event| event.beam_id == beam_id && event.edge == edge)
        .map(|event| event.time)
}
