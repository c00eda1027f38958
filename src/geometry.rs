//! Beam geometry and ball/beam occlusion.
//!
//! A beam is an infinitely thin segment `A -> B`. A ball of radius `r` whose
//! centre moves as `P(t) = P0 + V·t` blocks the beam while the distance from
//! `P(t)` to the segment is at most `r`, i.e. while the centre is inside the
//! capsule of radius `r` around the segment.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::interval::{intersect_all, merge, solve_linear, solve_quadratic_le0, Interval};

/// Identifier of a beam within one sensor array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeamId(u32);

impl BeamId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 2D point or displacement, in meters (or m/s for velocities).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Depth into the goal.
    pub x: f64,
    /// Lateral position across the goal mouth.
    pub y: f64,
}

impl Vec2 {
    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared Euclidean length.
    #[must_use]
    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// A break-beam sensor modelled as the segment `a -> b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    /// Identifier reported on this beam's edges.
    pub id: BeamId,
    /// Emitter end.
    pub a: Vec2,
    /// Receiver end.
    pub b: Vec2,
}

impl Beam {
    /// Creates a beam from `a` to `b`.
    #[must_use]
    pub const fn new(id: BeamId, a: Vec2, b: Vec2) -> Self {
        Self { id, a, b }
    }

    /// Squared length; zero for a degenerate beam.
    #[must_use]
    pub fn length_squared(&self) -> f64 {
        (self.b - self.a).norm_squared()
    }

    /// Centre of the segment.
    #[must_use]
    pub fn midpoint(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }

    /// Occlusion window of this beam for a ball starting at `p0` moving with `v`.
    #[must_use]
    pub fn occlusion_interval(&self, p0: Vec2, v: Vec2, radius: f64) -> Option<Interval> {
        occlusion_interval(self.a, self.b, p0, v, radius)
    }
}

/// Coefficients of `|q + w·t|² - r² ≤ 0` as a quadratic in `t`.
fn within_radius(q: Vec2, w: Vec2, radius: f64) -> Vec<Interval> {
    let a = w.norm_squared();
    let b = 2.0 * q.dot(w);
    let c = q.norm_squared() - radius * radius;
    solve_quadratic_le0(a, b, c)
}

/// Returns the first time window, at `t >= 0`, during which a circle of
/// `radius` centred at `p0 + v·t` overlaps the segment `a -> b`.
///
/// The capsule around the segment is the union of three regions, each
/// solved separately and then merged:
/// - the band around the segment body, where the projection parameter
///   `u(t)` lies in `[0, 1]` and the distance to the infinite line is `<= r`;
/// - the discs of radius `r` around `a` and around `b`.
///
/// A window already open at `t = 0` is clipped to start at 0. Only the
/// earliest qualifying window is returned. Degenerate segments never occlude.
#[must_use]
pub fn occlusion_interval(a: Vec2, b: Vec2, p0: Vec2, v: Vec2, radius: f64) -> Option<Interval> {
    let d = b - a;
    let denom = d.norm_squared();
    if denom == 0.0 {
        return None;
    }

    // u(t) = u0 + u1·t
    let rel = p0 - a;
    let u0 = rel.dot(d) / denom;
    let u1 = v.dot(d) / denom;

    let mut candidates = Vec::with_capacity(4);

    if let Some(u_interval) = solve_linear(u1, u0) {
        // Perpendicular offset from the line: (rel + v·t) - u(t)·d
        let q = rel - d * u0;
        let w = v - d * u1;
        candidates.extend(intersect_all(&within_radius(q, w, radius), &u_interval));
    }

    for endpoint in [a, b] {
        candidates.extend(within_radius(p0 - endpoint, v, radius));
    }

    merge(candidates)
        .into_iter()
        .find(|interval| interval.end >= 0.0)
        .map(|interval| Interval {
            start: interval.start.max(0.0),
            end: interval.end,
        })
}
