//! Closed intervals over the real line and the inequality solvers built on them.
//!
//! Occlusion is found by solving small inequalities in time `t`: an affine
//! constraint for "the closest point lies on the segment" and quadratic
//! constraints for "the centre is within one radius". Each solver returns
//! the satisfying set as intervals; an empty set is simply no interval.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Leading coefficients smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-12;

/// A closed interval `[start, end]`. Either bound may be infinite.
///
/// # Examples
///
/// ```
/// use beamsim::Interval;
///
/// let a = Interval::new(0.0, 2.0).unwrap();
/// let b = Interval::new(1.0, 3.0).unwrap();
/// assert_eq!(a.intersection(&b), Interval::new(1.0, 2.0));
/// assert!(Interval::new(2.0, 1.0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound (inclusive).
    pub start: f64,

    /// Upper bound (inclusive).
    pub end: f64,
}

impl Interval {
    /// Creates an interval, or `None` when `start > end` or a bound is NaN.
    #[must_use]
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The whole real line.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        }
    }

    /// `(-inf, end]`.
    #[must_use]
    pub const fn ending_at(end: f64) -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end,
        }
    }

    /// `[start, +inf)`.
    #[must_use]
    pub const fn starting_at(start: f64) -> Self {
        Self {
            start,
            end: f64::INFINITY,
        }
    }

    /// Length of the interval; infinite for an unbounded one.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Returns the intersection of two intervals, if any.
    ///
    /// Touching intervals intersect in a single point.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = if self.start == f64::NEG_INFINITY {
            "(-∞".to_string()
        } else {
            format!("[{}", self.start)
        };
        let end = if self.end == f64::INFINITY {
            "+∞)".to_string()
        } else {
            format!("{}]", self.end)
        };
        write!(f, "{start}, {end}")
    }
}

/// Solves `a·t + b ∈ [0, 1]` for `t`.
///
/// With a (near) zero slope the constraint holds either everywhere or
/// nowhere, depending on `b`.
#[must_use]
pub fn solve_linear(a: f64, b: f64) -> Option<Interval> {
    if a.abs() < EPSILON {
        return if (0.0..=1.0).contains(&b) {
            Some(Interval::unbounded())
        } else {
            None
        };
    }
    let t0 = (0.0 - b) / a;
    let t1 = (1.0 - b) / a;
    Some(Interval {
        start: t0.min(t1),
        end: t0.max(t1),
    })
}

/// Solves `a·t² + b·t + c ≤ 0` for `t`.
///
/// Returns zero, one or two intervals in ascending order. A downward
/// parabola (`a < 0`) is satisfied on the two rays outside its roots.
#[must_use]
pub fn solve_quadratic_le0(a: f64, b: f64, c: f64) -> Vec<Interval> {
    if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return if c <= 0.0 {
                vec![Interval::unbounded()]
            } else {
                Vec::new()
            };
        }
        let t = -c / b;
        return if b > 0.0 {
            vec![Interval::ending_at(t)]
        } else {
            vec![Interval::starting_at(t)]
        };
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.max(0.0).sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    let (low, high) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    if a > 0.0 {
        vec![Interval {
            start: low,
            end: high,
        }]
    } else {
        vec![Interval::ending_at(low), Interval::starting_at(high)]
    }
}

/// Intersects every interval with `bound`, dropping the empty results.
#[must_use]
pub fn intersect_all(intervals: &[Interval], bound: &Interval) -> Vec<Interval> {
    intervals
        .iter()
        .filter_map(|interval| interval.intersection(bound))
        .collect()
}

/// Sorts by start and coalesces overlapping or touching intervals.
#[must_use]
pub fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}
