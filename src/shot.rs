//! Shots and the shot sampler.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ShotDistribution, SimulationConfig};
use crate::geometry::Vec2;
use crate::random::gaussian;

/// Initial position and constant velocity of the ball centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Initial x.
    pub x0: f64,
    /// Initial y.
    pub y0: f64,
    /// Velocity along x, into the goal.
    pub vx: f64,
    /// Lateral velocity.
    pub vy: f64,
}

impl Shot {
    /// Creates a shot.
    #[must_use]
    pub const fn new(x0: f64, y0: f64, vx: f64, vy: f64) -> Self {
        Self { x0, y0, vx, vy }
    }

    /// Initial centre position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        Vec2::new(self.x0, self.y0)
    }

    /// Constant velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }

    /// Speed in m/s.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Heading in radians, 0 along +x (straight into the goal).
    #[must_use]
    pub fn theta(&self) -> f64 {
        self.vy.atan2(self.vx)
    }

    /// Lateral position where the centre crosses the line `x = x_beam`.
    ///
    /// `None` for a shot with no x velocity.
    #[must_use]
    pub fn y_at_beam(&self, x_beam: f64) -> Option<f64> {
        if self.vx == 0.0 {
            return None;
        }
        let t = (x_beam - self.x0) / self.vx;
        Some(self.y0 + self.vy * t)
    }
}

/// Draws a random shot.
///
/// Draw order is speed, heading, lateral position; a fixed seed therefore
/// reproduces the same shot sequence. The heading is uniform over
/// `[angle_min, angle_max]` when both are set, otherwise normal with
/// `angle_sigma` when set, otherwise 0 (no draw). The ball spawns just
/// before the nearer beam, laterally inside the goal by a margin of
/// `1.1 × radius`.
///
/// `distribution` and `config` are expected to have been validated.
pub fn sample_shot<R: Rng + ?Sized>(
    rng: &mut R,
    config: &SimulationConfig,
    distribution: &ShotDistribution,
) -> Shot {
    let speed = rng.gen_range(distribution.speed_min..=distribution.speed_max);

    let theta = match (distribution.angle_min, distribution.angle_max, distribution.angle_sigma) {
        (Some(min), Some(max), _) => rng.gen_range(min..=max),
        (_, _, Some(sigma)) => gaussian(rng, sigma),
        _ => 0.0,
    };

    let limit = config.lateral_limit();
    let y0 = rng.gen_range(-limit..=limit);

    Shot::new(config.spawn_x(), y0, speed * theta.cos(), speed * theta.sin())
}
