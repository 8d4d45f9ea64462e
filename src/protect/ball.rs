use serde::{Deserialize, Serialize};

use crate::geom::Point3;

/// Identifier of an extracted polyline (its index in the polyline set).
pub type PolylineId = usize;

/// Stable identity of a ball in a weighted index.
///
/// Ids are never reused: a ball replaced by a smaller one at the same center
/// gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u32);

impl BallId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A ball: center plus squared radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub center: Point3,
    /// Squared radius.
    pub weight: f64,
}

impl WeightedPoint {
    #[must_use]
    pub const fn new(center: Point3, weight: f64) -> Self {
        Self { center, weight }
    }

    #[must_use]
    pub fn radius(self) -> f64 {
        self.weight.max(0.0).sqrt()
    }

    /// Power distance of `p` to this ball: `|p - c|² - w`.
    #[must_use]
    pub fn power_distance(self, p: Point3) -> f64 {
        self.center.distance_squared_to(p) - self.weight
    }

    /// Metric overlap: center distance strictly below the sum of radii.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.center.distance_to(other.center) < self.radius() + other.radius()
    }
}

/// Where a ball center sits on its polyline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolylinePosition {
    /// Segment `(points[segment], points[segment + 1])` holding the center.
    pub segment: usize,
    /// Distance from `points[segment]`.
    pub offset: f64,
    /// Distance from the polyline start.
    pub arclength: f64,
}

/// Per-ball bookkeeping embedded in every index vertex.
///
/// Corner balls may be shared by several polylines, so their `pred`/`succ`
/// stay empty and their per-polyline neighbors live in the corner registry.
/// The exception is a corner that `polyline` passes through: it keeps that
/// polyline's `pred`/`succ`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BallContext {
    pub polyline: PolylineId,
    pub pred: Option<BallId>,
    pub succ: Option<BallId>,
    pub position: PolylinePosition,
    pub is_corner: bool,
}

impl BallContext {
    /// Redirects `pred`/`succ` links from `old` to `new`. Returns true if any changed.
    pub fn retarget(&mut self, old: BallId, new: BallId) -> bool {
        let mut changed = false;
        if self.pred == Some(old) {
            self.pred = Some(new);
            changed = true;
        }
        if self.succ == Some(old) {
            self.succ = Some(new);
            changed = true;
        }
        changed
    }
}
