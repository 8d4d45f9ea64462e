//! Error types for curve protection.

use thiserror::Error;

use super::ball::{BallId, PolylineId};
use crate::geom::Point3;

/// Result type for protection operations.
pub type ProtectResult<T> = Result<T, ProtectError>;

/// Errors raised while protecting boundary curves.
///
/// `DegenerateInput` and `InsertionHidden` are recoverable: the protector
/// records them in its diagnostics and continues. The entry point only ever
/// returns the remaining variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtectError {
    /// The input mesh could not be turned into half-edge connectivity.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// The target ball size is not a positive finite length.
    #[error("target ball size must be positive and finite, got {0}")]
    InvalidBallSize(f64),

    /// A polyline has zero arclength.
    #[error("polyline {polyline} has zero length")]
    DegenerateInput {
        /// The skipped polyline.
        polyline: PolylineId,
    },

    /// A ball center is dominated by an existing ball.
    #[error("ball at ({}, {}, {}) is hidden by ball {by}", .center.x, .center.y, .center.z)]
    InsertionHidden {
        /// Requested center.
        center: Point3,
        /// Dominating ball.
        by: BallId,
    },

    /// Conflict resolution exceeded its restart budget.
    #[error("ball separation did not converge after {restarts} restarts (last conflict {a} / {b})")]
    NonConvergence {
        /// Restarts performed.
        restarts: usize,
        /// First ball of the last conflicting pair.
        a: BallId,
        /// Second ball of the last conflicting pair.
        b: BallId,
    },

    /// The corner registry references a ball that is gone or not a corner.
    #[error("corner registry inconsistent at ball {ball}: {reason}")]
    InconsistentRegistry {
        /// Offending ball.
        ball: BallId,
        /// What is wrong.
        reason: String,
    },
}
