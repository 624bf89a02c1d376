//! Error types for armature-rig.

use armature_curve::CurveError;
use armature_math::GeometryError;
use thiserror::Error;

/// Errors from IK solving.
///
/// Every failure propagates immediately to the caller; no solver returns
/// partial or garbage matrices on error, and nothing is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolveError {
    /// Degenerate aim basis (forward and up parallel or zero).
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Fewer joints or points than the algorithm requires.
    #[error("insufficient geometry: needed {needed} points, got {got}")]
    InsufficientGeometry {
        /// Minimum point count the algorithm needs.
        needed: usize,
        /// Points actually available.
        got: usize,
    },

    /// A curve collaborator query failed; surfaced as-is, never retried.
    #[error("curve query failed: {0}")]
    Curve(#[from] CurveError),
}
