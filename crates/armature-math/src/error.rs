//! Error types for armature-math.

use thiserror::Error;

/// Errors from basis construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Forward and up vectors are parallel (or one is zero), so no unique
    /// orthonormal basis exists.
    #[error("degenerate basis: forward and up vectors are parallel or zero")]
    DegenerateBasis,
}
