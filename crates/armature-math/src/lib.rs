//! Geometry and matrix kernel for armature.
//!
//! Deterministic, side-effect-free algebra shared by every solver:
//! rotation-order aware matrix construction and decomposition, aim-basis
//! composition, spherical interpolation, and weighted transform blending.
//!
//! All functions here are pure. The only failure mode is a degenerate aim
//! basis (forward and up parallel), which is surfaced as
//! [`GeometryError::DegenerateBasis`] rather than silently defaulted — an
//! arbitrary basis would pop the rig's orientation unpredictably.

mod compose;
mod error;
mod interp;
mod rotate;

pub use compose::{AxisTarget, aim_matrix, compose_matrix, position_matrix};
pub use error::GeometryError;
pub use interp::{blend_matrices, slerp, slerp_matrix};
pub use rotate::{Axis, RotateOrder, axis_roll, matrix_to_euler, rotation_matrix};
