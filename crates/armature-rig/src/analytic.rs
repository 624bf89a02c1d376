//! Closed-form IK: the 1-bone aim solver and the 2-bone law-of-cosines
//! solver.
//!
//! Both are pure functions of their inputs. The solver's canonical forward
//! axis is local +X and its up axis +Y; the swivel angle rolls the basis
//! around forward before any bend is applied. Each output matrix re-applies
//! the scale of the corresponding input joint's world matrix.

use armature_math::{Axis, AxisTarget, aim_matrix, axis_roll};
use glam::{Mat3, Mat4, Vec3};
use std::f32::consts::PI;

use crate::chain::{JointChain, world_scale};
use crate::error::SolveError;

/// Width of the collapse/extension bands around the reachable distance
/// range. Inside a band the bend angle snaps to its boundary value, which
/// also keeps the `acos` arguments away from domain-error territory.
const REACH_BAND: f32 = 1e-3;

fn joint_matrix(position: Vec3, rotation: Mat3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_mat3(rotation) * Mat4::from_scale(scale)
}

/// Solves a single bone to aim at `goal`.
///
/// The start joint's +X axis points at the goal (rolled by `swivel` around
/// it), and the end joint is placed at `(length, 0, 0)` in the start's
/// frame with the same orientation.
///
/// # Errors
///
/// [`SolveError::InsufficientGeometry`] unless the chain has exactly 2
/// joints. A goal coincident with the start position has no defined forward
/// direction and is rejected as a degenerate basis, as is an up vector
/// parallel to the goal direction.
pub fn solve_one_bone(
    chain: &JointChain,
    goal: Vec3,
    up: Vec3,
    swivel: f32,
) -> Result<[Mat4; 2], SolveError> {
    if chain.len() != 2 {
        return Err(SolveError::InsufficientGeometry {
            needed: 2,
            got: chain.len(),
        });
    }
    let joints = chain.joints();
    let start_pos = joints[0].world.w_axis.truncate();
    let length = joints[1].length;

    let basis = aim_matrix(
        AxisTarget::new(goal - start_pos, Axis::X),
        AxisTarget::new(up, Axis::Y),
        start_pos,
    )? * axis_roll(Axis::X, swivel);

    let rotation = Mat3::from_mat4(basis);
    let end_pos = basis.transform_point3(Vec3::new(length, 0.0, 0.0));

    Ok([
        joint_matrix(start_pos, rotation, world_scale(&joints[0].world)),
        joint_matrix(end_pos, rotation, world_scale(&joints[1].world)),
    ])
}

/// Solves a 2-bone chain with the law of cosines.
///
/// The triangle formed by the two bone lengths and the start-to-goal
/// distance fixes the bend angles analytically:
/// - inside `REACH_BAND` of the minimum reach `|l2 - l1|` the chain is
///   treated as fully collapsed (mid bend 0),
/// - inside `REACH_BAND` of the maximum reach `l1 + l2` as fully extended
///   (mid bend pi),
/// - otherwise both angles come from `acos`, with arguments clamped to
///   `[-1, 1]` against floating-point overshoot.
///
/// The bend lifts the mid joint toward the up/pole side of the chain plane.
pub fn solve_two_bone(
    chain: &JointChain,
    goal: Vec3,
    up: Vec3,
    swivel: f32,
) -> Result<[Mat4; 3], SolveError> {
    if chain.len() != 3 {
        return Err(SolveError::InsufficientGeometry {
            needed: 3,
            got: chain.len(),
        });
    }
    let joints = chain.joints();
    let start_pos = joints[0].world.w_axis.truncate();
    let l1 = joints[1].length;
    let l2 = joints[2].length;

    let distance = (goal - start_pos).length();
    let min_distance = (l2 - l1).abs();
    let max_distance = l1 + l2;

    let (start_radian, end_radian) = if distance < min_distance + REACH_BAND {
        (0.0, 0.0)
    } else if distance > max_distance - REACH_BAND {
        (0.0, PI)
    } else {
        let start_cos = (l1 * l1 + distance * distance - l2 * l2) / (2.0 * l1 * distance);
        let end_cos = (l2 * l2 + l1 * l1 - distance * distance) / (2.0 * l2 * l1);
        (
            start_cos.clamp(-1.0, 1.0).acos(),
            end_cos.clamp(-1.0, 1.0).acos(),
        )
    };

    let basis = aim_matrix(
        AxisTarget::new(goal - start_pos, Axis::X),
        AxisTarget::new(up, Axis::Y),
        start_pos,
    )? * axis_roll(Axis::X, swivel);

    // Bend about local +Z: positive start angle lifts the bone toward +Y
    // (the pole side); the mid joint folds back by the triangle's interior
    // angle.
    let start_rot = Mat3::from_mat4(basis) * Mat3::from_rotation_z(start_radian);
    let mid_rot = start_rot * Mat3::from_rotation_z(end_radian - PI);

    let mid_pos = start_pos + start_rot * Vec3::X * l1;
    let end_pos = mid_pos + mid_rot * Vec3::X * l2;

    Ok([
        joint_matrix(start_pos, start_rot, world_scale(&joints[0].world)),
        joint_matrix(mid_pos, mid_rot, world_scale(&joints[1].world)),
        joint_matrix(end_pos, mid_rot, world_scale(&joints[2].world)),
    ])
}
